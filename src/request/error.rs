use thiserror::Error;

/// Failure value carried by a rejected request.
///
/// One shape covers the whole taxonomy: non-success responses carry the HTTP
/// status and body, transport failures and timeouts carry status 0 with an
/// empty body, and construction failures (a blank url) are reported the same
/// way before any I/O happens. A fresh value is built per rejection; nothing
/// is shared between in-flight requests.
#[derive(Debug, Clone, Error)]
#[error("{status} {status_text}")]
pub struct RequestError {
    /// HTTP status code, or 0 for transport-level failures and timeouts.
    pub status: u16,
    /// Canonical status description, or a transport error description.
    pub status_text: String,
    /// Raw response body, empty if none was received.
    pub response: String,
}

impl RequestError {
    pub(crate) fn transport(status_text: impl Into<String>) -> Self {
        Self {
            status: 0,
            status_text: status_text.into(),
            response: String::new(),
        }
    }

    pub(crate) fn status(status: u16, status_text: impl Into<String>, response: String) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            response,
        }
    }
}
