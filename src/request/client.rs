use std::collections::HashMap;
use std::time::Duration;

use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};

use super::error::RequestError;

/// Options accepted by the method shortcuts.
///
/// Merged into the request without overriding its url or verb.
#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
    /// Extra headers, by name.
    pub headers: HashMap<String, String>,
    /// Per-request timeout; elapsing manifests as a status-0 rejection.
    pub timeout: Option<Duration>,
    /// Ask the transport to include cross-origin credentials where it
    /// supports the concept (browser fetch).
    pub with_credentials: bool,
}

/// A fully specified request for [`RequestClient::request`].
#[derive(Clone, Debug)]
pub struct Request {
    pub url: String,
    pub method: Method,
    pub headers: HashMap<String, String>,
    /// Body data. A string is sent unmodified; any other value serializes to
    /// JSON. Ignored for GET and HEAD.
    pub body: Option<Value>,
    pub timeout: Option<Duration>,
    pub with_credentials: bool,
}

impl Request {
    /// A request with the given verb and destination and nothing else.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            headers: HashMap::new(),
            body: None,
            timeout: None,
            with_credentials: false,
        }
    }

    /// Set a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the body data.
    pub fn body(mut self, body: impl Into<Value>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Merge shortcut options in; url and verb are never overridden.
    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.headers.extend(options.headers);
        if self.timeout.is_none() {
            self.timeout = options.timeout;
        }
        self.with_credentials |= options.with_credentials;
        self
    }

    fn has_content_type(&self) -> bool {
        self.headers
            .keys()
            .any(|name| name.eq_ignore_ascii_case("content-type"))
    }
}

/// Promise-style HTTP client used to populate container state.
///
/// Wraps a shared connection pool; cloning is cheap and clones share the
/// pool. All operations resolve to a JSON value on success and reject with a
/// [`RequestError`] otherwise — a non-success status is a rejection, a body
/// that fails to decode as JSON is not (it resolves to the raw text).
#[derive(Clone, Debug, Default)]
pub struct RequestClient {
    http: reqwest::Client,
}

impl RequestClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a request and await its settlement.
    ///
    /// Success range is [200, 300): an empty or blank body resolves to the
    /// raw text, anything else resolves to its JSON decoding, falling back
    /// to the raw text when decoding fails. Everything else rejects with a
    /// [`RequestError`]: the HTTP status and body for non-success responses,
    /// status 0 for transport failures and timeouts. A blank url is rejected
    /// before any I/O.
    pub async fn request(&self, request: Request) -> Result<Value, RequestError> {
        if request.url.trim().is_empty() {
            return Err(RequestError::transport("request url is required"));
        }
        debug!(method = %request.method, url = %request.url, "dispatching request");

        let send_body = request.method != Method::GET && request.method != Method::HEAD;
        let mut builder = self.http.request(request.method.clone(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if send_body {
            match &request.body {
                Some(Value::String(text)) => builder = builder.body(text.clone()),
                Some(data) => {
                    if !request.has_content_type() {
                        builder = builder.header("content-type", "application/json");
                    }
                    builder = builder.body(data.to_string());
                }
                None => {}
            }
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        #[cfg(target_arch = "wasm32")]
        if request.with_credentials {
            builder = builder.fetch_credentials_include();
        }

        let response = builder.send().await.map_err(classify_transport_error)?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(classify_transport_error)?;

        if status.is_success() {
            if text.trim().is_empty() {
                return Ok(Value::String(text));
            }
            Ok(match serde_json::from_str(&text) {
                Ok(decoded) => decoded,
                Err(_) => Value::String(text),
            })
        } else {
            warn!(status = status.as_u16(), url = %request.url, "request rejected");
            Err(RequestError::status(
                status.as_u16(),
                status.canonical_reason().unwrap_or(""),
                text,
            ))
        }
    }

    /// GET shortcut.
    pub async fn get(
        &self,
        url: impl Into<String>,
        options: RequestOptions,
    ) -> Result<Value, RequestError> {
        self.request(Request::new(Method::GET, url).with_options(options))
            .await
    }

    /// POST shortcut.
    pub async fn post(
        &self,
        url: impl Into<String>,
        body: Option<Value>,
        options: RequestOptions,
    ) -> Result<Value, RequestError> {
        let mut request = Request::new(Method::POST, url).with_options(options);
        request.body = body;
        self.request(request).await
    }

    /// PUT shortcut.
    pub async fn put(
        &self,
        url: impl Into<String>,
        body: Option<Value>,
        options: RequestOptions,
    ) -> Result<Value, RequestError> {
        let mut request = Request::new(Method::PUT, url).with_options(options);
        request.body = body;
        self.request(request).await
    }

    /// DELETE shortcut.
    pub async fn delete(
        &self,
        url: impl Into<String>,
        options: RequestOptions,
    ) -> Result<Value, RequestError> {
        self.request(Request::new(Method::DELETE, url).with_options(options))
            .await
    }

    /// PATCH shortcut.
    pub async fn patch(
        &self,
        url: impl Into<String>,
        body: Option<Value>,
        options: RequestOptions,
    ) -> Result<Value, RequestError> {
        let mut request = Request::new(Method::PATCH, url).with_options(options);
        request.body = body;
        self.request(request).await
    }
}

fn classify_transport_error(err: reqwest::Error) -> RequestError {
    if err.is_timeout() {
        RequestError::transport("request timed out")
    } else {
        RequestError::transport(err.to_string())
    }
}
