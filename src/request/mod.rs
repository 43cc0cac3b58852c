//! Async HTTP requests for feeding container state.
//!
//! [`RequestClient`] exposes a generic [`request`](RequestClient::request)
//! operation plus the usual method shortcuts. Consumers typically call it
//! from inside a container action and push the resolved value back through a
//! [`Writer`](crate::Writer).

mod client;
mod error;

pub use client::{Request, RequestClient, RequestOptions};
pub use error::RequestError;
