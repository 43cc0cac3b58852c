//! # Cistern
//!
//! A minimal reactive state container paired with an async HTTP client.
//!
//! Cistern provides two independent building blocks that compose into one
//! surface:
//!
//! ## Container (reactive state)
//!
//! A controlled value cell that notifies observers only when its value
//! actually changes:
//! - [`Container`] - owns a [`State`] snapshot, replaced wholesale on write
//! - Shallow change detection via [`shallow_eq`] gates every write
//! - Action fields on the initial state are promoted to direct callables
//!
//! ## Request (network population)
//!
//! A promise-style HTTP abstraction for filling the container from a remote
//! source:
//! - [`RequestClient`] - generic [`request`](RequestClient::request) plus
//!   `get`/`post`/`put`/`delete`/`patch` shortcuts
//! - Resolves to decoded JSON (or raw text), rejects with a structured
//!   [`RequestError`]
//!
//! ```
//! use cistern::{create, Field, State};
//!
//! let container = create(|_| State::new().set("count", Field::value(0)));
//! let sub = container.subscribe(|state, previous| {
//!     println!("{} -> {}", previous.to_json(), state.to_json());
//! });
//!
//! container.write(State::new().set("count", Field::value(1)));
//! sub.unsubscribe();
//! ```

pub mod container;
pub mod request;

// Re-export main types for convenience
pub use container::{create, shallow_eq, shallow_eq_fields, ActionFn, Container, Field, State, Subscription, Writer};
pub use request::{Request, RequestClient, RequestError, RequestOptions};

// The verb and value vocabulary used across the API.
pub use reqwest::Method;
pub use serde_json::Value;
