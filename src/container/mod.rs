//! Reactive state containment.
//!
//! A [`Container`] owns a single [`State`] snapshot and notifies subscribers
//! only when a write actually changes it. Change detection is shallow: one
//! level of fields, compared by identity or primitive value, decided by
//! [`shallow_eq`].

mod container;
mod shallow;
mod state;

pub use container::{create, Container, Subscription, Writer};
pub use shallow::{shallow_eq, shallow_eq_fields};
pub use state::{ActionFn, Field, State};
