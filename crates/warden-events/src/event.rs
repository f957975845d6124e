//! Event kinds and the handler contracts listeners implement.
//!
//! An event kind is an ordinary Rust type. Its [`Event::Handler`] names the
//! trait object the kind's registry stores, so a registry for one kind can only
//! ever hold handlers written for that kind.
//!
//! # Example
//!
//! ```
//! use warden_events::{Event, Listener, Query, Responder};
//!
//! /// Notification-only kind.
//! pub struct PolicyReloaded {
//!     pub version: u64,
//! }
//!
//! impl Event for PolicyReloaded {
//!     type Handler = dyn Listener<PolicyReloaded>;
//! }
//!
//! /// Query kind answered with a verdict string.
//! pub struct InspectRequest {
//!     pub uri: String,
//! }
//!
//! impl Event for InspectRequest {
//!     type Handler = dyn Responder<InspectRequest>;
//! }
//!
//! impl Query for InspectRequest {
//!     type Response = String;
//! }
//! ```

use std::any::type_name;

/// A category of notification.
///
/// Kinds are compile-time distinct: every kind is its own type, and the bus
/// keeps one registry per kind.
pub trait Event: Sized + Send + Sync + 'static {
    /// The handler shape stored by this kind's registry.
    ///
    /// `dyn Listener<Self>` for notification-only kinds,
    /// `dyn Responder<Self>` for query kinds.
    type Handler: ?Sized + Listener<Self> + 'static;

    /// Human readable kind name used in logs.
    fn kind_name() -> &'static str {
        type_name::<Self>()
    }
}

/// An event kind whose listeners produce a response.
pub trait Query: Event {
    /// The value each listener returns for this kind.
    type Response: Send + 'static;
}

/// Handler contract for one event kind.
pub trait Listener<E: Event>: Send + Sync {
    /// Called for every `notify` of `E` while the listener is registered.
    fn upon(&self, event: &E);
}

/// Handler contract for a query kind.
///
/// A responder is also a [`Listener`]: `notify` on a query kind reaches its
/// `upon` hook, `query` and `named_query` reach `respond`.
pub trait Responder<Q: Query>: Listener<Q> {
    /// Produces this listener's answer to `event`.
    fn respond(&self, event: &Q) -> Q::Response;
}
