//! Error types for dispatch.
//!
//! Dispatch itself never returns an error to the producer. Faults raised by
//! individual handlers are contained, logged, and handed to the bus's fault
//! observer as [`DispatchFault`] values.

use std::any::Any;

use thiserror::Error;

use crate::identity::ListenerId;

/// Errors raised inside a single handler invocation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The handler panicked.
    #[error("handler panicked: {0}")]
    Panicked(String),

    /// A lifecycle hook panicked while activating or deactivating.
    #[error("lifecycle hook panicked: {0}")]
    HookPanicked(String),
}

impl DispatchError {
    /// Builds a `Panicked` error from a `catch_unwind` payload.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        Self::Panicked(panic_message(payload.as_ref()))
    }
}

/// Extracts the message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// A contained handler fault, as reported to a fault observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchFault {
    /// Name of the event kind being dispatched.
    pub kind: &'static str,
    /// Id of the failing listener.
    pub listener_id: ListenerId,
    /// Display name of the failing listener.
    pub listener: String,
    /// What went wrong.
    pub error: DispatchError,
}
