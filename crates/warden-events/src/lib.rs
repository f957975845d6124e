//! Typed in-process publish/subscribe for Warden.
//!
//! This crate provides the event bus the agent's components use to talk to
//! each other without knowing about each other:
//! - [`Event`] / [`Query`]: compile-time distinct event kinds
//! - [`Listener`] / [`Responder`]: the handler contracts per kind
//! - [`Registry`]: the active membership of one kind, with synchronous
//!   `notify`, `query` and `named_query` fan-out
//! - [`ListenerLifecycle`] and [`Capability`]: registering one component in
//!   every kind it handles, and removing it again when it goes away
//! - [`EventBus`]: one lazily-created registry per kind
//!
//! Dispatch runs on the caller's thread. Handler panics are contained at the
//! dispatch boundary and never reach the producer.
//!
//! # Example
//!
//! ```
//! use std::sync::{Arc, Mutex, Weak};
//! use warden_events::{Capability, Event, EventBus, Listener, ListenerLifecycle};
//!
//! struct Ping(u32);
//! impl Event for Ping {
//!     type Handler = dyn Listener<Ping>;
//! }
//!
//! struct Audit {
//!     lifecycle: ListenerLifecycle,
//!     seen: Mutex<Vec<u32>>,
//! }
//! impl Listener<Ping> for Audit {
//!     fn upon(&self, event: &Ping) {
//!         self.seen.lock().unwrap().push(event.0);
//!     }
//! }
//!
//! let bus = EventBus::new();
//! let audit = Arc::new_cyclic(|me: &Weak<Audit>| {
//!     let lifecycle = ListenerLifecycle::new("audit");
//!     lifecycle.contribute(Capability::<Ping>::listener(&bus, me.clone()));
//!     Audit { lifecycle, seen: Mutex::new(Vec::new()) }
//! });
//! audit.lifecycle.register();
//!
//! if !bus.is_empty::<Ping>() {
//!     bus.notify(&Ping(7));
//! }
//! assert_eq!(*audit.seen.lock().unwrap(), vec![7]);
//! ```

pub mod bus;
pub mod capability;
pub mod config;
pub mod error;
pub mod event;
pub mod identity;
pub mod lifecycle;
pub mod registry;

pub use bus::EventBus;
pub use capability::Capability;
pub use config::BusConfig;
pub use error::{DispatchError, DispatchFault};
pub use event::{Event, Listener, Query, Responder};
pub use identity::{mint_listener_name, ListenerId};
pub use lifecycle::{HookKey, LifecycleState, ListenerLifecycle};
pub use registry::{Entry, FaultObserver, Registry, RegistryId};
