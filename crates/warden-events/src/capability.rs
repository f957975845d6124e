//! Typed capabilities: one listener's membership in one kind's registry.
//!
//! A component that listens to several kinds builds one `Capability` per
//! kind. Each capability carries a handle already typed for its kind, so the
//! registry for kind A can never be handed a handler written for kind B.
//!
//! ```
//! use std::sync::{Arc, Weak};
//! use warden_events::{Capability, Event, EventBus, Listener, ListenerLifecycle};
//!
//! struct ConfigChanged;
//! impl Event for ConfigChanged {
//!     type Handler = dyn Listener<ConfigChanged>;
//! }
//!
//! struct Reloader {
//!     lifecycle: ListenerLifecycle,
//! }
//!
//! impl Listener<ConfigChanged> for Reloader {
//!     fn upon(&self, _event: &ConfigChanged) {}
//! }
//!
//! let bus = EventBus::new();
//! let reloader = Arc::new_cyclic(|me: &Weak<Reloader>| {
//!     let lifecycle = ListenerLifecycle::new("reloader");
//!     lifecycle.contribute(Capability::<ConfigChanged>::listener(&bus, me.clone()));
//!     Reloader { lifecycle }
//! });
//! reloader.lifecycle.register();
//! assert!(!bus.is_empty::<ConfigChanged>());
//! ```

use std::fmt;
use std::sync::{Arc, Weak};

use crate::bus::EventBus;
use crate::event::{Event, Listener, Query, Responder};
use crate::registry::Registry;

/// A typed handle paired with the registry it belongs to.
pub struct Capability<E: Event> {
    pub(crate) registry: Arc<Registry<E>>,
    pub(crate) handler: Weak<E::Handler>,
}

impl<E: Event> Capability<E> {
    /// Pairs `handler` with an explicit registry.
    pub fn new(registry: Arc<Registry<E>>, handler: Weak<E::Handler>) -> Self {
        Self { registry, handler }
    }

    /// The registry this capability activates into.
    pub fn registry(&self) -> &Arc<Registry<E>> {
        &self.registry
    }
}

impl<E> Capability<E>
where
    E: Event<Handler = dyn Listener<E>>,
{
    /// Capability for a notification-only kind on `bus`.
    pub fn listener<T>(bus: &EventBus, owner: Weak<T>) -> Self
    where
        T: Listener<E> + 'static,
    {
        let handler: Weak<dyn Listener<E>> = owner;
        Self::new(bus.registry::<E>(), handler)
    }
}

impl<Q> Capability<Q>
where
    Q: Query<Handler = dyn Responder<Q>>,
{
    /// Capability for a query kind on `bus`.
    pub fn responder<T>(bus: &EventBus, owner: Weak<T>) -> Self
    where
        T: Responder<Q> + 'static,
    {
        let handler: Weak<dyn Responder<Q>> = owner;
        Self::new(bus.registry::<Q>(), handler)
    }
}

impl<E: Event> fmt::Debug for Capability<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capability")
            .field("kind", &E::kind_name())
            .field("registry", &self.registry.id())
            .finish()
    }
}
