//! EventBus - one registry per event kind, shared by producers and consumers.
//!
//! # Concurrency Patterns
//!
//! - **`RwLock<HashMap<TypeId, ..>>`**: the kind map is read on every
//!   dispatch and written once per kind, when its registry is first needed.
//! - Each registry has its own lock; kinds never coordinate with each other.
//!
//! The bus is passed explicitly (usually as `Arc<EventBus>`) so that tests
//! and independent subsystems never share membership by accident.
//! [`EventBus::global`] exists for binaries that want a single process-wide
//! instance.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use tracing::debug;

use crate::config::BusConfig;
use crate::error::DispatchFault;
use crate::event::{Event, Query, Responder};
use crate::registry::{DispatchContext, FaultObserver, Registry};

struct KindSlot {
    name: &'static str,
    registry: Arc<dyn Any + Send + Sync>,
    len: fn(&(dyn Any + Send + Sync)) -> usize,
}

/// In-process publish/subscribe bus.
///
/// # Example
///
/// ```
/// use std::sync::{Arc, Weak};
/// use warden_events::{Capability, Event, EventBus, ListenerLifecycle, Query, Responder, Listener};
///
/// struct Status;
/// impl Event for Status {
///     type Handler = dyn Responder<Status>;
/// }
/// impl Query for Status {
///     type Response = &'static str;
/// }
///
/// struct Engine {
///     lifecycle: ListenerLifecycle,
/// }
/// impl Listener<Status> for Engine {
///     fn upon(&self, _: &Status) {}
/// }
/// impl Responder<Status> for Engine {
///     fn respond(&self, _: &Status) -> &'static str {
///         "ok"
///     }
/// }
///
/// let bus = EventBus::new();
/// assert!(bus.is_empty::<Status>());
///
/// let engine = Arc::new_cyclic(|me: &Weak<Engine>| {
///     let lifecycle = ListenerLifecycle::new("engine");
///     lifecycle.contribute(Capability::<Status>::responder(&bus, me.clone()));
///     Engine { lifecycle }
/// });
/// engine.lifecycle.register();
///
/// assert_eq!(bus.named_query(&Status), vec![("engine".to_string(), "ok")]);
/// drop(engine);
/// assert!(bus.query(&Status).is_empty());
/// ```
pub struct EventBus {
    context: Arc<DispatchContext>,
    kinds: RwLock<HashMap<TypeId, KindSlot>>,
}

impl EventBus {
    /// Creates a bus with default configuration.
    pub fn new() -> Self {
        Self::with_config(BusConfig::default())
    }

    /// Creates a bus with the given configuration.
    pub fn with_config(config: BusConfig) -> Self {
        Self::build(config, None)
    }

    /// Creates a bus that reports every contained handler fault to `observer`.
    pub fn with_fault_observer<F>(config: BusConfig, observer: F) -> Self
    where
        F: Fn(&DispatchFault) + Send + Sync + 'static,
    {
        let observer: FaultObserver = Arc::new(observer);
        Self::build(config, Some(observer))
    }

    fn build(config: BusConfig, observer: Option<FaultObserver>) -> Self {
        Self {
            context: Arc::new(DispatchContext::new(config, observer)),
            kinds: RwLock::new(HashMap::new()),
        }
    }

    /// The process-wide bus, created on first use.
    pub fn global() -> &'static EventBus {
        static GLOBAL: OnceLock<EventBus> = OnceLock::new();
        GLOBAL.get_or_init(EventBus::new)
    }

    /// This bus's configuration.
    pub fn config(&self) -> &BusConfig {
        &self.context.config
    }

    /// Returns the registry for `E`, creating it on first use.
    pub fn registry<E: Event>(&self) -> Arc<Registry<E>> {
        if let Some(registry) = self.existing::<E>() {
            return registry;
        }

        let mut kinds = self.kinds.write().unwrap_or_else(PoisonError::into_inner);
        let slot = kinds.entry(TypeId::of::<E>()).or_insert_with(|| {
            debug!(kind = E::kind_name(), "creating registry");
            KindSlot {
                name: E::kind_name(),
                registry: Arc::new(Registry::<E>::with_context(Arc::clone(&self.context))),
                len: registry_len::<E>,
            }
        });
        downcast::<E>(&slot.registry)
    }

    /// Returns the registry for `E` only if it already exists.
    fn existing<E: Event>(&self) -> Option<Arc<Registry<E>>> {
        let kinds = self.kinds.read().unwrap_or_else(PoisonError::into_inner);
        kinds
            .get(&TypeId::of::<E>())
            .map(|slot| downcast::<E>(&slot.registry))
    }

    /// Returns true if nobody listens to `E`.
    ///
    /// Does not create a registry, so producers can call it on every hot path
    /// and skip building the payload.
    pub fn is_empty<E: Event>(&self) -> bool {
        self.existing::<E>().map_or(true, |registry| registry.is_empty())
    }

    /// Delivers `event` to every listener of its kind.
    pub fn notify<E: Event>(&self, event: &E) {
        if let Some(registry) = self.existing::<E>() {
            registry.notify(event);
        }
    }

    /// Collects one response per listener of the query kind `Q`.
    pub fn query<Q>(&self, event: &Q) -> Vec<Q::Response>
    where
        Q: Query,
        Q::Handler: Responder<Q>,
    {
        self.existing::<Q>()
            .map(|registry| registry.query(event))
            .unwrap_or_default()
    }

    /// Like [`EventBus::query`], pairing each response with its listener's name.
    pub fn named_query<Q>(&self, event: &Q) -> Vec<(String, Q::Response)>
    where
        Q: Query,
        Q::Handler: Responder<Q>,
    {
        self.existing::<Q>()
            .map(|registry| registry.named_query(event))
            .unwrap_or_default()
    }

    /// Kinds known to this bus with their current listener counts, sorted by
    /// kind name.
    pub fn kinds(&self) -> Vec<(&'static str, usize)> {
        let kinds = self.kinds.read().unwrap_or_else(PoisonError::into_inner);
        let mut summary: Vec<_> = kinds
            .values()
            .map(|slot| (slot.name, (slot.len)(slot.registry.as_ref())))
            .collect();
        summary.sort_unstable_by_key(|(name, _)| *name);
        summary
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("config", &self.context.config)
            .field("kinds", &self.kinds())
            .finish()
    }
}

fn downcast<E: Event>(registry: &Arc<dyn Any + Send + Sync>) -> Arc<Registry<E>> {
    // Slots are keyed by TypeId::of::<E>(), so the stored registry is always Registry<E>.
    match Arc::clone(registry).downcast::<Registry<E>>() {
        Ok(registry) => registry,
        Err(_) => unreachable!("registry slot for {} holds another kind", E::kind_name()),
    }
}

fn registry_len<E: Event>(registry: &(dyn Any + Send + Sync)) -> usize {
    registry
        .downcast_ref::<Registry<E>>()
        .map_or(0, Registry::len)
}
