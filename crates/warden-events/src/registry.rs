//! Per-kind registry and the dispatch operations evaluated against it.
//!
//! # Concurrency Patterns
//!
//! - **`RwLock<Vec<Entry>>`**: membership changes (activate/deactivate) take
//!   the write lock, dispatch takes the read lock only long enough to copy the
//!   membership. Handlers run with no lock held, so a handler may unregister
//!   itself or a sibling without deadlocking or disturbing the current pass.
//! - **`Weak` handles**: the registry never keeps a listener alive. A handle
//!   whose owner is gone is not counted, is skipped by dispatch and is pruned
//!   the next time dispatch copies the membership.
//!
//! # Fault policy
//!
//! A handler that panics is caught, logged, reported to the fault observer and
//! contributes no entry to `query`/`named_query` results. The producer never
//! sees the panic.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};
use std::time::Instant;

use tracing::{trace, warn};

use crate::config::BusConfig;
use crate::error::{DispatchError, DispatchFault};
use crate::event::{Event, Listener, Query, Responder};
use crate::identity::ListenerId;

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

/// Callback receiving every contained handler fault.
pub type FaultObserver = Arc<dyn Fn(&DispatchFault) + Send + Sync>;

/// Identity of one registry instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistryId(u64);

impl RegistryId {
    fn next() -> Self {
        Self(NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Settings shared by all registries of one bus.
pub(crate) struct DispatchContext {
    pub(crate) config: BusConfig,
    pub(crate) observer: Option<FaultObserver>,
}

impl DispatchContext {
    pub(crate) fn new(config: BusConfig, observer: Option<FaultObserver>) -> Self {
        Self { config, observer }
    }
}

impl Default for DispatchContext {
    fn default() -> Self {
        Self::new(BusConfig::default(), None)
    }
}

/// A registry-held, non-owning handle to one listener for kind `E`.
pub struct Entry<E: Event> {
    id: ListenerId,
    name: Arc<str>,
    handler: Weak<E::Handler>,
}

impl<E: Event> Entry<E> {
    /// Creates a handle for `handler`, identified by `id` and shown as `name`.
    pub fn new(id: ListenerId, name: impl Into<Arc<str>>, handler: Weak<E::Handler>) -> Self {
        Self {
            id,
            name: name.into(),
            handler,
        }
    }

    /// The owning listener's id.
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// The owning listener's display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true while the handler's owner is alive.
    pub fn is_alive(&self) -> bool {
        self.handler.strong_count() > 0
    }
}

impl<E: Event> Clone for Entry<E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            name: Arc::clone(&self.name),
            handler: Weak::clone(&self.handler),
        }
    }
}

impl<E: Event> fmt::Debug for Entry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// The active membership for one event kind.
pub struct Registry<E: Event> {
    id: RegistryId,
    members: RwLock<Vec<Entry<E>>>,
    context: Arc<DispatchContext>,
}

impl<E: Event> Default for Registry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> fmt::Debug for Registry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("kind", &E::kind_name())
            .field("id", &self.id)
            .field("members", &self.len())
            .finish()
    }
}

impl<E: Event> Registry<E> {
    /// Creates a standalone registry with default settings.
    pub fn new() -> Self {
        Self::with_context(Arc::new(DispatchContext::default()))
    }

    pub(crate) fn with_context(context: Arc<DispatchContext>) -> Self {
        Self {
            id: RegistryId::next(),
            members: RwLock::new(Vec::new()),
            context,
        }
    }

    /// This registry's identity.
    pub fn id(&self) -> RegistryId {
        self.id
    }

    /// Adds `entry`. Returns false if its listener was already a member.
    pub fn activate(&self, entry: Entry<E>) -> bool {
        let mut members = self.members.write().unwrap_or_else(PoisonError::into_inner);
        if members.iter().any(|m| m.id == entry.id) {
            return false;
        }
        trace!(kind = E::kind_name(), listener = %entry.name, "activated");
        members.push(entry);
        true
    }

    /// Removes the listener `id`. Returns false if it was not a member.
    pub fn deactivate(&self, id: ListenerId) -> bool {
        let mut members = self.members.write().unwrap_or_else(PoisonError::into_inner);
        match members.iter().position(|m| m.id == id) {
            Some(index) => {
                let entry = members.remove(index);
                trace!(kind = E::kind_name(), listener = %entry.name, "deactivated");
                true
            }
            None => false,
        }
    }

    /// Returns true if the listener `id` is a live member.
    pub fn contains(&self, id: ListenerId) -> bool {
        self.members
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|m| m.id == id && m.is_alive())
    }

    /// Returns true if no live listener is active.
    pub fn is_empty(&self) -> bool {
        !self
            .members
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(Entry::is_alive)
    }

    /// Number of live active listeners.
    pub fn len(&self) -> usize {
        self.members
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|m| m.is_alive())
            .count()
    }

    /// Display names of the live active listeners, in registration order.
    pub fn listener_names(&self) -> Vec<String> {
        self.members
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|m| m.is_alive())
            .map(|m| m.name.to_string())
            .collect()
    }

    /// Copies the live membership, pruning handles whose owner is gone.
    /// Dispatch iterates the copy.
    fn snapshot(&self) -> Vec<Entry<E>> {
        let members = self.members.read().unwrap_or_else(PoisonError::into_inner).clone();
        if members.iter().all(Entry::is_alive) {
            return members;
        }

        self.prune();
        members.into_iter().filter(Entry::is_alive).collect()
    }

    fn prune(&self) {
        let mut members = self.members.write().unwrap_or_else(PoisonError::into_inner);
        let before = members.len();
        members.retain(Entry::is_alive);
        trace!(
            kind = E::kind_name(),
            pruned = before - members.len(),
            "pruned dropped listeners"
        );
    }

    /// Delivers `event` to every active listener's `upon` hook.
    pub fn notify(&self, event: &E) {
        let members = self.snapshot();
        trace!(kind = E::kind_name(), listeners = members.len(), "notify");
        for entry in &members {
            self.invoke(entry, |handler| handler.upon(event));
        }
    }

    /// Runs `call` against one handle with fault containment.
    ///
    /// Returns `None` when the owner is gone or the handler panicked.
    fn invoke<R>(&self, entry: &Entry<E>, call: impl FnOnce(&E::Handler) -> R) -> Option<R> {
        let Some(handler) = entry.handler.upgrade() else {
            trace!(kind = E::kind_name(), listener = %entry.name, "skipping dropped listener");
            return None;
        };

        let started = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| call(&*handler)));
        let elapsed = started.elapsed();

        if let Some(threshold) = self.context.config.slow_handler_threshold {
            if elapsed > threshold {
                warn!(
                    kind = E::kind_name(),
                    listener = %entry.name,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "slow event handler"
                );
            }
        }

        match outcome {
            Ok(value) => Some(value),
            Err(payload) => {
                self.report(entry, DispatchError::from_panic(payload));
                None
            }
        }
    }

    fn report(&self, entry: &Entry<E>, error: DispatchError) {
        if self.context.config.log_faults {
            warn!(
                kind = E::kind_name(),
                listener = %entry.name,
                error = %error,
                "event handler failed"
            );
        }

        if let Some(observer) = &self.context.observer {
            let fault = DispatchFault {
                kind: E::kind_name(),
                listener_id: entry.id,
                listener: entry.name.to_string(),
                error,
            };
            if panic::catch_unwind(AssertUnwindSafe(|| observer(&fault))).is_err() {
                warn!(kind = E::kind_name(), "fault observer panicked");
            }
        }
    }
}

impl<Q> Registry<Q>
where
    Q: Query,
    Q::Handler: Responder<Q>,
{
    /// Collects one response per active listener, in registration order.
    pub fn query(&self, event: &Q) -> Vec<Q::Response> {
        let members = self.snapshot();
        trace!(kind = Q::kind_name(), listeners = members.len(), "query");
        members
            .iter()
            .filter_map(|entry| self.invoke(entry, |handler| handler.respond(event)))
            .collect()
    }

    /// Like [`Registry::query`], pairing each response with its listener's name.
    pub fn named_query(&self, event: &Q) -> Vec<(String, Q::Response)> {
        let members = self.snapshot();
        trace!(kind = Q::kind_name(), listeners = members.len(), "named query");
        members
            .iter()
            .filter_map(|entry| {
                self.invoke(entry, |handler| handler.respond(event))
                    .map(|response| (entry.name.to_string(), response))
            })
            .collect()
    }
}
