//! Listener lifecycle: registering one component in all of its registries.
//!
//! A component owns exactly one [`ListenerLifecycle`] and contributes one
//! activation/deactivation pair per capability. `register()` and
//! `unregister()` then move the component in or out of every registry at
//! once, and dropping the lifecycle (normally as a field of the component)
//! unregisters it.
//!
//! # State machine
//!
//! ```text
//! Unregistered --register()--> Activating --> Registered
//! Registered --unregister()--> Deactivating --> Unregistered
//! ```
//!
//! Calls outside a valid edge are no-ops, including calls made from inside a
//! hook of the same lifecycle.

use std::borrow::Cow;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace, warn};

use crate::capability::Capability;
use crate::error::{panic_message, DispatchError};
use crate::event::Event;
use crate::identity::{mint_listener_name, ListenerId};
use crate::registry::{Entry, RegistryId};

const UNREGISTERED: u8 = 0;
const ACTIVATING: u8 = 1;
const REGISTERED: u8 = 2;
const DEACTIVATING: u8 = 3;

/// Observable lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Not a member of any registry.
    Unregistered,
    /// `register()` is running its activations.
    Activating,
    /// Member of every contributed registry.
    Registered,
    /// `unregister()` is running its deactivations.
    Deactivating,
}

impl LifecycleState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            ACTIVATING => Self::Activating,
            REGISTERED => Self::Registered,
            DEACTIVATING => Self::Deactivating,
            _ => Self::Unregistered,
        }
    }
}

/// Key deduplicating contributions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HookKey {
    /// Membership in one registry.
    Registry(RegistryId),
    /// A caller-defined hook.
    Named(Cow<'static, str>),
}

impl From<&'static str> for HookKey {
    fn from(name: &'static str) -> Self {
        Self::Named(Cow::Borrowed(name))
    }
}

impl From<String> for HookKey {
    fn from(name: String) -> Self {
        Self::Named(Cow::Owned(name))
    }
}

type HookFn = Box<dyn Fn() + Send + Sync>;

struct Hook {
    key: HookKey,
    activate: HookFn,
    deactivate: HookFn,
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Activate,
    Deactivate,
}

/// Per-instance registration state and the hooks it runs.
pub struct ListenerLifecycle {
    id: ListenerId,
    name: Arc<str>,
    state: AtomicU8,
    hooks: Mutex<Vec<Arc<Hook>>>,
}

impl ListenerLifecycle {
    /// Creates an unregistered lifecycle with a display name.
    pub fn new(name: impl Into<String>) -> Self {
        let name: String = name.into();
        Self {
            id: ListenerId::next(),
            name: Arc::from(name),
            state: AtomicU8::new(UNREGISTERED),
            hooks: Mutex::new(Vec::new()),
        }
    }

    /// Creates an unregistered lifecycle with a minted display name.
    pub fn unnamed() -> Self {
        Self::new(mint_listener_name())
    }

    /// This listener's id.
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// This listener's display name, as reported by named queries.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state.
    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_raw(self.state.load(Ordering::Acquire))
    }

    /// Returns true while registered.
    pub fn is_registered(&self) -> bool {
        self.state() == LifecycleState::Registered
    }

    /// Number of contributed hooks.
    pub fn capability_count(&self) -> usize {
        self.lock_hooks().len()
    }

    /// Contributes membership in `capability`'s registry.
    ///
    /// Returns false if this lifecycle already contributed to that registry.
    pub fn contribute<E: Event>(&self, capability: Capability<E>) -> bool {
        let Capability { registry, handler } = capability;
        let key = HookKey::Registry(registry.id());
        let id = self.id;
        let name = Arc::clone(&self.name);
        let deactivate_registry = Arc::clone(&registry);

        self.contribute_hooks(
            key,
            move || {
                registry.activate(Entry::<E>::new(id, Arc::clone(&name), handler.clone()));
            },
            move || {
                deactivate_registry.deactivate(id);
            },
        )
    }

    /// Contributes an arbitrary activation/deactivation pair under `key`.
    ///
    /// A second contribution with the same key is ignored. If the lifecycle is
    /// already registered, `activate` runs immediately, with no lock held, so
    /// it may call back into this lifecycle.
    ///
    /// Hooks must tolerate a repeated activation or deactivation: a late
    /// contribution racing a concurrent `unregister()` is deactivated again
    /// once its activation has run. Registry hooks are idempotent.
    pub fn contribute_hooks<A, D>(&self, key: impl Into<HookKey>, activate: A, deactivate: D) -> bool
    where
        A: Fn() + Send + Sync + 'static,
        D: Fn() + Send + Sync + 'static,
    {
        let key = key.into();
        let hook = {
            let mut hooks = self.lock_hooks();
            if hooks.iter().any(|hook| hook.key == key) {
                trace!(listener = %self.name, ?key, "duplicate contribution ignored");
                return false;
            }

            let hook = Arc::new(Hook {
                key,
                activate: Box::new(activate),
                deactivate: Box::new(deactivate),
            });
            hooks.push(Arc::clone(&hook));

            // A register() in progress picks the hook up from the list itself.
            if self.state.load(Ordering::Acquire) != REGISTERED {
                return true;
            }
            hook
        };

        self.run(&hook, Phase::Activate);

        // An unregister() that started meanwhile may have deactivated this hook
        // before it was activated.
        if matches!(self.state.load(Ordering::Acquire), UNREGISTERED | DEACTIVATING) {
            self.run(&hook, Phase::Deactivate);
        }
        true
    }

    /// Activates every contributed hook, in contribution order.
    pub fn register(&self) {
        if self
            .state
            .compare_exchange(UNREGISTERED, ACTIVATING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            trace!(listener = %self.name, state = ?self.state(), "register ignored");
            return;
        }

        let mut done = 0;
        loop {
            let pending: Vec<Arc<Hook>> = {
                let hooks = self.lock_hooks();
                if hooks.len() == done {
                    self.state.store(REGISTERED, Ordering::Release);
                    break;
                }
                hooks[done..].to_vec()
            };
            for hook in &pending {
                self.run(hook, Phase::Activate);
            }
            done += pending.len();
        }

        debug!(listener = %self.name, capabilities = done, "listener registered");
    }

    /// Deactivates every contributed hook. Never fails.
    pub fn unregister(&self) {
        if self
            .state
            .compare_exchange(REGISTERED, DEACTIVATING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            trace!(listener = %self.name, state = ?self.state(), "unregister ignored");
            return;
        }

        let hooks: Vec<Arc<Hook>> = self.lock_hooks().clone();
        for hook in &hooks {
            self.run(hook, Phase::Deactivate);
        }
        self.state.store(UNREGISTERED, Ordering::Release);

        debug!(listener = %self.name, capabilities = hooks.len(), "listener unregistered");
    }

    fn run(&self, hook: &Hook, phase: Phase) {
        let action = match phase {
            Phase::Activate => &hook.activate,
            Phase::Deactivate => &hook.deactivate,
        };
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| action())) {
            let error = DispatchError::HookPanicked(panic_message(payload.as_ref()));
            warn!(
                listener = %self.name,
                key = ?hook.key,
                phase = ?phase,
                error = %error,
                "lifecycle hook failed"
            );
        }
    }

    fn lock_hooks(&self) -> MutexGuard<'_, Vec<Arc<Hook>>> {
        self.hooks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ListenerLifecycle {
    fn drop(&mut self) {
        self.unregister();
    }
}

impl fmt::Debug for ListenerLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerLifecycle")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("state", &self.state())
            .field("capabilities", &self.capability_count())
            .finish()
    }
}
