//! Agent wiring: one bus, the components given on the command line, and the
//! configuration audit listener.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tracing::info;
use warden_events::{Capability, Event, EventBus, Listener, ListenerLifecycle, Responder};
use warden_health::{ComponentHealth, HealthCheckEvent, HealthCheckReply, HealthStatus};

use crate::cli::ComponentSpec;

/// Sent after the agent (re)loads its configuration.
#[derive(Debug, Clone)]
pub struct ConfigReloaded {
    /// Where the configuration came from.
    pub source: String,
}

impl Event for ConfigReloaded {
    type Handler = dyn Listener<ConfigReloaded>;
}

/// Tracks configuration reloads and reports them as part of health.
pub struct ConfigAudit {
    lifecycle: ListenerLifecycle,
    reloads: AtomicU64,
    last_source: Mutex<Option<String>>,
}

impl ConfigAudit {
    /// Creates the audit listener and registers it on `bus`.
    pub fn start(bus: &EventBus) -> Arc<Self> {
        let audit = Arc::new_cyclic(|me: &Weak<ConfigAudit>| {
            let lifecycle = ListenerLifecycle::new("config-audit");
            lifecycle.contribute(Capability::<ConfigReloaded>::listener(bus, me.clone()));
            lifecycle.contribute(Capability::<HealthCheckEvent>::responder(bus, me.clone()));
            ConfigAudit {
                lifecycle,
                reloads: AtomicU64::new(0),
                last_source: Mutex::new(None),
            }
        });
        audit.lifecycle.register();
        audit
    }

    /// Number of reloads observed.
    pub fn reloads(&self) -> u64 {
        self.reloads.load(Ordering::Relaxed)
    }
}

impl Listener<ConfigReloaded> for ConfigAudit {
    fn upon(&self, event: &ConfigReloaded) {
        let count = self.reloads.fetch_add(1, Ordering::Relaxed) + 1;
        *self.last_source.lock().unwrap_or_else(PoisonError::into_inner) = Some(event.source.clone());
        info!(source = %event.source, reloads = count, "configuration reloaded");
    }
}

impl Listener<HealthCheckEvent> for ConfigAudit {
    fn upon(&self, _event: &HealthCheckEvent) {}
}

impl Responder<HealthCheckEvent> for ConfigAudit {
    fn respond(&self, _event: &HealthCheckEvent) -> HealthCheckReply {
        let source = self
            .last_source
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match source {
            Some(source) => HealthCheckReply::new(self.lifecycle.name(), HealthStatus::Healthy)
                .with_detail("source", source)
                .with_detail("reloads", self.reloads().to_string()),
            None => HealthCheckReply::new(self.lifecycle.name(), HealthStatus::Degraded)
                .with_detail("reason", "configuration never loaded"),
        }
    }
}

/// A running agent: the bus and everything registered on it.
pub struct Agent {
    bus: Arc<EventBus>,
    audit: Arc<ConfigAudit>,
    components: Vec<Arc<ComponentHealth>>,
}

impl Agent {
    /// Builds a bus and registers the audit listener plus one health responder
    /// per component.
    pub fn start(components: &[ComponentSpec]) -> Self {
        let bus = Arc::new(EventBus::new());
        let audit = ConfigAudit::start(&bus);
        let components = components
            .iter()
            .map(|spec| ComponentHealth::register_with_status(&bus, spec.name.clone(), spec.status))
            .collect();
        Self {
            bus,
            audit,
            components,
        }
    }

    /// The agent's bus.
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// The configuration audit listener.
    pub fn audit(&self) -> &Arc<ConfigAudit> {
        &self.audit
    }

    /// Registered component responders.
    pub fn components(&self) -> &[Arc<ComponentHealth>] {
        &self.components
    }

    /// Announces a configuration reload.
    pub fn reload_config(&self, source: &str) {
        if self.bus.is_empty::<ConfigReloaded>() {
            return;
        }
        self.bus.notify(&ConfigReloaded {
            source: source.to_string(),
        });
    }
}
