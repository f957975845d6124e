//! A ready-made health responder for components that only need to report a
//! settable status.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, Weak};

use tracing::{debug, trace};
use warden_events::{Capability, EventBus, Listener, ListenerLifecycle, Responder};

use crate::status::{HealthCheckEvent, HealthCheckReply, HealthStatus};

/// Health responder owned by one component.
///
/// Registered on the bus for as long as the returned `Arc` lives.
pub struct ComponentHealth {
    lifecycle: ListenerLifecycle,
    status: RwLock<HealthStatus>,
    details: RwLock<BTreeMap<String, String>>,
}

impl ComponentHealth {
    /// Creates a healthy responder named `component` and registers it.
    pub fn register(bus: &EventBus, component: impl Into<String>) -> Arc<Self> {
        Self::register_with_status(bus, component, HealthStatus::Healthy)
    }

    /// Creates a responder with an initial status and registers it.
    pub fn register_with_status(
        bus: &EventBus,
        component: impl Into<String>,
        status: HealthStatus,
    ) -> Arc<Self> {
        let component = component.into();
        let health = Arc::new_cyclic(|me: &Weak<ComponentHealth>| {
            let lifecycle = ListenerLifecycle::new(component);
            lifecycle.contribute(Capability::<HealthCheckEvent>::responder(bus, me.clone()));
            ComponentHealth {
                lifecycle,
                status: RwLock::new(status),
                details: RwLock::new(BTreeMap::new()),
            }
        });
        health.lifecycle.register();
        health
    }

    /// Component name reported in replies.
    pub fn component(&self) -> &str {
        self.lifecycle.name()
    }

    /// The responder's lifecycle, for explicit unregister/register.
    pub fn lifecycle(&self) -> &ListenerLifecycle {
        &self.lifecycle
    }

    /// Current status.
    pub fn status(&self) -> HealthStatus {
        *self.status.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Changes the reported status.
    pub fn set_status(&self, status: HealthStatus) {
        let mut current = self.status.write().unwrap_or_else(PoisonError::into_inner);
        if *current != status {
            debug!(component = %self.component(), from = %*current, to = %status, "health status changed");
            *current = status;
        }
    }

    /// Sets one extended status entry.
    pub fn set_detail(&self, key: impl Into<String>, value: impl Into<String>) {
        self.details
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into());
    }

    /// Removes one extended status entry.
    pub fn clear_detail(&self, key: &str) {
        self.details
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}

impl Listener<HealthCheckEvent> for ComponentHealth {
    fn upon(&self, event: &HealthCheckEvent) {
        trace!(
            component = %self.component(),
            requested_by = event.requested_by.as_deref().unwrap_or("-"),
            "health check announced"
        );
    }
}

impl Responder<HealthCheckEvent> for ComponentHealth {
    fn respond(&self, _event: &HealthCheckEvent) -> HealthCheckReply {
        let mut reply = HealthCheckReply::new(self.component(), self.status());
        reply.extended_status = self
            .details
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        reply
    }
}
