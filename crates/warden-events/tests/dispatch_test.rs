//! Integration tests for registration, fan-out and fault containment.

use std::io;
use std::sync::{Arc, Mutex, Weak};
use std::thread;

use warden_events::{
    BusConfig, Capability, DispatchError, DispatchFault, Event, EventBus, Listener,
    ListenerLifecycle, Query, Responder,
};

struct Ping;

impl Event for Ping {
    type Handler = dyn Listener<Ping>;
}

struct HealthCheck;

impl Event for HealthCheck {
    type Handler = dyn Responder<HealthCheck>;
}

impl Query for HealthCheck {
    type Response = String;
}

struct Version;

impl Event for Version {
    type Handler = dyn Responder<Version>;
}

impl Query for Version {
    type Response = u32;
}

type CallLog = Arc<Mutex<Vec<String>>>;

/// Ping listener that records its name and can misbehave on demand.
struct PingProbe {
    lifecycle: ListenerLifecycle,
    log: CallLog,
    panics: bool,
    on_ping: Mutex<Option<Box<dyn Fn() + Send + Sync>>>,
}

impl Listener<Ping> for PingProbe {
    fn upon(&self, _: &Ping) {
        self.log.lock().unwrap().push(self.lifecycle.name().to_string());
        if let Some(action) = self.on_ping.lock().unwrap().as_ref() {
            action();
        }
        if self.panics {
            panic!("{} cannot handle ping", self.lifecycle.name());
        }
    }
}

fn ping_probe(bus: &EventBus, name: &str, log: &CallLog, panics: bool) -> Arc<PingProbe> {
    let probe = Arc::new_cyclic(|me: &Weak<PingProbe>| {
        let lifecycle = ListenerLifecycle::new(name);
        lifecycle.contribute(Capability::<Ping>::listener(bus, me.clone()));
        PingProbe {
            lifecycle,
            log: Arc::clone(log),
            panics,
            on_ping: Mutex::new(None),
        }
    });
    probe.lifecycle.register();
    probe
}

/// HealthCheck responder with a fixed answer.
struct StatusProbe {
    lifecycle: ListenerLifecycle,
    answer: String,
}

impl Listener<HealthCheck> for StatusProbe {
    fn upon(&self, _: &HealthCheck) {}
}

impl Responder<HealthCheck> for StatusProbe {
    fn respond(&self, _: &HealthCheck) -> String {
        if self.answer == "panic" {
            panic!("status unavailable");
        }
        self.answer.clone()
    }
}

fn status_probe(bus: &EventBus, name: &str, answer: &str) -> Arc<StatusProbe> {
    let probe = Arc::new_cyclic(|me: &Weak<StatusProbe>| {
        let lifecycle = ListenerLifecycle::new(name);
        lifecycle.contribute(Capability::<HealthCheck>::responder(bus, me.clone()));
        StatusProbe {
            lifecycle,
            answer: answer.to_string(),
        }
    });
    probe.lifecycle.register();
    probe
}

/// Component handling two query kinds through one lifecycle.
struct DualComponent {
    lifecycle: ListenerLifecycle,
    health_calls: Mutex<u32>,
    version_calls: Mutex<u32>,
    notified: Mutex<Vec<&'static str>>,
}

impl Listener<HealthCheck> for DualComponent {
    fn upon(&self, _: &HealthCheck) {
        self.notified.lock().unwrap().push("health");
    }
}

impl Responder<HealthCheck> for DualComponent {
    fn respond(&self, _: &HealthCheck) -> String {
        *self.health_calls.lock().unwrap() += 1;
        "dual ok".to_string()
    }
}

impl Listener<Version> for DualComponent {
    fn upon(&self, _: &Version) {
        self.notified.lock().unwrap().push("version");
    }
}

impl Responder<Version> for DualComponent {
    fn respond(&self, _: &Version) -> u32 {
        *self.version_calls.lock().unwrap() += 1;
        15
    }
}

fn dual_component(bus: &EventBus) -> Arc<DualComponent> {
    Arc::new_cyclic(|me: &Weak<DualComponent>| {
        let lifecycle = ListenerLifecycle::new("DualComponent");
        lifecycle.contribute(Capability::<HealthCheck>::responder(bus, me.clone()));
        lifecycle.contribute(Capability::<Version>::responder(bus, me.clone()));
        DualComponent {
            lifecycle,
            health_calls: Mutex::new(0),
            version_calls: Mutex::new(0),
            notified: Mutex::new(Vec::new()),
        }
    })
}

fn new_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

fn quiet_bus() -> EventBus {
    EventBus::with_config(BusConfig::new().without_slow_handler_check())
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

#[test]
fn test_empty_kinds_do_nothing() {
    let bus = quiet_bus();

    assert!(bus.is_empty::<Ping>());
    assert!(bus.is_empty::<HealthCheck>());

    bus.notify(&Ping);
    bus.notify(&HealthCheck);
    assert!(bus.query(&HealthCheck).is_empty());
    assert!(bus.named_query(&HealthCheck).is_empty());
    assert!(bus.query(&Version).is_empty());
}

#[test]
fn test_notify_follows_registration_order_after_unregister() {
    let bus = quiet_bus();
    let log = new_log();
    let _a = ping_probe(&bus, "A", &log, false);
    let b = ping_probe(&bus, "B", &log, false);
    let _c = ping_probe(&bus, "C", &log, false);

    bus.notify(&Ping);
    assert_eq!(*log.lock().unwrap(), vec!["A", "B", "C"]);

    b.lifecycle.unregister();
    log.lock().unwrap().clear();

    bus.notify(&Ping);
    assert_eq!(*log.lock().unwrap(), vec!["A", "C"]);
}

#[test]
fn test_named_query_pairs_names_with_responses() {
    let bus = quiet_bus();
    let _x = status_probe(&bus, "x", "ok");
    let _y = status_probe(&bus, "y", "degraded");

    assert_eq!(
        bus.named_query(&HealthCheck),
        vec![
            ("x".to_string(), "ok".to_string()),
            ("y".to_string(), "degraded".to_string()),
        ]
    );
}

#[test]
fn test_panicking_listener_does_not_stop_fan_out() {
    let faults: Arc<Mutex<Vec<DispatchFault>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&faults);
    let bus = EventBus::with_fault_observer(
        BusConfig::new().without_slow_handler_check(),
        move |fault| sink.lock().unwrap().push(fault.clone()),
    );

    let log = new_log();
    let _a = ping_probe(&bus, "A", &log, false);
    let _b = ping_probe(&bus, "B", &log, true);
    let _c = ping_probe(&bus, "C", &log, false);

    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    tracing::subscriber::with_default(subscriber, || bus.notify(&Ping));

    assert_eq!(*log.lock().unwrap(), vec!["A", "B", "C"]);

    let faults = faults.lock().unwrap();
    assert_eq!(faults.len(), 1);
    assert_eq!(faults[0].listener, "B");
    assert_eq!(
        faults[0].error,
        DispatchError::Panicked("B cannot handle ping".to_string())
    );

    let output = logs.contents();
    assert!(output.contains("event handler failed"));
    assert!(output.contains("B cannot handle ping"));
}

#[test]
fn test_panicking_responder_contributes_no_entry() {
    let bus = quiet_bus();
    let _x = status_probe(&bus, "x", "ok");
    let _bad = status_probe(&bus, "bad", "panic");
    let _z = status_probe(&bus, "z", "degraded");

    assert_eq!(bus.query(&HealthCheck), vec!["ok", "degraded"]);
    let names: Vec<String> = bus
        .named_query(&HealthCheck)
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    assert_eq!(names, vec!["x", "z"]);
}

#[test]
fn test_register_appears_exactly_once() {
    let bus = quiet_bus();
    let x = status_probe(&bus, "x", "ok");
    x.lifecycle.register();

    assert_eq!(bus.named_query(&HealthCheck).len(), 1);

    x.lifecycle.unregister();
    x.lifecycle.unregister();
    assert!(bus.named_query(&HealthCheck).is_empty());
    assert!(bus.is_empty::<HealthCheck>());
}

#[test]
fn test_drop_without_unregister_removes_listener() {
    let bus = quiet_bus();
    let log = new_log();
    let a = ping_probe(&bus, "A", &log, false);
    let registry = bus.registry::<Ping>();
    assert_eq!(registry.len(), 1);

    drop(a);

    assert!(registry.is_empty());
    bus.notify(&Ping);
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn test_query_matches_registration_order() {
    let bus = quiet_bus();
    let probes: Vec<_> = (0..5)
        .map(|i| status_probe(&bus, &format!("probe-{}", i), &format!("answer-{}", i)))
        .collect();

    let responses = bus.query(&HealthCheck);
    assert_eq!(responses.len(), probes.len());
    for (i, response) in responses.iter().enumerate() {
        assert_eq!(response, &format!("answer-{}", i));
    }

    let named = bus.named_query(&HealthCheck);
    for (i, (name, response)) in named.iter().enumerate() {
        assert_eq!(name, &format!("probe-{}", i));
        assert_eq!(response, &format!("answer-{}", i));
    }
}

#[test]
fn test_dual_component_is_never_cross_invoked() {
    let bus = quiet_bus();
    let dual = dual_component(&bus);
    dual.lifecycle.register();
    assert_eq!(dual.lifecycle.capability_count(), 2);

    assert_eq!(bus.query(&Version), vec![15]);
    assert_eq!(*dual.version_calls.lock().unwrap(), 1);
    assert_eq!(*dual.health_calls.lock().unwrap(), 0);

    assert_eq!(
        bus.named_query(&HealthCheck),
        vec![("DualComponent".to_string(), "dual ok".to_string())]
    );
    assert_eq!(*dual.health_calls.lock().unwrap(), 1);
    assert_eq!(*dual.version_calls.lock().unwrap(), 1);

    bus.notify(&Version);
    bus.notify(&HealthCheck);
    assert_eq!(*dual.notified.lock().unwrap(), vec!["version", "health"]);

    dual.lifecycle.unregister();
    assert!(bus.query(&Version).is_empty());
    assert!(bus.named_query(&HealthCheck).is_empty());
}

#[test]
fn test_self_unregistration_mid_dispatch() {
    let bus = quiet_bus();
    let log = new_log();
    let _a = ping_probe(&bus, "A", &log, false);
    let b = ping_probe(&bus, "B", &log, false);
    let _c = ping_probe(&bus, "C", &log, false);

    let weak_b = Arc::downgrade(&b);
    *b.on_ping.lock().unwrap() = Some(Box::new(move || {
        if let Some(b) = weak_b.upgrade() {
            b.lifecycle.unregister();
        }
    }));

    bus.notify(&Ping);
    assert_eq!(*log.lock().unwrap(), vec!["A", "B", "C"]);
    assert_eq!(bus.registry::<Ping>().listener_names(), vec!["A", "C"]);

    log.lock().unwrap().clear();
    bus.notify(&Ping);
    assert_eq!(*log.lock().unwrap(), vec!["A", "C"]);
}

#[test]
fn test_unregistering_pending_sibling_mid_dispatch() {
    let bus = quiet_bus();
    let log = new_log();
    let a = ping_probe(&bus, "A", &log, false);
    let b = ping_probe(&bus, "B", &log, false);
    let _c = ping_probe(&bus, "C", &log, false);

    let weak_b = Arc::downgrade(&b);
    *a.on_ping.lock().unwrap() = Some(Box::new(move || {
        if let Some(b) = weak_b.upgrade() {
            b.lifecycle.unregister();
        }
    }));

    // B was in the membership when the pass started, so it still runs once.
    bus.notify(&Ping);
    assert_eq!(*log.lock().unwrap(), vec!["A", "B", "C"]);

    log.lock().unwrap().clear();
    bus.notify(&Ping);
    assert_eq!(*log.lock().unwrap(), vec!["A", "C"]);
}

#[test]
fn test_concurrent_registration_and_dispatch() {
    let bus = Arc::new(quiet_bus());
    let log = new_log();
    let mut handles = vec![];

    for i in 0..8 {
        let bus = Arc::clone(&bus);
        let log = Arc::clone(&log);
        handles.push(thread::spawn(move || {
            for _ in 0..20 {
                let probe = ping_probe(&bus, &format!("t{}", i), &log, false);
                bus.notify(&Ping);
                probe.lifecycle.unregister();
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert!(bus.is_empty::<Ping>());
    assert!(!log.lock().unwrap().is_empty());
}

#[test]
fn test_dropped_foreign_handler_is_not_counted() {
    let bus = quiet_bus();
    let log = new_log();
    let _a = ping_probe(&bus, "A", &log, false);

    // Handler owned outside the lifecycle, so nothing deactivates it on drop.
    let detached = Arc::new(PingProbe {
        lifecycle: ListenerLifecycle::new("detached"),
        log: Arc::clone(&log),
        panics: false,
        on_ping: Mutex::new(None),
    });
    let lifecycle = ListenerLifecycle::new("detached-owner");
    let handler: Weak<dyn Listener<Ping>> = Arc::downgrade(&detached) as Weak<dyn Listener<Ping>>;
    lifecycle.contribute(Capability::new(bus.registry::<Ping>(), handler));
    lifecycle.register();
    assert_eq!(bus.registry::<Ping>().len(), 2);

    drop(detached);

    assert_eq!(bus.kinds(), vec![(Ping::kind_name(), 1)]);
    assert_eq!(bus.registry::<Ping>().listener_names(), vec!["A"]);
    bus.notify(&Ping);
    assert_eq!(*log.lock().unwrap(), vec!["A"]);
    assert!(lifecycle.is_registered());
}
