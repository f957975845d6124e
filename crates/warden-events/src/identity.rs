//! Listener identity: per-instance ids and display names.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::warn;
use uuid::Uuid;

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);
static FALLBACK_NAME_SEQ: AtomicU64 = AtomicU64::new(1);

/// Identity of one listener instance.
///
/// Registry membership is keyed by this id, so two instances of the same
/// listener type are always distinct members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Allocates a fresh process-unique id.
    pub fn next() -> Self {
        Self(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw numeric value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

/// Mints a display name for a listener that was not given one.
///
/// Uses a random UUID. If the random source is unavailable the failure is
/// logged and a sequence-based name is returned instead; registration never
/// aborts because of naming.
pub fn mint_listener_name() -> String {
    mint_with(Uuid::new_v4)
}

fn mint_with<F>(generate: F) -> String
where
    F: FnOnce() -> Uuid,
{
    match panic::catch_unwind(AssertUnwindSafe(generate)) {
        Ok(uuid) => uuid.to_string(),
        Err(_) => {
            let fallback = format!("listener-{}", FALLBACK_NAME_SEQ.fetch_add(1, Ordering::Relaxed));
            warn!(
                fallback = %fallback,
                "random source unavailable, using non-random listener name"
            );
            fallback
        }
    }
}
