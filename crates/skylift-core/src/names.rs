//! Name generation for applications and instances.
//!
//! Application and worker names carry a short hash suffix so repeated
//! clusters (and repeated workers within one cluster) never collide; the
//! scheduler name is deterministic so a cluster has exactly one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a unique application name, e.g. `skylift-3fa9c17b`.
pub fn app_name(prefix: &str) -> String {
    format!("{prefix}-{}", suffix(prefix))
}

/// The deterministic scheduler instance name for an application.
pub fn scheduler_name(app: &str) -> String {
    format!("{app}-scheduler")
}

/// Generate a unique worker instance name, e.g. `skylift-3fa9c17b-worker-9c2e01aa`.
pub fn worker_name(app: &str) -> String {
    format!("{app}-worker-{}", suffix(app))
}

/// Short unique hash suffix from a salt, the wall clock, and a counter.
fn suffix(salt: &str) -> String {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    salt.hash(&mut hasher);
    epoch_secs().hash(&mut hasher);
    COUNTER.fetch_add(1, Ordering::Relaxed).hash(&mut hasher);
    format!("{:08x}", hasher.finish() as u32)
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
