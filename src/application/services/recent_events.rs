use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Remembers recently seen event keys for a while, dropping repeats.
///
/// This only suppresses duplicates within one process. Across instances the
/// create-if-absent on the upload job is what prevents a second dispatch.
pub struct RecentEvents {
    ttl: Duration,
    seen: Mutex<HashMap<String, Instant>>,
}

impl RecentEvents {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Records `key` and returns `true` unless it was already seen within the TTL.
    pub fn first_seen(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut seen = match self.seen.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        seen.retain(|_, at| now.duration_since(*at) < self.ttl);

        if seen.contains_key(key) {
            return false;
        }
        seen.insert(key.to_string(), now);
        true
    }

    /// Forgets `key`, letting a later event for it through again.
    pub fn forget(&self, key: &str) {
        let mut seen = match self.seen.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        seen.remove(key);
    }
}
