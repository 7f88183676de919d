use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

/// Process-lifetime record of event keys already acted on.
///
/// Check and record are one atomic step, so concurrent deliveries of the same
/// key resolve to exactly one `true`.
#[derive(Debug, Default)]
pub struct EventDedupGuard {
    seen: Mutex<HashSet<String>>,
}

impl EventDedupGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` the first time `key` is offered and `false` afterwards.
    pub fn should_process(&self, key: &str) -> bool {
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        if seen.contains(key) {
            return false;
        }
        seen.insert(key.to_string())
    }

    pub fn len(&self) -> usize {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
