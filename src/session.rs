//! Session-scoped key/value store.
//!
//! Values live as long as the process: they survive subject switches and
//! remounts of the feed, but not a restart.
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, OnceLock};

/// String store that outlives individual views.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
}

/// In-memory [`SessionStore`].
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> MutexGuard<'_, HashMap<String, String>> {
        // A panic while holding the lock cannot leave a half-written String
        // behind, so the map is still usable.
        self.values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        tracing::trace!(key, "Session value updated");
        self.values().insert(key.to_string(), value.to_string());
    }
}

/// The process-wide session store.
pub fn global() -> &'static MemorySessionStore {
    static STORE: OnceLock<MemorySessionStore> = OnceLock::new();
    STORE.get_or_init(MemorySessionStore::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_missing_key() {
        let store = MemorySessionStore::new();
        assert_eq!(store.get("search-query"), None);
    }

    #[test]
    fn test_set_overwrites() {
        let store = MemorySessionStore::new();
        store.set("search-query", "cat");
        store.set("search-query", "dog");
        assert_eq!(store.get("search-query").as_deref(), Some("dog"));
    }

    #[test]
    fn test_global_is_shared() {
        global().set("session-test-key", "v1");
        assert_eq!(global().get("session-test-key").as_deref(), Some("v1"));
    }
}
