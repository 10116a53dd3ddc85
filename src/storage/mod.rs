//! Key-value persistence port.
//!
//! The session list, per-session message caches, and the avatar reference all
//! live under string keys. `FileStore` backs the real client; `MemoryStore` is
//! the in-process fake used by tests.

mod file;

pub use file::FileStore;

use crate::error::Result;
use crate::lock_or_recover;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Key holding the serialized session list.
pub const SESSIONS_KEY: &str = "ai-career-sessions";

/// Per-session message cache, evicted when the session is deleted.
pub fn message_cache_key(session_id: &str) -> String {
    format!("chat-messages-{session_id}")
}

/// Avatar image reference for one user.
pub fn avatar_key(user_id: &str) -> String {
    format!("ai-career-avatar-{user_id}")
}

/// Namespaced string storage. Reads that fail are reported as `None` by
/// implementations that cannot distinguish "absent" from "unreadable".
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    /// Removing a missing key is not an error.
    fn remove(&mut self, key: &str) -> Result<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

/// In-memory store. Clones share the same map so a test can keep a handle and
/// inspect what the component under test persisted.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        lock_or_recover(&self.entries, "MemoryStore::contains").contains_key(key)
    }

    pub fn len(&self) -> usize {
        lock_or_recover(&self.entries, "MemoryStore::len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(lock_or_recover(&self.entries, "MemoryStore::get")
            .get(key)
            .cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        lock_or_recover(&self.entries, "MemoryStore::set").insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        lock_or_recover(&self.entries, "MemoryStore::remove").remove(key);
        Ok(())
    }
}
