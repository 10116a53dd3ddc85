//! Per-user avatar reference, stored next to the session list.

use crate::error::Result;
use crate::storage::{avatar_key, KeyValueStore};

pub struct ProfileStore {
    storage: Box<dyn KeyValueStore>,
}

impl ProfileStore {
    pub fn new(storage: Box<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// Stored avatar reference (path, URL, or data URI), if any.
    pub fn avatar(&self, user_id: &str) -> Result<Option<String>> {
        Ok(self
            .storage
            .get(&avatar_key(user_id))?
            .filter(|value| !value.trim().is_empty()))
    }

    /// Blank references clear the avatar instead of storing an empty value.
    pub fn set_avatar(&mut self, user_id: &str, reference: &str) -> Result<()> {
        let reference = reference.trim();
        if reference.is_empty() {
            return self.clear_avatar(user_id);
        }
        self.storage.set(&avatar_key(user_id), reference)
    }

    pub fn clear_avatar(&mut self, user_id: &str) -> Result<()> {
        self.storage.remove(&avatar_key(user_id))
    }
}
