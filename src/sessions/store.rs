use super::{Folder, Session};
use crate::api::ChatApi;
use crate::config::DEFAULT_USER_NAME;
use crate::error::{MentorError, Result};
use crate::log_debug;
use crate::storage::{message_cache_key, KeyValueStore, SESSIONS_KEY};
use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

type Clock = Box<dyn Fn() -> u64 + Send>;

fn system_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Authoritative, newest-first list of session metadata.
///
/// Every mutation rewrites the whole list to storage right away. A failed
/// write is returned to the caller but the in-memory change stays, so the UI
/// keeps showing what the user did.
pub struct SessionStore {
    storage: Box<dyn KeyValueStore>,
    sessions: Vec<Session>,
    clock: Clock,
}

impl SessionStore {
    /// Empty store; call [`SessionStore::load`] to read persisted state.
    pub fn new(storage: Box<dyn KeyValueStore>) -> Self {
        Self {
            storage,
            sessions: Vec::new(),
            clock: Box::new(system_now_ms),
        }
    }

    /// Build and load in one step; a corrupt payload is logged and the store starts empty.
    pub fn open(storage: Box<dyn KeyValueStore>) -> Self {
        let mut store = Self::new(storage);
        if let Err(err) = store.load() {
            log_debug(&format!("session list ignored: {err}"));
        }
        store
    }

    pub fn with_clock(mut self, clock: impl Fn() -> u64 + Send + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Replace the in-memory list with the persisted one.
    ///
    /// Returns the number of sessions loaded. On `StorageCorrupt` the store is
    /// already reset to empty and remains fully usable.
    pub fn load(&mut self) -> Result<usize> {
        self.sessions.clear();
        let raw = match self.storage.get(SESSIONS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Ok(0),
            Err(err) => {
                tracing::warn!(error = %err, "session list unreadable");
                return Err(MentorError::StorageCorrupt(err.to_string()));
            }
        };
        let parsed: Vec<Session> = serde_json::from_str(&raw).map_err(|err| {
            tracing::warn!(error = %err, "session list failed to parse; starting empty");
            MentorError::StorageCorrupt(format!("session list: {err}"))
        })?;

        let mut seen = HashSet::new();
        let total = parsed.len();
        self.sessions = parsed
            .into_iter()
            .filter(|session| !session.session_id.is_empty())
            .filter(|session| seen.insert(session.session_id.clone()))
            .collect();
        if self.sessions.len() != total {
            log_debug(&format!(
                "session list: dropped {} invalid or duplicate entries",
                total - self.sessions.len()
            ));
        }
        Ok(self.sessions.len())
    }

    /// Ask the backend for a new id, then prepend a default session for it.
    pub fn create_session(&mut self, api: &dyn ChatApi, owner_id: &str) -> Result<Session> {
        let owner = match owner_id.trim() {
            "" => DEFAULT_USER_NAME,
            trimmed => trimmed,
        };
        let session_id = api.new_session(owner)?;
        if self.get(&session_id).is_some() {
            return Err(MentorError::BackendUnavailable(format!(
                "backend returned an id already in use: {session_id}"
            )));
        }
        let session = Session::new(session_id, (self.clock)());
        self.sessions.insert(0, session.clone());
        tracing::info!(session_id = %session.session_id, "session created");
        self.persist()?;
        Ok(session)
    }

    /// Flip `pinned`. Returns `Ok(false)` when no session has that id.
    pub fn toggle_pin(&mut self, id: &str) -> Result<bool> {
        self.update(id, |session| session.pinned = !session.pinned)
    }

    /// Set the title. Blank titles are ignored.
    pub fn rename_session(&mut self, id: &str, title: &str) -> Result<bool> {
        let title = title.trim();
        if title.is_empty() {
            return Ok(false);
        }
        self.update(id, |session| session.title = title.to_string())
    }

    pub fn move_to_folder(&mut self, id: &str, folder: Folder) -> Result<bool> {
        self.update(id, |session| session.folder = folder)
    }

    /// Remove the session and its cached messages. Deleting twice is a no-op.
    pub fn delete_session(&mut self, id: &str) -> Result<Option<Session>> {
        let Some(index) = self.position(id) else {
            return Ok(None);
        };
        let removed = self.sessions.remove(index);
        tracing::info!(session_id = %id, "session deleted");
        if let Err(err) = self.storage.remove(&message_cache_key(id)) {
            log_debug(&format!("failed to evict message cache for {id}: {err}"));
        }
        self.persist()?;
        Ok(Some(removed))
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.session_id == id)
    }

    /// Recomputed on every call so it can never drift from the list.
    pub fn pinned_sessions(&self) -> Vec<&Session> {
        self.sessions.iter().filter(|s| s.pinned).collect()
    }

    pub fn sessions_in_folder(&self, folder: Folder) -> Vec<&Session> {
        self.sessions.iter().filter(|s| s.folder == folder).collect()
    }

    pub fn folders(&self) -> &'static [Folder] {
        &Folder::ALL
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.sessions.iter().position(|s| s.session_id == id)
    }

    fn update(&mut self, id: &str, apply: impl FnOnce(&mut Session)) -> Result<bool> {
        let now = (self.clock)();
        let Some(session) = self.sessions.iter_mut().find(|s| s.session_id == id) else {
            return Ok(false);
        };
        apply(session);
        session.updated_at = now;
        self.persist()?;
        Ok(true)
    }

    fn persist(&mut self) -> Result<()> {
        let payload = serde_json::to_string(&self.sessions)
            .map_err(|err| MentorError::Storage(format!("failed to encode sessions: {err}")))?;
        self.storage.set(SESSIONS_KEY, &payload).inspect_err(|err| {
            tracing::warn!(error = %err, "failed to persist session list");
        })
    }
}
