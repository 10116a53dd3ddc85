//! Conversation state for the active session.
//!
//! `ChatSession` is glue: it keeps the ordered message list, the quick-reply
//! suggestions, and the typing flag. The network round trip is split into
//! [`ChatSession::prepare_send`] and [`ChatSession::finish_send`] so a
//! front-end can run [`PendingSend::dispatch`] on a worker thread.

use crate::api::{ChatApi, ChatReply, Message, Role};
use crate::error::{MentorError, Result};
use crate::sessions::SessionStore;
use crate::{log_debug, log_debug_content};

/// Quick replies offered when the backend sends none.
pub const DEFAULT_SUGGESTIONS: [&str; 5] = [
    "Next part ➜",
    "Show internships",
    "Weekly plan",
    "Skills to learn next",
    "Short summary",
];

/// A user message that has been recorded locally and still needs a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSend {
    pub session_id: String,
    pub owner_id: String,
    pub text: String,
}

impl PendingSend {
    /// Blocking backend call; safe to run off the UI thread.
    pub fn dispatch(&self, api: &dyn ChatApi) -> Result<ChatReply> {
        api.send_message(&self.session_id, &self.owner_id, &self.text)
    }
}

#[derive(Debug, Default)]
pub struct ChatSession {
    active_session: Option<String>,
    messages: Vec<Message>,
    suggestions: Vec<String>,
    typing: bool,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_session(&self) -> Option<&str> {
        self.active_session.as_deref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    pub fn suggestion(&self, index: usize) -> Option<&str> {
        self.suggestions.get(index).map(String::as_str)
    }

    pub fn is_typing(&self) -> bool {
        self.typing
    }

    /// Switch to `session_id` and replace the transcript with backend history.
    ///
    /// On failure the session is still active with an empty list; the error is
    /// returned so the caller can surface it.
    pub fn open(&mut self, api: &dyn ChatApi, session_id: &str) -> Result<usize> {
        self.active_session = Some(session_id.to_string());
        self.messages.clear();
        self.suggestions.clear();
        self.typing = false;
        match api.history(session_id) {
            Ok(history) => {
                self.messages = history;
                Ok(self.messages.len())
            }
            Err(err) => {
                log_debug(&format!("history for {session_id} unavailable: {err}"));
                Err(err)
            }
        }
    }

    /// Start an empty conversation bound to `session_id` without a backend round trip.
    pub fn begin(&mut self, session_id: &str) {
        self.active_session = Some(session_id.to_string());
        self.messages.clear();
        self.suggestions.clear();
        self.typing = false;
    }

    /// Drop the transcript when its session goes away.
    pub fn forget_session(&mut self, session_id: &str) -> bool {
        if self.active_session.as_deref() != Some(session_id) {
            return false;
        }
        self.active_session = None;
        self.messages.clear();
        self.suggestions.clear();
        self.typing = false;
        true
    }

    /// Record the user's message and build the backend request.
    ///
    /// Blank text returns `Ok(None)`. Creates a session through `store` when
    /// none is active. Only one send may be in flight.
    pub fn prepare_send(
        &mut self,
        api: &dyn ChatApi,
        store: &mut SessionStore,
        owner_id: &str,
        text: &str,
    ) -> Result<Option<PendingSend>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        if self.typing {
            return Err(MentorError::InvalidInput(
                "still waiting for the previous reply".to_string(),
            ));
        }
        let session_id = match &self.active_session {
            Some(id) => id.clone(),
            None => {
                let session = store.create_session(api, owner_id)?;
                self.begin(&session.session_id);
                session.session_id
            }
        };

        log_debug_content(&format!("chat: user message in {session_id}: {text}"));
        self.messages.push(Message::user(text));
        self.suggestions.clear();
        self.typing = true;
        Ok(Some(PendingSend {
            session_id,
            owner_id: owner_id.to_string(),
            text: text.to_string(),
        }))
    }

    /// Apply the backend outcome for `pending`.
    ///
    /// Returns the reply text for read-aloud. A reply for a session the user
    /// has since left is dropped and yields `Ok(None)`.
    pub fn finish_send(
        &mut self,
        pending: &PendingSend,
        outcome: Result<ChatReply>,
    ) -> Result<Option<String>> {
        if self.active_session.as_deref() != Some(pending.session_id.as_str()) {
            log_debug("chat: reply for inactive session dropped");
            return outcome.map(|_| None);
        }
        self.typing = false;
        let reply = outcome.inspect_err(|err| {
            tracing::warn!(session = %pending.session_id, error = %err, "message send failed");
        })?;

        self.suggestions = match reply.suggestions {
            Some(items) if !items.is_empty() => items,
            _ => DEFAULT_SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
        };
        log_debug_content(&format!("chat: reply in {}: {}", pending.session_id, reply.reply));
        self.messages.push(Message::ai(reply.reply.clone()));
        Ok(Some(reply.reply))
    }

    /// Synchronous send for callers that can block.
    pub fn send(
        &mut self,
        api: &dyn ChatApi,
        store: &mut SessionStore,
        owner_id: &str,
        text: &str,
    ) -> Result<Option<String>> {
        let Some(pending) = self.prepare_send(api, store, owner_id, text)? else {
            return Ok(None);
        };
        let outcome = pending.dispatch(api);
        self.finish_send(&pending, outcome)
    }

    /// Send the stored suggestion at `index`.
    pub fn quick_reply(
        &mut self,
        api: &dyn ChatApi,
        store: &mut SessionStore,
        owner_id: &str,
        index: usize,
    ) -> Result<Option<String>> {
        let text = self
            .suggestion(index)
            .ok_or_else(|| MentorError::InvalidInput(format!("no quick reply #{}", index + 1)))?
            .to_string();
        self.send(api, store, owner_id, &text)
    }

    pub fn last_ai_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|message| message.role == Role::Ai)
            .map(|message| message.text.as_str())
    }

    /// Dictation appends to whatever the user already typed.
    pub fn append_transcript(input: &str, transcript: &str) -> String {
        let transcript = transcript.trim();
        if transcript.is_empty() {
            return input.to_string();
        }
        let input = input.trim_end();
        if input.is_empty() {
            transcript.to_string()
        } else {
            format!("{input} {transcript}")
        }
    }
}
