//! Wire schemas for the mentor backend.
//!
//! Requests mirror the backend's JSON bodies exactly. Responses are decoded
//! into these structs and then checked, so a body that parses but is missing
//! its payload (for example an empty `session_id`) is still rejected.

use crate::error::{MentorError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Who produced a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Ai,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Ai => "ai",
        }
    }

    /// Older backend builds labelled replies `assistant` or `model`.
    pub(crate) fn from_wire(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "user" => Some(Role::User),
            "ai" | "assistant" | "model" => Some(Role::Ai),
            _ => None,
        }
    }
}

/// One entry of the in-memory conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn ai(text: impl Into<String>) -> Self {
        Self {
            role: Role::Ai,
            text: text.into(),
        }
    }
}

/// Backend answer to a user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub reply: String,
    /// `None` when the backend sent no suggestion list at all.
    pub suggestions: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct NewSessionRequest<'a> {
    pub user_id: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NewSessionResponse {
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct MessageRequest<'a> {
    pub session_id: &'a str,
    pub user_id: &'a str,
    pub text: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessageResponse {
    pub reply: String,
    #[serde(default)]
    pub suggestions: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HistoryEntry {
    pub role: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct SpeakRequest<'a> {
    pub text: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SpeakResponse {
    pub url: String,
}

pub(crate) fn decode<T: DeserializeOwned>(endpoint: &str, body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|err| {
        MentorError::BackendUnavailable(format!("malformed {endpoint} response: {err}"))
    })
}

pub(crate) fn parse_new_session(body: &str) -> Result<String> {
    let response: NewSessionResponse = decode("new-session", body)?;
    let id = response.session_id.trim();
    if id.is_empty() {
        return Err(MentorError::BackendUnavailable(
            "new-session response carried an empty session_id".to_string(),
        ));
    }
    Ok(id.to_string())
}

pub(crate) fn parse_message(body: &str) -> Result<ChatReply> {
    let response: MessageResponse = decode("message", body)?;
    let suggestions = response.suggestions.map(|items| {
        items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    });
    Ok(ChatReply {
        reply: response.reply,
        suggestions,
    })
}

/// Entries with a role we do not recognize are skipped rather than failing the
/// whole history.
pub(crate) fn parse_history(body: &str) -> Result<Vec<Message>> {
    let entries: Vec<HistoryEntry> = decode("history", body)?;
    Ok(entries
        .into_iter()
        .filter_map(|entry| {
            let role = Role::from_wire(&entry.role);
            if role.is_none() {
                crate::log_debug(&format!("history: skipping entry with role '{}'", entry.role));
            }
            role.map(|role| Message {
                role,
                text: entry.text,
            })
        })
        .collect())
}

pub(crate) fn parse_speak(body: &str) -> Result<String> {
    let response: SpeakResponse = decode("speak", body)?;
    if response.url.trim().is_empty() {
        return Err(MentorError::BackendUnavailable(
            "speak response carried an empty url".to_string(),
        ));
    }
    Ok(response.url)
}
