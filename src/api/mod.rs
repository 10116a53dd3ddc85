//! Client side of the mentor backend's REST surface.

#[cfg(test)]
pub(crate) mod fake;
mod http;
mod protocol;

#[cfg(test)]
mod tests;

pub use http::HttpChatApi;
pub use protocol::{ChatReply, Message, Role};

use crate::error::Result;

/// Operations the client needs from the chat backend.
///
/// Every failure (network, non-2xx, malformed body) comes back as
/// `MentorError::BackendUnavailable`. Implementations must not retry.
pub trait ChatApi: Send + Sync {
    /// Ask the backend to allocate a new session id for `user_id`.
    fn new_session(&self, user_id: &str) -> Result<String>;

    /// Send one user message and wait for the mentor's reply.
    fn send_message(&self, session_id: &str, user_id: &str, text: &str) -> Result<ChatReply>;

    /// Ordered message history for a session.
    fn history(&self, session_id: &str) -> Result<Vec<Message>>;

    /// Drop the session on the backend.
    fn delete_session(&self, session_id: &str) -> Result<()>;

    /// Server-side text-to-speech; returns the URL of the rendered audio.
    fn speak(&self, text: &str) -> Result<String>;
}
