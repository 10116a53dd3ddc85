use super::{ChatApi, ChatReply, Message};
use crate::error::{MentorError, Result};
use crate::lock_or_recover;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Scripted backend for unit tests. Queued responses are consumed in order;
/// an empty queue answers with `BackendUnavailable`.
#[derive(Default)]
pub(crate) struct FakeChatApi {
    pub(crate) session_ids: Mutex<VecDeque<Result<String>>>,
    pub(crate) replies: Mutex<VecDeque<Result<ChatReply>>>,
    pub(crate) history: Mutex<Vec<Message>>,
    pub(crate) sent: Mutex<Vec<(String, String, String)>>,
    pub(crate) deleted: Mutex<Vec<String>>,
}

impl FakeChatApi {
    pub(crate) fn with_session_ids(ids: &[&str]) -> Self {
        let api = Self::default();
        {
            let mut queue = lock_or_recover(&api.session_ids, "FakeChatApi::with_session_ids");
            queue.extend(ids.iter().map(|id| Ok(id.to_string())));
        }
        api
    }

    pub(crate) fn push_reply(&self, reply: Result<ChatReply>) {
        lock_or_recover(&self.replies, "FakeChatApi::push_reply").push_back(reply);
    }

    pub(crate) fn push_session_id(&self, id: Result<String>) {
        lock_or_recover(&self.session_ids, "FakeChatApi::push_session_id").push_back(id);
    }

    pub(crate) fn set_history(&self, messages: Vec<Message>) {
        *lock_or_recover(&self.history, "FakeChatApi::set_history") = messages;
    }

    pub(crate) fn sent(&self) -> Vec<(String, String, String)> {
        lock_or_recover(&self.sent, "FakeChatApi::sent").clone()
    }
}

fn exhausted(what: &str) -> MentorError {
    MentorError::BackendUnavailable(format!("fake backend has no {what} queued"))
}

impl ChatApi for FakeChatApi {
    fn new_session(&self, _user_id: &str) -> Result<String> {
        lock_or_recover(&self.session_ids, "FakeChatApi::new_session")
            .pop_front()
            .unwrap_or_else(|| Err(exhausted("session id")))
    }

    fn send_message(&self, session_id: &str, user_id: &str, text: &str) -> Result<ChatReply> {
        lock_or_recover(&self.sent, "FakeChatApi::send_message").push((
            session_id.to_string(),
            user_id.to_string(),
            text.to_string(),
        ));
        lock_or_recover(&self.replies, "FakeChatApi::send_message")
            .pop_front()
            .unwrap_or_else(|| Err(exhausted("reply")))
    }

    fn history(&self, _session_id: &str) -> Result<Vec<Message>> {
        Ok(lock_or_recover(&self.history, "FakeChatApi::history").clone())
    }

    fn delete_session(&self, session_id: &str) -> Result<()> {
        lock_or_recover(&self.deleted, "FakeChatApi::delete_session").push(session_id.to_string());
        Ok(())
    }

    fn speak(&self, _text: &str) -> Result<String> {
        Ok("/audio/tts.wav".to_string())
    }
}
