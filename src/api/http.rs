use super::protocol::{
    parse_history, parse_message, parse_new_session, parse_speak, MessageRequest,
    NewSessionRequest, SpeakRequest,
};
use super::{ChatApi, ChatReply, Message};
use crate::error::{MentorError, Result};
use crate::{log_debug, log_debug_content};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::Url;
use std::time::{Duration, Instant};

/// User-Agent string for all backend requests.
pub const USER_AGENT: &str = concat!("aurora-mentor/", env!("CARGO_PKG_VERSION"));

/// Blocking HTTP client for the backend. Calls block the calling thread, so
/// front-ends run them on a worker and poll for the result.
#[derive(Clone)]
pub struct HttpChatApi {
    client: Client,
    base: Url,
    log_timings: bool,
}

impl HttpChatApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base = Url::parse(base_url).map_err(|err| {
            MentorError::InvalidInput(format!("invalid backend url '{base_url}': {err}"))
        })?;
        if base.cannot_be_a_base() {
            return Err(MentorError::InvalidInput(format!(
                "backend url '{base_url}' cannot carry a path"
            )));
        }
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|err| {
                MentorError::BackendUnavailable(format!("failed to build HTTP client: {err}"))
            })?;
        Ok(Self {
            client,
            base,
            log_timings: false,
        })
    }

    pub fn with_timing_logs(mut self, enabled: bool) -> Self {
        self.log_timings = enabled;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Append path segments to the base URL; segments are percent-encoded.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                MentorError::InvalidInput("backend url cannot carry a path".to_string())
            })?;
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    fn execute(&self, endpoint: &str, request: RequestBuilder) -> Result<String> {
        let started = Instant::now();
        let response = request.send().map_err(|err| {
            log_debug(&format!("{endpoint}: request failed: {err}"));
            tracing::warn!(endpoint, error = %err, "backend request failed");
            MentorError::BackendUnavailable(format!("{endpoint}: {err}"))
        })?;
        let status = response.status();
        let body = response.text().map_err(|err| {
            MentorError::BackendUnavailable(format!("{endpoint}: failed to read body: {err}"))
        })?;
        if self.log_timings {
            log_debug(&format!(
                "timing|phase=backend|endpoint={endpoint}|status={}|ms={}",
                status.as_u16(),
                started.elapsed().as_millis()
            ));
        }
        if !status.is_success() {
            log_debug(&format!("{endpoint}: backend returned {status}"));
            tracing::warn!(endpoint, status = status.as_u16(), "backend returned error status");
            return Err(MentorError::BackendUnavailable(format!(
                "{endpoint} returned {status}"
            )));
        }
        Ok(body)
    }
}

impl ChatApi for HttpChatApi {
    fn new_session(&self, user_id: &str) -> Result<String> {
        let url = self.endpoint(&["new-session"])?;
        let body = self.execute(
            "new-session",
            self.client.post(url).json(&NewSessionRequest { user_id }),
        )?;
        let id = parse_new_session(&body)?;
        tracing::info!(session_id = %id, "backend created session");
        Ok(id)
    }

    fn send_message(&self, session_id: &str, user_id: &str, text: &str) -> Result<ChatReply> {
        let url = self.endpoint(&["message"])?;
        log_debug_content(&format!("message -> {session_id}: {text}"));
        let body = self.execute(
            "message",
            self.client.post(url).json(&MessageRequest {
                session_id,
                user_id,
                text,
            }),
        )?;
        let reply = parse_message(&body)?;
        log_debug_content(&format!("reply <- {session_id}: {}", reply.reply));
        Ok(reply)
    }

    fn history(&self, session_id: &str) -> Result<Vec<Message>> {
        let url = self.endpoint(&["history", session_id])?;
        let body = self.execute("history", self.client.get(url))?;
        parse_history(&body)
    }

    fn delete_session(&self, session_id: &str) -> Result<()> {
        let url = self.endpoint(&["delete", session_id])?;
        self.execute("delete", self.client.delete(url))?;
        Ok(())
    }

    fn speak(&self, text: &str) -> Result<String> {
        let url = self.endpoint(&["speak"])?;
        let body = self.execute("speak", self.client.post(url).json(&SpeakRequest { text }))?;
        parse_speak(&body)
    }
}
