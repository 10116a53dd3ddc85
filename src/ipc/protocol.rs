//! JSON-lines protocol between the mentor process and an external UI.
//!
//! Messages are newline-delimited JSON objects.

use crate::api::Message;
use crate::sessions::{Folder, Session};
use crate::voice::VoiceState;
use serde::{Deserialize, Serialize};

// ============================================================================
// IPC Events (Rust → client)
// ============================================================================

/// Serialized with an `"event"` tag field.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum IpcEvent {
    /// Sent once on startup and again on `get_state`.
    #[serde(rename = "capabilities")]
    Capabilities {
        version: String,
        user_id: String,
        ai_name: String,
        backend_url: String,
        can_speak: bool,
        can_listen: bool,
        voices: Vec<String>,
        folders: Vec<FolderInfo>,
    },

    /// Full session list after load or any change.
    #[serde(rename = "sessions")]
    Sessions {
        sessions: Vec<Session>,
        pinned: Vec<String>,
    },

    /// The active session changed; `messages` is its full transcript.
    #[serde(rename = "session_opened")]
    SessionOpened {
        session_id: String,
        messages: Vec<Message>,
    },

    /// One message appended to the active transcript.
    #[serde(rename = "message")]
    Message {
        session_id: String,
        #[serde(flatten)]
        message: Message,
    },

    #[serde(rename = "typing")]
    Typing { active: bool },

    #[serde(rename = "suggestions")]
    Suggestions { items: Vec<String> },

    #[serde(rename = "voice_state")]
    VoiceState {
        #[serde(flatten)]
        state: VoiceState,
    },

    /// Dictation result; the client appends it to its input box.
    #[serde(rename = "transcript")]
    Transcript { text: String },

    /// Every error is recoverable; the process keeps running.
    #[serde(rename = "error")]
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderInfo {
    pub label: String,
    pub icon: String,
}

impl From<Folder> for FolderInfo {
    fn from(folder: Folder) -> Self {
        Self {
            label: folder.label().to_string(),
            icon: folder.icon().to_string(),
        }
    }
}

// ============================================================================
// IPC Commands (client → Rust)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "cmd")]
pub enum IpcCommand {
    #[serde(rename = "new_session")]
    NewSession,

    #[serde(rename = "open_session")]
    OpenSession { session_id: String },

    /// Plain text goes to the mentor; `/command` text is routed locally.
    #[serde(rename = "send_message")]
    SendMessage { text: String },

    /// Zero-based index into the current suggestions.
    #[serde(rename = "quick_reply")]
    QuickReply { index: usize },

    #[serde(rename = "rename_session")]
    RenameSession { session_id: String, title: String },

    #[serde(rename = "toggle_pin")]
    TogglePin { session_id: String },

    /// `folder` is a label or an unambiguous prefix of one.
    #[serde(rename = "move_to_folder")]
    MoveToFolder { session_id: String, folder: String },

    #[serde(rename = "delete_session")]
    DeleteSession { session_id: String },

    #[serde(rename = "list_sessions")]
    ListSessions,

    #[serde(rename = "speak")]
    Speak { text: String },

    #[serde(rename = "speak_last")]
    SpeakLast,

    #[serde(rename = "pause_speech")]
    PauseSpeech,

    #[serde(rename = "resume_speech")]
    ResumeSpeech,

    #[serde(rename = "stop_speech")]
    StopSpeech,

    #[serde(rename = "start_listening")]
    StartListening,

    #[serde(rename = "stop_listening")]
    StopListening,

    #[serde(rename = "get_state")]
    GetState,
}
