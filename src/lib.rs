pub mod api;
pub mod chat;
pub mod config;
mod error;
pub mod ipc;
mod lock;
pub mod profile;
pub mod sessions;
pub mod storage;
mod telemetry;
pub mod voice;

mod app;

pub(crate) use lock::lock_or_recover;
pub use app::*;
pub use error::{MentorError, Result};
pub use sessions::{Folder, Session, SessionStore};
pub use voice::{VoiceController, VoiceState};
