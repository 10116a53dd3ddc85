//! JSON IPC mode for external UI integration.
//!
//! A non-blocking JSON-lines protocol over stdin/stdout so an external
//! front-end can drive sessions, chat, and voice.
//!
//! Architecture:
//! - Stdin reader thread: decodes JSON commands and forwards them over a channel
//! - Main event loop: handles commands, finished backend calls, and voice events
//! - Backend calls: one worker thread per message, reporting back on a channel
//!
//! Protocol:
//! - Each line is a JSON object
//! - Events (Rust → client): {"event": "...", ...}
//! - Commands (client → Rust): {"cmd": "...", ...}

mod protocol;
mod router;
mod session;


pub use protocol::{FolderInfo, IpcCommand, IpcEvent};
pub use router::{parse_input, ParsedInput, SlashCommand, HELP_TEXT};
pub use session::run_ipc_mode;
