use crate::api::{Message, Role};
use crate::error::{MentorError, Result};
use crate::sessions::Folder;
use crate::{log_debug, log_debug_content};
use crossbeam_channel::bounded;
use std::sync::Arc;
use std::thread;

use super::protocol::{IpcCommand, IpcEvent};
use super::session::{IpcState, SendJob};

/// Shown by `/help` in the terminal front-end.
pub const HELP_TEXT: &str = "\
Commands:
  /new                      start a new chat
  /list                     list chats
  /open <id>                switch to a chat
  /rename <id> <title>      rename a chat
  /pin <id>                 pin or unpin a chat
  /move <id> <folder>       file a chat under a folder (label or prefix)
  /delete <id>              delete a chat
  /quick <n>                send suggestion n
  /speak [text]             read text (or the last reply) aloud
  /pause  /resume  /stop    control read-aloud
  /listen  /unlisten        start or cancel dictation
  /say-remote [text]        render speech on the server and print its URL
  /avatar [ref|clear]       show or set your avatar reference
  /help                     this list
  /quit                     exit";

// ============================================================================
// Slash Command Parsing
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedInput {
    /// Plain text for the mentor.
    Message(String),
    Command(SlashCommand),
    /// Malformed command; carries a usage hint.
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    New,
    List,
    Open(String),
    Rename { session_id: String, title: String },
    Pin(String),
    Move { session_id: String, folder: String },
    Delete(String),
    /// Zero-based; the user types the one-based number.
    Quick(usize),
    /// `None` reads the last reply.
    Speak(Option<String>),
    Pause,
    Resume,
    Stop,
    Listen,
    StopListening,
    SayRemote(Option<String>),
    Avatar(Option<String>),
    Help,
    Quit,
}

impl SlashCommand {
    /// Structured equivalent for commands that exist in the JSON protocol.
    pub fn to_ipc(&self) -> Option<IpcCommand> {
        Some(match self {
            SlashCommand::New => IpcCommand::NewSession,
            SlashCommand::List => IpcCommand::ListSessions,
            SlashCommand::Open(id) => IpcCommand::OpenSession {
                session_id: id.clone(),
            },
            SlashCommand::Rename { session_id, title } => IpcCommand::RenameSession {
                session_id: session_id.clone(),
                title: title.clone(),
            },
            SlashCommand::Pin(id) => IpcCommand::TogglePin {
                session_id: id.clone(),
            },
            SlashCommand::Move { session_id, folder } => IpcCommand::MoveToFolder {
                session_id: session_id.clone(),
                folder: folder.clone(),
            },
            SlashCommand::Delete(id) => IpcCommand::DeleteSession {
                session_id: id.clone(),
            },
            SlashCommand::Quick(index) => IpcCommand::QuickReply { index: *index },
            SlashCommand::Speak(Some(text)) => IpcCommand::Speak { text: text.clone() },
            SlashCommand::Speak(None) => IpcCommand::SpeakLast,
            SlashCommand::Pause => IpcCommand::PauseSpeech,
            SlashCommand::Resume => IpcCommand::ResumeSpeech,
            SlashCommand::Stop => IpcCommand::StopSpeech,
            SlashCommand::Listen => IpcCommand::StartListening,
            SlashCommand::StopListening => IpcCommand::StopListening,
            SlashCommand::SayRemote(_)
            | SlashCommand::Avatar(_)
            | SlashCommand::Help
            | SlashCommand::Quit => return None,
        })
    }
}

fn optional(args: &str) -> Option<String> {
    (!args.is_empty()).then(|| args.to_string())
}

fn required(args: &str, usage: &str, build: impl FnOnce(String) -> SlashCommand) -> ParsedInput {
    if args.is_empty() {
        ParsedInput::Invalid(format!("Usage: {usage}"))
    } else {
        ParsedInput::Command(build(args.to_string()))
    }
}

fn id_and_rest(
    args: &str,
    usage: &str,
    build: impl FnOnce(String, String) -> SlashCommand,
) -> ParsedInput {
    let mut parts = args.splitn(2, char::is_whitespace);
    let id = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim();
    if id.is_empty() || rest.is_empty() {
        return ParsedInput::Invalid(format!("Usage: {usage}"));
    }
    ParsedInput::Command(build(id.to_string(), rest.to_string()))
}

pub fn parse_input(input: &str) -> ParsedInput {
    let trimmed = input.trim();

    let Some(body) = trimmed.strip_prefix('/') else {
        return ParsedInput::Message(trimmed.to_string());
    };

    let mut parts = body.splitn(2, char::is_whitespace);
    let cmd = parts.next().unwrap_or("").to_lowercase();
    let args = parts.next().map(str::trim).unwrap_or("");

    let command = match cmd.as_str() {
        "new" | "n" => SlashCommand::New,
        "list" | "ls" => SlashCommand::List,
        "open" | "o" => return required(args, "/open <id>", SlashCommand::Open),
        "rename" => {
            return id_and_rest(args, "/rename <id> <title>", |session_id, title| {
                SlashCommand::Rename { session_id, title }
            })
        }
        "pin" => return required(args, "/pin <id>", SlashCommand::Pin),
        "move" | "mv" => {
            return id_and_rest(args, "/move <id> <folder>", |session_id, folder| {
                SlashCommand::Move { session_id, folder }
            })
        }
        "delete" | "rm" => return required(args, "/delete <id>", SlashCommand::Delete),
        "quick" | "q" => {
            return match args.parse::<usize>() {
                Ok(n) if n >= 1 => ParsedInput::Command(SlashCommand::Quick(n - 1)),
                _ => ParsedInput::Invalid("Usage: /quick <n> (n starts at 1)".to_string()),
            }
        }
        "speak" | "s" => SlashCommand::Speak(optional(args)),
        "pause" => SlashCommand::Pause,
        "resume" => SlashCommand::Resume,
        "stop" => SlashCommand::Stop,
        "listen" | "l" => SlashCommand::Listen,
        "unlisten" => SlashCommand::StopListening,
        "say-remote" => SlashCommand::SayRemote(optional(args)),
        "avatar" => SlashCommand::Avatar(optional(args)),
        "help" | "h" => SlashCommand::Help,
        "quit" | "exit" => SlashCommand::Quit,
        "" => return ParsedInput::Invalid("Empty command; try /help".to_string()),
        other => return ParsedInput::Invalid(format!("Unknown command /{other}; try /help")),
    };
    ParsedInput::Command(command)
}

// ============================================================================
// Command Handlers
// ============================================================================

pub(super) fn handle_command(state: &mut IpcState, cmd: IpcCommand) {
    match cmd {
        IpcCommand::NewSession => handle_new_session(state),
        IpcCommand::OpenSession { session_id } => handle_open_session(state, &session_id),
        IpcCommand::SendMessage { text } => handle_send_message(state, &text),
        IpcCommand::QuickReply { index } => match state.chat.suggestion(index) {
            Some(text) => {
                let text = text.to_string();
                start_send(state, &text);
            }
            None => state.emit_error(&MentorError::InvalidInput(format!(
                "no quick reply at index {index}"
            ))),
        },
        IpcCommand::RenameSession { session_id, title } => {
            let outcome = state.store.rename_session(&session_id, &title);
            after_session_mutation(state, &session_id, outcome);
        }
        IpcCommand::TogglePin { session_id } => {
            let outcome = state.store.toggle_pin(&session_id);
            after_session_mutation(state, &session_id, outcome);
        }
        IpcCommand::MoveToFolder { session_id, folder } => {
            let Some(folder) = Folder::parse(&folder) else {
                state.emit_error(&MentorError::InvalidInput(format!(
                    "unknown folder '{folder}'"
                )));
                return;
            };
            let outcome = state.store.move_to_folder(&session_id, folder);
            after_session_mutation(state, &session_id, outcome);
        }
        IpcCommand::DeleteSession { session_id } => handle_delete_session(state, &session_id),
        IpcCommand::ListSessions => state.emit_sessions(),
        IpcCommand::Speak { text } => speak_text(state, &text),
        IpcCommand::SpeakLast => match state.chat.last_ai_message() {
            Some(text) => {
                let text = text.to_string();
                speak_text(state, &text);
            }
            None => state.emit_error(&MentorError::InvalidInput(
                "no reply to read yet".to_string(),
            )),
        },
        IpcCommand::PauseSpeech => {
            state.voice.pause();
            state.emit_voice_state();
        }
        IpcCommand::ResumeSpeech => {
            state.voice.resume();
            state.emit_voice_state();
        }
        IpcCommand::StopSpeech => {
            state.voice.stop();
            state.emit_voice_state();
        }
        IpcCommand::StartListening => {
            if let Err(err) = state.voice.start_listening() {
                state.emit_error(&err);
            }
            state.emit_voice_state();
        }
        IpcCommand::StopListening => {
            state.voice.stop_listening();
            state.emit_voice_state();
        }
        IpcCommand::GetState => state.emit_full_state(),
    }
}

fn handle_send_message(state: &mut IpcState, text: &str) {
    match parse_input(text) {
        ParsedInput::Message(text) => start_send(state, &text),
        ParsedInput::Command(command) => match command.to_ipc() {
            Some(cmd) => handle_command(state, cmd),
            None => state.emit_error(&MentorError::InvalidInput(format!(
                "{} is only available in the terminal",
                text.split_whitespace().next().unwrap_or(text)
            ))),
        },
        ParsedInput::Invalid(usage) => state.emit_error(&MentorError::InvalidInput(usage)),
    }
}

fn handle_new_session(state: &mut IpcState) {
    match state
        .store
        .create_session(state.api.as_ref(), &state.owner_id)
    {
        Ok(session) => {
            state.chat.begin(&session.session_id);
            state.emit_sessions();
            state.emit(&IpcEvent::SessionOpened {
                session_id: session.session_id,
                messages: Vec::new(),
            });
        }
        Err(err) => state.emit_error(&err),
    }
}

fn handle_open_session(state: &mut IpcState, session_id: &str) {
    if state.store.get(session_id).is_none() {
        state.emit_error(&unknown_session(session_id));
        return;
    }
    if let Err(err) = state.chat.open(state.api.as_ref(), session_id) {
        state.emit_error(&err);
    }
    state.emit(&IpcEvent::SessionOpened {
        session_id: session_id.to_string(),
        messages: state.chat.messages().to_vec(),
    });
    state.emit(&IpcEvent::Suggestions { items: Vec::new() });
}

fn handle_delete_session(state: &mut IpcState, session_id: &str) {
    match state.store.delete_session(session_id) {
        Ok(None) => {
            state.emit_error(&unknown_session(session_id));
            return;
        }
        Ok(Some(_)) => {}
        // The entry is gone from memory even when the write failed.
        Err(err) => state.emit_error(&err),
    }
    if let Err(err) = state.api.delete_session(session_id) {
        log_debug(&format!("backend delete for {session_id} failed: {err}"));
    }
    if state.chat.forget_session(session_id) {
        state.voice.stop();
        state.emit_voice_state();
    }
    state.emit_sessions();
}

fn after_session_mutation(state: &mut IpcState, session_id: &str, outcome: Result<bool>) {
    match outcome {
        Ok(true) => state.emit_sessions(),
        Ok(false) => {
            if state.store.get(session_id).is_none() {
                state.emit_error(&unknown_session(session_id));
            }
        }
        Err(err) => {
            state.emit_error(&err);
            state.emit_sessions();
        }
    }
}

fn unknown_session(session_id: &str) -> MentorError {
    MentorError::InvalidInput(format!("unknown session '{session_id}'"))
}

pub(super) fn speak_text(state: &mut IpcState, text: &str) {
    if let Err(err) = state.voice.start(text) {
        state.emit_error(&err);
    }
    state.emit_voice_state();
}

/// Record the message locally and run the backend call on a worker thread.
pub(super) fn start_send(state: &mut IpcState, text: &str) {
    if state.send_job.is_some() {
        state.emit_error(&MentorError::InvalidInput(
            "still waiting for the previous reply".to_string(),
        ));
        return;
    }
    let had_session = state.chat.active_session().is_some();
    let pending = match state.chat.prepare_send(
        state.api.as_ref(),
        &mut state.store,
        &state.owner_id,
        text,
    ) {
        Ok(Some(pending)) => pending,
        Ok(None) => return,
        Err(err) => {
            state.emit_error(&err);
            return;
        }
    };

    if !had_session {
        state.emit_sessions();
        state.emit(&IpcEvent::SessionOpened {
            session_id: pending.session_id.clone(),
            messages: Vec::new(),
        });
    }
    state.emit(&IpcEvent::Message {
        session_id: pending.session_id.clone(),
        message: Message {
            role: Role::User,
            text: pending.text.clone(),
        },
    });
    state.emit(&IpcEvent::Suggestions { items: Vec::new() });
    state.emit(&IpcEvent::Typing { active: true });

    log_debug_content(&format!("IPC send to {}: {}", pending.session_id, pending.text));
    let api = Arc::clone(&state.api);
    let request = pending.clone();
    let (tx, rx) = bounded(1);
    thread::spawn(move || {
        let _ = tx.send(request.dispatch(api.as_ref()));
    });
    state.send_job = Some(SendJob {
        pending,
        receiver: rx,
    });
}
