use crate::api::{ChatApi, ChatReply, Message, Role};
use crate::chat::{ChatSession, PendingSend};
use crate::config::AppConfig;
use crate::error::MentorError;
use crate::sessions::{Folder, SessionStore};
use crate::voice::VoiceController;
use crate::{log_debug, log_debug_content};
use anyhow::Result;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use super::protocol::{FolderInfo, IpcCommand, IpcEvent};
use super::router::{handle_command, speak_text};

/// How long the loop waits for a command before servicing jobs and voice events.
const LOOP_TICK: Duration = Duration::from_millis(10);

/// One decoded stdin line, or the reason it could not be decoded.
pub(super) type Inbound = std::result::Result<IpcCommand, String>;

// ============================================================================
// IPC State
// ============================================================================

pub(super) struct SendJob {
    pub(super) pending: PendingSend,
    pub(super) receiver: Receiver<crate::Result<ChatReply>>,
}

pub(super) struct IpcState {
    pub(super) owner_id: String,
    pub(super) ai_name: String,
    pub(super) backend_url: String,
    pub(super) auto_speak: bool,
    pub(super) api: Arc<dyn ChatApi>,
    pub(super) store: SessionStore,
    pub(super) chat: ChatSession,
    pub(super) voice: VoiceController,
    pub(super) send_job: Option<SendJob>,
    out: Box<dyn Write + Send>,
}

impl IpcState {
    pub(super) fn new(
        config: &AppConfig,
        api: Arc<dyn ChatApi>,
        store: SessionStore,
        voice: VoiceController,
        out: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            owner_id: config.owner_id().to_string(),
            ai_name: config.ai_name.clone(),
            backend_url: config.backend_url.clone(),
            auto_speak: config.auto_speak,
            api,
            store,
            chat: ChatSession::new(),
            voice,
            send_job: None,
            out,
        }
    }

    // ========================================================================
    // Event Sending
    // ========================================================================

    pub(super) fn emit(&mut self, event: &IpcEvent) {
        let json = match serde_json::to_string(event) {
            Ok(json) => json,
            Err(err) => {
                log_debug(&format!("IPC event serialization failed: {err}"));
                return;
            }
        };
        if let Err(err) = writeln!(self.out, "{json}").and_then(|()| self.out.flush()) {
            log_debug(&format!("IPC write failed: {err}"));
        }
    }

    pub(super) fn emit_error(&mut self, err: &MentorError) {
        self.emit(&IpcEvent::Error {
            message: err.to_string(),
        });
    }

    pub(super) fn emit_capabilities(&mut self) {
        let event = IpcEvent::Capabilities {
            version: env!("CARGO_PKG_VERSION").to_string(),
            user_id: self.owner_id.clone(),
            ai_name: self.ai_name.clone(),
            backend_url: self.backend_url.clone(),
            can_speak: self.voice.can_speak(),
            can_listen: self.voice.can_listen(),
            voices: self
                .voice
                .voices()
                .iter()
                .map(|voice| voice.name.clone())
                .collect(),
            folders: Folder::ALL.into_iter().map(FolderInfo::from).collect(),
        };
        self.emit(&event);
    }

    pub(super) fn emit_sessions(&mut self) {
        let event = IpcEvent::Sessions {
            sessions: self.store.sessions().to_vec(),
            pinned: self
                .store
                .pinned_sessions()
                .into_iter()
                .map(|session| session.session_id.clone())
                .collect(),
        };
        self.emit(&event);
    }

    pub(super) fn emit_voice_state(&mut self) {
        let state = self.voice.state();
        self.emit(&IpcEvent::VoiceState { state });
    }

    /// Everything a freshly attached client needs to render.
    pub(super) fn emit_full_state(&mut self) {
        self.emit_capabilities();
        self.emit_sessions();
        if let Some(session_id) = self.chat.active_session().map(str::to_string) {
            let messages = self.chat.messages().to_vec();
            self.emit(&IpcEvent::SessionOpened {
                session_id,
                messages,
            });
            let items = self.chat.suggestions().to_vec();
            self.emit(&IpcEvent::Suggestions { items });
        }
        let active = self.chat.is_typing();
        self.emit(&IpcEvent::Typing { active });
        self.emit_voice_state();
    }
}

// ============================================================================
// Stdin Reader Thread
// ============================================================================

fn spawn_stdin_reader(tx: Sender<Inbound>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let decoded = serde_json::from_str::<IpcCommand>(trimmed)
                .map_err(|err| format!("Invalid command: {err}"));
            if tx.send(decoded).is_err() {
                break;
            }
        }
        log_debug("Stdin reader thread exiting");
    })
}

// ============================================================================
// Main Event Loop
// ============================================================================

/// Drive the mentor over newline-delimited JSON on stdin/stdout until stdin closes.
pub fn run_ipc_mode(
    config: &AppConfig,
    api: Arc<dyn ChatApi>,
    store: SessionStore,
    voice: VoiceController,
) -> Result<()> {
    log_debug("Starting JSON IPC mode");
    let mut state = IpcState::new(config, api, store, voice, Box::new(io::stdout()));
    state.emit_full_state();

    let (cmd_tx, cmd_rx) = unbounded();
    let _stdin_handle = spawn_stdin_reader(cmd_tx);
    run_ipc_loop(&mut state, &cmd_rx)
}

/// Returns once input is closed and no reply is outstanding.
pub(super) fn run_ipc_loop(state: &mut IpcState, cmd_rx: &Receiver<Inbound>) -> Result<()> {
    let mut loop_count: u64 = 0;
    let mut input_open = true;
    loop {
        loop_count += 1;
        if loop_count % 1000 == 0 {
            log_debug(&format!(
                "IPC loop iteration {loop_count}, reply pending: {}",
                state.send_job.is_some()
            ));
        }

        if input_open {
            match cmd_rx.recv_timeout(LOOP_TICK) {
                Ok(Ok(cmd)) => {
                    log_debug_content(&format!("IPC command received: {cmd:?}"));
                    handle_command(state, cmd);
                }
                Ok(Err(message)) => state.emit(&IpcEvent::Error { message }),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    log_debug("Command channel disconnected");
                    input_open = false;
                }
            }
        } else if state.send_job.is_none() {
            break;
        } else {
            thread::sleep(LOOP_TICK);
        }

        process_send_job(state);
        process_voice_events(state);
    }

    log_debug("IPC mode exiting");
    Ok(())
}

// ============================================================================
// Event Processing
// ============================================================================

pub(super) fn process_send_job(state: &mut IpcState) {
    let Some(job) = &state.send_job else {
        return;
    };
    let outcome = match job.receiver.try_recv() {
        Ok(outcome) => outcome,
        Err(TryRecvError::Empty) => return,
        Err(TryRecvError::Disconnected) => Err(MentorError::BackendUnavailable(
            "message worker exited without a reply".to_string(),
        )),
    };
    let Some(job) = state.send_job.take() else {
        return;
    };

    let result = state.chat.finish_send(&job.pending, outcome);
    state.emit(&IpcEvent::Typing {
        active: state.chat.is_typing(),
    });
    match result {
        Ok(Some(reply)) => {
            state.emit(&IpcEvent::Message {
                session_id: job.pending.session_id.clone(),
                message: Message {
                    role: Role::Ai,
                    text: reply.clone(),
                },
            });
            let items = state.chat.suggestions().to_vec();
            state.emit(&IpcEvent::Suggestions { items });
            if state.auto_speak {
                speak_text(state, &reply);
            }
        }
        Ok(None) => {}
        Err(err) => state.emit_error(&err),
    }
}

pub(super) fn process_voice_events(state: &mut IpcState) {
    state.voice.tick(Instant::now());
    let mut transcripts = Vec::new();
    let poll = state.voice.poll_events(&mut |text| transcripts.push(text));
    for text in transcripts {
        state.emit(&IpcEvent::Transcript { text });
    }
    for message in poll.errors {
        state.emit(&IpcEvent::Error { message });
    }
    if poll.state_changed {
        state.emit_voice_state();
    }
}
