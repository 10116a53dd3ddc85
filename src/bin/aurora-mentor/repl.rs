//! Interactive line-oriented chat.
//!
//! # Architecture
//!
//! - Input thread: reads stdin lines and forwards them over a channel
//! - Send worker: one thread per message, blocking on the backend
//! - Main loop: selects over input and replies, and drains voice events on a tick

use anyhow::Result;
use aurora_mentor::api::{ChatApi, ChatReply, Role};
use aurora_mentor::chat::{ChatSession, PendingSend};
use aurora_mentor::config::AppConfig;
use aurora_mentor::ipc::{parse_input, ParsedInput, SlashCommand, HELP_TEXT};
use aurora_mentor::profile::ProfileStore;
use aurora_mentor::{log_debug, log_debug_content, Folder, SessionStore, VoiceController};
use crossbeam_channel::{bounded, never, select, Receiver, Sender};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::render::{
    format_folders, format_message, format_session_list, format_suggestions, format_voice_state,
    terminal_width, Palette,
};

/// Voice events are drained at least this often.
const TICK: Duration = Duration::from_millis(50);

/// Max buffered stdin lines before the reader blocks.
const INPUT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug)]
enum InputEvent {
    Line(String),
    Eof,
}

fn spawn_input_thread(tx: Sender<InputEvent>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(InputEvent::Line(line)).is_err() {
                        return;
                    }
                }
                Err(err) => {
                    log_debug(&format!("stdin read error: {err}"));
                    break;
                }
            }
        }
        let _ = tx.send(InputEvent::Eof);
    })
}

struct SendJob {
    pending: PendingSend,
    receiver: Receiver<aurora_mentor::Result<ChatReply>>,
}

pub(crate) struct Repl {
    owner_id: String,
    ai_name: String,
    auto_speak: bool,
    api: Arc<dyn ChatApi>,
    store: SessionStore,
    profile: ProfileStore,
    chat: ChatSession,
    voice: VoiceController,
    send_job: Option<SendJob>,
    /// Dictated text waiting for Enter.
    draft: String,
    palette: Palette,
}

impl Repl {
    pub(crate) fn new(
        config: &AppConfig,
        api: Arc<dyn ChatApi>,
        store: SessionStore,
        profile: ProfileStore,
        voice: VoiceController,
    ) -> Self {
        Self {
            owner_id: config.owner_id().to_string(),
            ai_name: config.ai_name.clone(),
            auto_speak: config.auto_speak,
            api,
            store,
            profile,
            chat: ChatSession::new(),
            voice,
            send_job: None,
            draft: String::new(),
            palette: Palette::detect(),
        }
    }

    pub(crate) fn run(mut self) -> Result<()> {
        self.print_banner();
        let (input_tx, input_rx) = bounded(INPUT_CHANNEL_CAPACITY);
        let _input_handle = spawn_input_thread(input_tx);
        let mut input_open = true;
        let mut running = true;

        while running {
            let reply_rx = self
                .send_job
                .as_ref()
                .map(|job| job.receiver.clone())
                .unwrap_or_else(never);
            let line_rx = if input_open {
                input_rx.clone()
            } else {
                never()
            };

            select! {
                recv(line_rx) -> event => match event {
                    Ok(InputEvent::Line(line)) => running = self.handle_line(&line),
                    Ok(InputEvent::Eof) | Err(_) => {
                        input_open = false;
                    }
                },
                recv(reply_rx) -> outcome => {
                    let outcome = outcome.unwrap_or_else(|_| {
                        Err(aurora_mentor::MentorError::BackendUnavailable(
                            "message worker exited without a reply".to_string(),
                        ))
                    });
                    self.finish_send(outcome);
                }
                default(TICK) => {}
            }

            self.poll_voice();
            if !input_open && self.send_job.is_none() {
                running = false;
            }
        }

        log_debug("REPL exiting");
        Ok(())
    }

    fn print_banner(&self) {
        let name = self.palette.ai(&self.ai_name);
        println!("{name} · career chat");
        println!(
            "{}",
            self.palette
                .dim("Type a message, /help for commands, /quit to leave.")
        );
        if !self.store.is_empty() {
            println!(
                "{}",
                format_session_list(self.palette, &self.store, None)
            );
        }
        if let Ok(Some(avatar)) = self.profile.avatar(&self.owner_id) {
            println!("{}", self.palette.dim(&format!("avatar: {avatar}")));
        }
    }

    fn print_error(&self, message: &str) {
        eprintln!("{}", self.palette.error(message));
    }

    fn info(&self, message: &str) {
        println!("{}", self.palette.dim(message));
    }

    /// Returns false when the user asked to quit.
    fn handle_line(&mut self, line: &str) -> bool {
        let line = line.trim();
        if line.is_empty() {
            if !self.draft.is_empty() {
                let draft = std::mem::take(&mut self.draft);
                self.start_send(&draft);
            }
            return true;
        }
        match parse_input(line) {
            ParsedInput::Message(text) => {
                let text = ChatSession::append_transcript(&std::mem::take(&mut self.draft), &text);
                self.start_send(&text);
                true
            }
            ParsedInput::Command(command) => self.handle_command(command),
            ParsedInput::Invalid(usage) => {
                self.print_error(&usage);
                true
            }
        }
    }

    fn handle_command(&mut self, command: SlashCommand) -> bool {
        match command {
            SlashCommand::New => match self.store.create_session(self.api.as_ref(), &self.owner_id)
            {
                Ok(session) => {
                    self.chat.begin(&session.session_id);
                    self.info(&format!("Started {} ({})", session.title, session.session_id));
                }
                Err(err) => self.print_error(&err.to_string()),
            },
            SlashCommand::List => println!(
                "{}",
                format_session_list(self.palette, &self.store, self.chat.active_session())
            ),
            SlashCommand::Open(id) => self.open_session(&id),
            SlashCommand::Rename { session_id, title } => {
                let outcome = self.store.rename_session(&session_id, &title);
                self.report_mutation(&session_id, outcome, "Renamed");
            }
            SlashCommand::Pin(id) => {
                let outcome = self.store.toggle_pin(&id);
                self.report_mutation(&id, outcome, "Toggled pin on");
            }
            SlashCommand::Move { session_id, folder } => match Folder::parse(&folder) {
                Some(folder) => {
                    let outcome = self.store.move_to_folder(&session_id, folder);
                    self.report_mutation(&session_id, outcome, "Moved");
                }
                None => {
                    self.print_error(&format!("Unknown folder '{folder}'. Folders:"));
                    println!("{}", format_folders());
                }
            },
            SlashCommand::Delete(id) => self.delete_session(&id),
            SlashCommand::Quick(index) => match self.chat.suggestion(index) {
                Some(text) => {
                    let text = text.to_string();
                    self.start_send(&text);
                }
                None => self.print_error(&format!("No quick reply #{}", index + 1)),
            },
            SlashCommand::Speak(text) => {
                let text = text.or_else(|| self.chat.last_ai_message().map(str::to_string));
                match text {
                    Some(text) => self.speak(&text),
                    None => self.print_error("Nothing to read yet."),
                }
            }
            SlashCommand::Pause => self.voice.pause(),
            SlashCommand::Resume => self.voice.resume(),
            SlashCommand::Stop => self.voice.stop(),
            SlashCommand::Listen => match self.voice.start_listening() {
                Ok(()) => self.info("Listening… (/unlisten to cancel)"),
                Err(err) => self.print_error(&err.to_string()),
            },
            SlashCommand::StopListening => self.voice.stop_listening(),
            SlashCommand::SayRemote(text) => self.say_remote(text),
            SlashCommand::Avatar(reference) => self.avatar(reference),
            SlashCommand::Help => println!("{HELP_TEXT}"),
            SlashCommand::Quit => return false,
        }
        true
    }

    fn report_mutation(
        &self,
        session_id: &str,
        outcome: aurora_mentor::Result<bool>,
        verb: &str,
    ) {
        match outcome {
            Ok(true) => self.info(&format!("{verb} {session_id}")),
            Ok(false) if self.store.get(session_id).is_none() => {
                self.print_error(&format!("Unknown chat '{session_id}'"));
            }
            Ok(false) => {}
            Err(err) => self.print_error(&err.to_string()),
        }
    }

    fn open_session(&mut self, session_id: &str) {
        if self.store.get(session_id).is_none() {
            self.print_error(&format!("Unknown chat '{session_id}'"));
            return;
        }
        if let Err(err) = self.chat.open(self.api.as_ref(), session_id) {
            self.print_error(&err.to_string());
        }
        let width = terminal_width();
        for message in self.chat.messages() {
            let speaker = match message.role {
                Role::User => self.owner_id.as_str(),
                Role::Ai => self.ai_name.as_str(),
            };
            println!(
                "{}",
                format_message(self.palette, message.role, speaker, &message.text, width)
            );
        }
        self.info(&format!("Now chatting in {session_id}"));
    }

    fn delete_session(&mut self, session_id: &str) {
        match self.store.delete_session(session_id) {
            Ok(None) => {
                self.print_error(&format!("Unknown chat '{session_id}'"));
                return;
            }
            Ok(Some(session)) => self.info(&format!("Deleted {}", session.title)),
            Err(err) => self.print_error(&err.to_string()),
        }
        if let Err(err) = self.api.delete_session(session_id) {
            log_debug(&format!("backend delete for {session_id} failed: {err}"));
        }
        if self.chat.forget_session(session_id) {
            self.voice.stop();
        }
    }

    fn speak(&mut self, text: &str) {
        if let Err(err) = self.voice.start(text) {
            self.print_error(&err.to_string());
        }
    }

    fn say_remote(&self, text: Option<String>) {
        let Some(text) = text.or_else(|| self.chat.last_ai_message().map(str::to_string)) else {
            self.print_error("Nothing to render yet.");
            return;
        };
        match self.api.speak(&text) {
            Ok(url) => println!("{url}"),
            Err(err) => self.print_error(&err.to_string()),
        }
    }

    fn avatar(&mut self, reference: Option<String>) {
        let outcome = match reference.as_deref() {
            None => match self.profile.avatar(&self.owner_id) {
                Ok(Some(avatar)) => {
                    println!("{avatar}");
                    return;
                }
                Ok(None) => {
                    self.info("No avatar set.");
                    return;
                }
                Err(err) => Err(err),
            },
            Some("clear") => self.profile.clear_avatar(&self.owner_id),
            Some(reference) => self.profile.set_avatar(&self.owner_id, reference),
        };
        match outcome {
            Ok(()) => self.info("Avatar updated."),
            Err(err) => self.print_error(&err.to_string()),
        }
    }

    fn start_send(&mut self, text: &str) {
        if self.send_job.is_some() {
            self.print_error("Still waiting for the previous reply.");
            return;
        }
        let pending = match self.chat.prepare_send(
            self.api.as_ref(),
            &mut self.store,
            &self.owner_id,
            text,
        ) {
            Ok(Some(pending)) => pending,
            Ok(None) => return,
            Err(err) => {
                self.print_error(&err.to_string());
                return;
            }
        };
        log_debug_content(&format!("REPL send to {}: {}", pending.session_id, pending.text));
        self.info(&format!("{} is typing…", self.ai_name));

        let api = Arc::clone(&self.api);
        let request = pending.clone();
        let (tx, rx) = bounded(1);
        thread::spawn(move || {
            let _ = tx.send(request.dispatch(api.as_ref()));
        });
        self.send_job = Some(SendJob {
            pending,
            receiver: rx,
        });
    }

    fn finish_send(&mut self, outcome: aurora_mentor::Result<ChatReply>) {
        let Some(job) = self.send_job.take() else {
            return;
        };
        match self.chat.finish_send(&job.pending, outcome) {
            Ok(Some(reply)) => {
                println!(
                    "{}",
                    format_message(
                        self.palette,
                        Role::Ai,
                        &self.ai_name,
                        &reply,
                        terminal_width()
                    )
                );
                if let Some(line) = format_suggestions(self.palette, self.chat.suggestions()) {
                    println!("{line}");
                }
                if self.auto_speak {
                    self.speak(&reply);
                }
            }
            Ok(None) => {}
            Err(err) => self.print_error(&err.to_string()),
        }
        let _ = io::stdout().flush();
    }

    fn poll_voice(&mut self) {
        self.voice.tick(Instant::now());
        let before = self.voice.state();
        let mut transcripts = Vec::new();
        let poll = self.voice.poll_events(&mut |text| transcripts.push(text));
        for text in transcripts {
            self.draft = ChatSession::append_transcript(&self.draft, &text);
            self.info(&format!("🎙 {} (Enter to send)", self.draft));
        }
        for message in poll.errors {
            self.print_error(&message);
        }
        if poll.state_changed {
            log_debug(&format!(
                "voice: {} -> {}",
                format_voice_state(before),
                format_voice_state(self.voice.state())
            ));
        }
    }
}
