//! Aurora Mentor - terminal client for the AI career mentor.
//!
//! Runs an interactive chat by default, or a JSON-lines IPC process with
//! `--json-ipc` so an external UI can drive sessions, chat, and voice.

mod render;
mod repl;

use anyhow::{Context, Result};
use aurora_mentor::api::{ChatApi, HttpChatApi};
use aurora_mentor::config::AppConfig;
use aurora_mentor::ipc::run_ipc_mode;
use aurora_mentor::profile::ProfileStore;
use aurora_mentor::storage::FileStore;
use aurora_mentor::voice::{SpeechRecognizer, SpeechSynthesizer};
use aurora_mentor::{
    init_logging, log_debug, log_debug_content, log_file_path, log_panic, SessionStore,
    VoiceController,
};
use std::panic;
use std::sync::Arc;
use std::time::Duration;

use crate::repl::Repl;

fn install_panic_hook() {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        log_panic(info);
        let location = info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        log_debug(&format!("panic at {location}"));
        log_debug_content(&format!("panic: {info}"));
        previous(info);
    }));
}

#[cfg(unix)]
fn build_engines(
    config: &AppConfig,
) -> (
    Option<Box<dyn SpeechSynthesizer>>,
    Option<Box<dyn SpeechRecognizer>>,
) {
    use aurora_mentor::voice::{CommandRecognizer, CommandSynthesizer};

    let synth: Option<Box<dyn SpeechSynthesizer>> = if config.no_tts {
        None
    } else {
        Some(Box::new(CommandSynthesizer::new(config.tts_cmd.clone())))
    };
    let recognizer: Option<Box<dyn SpeechRecognizer>> =
        if config.no_stt || config.stt_argv.is_empty() {
            None
        } else {
            match CommandRecognizer::new(config.stt_argv.clone()) {
                Ok(recognizer) => Some(Box::new(recognizer)),
                Err(err) => {
                    log_debug(&format!("dictation disabled: {err}"));
                    None
                }
            }
        };
    (synth, recognizer)
}

#[cfg(not(unix))]
fn build_engines(
    _config: &AppConfig,
) -> (
    Option<Box<dyn SpeechSynthesizer>>,
    Option<Box<dyn SpeechRecognizer>>,
) {
    log_debug("speech engines are only available on unix");
    (None, None)
}

fn main() -> Result<()> {
    let config = AppConfig::parse_args()?;
    init_logging(&config);
    install_panic_hook();
    log_debug("=== Aurora Mentor Started ===");
    log_debug(&format!("Log file: {:?}", log_file_path()));

    let data_dir = config.resolved_data_dir();
    log_debug(&format!("Data dir: {}", data_dir.display()));
    let session_storage = FileStore::open(&data_dir)
        .with_context(|| format!("cannot use data dir {}", data_dir.display()))?;
    let store = SessionStore::open(Box::new(session_storage));

    let api = HttpChatApi::new(
        &config.backend_url,
        Duration::from_millis(config.http_timeout_ms),
    )
    .context("cannot build backend client")?
    .with_timing_logs(config.log_timings);
    let api: Arc<dyn ChatApi> = Arc::new(api);

    let (synth, recognizer) = build_engines(&config);
    let voice = VoiceController::new(synth, recognizer, config.voice_settings());

    if config.json_ipc {
        return run_ipc_mode(&config, api, store, voice);
    }

    let profile = ProfileStore::new(Box::new(FileStore::open(&data_dir)?));
    Repl::new(&config, api, store, profile, voice).run()
}
