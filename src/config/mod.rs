//! Command-line parsing and validation helpers.

mod defaults;
#[cfg(test)]
mod tests;
mod validation;

use clap::Parser;
use std::path::PathBuf;

use defaults::default_tts_cmd;
pub use defaults::{
    DEFAULT_AI_NAME, DEFAULT_BACKEND_URL, DEFAULT_HTTP_TIMEOUT_MS, DEFAULT_LANG,
    DEFAULT_USER_NAME, DEFAULT_VOICE_PITCH, DEFAULT_VOICE_POLL_MS, DEFAULT_VOICE_RATE,
};

/// CLI options for the Aurora Mentor chat client.
#[derive(Debug, Parser, Clone)]
#[command(about = "Aurora Mentor career chat client", author, version)]
pub struct AppConfig {
    /// Base URL of the chat backend API
    #[arg(long, env = "AURORA_BACKEND_URL", default_value = DEFAULT_BACKEND_URL)]
    pub backend_url: String,

    /// Name sent to the backend as the session owner
    #[arg(long, env = "AURORA_USER", default_value = DEFAULT_USER_NAME)]
    pub user_name: String,

    /// Display name for the mentor
    #[arg(long, default_value = DEFAULT_AI_NAME)]
    pub ai_name: String,

    /// Directory for the session list and avatar reference
    #[arg(long, env = "AURORA_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Backend request timeout (milliseconds)
    #[arg(long = "http-timeout-ms", default_value_t = DEFAULT_HTTP_TIMEOUT_MS)]
    pub http_timeout_ms: u64,

    /// Text-to-speech command (say, espeak-ng, espeak, or an absolute path)
    #[arg(long = "tts-cmd", env = "AURORA_TTS_CMD", default_value_t = default_tts_cmd())]
    pub tts_cmd: String,

    /// Speech-to-text command line; must print one transcript on stdout and exit
    #[arg(long = "stt-cmd", env = "AURORA_STT_CMD")]
    pub stt_cmd: Option<String>,

    /// `--stt-cmd` split into argv by `validate()`.
    #[arg(skip)]
    pub stt_argv: Vec<String>,

    /// Disable read-aloud entirely
    #[arg(long = "no-tts", default_value_t = false)]
    pub no_tts: bool,

    /// Disable dictation entirely
    #[arg(long = "no-stt", default_value_t = false)]
    pub no_stt: bool,

    /// Speech rate multiplier (1.0 = engine default)
    #[arg(long = "voice-rate", default_value_t = DEFAULT_VOICE_RATE)]
    pub voice_rate: f32,

    /// Speech pitch multiplier (1.0 = engine default)
    #[arg(long = "voice-pitch", default_value_t = DEFAULT_VOICE_PITCH)]
    pub voice_pitch: f32,

    /// Recognition language (BCP-47 style, e.g. en-IN)
    #[arg(long, default_value = DEFAULT_LANG)]
    pub lang: String,

    /// Retry interval while the voice catalog is still empty (milliseconds)
    #[arg(long = "voice-poll-ms", default_value_t = DEFAULT_VOICE_POLL_MS)]
    pub voice_poll_ms: u64,

    /// Read every mentor reply aloud as it arrives
    #[arg(long = "auto-speak", default_value_t = false)]
    pub auto_speak: bool,

    /// Enable file logging (debug)
    #[arg(long = "logs", env = "AURORA_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable all file logging (overrides --logs and log env vars)
    #[arg(long = "no-logs", env = "AURORA_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,

    /// Allow logging message/transcript snippets (debug log only)
    #[arg(long = "log-content", env = "AURORA_LOG_CONTENT", default_value_t = false)]
    pub log_content: bool,

    /// Enable verbose timing logs
    #[arg(long)]
    pub log_timings: bool,

    /// Run in JSON IPC mode for external UI integration
    #[arg(long = "json-ipc")]
    pub json_ipc: bool,
}

/// Speech parameters handed to the voice controller and engines.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSettings {
    pub rate: f32,
    pub pitch: f32,
    pub lang: String,
    pub voice_poll_ms: u64,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            rate: DEFAULT_VOICE_RATE,
            pitch: DEFAULT_VOICE_PITCH,
            lang: DEFAULT_LANG.to_string(),
            voice_poll_ms: DEFAULT_VOICE_POLL_MS,
        }
    }
}

impl AppConfig {
    pub fn logging_enabled(&self) -> bool {
        (self.logs || self.log_timings) && !self.no_logs
    }

    pub fn voice_settings(&self) -> VoiceSettings {
        VoiceSettings {
            rate: self.voice_rate,
            pitch: self.voice_pitch,
            lang: self.lang.clone(),
            voice_poll_ms: self.voice_poll_ms,
        }
    }

    /// Data directory after applying the platform default.
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(defaults::default_data_dir)
    }

    /// Owner id sent to the backend; blank names fall back to `guest`.
    pub fn owner_id(&self) -> &str {
        let trimmed = self.user_name.trim();
        if trimmed.is_empty() {
            DEFAULT_USER_NAME
        } else {
            trimmed
        }
    }
}
