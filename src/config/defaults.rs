use std::env;
use std::path::PathBuf;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000/api/v1";
pub const DEFAULT_USER_NAME: &str = "guest";
pub const DEFAULT_AI_NAME: &str = "Aurora Mentor";
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_VOICE_RATE: f32 = 1.0;
pub const DEFAULT_VOICE_PITCH: f32 = 1.1;
pub const DEFAULT_VOICE_POLL_MS: u64 = 200;
pub const DEFAULT_LANG: &str = "en-IN";

pub(super) const MIN_HTTP_TIMEOUT_MS: u64 = 1_000;
pub(super) const MAX_HTTP_TIMEOUT_MS: u64 = 300_000;
pub(super) const MAX_NAME_CHARS: usize = 64;
pub(super) const MAX_STT_ARGS: usize = 32;
pub(super) const MAX_STT_ARG_BYTES: usize = 4 * 1024;
pub(super) const TTS_ALLOWLIST: &[&str] = &["say", "espeak-ng", "espeak"];
pub(super) const ISO_639_1_CODES: &[&str] = &[
    "af", "am", "ar", "az", "be", "bg", "bn", "bs", "ca", "cs", "cy", "da", "de", "el", "en", "es",
    "et", "eu", "fa", "fi", "fil", "fr", "ga", "gl", "gu", "he", "hi", "hr", "hu", "hy", "id",
    "is", "it", "ja", "jv", "ka", "kk", "km", "kn", "ko", "lo", "lt", "lv", "mk", "ml", "mn", "mr",
    "ms", "my", "ne", "nl", "no", "pa", "pl", "pt", "ro", "ru", "si", "sk", "sl", "sq", "sr", "sv",
    "sw", "ta", "te", "th", "tr", "uk", "ur", "vi", "zh",
];

pub(super) fn default_tts_cmd() -> String {
    if cfg!(target_os = "macos") {
        "say".to_string()
    } else {
        "espeak-ng".to_string()
    }
}

/// `$XDG_DATA_HOME/aurora-mentor`, then `~/.local/share/aurora-mentor`, then the temp dir.
pub(super) fn default_data_dir() -> PathBuf {
    if let Some(xdg) = env::var_os("XDG_DATA_HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(xdg).join("aurora-mentor");
    }
    if let Some(home) = env::var_os("HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join("aurora-mentor");
    }
    env::temp_dir().join("aurora-mentor")
}
