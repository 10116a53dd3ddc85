use crate::config::AppConfig;
use std::env;
use std::fs;
use std::io::Write;
use std::panic;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

const LOG_MAX_BYTES: u64 = 2 * 1024 * 1024;
const CRASH_LOG_MAX_BYTES: u64 = 128 * 1024;

static LOG_ENABLED: AtomicBool = AtomicBool::new(false);
static LOG_CONTENT_ENABLED: AtomicBool = AtomicBool::new(false);
static DEBUG_LOG: Mutex<Option<CappedLog>> = Mutex::new(None);

/// Debug log in the temp dir; truncated once it passes the size cap.
pub fn log_file_path() -> PathBuf {
    env::temp_dir().join("aurora_mentor.log")
}

fn crash_log_path() -> PathBuf {
    env::temp_dir().join("aurora_mentor_crash.log")
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Append-only file that starts over once `max_bytes` would be exceeded.
struct CappedLog {
    path: PathBuf,
    file: fs::File,
    max_bytes: u64,
    len: u64,
}

impl CappedLog {
    fn open(path: PathBuf, max_bytes: u64) -> Option<Self> {
        let existing = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        let fresh = existing > max_bytes;
        let file = fs::OpenOptions::new()
            .create(true)
            .append(!fresh)
            .write(true)
            .truncate(fresh)
            .open(&path)
            .ok()?;
        Some(Self {
            path,
            file,
            max_bytes,
            len: if fresh { 0 } else { existing },
        })
    }

    fn append(&mut self, line: &str) {
        let next = line.len() as u64;
        if self.len.saturating_add(next) > self.max_bytes {
            if let Some(fresh) = Self::open_truncated(&self.path) {
                self.file = fresh;
                self.len = 0;
            }
        }
        if self.file.write_all(line.as_bytes()).is_ok() {
            self.len = self.len.saturating_add(next);
        }
    }

    fn open_truncated(path: &Path) -> Option<fs::File> {
        fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .ok()
    }
}

/// Configure file logging and the JSON trace sink from CLI flags or environment.
pub fn init_logging(config: &AppConfig) {
    let enabled = config.logging_enabled();
    LOG_ENABLED.store(enabled, Ordering::Relaxed);
    LOG_CONTENT_ENABLED.store(enabled && config.log_content, Ordering::Relaxed);
    *DEBUG_LOG.lock().unwrap_or_else(|p| p.into_inner()) = enabled
        .then(|| CappedLog::open(log_file_path(), LOG_MAX_BYTES))
        .flatten();
    crate::telemetry::init_tracing(config);
}

/// Append a line to the debug log. Never writes to stdout so the chat view stays clean.
pub fn log_debug(msg: &str) {
    if !LOG_ENABLED.load(Ordering::Relaxed) {
        return;
    }
    let line = format!("[{}] {msg}\n", now_secs());
    if let Some(log) = DEBUG_LOG.lock().unwrap_or_else(|p| p.into_inner()).as_mut() {
        log.append(&line);
    }
}

/// Like [`log_debug`], but only with `--log-content`: the line carries user text.
pub fn log_debug_content(msg: &str) {
    if LOG_CONTENT_ENABLED.load(Ordering::Relaxed) {
        log_debug(msg);
    }
}

/// Crash log entry. The panic message is user-derived, so it is kept out unless
/// content logging is on.
pub fn log_panic(info: &panic::PanicHookInfo<'_>) {
    if !LOG_ENABLED.load(Ordering::Relaxed) {
        return;
    }
    let location = info
        .location()
        .map(|loc| format!("{}:{}", loc.file(), loc.line()))
        .unwrap_or_else(|| "unknown".to_string());
    let payload = if LOG_CONTENT_ENABLED.load(Ordering::Relaxed) {
        info.payload()
            .downcast_ref::<&str>()
            .map(|text| (*text).to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string())
    } else {
        "payload omitted".to_string()
    };
    if let Some(mut log) = CappedLog::open(crash_log_path(), CRASH_LOG_MAX_BYTES) {
        log.append(&format!(
            "[{}] panic at {location}: {payload} (v{})\n",
            now_secs(),
            env!("CARGO_PKG_VERSION")
        ));
    }
}
