use super::defaults::{
    ISO_639_1_CODES, MAX_HTTP_TIMEOUT_MS, MAX_NAME_CHARS, MAX_STT_ARGS, MAX_STT_ARG_BYTES,
    MIN_HTTP_TIMEOUT_MS, TTS_ALLOWLIST,
};
use super::AppConfig;
use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use std::{fs, path::Path};

impl AppConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let mut config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Check CLI values and normalize commands.
    pub fn validate(&mut self) -> Result<()> {
        self.backend_url = validate_backend_url(&self.backend_url)?;

        self.user_name = self.user_name.trim().to_string();
        if self.user_name.chars().count() > MAX_NAME_CHARS {
            bail!("--user-name must be at most {MAX_NAME_CHARS} characters");
        }
        if self.user_name.chars().any(|ch| ch.is_control() || ch == '/') {
            bail!("--user-name must not contain control characters or '/'");
        }
        self.ai_name = self.ai_name.trim().to_string();
        if self.ai_name.is_empty() || self.ai_name.chars().count() > MAX_NAME_CHARS {
            bail!("--ai-name must be between 1 and {MAX_NAME_CHARS} characters");
        }

        if !(MIN_HTTP_TIMEOUT_MS..=MAX_HTTP_TIMEOUT_MS).contains(&self.http_timeout_ms) {
            bail!(
                "--http-timeout-ms must be between {MIN_HTTP_TIMEOUT_MS} and {MAX_HTTP_TIMEOUT_MS}, got {}",
                self.http_timeout_ms
            );
        }
        if !(0.1..=10.0).contains(&self.voice_rate) {
            bail!(
                "--voice-rate must be between 0.1 and 10.0, got {}",
                self.voice_rate
            );
        }
        if !(0.0..=2.0).contains(&self.voice_pitch) {
            bail!(
                "--voice-pitch must be between 0.0 and 2.0, got {}",
                self.voice_pitch
            );
        }
        if !(50..=5_000).contains(&self.voice_poll_ms) {
            bail!(
                "--voice-poll-ms must be between 50 and 5000, got {}",
                self.voice_poll_ms
            );
        }

        validate_lang(&self.lang)?;

        if !self.no_tts {
            self.tts_cmd = sanitize_binary(&self.tts_cmd, "--tts-cmd", TTS_ALLOWLIST)?;
        }

        self.stt_argv = match self.stt_cmd.as_deref() {
            Some(raw) if !self.no_stt => split_stt_command(raw)?,
            _ => Vec::new(),
        };

        Ok(())
    }
}

/// Only plain http(s) URLs; trailing slashes are dropped so paths join cleanly.
pub(super) fn validate_backend_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        bail!("--backend-url cannot be empty");
    }
    let rest = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"))
        .ok_or_else(|| anyhow!("--backend-url must start with http:// or https://"))?;
    if rest.is_empty() || rest.starts_with('/') {
        bail!("--backend-url is missing a host");
    }
    if trimmed.chars().any(|ch| ch.is_whitespace() || ch.is_control()) {
        bail!("--backend-url must not contain whitespace");
    }
    Ok(trimmed.to_string())
}

pub(super) fn validate_lang(lang: &str) -> Result<()> {
    if lang.trim().is_empty() {
        bail!("--lang must not be empty");
    }
    if !lang
        .chars()
        .all(|ch| ch.is_ascii_alphabetic() || ch == '-' || ch == '_')
    {
        bail!("--lang must contain only alphabetic characters or '-'/'_' separators");
    }
    // Allow locale-style values but only check the leading ISO-639-1 code.
    let primary = lang
        .split(['-', '_'])
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();
    if !ISO_639_1_CODES.contains(&primary.as_str()) {
        bail!("--lang must start with a valid ISO-639-1 code, got '{lang}'");
    }
    Ok(())
}

pub(super) fn split_stt_command(raw: &str) -> Result<Vec<String>> {
    let argv = shell_words::split(raw)
        .with_context(|| format!("failed to parse --stt-cmd '{raw}'"))?;
    let Some(program) = argv.first() else {
        bail!("--stt-cmd cannot be empty");
    };
    if program.trim().is_empty() {
        bail!("--stt-cmd cannot be empty");
    }
    if argv.len() > MAX_STT_ARGS {
        bail!(
            "--stt-cmd has too many arguments (max {MAX_STT_ARGS}, got {})",
            argv.len()
        );
    }
    let total_bytes: usize = argv.iter().map(|arg| arg.len()).sum();
    if total_bytes > MAX_STT_ARG_BYTES {
        bail!("--stt-cmd length exceeds {MAX_STT_ARG_BYTES} bytes");
    }
    if argv
        .iter()
        .any(|arg| arg.chars().any(|ch| matches!(ch, '\n' | '\r' | '\0')))
    {
        bail!("--stt-cmd must not contain control characters");
    }
    Ok(argv)
}

/// Allow either a known binary name or an absolute path.
pub(super) fn sanitize_binary(value: &str, flag: &str, allowlist: &[&str]) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        bail!("{flag} cannot be empty");
    }
    if let Some(allowed) = allowlist
        .iter()
        .find(|candidate| candidate.eq_ignore_ascii_case(trimmed))
    {
        return Ok((*allowed).to_string());
    }

    let path = Path::new(trimmed);
    if path.is_absolute() || trimmed.contains(std::path::MAIN_SEPARATOR) {
        let canonical = path
            .canonicalize()
            .with_context(|| format!("failed to canonicalize {flag} '{trimmed}'"))?;
        let metadata = fs::metadata(&canonical)
            .with_context(|| format!("failed to inspect {flag} '{}'", canonical.display()))?;
        if !metadata.is_file() {
            bail!("{flag} '{}' is not a file", canonical.display());
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = metadata.permissions().mode();
            if mode & 0o111 == 0 {
                bail!(
                    "{flag} '{}' exists but is not executable (mode {:o})",
                    canonical.display(),
                    mode
                );
            }
        }
        return canonical
            .to_str()
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow!("{flag} must be valid UTF-8"));
    }

    bail!("{flag} must be one of {allowlist:?} or an existing binary path");
}
