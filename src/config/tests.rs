use super::defaults::{default_data_dir, MAX_STT_ARGS};
use super::validation::{sanitize_binary, split_stt_command, validate_backend_url, validate_lang};
use super::{AppConfig, DEFAULT_BACKEND_URL, DEFAULT_LANG, DEFAULT_USER_NAME};
use clap::Parser;
use std::fs;

fn base_config() -> AppConfig {
    AppConfig::parse_from(["test-app", "--no-tts"])
}

#[test]
fn defaults_are_valid() {
    let mut cfg = base_config();
    cfg.validate().expect("defaults should validate");
    assert_eq!(cfg.backend_url, DEFAULT_BACKEND_URL);
    assert_eq!(cfg.lang, DEFAULT_LANG);
    assert!(cfg.stt_argv.is_empty());
}

#[test]
fn backend_url_trailing_slash_is_dropped() {
    assert_eq!(
        validate_backend_url("https://mentor.example/api/v1/").unwrap(),
        "https://mentor.example/api/v1"
    );
}

#[test]
fn rejects_backend_url_without_scheme_or_host() {
    assert!(validate_backend_url("localhost:8000").is_err());
    assert!(validate_backend_url("http://").is_err());
    assert!(validate_backend_url("ftp://mentor.example").is_err());
    assert!(validate_backend_url("http://bad host/api").is_err());
}

#[test]
fn rejects_http_timeout_out_of_bounds() {
    let mut cfg = AppConfig::parse_from(["test-app", "--no-tts", "--http-timeout-ms", "999"]);
    assert!(cfg.validate().is_err());
    let mut cfg = AppConfig::parse_from(["test-app", "--no-tts", "--http-timeout-ms", "300001"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_voice_rate_and_pitch_out_of_bounds() {
    let mut cfg = AppConfig::parse_from(["test-app", "--no-tts", "--voice-rate", "0.05"]);
    assert!(cfg.validate().is_err());
    let mut cfg = AppConfig::parse_from(["test-app", "--no-tts", "--voice-pitch", "2.5"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_voice_poll_out_of_bounds() {
    let mut cfg = AppConfig::parse_from(["test-app", "--no-tts", "--voice-poll-ms", "10"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn language_rules_follow_iso_prefix() {
    assert!(validate_lang("en-IN").is_ok());
    assert!(validate_lang("pt_BR").is_ok());
    assert!(validate_lang("zz-ZZ").is_err());
    assert!(validate_lang("en$").is_err());
    assert!(validate_lang(" ").is_err());
}

#[test]
fn blank_user_name_falls_back_to_guest_owner() {
    let mut cfg = AppConfig::parse_from(["test-app", "--no-tts", "--user-name", "   "]);
    cfg.validate().expect("blank user is allowed");
    assert_eq!(cfg.owner_id(), DEFAULT_USER_NAME);
}

#[test]
fn rejects_user_name_with_path_separator() {
    let mut cfg = AppConfig::parse_from(["test-app", "--no-tts", "--user-name", "a/b"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn stt_command_is_split_into_argv() {
    let mut cfg = AppConfig::parse_from([
        "test-app",
        "--no-tts",
        "--stt-cmd",
        "whisper-once --model 'base en'",
    ]);
    cfg.validate().expect("stt command should parse");
    assert_eq!(cfg.stt_argv, vec!["whisper-once", "--model", "base en"]);
}

#[test]
fn stt_command_ignored_when_dictation_disabled() {
    let mut cfg = AppConfig::parse_from([
        "test-app",
        "--no-tts",
        "--no-stt",
        "--stt-cmd",
        "whisper-once",
    ]);
    cfg.validate().expect("valid");
    assert!(cfg.stt_argv.is_empty());
}

#[test]
fn rejects_unbalanced_or_oversized_stt_command() {
    assert!(split_stt_command("whisper 'unterminated").is_err());
    assert!(split_stt_command("   ").is_err());
    let many = vec!["a"; MAX_STT_ARGS + 1].join(" ");
    assert!(split_stt_command(&many).is_err());
}

#[test]
fn sanitize_binary_accepts_allowlisted_names_case_insensitively() {
    let resolved = sanitize_binary("ESPEAK-NG", "--tts-cmd", &["espeak-ng"]).unwrap();
    assert_eq!(resolved, "espeak-ng");
}

#[test]
fn sanitize_binary_rejects_unknown_bare_names() {
    assert!(sanitize_binary("festival", "--tts-cmd", &["say"]).is_err());
}

#[cfg(unix)]
#[test]
fn sanitize_binary_requires_executable_bit() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("tts");
    fs::write(&path, "#!/bin/sh\n").expect("write script");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).expect("chmod");
    let arg = path.to_string_lossy().to_string();
    assert!(sanitize_binary(&arg, "--tts-cmd", &[]).is_err());

    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
    let resolved = sanitize_binary(&arg, "--tts-cmd", &[]).expect("executable accepted");
    assert!(resolved.ends_with("tts"));
}

#[test]
fn logging_flags_combine() {
    let cfg = AppConfig::parse_from(["test-app", "--logs", "--no-logs"]);
    assert!(!cfg.logging_enabled());
    let cfg = AppConfig::parse_from(["test-app", "--log-timings"]);
    assert!(cfg.logging_enabled());
}

#[test]
fn explicit_data_dir_wins_over_default() {
    let cfg = AppConfig::parse_from(["test-app", "--data-dir", "/tmp/aurora-test"]);
    assert_eq!(
        cfg.resolved_data_dir(),
        std::path::PathBuf::from("/tmp/aurora-test")
    );
    assert!(default_data_dir().ends_with("aurora-mentor"));
}
