//! Speech engines backed by external commands.
//!
//! Read-aloud pipes the filtered text into `say`, `espeak-ng`, or any
//! program that reads text on stdin. Dictation runs a user-supplied
//! recognizer command and treats its stdout as the final transcript.

use super::engine::{
    EngineEvent, EventSender, RecognitionId, SpeechRecognizer, SpeechSynthesizer, Utterance,
    VoiceInfo,
};
use crate::error::{MentorError, Result};
use crate::{lock_or_recover, log_debug};
use regex::Regex;
use std::io::{self, Read, Write};
use std::os::unix::process::ExitStatusExt;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread;
use std::time::Duration;

/// Baseline words per minute at rate 1.0.
const BASE_WPM: f32 = 175.0;
/// espeak pitch at multiplier 1.0 (its scale is 0..=99).
const BASE_ESPEAK_PITCH: f32 = 50.0;
const CHILD_POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TtsKind {
    Say,
    Espeak,
    Custom,
}

impl TtsKind {
    pub(crate) fn detect(program: &str) -> Self {
        let name = Path::new(program)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(program);
        if name == "say" {
            TtsKind::Say
        } else if name.starts_with("espeak") {
            TtsKind::Espeak
        } else {
            TtsKind::Custom
        }
    }
}

/// Text-to-speech through a child process per utterance.
pub struct CommandSynthesizer {
    program: String,
    kind: TtsKind,
    active: Option<Arc<Mutex<Child>>>,
}

impl CommandSynthesizer {
    pub fn new(program: impl Into<String>) -> Self {
        let program = program.into();
        let kind = TtsKind::detect(&program);
        Self {
            program,
            kind,
            active: None,
        }
    }

    fn build_command(&self, utterance: &Utterance) -> Command {
        let mut cmd = Command::new(&self.program);
        let wpm = (BASE_WPM * utterance.rate).round().max(1.0) as u32;
        match self.kind {
            TtsKind::Say => {
                cmd.args(["-r", &wpm.to_string()]);
                if let Some(voice) = &utterance.voice {
                    cmd.args(["-v", &voice.name]);
                }
            }
            TtsKind::Espeak => {
                let pitch = (BASE_ESPEAK_PITCH * utterance.pitch).round().clamp(0.0, 99.0) as u32;
                cmd.arg("--stdin");
                cmd.args(["-s", &wpm.to_string()]);
                cmd.args(["-p", &pitch.to_string()]);
                if let Some(voice) = &utterance.voice {
                    cmd.args(["-v", &voice.lang]);
                }
            }
            TtsKind::Custom => {
                cmd.env("AURORA_TTS_RATE", utterance.rate.to_string());
                cmd.env("AURORA_TTS_PITCH", utterance.pitch.to_string());
                if let Some(voice) = &utterance.voice {
                    cmd.env("AURORA_TTS_VOICE", &voice.name);
                }
            }
        }
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        cmd
    }

    fn signal_active(&self, signal: libc::c_int) {
        if let Some(child) = &self.active {
            let mut child = lock_or_recover(child, "CommandSynthesizer::signal_active");
            send_signal(&mut child, signal);
        }
    }
}

impl SpeechSynthesizer for CommandSynthesizer {
    fn voices(&mut self) -> Vec<VoiceInfo> {
        let listing = match self.kind {
            TtsKind::Say => run_listing(&self.program, &["-v", "?"]),
            TtsKind::Espeak => run_listing(&self.program, &["--voices"]),
            TtsKind::Custom => return vec![VoiceInfo::new("default", "")],
        };
        match listing {
            Ok(text) if self.kind == TtsKind::Say => parse_say_voices(&text),
            Ok(text) => parse_espeak_voices(&text),
            Err(err) => {
                log_debug(&format!("voice listing via {} failed: {err}", self.program));
                Vec::new()
            }
        }
    }

    fn speak(&mut self, utterance: Utterance, events: EventSender) -> Result<()> {
        self.cancel();
        let mut child = self.build_command(&utterance).spawn().map_err(|err| {
            MentorError::BackendUnavailable(format!("failed to start {}: {err}", self.program))
        })?;
        let stdin = child.stdin.take();
        let child = Arc::new(Mutex::new(child));
        self.active = Some(Arc::clone(&child));

        let id = utterance.id;
        let text = utterance.text;
        thread::spawn(move || {
            if let Some(mut stdin) = stdin {
                // A cancelled child closes the pipe early; that is not an error.
                let _ = stdin.write_all(text.as_bytes());
                let _ = stdin.write_all(b"\n");
            }
            let event = match wait_for_exit(&child) {
                Ok(status) if status.success() || status.signal().is_some() => {
                    EngineEvent::SpeechEnded(id)
                }
                Ok(status) => EngineEvent::SpeechFailed {
                    id,
                    message: format!("speech command exited with {status}"),
                },
                Err(err) => EngineEvent::SpeechFailed {
                    id,
                    message: err.to_string(),
                },
            };
            let _ = events.send(event);
        });
        Ok(())
    }

    fn pause(&mut self) {
        self.signal_active(libc::SIGSTOP);
    }

    fn resume(&mut self) {
        self.signal_active(libc::SIGCONT);
    }

    fn cancel(&mut self) {
        if let Some(child) = self.active.take() {
            let mut child = lock_or_recover(&child, "CommandSynthesizer::cancel");
            // A stopped process must be continued before it can handle the kill.
            send_signal(&mut child, libc::SIGCONT);
            let _ = child.kill();
        }
    }
}

impl Drop for CommandSynthesizer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Single-shot dictation through an external recognizer command.
///
/// The command receives the requested language in `AURORA_STT_LANG` and
/// must print the transcript on stdout before exiting.
pub struct CommandRecognizer {
    argv: Vec<String>,
    active: Option<Arc<Mutex<Child>>>,
}

impl CommandRecognizer {
    /// `argv` must be non-empty; config validation guarantees this.
    pub fn new(argv: Vec<String>) -> Result<Self> {
        if argv.is_empty() {
            return Err(MentorError::InvalidInput(
                "speech recognizer command is empty".to_string(),
            ));
        }
        Ok(Self { argv, active: None })
    }
}

impl SpeechRecognizer for CommandRecognizer {
    fn start(&mut self, id: RecognitionId, lang: &str, events: EventSender) -> Result<()> {
        self.stop();
        let mut child = Command::new(&self.argv[0])
            .args(&self.argv[1..])
            .env("AURORA_STT_LANG", lang)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| {
                MentorError::BackendUnavailable(format!("failed to start {}: {err}", self.argv[0]))
            })?;
        let stdout = child.stdout.take();
        let child = Arc::new(Mutex::new(child));
        self.active = Some(Arc::clone(&child));

        thread::spawn(move || {
            let mut transcript = String::new();
            let read = match stdout {
                Some(mut out) => out.read_to_string(&mut transcript).map(|_| ()),
                None => Ok(()),
            };
            let outcome = read.and_then(|()| wait_for_exit(&child));
            match outcome {
                Ok(status) if status.success() => {
                    if !transcript.trim().is_empty() {
                        let _ = events.send(EngineEvent::Transcript {
                            id,
                            text: transcript,
                        });
                    }
                    let _ = events.send(EngineEvent::RecognitionEnded(id));
                }
                Ok(status) if status.signal().is_some() => {
                    let _ = events.send(EngineEvent::RecognitionEnded(id));
                }
                Ok(status) => {
                    let _ = events.send(EngineEvent::RecognitionFailed {
                        id,
                        message: format!("recognizer exited with {status}"),
                    });
                }
                Err(err) => {
                    let _ = events.send(EngineEvent::RecognitionFailed {
                        id,
                        message: err.to_string(),
                    });
                }
            }
        });
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(child) = self.active.take() {
            let mut child = lock_or_recover(&child, "CommandRecognizer::stop");
            let _ = child.kill();
        }
    }
}

impl Drop for CommandRecognizer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Signal the child unless it has already exited. Returns whether a signal was sent.
///
/// Reaping only happens through `try_wait` under the same lock, so a child that
/// reports no exit status here still owns its pid.
fn send_signal(child: &mut Child, signal: libc::c_int) -> bool {
    if !matches!(child.try_wait(), Ok(None)) {
        return false;
    }
    let Ok(pid) = libc::pid_t::try_from(child.id()) else {
        return false;
    };
    // SAFETY: `pid` names a child we spawned and have not reaped yet.
    unsafe { libc::kill(pid, signal) == 0 }
}

/// Poll without holding the lock across sleeps so cancel can get in.
fn wait_for_exit(child: &Mutex<Child>) -> io::Result<ExitStatus> {
    loop {
        if let Some(status) = lock_or_recover(child, "wait_for_exit").try_wait()? {
            return Ok(status);
        }
        thread::sleep(CHILD_POLL_INTERVAL);
    }
}

fn run_listing(program: &str, args: &[&str]) -> io::Result<String> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()?;
    if !output.status.success() {
        return Err(io::Error::other(format!("exited with {}", output.status)));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Parse `say -v ?` output: `Name   lang_REGION   # sample sentence`.
pub(crate) fn parse_say_voices(listing: &str) -> Vec<VoiceInfo> {
    static SAY_RE: OnceLock<Regex> = OnceLock::new();
    let re = SAY_RE.get_or_init(|| {
        Regex::new(r"^(.+?)\s{2,}([A-Za-z]{2,3}[_-][A-Za-z0-9]+)\s+#").expect("say regex should compile")
    });
    listing
        .lines()
        .filter_map(|line| {
            let caps = re.captures(line)?;
            Some(VoiceInfo::new(caps[1].trim(), caps[2].replace('_', "-")))
        })
        .collect()
}

/// Parse `espeak-ng --voices` output, skipping the header row.
pub(crate) fn parse_espeak_voices(listing: &str) -> Vec<VoiceInfo> {
    listing
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 4 || fields[0] == "Pty" {
                return None;
            }
            Some(VoiceInfo::new(fields[3], fields[1]))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    const WAIT: Duration = Duration::from_secs(5);

    fn utterance(id: u64, text: &str) -> Utterance {
        Utterance {
            id,
            text: text.to_string(),
            voice: Some(VoiceInfo::new("Samantha", "en-US")),
            rate: 1.0,
            pitch: 1.0,
        }
    }

    fn args_of(cmd: &Command) -> Vec<String> {
        cmd.get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn exited_child_is_never_signalled() {
        let child = Command::new("true").spawn().expect("spawn true");
        let child = Mutex::new(child);
        assert!(wait_for_exit(&child).expect("wait").success());
        let mut child = lock_or_recover(&child, "test");
        assert!(!send_signal(&mut child, libc::SIGSTOP));
    }

    #[test]
    fn running_child_is_signalled() {
        let mut child = Command::new("sleep").arg("5").spawn().expect("spawn sleep");
        assert!(send_signal(&mut child, libc::SIGCONT));
        let _ = child.kill();
        let _ = child.wait();
    }

    #[test]
    fn pause_after_natural_end_is_harmless() {
        let mut synth = CommandSynthesizer::new("cat");
        let (tx, rx) = unbounded();
        synth.speak(utterance(11, "hello"), tx).expect("spawn cat");
        assert_eq!(rx.recv_timeout(WAIT).unwrap(), EngineEvent::SpeechEnded(11));
        synth.pause();
        synth.resume();
        synth.cancel();
    }

    #[test]
    fn detects_engine_from_program_name() {
        assert_eq!(TtsKind::detect("say"), TtsKind::Say);
        assert_eq!(TtsKind::detect("/usr/bin/say"), TtsKind::Say);
        assert_eq!(TtsKind::detect("espeak-ng"), TtsKind::Espeak);
        assert_eq!(TtsKind::detect("/opt/bin/espeak"), TtsKind::Espeak);
        assert_eq!(TtsKind::detect("piper-say"), TtsKind::Custom);
    }

    #[test]
    fn say_command_maps_rate_and_voice_name() {
        let synth = CommandSynthesizer::new("say");
        let mut u = utterance(1, "hi");
        u.rate = 2.0;
        let cmd = synth.build_command(&u);
        assert_eq!(args_of(&cmd), vec!["-r", "350", "-v", "Samantha"]);
    }

    #[test]
    fn espeak_command_maps_rate_pitch_and_language() {
        let synth = CommandSynthesizer::new("espeak-ng");
        let mut u = utterance(1, "hi");
        u.pitch = 1.1;
        let cmd = synth.build_command(&u);
        assert_eq!(
            args_of(&cmd),
            vec!["--stdin", "-s", "175", "-p", "55", "-v", "en-US"]
        );

        u.pitch = 5.0;
        u.voice = None;
        let cmd = synth.build_command(&u);
        assert_eq!(args_of(&cmd), vec!["--stdin", "-s", "175", "-p", "99"]);
    }

    #[test]
    fn parses_say_voice_listing() {
        let listing = "\
Alex                en_US    # Most people recognize me by my voice.
Bad News            en_US    # The light you see at the end of the tunnel is the headlamp of a fast approaching train.
Amélie              fr_CA    # Bonjour, je m'appelle Amélie.
garbage line
";
        let voices = parse_say_voices(listing);
        assert_eq!(
            voices,
            vec![
                VoiceInfo::new("Alex", "en-US"),
                VoiceInfo::new("Bad News", "en-US"),
                VoiceInfo::new("Amélie", "fr-CA"),
            ]
        );
    }

    #[test]
    fn parses_espeak_voice_listing() {
        let listing = "\
Pty Language       Age/Gender VoiceName          File                 Other Languages
 5  af              --/M      Afrikaans          gmw/af
 5  en-gb           --/M      English_(Great_Britain) gmw/en            (en 2)
 5  en-us           --/M      English_(America)  gmw/en-US            (en 3)
";
        let voices = parse_espeak_voices(listing);
        assert_eq!(voices.len(), 3);
        assert_eq!(voices[1], VoiceInfo::new("English_(Great_Britain)", "en-gb"));
    }

    #[test]
    fn custom_command_reports_natural_end() {
        let mut synth = CommandSynthesizer::new("cat");
        let (tx, rx) = unbounded();
        synth.speak(utterance(7, "hello"), tx).expect("spawn cat");
        assert_eq!(rx.recv_timeout(WAIT).unwrap(), EngineEvent::SpeechEnded(7));
    }

    #[test]
    fn failing_command_reports_failure() {
        let mut synth = CommandSynthesizer::new("false");
        let (tx, rx) = unbounded();
        synth.speak(utterance(3, "hello"), tx).expect("spawn false");
        match rx.recv_timeout(WAIT).unwrap() {
            EngineEvent::SpeechFailed { id, .. } => assert_eq!(id, 3),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn missing_program_is_backend_unavailable() {
        let mut synth = CommandSynthesizer::new("/nonexistent/aurora-tts");
        let (tx, _rx) = unbounded();
        assert!(matches!(
            synth.speak(utterance(1, "hello"), tx),
            Err(MentorError::BackendUnavailable(_))
        ));
    }

    #[test]
    fn recognizer_reports_stdout_as_transcript() {
        let mut rec = CommandRecognizer::new(vec![
            "sh".to_string(),
            "-c".to_string(),
            "printf '%s' \"$AURORA_STT_LANG\"".to_string(),
        ])
        .unwrap();
        let (tx, rx) = unbounded();
        rec.start(4, "en-IN", tx).expect("spawn sh");
        assert_eq!(
            rx.recv_timeout(WAIT).unwrap(),
            EngineEvent::Transcript {
                id: 4,
                text: "en-IN".to_string()
            }
        );
        assert_eq!(
            rx.recv_timeout(WAIT).unwrap(),
            EngineEvent::RecognitionEnded(4)
        );
    }

    #[test]
    fn stopped_recognizer_ends_without_transcript() {
        let mut rec = CommandRecognizer::new(vec!["sleep".to_string(), "5".to_string()]).unwrap();
        let (tx, rx) = unbounded();
        rec.start(9, "en", tx).expect("spawn sleep");
        rec.stop();
        assert_eq!(
            rx.recv_timeout(WAIT).unwrap(),
            EngineEvent::RecognitionEnded(9)
        );
    }

    #[test]
    fn recognizer_requires_a_command() {
        assert!(CommandRecognizer::new(Vec::new()).is_err());
    }
}
