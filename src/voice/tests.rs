use super::*;
use crate::config::VoiceSettings;
use crate::error::MentorError;
use crate::lock_or_recover;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
enum SynthCall {
    Speak(Utterance),
    Pause,
    Resume,
    Cancel,
}

#[derive(Clone, Default)]
struct SynthRecorder {
    calls: Arc<Mutex<Vec<SynthCall>>>,
    events: Arc<Mutex<Option<EventSender>>>,
}

impl SynthRecorder {
    fn calls(&self) -> Vec<SynthCall> {
        lock_or_recover(&self.calls, "SynthRecorder::calls").clone()
    }

    fn spoken(&self) -> Vec<Utterance> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SynthCall::Speak(u) => Some(u),
                _ => None,
            })
            .collect()
    }

    fn emit(&self, event: EngineEvent) {
        let guard = lock_or_recover(&self.events, "SynthRecorder::emit");
        guard.as_ref().expect("speak was called").send(event).unwrap();
    }
}

struct FakeSynth {
    recorder: SynthRecorder,
    voices: Vec<VoiceInfo>,
    fail_speak: bool,
}

impl SpeechSynthesizer for FakeSynth {
    fn voices(&mut self) -> Vec<VoiceInfo> {
        self.voices.clone()
    }

    fn speak(&mut self, utterance: Utterance, events: EventSender) -> crate::Result<()> {
        if self.fail_speak {
            return Err(MentorError::CapabilityUnsupported("speech synthesis"));
        }
        *lock_or_recover(&self.recorder.events, "FakeSynth::speak") = Some(events);
        lock_or_recover(&self.recorder.calls, "FakeSynth::speak").push(SynthCall::Speak(utterance));
        Ok(())
    }

    fn pause(&mut self) {
        lock_or_recover(&self.recorder.calls, "FakeSynth::pause").push(SynthCall::Pause);
    }

    fn resume(&mut self) {
        lock_or_recover(&self.recorder.calls, "FakeSynth::resume").push(SynthCall::Resume);
    }

    fn cancel(&mut self) {
        lock_or_recover(&self.recorder.calls, "FakeSynth::cancel").push(SynthCall::Cancel);
    }
}

#[derive(Clone, Default)]
struct RecognizerRecorder {
    started: Arc<Mutex<Vec<(RecognitionId, String)>>>,
    stops: Arc<Mutex<usize>>,
    events: Arc<Mutex<Option<EventSender>>>,
}

impl RecognizerRecorder {
    fn emit(&self, event: EngineEvent) {
        let guard = lock_or_recover(&self.events, "RecognizerRecorder::emit");
        guard.as_ref().expect("start was called").send(event).unwrap();
    }

    fn last_id(&self) -> RecognitionId {
        lock_or_recover(&self.started, "RecognizerRecorder::last_id")
            .last()
            .expect("started")
            .0
    }
}

struct FakeRecognizer {
    recorder: RecognizerRecorder,
}

impl SpeechRecognizer for FakeRecognizer {
    fn start(&mut self, id: RecognitionId, lang: &str, events: EventSender) -> crate::Result<()> {
        *lock_or_recover(&self.recorder.events, "FakeRecognizer::start") = Some(events);
        lock_or_recover(&self.recorder.started, "FakeRecognizer::start").push((id, lang.to_string()));
        Ok(())
    }

    fn stop(&mut self) {
        *lock_or_recover(&self.recorder.stops, "FakeRecognizer::stop") += 1;
    }
}

fn voices() -> Vec<VoiceInfo> {
    vec![
        VoiceInfo::new("Daniel", "en-GB"),
        VoiceInfo::new("Jenny", "en-US"),
    ]
}

fn controller_with(voices: Vec<VoiceInfo>) -> (VoiceController, SynthRecorder, RecognizerRecorder) {
    let synth_rec = SynthRecorder::default();
    let listen_rec = RecognizerRecorder::default();
    let controller = VoiceController::new(
        Some(Box::new(FakeSynth {
            recorder: synth_rec.clone(),
            voices,
            fail_speak: false,
        })),
        Some(Box::new(FakeRecognizer {
            recorder: listen_rec.clone(),
        })),
        VoiceSettings::default(),
    );
    (controller, synth_rec, listen_rec)
}

fn drain(controller: &mut VoiceController) -> (VoicePoll, Vec<String>) {
    let mut transcripts = Vec::new();
    let poll = controller.poll_events(&mut |text| transcripts.push(text));
    (poll, transcripts)
}

#[test]
fn start_speaks_filtered_text_with_preferred_voice() {
    let (mut voice, synth, _) = controller_with(voices());
    assert!(voice.start("## Hello **world**_now_").unwrap());

    assert_eq!(
        voice.state(),
        VoiceState {
            speaking: true,
            paused: false,
            listening: false
        }
    );
    let spoken = synth.spoken();
    assert_eq!(spoken.len(), 1);
    assert_eq!(spoken[0].text, "Hello world now");
    assert_eq!(spoken[0].voice.as_ref().unwrap().name, "Jenny");
    assert_eq!(spoken[0].rate, 1.0);
    assert!((spoken[0].pitch - 1.1).abs() < f32::EPSILON);
}

#[test]
fn start_while_speaking_preempts_previous_utterance() {
    let (mut voice, synth, _) = controller_with(voices());
    voice.start("first reply").unwrap();
    voice.start("second reply").unwrap();

    let calls = synth.calls();
    assert!(matches!(calls[0], SynthCall::Speak(_)));
    assert_eq!(calls[1], SynthCall::Cancel);
    assert!(matches!(&calls[2], SynthCall::Speak(u) if u.text == "second reply"));
    assert_eq!(voice.speech_state(), SpeechState::Speaking);

    // The cancelled utterance reporting its end must not stop the new one.
    let first_id = synth.spoken()[0].id;
    synth.emit(EngineEvent::SpeechEnded(first_id));
    drain(&mut voice);
    assert_eq!(voice.speech_state(), SpeechState::Speaking);
}

#[test]
fn start_from_paused_also_preempts() {
    let (mut voice, synth, _) = controller_with(voices());
    voice.start("one").unwrap();
    voice.pause();
    voice.start("two").unwrap();
    assert_eq!(voice.speech_state(), SpeechState::Speaking);
    assert_eq!(
        synth.calls().iter().filter(|c| **c == SynthCall::Cancel).count(),
        1
    );
}

#[test]
fn natural_end_returns_to_idle() {
    let (mut voice, synth, _) = controller_with(voices());
    voice.start("reply").unwrap();
    let id = synth.spoken()[0].id;
    synth.emit(EngineEvent::SpeechEnded(id));
    let (poll, _) = drain(&mut voice);
    assert!(poll.state_changed);
    assert_eq!(voice.state(), VoiceState::default());
}

#[test]
fn pause_and_resume_only_apply_in_matching_states() {
    let (mut voice, synth, _) = controller_with(voices());
    voice.pause();
    voice.resume();
    assert!(synth.calls().is_empty());
    assert_eq!(voice.speech_state(), SpeechState::Idle);

    voice.start("reply").unwrap();
    voice.resume();
    assert_eq!(voice.speech_state(), SpeechState::Speaking);

    voice.pause();
    assert_eq!(voice.speech_state(), SpeechState::Paused);
    assert!(voice.state().paused && voice.state().speaking);
    voice.pause();

    voice.resume();
    assert_eq!(voice.speech_state(), SpeechState::Speaking);

    let controls: Vec<_> = synth
        .calls()
        .into_iter()
        .filter(|c| matches!(c, SynthCall::Pause | SynthCall::Resume))
        .collect();
    assert_eq!(controls, vec![SynthCall::Pause, SynthCall::Resume]);
}

#[test]
fn stop_is_idempotent_and_safe_when_idle() {
    let (mut voice, synth, _) = controller_with(voices());
    voice.stop();
    assert!(synth.calls().is_empty());

    voice.start("reply").unwrap();
    voice.pause();
    voice.stop();
    voice.stop();
    assert_eq!(voice.speech_state(), SpeechState::Idle);
    assert_eq!(
        synth.calls().iter().filter(|c| **c == SynthCall::Cancel).count(),
        1
    );
}

#[test]
fn empty_text_after_filtering_is_ignored() {
    let (mut voice, synth, _) = controller_with(voices());
    assert!(!voice.start("### ***").unwrap());
    assert!(synth.calls().is_empty());
    assert_eq!(voice.speech_state(), SpeechState::Idle);
}

#[test]
fn missing_synthesizer_reports_unsupported() {
    let mut voice = VoiceController::new(None, None, VoiceSettings::default());
    assert!(matches!(
        voice.start("hello"),
        Err(MentorError::CapabilityUnsupported(_))
    ));
    assert!(matches!(
        voice.start_listening(),
        Err(MentorError::CapabilityUnsupported(_))
    ));
    voice.stop();
    voice.stop_listening();
    assert_eq!(voice.state(), VoiceState::default());
}

#[test]
fn failed_speak_leaves_controller_idle() {
    let recorder = SynthRecorder::default();
    let mut voice = VoiceController::new(
        Some(Box::new(FakeSynth {
            recorder,
            voices: voices(),
            fail_speak: true,
        })),
        None,
        VoiceSettings::default(),
    );
    assert!(voice.start("hello").is_err());
    assert_eq!(voice.speech_state(), SpeechState::Idle);
}

#[test]
fn speech_failure_event_reports_error() {
    let (mut voice, synth, _) = controller_with(voices());
    voice.start("reply").unwrap();
    let id = synth.spoken()[0].id;
    synth.emit(EngineEvent::SpeechFailed {
        id,
        message: "device busy".to_string(),
    });
    let (poll, _) = drain(&mut voice);
    assert_eq!(poll.errors.len(), 1);
    assert!(poll.errors[0].contains("device busy"));
    assert_eq!(voice.speech_state(), SpeechState::Idle);
}

#[test]
fn empty_catalog_uses_engine_default_then_picks_up_late_voices() {
    let (mut voice, synth, _) = controller_with(Vec::new());
    voice.start("hello").unwrap();
    assert_eq!(synth.spoken()[0].voice, None);
    assert!(voice.voices().is_empty());
    voice.tick(Instant::now() + Duration::from_secs(1));
    assert!(voice.voices().is_empty());
}

#[test]
fn dictation_delivers_cleaned_transcript_once() {
    let (mut voice, _, recognizer) = controller_with(voices());
    voice.start_listening().unwrap();
    assert!(voice.state().listening);
    let id = recognizer.last_id();
    assert_eq!(
        lock_or_recover(&recognizer.started, "test")[0].1,
        VoiceSettings::default().lang
    );

    recognizer.emit(EngineEvent::Transcript {
        id,
        text: "  what *skills*   should I   learn ".to_string(),
    });
    recognizer.emit(EngineEvent::RecognitionEnded(id));
    let (poll, transcripts) = drain(&mut voice);
    assert!(poll.state_changed);
    assert_eq!(transcripts, vec!["what skills should I learn".to_string()]);
    assert!(!voice.state().listening);
}

#[test]
fn start_listening_twice_keeps_single_session() {
    let (mut voice, _, recognizer) = controller_with(voices());
    voice.start_listening().unwrap();
    voice.start_listening().unwrap();
    assert_eq!(lock_or_recover(&recognizer.started, "test").len(), 1);
}

#[test]
fn stop_listening_ignores_late_transcript() {
    let (mut voice, _, recognizer) = controller_with(voices());
    voice.start_listening().unwrap();
    let id = recognizer.last_id();
    voice.stop_listening();
    voice.stop_listening();
    assert_eq!(*lock_or_recover(&recognizer.stops, "test"), 1);

    recognizer.emit(EngineEvent::Transcript {
        id,
        text: "too late".to_string(),
    });
    let (_, transcripts) = drain(&mut voice);
    assert!(transcripts.is_empty());
    assert!(!voice.state().listening);
}

#[test]
fn recognition_end_without_transcript_returns_to_idle() {
    let (mut voice, _, recognizer) = controller_with(voices());
    voice.start_listening().unwrap();
    recognizer.emit(EngineEvent::RecognitionEnded(recognizer.last_id()));
    let (_, transcripts) = drain(&mut voice);
    assert!(transcripts.is_empty());
    assert!(!voice.state().listening);
}

#[test]
fn speech_and_dictation_are_independent() {
    let (mut voice, _, _) = controller_with(voices());
    voice.start("reply").unwrap();
    voice.start_listening().unwrap();
    assert_eq!(
        voice.state(),
        VoiceState {
            speaking: true,
            paused: false,
            listening: true
        }
    );
    voice.stop();
    assert!(voice.state().listening);
}
