use super::catalog::VoiceCatalog;
use super::engine::{
    EngineEvent, EventSender, RecognitionId, SpeechRecognizer, SpeechSynthesizer, Utterance,
    UtteranceId, VoiceInfo,
};
use super::filter::clean_for_speech;
use crate::config::VoiceSettings;
use crate::error::{MentorError, Result};
use crate::{log_debug, log_debug_content};
use crossbeam_channel::{unbounded, Receiver};
use serde::Serialize;
use std::time::{Duration, Instant};

/// Read-aloud state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechState {
    Idle,
    Speaking,
    Paused,
}

/// Dictation state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DictationState {
    Idle,
    Listening,
}

/// Snapshot callers render their controls from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct VoiceState {
    pub speaking: bool,
    pub paused: bool,
    pub listening: bool,
}

/// What happened during one [`VoiceController::poll_events`] pass.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct VoicePoll {
    pub state_changed: bool,
    pub errors: Vec<String>,
}

/// Owns the platform speech engines and serializes access to them.
///
/// At most one utterance and one recognition session are live at a time.
/// Starting a new utterance always preempts the previous one; there is no
/// queue. Engine events for an utterance or recognition session that has
/// already been replaced are ignored.
pub struct VoiceController {
    synth: Option<Box<dyn SpeechSynthesizer>>,
    recognizer: Option<Box<dyn SpeechRecognizer>>,
    settings: VoiceSettings,
    speech: SpeechState,
    dictation: DictationState,
    current_utterance: Option<UtteranceId>,
    next_utterance: UtteranceId,
    current_recognition: Option<RecognitionId>,
    next_recognition: RecognitionId,
    catalog: VoiceCatalog,
    events_tx: EventSender,
    events_rx: Receiver<EngineEvent>,
}

impl VoiceController {
    /// Either engine may be absent; the matching feature then reports
    /// `CapabilityUnsupported` instead of failing the whole controller.
    pub fn new(
        synth: Option<Box<dyn SpeechSynthesizer>>,
        recognizer: Option<Box<dyn SpeechRecognizer>>,
        settings: VoiceSettings,
    ) -> Self {
        let (events_tx, events_rx) = unbounded();
        let catalog = VoiceCatalog::new(Duration::from_millis(settings.voice_poll_ms));
        let mut controller = Self {
            synth,
            recognizer,
            settings,
            speech: SpeechState::Idle,
            dictation: DictationState::Idle,
            current_utterance: None,
            next_utterance: 1,
            current_recognition: None,
            next_recognition: 1,
            catalog,
            events_tx,
            events_rx,
        };
        controller.tick(Instant::now());
        controller
    }

    pub fn state(&self) -> VoiceState {
        VoiceState {
            speaking: self.speech != SpeechState::Idle,
            paused: self.speech == SpeechState::Paused,
            listening: self.dictation == DictationState::Listening,
        }
    }

    pub fn speech_state(&self) -> SpeechState {
        self.speech
    }

    pub fn dictation_state(&self) -> DictationState {
        self.dictation
    }

    pub fn can_speak(&self) -> bool {
        self.synth.is_some()
    }

    pub fn can_listen(&self) -> bool {
        self.recognizer.is_some()
    }

    pub fn voices(&self) -> &[VoiceInfo] {
        self.catalog.voices()
    }

    /// Sender engines can use for out-of-band notifications such as `VoicesChanged`.
    pub fn event_sender(&self) -> EventSender {
        self.events_tx.clone()
    }

    /// Speak `text`, interrupting anything already playing.
    ///
    /// Returns `Ok(false)` when nothing speakable is left after filtering.
    pub fn start(&mut self, text: &str) -> Result<bool> {
        let cleaned = clean_for_speech(text);
        if cleaned.is_empty() {
            return Ok(false);
        }
        let Some(synth) = self.synth.as_mut() else {
            return Err(MentorError::CapabilityUnsupported("speech synthesis"));
        };

        if self.speech != SpeechState::Idle {
            synth.cancel();
            log_debug("voice: preempting active utterance");
        }
        self.speech = SpeechState::Idle;
        self.current_utterance = None;

        if !self.catalog.is_loaded() {
            self.catalog.reload(synth.as_mut(), Instant::now());
        }

        let id = self.next_utterance;
        self.next_utterance += 1;
        let utterance = Utterance {
            id,
            text: cleaned,
            voice: self.catalog.preferred(),
            rate: self.settings.rate,
            pitch: self.settings.pitch,
        };
        log_debug_content(&format!("voice: speaking #{id}: {}", utterance.text));
        synth
            .speak(utterance, self.events_tx.clone())
            .inspect_err(|err| {
                tracing::warn!(error = %err, "speech synthesis failed to start");
            })?;

        self.speech = SpeechState::Speaking;
        self.current_utterance = Some(id);
        Ok(true)
    }

    /// Only meaningful while speaking.
    pub fn pause(&mut self) {
        if self.speech != SpeechState::Speaking {
            return;
        }
        if let Some(synth) = self.synth.as_mut() {
            synth.pause();
            self.speech = SpeechState::Paused;
        }
    }

    /// Only meaningful while paused.
    pub fn resume(&mut self) {
        if self.speech != SpeechState::Paused {
            return;
        }
        if let Some(synth) = self.synth.as_mut() {
            synth.resume();
            self.speech = SpeechState::Speaking;
        }
    }

    /// Always returns to idle; stopping when nothing plays is a no-op.
    pub fn stop(&mut self) {
        if self.speech != SpeechState::Idle {
            if let Some(synth) = self.synth.as_mut() {
                synth.cancel();
            }
        }
        self.speech = SpeechState::Idle;
        self.current_utterance = None;
    }

    /// Begin single-shot dictation. Already listening is a no-op.
    pub fn start_listening(&mut self) -> Result<()> {
        let Some(recognizer) = self.recognizer.as_mut() else {
            return Err(MentorError::CapabilityUnsupported("speech recognition"));
        };
        if self.dictation == DictationState::Listening {
            return Ok(());
        }
        let id = self.next_recognition;
        self.next_recognition += 1;
        recognizer
            .start(id, &self.settings.lang, self.events_tx.clone())
            .inspect_err(|err| {
                tracing::warn!(error = %err, "speech recognition failed to start");
            })?;
        log_debug(&format!("voice: listening #{id}"));
        self.dictation = DictationState::Listening;
        self.current_recognition = Some(id);
        Ok(())
    }

    /// Cancel dictation. Idempotent.
    pub fn stop_listening(&mut self) {
        if self.dictation == DictationState::Listening {
            if let Some(recognizer) = self.recognizer.as_mut() {
                recognizer.stop();
            }
        }
        self.dictation = DictationState::Idle;
        self.current_recognition = None;
    }

    /// Retry loading the voice catalog when it is still empty.
    pub fn tick(&mut self, now: Instant) {
        if let Some(synth) = self.synth.as_mut() {
            self.catalog.poll(synth.as_mut(), now);
        }
    }

    /// Apply every pending engine event. Final transcripts are cleaned and
    /// handed to `transcript_sink`.
    pub fn poll_events(&mut self, transcript_sink: &mut dyn FnMut(String)) -> VoicePoll {
        let before = self.state();
        let mut errors = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            if let Some(error) = self.apply(event, transcript_sink) {
                errors.push(error);
            }
        }
        VoicePoll {
            state_changed: self.state() != before,
            errors,
        }
    }

    fn apply(&mut self, event: EngineEvent, transcript_sink: &mut dyn FnMut(String)) -> Option<String> {
        match event {
            EngineEvent::SpeechEnded(id) => {
                if self.current_utterance == Some(id) {
                    self.speech = SpeechState::Idle;
                    self.current_utterance = None;
                }
                None
            }
            EngineEvent::SpeechFailed { id, message } => {
                if self.current_utterance != Some(id) {
                    return None;
                }
                self.speech = SpeechState::Idle;
                self.current_utterance = None;
                log_debug(&format!("voice: utterance #{id} failed: {message}"));
                Some(format!("speech output failed: {message}"))
            }
            EngineEvent::VoicesChanged => {
                if let Some(synth) = self.synth.as_mut() {
                    self.catalog.reload(synth.as_mut(), Instant::now());
                }
                None
            }
            EngineEvent::Transcript { id, text } => {
                if self.current_recognition != Some(id) {
                    return None;
                }
                self.dictation = DictationState::Idle;
                self.current_recognition = None;
                let cleaned = clean_for_speech(&text);
                if cleaned.is_empty() {
                    log_debug("voice: empty transcript dropped");
                } else {
                    log_debug_content(&format!("voice: transcript #{id}: {cleaned}"));
                    transcript_sink(cleaned);
                }
                None
            }
            EngineEvent::RecognitionEnded(id) => {
                if self.current_recognition == Some(id) {
                    self.dictation = DictationState::Idle;
                    self.current_recognition = None;
                }
                None
            }
            EngineEvent::RecognitionFailed { id, message } => {
                if self.current_recognition != Some(id) {
                    return None;
                }
                self.dictation = DictationState::Idle;
                self.current_recognition = None;
                log_debug(&format!("voice: recognition #{id} failed: {message}"));
                Some(format!("dictation failed: {message}"))
            }
        }
    }
}

impl Drop for VoiceController {
    fn drop(&mut self) {
        self.stop();
        self.stop_listening();
    }
}
