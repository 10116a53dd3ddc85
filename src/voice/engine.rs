//! Capability seams for platform speech engines.
//!
//! Engines run their work off the caller's thread and report lifecycle events
//! on the sender they are handed. The controller owns the receiving end and
//! drains it from the front-end's event loop.

use crate::error::Result;
use crossbeam_channel::Sender;

pub type UtteranceId = u64;
pub type RecognitionId = u64;

/// One entry of the engine's voice catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceInfo {
    pub name: String,
    pub lang: String,
}

impl VoiceInfo {
    pub fn new(name: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lang: lang.into(),
        }
    }
}

/// A single unit of speech handed to the synthesizer.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub id: UtteranceId,
    /// Already filtered for speech.
    pub text: String,
    /// `None` means the engine default voice.
    pub voice: Option<VoiceInfo>,
    pub rate: f32,
    pub pitch: f32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Utterance reached its natural end (or was cancelled).
    SpeechEnded(UtteranceId),
    SpeechFailed {
        id: UtteranceId,
        message: String,
    },
    /// The voice catalog changed and should be re-read.
    VoicesChanged,
    /// Final transcript for a recognition session.
    Transcript {
        id: RecognitionId,
        text: String,
    },
    /// Recognition finished, with or without a transcript.
    RecognitionEnded(RecognitionId),
    RecognitionFailed {
        id: RecognitionId,
        message: String,
    },
}

pub type EventSender = Sender<EngineEvent>;

/// Text-to-speech capability.
pub trait SpeechSynthesizer: Send {
    /// Current voice catalog. May be empty while the platform is still loading it.
    fn voices(&mut self) -> Vec<VoiceInfo>;

    /// Begin speaking. Must not block until the utterance finishes; completion is
    /// reported as `SpeechEnded`/`SpeechFailed` on `events`.
    fn speak(&mut self, utterance: Utterance, events: EventSender) -> Result<()>;

    fn pause(&mut self);

    fn resume(&mut self);

    /// Discard the current utterance. Safe to call when nothing is playing.
    fn cancel(&mut self);
}

/// Single-shot speech-to-text capability.
pub trait SpeechRecognizer: Send {
    /// Begin listening for one phrase in `lang`. The transcript (if any) and the
    /// end of the session are reported on `events` tagged with `id`.
    fn start(&mut self, id: RecognitionId, lang: &str, events: EventSender) -> Result<()>;

    /// Abort the current session. Safe to call when idle.
    fn stop(&mut self);
}
