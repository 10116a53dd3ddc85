//! Read-aloud and dictation.
//!
//! [`VoiceController`] is the single owner of the platform engines. Front-ends
//! call it from their event loop and drain engine events with
//! [`VoiceController::poll_events`].

mod catalog;
#[cfg(unix)]
mod command;
mod controller;
mod engine;
mod filter;

pub use catalog::select_voice;
#[cfg(unix)]
pub use command::{CommandRecognizer, CommandSynthesizer};
pub use controller::{DictationState, SpeechState, VoiceController, VoicePoll, VoiceState};
pub use engine::{
    EngineEvent, EventSender, RecognitionId, SpeechRecognizer, SpeechSynthesizer, Utterance,
    UtteranceId, VoiceInfo,
};
pub use filter::clean_for_speech;

#[cfg(test)]
mod tests;
