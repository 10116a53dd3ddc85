use super::engine::{SpeechSynthesizer, VoiceInfo};
use crate::log_debug;
use regex::Regex;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Cached voice list with a retry timer for engines that load it lazily.
pub(crate) struct VoiceCatalog {
    voices: Vec<VoiceInfo>,
    poll_interval: Duration,
    next_poll: Option<Instant>,
}

impl VoiceCatalog {
    pub(crate) fn new(poll_interval: Duration) -> Self {
        Self {
            voices: Vec::new(),
            poll_interval,
            next_poll: None,
        }
    }

    pub(crate) fn voices(&self) -> &[VoiceInfo] {
        &self.voices
    }

    pub(crate) fn is_loaded(&self) -> bool {
        !self.voices.is_empty()
    }

    /// Re-read the catalog now. An empty answer schedules another attempt.
    pub(crate) fn reload(&mut self, synth: &mut dyn SpeechSynthesizer, now: Instant) {
        self.voices = synth.voices();
        if self.voices.is_empty() {
            self.next_poll = Some(now + self.poll_interval);
        } else {
            log_debug(&format!("voice catalog loaded ({} voices)", self.voices.len()));
            self.next_poll = None;
        }
    }

    /// Retry on the timer until the engine reports at least one voice.
    /// Returns true when this call populated the catalog.
    pub(crate) fn poll(&mut self, synth: &mut dyn SpeechSynthesizer, now: Instant) -> bool {
        if self.is_loaded() {
            return false;
        }
        if matches!(self.next_poll, Some(due) if now < due) {
            return false;
        }
        self.reload(synth, now);
        self.is_loaded()
    }

    pub(crate) fn preferred(&self) -> Option<VoiceInfo> {
        select_voice(&self.voices).cloned()
    }
}

/// Prefer a voice whose name sounds female, then one named English, then the first.
pub fn select_voice(voices: &[VoiceInfo]) -> Option<&VoiceInfo> {
    static FEMALE_RE: OnceLock<Regex> = OnceLock::new();
    let female = FEMALE_RE.get_or_init(|| {
        Regex::new(r"(?i)female|woman|siri|zira|aria|jenny").expect("voice regex should compile")
    });
    voices
        .iter()
        .find(|voice| female.is_match(&voice.name))
        .or_else(|| {
            voices
                .iter()
                .find(|voice| voice.name.to_lowercase().contains("english"))
        })
        .or_else(|| voices.first())
}
