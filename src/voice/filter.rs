/// Markup characters the synthesizer would otherwise read out loud.
const BLOCKED: &[char] = &[
    '#', '@', '$', '%', '^', '*', '&', '_', '=', '<', '>', '`', '~', '{', '}', '|',
];

/// Replace markdown/markup noise with spaces and collapse whitespace runs.
///
/// Used for both read-aloud input and dictation transcripts.
pub fn clean_for_speech(text: &str) -> String {
    text.split(|ch: char| BLOCKED.contains(&ch) || ch.is_whitespace())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
