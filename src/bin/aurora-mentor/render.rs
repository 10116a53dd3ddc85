//! Plain-terminal rendering for the chat REPL.

use aurora_mentor::api::Role;
use aurora_mentor::{Folder, Session, SessionStore, VoiceState};
use crossterm::style::Stylize;
use crossterm::terminal::size as terminal_size;
use std::io::IsTerminal;
use textwrap::{Options, WrapAlgorithm};

const FALLBACK_WIDTH: usize = 80;
const MIN_WIDTH: usize = 20;
const INDENT: &str = "  ";

/// Whether escape sequences are written at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Palette {
    pub(crate) color: bool,
}

impl Palette {
    /// Color only on a real terminal, and never when `NO_COLOR` is set.
    pub(crate) fn detect() -> Self {
        let color = std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal();
        Self { color }
    }

    fn paint(self, text: &str, style: fn(&str) -> String) -> String {
        if self.color {
            style(text)
        } else {
            text.to_string()
        }
    }

    pub(crate) fn user(self, text: &str) -> String {
        self.paint(text, |t| t.cyan().bold().to_string())
    }

    pub(crate) fn ai(self, text: &str) -> String {
        self.paint(text, |t| t.magenta().bold().to_string())
    }

    pub(crate) fn dim(self, text: &str) -> String {
        self.paint(text, |t| t.dark_grey().to_string())
    }

    pub(crate) fn error(self, text: &str) -> String {
        self.paint(text, |t| t.red().to_string())
    }
}

pub(crate) fn terminal_width() -> usize {
    terminal_size()
        .map(|(cols, _)| cols as usize)
        .unwrap_or(FALLBACK_WIDTH)
        .max(MIN_WIDTH)
}

/// Greedy word wrap by display width. Words wider than `width` are split.
pub(crate) fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let options = Options::new(width.max(1)).wrap_algorithm(WrapAlgorithm::FirstFit);
    let mut lines: Vec<String> = textwrap::wrap(text, options)
        .into_iter()
        .map(|line| line.trim_end().to_string())
        .collect();
    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    lines
}

/// Speaker header followed by the indented, wrapped body.
///
/// Escape sequences in the body are stripped; replies come from the network.
pub(crate) fn format_message(
    palette: Palette,
    role: Role,
    speaker: &str,
    text: &str,
    width: usize,
) -> String {
    let header = match role {
        Role::User => palette.user(speaker),
        Role::Ai => palette.ai(speaker),
    };
    let clean = strip_ansi_escapes::strip_str(text);
    let mut out = header;
    for line in wrap_text(&clean, width.saturating_sub(INDENT.len())) {
        out.push('\n');
        out.push_str(INDENT);
        out.push_str(&line);
    }
    out
}

/// Numbered quick replies on one line, e.g. `[1] Weekly plan  [2] Short summary`.
pub(crate) fn format_suggestions(palette: Palette, items: &[String]) -> Option<String> {
    if items.is_empty() {
        return None;
    }
    let line = items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("[{}] {item}", i + 1))
        .collect::<Vec<_>>()
        .join("  ");
    Some(palette.dim(&line))
}

/// Sidebar view: pinned sessions first, then every non-empty folder.
pub(crate) fn format_session_list(
    palette: Palette,
    store: &SessionStore,
    active: Option<&str>,
) -> String {
    if store.is_empty() {
        return palette.dim("No chats yet. Type a message or /new to start one.");
    }
    let entry = |session: &Session| {
        let marker = if Some(session.session_id.as_str()) == active {
            "▸"
        } else {
            " "
        };
        let pin = if session.pinned { " 📌" } else { "" };
        format!(
            "{marker} {}{pin}  {}",
            session.title,
            palette.dim(&session.session_id)
        )
    };

    let mut out = Vec::new();
    let pinned = store.pinned_sessions();
    if !pinned.is_empty() {
        out.push("📌 Pinned".to_string());
        out.extend(pinned.into_iter().map(entry));
    }
    for &folder in store.folders() {
        let members = store.sessions_in_folder(folder);
        if members.is_empty() {
            continue;
        }
        out.push(format!("{} {}", folder.icon(), folder.label()));
        out.extend(members.into_iter().map(entry));
    }
    out.join("\n")
}

pub(crate) fn format_folders() -> String {
    Folder::ALL
        .iter()
        .map(|folder| format!("{} {}", folder.icon(), folder.label()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub(crate) fn format_voice_state(state: VoiceState) -> &'static str {
    match (state.speaking, state.paused, state.listening) {
        (true, true, _) => "read-aloud paused",
        (true, false, true) => "speaking, listening",
        (true, false, false) => "speaking",
        (false, _, true) => "listening",
        (false, _, false) => "voice idle",
    }
}
