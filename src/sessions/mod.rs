//! Persisted chat-session metadata (not the messages themselves).

mod store;

pub use store::SessionStore;

use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_TITLE: &str = "New Career Chat";

/// Sidebar categories a session can be filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Folder {
    #[default]
    RoadmapsPlanning,
    ResumeProfile,
    SkillTraining,
    Productivity,
    Interviews,
    Projects,
    Motivation,
    JobSearch,
}

impl Folder {
    pub const ALL: [Folder; 8] = [
        Folder::RoadmapsPlanning,
        Folder::ResumeProfile,
        Folder::SkillTraining,
        Folder::Productivity,
        Folder::Interviews,
        Folder::Projects,
        Folder::Motivation,
        Folder::JobSearch,
    ];

    /// Persisted and displayed name.
    pub fn label(self) -> &'static str {
        match self {
            Folder::RoadmapsPlanning => "Roadmaps & Planning",
            Folder::ResumeProfile => "Resume / LinkedIn / Portfolio",
            Folder::SkillTraining => "Skill Training & Courses",
            Folder::Productivity => "Productivity & Study Strategy",
            Folder::Interviews => "Interviews & Communication",
            Folder::Projects => "Projects & Real-World Experience",
            Folder::Motivation => "Motivation & Mindset Growth",
            Folder::JobSearch => "Job Search & Applications",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Folder::RoadmapsPlanning => "🧭",
            Folder::ResumeProfile => "💼",
            Folder::SkillTraining => "📚",
            Folder::Productivity => "⚡",
            Folder::Interviews => "🎙",
            Folder::Projects => "🛠",
            Folder::Motivation => "🌱",
            Folder::JobSearch => "📨",
        }
    }

    /// Match user text against the folder set: the full label (any case), or a
    /// prefix that identifies exactly one folder.
    pub fn parse(input: &str) -> Option<Folder> {
        let needle = input.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        if let Some(exact) = Folder::ALL
            .into_iter()
            .find(|folder| folder.label().to_lowercase() == needle)
        {
            return Some(exact);
        }
        let mut matches = Folder::ALL
            .into_iter()
            .filter(|folder| folder.label().to_lowercase().starts_with(&needle));
        match (matches.next(), matches.next()) {
            (Some(only), None) => Some(only),
            _ => None,
        }
    }
}

impl fmt::Display for Folder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<String> for Folder {
    /// Unknown labels in stored data land in the default folder instead of
    /// failing the whole session list.
    fn from(value: String) -> Self {
        Folder::ALL
            .into_iter()
            .find(|folder| folder.label() == value)
            .unwrap_or_else(|| {
                crate::log_debug(&format!("unknown folder '{value}', using default"));
                Folder::default()
            })
    }
}

impl From<Folder> for String {
    fn from(value: Folder) -> Self {
        value.label().to_string()
    }
}

/// One persisted session entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub folder: Folder,
    #[serde(default)]
    pub pinned: bool,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub updated_at: u64,
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

impl Session {
    pub fn new(session_id: impl Into<String>, now_ms: u64) -> Self {
        Self {
            session_id: session_id.into(),
            title: default_title(),
            folder: Folder::default(),
            pinned: false,
            updated_at: now_ms,
        }
    }
}
