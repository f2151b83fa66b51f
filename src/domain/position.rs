//! Saved reading/listening positions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which viewer wrote a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionKind {
    Pdf,
    Epub,
    Audio,
}

impl std::fmt::Display for PositionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PositionKind::Pdf => write!(f, "pdf"),
            PositionKind::Epub => write!(f, "epub"),
            PositionKind::Audio => write!(f, "audio"),
        }
    }
}

/// Where the user left off
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Position {
    /// 1-based page number
    Page(u32),

    /// Playback offset in seconds
    Seconds(f64),

    /// Opaque location token reported by a reflowable renderer
    Location(String),
}

/// Stored value under `reading-position:<kind>-<filename>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingPosition {
    pub file_name: String,
    pub position: Position,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl ReadingPosition {
    pub fn new(file_name: impl Into<String>, position: Position) -> Self {
        Self {
            file_name: file_name.into(),
            position,
            timestamp: Utc::now(),
        }
    }
}
