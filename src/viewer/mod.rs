//! Viewer dispatch and viewer sessions.
//!
//! Opening an upload picks a presentation mode from the file extension and
//! the audio flag. Rendering itself belongs to external renderers plugged in
//! through [`PageRenderer`] and [`ReflowRenderer`]; the sessions here drive
//! them, remember where the reader was and turn renderer failures into an
//! error panel.
//!
//! The CLI ships no renderer. Front-ends plug theirs in through these traits.

pub mod extract;
pub mod position;
pub mod session;

use thiserror::Error;

use crate::domain::UploadedItem;
use crate::uploads::media::extension_of;

pub use extract::{DocumentExtractor, Extraction, HeuristicMobiExtractor};
pub use position::ReadingPositionStore;
pub use session::{LoadGuard, PageRenderer, PagedSession, ReflowRenderer, ReflowSession, ViewerOutcome};

/// How an upload is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerMode {
    /// Page-by-page document (PDF)
    Paginated,
    /// Reflowable book (EPUB)
    Reflowable,
    /// Best-effort text pulled from the file (MOBI)
    TextExtraction,
    /// Audio player
    Playback,
}

impl std::fmt::Display for ViewerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViewerMode::Paginated => write!(f, "paginated"),
            ViewerMode::Reflowable => write!(f, "reflowable"),
            ViewerMode::TextExtraction => write!(f, "text extraction"),
            ViewerMode::Playback => write!(f, "playback"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Renderer failed: {0}")]
    Render(String),
}

/// Pick a viewer from the file name and the audio flag.
///
/// The extension wins over the flag; the flag only decides for names with no
/// known document extension.
pub fn dispatch(name: &str, is_audio: bool) -> Result<ViewerMode, ViewerError> {
    match extension_of(name).as_deref() {
        Some("pdf") => Ok(ViewerMode::Paginated),
        Some("epub") => Ok(ViewerMode::Reflowable),
        Some("mobi") => Ok(ViewerMode::TextExtraction),
        _ if is_audio => Ok(ViewerMode::Playback),
        _ => Err(ViewerError::UnsupportedFormat(name.to_string())),
    }
}

/// [`dispatch`] for a stored upload
pub fn dispatch_item(item: &UploadedItem) -> Result<ViewerMode, ViewerError> {
    dispatch(&item.name, item.is_audio)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_extensions() {
        assert_eq!(dispatch("a.pdf", false).unwrap(), ViewerMode::Paginated);
        assert_eq!(dispatch("A.PDF", false).unwrap(), ViewerMode::Paginated);
        assert_eq!(dispatch("story.Epub", false).unwrap(), ViewerMode::Reflowable);
        assert_eq!(dispatch("old.mobi", false).unwrap(), ViewerMode::TextExtraction);
    }

    #[test]
    fn test_audio_flag_is_the_fallback() {
        assert_eq!(dispatch("track.mp3", true).unwrap(), ViewerMode::Playback);
        assert_eq!(dispatch("no-extension", true).unwrap(), ViewerMode::Playback);
        // Extension beats the flag
        assert_eq!(dispatch("odd.pdf", true).unwrap(), ViewerMode::Paginated);
    }

    #[test]
    fn test_unsupported() {
        assert!(matches!(
            dispatch("notes.txt", false),
            Err(ViewerError::UnsupportedFormat(name)) if name == "notes.txt"
        ));
        assert!(dispatch("track.mp3", false).is_err());
    }
}
