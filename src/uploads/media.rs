//! Upload formats: extension tables, MIME inference and the uploader pre-filter.

use super::UploadError;

/// Extensions accepted by the document uploader
pub const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "epub", "mobi"];

/// Extensions accepted by the audiobook uploader
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "wav", "ogg", "aac"];

/// Which uploader a file was dropped on
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UploadTarget {
    Documents,
    Audio,
}

impl UploadTarget {
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            UploadTarget::Documents => DOCUMENT_EXTENSIONS,
            UploadTarget::Audio => AUDIO_EXTENSIONS,
        }
    }
}

/// Lowercased text after the last `.` of a file name.
///
/// Returns `None` when the name has no dot or ends with one.
pub fn extension_of(name: &str) -> Option<String> {
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_ascii_lowercase())
    }
}

/// MIME type for a file name, matched by extension case-insensitively.
pub fn mime_for_name(name: &str) -> Option<&'static str> {
    let ext = extension_of(name)?;

    let mime = match ext.as_str() {
        // Documents
        "pdf" => "application/pdf",
        "epub" => "application/epub+zip",
        "mobi" => "application/x-mobipocket-ebook",

        // Audio
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "aac" => "audio/aac",

        _ => return None,
    };

    Some(mime)
}

/// Audio classification used to route uploads
pub fn is_audio_mime(mime: &str) -> bool {
    mime.starts_with("audio/")
}

/// Pre-filter run by the uploaders before a file reaches the store.
pub fn accept_upload(name: &str, target: UploadTarget) -> Result<(), UploadError> {
    let accepted = extension_of(name)
        .map(|ext| target.extensions().contains(&ext.as_str()))
        .unwrap_or(false);

    if accepted {
        Ok(())
    } else {
        Err(UploadError::UnsupportedFormat {
            name: name.to_string(),
            expected: target.extensions().join(", "),
        })
    }
}
