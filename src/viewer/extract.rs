//! Text extraction for formats without a renderer.
//!
//! [`HeuristicMobiExtractor`] does not decode MOBI. It scans the raw bytes for
//! runs of printable text, strips markup and keeps the result only if enough
//! readable characters survive. Compressed books usually fall below the
//! threshold and come back as [`Extraction::Insufficient`].

use std::sync::Arc;

use tracing::debug;

/// What an extractor produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Text(String),
    /// Too little readable text; offer the raw file instead
    Insufficient { readable_chars: usize },
}

pub trait DocumentExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Extraction;
}

/// Shortest run of printable bytes worth keeping
const MIN_RUN: usize = 24;

/// Best-effort printable-text scan
#[derive(Debug, Clone)]
pub struct HeuristicMobiExtractor {
    min_readable_chars: usize,
}

impl HeuristicMobiExtractor {
    pub fn new(min_readable_chars: usize) -> Self {
        Self { min_readable_chars }
    }

    /// Run [`DocumentExtractor::extract`] on the blocking pool
    pub async fn extract_off_thread(&self, bytes: Arc<[u8]>) -> Extraction {
        let this = self.clone();
        match tokio::task::spawn_blocking(move || this.extract(&bytes)).await {
            Ok(extraction) => extraction,
            Err(e) => {
                debug!("Extraction task failed: {}", e);
                Extraction::Insufficient { readable_chars: 0 }
            }
        }
    }
}

impl DocumentExtractor for HeuristicMobiExtractor {
    fn extract(&self, bytes: &[u8]) -> Extraction {
        let runs = printable_runs(bytes);
        let text = collapse_whitespace(&strip_tags(&runs.join("\n")));
        let readable_chars = text.chars().filter(|c| c.is_alphanumeric()).count();

        debug!(runs = runs.len(), readable_chars, "MOBI text scan finished");

        if readable_chars < self.min_readable_chars {
            Extraction::Insufficient { readable_chars }
        } else {
            Extraction::Text(text)
        }
    }
}

fn is_printable(b: u8) -> bool {
    b == b'\n' || b == b'\r' || b == b'\t' || (0x20..0x7f).contains(&b)
}

fn printable_runs(bytes: &[u8]) -> Vec<String> {
    bytes
        .split(|b| !is_printable(*b))
        .filter(|run| run.len() >= MIN_RUN)
        .map(|run| String::from_utf8_lossy(run).into_owned())
        .collect()
}

fn strip_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

/// Single spaces inside lines, one blank line between paragraphs
fn collapse_whitespace(text: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_mobi(body: &str) -> Vec<u8> {
        let mut bytes = vec![0u8, 1, 2, 0xff, 0xfe];
        bytes.extend_from_slice(b"BOOKMOBI");
        bytes.extend_from_slice(&[0, 0, 0x10, 0x80]);
        bytes.extend_from_slice(body.as_bytes());
        bytes.extend_from_slice(&[0, 0xc3, 0x28, 0]);
        bytes
    }

    #[test]
    fn test_extracts_markup_text() {
        let body = "<html><body><p>It was a bright cold day in April, and the clocks were striking thirteen.</p>\
                    <p>Winston Smith slipped quickly through the glass doors of Victory Mansions.</p></body></html>";
        let extractor = HeuristicMobiExtractor::new(50);

        match extractor.extract(&fake_mobi(body)) {
            Extraction::Text(text) => {
                assert!(text.contains("the clocks were striking thirteen."));
                assert!(!text.contains("<p>"));
                assert!(!text.contains("BOOKMOBI"));
            }
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn test_binary_noise_is_insufficient() {
        let noise: Vec<u8> = (0..4096u32).map(|i| (i * 7 % 256) as u8).collect();
        let extractor = HeuristicMobiExtractor::new(200);

        assert!(matches!(extractor.extract(&noise), Extraction::Insufficient { .. }));
    }

    #[test]
    fn test_threshold_counts_alphanumerics() {
        let body = "a a a a a a a a a a a a a a a a a a a a a a a a a a";
        let extractor = HeuristicMobiExtractor::new(27);
        assert_eq!(
            extractor.extract(&fake_mobi(body)),
            Extraction::Insufficient { readable_chars: 26 }
        );
    }

    #[test]
    fn test_strip_tags() {
        assert_eq!(collapse_whitespace(&strip_tags("<b>bold</b>  text")), "bold text");
    }

    #[tokio::test]
    async fn test_off_thread() {
        let extractor = HeuristicMobiExtractor::new(1);
        let bytes: Arc<[u8]> = fake_mobi("a perfectly ordinary sentence of text").into();
        assert!(matches!(extractor.extract_off_thread(bytes).await, Extraction::Text(_)));
    }
}
