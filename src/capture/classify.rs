//! Payload classification.
//!
//! A cheap extension-based media type guess is combined with a content sniff
//! over a bounded sample, so classification cost does not grow with file size.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::capture::record::{PayloadKind, BINARY_BODY, IMAGE_BODY};

/// Default number of leading bytes sampled for text detection and preview.
pub const DEFAULT_PREVIEW_BYTES: usize = 500;

/// Default printable fraction a sample must exceed to count as text.
pub const DEFAULT_TEXT_THRESHOLD: f64 = 0.9;

/// Outcome of classifying one payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub kind: PayloadKind,
    pub mime_type: Option<String>,
    /// Decoded leading text, present only for [`PayloadKind::Text`].
    pub preview: Option<String>,
}

impl Classification {
    /// Display body: the preview for text, otherwise a sentinel.
    pub fn body(&self) -> String {
        match self.kind {
            PayloadKind::Text => self.preview.clone().unwrap_or_default(),
            PayloadKind::Image => IMAGE_BODY.to_string(),
            PayloadKind::Binary => BINARY_BODY.to_string(),
        }
    }
}

/// Assigns text / image / binary to stored files or in-memory payloads.
#[derive(Debug, Clone)]
pub struct Classifier {
    preview_bytes: usize,
    text_threshold: f64,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(DEFAULT_PREVIEW_BYTES, DEFAULT_TEXT_THRESHOLD)
    }
}

impl Classifier {
    pub fn new(preview_bytes: usize, text_threshold: f64) -> Self {
        Self {
            preview_bytes,
            text_threshold,
        }
    }

    pub fn preview_bytes(&self) -> usize {
        self.preview_bytes
    }

    /// Classify a file on disk, reading at most `preview_bytes` of it.
    pub fn classify_file(&self, path: &Path) -> io::Result<Classification> {
        let mut sample = Vec::with_capacity(self.preview_bytes);
        File::open(path)?
            .take(self.preview_bytes as u64)
            .read_to_end(&mut sample)?;
        Ok(self.classify_sample(&sample, &path.to_string_lossy()))
    }

    /// Classify an in-memory payload; `name` only feeds the media type guess.
    pub fn classify_bytes(&self, data: &[u8], name: &str) -> Classification {
        let end = data.len().min(self.preview_bytes);
        self.classify_sample(&data[..end], name)
    }

    fn classify_sample(&self, sample: &[u8], name: &str) -> Classification {
        let mime_type = guess_mime(name);
        let text = decode_sample(sample);

        if self.is_text(&text) {
            let preview: String = text.chars().take(self.preview_bytes).collect();
            return Classification {
                kind: PayloadKind::Text,
                mime_type,
                preview: Some(preview),
            };
        }

        let kind = match mime_type.as_deref() {
            Some(mime) if mime.starts_with("image/") => PayloadKind::Image,
            _ => PayloadKind::Binary,
        };
        Classification {
            kind,
            mime_type,
            preview: None,
        }
    }

    /// True when the printable fraction of a non-empty sample exceeds the threshold.
    pub fn is_text(&self, text: &str) -> bool {
        match printable_ratio(text) {
            Some(ratio) => ratio > self.text_threshold,
            None => false,
        }
    }
}

/// Media type guessed from a filename's extension.
pub fn guess_mime(name: &str) -> Option<String> {
    mime_guess::from_path(name).first().map(|m| m.essence_str().to_string())
}

/// Fraction of printable characters, `None` for an empty sample.
///
/// Replacement characters left by invalid UTF-8 count as unprintable.
pub fn printable_ratio(text: &str) -> Option<f64> {
    let mut total = 0usize;
    let mut printable = 0usize;
    for c in text.chars() {
        total += 1;
        if is_printable(c) {
            printable += 1;
        }
    }
    if total == 0 {
        return None;
    }
    Some(printable as f64 / total as f64)
}

fn is_printable(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\t') || (!c.is_control() && c != char::REPLACEMENT_CHARACTER)
}

/// Lossy UTF-8 decode of a sample, ignoring a code point cut off at its end.
fn decode_sample(sample: &[u8]) -> String {
    String::from_utf8_lossy(trim_partial_char(sample)).into_owned()
}

fn trim_partial_char(sample: &[u8]) -> &[u8] {
    let len = sample.len();
    for back in 1..=len.min(4) {
        let byte = sample[len - back];
        if byte & 0xC0 == 0x80 {
            continue;
        }
        let width = match byte {
            0xF0..=0xFF => 4,
            0xE0..=0xEF => 3,
            0xC0..=0xDF => 2,
            _ => 1,
        };
        return if width > back { &sample[..len - back] } else { sample };
    }
    sample
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_with_printable(printable: usize, total: usize) -> Vec<u8> {
        let mut sample = vec![b'a'; printable];
        sample.extend(std::iter::repeat(0x01u8).take(total - printable));
        sample
    }

    #[test]
    fn threshold_is_strictly_greater() {
        let classifier = Classifier::default();

        let above = classifier.classify_bytes(&sample_with_printable(91, 100), "x");
        assert_eq!(above.kind, PayloadKind::Text);

        let at = classifier.classify_bytes(&sample_with_printable(90, 100), "x");
        assert_eq!(at.kind, PayloadKind::Binary);
        assert!(at.preview.is_none());
    }

    #[test]
    fn empty_sample_is_not_text() {
        let classifier = Classifier::default();
        let result = classifier.classify_bytes(b"", "empty.txt");
        assert_eq!(result.kind, PayloadKind::Binary);
        assert_eq!(result.mime_type.as_deref(), Some("text/plain"));
        assert_eq!(printable_ratio(""), None);
    }

    #[test]
    fn whitespace_counts_as_printable() {
        assert_eq!(printable_ratio("a\tb\r\nc"), Some(1.0));
    }

    #[test]
    fn invalid_utf8_counts_against_text() {
        let classifier = Classifier::default();
        let junk: Vec<u8> = (0x80..=0xFFu8).collect();
        assert_eq!(classifier.classify_bytes(&junk, "blob").kind, PayloadKind::Binary);
    }

    #[test]
    fn image_by_extension_when_not_text() {
        let classifier = Classifier::default();
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D, 0x01, 0x02];
        let result = classifier.classify_bytes(&png, "uploads/abc.png");
        assert_eq!(result.kind, PayloadKind::Image);
        assert_eq!(result.mime_type.as_deref(), Some("image/png"));
        assert_eq!(result.body(), "Image File");
    }

    #[test]
    fn content_sniff_wins_over_extension() {
        let classifier = Classifier::default();
        let svg = br#"<svg xmlns="http://www.w3.org/2000/svg"></svg>"#;
        let result = classifier.classify_bytes(svg, "drawing.svg");
        assert_eq!(result.kind, PayloadKind::Text);
        assert_eq!(result.mime_type.as_deref(), Some("image/svg+xml"));
    }

    #[test]
    fn unknown_extension_has_no_mime() {
        assert_eq!(guess_mime("payload.zzzunknown"), None);
        assert_eq!(guess_mime("no_extension"), None);
    }

    #[test]
    fn preview_is_capped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("long.txt");
        std::fs::write(&path, "x".repeat(10_000)).unwrap();

        let result = Classifier::default().classify_file(&path).unwrap();

        assert_eq!(result.kind, PayloadKind::Text);
        assert_eq!(result.preview.as_ref().unwrap().chars().count(), 500);
        assert_eq!(result.body().len(), 500);
    }

    #[test]
    fn multibyte_char_cut_at_sample_edge_is_ignored() {
        // 499 ASCII bytes followed by a 2-byte character straddling the limit.
        let mut data = vec![b'a'; 499];
        data.extend("é".as_bytes());
        let result = Classifier::default().classify_bytes(&data, "x.txt");
        let preview = result.preview.unwrap();
        assert_eq!(preview.len(), 499);
        assert!(!preview.contains(char::REPLACEMENT_CHARACTER));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Classifier::default()
            .classify_file(&dir.path().join("gone"))
            .is_err());
    }
}
