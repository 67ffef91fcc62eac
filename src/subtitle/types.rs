use std::path::Path;

use crate::error::{BridgeError, Result};

/// A single line of dialogue with its timing in milliseconds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogueEntry {
    /// Ordinal identifier assigned at parse time
    pub id: String,
    /// Start time in milliseconds
    pub from: i64,
    /// End time in milliseconds, never before `from`
    pub to: i64,
    /// Plain text, one or more newline separated lines
    pub text: String,
}

impl DialogueEntry {
    /// Create a new entry. An end time before the start collapses to a
    /// zero-duration entry.
    pub fn new(id: impl Into<String>, from: i64, to: i64, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            from,
            to: to.max(from),
            text: text.into(),
        }
    }

    /// Get the duration in milliseconds
    pub fn duration_ms(&self) -> i64 {
        self.to - self.from
    }

    /// Middle of the entry, rounded to the nearest millisecond
    pub fn midpoint_ms(&self) -> i64 {
        (self.from + self.to + 1) / 2
    }

    /// Text lines with trailing whitespace removed
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.split('\n').map(|l| l.trim_end())
    }
}

/// Subtitle formats the transcript parser understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleFormat {
    SubRip, // .srt
    WebVtt, // .vtt
    Ass,    // .ass
}

impl SubtitleFormat {
    /// Detect the format from a file extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        match ext {
            "srt" => Ok(SubtitleFormat::SubRip),
            "vtt" => Ok(SubtitleFormat::WebVtt),
            "ass" => Ok(SubtitleFormat::Ass),
            other => Err(BridgeError::UnsupportedSubtitleFormat(format!(".{}", other))),
        }
    }

    /// Get subtitle format name
    pub fn name(&self) -> &'static str {
        match self {
            SubtitleFormat::SubRip => "SubRip (SRT)",
            SubtitleFormat::WebVtt => "WebVTT",
            SubtitleFormat::Ass => "Advanced SubStation",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_path() {
        assert_eq!(SubtitleFormat::from_path("a/b.srt").unwrap(), SubtitleFormat::SubRip);
        assert_eq!(SubtitleFormat::from_path("b.vtt").unwrap(), SubtitleFormat::WebVtt);
        assert_eq!(SubtitleFormat::from_path("b.ass").unwrap(), SubtitleFormat::Ass);
    }

    #[test]
    fn test_unsupported_format() {
        match SubtitleFormat::from_path("movie.sub") {
            Err(BridgeError::UnsupportedSubtitleFormat(ext)) => assert_eq!(ext, ".sub"),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(SubtitleFormat::from_path("movie").is_err());
        assert!(SubtitleFormat::from_path("movie.ssa").is_err());
    }

    #[test]
    fn test_entry_end_never_before_start() {
        let e = DialogueEntry::new("1", 5000, 4000, "x");
        assert_eq!(e.to, 5000);
        assert_eq!(e.duration_ms(), 0);
    }

    #[test]
    fn test_midpoint_and_lines() {
        let e = DialogueEntry::new("1", 1000, 2001, "one  \ntwo\t");
        assert_eq!(e.midpoint_ms(), 1501);
        assert_eq!(e.lines().collect::<Vec<_>>(), vec!["one", "two"]);
    }
}
