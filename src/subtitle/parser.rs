//! Subtitle file entry point

use std::path::Path;

use super::ass::parse_ass;
use super::cue::parse_cues;
use super::types::{DialogueEntry, SubtitleFormat};
use crate::error::Result;

/// Parse subtitle content of a known format. The result is sorted by start
/// time; entries starting at the same time keep their file order.
pub fn parse_str(content: &str, format: SubtitleFormat) -> Result<Vec<DialogueEntry>> {
    match format {
        SubtitleFormat::Ass => parse_ass(content),
        SubtitleFormat::SubRip | SubtitleFormat::WebVtt => {
            let mut entries = parse_cues(content)?;
            // Cue order in the file is not guaranteed to be chronological.
            entries.sort_by_key(|e| e.from);
            Ok(entries)
        }
    }
}

/// Parse a subtitle file, detecting the format from its extension.
///
/// The extension is checked before the file is read, so an unsupported file
/// fails with `UnsupportedSubtitleFormat` even if it does not exist.
pub async fn parse_file<P: AsRef<Path>>(path: P) -> Result<Vec<DialogueEntry>> {
    let path = path.as_ref();
    let format = SubtitleFormat::from_path(path)?;
    let bytes = tokio::fs::read(path).await?;
    let content = String::from_utf8_lossy(&bytes);

    let entries = parse_str(&content, format)?;
    tracing::debug!(
        "Parsed {} dialogue entries from {:?} ({})",
        entries.len(),
        path,
        format.name()
    );
    Ok(entries)
}
