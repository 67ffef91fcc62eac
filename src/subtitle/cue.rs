//! SubRip / WebVTT cue block parser
//!
//! Both formats are sequences of blank-line separated blocks:
//!
//! ```text
//! 12
//! 00:01:02,500 --> 00:01:04,000
//! first line
//! second line
//! ```
//!
//! WebVTT adds a `WEBVTT` header, `NOTE`/`STYLE`/`REGION` blocks, optional
//! hours, a `.` before the milliseconds and cue settings after the end time.

use super::types::DialogueEntry;
use crate::error::{BridgeError, Result};

/// Parse a cue timestamp (`HH:MM:SS,mmm`, `HH:MM:SS.mmm` or `MM:SS.mmm`)
/// into milliseconds. Anything after the timestamp (cue settings) is ignored.
pub fn parse_cue_timestamp(s: &str) -> Option<i64> {
    let caps = regex!(r"^\s*(?:(\d+):)?(\d{1,2}):(\d{1,2})(?:[.,](\d{1,3}))?(?:\s|$)").captures(s)?;
    let hours: i64 = caps.get(1).map_or(Ok(0), |m| m.as_str().parse()).ok()?;
    let minutes: i64 = caps[2].parse().ok()?;
    let seconds: i64 = caps[3].parse().ok()?;
    // "5" after the separator means 500ms, not 5ms.
    let millis: i64 = match caps.get(4) {
        Some(m) => format!("{:0<3}", m.as_str()).parse().ok()?,
        None => 0,
    };
    Some(((hours * 60 + minutes) * 60 + seconds) * 1000 + millis)
}

fn is_metadata_block(first_line: &str) -> bool {
    let line = first_line.trim();
    line.starts_with("WEBVTT")
        || line.starts_with("NOTE")
        || line.starts_with("STYLE")
        || line.starts_with("REGION")
}

/// Parse cue blocks in file order. Blocks without a timing line are skipped;
/// a timing line that cannot be read is an error.
pub fn parse_cues(input: &str) -> Result<Vec<DialogueEntry>> {
    let normalized = input.trim_start_matches('\u{FEFF}').replace("\r\n", "\n").replace('\r', "\n");
    let mut entries = Vec::new();
    let mut block: Vec<&str> = Vec::new();

    let mut lines = normalized.split('\n').peekable();
    while let Some(line) = lines.next() {
        let end_of_block = line.trim().is_empty();
        if !end_of_block {
            block.push(line);
        }
        if end_of_block || lines.peek().is_none() {
            if !block.is_empty() {
                if let Some(entry) = parse_block(&block, entries.len() + 1)? {
                    entries.push(entry);
                }
                block.clear();
            }
        }
    }

    Ok(entries)
}

fn parse_block(block: &[&str], ordinal: usize) -> Result<Option<DialogueEntry>> {
    if is_metadata_block(block[0]) && !block[0].contains("-->") {
        return Ok(None);
    }

    let Some(arrow) = block.iter().position(|l| l.contains("-->")) else {
        tracing::warn!("Skipping subtitle block without timing: {:?}", block[0]);
        return Ok(None);
    };

    let timing = block[arrow];
    let (start, end) = timing
        .split_once("-->")
        .ok_or_else(|| BridgeError::SubtitleParse(format!("Invalid timing line: {}", timing)))?;
    let from = parse_cue_timestamp(start)
        .ok_or_else(|| BridgeError::SubtitleParse(format!("Invalid start time: {}", timing)))?;
    let to = parse_cue_timestamp(end)
        .ok_or_else(|| BridgeError::SubtitleParse(format!("Invalid end time: {}", timing)))?;

    let id = match arrow {
        0 => ordinal.to_string(),
        _ => block[arrow - 1].trim().to_string(),
    };
    let text = block[arrow + 1..].join("\n");

    Ok(Some(DialogueEntry::new(id, from, to, text)))
}
