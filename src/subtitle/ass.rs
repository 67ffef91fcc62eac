//! Advanced SubStation (.ass) dialogue extraction
//!
//! Only the `[Events]` section matters here. Each `Dialogue:` line is split
//! according to the section's `Format:` line, its centisecond timestamps are
//! converted to milliseconds and its text is reduced to plain lines:
//! drawings and override blocks are dropped, `\N` becomes a newline and the
//! italic/bold/underline/strikeout toggles become `<i>`, `<b>`, `<u>`, `<s>`.

use super::types::DialogueEntry;
use crate::error::{BridgeError, Result};

/// Field order used when a file has no `Format:` line in `[Events]`
const DEFAULT_EVENT_FORMAT: &[&str] = &[
    "Layer", "Start", "End", "Style", "Name", "MarginL", "MarginR", "MarginV", "Effect", "Text",
];

/// Parse an `H:MM:SS.cc` timestamp into milliseconds
pub fn parse_ass_timestamp(s: &str) -> Option<i64> {
    let caps = regex!(r"^\s*(\d+):(\d{1,2}):(\d{1,2})(?:\.(\d{1,3}))?\s*$").captures(s)?;
    let hours: i64 = caps[1].parse().ok()?;
    let minutes: i64 = caps[2].parse().ok()?;
    let seconds: i64 = caps[3].parse().ok()?;
    // Fraction digits are centiseconds in practice, but read them as a
    // decimal fraction so "5" and "50" agree.
    let millis: i64 = match caps.get(4) {
        Some(m) => format!("{:0<3}", m.as_str()).parse().ok()?,
        None => 0,
    };
    Some(((hours * 60 + minutes) * 60 + seconds) * 1000 + millis)
}

/// Reduce dialogue text with override codes to plain text
pub fn clean_ass_text(raw: &str) -> String {
    // Drawing mode: everything between {\p1..} and {\p0} (or the end) is a
    // vector path, not text.
    let text = regex!(r"(?s)\{[^}]*\\p[1-9][^}]*\}.*?(?:\{[^}]*\\p0[^}]*\}|$)").replace_all(raw, "");
    let text = regex!(r"\\[Nn]").replace_all(&text, "\n");
    let text = text.replace("\\h", " ");
    let text = regex!(r"\{\\([ibsu])1\}").replace_all(&text, "<$1>");
    let text = regex!(r"\{\\([ibsu])0?\}").replace_all(&text, "</$1>");
    let text = regex!(r"\{[^}]*\}").replace_all(&text, "");
    text.into_owned()
}

/// Extract dialogue entries from the `[Events]` section, sorted by start
/// time with sequential 1-based ids.
pub fn parse_ass(input: &str) -> Result<Vec<DialogueEntry>> {
    let input = input.trim_start_matches('\u{FEFF}');
    let mut in_events = false;
    let mut found_events = false;
    let mut format: Vec<String> = DEFAULT_EVENT_FORMAT.iter().map(|s| s.to_string()).collect();
    let mut entries = Vec::new();

    for line in input.lines() {
        let line = line.trim_end_matches('\r');
        let trimmed = line.trim();

        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            in_events = trimmed.eq_ignore_ascii_case("[events]");
            found_events |= in_events;
            continue;
        }
        if !in_events {
            continue;
        }

        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        match key.trim() {
            "Format" => {
                format = value.split(',').map(|f| f.trim().to_string()).collect();
            }
            "Dialogue" => match parse_dialogue(value, &format) {
                Some(entry) => entries.push(entry),
                None => tracing::warn!("Skipping malformed dialogue line: {}", line),
            },
            _ => {}
        }
    }

    if !found_events {
        return Err(BridgeError::SubtitleParse(
            "No [Events] section found".to_string(),
        ));
    }

    entries.sort_by_key(|e: &DialogueEntry| e.from);
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.id = (i + 1).to_string();
    }
    Ok(entries)
}

fn parse_dialogue(value: &str, format: &[String]) -> Option<DialogueEntry> {
    // Text is always last and may itself contain commas.
    let fields: Vec<&str> = value.trim_start().splitn(format.len(), ',').collect();
    if fields.len() != format.len() {
        return None;
    }
    let field = |name: &str| {
        format
            .iter()
            .position(|f| f.eq_ignore_ascii_case(name))
            .map(|i| fields[i])
    };

    let from = parse_ass_timestamp(field("Start")?)?;
    let to = parse_ass_timestamp(field("End")?)?;
    let text = clean_ass_text(field("Text")?);
    Some(DialogueEntry::new(String::new(), from, to, text))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "[Script Info]\nTitle: sample\n\n[V4+ Styles]\nFormat: Name, Fontname\nStyle: Default,Arial\n\n[Events]\nFormat: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\nComment: 0,0:00:00.00,0:00:01.00,Default,,0,0,0,,ignored\nDialogue: 0,0:00:05.50,0:00:07.00,Default,,0,0,0,,Second, with comma\nDialogue: 0,0:00:01.00,0:00:03.25,Default,,0,0,0,,{\\i1}First{\\i0}\\Nline two\n";

    #[test]
    fn test_parse_ass_timestamp() {
        assert_eq!(parse_ass_timestamp("0:00:01.00"), Some(1000));
        assert_eq!(parse_ass_timestamp("1:02:03.45"), Some(3_723_450));
        assert_eq!(parse_ass_timestamp("0:00:01"), Some(1000));
        assert_eq!(parse_ass_timestamp("nope"), None);
    }

    #[test]
    fn test_parse_ass_sorted_with_ids() {
        let entries = parse_ass(SAMPLE).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, "1");
        assert_eq!(entries[0].from, 1000);
        assert_eq!(entries[0].to, 3250);
        assert_eq!(entries[0].text, "<i>First</i>\nline two");
        assert_eq!(entries[1].id, "2");
        assert_eq!(entries[1].text, "Second, with comma");
    }

    #[test]
    fn test_clean_override_codes() {
        assert_eq!(clean_ass_text(r"{\an8\pos(10,20)}Top"), "Top");
        assert_eq!(clean_ass_text(r"{\b1}bold{\b0} {\u1}u{\u}"), "<b>bold</b> <u>u</u>");
        assert_eq!(clean_ass_text(r"a\nb\Nc"), "a\nb\nc");
        assert_eq!(clean_ass_text(r"a\hb"), "a b");
    }

    #[test]
    fn test_drawings_are_removed() {
        let raw = r"{\p1}m 0 0 l 100 0 100 100 0 100{\p0}Caption";
        assert_eq!(clean_ass_text(raw), "Caption");
        let raw = r"{\an7\pos(0,0)\p1}m 0 0 l 10 0 10 10";
        assert_eq!(clean_ass_text(raw), "");
    }

    #[test]
    fn test_missing_events_section() {
        assert!(parse_ass("[Script Info]\nTitle: x\n").is_err());
    }

    #[test]
    fn test_zero_duration_is_kept() {
        let ass = "[Events]\nDialogue: 0,0:00:02.00,0:00:02.00,Default,,0,0,0,,Flash\n";
        let entries = parse_ass(ass).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].duration_ms(), 0);
    }
}
