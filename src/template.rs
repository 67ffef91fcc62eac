//! Entry templates and seek links
//!
//! A template is parsed once into lines of literal text and placeholder slots
//! drawn from a closed set (`{{index}}`, `{{from}}`, `{{to}}`, `{{text}}`,
//! `{{snapshot}}`). Anything else that looks like a placeholder is literal
//! text. Rendering never rescans substituted values, so dialogue that happens
//! to contain `{{to}}` is printed as-is.

use std::collections::HashMap;
use std::fmt;

use crate::error::{BridgeError, Result};
use crate::subtitle::DialogueEntry;
use crate::timeline::{ms_to_timestamp, percent_seek_value};

/// Placeholders a template may use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    Index,
    From,
    To,
    Text,
    Snapshot,
}

impl Placeholder {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "index" => Some(Placeholder::Index),
            "from" => Some(Placeholder::From),
            "to" => Some(Placeholder::To),
            "text" => Some(Placeholder::Text),
            "snapshot" => Some(Placeholder::Snapshot),
            _ => None,
        }
    }

    /// Literal form of the placeholder
    pub fn token(&self) -> &'static str {
        match self {
            Placeholder::Index => "{{index}}",
            Placeholder::From => "{{from}}",
            Placeholder::To => "{{to}}",
            Placeholder::Text => "{{text}}",
            Placeholder::Snapshot => "{{snapshot}}",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Slot(Placeholder),
}

/// A parsed entry template
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    lines: Vec<Vec<Segment>>,
}

impl Template {
    /// Parse a template. Never fails: unknown placeholders stay literal.
    pub fn parse(src: &str) -> Self {
        let lines = src.split('\n').map(parse_line).collect();
        Self { lines }
    }

    /// Check whether the template uses a placeholder
    pub fn has(&self, placeholder: Placeholder) -> bool {
        self.lines
            .iter()
            .flatten()
            .any(|s| *s == Segment::Slot(placeholder))
    }
}

fn parse_line(line: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut last = 0;

    for caps in regex!(r"\{\{([a-z]+)\}\}").captures_iter(line) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        literal.push_str(&line[last..whole.start()]);
        match Placeholder::from_name(&caps[1]) {
            Some(p) => {
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Slot(p));
            }
            None => literal.push_str(whole.as_str()),
        }
        last = whole.end();
    }
    literal.push_str(&line[last..]);
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    segments
}

/// Parameters carried by every seek link
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LinkParams {
    pub media_path: String,
    pub sub_path: Option<String>,
    pub sub_delay: Option<f64>,
}

impl LinkParams {
    pub fn new(media_path: impl Into<String>) -> Self {
        Self {
            media_path: media_path.into(),
            ..Default::default()
        }
    }

    pub fn with_subtitle(mut self, sub_path: impl Into<String>, sub_delay: Option<f64>) -> Self {
        self.sub_path = Some(sub_path.into());
        self.sub_delay = sub_delay;
        self
    }

    /// Build a seek link: `<scheme>?mediaPath=..&subPath=..&subDelay=..&timestamp=..`.
    /// Every value is percent-encoded exactly once; a zero delay is omitted.
    pub fn seek_link(&self, scheme: &str, timestamp: &str) -> String {
        let mut query = format!("mediaPath={}", urlencoding::encode(&self.media_path));
        if let Some(sub) = &self.sub_path {
            query.push_str(&format!("&subPath={}", urlencoding::encode(sub)));
        }
        if let Some(delay) = self.sub_delay.filter(|d| *d != 0.0) {
            query.push_str(&format!("&subDelay={}", delay));
        }
        query.push_str(&format!("&timestamp={}", urlencoding::encode(timestamp)));
        format!("{}?{}", scheme, query)
    }

    /// Parse the query part of a seek link. Returns the link parameters and
    /// the raw (decoded) timestamp value, if any.
    pub fn from_query(query: &str) -> Result<(Self, Option<String>)> {
        let query = query.split_once('?').map_or(query, |(_, q)| q);
        let mut values: HashMap<String, String> = HashMap::new();
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            let decoded = urlencoding::decode(&v.replace('+', " "))
                .map_err(|e| BridgeError::Config(format!("Bad link parameter {}: {}", k, e)))?
                .into_owned();
            values.insert(k.to_string(), decoded);
        }

        let media_path = values
            .remove("mediaPath")
            .filter(|m| !m.is_empty())
            .ok_or_else(|| BridgeError::Config("The link has no 'mediaPath' parameter".to_string()))?;
        let sub_delay = match values.remove("subDelay") {
            Some(d) => Some(d.parse::<f64>().map_err(|_| {
                BridgeError::Config(format!("Bad subDelay value: {}", d))
            })?),
            None => None,
        };

        let params = Self {
            media_path,
            sub_path: values.remove("subPath").filter(|s| !s.is_empty()),
            sub_delay,
        };
        Ok((params, values.remove("timestamp")))
    }
}

/// Rendering options shared by every entry of a transcript
#[derive(Debug, Clone)]
pub struct FormatOptions {
    /// Scheme + host of seek links
    pub link_scheme: String,
    /// Wrap text lines in `<span>` to keep the editor from formatting them
    pub wrap_text: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            link_scheme: "obsidian://vlcBridge".to_string(),
            wrap_text: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Piece {
    Text(String),
    Snapshot,
}

/// A rendered entry whose snapshot slots are still open
#[derive(Debug, Clone, PartialEq)]
pub struct FormattedEntry {
    lines: Vec<Vec<Piece>>,
}

impl FormattedEntry {
    /// Whether any line still waits for a snapshot embed
    pub fn has_snapshot_slot(&self) -> bool {
        self.lines.iter().flatten().any(|p| *p == Piece::Snapshot)
    }

    fn render_line(line: &[Piece], snapshot: &str) -> String {
        line.iter()
            .map(|p| match p {
                Piece::Text(t) => t.as_str(),
                Piece::Snapshot => snapshot,
            })
            .collect()
    }

    /// Render with open slots left as the literal `{{snapshot}}`
    pub fn render_unresolved(&self) -> String {
        self.render_with(Placeholder::Snapshot.token())
    }

    /// Render with open slots removed
    pub fn render_without_snapshots(&self) -> String {
        self.render_with("")
    }

    fn render_with(&self, snapshot: &str) -> String {
        self.lines
            .iter()
            .map(|l| Self::render_line(l, snapshot))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Fill snapshot slots. A line holding a slot is repeated once per embed;
    /// with no embeds the slots stay unresolved.
    pub fn render_with_snapshots(&self, embeds: &[String]) -> String {
        if embeds.is_empty() {
            return self.render_unresolved();
        }
        let mut out = Vec::new();
        for line in &self.lines {
            if line.contains(&Piece::Snapshot) {
                for embed in embeds {
                    out.push(Self::render_line(line, embed));
                }
            } else {
                out.push(Self::render_line(line, ""));
            }
        }
        out.join("\n")
    }
}

impl fmt::Display for FormattedEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.render_unresolved())
    }
}

/// Render a dialogue entry through a template.
///
/// `index` is 0-based and printed 1-based. `{{from}}`/`{{to}}` become links
/// seeking to the entry's percentage position over `duration_ms`. A template
/// line holding `{{text}}` is repeated once per text line.
pub fn format_entry(
    duration_ms: i64,
    entry: &DialogueEntry,
    index: usize,
    link: &LinkParams,
    template: &Template,
    options: &FormatOptions,
) -> FormattedEntry {
    let stamp_link = |ms: i64| {
        format!(
            "[{}]({})",
            ms_to_timestamp(ms).full,
            link.seek_link(&options.link_scheme, &percent_seek_value(ms, duration_ms))
        )
    };
    let index_str = (index + 1).to_string();
    let from_link = stamp_link(entry.from);
    let to_link = stamp_link(entry.to);
    let text_lines: Vec<String> = entry
        .lines()
        .map(|l| {
            if options.wrap_text {
                format!("<span>{}</span>", l)
            } else {
                l.to_string()
            }
        })
        .collect();

    let mut lines = Vec::new();
    for template_line in &template.lines {
        let repeats = if template_line.contains(&Segment::Slot(Placeholder::Text)) {
            text_lines.len()
        } else {
            1
        };
        for r in 0..repeats {
            let pieces = template_line
                .iter()
                .map(|seg| match seg {
                    Segment::Literal(s) => Piece::Text(s.clone()),
                    Segment::Slot(Placeholder::Index) => Piece::Text(index_str.clone()),
                    Segment::Slot(Placeholder::From) => Piece::Text(from_link.clone()),
                    Segment::Slot(Placeholder::To) => Piece::Text(to_link.clone()),
                    Segment::Slot(Placeholder::Text) => Piece::Text(text_lines[r].clone()),
                    Segment::Slot(Placeholder::Snapshot) => Piece::Snapshot,
                })
                .collect();
            lines.push(pieces);
        }
    }

    tracing::trace!("Formatted entry {} ({} lines)", index_str, lines.len());
    FormattedEntry { lines }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> FormatOptions {
        FormatOptions {
            wrap_text: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_template() {
        let t = Template::parse("{{index}}. {{text}} {{unknown}}");
        assert!(t.has(Placeholder::Index));
        assert!(t.has(Placeholder::Text));
        assert!(!t.has(Placeholder::Snapshot));
        assert_eq!(t.lines[0].last(), Some(&Segment::Literal(" {{unknown}}".to_string())));
    }

    #[test]
    fn test_multiline_text_repeats_text_line_only() {
        let entry = DialogueEntry::new("1", 0, 1000, "line one\nline two");
        let out = format_entry(
            2000,
            &entry,
            0,
            &LinkParams::new("/m.mkv"),
            &Template::parse("{{index}}. {{text}}"),
            &plain(),
        )
        .render_unresolved();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines, vec!["1. line one", "1. line two"]);
    }

    #[test]
    fn test_index_line_rendered_once() {
        let entry = DialogueEntry::new("1", 0, 1000, "a\nb\nc");
        let out = format_entry(
            2000,
            &entry,
            4,
            &LinkParams::new("/m.mkv"),
            &Template::parse("#{{index}}\n- {{text}}"),
            &plain(),
        )
        .render_unresolved();
        assert_eq!(out, "#5\n- a\n- b\n- c");
    }

    #[test]
    fn test_text_is_not_rescanned() {
        let entry = DialogueEntry::new("1", 0, 1000, "say {{to}} and {{snapshot}}");
        let formatted = format_entry(
            1000,
            &entry,
            0,
            &LinkParams::new("/m.mkv"),
            &Template::parse("{{text}}"),
            &plain(),
        );
        assert!(!formatted.has_snapshot_slot());
        assert_eq!(formatted.render_unresolved(), "say {{to}} and {{snapshot}}");
    }

    #[test]
    fn test_trailing_whitespace_stripped_and_wrapped() {
        let entry = DialogueEntry::new("1", 0, 1000, "- bullet?   \n*stars*");
        let out = format_entry(
            1000,
            &entry,
            0,
            &LinkParams::new("/m.mkv"),
            &Template::parse("{{text}}"),
            &FormatOptions::default(),
        )
        .render_unresolved();
        assert_eq!(out, "<span>- bullet?</span>\n<span>*stars*</span>");
    }

    #[test]
    fn test_seek_links() {
        let entry = DialogueEntry::new("1", 1000, 2000, "x");
        let link = LinkParams::new("C:/Videos/My Film.mkv").with_subtitle("C:/Videos/My Film.srt", Some(1.5));
        let out = format_entry(
            4000,
            &entry,
            0,
            &link,
            &Template::parse("{{from}} >> {{to}}"),
            &plain(),
        )
        .render_unresolved();
        assert_eq!(
            out,
            "[00:00:01.000](obsidian://vlcBridge?mediaPath=C%3A%2FVideos%2FMy%20Film.mkv&subPath=C%3A%2FVideos%2FMy%20Film.srt&subDelay=1.5&timestamp=25%25) >> \
             [00:00:02.000](obsidian://vlcBridge?mediaPath=C%3A%2FVideos%2FMy%20Film.mkv&subPath=C%3A%2FVideos%2FMy%20Film.srt&subDelay=1.5&timestamp=50%25)"
        );
    }

    #[test]
    fn test_zero_delay_omitted() {
        let link = LinkParams::new("/a.mkv").with_subtitle("/a.srt", Some(0.0));
        let url = link.seek_link("obsidian://vlcBridge", "10%");
        assert!(!url.contains("subDelay"));
        assert!(url.ends_with("timestamp=10%25"));
    }

    #[test]
    fn test_link_roundtrip_through_query() {
        let link = LinkParams::new("/films/Show [2020].mkv").with_subtitle("/films/s.srt", Some(-2.0));
        let url = link.seek_link("obsidian://vlcBridge", "33.5%");
        let (parsed, ts) = LinkParams::from_query(&url).unwrap();
        assert_eq!(parsed, link);
        assert_eq!(ts.as_deref(), Some("33.5%"));
    }

    #[test]
    fn test_link_without_media_path() {
        assert!(LinkParams::from_query("timestamp=10").is_err());
    }

    #[test]
    fn test_snapshot_slots() {
        let entry = DialogueEntry::new("1", 0, 1000, "hi");
        let formatted = format_entry(
            1000,
            &entry,
            0,
            &LinkParams::new("/m.mkv"),
            &Template::parse("{{text}}\n{{snapshot}}"),
            &plain(),
        );
        assert!(formatted.has_snapshot_slot());
        assert_eq!(formatted.render_unresolved(), "hi\n{{snapshot}}");
        assert_eq!(formatted.render_without_snapshots(), "hi\n");
        assert_eq!(
            formatted.render_with_snapshots(&["![[a.png]]".to_string(), "![[b.png]]".to_string()]),
            "hi\n![[a.png]]\n![[b.png]]"
        );
        assert_eq!(formatted.render_with_snapshots(&[]), "hi\n{{snapshot}}");
    }
}
