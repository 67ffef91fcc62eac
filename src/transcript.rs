//! Transcript view model
//!
//! A parsed subtitle file with every entry rendered through the configured
//! templates, positioned on the media timeline, searchable and sliceable
//! into ranges for copying or batch snapshots.

use std::ops::RangeInclusive;
use std::path::Path;

use regex::RegexBuilder;

use crate::batch::BatchItem;
use crate::config::{SnapshotConfig, TranscriptConfig};
use crate::error::{BridgeError, Result};
use crate::fs::VaultFs;
use crate::snapshot::{find_existing, SnapshotPaths};
use crate::subtitle::{parse_file, DialogueEntry};
use crate::template::{format_entry, FormatOptions, FormattedEntry, LinkParams, Template};
use crate::timeline::{boundary_index, current_index, ms_from_fraction, position_fraction};

/// A dialogue entry with its renderings
#[derive(Debug, Clone)]
pub struct TranscriptEntry {
    pub entry: DialogueEntry,
    /// Position in the full transcript, 0-based
    pub index: usize,
    pub pos_from: f64,
    pub pos_to: f64,
    /// Rendered with the full template, snapshot slots open
    pub formatted: FormattedEntry,
    /// Rendered with the simple template
    pub simple: FormattedEntry,
}

impl TranscriptEntry {
    /// Text as shown in the transcript view
    pub fn view_text(&self, use_simple: bool) -> String {
        if use_simple {
            self.simple.render_unresolved()
        } else {
            self.formatted.render_without_snapshots()
        }
    }
}

/// Matches of a search query in one entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    /// Index into the full transcript
    pub index: usize,
    /// Byte ranges of the matches in the searched text
    pub matches: Vec<(usize, usize)>,
}

/// Start and end markers of a selected range. Both ends are inclusive and may
/// be set in either order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeMarkers {
    pub start: usize,
    pub end: usize,
}

impl RangeMarkers {
    /// Markers spanning `len` entries
    pub fn new(len: usize) -> Self {
        Self {
            start: 0,
            end: len.saturating_sub(1),
        }
    }

    /// Selected indices, lowest first
    pub fn span(&self) -> RangeInclusive<usize> {
        self.start.min(self.end)..=self.start.max(self.end)
    }
}

/// What copying a selection needs
#[derive(Debug, Clone)]
pub enum CopyRequest {
    /// The text can be used as is
    Ready(String),
    /// Some entries need snapshots first
    NeedsSnapshots(Vec<BatchItem>),
}

/// A loaded transcript
#[derive(Debug, Clone)]
pub struct Transcript {
    link: LinkParams,
    length_secs: f64,
    template: Template,
    simple_template: Template,
    options: FormatOptions,
    separator: String,
    only_within_text: bool,
    entries: Vec<TranscriptEntry>,
    range: RangeMarkers,
}

impl Transcript {
    /// Parse a subtitle file and render it for `media_path`
    pub async fn load<P: AsRef<Path>>(
        sub_path: P,
        media_path: &str,
        length_secs: f64,
        sub_delay: Option<f64>,
        config: &TranscriptConfig,
    ) -> Result<Self> {
        let sub_path = sub_path.as_ref();
        let entries = parse_file(sub_path).await?;
        let link = LinkParams::new(media_path).with_subtitle(sub_path.to_string_lossy(), sub_delay);
        let transcript = Self::from_entries(entries, link, length_secs, config);
        tracing::info!(
            "Loaded transcript of {} entries from {}",
            transcript.len(),
            sub_path.display()
        );
        Ok(transcript)
    }

    /// Render already parsed entries
    pub fn from_entries(
        entries: Vec<DialogueEntry>,
        link: LinkParams,
        length_secs: f64,
        config: &TranscriptConfig,
    ) -> Self {
        let simple_template = Template::parse(&config.simple_template);
        let mut transcript = Self {
            link,
            length_secs,
            template: Template::parse(&config.template),
            simple_template,
            options: FormatOptions {
                link_scheme: config.link_scheme.clone(),
                wrap_text: config.wrap_text,
            },
            separator: config.separator.clone(),
            only_within_text: config.only_search_within_text,
            entries: Vec::new(),
            range: RangeMarkers::new(entries.len()),
        };
        transcript.entries = entries
            .into_iter()
            .enumerate()
            .map(|(i, entry)| transcript.render(i, entry))
            .collect();
        transcript
    }

    fn render(&self, index: usize, entry: DialogueEntry) -> TranscriptEntry {
        let duration = self.duration_ms();
        let formatted = format_entry(duration, &entry, index, &self.link, &self.template, &self.options);
        let simple = format_entry(
            duration,
            &entry,
            index,
            &self.link,
            &self.simple_template,
            &self.options,
        );
        TranscriptEntry {
            index,
            pos_from: position_fraction(entry.from, duration),
            pos_to: position_fraction(entry.to, duration),
            formatted,
            simple,
            entry,
        }
    }

    /// Re-render every entry with a new template
    pub fn reload(&mut self, template: &str) {
        self.template = Template::parse(template);
        let entries = std::mem::take(&mut self.entries);
        self.entries = entries
            .into_iter()
            .map(|e| self.render(e.index, e.entry))
            .collect();
        tracing::debug!("Re-rendered {} transcript entries", self.entries.len());
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn link(&self) -> &LinkParams {
        &self.link
    }

    pub fn duration_ms(&self) -> i64 {
        (self.length_secs * 1000.0).round() as i64
    }

    fn dialogue(&self) -> Vec<DialogueEntry> {
        self.entries.iter().map(|e| e.entry.clone()).collect()
    }

    /// The current entry and everything after it
    pub fn from_position(&self, fraction: f64) -> &[TranscriptEntry] {
        let start = boundary_index(&self.dialogue(), fraction, self.duration_ms());
        &self.entries[start..]
    }

    /// Entry showing at a player position
    pub fn current_index(&self, fraction: f64) -> Option<usize> {
        current_index(&self.dialogue(), ms_from_fraction(fraction, self.duration_ms()))
    }

    /// Literal search. With `only_search_within_text` configured the dialogue
    /// text is searched, otherwise the rendered entry (links included).
    pub fn search(&self, query: &str, case_sensitive: bool) -> Result<Vec<SearchHit>> {
        self.search_in(query, case_sensitive, self.only_within_text)
    }

    fn search_in(&self, query: &str, case_sensitive: bool, only_within_text: bool) -> Result<Vec<SearchHit>> {
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let re = RegexBuilder::new(&regex::escape(query))
            .case_insensitive(!case_sensitive)
            .build()
            .map_err(|e| BridgeError::Config(format!("Bad search query: {}", e)))?;

        Ok(self
            .entries
            .iter()
            .filter_map(|e| {
                let haystack = if only_within_text {
                    e.entry.text.clone()
                } else {
                    e.view_text(false)
                };
                let matches: Vec<(usize, usize)> =
                    re.find_iter(&haystack).map(|m| (m.start(), m.end())).collect();
                (!matches.is_empty()).then_some(SearchHit {
                    index: e.index,
                    matches,
                })
            })
            .collect())
    }

    /// View text of `entries` with the snapshots already on disk filling the
    /// snapshot slots. Nothing is captured; slots without a snapshot are
    /// dropped.
    pub async fn view_with_snapshots<F: VaultFs>(
        &self,
        fs: &F,
        config: &SnapshotConfig,
        entries: &[TranscriptEntry],
        use_simple: bool,
    ) -> Result<Vec<String>> {
        let paths = SnapshotPaths::for_media(&config.folder, &self.link.media_path);
        let mut texts = Vec::with_capacity(entries.len());
        for e in entries {
            if use_simple || !e.formatted.has_snapshot_slot() {
                texts.push(e.view_text(use_simple));
                continue;
            }
            let target_ms = if config.jump_middle_of_dialog {
                e.entry.midpoint_ms()
            } else {
                e.entry.from
            };
            let range = config.show_all_in_range.then(|| {
                let next_from = self.entries.get(e.index + 1).map_or(i64::MAX, |n| n.entry.from);
                (e.entry.from, next_from)
            });
            let embeds: Vec<String> = find_existing(fs, &paths, target_ms, range)
                .await?
                .into_iter()
                .map(|m| m.embed)
                .collect();
            texts.push(if embeds.is_empty() {
                e.formatted.render_without_snapshots()
            } else {
                e.formatted.render_with_snapshots(&embeds)
            });
        }
        Ok(texts)
    }

    pub fn range(&self) -> RangeMarkers {
        self.range
    }

    pub fn set_range_start(&mut self, index: usize) {
        self.range.start = index.min(self.len().saturating_sub(1));
    }

    pub fn set_range_end(&mut self, index: usize) {
        self.range.end = index.min(self.len().saturating_sub(1));
    }

    /// Indices between the range markers
    pub fn range_indices(&self) -> Vec<usize> {
        if self.is_empty() {
            return Vec::new();
        }
        self.range.span().collect()
    }

    /// Batch items for the given entries, in time order
    pub fn batch_items(&self, indices: &[usize]) -> Vec<BatchItem> {
        let mut indices: Vec<usize> = indices.iter().copied().filter(|i| *i < self.len()).collect();
        indices.sort_unstable();
        indices.dedup();
        indices
            .into_iter()
            .map(|i| BatchItem {
                entry: self.entries[i].entry.clone(),
                formatted: self.entries[i].formatted.clone(),
                next_from: self.entries.get(i + 1).map(|n| n.entry.from),
            })
            .collect()
    }

    /// Text for a selection, or the batch it needs first
    pub fn copy(&self, indices: &[usize]) -> CopyRequest {
        let items = self.batch_items(indices);
        if items.iter().any(|i| i.formatted.has_snapshot_slot()) {
            return CopyRequest::NeedsSnapshots(items);
        }
        CopyRequest::Ready(
            items
                .iter()
                .map(|i| i.formatted.render_unresolved())
                .collect::<Vec<_>>()
                .join(&self.separator),
        )
    }

    /// Separator placed between entries
    pub fn separator(&self) -> &str {
        &self.separator
    }
}
