//! Batch snapshots
//!
//! Resolves the `{{snapshot}}` slots of a run of dialogue entries, one entry
//! at a time: reuse a snapshot already on disk, or seek, capture, wait for
//! the file to appear and claim it under its canonical name. A missing frame
//! after every attempt stops the batch. The player position is restored once
//! at the end whatever happened.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::SnapshotConfig;
use crate::error::{BridgeError, Result};
use crate::fs::{FileEntry, VaultFs};
use crate::length::{LengthInfo, LengthResolver};
use crate::player::{same_media, Command, PlayerControl};
use crate::poll::poll_until;
use crate::snapshot::{embed_markup, find_existing, SnapshotPaths};
use crate::subtitle::DialogueEntry;
use crate::template::FormattedEntry;
use crate::timeline::{format_percent, percent_seek_value, seconds_to_timestamp};

/// Cooperative stop switch, checked before each entry
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One entry of a batch
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub entry: DialogueEntry,
    pub formatted: FormattedEntry,
    /// Start of the following dialogue; bounds the range of reusable snapshots
    pub next_from: Option<i64>,
}

/// Progress after an entry
#[derive(Debug, Clone, PartialEq)]
pub struct BatchProgress {
    pub done: usize,
    pub total: usize,
    pub elapsed: Duration,
    /// Mean capture time times the entries left; unknown until something
    /// was captured
    pub eta: Option<Duration>,
}

impl fmt::Display for BatchProgress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}/{} ({} elapsed",
            self.done,
            self.total,
            seconds_to_timestamp(self.elapsed.as_secs() as i64)
        )?;
        match self.eta {
            Some(eta) => write!(f, ", ~{} left)", seconds_to_timestamp(eta.as_secs() as i64)),
            None => write!(f, ")"),
        }
    }
}

/// How a batch ended
#[derive(Debug)]
pub enum BatchOutcome {
    Completed,
    Cancelled,
    Failed(BridgeError),
}

/// Result of a batch. The text always holds every entry; entries that were
/// not reached keep their `{{snapshot}}` placeholder.
#[derive(Debug)]
pub struct BatchReport {
    pub text: String,
    /// Entries whose slots were filled
    pub resolved: usize,
    /// Snapshots taken by this batch
    pub captured: usize,
    /// Entries served from snapshots already on disk
    pub reused: usize,
    pub outcome: BatchOutcome,
}

impl BatchReport {
    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, BatchOutcome::Completed)
    }
}

/// Running statistics of a batch
struct Tally {
    started: Instant,
    captures: Vec<Duration>,
    resolved: usize,
    reused: usize,
}

impl Tally {
    fn progress(&self, done: usize, total: usize) -> BatchProgress {
        let eta = (!self.captures.is_empty()).then(|| {
            let mean = self.captures.iter().sum::<Duration>() / self.captures.len() as u32;
            mean * (total - done) as u32
        });
        BatchProgress {
            done,
            total,
            elapsed: self.started.elapsed(),
            eta,
        }
    }
}

/// Drives the player and the vault for a batch
pub struct Batch<'a, P, F> {
    pub player: &'a P,
    pub fs: &'a F,
    pub lengths: &'a LengthResolver,
    pub config: &'a SnapshotConfig,
}

impl<'a, P: PlayerControl, F: VaultFs> Batch<'a, P, F> {
    pub fn new(player: &'a P, fs: &'a F, lengths: &'a LengthResolver, config: &'a SnapshotConfig) -> Self {
        Self {
            player,
            fs,
            lengths,
            config,
        }
    }

    /// Resolve the snapshot slots of `items`, in order, and join the rendered
    /// entries with `separator`.
    pub async fn run<C>(
        &self,
        media_path: &str,
        items: &[BatchItem],
        separator: &str,
        cancel: &CancelFlag,
        on_progress: C,
    ) -> BatchReport
    where
        C: FnMut(&BatchProgress),
    {
        let span = tracing::info_span!("batch", id = %Uuid::new_v4(), entries = items.len());
        self.run_inner(media_path, items, separator, cancel, on_progress)
            .instrument(span)
            .await
    }

    async fn run_inner<C>(
        &self,
        media_path: &str,
        items: &[BatchItem],
        separator: &str,
        cancel: &CancelFlag,
        mut on_progress: C,
    ) -> BatchReport
    where
        C: FnMut(&BatchProgress),
    {
        let mut rendered: Vec<Option<String>> = vec![None; items.len()];
        let mut tally = Tally {
            started: Instant::now(),
            captures: Vec::new(),
            resolved: 0,
            reused: 0,
        };

        let (info, was_playing) = match self.prepare(media_path).await {
            Ok(prepared) => prepared,
            Err(e) => {
                tracing::warn!("Batch not started: {}", e);
                return finish(items, rendered, separator, &tally, BatchOutcome::Failed(e));
            }
        };
        if let Err(e) = self.player.send(&Command::ForcePause).await {
            tracing::warn!("Batch not started: {}", e);
            self.restore(&info, was_playing).await;
            return finish(items, rendered, separator, &tally, BatchOutcome::Failed(e));
        }

        let paths = SnapshotPaths::for_media(&self.config.folder, media_path);
        let mut outcome = BatchOutcome::Completed;
        for (i, item) in items.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::info!("Batch cancelled after {} of {} entries", i, items.len());
                outcome = BatchOutcome::Cancelled;
                break;
            }

            match self.resolve_item(&paths, &info, item, &mut tally).await {
                Ok(text) => rendered[i] = Some(text),
                Err(e) => {
                    tracing::warn!("Batch stopped at entry {}: {}", item.entry.id, e);
                    outcome = BatchOutcome::Failed(e);
                    break;
                }
            }

            let progress = tally.progress(i + 1, items.len());
            tracing::info!("Snapshots {}", progress);
            on_progress(&progress);
        }

        self.restore(&info, was_playing).await;
        finish(items, rendered, separator, &tally, outcome)
    }

    /// Check the player holds the right media, make room for the snapshots
    /// and learn the length. Returns the length info and whether the player
    /// was playing. A failed calibration puts the player back by itself.
    async fn prepare(&self, media_path: &str) -> Result<(LengthInfo, bool)> {
        let playlist = self.player.playlist().await?;
        let playing = playlist.current_uri().ok_or(BridgeError::PlayerNotReady)?;
        if !same_media(playing, media_path) {
            return Err(BridgeError::DifferentMediaPlaying {
                expected: media_path.to_string(),
                playing: playing.to_string(),
            });
        }

        let paths = SnapshotPaths::for_media(&self.config.folder, media_path);
        self.fs.create_dir_all(&paths.media_dir()).await?;

        let was_playing = self.player.status().await?.is_playing();
        let info = self.lengths.resolve(self.player, media_path, false).await?;
        Ok((info, was_playing))
    }

    async fn resolve_item(
        &self,
        paths: &SnapshotPaths,
        info: &LengthInfo,
        item: &BatchItem,
        tally: &mut Tally,
    ) -> Result<String> {
        if !item.formatted.has_snapshot_slot() {
            return Ok(item.formatted.render_unresolved());
        }

        let entry = &item.entry;
        let target_ms = if self.config.jump_middle_of_dialog {
            entry.midpoint_ms()
        } else {
            entry.from
        };
        let range = self
            .config
            .show_all_in_range
            .then(|| (entry.from, item.next_from.unwrap_or(i64::MAX)));

        let existing = find_existing(self.fs, paths, target_ms, range).await?;
        let embeds: Vec<String> = if existing.is_empty() {
            let started = Instant::now();
            let path = self.capture(paths, info, target_ms).await?;
            tally.captures.push(started.elapsed());
            vec![embed_markup(&path)]
        } else {
            tally.reused += 1;
            existing.into_iter().map(|m| m.embed).collect()
        };

        tally.resolved += 1;
        Ok(item.formatted.render_with_snapshots(&embeds))
    }

    /// Seek and capture, retrying missed snapshots. Returns the canonical path.
    async fn capture(&self, paths: &SnapshotPaths, info: &LengthInfo, target_ms: i64) -> Result<String> {
        let seek = percent_seek_value(target_ms, info.length_ms());
        let attempts = self.config.max_attempts.max(1);

        let mut attempt = 1;
        loop {
            match self.capture_once(paths, &seek, target_ms).await {
                Ok(path) => return Ok(path),
                Err(e) if e.is_retryable() && attempt < attempts => {
                    tracing::warn!(
                        "No snapshot file for {} (attempt {}/{})",
                        seek,
                        attempt,
                        attempts
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn capture_once(&self, paths: &SnapshotPaths, seek: &str, target_ms: i64) -> Result<String> {
        self.player.send(&Command::Seek(seek.to_string())).await?;
        capture_frame(self.player, self.fs, self.config, paths, target_ms)
            .await?
            .ok_or(BridgeError::SnapshotNotFound)
    }

    /// Put the player back where the batch found it
    async fn restore(&self, info: &LengthInfo, was_playing: bool) {
        let value = format!("{}%", format_percent(info.position * 100.0));
        if let Err(e) = self.player.send(&Command::Seek(value)).await {
            tracing::warn!("Could not restore the player position: {}", e);
        }
        if was_playing {
            if let Err(e) = self.player.send(&Command::Pause).await {
                tracing::warn!("Could not resume playback: {}", e);
            }
        }
    }
}

/// Snapshot the current frame and claim the file the player writes as the
/// snapshot of `target_ms`. `None` when no file shows up in time.
///
/// The player names files itself, so the new file is recognised by its
/// creation time: after the request went out and before the poll deadline
/// ran out.
pub async fn capture_frame<P: PlayerControl, F: VaultFs>(
    player: &P,
    fs: &F,
    config: &SnapshotConfig,
    paths: &SnapshotPaths,
    target_ms: i64,
) -> Result<Option<String>> {
    let before = Utc::now();
    player.send(&Command::Snapshot).await?;
    let after = Utc::now();

    let schedule = config.poll_schedule();
    let window_end = after
        + chrono::Duration::from_std(schedule.deadline).unwrap_or_else(|_| chrono::Duration::zero());
    let folder = paths.folder();
    let found = poll_until(schedule, move || async move {
        let files = fs.list_created_between(folder, before, window_end).await?;
        Ok::<_, BridgeError>(files.into_iter().max_by_key(|f: &FileEntry| f.created))
    })
    .await?;

    let Some(file) = found else {
        return Ok(None);
    };
    let ext = file
        .name()
        .rsplit_once('.')
        .map_or(config.ext.as_str(), |(_, ext)| ext);
    let target = paths.path(target_ms, ext);
    fs.rename(&file.path, &target).await?;
    tracing::debug!("Captured {}", target);
    Ok(Some(target))
}

fn finish(
    items: &[BatchItem],
    rendered: Vec<Option<String>>,
    separator: &str,
    tally: &Tally,
    outcome: BatchOutcome,
) -> BatchReport {
    let text = items
        .iter()
        .zip(rendered)
        .map(|(item, text)| text.unwrap_or_else(|| item.formatted.render_unresolved()))
        .collect::<Vec<_>>()
        .join(separator);

    tracing::info!(
        "Batch finished: {} resolved ({} captured, {} reused), {:?}",
        tally.resolved,
        tally.captures.len(),
        tally.reused,
        outcome
    );
    BatchReport {
        text,
        resolved: tally.resolved,
        captured: tally.captures.len(),
        reused: tally.reused,
        outcome,
    }
}
