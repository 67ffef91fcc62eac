//! Test fixtures for integration tests
//!
//! A scripted player that records every command and writes snapshot files
//! into an in-memory vault, plus subtitle samples.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::error::{BridgeError, Result};
use crate::fs::{file_name, FileEntry, VaultFs};
use crate::player::{Command, PlaybackState, PlayerControl, PlayerStatus, PlaylistNode};
use crate::player::types::Information;
use crate::subtitle::DialogueEntry;

/// In-memory vault
#[derive(Debug, Clone, Default)]
pub struct MemoryFs {
    inner: Arc<Mutex<MemoryFsInner>>,
}

#[derive(Debug, Default)]
struct MemoryFsInner {
    files: BTreeMap<String, DateTime<Utc>>,
    dirs: BTreeSet<String>,
    renames: usize,
}

fn parent(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(dir, _)| dir)
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file created now
    pub fn add_file(&self, path: &str) {
        self.add_file_at(path, Utc::now());
    }

    pub fn add_file_at(&self, path: &str, created: DateTime<Utc>) {
        self.inner.lock().files.insert(path.to_string(), created);
    }

    pub fn paths(&self) -> Vec<String> {
        self.inner.lock().files.keys().cloned().collect()
    }

    pub fn has_dir(&self, path: &str) -> bool {
        self.inner.lock().dirs.contains(path)
    }

    pub fn rename_count(&self) -> usize {
        self.inner.lock().renames
    }
}

impl VaultFs for MemoryFs {
    async fn exists(&self, path: &str) -> Result<bool> {
        let inner = self.inner.lock();
        Ok(inner.files.contains_key(path) || inner.dirs.contains(path))
    }

    async fn create_dir_all(&self, path: &str) -> Result<()> {
        let mut inner = self.inner.lock();
        let mut dir = String::new();
        for component in path.split('/').filter(|c| !c.is_empty()) {
            dir = crate::fs::join(&dir, component);
            inner.dirs.insert(dir.clone());
        }
        Ok(())
    }

    async fn list(&self, dir: &str) -> Result<Vec<FileEntry>> {
        let dir = dir.trim_end_matches('/');
        Ok(self
            .inner
            .lock()
            .files
            .iter()
            .filter(|(path, _)| parent(path) == dir)
            .map(|(path, created)| FileEntry {
                path: path.clone(),
                created: *created,
            })
            .collect())
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let mut inner = self.inner.lock();
        let created = inner.files.remove(from).ok_or_else(|| {
            BridgeError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} not found", from),
            ))
        })?;
        inner.files.insert(to.to_string(), created);
        inner.renames += 1;
        Ok(())
    }
}

#[derive(Debug)]
struct PlaylistItem {
    id: String,
    uri: String,
}

struct FakeState {
    playback: PlaybackState,
    length_ms: i64,
    position_ms: i64,
    items: Vec<PlaylistItem>,
    current: Option<usize>,
    streams: Vec<String>,
    subtitle_delay: f64,
    commands: Vec<Command>,
    snapshot_target: Option<(MemoryFs, String, String)>,
    snapshots_taken: usize,
    missed_snapshots: u32,
    stale_answers: bool,
    ignore_seeks: bool,
    failing_command: Option<&'static str>,
}

/// Scripted player
#[derive(Clone)]
pub struct FakePlayer {
    state: Arc<Mutex<FakeState>>,
}

fn file_uri(path: &str) -> String {
    let path = path.replace('\\', "/");
    format!("file:///{}", urlencoding::encode(path.trim_start_matches('/')).replace("%2F", "/"))
}

impl FakePlayer {
    /// A player playing `media_path`, `length_ms` long, at position 0
    pub fn new(media_path: &str, length_ms: i64) -> Self {
        let player = Self::empty();
        {
            let mut state = player.state.lock();
            state.items.push(PlaylistItem {
                id: "3".to_string(),
                uri: file_uri(media_path),
            });
            state.current = Some(0);
            state.playback = PlaybackState::Playing;
            state.length_ms = length_ms;
            state.streams = vec!["meta".into(), "Stream 0".into(), "Stream 1".into()];
        }
        player
    }

    /// A player with nothing loaded
    pub fn empty() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState {
                playback: PlaybackState::Stopped,
                length_ms: 0,
                position_ms: 0,
                items: Vec::new(),
                current: None,
                streams: vec!["meta".into()],
                subtitle_delay: 0.0,
                commands: Vec::new(),
                snapshot_target: None,
                snapshots_taken: 0,
                missed_snapshots: 0,
                stale_answers: false,
                ignore_seeks: false,
                failing_command: None,
            })),
        }
    }

    /// Write snapshots as `<folder>/<prefix>-NNNNN.png` into `fs`
    pub fn with_snapshots(self, fs: &MemoryFs, folder: &str, prefix: &str) -> Self {
        self.state.lock().snapshot_target = Some((fs.clone(), folder.to_string(), prefix.to_string()));
        self
    }

    /// Ignore the next `n` snapshot commands
    pub fn miss_snapshots(&self, n: u32) {
        self.state.lock().missed_snapshots = n;
    }

    /// Answer commands with the status from before the command ran
    pub fn stale_answers(&self) {
        self.state.lock().stale_answers = true;
    }

    /// Record seeks without moving
    pub fn ignore_seeks(&self) {
        self.state.lock().ignore_seeks = true;
    }

    /// Fail every command with this player name as if the player went away
    pub fn fail_command(&self, name: &'static str) {
        self.state.lock().failing_command = Some(name);
    }

    /// Add a playlist item that is not playing
    pub fn enqueue(&self, id: &str, media_path: &str) {
        self.state.lock().items.push(PlaylistItem {
            id: id.to_string(),
            uri: file_uri(media_path),
        });
    }

    pub fn set_position_ms(&self, ms: i64) {
        self.state.lock().position_ms = ms;
    }

    pub fn position_ms(&self) -> i64 {
        self.state.lock().position_ms
    }

    pub fn playback(&self) -> PlaybackState {
        self.state.lock().playback
    }

    pub fn pause(&self) {
        self.state.lock().playback = PlaybackState::Paused;
    }

    pub fn stop(&self) {
        self.state.lock().playback = PlaybackState::Stopped;
    }

    pub fn subtitle_delay(&self) -> f64 {
        self.state.lock().subtitle_delay
    }

    pub fn commands(&self) -> Vec<Command> {
        self.state.lock().commands.clone()
    }

    pub fn command_count(&self) -> usize {
        self.state.lock().commands.len()
    }

    /// Number of commands with this player name (`seek`, `snapshot`, ...)
    pub fn count(&self, name: &str) -> usize {
        self.state.lock().commands.iter().filter(|c| c.name() == name).count()
    }

    /// Values of every seek, in order
    pub fn seeks(&self) -> Vec<String> {
        self.state
            .lock()
            .commands
            .iter()
            .filter_map(|c| match c {
                Command::Seek(v) => Some(v.clone()),
                _ => None,
            })
            .collect()
    }

    fn make_status(state: &FakeState) -> PlayerStatus {
        let position = if state.length_ms > 0 {
            state.position_ms as f64 / state.length_ms as f64
        } else {
            0.0
        };
        let category = state
            .streams
            .iter()
            .map(|s| (s.clone(), Default::default()))
            .collect();
        PlayerStatus {
            state: state.playback,
            position,
            length: state.length_ms / 1000,
            time: state.position_ms / 1000,
            currentplid: state
                .current
                .and_then(|i| state.items[i].id.parse().ok())
                .unwrap_or(-1),
            subtitledelay: state.subtitle_delay,
            information: Some(Information { category }),
        }
    }

    fn seek(state: &mut FakeState, value: &str) {
        let target = if let Some(pct) = value.strip_suffix('%') {
            let pct: f64 = pct.parse().unwrap_or(0.0);
            (pct / 100.0 * state.length_ms as f64).round() as i64
        } else if let Some(rel) = value.strip_prefix('+') {
            state.position_ms + rel.parse::<i64>().unwrap_or(0) * 1000
        } else if value.starts_with('-') {
            state.position_ms + value.parse::<i64>().unwrap_or(0) * 1000
        } else {
            (value.parse::<f64>().unwrap_or(0.0) * 1000.0).round() as i64
        };
        state.position_ms = target.clamp(0, state.length_ms.max(0));
    }

    fn snapshot(state: &mut FakeState) {
        if state.missed_snapshots > 0 {
            state.missed_snapshots -= 1;
            return;
        }
        let Some((fs, folder, prefix)) = state.snapshot_target.clone() else {
            return;
        };
        state.snapshots_taken += 1;
        let name = format!("{}-{:05}.png", prefix, state.snapshots_taken);
        fs.add_file(&crate::fs::join(&folder, &name));
    }
}

impl PlayerControl for FakePlayer {
    async fn status(&self) -> Result<PlayerStatus> {
        Ok(Self::make_status(&self.state.lock()))
    }

    async fn send(&self, command: &Command) -> Result<PlayerStatus> {
        let mut state = self.state.lock();
        state.commands.push(command.clone());
        if state.failing_command == Some(command.name()) {
            return Err(BridgeError::PlayerUnreachable(format!("{} failed", command.name())));
        }
        let before = Self::make_status(&state);
        let has_media = state.current.is_some();
        match command {
            Command::Seek(v) if has_media && !state.ignore_seeks => Self::seek(&mut state, v),
            Command::Snapshot if has_media => Self::snapshot(&mut state),
            Command::Pause if has_media => {
                state.playback = match state.playback {
                    PlaybackState::Playing => PlaybackState::Paused,
                    _ => PlaybackState::Playing,
                }
            }
            Command::ForcePause if has_media => state.playback = PlaybackState::Paused,
            Command::Play(id) => {
                if let Some(i) = state.items.iter().position(|item| item.id == *id) {
                    state.current = Some(i);
                    state.playback = PlaybackState::Playing;
                    state.position_ms = 0;
                }
            }
            Command::InPlay(input) => {
                let id = (state.items.len() + 3).to_string();
                state.items.push(PlaylistItem {
                    id,
                    uri: file_uri(input),
                });
                state.current = Some(state.items.len() - 1);
                state.playback = PlaybackState::Playing;
                state.position_ms = 0;
                if state.streams.len() < 2 {
                    state.streams = vec!["meta".into(), "Stream 0".into(), "Stream 1".into()];
                }
            }
            Command::AddSubtitle(_) if has_media => {
                let n = state.streams.len() - 1;
                state.streams.push(format!("Stream {}", n));
            }
            Command::SubDelay(d) => state.subtitle_delay = *d,
            _ => {}
        }
        if state.stale_answers {
            return Ok(before);
        }
        Ok(Self::make_status(&state))
    }

    async fn playlist(&self) -> Result<PlaylistNode> {
        let state = self.state.lock();
        let items = state
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| PlaylistNode {
                id: item.id.clone(),
                name: file_name(&item.uri).to_string(),
                uri: Some(item.uri.clone()),
                current: (state.current == Some(i)).then(|| "current".to_string()),
                duration: None,
                children: Vec::new(),
            })
            .collect();
        Ok(PlaylistNode {
            id: "0".to_string(),
            children: vec![
                PlaylistNode {
                    id: "1".to_string(),
                    name: "Playlist".to_string(),
                    children: items,
                    ..Default::default()
                },
                PlaylistNode {
                    id: "2".to_string(),
                    name: "Media Library".to_string(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        })
    }
}

/// Two line SubRip sample
pub const SAMPLE_SRT: &str = "1\n00:00:00,000 --> 00:00:02,000\nHello\n\n2\n00:00:02,000 --> 00:00:04,000\nWorld\n";

/// `n` back to back one second entries
pub fn numbered_entries(n: usize) -> Vec<DialogueEntry> {
    (0..n)
        .map(|i| {
            let from = i as i64 * 1000;
            DialogueEntry::new((i + 1).to_string(), from, from + 1000, format!("line {}", i + 1))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_fs() {
        let fs = MemoryFs::new();
        fs.create_dir_all("a/b").await.unwrap();
        assert!(fs.has_dir("a") && fs.has_dir("a/b"));
        fs.add_file("a/one.png");
        fs.add_file("a/b/two.png");
        assert_eq!(fs.list("a").await.unwrap().len(), 1);
        fs.rename("a/one.png", "a/b/one.png").await.unwrap();
        assert_eq!(fs.list("a/b").await.unwrap().len(), 2);
        assert!(fs.rename("missing", "x").await.is_err());
    }

    #[tokio::test]
    async fn test_fake_player_seek_and_snapshot() {
        let fs = MemoryFs::new();
        let player = FakePlayer::new("/v/Movie.mkv", 10_000).with_snapshots(&fs, "snaps", "image");
        player.send(&Command::Seek("50%".into())).await.unwrap();
        assert_eq!(player.position_ms(), 5000);
        player.send(&Command::Seek("+2".into())).await.unwrap();
        assert_eq!(player.position_ms(), 7000);
        player.send(&Command::Snapshot).await.unwrap();
        assert_eq!(fs.paths(), vec!["snaps/image-00001.png".to_string()]);

        let pl = player.playlist().await.unwrap();
        assert!(pl.find_media("/v/Movie.mkv").is_some());
    }
}
