//! Bridge configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::poll::PollSchedule;

/// Connection settings for the player's HTTP interface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Host the HTTP interface listens on
    pub host: String,

    /// Port of the HTTP interface
    pub port: u16,

    /// HTTP interface password (the user name is always empty)
    pub password: String,

    /// Timeout for status/playlist round trips and the reachability check
    pub request_timeout_ms: u64,

    /// How long to wait for a freshly started player to answer
    pub launch_timeout_ms: u64,

    /// How long to wait for the streams of newly opened media
    pub stream_wait_ms: u64,

    /// Relative seek amount for the normal seek commands
    pub normal_seek_secs: u32,

    /// Relative seek amount for the long seek commands
    pub large_seek_secs: u32,

    /// Keep the player window above the others when launched with our arguments
    pub always_on_top: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1234,
            password: "vlcpassword".to_string(),
            request_timeout_ms: 2000,
            launch_timeout_ms: 5000,
            stream_wait_ms: 10000,
            normal_seek_secs: 5,
            large_seek_secs: 60,
            always_on_top: true,
        }
    }
}

impl PlayerConfig {
    /// Base URL of the HTTP interface
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Image format the player writes snapshots in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotExt {
    Png,
    Jpg,
    Tiff,
}

impl SnapshotExt {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotExt::Png => "png",
            SnapshotExt::Jpg => "jpg",
            SnapshotExt::Tiff => "tiff",
        }
    }
}

/// Snapshot capture and storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Root of the note vault; every other path is relative to it
    pub vault_root: PathBuf,

    /// Folder (vault relative) the player writes snapshots into
    pub folder: String,

    /// File name prefix the player is started with
    pub prefix: String,

    /// Snapshot image format
    pub ext: SnapshotExt,

    /// Capture at the middle of a dialogue instead of its start
    pub jump_middle_of_dialog: bool,

    /// Embed every snapshot between a dialogue and the next one
    pub show_all_in_range: bool,

    /// Interval between file system checks while waiting for a snapshot
    pub poll_interval_ms: u64,

    /// Total time to wait for a snapshot file per capture attempt
    pub poll_deadline_ms: u64,

    /// Seek + capture cycles before a missing snapshot stops the batch
    pub max_attempts: u32,

    /// Force pause before a single-shot snapshot
    pub pause_on_snapshot: bool,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            vault_root: PathBuf::from("."),
            folder: "vlcSnapshots".to_string(),
            prefix: "image".to_string(),
            ext: SnapshotExt::Png,
            jump_middle_of_dialog: false,
            show_all_in_range: false,
            poll_interval_ms: 50,
            poll_deadline_ms: 1000,
            max_attempts: 4,
            pause_on_snapshot: false,
        }
    }
}

impl SnapshotConfig {
    /// Poll schedule used while waiting for the player to write a file
    pub fn poll_schedule(&self) -> PollSchedule {
        PollSchedule::new(
            Duration::from_millis(self.poll_interval_ms),
            Duration::from_millis(self.poll_deadline_ms),
        )
    }
}

/// Transcript rendering settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptConfig {
    /// Template used for every dialogue entry
    pub template: String,

    /// Minimal template, used when snapshot association is skipped
    pub simple_template: String,

    /// Wrap each text line in a neutral `<span>` so the editor leaves it alone
    pub wrap_text: bool,

    /// Scheme + host of generated seek links
    pub link_scheme: String,

    /// Separator placed between rendered entries
    pub separator: String,

    /// Restrict transcript search to the dialogue text
    pub only_search_within_text: bool,

    /// Paste links with the player paused
    pub pause_on_paste_link: bool,
}

pub const DEFAULT_TEMPLATE: &str = "{{index}}. {{from}} >> {{to}}\n{{text}}";

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
            simple_template: DEFAULT_TEMPLATE.to_string(),
            wrap_text: true,
            link_scheme: "obsidian://vlcBridge".to_string(),
            separator: "\n".to_string(),
            only_search_within_text: false,
            pause_on_paste_link: false,
        }
    }
}

/// Bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub player: PlayerConfig,
    pub snapshot: SnapshotConfig,
    pub transcript: TranscriptConfig,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Log output format (pretty, json)
    pub log_format: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            player: PlayerConfig::default(),
            snapshot: SnapshotConfig::default(),
            transcript: TranscriptConfig::default(),
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}
