//! Configuration file support
//!
//! Loads bridge configuration from TOML files. Only the `[player]` section is
//! required; every other section falls back to the built-in defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::{
    BridgeConfig, PlayerConfig, SnapshotConfig, SnapshotExt, TranscriptConfig, DEFAULT_TEMPLATE,
};

/// Configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Player connection settings
    pub player: PlayerSettings,
    /// Snapshot settings
    pub snapshot: Option<SnapshotSettings>,
    /// Transcript settings
    pub transcript: Option<TranscriptSettings>,
    /// Logging settings
    pub logging: Option<LoggingSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSettings {
    /// Host of the HTTP interface
    pub host: Option<String>,
    /// Port of the HTTP interface
    pub port: u16,
    /// HTTP interface password
    pub password: String,
    /// Status/playlist round trip timeout in ms
    pub request_timeout_ms: Option<u64>,
    /// Reconnect timeout after launching the player, in ms
    pub launch_timeout_ms: Option<u64>,
    /// Wait for the streams of newly opened media, in ms
    pub stream_wait_ms: Option<u64>,
    /// Seek amounts in seconds
    pub normal_seek_secs: Option<u32>,
    pub large_seek_secs: Option<u32>,
    /// Keep the player on top
    pub always_on_top: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotSettings {
    /// Vault root directory
    pub vault_root: Option<PathBuf>,
    /// Snapshot folder, relative to the vault root
    pub folder: String,
    /// Snapshot file prefix
    pub prefix: Option<String>,
    /// Snapshot format (png, jpg, tiff)
    pub ext: Option<SnapshotExt>,
    /// Capture at the middle of a dialogue
    pub jump_middle_of_dialog: Option<bool>,
    /// Embed all snapshots in a dialogue's range
    pub show_all_in_range: Option<bool>,
    /// Poll interval in ms
    pub poll_interval_ms: Option<u64>,
    /// Poll deadline in ms
    pub poll_deadline_ms: Option<u64>,
    /// Capture attempts per entry
    pub max_attempts: Option<u32>,
    /// Pause before single-shot snapshots
    pub pause_on_snapshot: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSettings {
    /// Entry template
    pub template: Option<String>,
    /// Minimal entry template
    pub simple_template: Option<String>,
    /// Wrap text lines in a span
    pub wrap_text: Option<bool>,
    /// Link scheme
    pub link_scheme: Option<String>,
    /// Entry separator
    pub separator: Option<String>,
    /// Search only in dialogue text
    pub only_search_within_text: Option<bool>,
    /// Pause when pasting a link
    pub pause_on_paste_link: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: Option<String>,
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: ConfigFile = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Generate default configuration file
    pub fn default_config() -> Self {
        Self {
            player: PlayerSettings {
                host: Some("localhost".to_string()),
                port: 1234,
                password: "vlcpassword".to_string(),
                request_timeout_ms: Some(2000),
                launch_timeout_ms: Some(5000),
                stream_wait_ms: Some(10000),
                normal_seek_secs: Some(5),
                large_seek_secs: Some(60),
                always_on_top: Some(true),
            },
            snapshot: Some(SnapshotSettings {
                vault_root: Some(PathBuf::from(".")),
                folder: "vlcSnapshots".to_string(),
                prefix: Some("image".to_string()),
                ext: Some(SnapshotExt::Png),
                jump_middle_of_dialog: Some(false),
                show_all_in_range: Some(false),
                poll_interval_ms: Some(50),
                poll_deadline_ms: Some(1000),
                max_attempts: Some(4),
                pause_on_snapshot: Some(false),
            }),
            transcript: Some(TranscriptSettings {
                template: Some(DEFAULT_TEMPLATE.to_string()),
                simple_template: Some(DEFAULT_TEMPLATE.to_string()),
                wrap_text: Some(true),
                link_scheme: Some("obsidian://vlcBridge".to_string()),
                separator: Some("\n".to_string()),
                only_search_within_text: Some(false),
                pause_on_paste_link: Some(false),
            }),
            logging: Some(LoggingSettings {
                level: "info".to_string(),
                format: Some("pretty".to_string()),
            }),
        }
    }

    /// Convert to BridgeConfig
    pub fn into_bridge_config(self) -> BridgeConfig {
        let player_defaults = PlayerConfig::default();
        let player = PlayerConfig {
            host: self.player.host.unwrap_or(player_defaults.host),
            port: self.player.port,
            password: self.player.password,
            request_timeout_ms: self
                .player
                .request_timeout_ms
                .unwrap_or(player_defaults.request_timeout_ms),
            launch_timeout_ms: self
                .player
                .launch_timeout_ms
                .unwrap_or(player_defaults.launch_timeout_ms),
            stream_wait_ms: self
                .player
                .stream_wait_ms
                .unwrap_or(player_defaults.stream_wait_ms),
            normal_seek_secs: self
                .player
                .normal_seek_secs
                .unwrap_or(player_defaults.normal_seek_secs),
            large_seek_secs: self
                .player
                .large_seek_secs
                .unwrap_or(player_defaults.large_seek_secs),
            always_on_top: self
                .player
                .always_on_top
                .unwrap_or(player_defaults.always_on_top),
        };

        let snapshot = match self.snapshot {
            Some(s) => {
                let d = SnapshotConfig::default();
                SnapshotConfig {
                    vault_root: s.vault_root.unwrap_or(d.vault_root),
                    folder: s.folder,
                    prefix: s.prefix.unwrap_or(d.prefix),
                    ext: s.ext.unwrap_or(d.ext),
                    jump_middle_of_dialog: s.jump_middle_of_dialog.unwrap_or(d.jump_middle_of_dialog),
                    show_all_in_range: s.show_all_in_range.unwrap_or(d.show_all_in_range),
                    poll_interval_ms: s.poll_interval_ms.unwrap_or(d.poll_interval_ms),
                    poll_deadline_ms: s.poll_deadline_ms.unwrap_or(d.poll_deadline_ms),
                    max_attempts: s.max_attempts.unwrap_or(d.max_attempts),
                    pause_on_snapshot: s.pause_on_snapshot.unwrap_or(d.pause_on_snapshot),
                }
            }
            None => SnapshotConfig::default(),
        };

        let transcript = match self.transcript {
            Some(t) => {
                let d = TranscriptConfig::default();
                TranscriptConfig {
                    template: t.template.unwrap_or(d.template),
                    simple_template: t.simple_template.unwrap_or(d.simple_template),
                    wrap_text: t.wrap_text.unwrap_or(d.wrap_text),
                    link_scheme: t.link_scheme.unwrap_or(d.link_scheme),
                    separator: t.separator.unwrap_or(d.separator),
                    only_search_within_text: t
                        .only_search_within_text
                        .unwrap_or(d.only_search_within_text),
                    pause_on_paste_link: t.pause_on_paste_link.unwrap_or(d.pause_on_paste_link),
                }
            }
            None => TranscriptConfig::default(),
        };

        BridgeConfig {
            player,
            snapshot,
            transcript,
            log_level: self
                .logging
                .as_ref()
                .map(|l| l.level.clone())
                .unwrap_or_else(|| "info".to_string()),
            log_format: self
                .logging
                .and_then(|l| l.format)
                .unwrap_or_else(|| "pretty".to_string()),
        }
    }
}

/// Generate default configuration file at the specified path
pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigFile::default_config();
    config.to_file(path)?;
    Ok(())
}
