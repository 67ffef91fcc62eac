//! Session context
//!
//! Everything an operation needs travels in a `Session`: configuration, the
//! player, the vault, the length cache and which subtitle was last attached to
//! which media. Independent sessions share nothing.

use std::time::Duration;

use parking_lot::RwLock;

use crate::batch::{capture_frame, Batch, BatchProgress, BatchReport, CancelFlag};
use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::fs::VaultFs;
use crate::length::LengthResolver;
use crate::media::{is_playable, uri_to_path};
use crate::player::{same_media, wait_for_streams, wait_until_reachable, Command, PlayerControl};
use crate::snapshot::{embed_markup, SnapshotPaths};
use crate::template::LinkParams;
use crate::timeline::{parse_timestamp, seconds_to_timestamp, Timestamp};
use crate::transcript::Transcript;

/// Media and subtitle the bridge last attached
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CurrentMedia {
    pub media_path: Option<String>,
    pub subtitle_path: Option<String>,
}

pub struct Session<P, F> {
    config: BridgeConfig,
    player: P,
    fs: F,
    lengths: LengthResolver,
    current: RwLock<CurrentMedia>,
}

/// Local path of a subtitle given as a path or a `file:///` URI
fn subtitle_path(path: &str) -> String {
    uri_to_path(path)
}

impl<P: PlayerControl, F: VaultFs> Session<P, F> {
    pub fn new(config: BridgeConfig, player: P, fs: F) -> Self {
        Self {
            config,
            player,
            fs,
            lengths: LengthResolver::new(),
            current: RwLock::new(CurrentMedia::default()),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn fs(&self) -> &F {
        &self.fs
    }

    pub fn lengths(&self) -> &LengthResolver {
        &self.lengths
    }

    pub fn current_media(&self) -> CurrentMedia {
        self.current.read().clone()
    }

    /// Path of the media being played
    async fn playing_media(&self) -> Result<String> {
        let playlist = self.player.playlist().await?;
        playlist
            .current_uri()
            .map(uri_to_path)
            .ok_or(BridgeError::PlayerNotReady)
    }

    /// Open a seek link given as its query string (or the whole link)
    pub async fn open_link(&self, link: &str) -> Result<()> {
        let (params, timestamp) = LinkParams::from_query(link)?;
        let timestamp = timestamp
            .filter(|t| !t.is_empty())
            .map(|t| parse_timestamp(&t))
            .transpose()?;
        self.open(&params, timestamp).await
    }

    /// Play a media file (enqueueing it if needed), attach the subtitle and
    /// seek to `timestamp`
    pub async fn open(&self, link: &LinkParams, timestamp: Option<Timestamp>) -> Result<()> {
        let media = uri_to_path(&link.media_path);
        if !is_playable(&media) {
            tracing::warn!("{} does not look like a media file", media);
        }

        let playlist = match self.player.playlist().await {
            Ok(playlist) => playlist,
            Err(e) => {
                tracing::info!("Player not answering ({}), waiting for it", e);
                let timeout = Duration::from_millis(self.config.player.launch_timeout_ms);
                wait_until_reachable(&self.player, timeout).await?
            }
        };

        let stream_wait = Duration::from_millis(self.config.player.stream_wait_ms);
        let is_current = match playlist.find_media(&media) {
            Some(item) if item.current.is_some() => true,
            Some(item) => {
                tracing::debug!("Playing playlist item {}", item.id);
                self.player.send(&Command::Play(item.id.clone())).await?;
                wait_for_streams(&self.player, stream_wait).await?;
                false
            }
            None => {
                tracing::debug!("Adding {} to the playlist", media);
                self.player.send(&Command::InPlay(media.clone())).await?;
                wait_for_streams(&self.player, stream_wait).await?;
                false
            }
        };

        if let Some(sub) = &link.sub_path {
            let attached = self.current.read().subtitle_path.clone();
            if !is_current || attached.as_deref() != Some(subtitle_path(sub).as_str()) {
                self.add_subtitle(sub, link.sub_delay).await?;
            }
        }

        if let Some(ts) = timestamp {
            self.player.send(&Command::Seek(ts.seek_value())).await?;
        }
        Ok(())
    }

    /// Attach a subtitle file to the current media, select it and apply the
    /// delay
    pub async fn add_subtitle(&self, path: &str, delay: Option<f64>) -> Result<()> {
        let path = subtitle_path(path);
        self.player.send(&Command::AddSubtitle(path.clone())).await?;

        let media = self.playing_media().await.ok();
        *self.current.write() = CurrentMedia {
            media_path: media,
            subtitle_path: Some(path.clone()),
        };

        let stream_wait = Duration::from_millis(self.config.player.stream_wait_ms);
        let status = wait_for_streams(&self.player, stream_wait).await?;
        let track = status.stream_count().saturating_sub(1);
        self.player.send(&Command::SubtitleTrack(track)).await?;
        if let Some(delay) = delay {
            self.player.send(&Command::SubDelay(delay)).await?;
        }
        tracing::info!("Attached subtitle {} as track {}", path, track);
        Ok(())
    }

    /// Link parameters for the media being played, with the attached
    /// subtitle if it belongs to that media
    async fn current_link(&self) -> Result<(LinkParams, f64)> {
        let media = self.playing_media().await?;
        let status = self.player.status().await?;
        let current = self.current_media();
        let mut link = LinkParams::new(media.clone());
        if let (Some(attached), Some(sub)) = (&current.media_path, &current.subtitle_path) {
            if same_media(attached, &media) {
                link = link.with_subtitle(sub.clone(), Some(status.subtitledelay));
            }
        }
        Ok((link, status.time as f64))
    }

    /// `[MM:SS](link)` for the current playback time
    pub async fn timestamp_link(&self) -> Result<String> {
        if self.config.transcript.pause_on_paste_link {
            self.player.send(&Command::ForcePause).await?;
        }
        let status = self.player.status().await?;
        if status.is_stopped() {
            return Err(BridgeError::PlayerNotReady);
        }
        let (link, time) = self.current_link().await?;
        Ok(format!(
            "[{}]({})",
            seconds_to_timestamp(time as i64),
            link.seek_link(&self.config.transcript.link_scheme, &Timestamp::Seconds(time).seek_value())
        ))
    }

    /// Snapshot the current frame and return `"<timestamp link> <embed>"`
    pub async fn take_snapshot(&self) -> Result<String> {
        let status = self.player.status().await?;
        if status.is_stopped() {
            return Err(BridgeError::PlayerNotReady);
        }
        if self.config.snapshot.pause_on_snapshot {
            self.player.send(&Command::ForcePause).await?;
        }

        let media = self.playing_media().await?;
        let info = self.lengths.resolve(&self.player, &media, true).await?;
        let paths = SnapshotPaths::for_media(&self.config.snapshot.folder, &media);
        self.fs.create_dir_all(&paths.media_dir()).await?;

        let path = capture_frame(
            &self.player,
            &self.fs,
            &self.config.snapshot,
            &paths,
            info.position_ms,
        )
        .await?
        .ok_or(BridgeError::SnapshotNotFound)?;

        let link = self.timestamp_link().await?;
        Ok(format!("{} {}", link, embed_markup(&path)))
    }

    /// Seek by a number of seconds, backwards when negative
    pub async fn seek_relative(&self, seconds: i64) -> Result<()> {
        self.player.send(&Command::Seek(format!("{:+}", seconds))).await?;
        Ok(())
    }

    pub async fn seek_forward(&self, large: bool) -> Result<()> {
        self.seek_relative(self.seek_amount(large)).await
    }

    pub async fn seek_backward(&self, large: bool) -> Result<()> {
        self.seek_relative(-self.seek_amount(large)).await
    }

    fn seek_amount(&self, large: bool) -> i64 {
        if large {
            self.config.player.large_seek_secs as i64
        } else {
            self.config.player.normal_seek_secs as i64
        }
    }

    pub async fn toggle_pause(&self) -> Result<()> {
        self.player.send(&Command::Pause).await?;
        Ok(())
    }

    /// Load a transcript for the media being played
    pub async fn load_transcript(&self, sub_path: &str) -> Result<Transcript> {
        let media = self.playing_media().await?;
        let length = self.lengths.length(&self.player, &media).await?;
        let delay = self.player.status().await?.subtitledelay;
        Transcript::load(
            subtitle_path(sub_path),
            &media,
            length,
            (delay != 0.0).then_some(delay),
            &self.config.transcript,
        )
        .await
    }

    /// Resolve the snapshot slots of the selected transcript entries
    pub async fn snapshots<C: FnMut(&BatchProgress)>(
        &self,
        transcript: &Transcript,
        indices: &[usize],
        cancel: &CancelFlag,
        on_progress: C,
    ) -> BatchReport {
        let items = transcript.batch_items(indices);
        Batch::new(&self.player, &self.fs, &self.lengths, &self.config.snapshot)
            .run(
                &transcript.link().media_path,
                &items,
                transcript.separator(),
                cancel,
                on_progress,
            )
            .await
    }
}
