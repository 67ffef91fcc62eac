//! Media length resolution
//!
//! The player reports length as whole seconds, too coarse to turn a
//! millisecond dialogue time into a percentage seek on a long file. Seeking
//! to the one second mark and reading back the position gives
//! `position = 1 / length`, precise enough. The result is cached per media
//! path for the lifetime of the resolver.

use std::time::Duration;

use dashmap::DashMap;

use crate::error::{BridgeError, Result};
use crate::player::{Command, PlayerControl, PlayerStatus};
use crate::poll::{poll_until, PollSchedule};
use crate::timeline::{format_percent, ms_from_fraction};

/// Slack on the truncated length check, for float error in `1 / p`
const LENGTH_TOLERANCE: f64 = 1e-3;

/// Length of the current media and where playback is
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LengthInfo {
    /// Length in seconds, fractional
    pub length_secs: f64,
    /// Position before resolution, 0..1
    pub position: f64,
    /// `position` in milliseconds
    pub position_ms: i64,
}

impl LengthInfo {
    pub fn length_ms(&self) -> i64 {
        (self.length_secs * 1000.0).round() as i64
    }
}

/// Per media path length cache
#[derive(Debug)]
pub struct LengthResolver {
    cache: DashMap<String, f64>,
    /// How long to wait for a position that belongs to the calibration seek
    schedule: PollSchedule,
}

impl Default for LengthResolver {
    fn default() -> Self {
        Self::with_schedule(PollSchedule::new(
            Duration::from_millis(100),
            Duration::from_millis(2000),
        ))
    }
}

impl LengthResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schedule(schedule: PollSchedule) -> Self {
        Self {
            cache: DashMap::new(),
            schedule,
        }
    }

    /// Cached length of a media file
    pub fn cached(&self, media_path: &str) -> Option<f64> {
        self.cache.get(media_path).map(|l| *l)
    }

    /// Length only. A cache hit does not touch the player.
    pub async fn length<P: PlayerControl>(&self, player: &P, media_path: &str) -> Result<f64> {
        if let Some(length) = self.cached(media_path) {
            return Ok(length);
        }
        Ok(self.resolve(player, media_path, true).await?.length_secs)
    }

    /// Resolve the length of the media loaded in the player, along with the
    /// current position. With `restore` set the position is put back after
    /// the calibration seek.
    pub async fn resolve<P: PlayerControl>(
        &self,
        player: &P,
        media_path: &str,
        restore: bool,
    ) -> Result<LengthInfo> {
        let status = active_status(player).await?;
        let position = status.position;

        if let Some(length_secs) = self.cached(media_path) {
            return Ok(info(length_secs, position));
        }

        let reported = status.length;
        let answer = player.send(&Command::Seek("1".to_string())).await?;
        let mut length = calibrated_length(answer.position, reported);
        if length.is_none() {
            // The answer to a seek can predate the seek itself.
            tracing::debug!(
                "Seek answered with position {}, waiting for the calibrated one",
                answer.position
            );
            length = poll_until(self.schedule, move || async move {
                let status = player.status().await?;
                Ok::<_, BridgeError>(calibrated_length(status.position, reported))
            })
            .await?;
        }

        // A failed calibration still moved the player, so put it back.
        if restore || length.is_none() {
            let value = format!("{}%", format_percent(position * 100.0));
            player.send(&Command::Seek(value)).await?;
        }
        let Some(length_secs) = length else {
            tracing::warn!(
                "Could not calibrate the length of {} (player reports {}s)",
                media_path,
                reported
            );
            return Err(BridgeError::PlayerNotReady);
        };

        tracing::debug!(
            "Resolved length of {}: {:.3}s (player reports {}s)",
            media_path,
            length_secs,
            status.length
        );
        self.cache.insert(media_path.to_string(), length_secs);
        Ok(info(length_secs, position))
    }
}

/// Length implied by the position after seeking to one second, if it agrees
/// with the whole seconds the player reports. A zero report is not checked.
fn calibrated_length(position: f64, reported_secs: i64) -> Option<f64> {
    if !position.is_finite() || position <= 0.0 {
        return None;
    }
    let length = 1.0 / position;
    if reported_secs <= 0 {
        return Some(length);
    }
    let reported = reported_secs as f64;
    (length >= reported - LENGTH_TOLERANCE && length < reported + 1.0 + LENGTH_TOLERANCE)
        .then_some(length)
}

fn info(length_secs: f64, position: f64) -> LengthInfo {
    LengthInfo {
        length_secs,
        position,
        position_ms: ms_from_fraction(position, (length_secs * 1000.0).round() as i64),
    }
}

/// Current status, starting a stopped player paused so that seeks work
async fn active_status<P: PlayerControl>(player: &P) -> Result<PlayerStatus> {
    let status = player.status().await?;
    if !status.is_stopped() {
        return Ok(status);
    }
    player.send(&Command::ForcePause).await?;
    let status = player.status().await?;
    if status.is_stopped() {
        return Err(BridgeError::PlayerNotReady);
    }
    Ok(status)
}
