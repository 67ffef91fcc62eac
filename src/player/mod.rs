//! Remote player control
//!
//! The player is driven through its HTTP interface: every command is a query
//! on `status.json` answered with the resulting status.

pub mod client;
pub mod command;
pub mod types;

use std::time::Duration;

pub use client::VlcClient;
pub use command::Command;
pub use types::{same_media, PlaybackState, PlayerStatus, PlaylistNode};

use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::poll::{poll_until, PollSchedule};

/// What the bridge needs from a player
#[allow(async_fn_in_trait)]
pub trait PlayerControl {
    async fn status(&self) -> Result<PlayerStatus>;

    /// Send a command and return the status the player answers with
    async fn send(&self, command: &Command) -> Result<PlayerStatus>;

    async fn playlist(&self) -> Result<PlaylistNode>;

    /// Whether the interface answers at all
    async fn is_reachable(&self) -> bool {
        self.playlist().await.is_ok()
    }
}

/// Wait until the player answers, e.g. right after it was started
pub async fn wait_until_reachable<P: PlayerControl>(player: &P, timeout: Duration) -> Result<PlaylistNode> {
    let schedule = PollSchedule::new(Duration::from_millis(200), timeout);
    let found = poll_until(schedule, move || async move {
        Ok::<_, BridgeError>(player.playlist().await.ok())
    })
    .await?;
    found.ok_or_else(|| BridgeError::PlayerUnreachable(format!("no answer within {:?}", timeout)))
}

/// Wait until the current media exposes its streams (more than the "meta"
/// category). Returns the status that showed them.
pub async fn wait_for_streams<P: PlayerControl>(player: &P, timeout: Duration) -> Result<PlayerStatus> {
    let schedule = PollSchedule::new(Duration::from_millis(500), timeout);
    let found = poll_until(schedule, move || async move {
        let status = player.status().await?;
        Ok::<_, BridgeError>((status.stream_count() > 0).then_some(status))
    })
    .await?;
    found.ok_or(BridgeError::PlayerNotReady)
}

/// Command line arguments that start the player with the HTTP interface and
/// the snapshot settings the bridge expects. The caller spawns the process.
pub fn launch_args(config: &BridgeConfig) -> Vec<String> {
    let snapshot_dir = config.snapshot.vault_root.join(&config.snapshot.folder);
    let mut args = vec![
        "--extraintf=luaintf:http".to_string(),
        format!("--http-port={}", config.player.port),
        format!("--http-password={}", config.player.password),
        format!("--snapshot-path={}", snapshot_dir.display()),
        format!("--snapshot-format={}", config.snapshot.ext.as_str()),
        format!("--snapshot-prefix={}-", config.snapshot.prefix),
    ];
    if config.player.always_on_top {
        args.push("--video-on-top".to_string());
    }
    args
}
