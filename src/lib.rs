//! VLC Bridge
//!
//! Connects a note editor to VLC's HTTP interface: timestamped seek links,
//! still-frame snapshots, and a transcript derived from subtitle files that is
//! kept in sync with the player's position.

// helper.
macro_rules! regex {
    ($re:literal $(,)?) => {{
        static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
        RE.get_or_init(|| regex::Regex::new($re).unwrap())
    }};
}

pub mod batch;
pub mod config;
pub mod config_file;
pub mod error;
pub mod fs;
pub mod length;
pub mod media;
pub mod player;
pub mod poll;
pub mod session;
pub mod snapshot;
pub mod subtitle;
pub mod template;
pub mod timeline;
pub mod transcript;

#[cfg(test)]
pub(crate) mod integration;

pub use config::BridgeConfig;
pub use error::{BridgeError, Result};
pub use session::Session;
pub use subtitle::DialogueEntry;
