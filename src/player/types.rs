//! Player HTTP interface response types

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Playback state reported by the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Playing,
    Paused,
    #[default]
    Stopped,
}

/// Track metadata, keyed by stream category ("meta", "Stream 0", ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Information {
    #[serde(default)]
    pub category: HashMap<String, HashMap<String, serde_json::Value>>,
}

/// `status.json` response. Only the fields the bridge reads are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PlayerStatus {
    #[serde(default)]
    pub state: PlaybackState,

    /// Position as a fraction of the media, 0..1
    #[serde(default)]
    pub position: f64,

    /// Media length in whole seconds, truncated
    #[serde(default)]
    pub length: i64,

    /// Current time in whole seconds
    #[serde(default)]
    pub time: i64,

    /// Playlist id of the current item, -1 when nothing is loaded
    #[serde(default)]
    pub currentplid: i64,

    /// Subtitle delay in seconds
    #[serde(default)]
    pub subtitledelay: f64,

    #[serde(default)]
    pub information: Option<Information>,
}

impl PlayerStatus {
    pub fn is_stopped(&self) -> bool {
        self.state == PlaybackState::Stopped
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// Names of the stream categories, "meta" included
    pub fn stream_categories(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .information
            .iter()
            .flat_map(|i| i.category.keys().map(String::as_str))
            .collect();
        names.sort_unstable();
        names
    }

    /// Number of real streams (audio, video, subtitle tracks)
    pub fn stream_count(&self) -> usize {
        self.stream_categories()
            .iter()
            .filter(|c| **c != "meta")
            .count()
    }
}

/// A node of `playlist.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PlaylistNode {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub uri: Option<String>,

    /// Present (as "current") on the item being played
    #[serde(default)]
    pub current: Option<String>,

    #[serde(default)]
    pub duration: Option<i64>,

    #[serde(default)]
    pub children: Vec<PlaylistNode>,
}

/// Compare a playlist URI with a media path or URI
pub fn same_media(uri: &str, media: &str) -> bool {
    normalize_media(uri) == normalize_media(media)
}

/// Only `file://` URIs are percent-decoded; a plain path is taken as is.
fn normalize_media(s: &str) -> String {
    let path = match s.strip_prefix("file://") {
        Some(rest) => urlencoding::decode(rest)
            .map(|d| d.into_owned())
            .unwrap_or_else(|_| rest.to_string()),
        None => s.to_string(),
    };
    path.trim_start_matches('/').replace('\\', "/")
}

impl PlaylistNode {
    /// Items of the playlist proper (the first child of the root)
    pub fn items(&self) -> &[PlaylistNode] {
        self.children
            .first()
            .map(|p| p.children.as_slice())
            .unwrap_or(&[])
    }

    /// The item being played
    pub fn current_item(&self) -> Option<&PlaylistNode> {
        self.items().iter().find(|i| i.current.is_some())
    }

    /// URI of the item being played
    pub fn current_uri(&self) -> Option<&str> {
        self.current_item().and_then(|i| i.uri.as_deref())
    }

    /// Find a media file: the current item if it is that file, otherwise the
    /// last playlist entry for it.
    pub fn find_media(&self, media: &str) -> Option<&PlaylistNode> {
        if let Some(current) = self.current_item() {
            if current.uri.as_deref().is_some_and(|u| same_media(u, media)) {
                return Some(current);
            }
        }
        self.items()
            .iter()
            .rev()
            .find(|i| i.uri.as_deref().is_some_and(|u| same_media(u, media)))
    }
}
