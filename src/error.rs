use thiserror::Error;

/// Main error type for the bridge
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The subtitle file extension is not one of the supported formats
    #[error("Unsupported subtitle extension: {0}")]
    UnsupportedSubtitleFormat(String),

    /// The subtitle file could be read but its content is malformed
    #[error("Subtitle parse error: {0}")]
    SubtitleParse(String),

    /// The player's HTTP interface could not be reached
    #[error("Could not connect to VLC Player: {0}")]
    PlayerUnreachable(String),

    /// The player answered but has no active media to work with
    #[error("No video is currently playing")]
    PlayerNotReady,

    /// The media loaded in the player is not the one the operation targets
    #[error("Different media is playing: expected {expected}, playing {playing}")]
    DifferentMediaPlaying { expected: String, playing: String },

    /// A snapshot was requested but no file showed up within the retry budget
    #[error("Snapshot not found, if you changed the snapshot folder, try restarting VLC")]
    SnapshotNotFound,

    /// A user supplied timestamp does not match any accepted encoding
    #[error("Invalid timestamp: {0}")]
    TimestampInvalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl BridgeError {
    /// Only a missed snapshot is worth another capture cycle.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BridgeError::SnapshotNotFound)
    }
}

impl From<reqwest::Error> for BridgeError {
    fn from(e: reqwest::Error) -> Self {
        BridgeError::PlayerUnreachable(e.to_string())
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, BridgeError>;
