//! Commands of the player's `status.json?command=` interface

use std::fmt;

/// A player command. Values are kept unencoded; `query` encodes them once.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `seek&val=`: absolute seconds (`90`), percentage (`12.5%`) or relative (`+5`, `-5`)
    Seek(String),
    /// Capture the current frame into the player's snapshot folder
    Snapshot,
    /// Toggle pause
    Pause,
    /// Pause, even if already paused
    ForcePause,
    /// Play a playlist item
    Play(String),
    /// Enqueue a file and play it
    InPlay(String),
    AddSubtitle(String),
    /// Select a subtitle track by index
    SubtitleTrack(usize),
    /// Subtitle delay in seconds
    SubDelay(f64),
}

impl Command {
    /// Command name as the player knows it
    pub fn name(&self) -> &'static str {
        match self {
            Command::Seek(_) => "seek",
            Command::Snapshot => "snapshot",
            Command::Pause => "pl_pause",
            Command::ForcePause => "pl_forcepause",
            Command::Play(_) => "pl_play",
            Command::InPlay(_) => "in_play",
            Command::AddSubtitle(_) => "addsubtitle",
            Command::SubtitleTrack(_) => "subtitle_track",
            Command::SubDelay(_) => "subdelay",
        }
    }

    /// Query string for `status.json`, e.g. `command=seek&val=12.5%25`
    pub fn query(&self) -> String {
        let arg = match self {
            Command::Seek(v) | Command::AddSubtitle(v) => Some(("val", v.clone())),
            Command::SubtitleTrack(i) => Some(("val", i.to_string())),
            Command::SubDelay(d) => Some(("val", d.to_string())),
            Command::Play(id) => Some(("id", id.clone())),
            Command::InPlay(input) => Some(("input", input.clone())),
            Command::Snapshot | Command::Pause | Command::ForcePause => None,
        };
        match arg {
            Some((key, value)) => format!(
                "command={}&{}={}",
                self.name(),
                key,
                urlencoding::encode(&value)
            ),
            None => format!("command={}", self.name()),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.query())
    }
}
