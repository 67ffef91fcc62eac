//! Subtitle parsing module
//!
//! This module turns subtitle files into ordered dialogue entries:
//! - SubRip and WebVTT cue blocks (index, start --> end, text)
//! - Advanced SubStation `[Events]` dialogue lines, with override tags,
//!   drawings and line-break escapes cleaned up
//! - Format detection by file extension

pub mod ass;
pub mod cue;
pub mod parser;
pub mod types;

pub use parser::{parse_file, parse_str};
pub use types::{DialogueEntry, SubtitleFormat};
