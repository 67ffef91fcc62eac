//! Timeline mapping
//!
//! Three clocks meet here: dialogue times in milliseconds, the player's
//! position as a 0..1 fraction of the media, and the percentage strings the
//! player's seek command accepts. Everything in this module is pure.

use crate::error::{BridgeError, Result};
use crate::subtitle::DialogueEntry;

/// Fraction of the media a millisecond offset corresponds to
pub fn position_fraction(ms: i64, duration_ms: i64) -> f64 {
    if duration_ms <= 0 {
        return 0.0;
    }
    ms as f64 / duration_ms as f64
}

/// Millisecond offset of a position fraction
pub fn ms_from_fraction(fraction: f64, duration_ms: i64) -> i64 {
    (fraction * duration_ms as f64).round() as i64
}

/// Index of the dialogue showing at `position_ms`: the last entry whose start
/// is not after the position. `None` before the first entry.
pub fn current_index(entries: &[DialogueEntry], position_ms: i64) -> Option<usize> {
    // Entries are sorted by start, so this is the last one with from <= pos.
    let after = entries.partition_point(|e| e.from <= position_ms);
    after.checked_sub(1)
}

/// The dialogue showing at `position_ms`
pub fn current_entry(entries: &[DialogueEntry], position_ms: i64) -> Option<&DialogueEntry> {
    current_index(entries, position_ms).map(|i| &entries[i])
}

/// Index of the first entry of a "from here on" transcript.
///
/// The boundary is the last entry that has started at `fraction` and whose
/// successor (if any) ends after it. A position before the first dialogue
/// keeps the whole transcript.
pub fn boundary_index(entries: &[DialogueEntry], fraction: f64, duration_ms: i64) -> usize {
    let frac = |ms: i64| position_fraction(ms, duration_ms);
    entries
        .iter()
        .enumerate()
        .rev()
        .find(|(i, e)| {
            frac(e.from) <= fraction
                && entries
                    .get(i + 1)
                    .map_or(true, |next| frac(next.to) > fraction)
        })
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// The current entry and everything after it
pub fn filter_from_position(
    entries: &[DialogueEntry],
    fraction: f64,
    duration_ms: i64,
) -> &[DialogueEntry] {
    &entries[boundary_index(entries, fraction, duration_ms)..]
}

/// Format a percentage for the player. Rust never prints floats in exponent
/// form with `{:.N}`, which the player's query parser would choke on; trailing
/// zeros are trimmed to keep links short.
pub fn format_percent(percent: f64) -> String {
    if !percent.is_finite() {
        return "0".to_string();
    }
    let clamped = percent.clamp(0.0, 100.0);
    let s = format!("{:.6}", clamped);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s.is_empty() || s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

/// Percentage seek value (e.g. `"12.5%"`) for a millisecond offset. The `%` is
/// not encoded here; query building encodes it exactly once.
pub fn percent_seek_value(ms: i64, duration_ms: i64) -> String {
    format!("{}%", format_percent(position_fraction(ms, duration_ms) * 100.0))
}

/// Display forms of a millisecond offset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampParts {
    /// `HH:MM:SS.mmm`
    pub full: String,
    /// `MM:SS.mmm` under an hour, otherwise the full form
    pub simplified: String,
    /// `simplified` without the milliseconds
    pub simplified_without_ms: String,
    pub hh: String,
    pub mm: String,
    pub ss: String,
    pub ms: String,
}

/// Split a millisecond offset into its display forms
pub fn ms_to_timestamp(milliseconds: i64) -> TimestampParts {
    let total = milliseconds.max(0);
    let hours = total / 3_600_000;
    let minutes = (total / 60_000) % 60;
    let seconds = (total / 1000) % 60;
    let millis = total % 1000;

    let hh = format!("{:02}", hours);
    let mm = format!("{:02}", minutes);
    let ss = format!("{:02}", seconds);
    let ms = format!("{:03}", millis);
    let full = format!("{}:{}:{}.{}", hh, mm, ss, ms);
    let simplified = if total < 3_600_000 {
        format!("{}:{}.{}", mm, ss, ms)
    } else {
        full.clone()
    };
    let simplified_without_ms = simplified
        .rsplit_once('.')
        .map(|(head, _)| head.to_string())
        .unwrap_or_else(|| simplified.clone());

    TimestampParts {
        full,
        simplified,
        simplified_without_ms,
        hh,
        mm,
        ss,
        ms,
    }
}

/// `MM:SS` under an hour, `HH:MM:SS` otherwise
pub fn seconds_to_timestamp(seconds: i64) -> String {
    let s = seconds.max(0);
    if s < 3600 {
        format!("{:02}:{:02}", s / 60, s % 60)
    } else {
        format!("{:02}:{:02}:{:02}", s / 3600, (s / 60) % 60, s % 60)
    }
}

/// A seek target given by a user or a link
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Timestamp {
    /// Absolute offset in seconds
    Seconds(f64),
    /// Percentage of the media, 0..=100
    Percent(f64),
}

impl Timestamp {
    /// Value for the player's `seek&val=` command, unencoded
    pub fn seek_value(&self) -> String {
        match self {
            Timestamp::Seconds(s) => {
                let v = format!("{:.3}", s);
                v.trim_end_matches('0').trim_end_matches('.').to_string()
            }
            Timestamp::Percent(p) => format!("{}%", format_percent(*p)),
        }
    }
}

/// Parse a timestamp: `N%`, plain seconds, `MM:SS` or `HH:MM:SS(.mmm)`
pub fn parse_timestamp(s: &str) -> Result<Timestamp> {
    let invalid = || BridgeError::TimestampInvalid(s.to_string());
    let t = s.trim();

    if let Some(p) = t.strip_suffix('%') {
        let p: f64 = p.trim().parse().map_err(|_| invalid())?;
        if !(0.0..=100.0).contains(&p) {
            return Err(invalid());
        }
        return Ok(Timestamp::Percent(p));
    }

    if let Some(caps) = regex!(r"^(?:(\d+):)?(\d{1,2}):(\d{1,2}(?:\.\d+)?)$").captures(t) {
        let hours: f64 = caps.get(1).map_or(Ok(0.0), |m| m.as_str().parse()).map_err(|_| invalid())?;
        let minutes: f64 = caps[2].parse().map_err(|_| invalid())?;
        let seconds: f64 = caps[3].parse().map_err(|_| invalid())?;
        if minutes >= 60.0 || seconds >= 60.0 {
            return Err(invalid());
        }
        return Ok(Timestamp::Seconds(hours * 3600.0 + minutes * 60.0 + seconds));
    }

    if regex!(r"^\d+(?:\.\d+)?$").is_match(t) {
        return t.parse().map(Timestamp::Seconds).map_err(|_| invalid());
    }

    Err(invalid())
}
