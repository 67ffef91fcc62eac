//! End-to-end integration tests
//!
//! Each scenario runs a whole operation against the scripted player and the
//! in-memory vault and reports what went wrong instead of panicking, so a
//! single test can list every mismatch.

use std::time::Instant;

use crate::batch::{BatchOutcome, CancelFlag};
use crate::config::{BridgeConfig, TranscriptConfig, DEFAULT_TEMPLATE};
use crate::integration::fixtures::{numbered_entries, FakePlayer, MemoryFs, SAMPLE_SRT};
use crate::session::Session;
use crate::subtitle::{parse_str, DialogueEntry, SubtitleFormat};
use crate::template::LinkParams;
use crate::transcript::Transcript;

const MEDIA: &str = "/videos/Movie.mkv";

/// Outcome of a scenario
#[derive(Debug, Default)]
pub struct ScenarioResult {
    pub errors: Vec<String>,
}

impl ScenarioResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    fn check(&mut self, ok: bool, what: impl Into<String>) {
        if !ok {
            self.errors.push(what.into());
        }
    }
}

fn session(length_ms: i64) -> Session<FakePlayer, MemoryFs> {
    let fs = MemoryFs::new();
    let player = FakePlayer::new(MEDIA, length_ms).with_snapshots(&fs, "vlcSnapshots", "image");
    Session::new(BridgeConfig::default(), player, fs)
}

fn transcript(entries: Vec<DialogueEntry>, length_secs: f64, template: &str) -> Transcript {
    let config = TranscriptConfig {
        template: template.to_string(),
        wrap_text: false,
        separator: "\n\n".to_string(),
        ..Default::default()
    };
    Transcript::from_entries(entries, LinkParams::new(MEDIA), length_secs, &config)
}

/// Two entries through the default template, copied without snapshots
pub fn test_transcript_copy() -> ScenarioResult {
    let mut result = ScenarioResult::default();
    let entries = vec![
        DialogueEntry::new("1", 0, 2000, "Hello"),
        DialogueEntry::new("2", 2000, 4000, "World"),
    ];
    let t = transcript(entries, 4.0, DEFAULT_TEMPLATE);

    let link = |pct: &str| {
        format!(
            "obsidian://vlcBridge?mediaPath=%2Fvideos%2FMovie.mkv&timestamp={}%25",
            pct
        )
    };
    let expected = format!(
        "1. [00:00:00.000]({}) >> [00:00:02.000]({})\nHello\n\n2. [00:00:02.000]({}) >> [00:00:04.000]({})\nWorld",
        link("0"),
        link("50"),
        link("50"),
        link("100"),
    );

    match t.copy(&[0, 1]) {
        crate::transcript::CopyRequest::Ready(text) => {
            result.check(text == expected, format!("unexpected copy:\n{}", text))
        }
        crate::transcript::CopyRequest::NeedsSnapshots(_) => {
            result.check(false, "default template asked for snapshots")
        }
    }
    result
}

/// Parse a subtitle, snapshot every entry, then run the same batch again and
/// expect every snapshot to be reused
pub async fn test_snapshot_lifecycle() -> ScenarioResult {
    let mut result = ScenarioResult::default();
    let s = session(4000);
    let entries = match parse_str(SAMPLE_SRT, SubtitleFormat::SubRip) {
        Ok(entries) => entries,
        Err(e) => {
            result.check(false, format!("parse failed: {}", e));
            return result;
        }
    };
    let t = transcript(entries, 4.0, "{{index}}. {{text}}\n{{snapshot}}");
    let all: Vec<usize> = (0..t.len()).collect();

    let first = s.snapshots(&t, &all, &CancelFlag::new(), |_| {}).await;
    result.check(first.is_completed(), format!("first batch: {:?}", first.outcome));
    result.check(first.captured == 2, format!("captured {}", first.captured));
    for stamp in ["00h00m00s000", "00h00m02s000"] {
        let path = format!("vlcSnapshots/Movie/snapshot-Movie-{}.png", stamp);
        result.check(
            first.text.contains(&format!("![[{}]]", path)),
            format!("missing embed of {}", path),
        );
    }
    result.check(
        first.text.starts_with("1. Hello\n"),
        format!("unexpected text:\n{}", first.text),
    );

    let snapshots = s.player().count("snapshot");
    let second = s.snapshots(&t, &all, &CancelFlag::new(), |_| {}).await;
    result.check(second.reused == 2, format!("reused {}", second.reused));
    result.check(second.text == first.text, "second batch rendered differently");
    result.check(
        s.player().count("snapshot") == snapshots,
        "second batch captured again",
    );
    result
}

/// A second length lookup never reaches the player
pub async fn test_length_is_cached() -> ScenarioResult {
    let mut result = ScenarioResult::default();
    let s = session(90_000);
    let first = s.lengths().length(s.player(), MEDIA).await;
    let commands = s.player().command_count();
    let second = s.lengths().length(s.player(), MEDIA).await;

    match (first, second) {
        (Ok(a), Ok(b)) => {
            result.check((a - 90.0).abs() < 1e-9, format!("length {}", a));
            result.check(a == b, "lengths differ");
        }
        (a, b) => result.check(false, format!("lookup failed: {:?} {:?}", a.err(), b.err())),
    }
    result.check(s.player().command_count() == commands, "cache hit sent commands");
    result
}

/// A batch on media the player is not playing changes nothing
pub async fn test_batch_on_other_media() -> ScenarioResult {
    let mut result = ScenarioResult::default();
    let s = session(10_000);
    let config = TranscriptConfig {
        template: "{{text}} {{snapshot}}".to_string(),
        ..Default::default()
    };
    let t = Transcript::from_entries(
        numbered_entries(3),
        LinkParams::new("/videos/Other.mkv"),
        10.0,
        &config,
    );

    let report = s.snapshots(&t, &[0, 1, 2], &CancelFlag::new(), |_| {}).await;
    result.check(
        matches!(report.outcome, BatchOutcome::Failed(crate::BridgeError::DifferentMediaPlaying { .. })),
        format!("outcome {:?}", report.outcome),
    );
    result.check(s.player().command_count() == 0, "player was touched");
    result.check(s.fs().paths().is_empty(), "files were written");
    result
}

/// Formatting benchmark results
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    pub name: String,
    pub iterations: usize,
    pub total_ms: u128,
    pub avg_us: u128,
}

impl std::fmt::Display for BenchmarkResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} iterations, {}ms total, {}us avg",
            self.name, self.iterations, self.total_ms, self.avg_us
        )
    }
}

/// Render a 1000 entry transcript `iterations` times
pub fn benchmark_transcript_render(iterations: usize) -> BenchmarkResult {
    let entries = numbered_entries(1000);
    let config = TranscriptConfig::default();
    let start = Instant::now();
    for _ in 0..iterations {
        let t = Transcript::from_entries(entries.clone(), LinkParams::new(MEDIA), 1000.0, &config);
        std::hint::black_box(t.len());
    }
    let elapsed = start.elapsed();
    BenchmarkResult {
        name: "transcript_render".to_string(),
        iterations,
        total_ms: elapsed.as_millis(),
        avg_us: elapsed.as_micros() / iterations.max(1) as u128,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_copy_e2e() {
        let result = test_transcript_copy();
        assert!(result.is_ok(), "Transcript copy failed: {:?}", result.errors);
    }

    #[tokio::test]
    async fn test_snapshot_lifecycle_e2e() {
        let result = test_snapshot_lifecycle().await;
        assert!(result.is_ok(), "Snapshot lifecycle failed: {:?}", result.errors);
    }

    #[tokio::test]
    async fn test_length_is_cached_e2e() {
        let result = test_length_is_cached().await;
        assert!(result.is_ok(), "Length cache failed: {:?}", result.errors);
    }

    #[tokio::test]
    async fn test_batch_on_other_media_e2e() {
        let result = test_batch_on_other_media().await;
        assert!(result.is_ok(), "Other media batch failed: {:?}", result.errors);
    }

    #[test]
    fn test_benchmark_transcript_render() {
        let result = benchmark_transcript_render(5);
        println!("{}", result);
        assert!(result.total_ms < 5000, "Rendering too slow: {}", result);
    }
}
