//! Snapshot naming and reuse
//!
//! A snapshot the bridge has claimed is stored as
//! `<folder>/<name>/snapshot-<name>-<HH>h<MM>m<SS>s<mmm>.<ext>`, where `<name>`
//! is the sanitized media file stem. The timestamp in the file name is the
//! only record of which frame the image shows, so this format must never
//! change.

use std::path::Path;

use crate::error::Result;
use crate::fs::{join, FileEntry, VaultFs};

/// Replace square brackets with full-width look-alikes so the editor does
/// not read the name as a wiki link. Applied to every path we build, for
/// writing and matching alike.
pub fn sanitize_filename(name: &str) -> String {
    name.replace('[', "［").replace(']', "］")
}

/// Encode milliseconds as `HHhMMmSSsmmm`
pub fn encode_snapshot_timestamp(ms: i64) -> String {
    let ms = ms.max(0);
    format!(
        "{:02}h{:02}m{:02}s{:03}",
        ms / 3_600_000,
        (ms / 60_000) % 60,
        (ms / 1000) % 60,
        ms % 1000
    )
}

/// Decode a `HHhMMmSSsmmm` timestamp
pub fn decode_snapshot_timestamp(s: &str) -> Option<i64> {
    let caps = regex!(r"^(\d{2,})h(\d{2})m(\d{2})s(\d{3})$").captures(s)?;
    let hours: i64 = caps[1].parse().ok()?;
    let minutes: i64 = caps[2].parse().ok()?;
    let seconds: i64 = caps[3].parse().ok()?;
    let millis: i64 = caps[4].parse().ok()?;
    if minutes >= 60 || seconds >= 60 {
        return None;
    }
    Some(((hours * 60 + minutes) * 60 + seconds) * 1000 + millis)
}

/// Timestamp embedded in a snapshot file name (with or without extension)
pub fn timestamp_from_file_name(file_name: &str) -> Option<i64> {
    let caps = regex!(r"^snapshot-.*-(\d{2,}h\d{2}m\d{2}s\d{3})(?:\.[^.]*)?$").captures(file_name)?;
    decode_snapshot_timestamp(&caps[1])
}

/// Embed markup for a vault-relative image path
pub fn embed_markup(path: &str) -> String {
    format!("![[{}]]", path)
}

/// Where snapshots of one media file live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotPaths {
    folder: String,
    name: String,
}

impl SnapshotPaths {
    /// `folder` is the vault-relative snapshot folder, `media_name` the media
    /// file name before sanitizing.
    pub fn new(folder: &str, media_name: &str) -> Self {
        Self {
            folder: folder.trim_end_matches('/').to_string(),
            name: sanitize_filename(media_name),
        }
    }

    /// Paths for a media file, named after its file stem
    pub fn for_media(folder: &str, media_path: &str) -> Self {
        let stem = Path::new(media_path)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(media_path);
        Self::new(folder, stem)
    }

    /// Folder the player writes new snapshots into
    pub fn folder(&self) -> &str {
        &self.folder
    }

    /// Sanitized media name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Folder holding the claimed snapshots of this media
    pub fn media_dir(&self) -> String {
        join(&self.folder, &self.name)
    }

    /// File name without extension for a timestamp
    pub fn file_stem(&self, ms: i64) -> String {
        format!("snapshot-{}-{}", self.name, encode_snapshot_timestamp(ms))
    }

    /// Canonical vault-relative path for a timestamp
    pub fn path(&self, ms: i64, ext: &str) -> String {
        join(&self.media_dir(), &format!("{}.{}", self.file_stem(ms), ext))
    }
}

/// A snapshot already on disk that can be embedded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotMatch {
    pub path: String,
    pub timestamp_ms: i64,
    pub embed: String,
}

impl SnapshotMatch {
    fn from_entry(file: FileEntry, timestamp_ms: i64) -> Self {
        let embed = embed_markup(&file.path);
        Self {
            path: file.path,
            timestamp_ms,
            embed,
        }
    }
}

/// Find a snapshot taken at exactly `ms`, whatever its extension
pub async fn find_exact<F: VaultFs>(fs: &F, paths: &SnapshotPaths, ms: i64) -> Result<Vec<SnapshotMatch>> {
    let prefix = format!("{}.", paths.file_stem(ms));
    let files = fs.list_with_prefix(&paths.media_dir(), &prefix).await?;
    Ok(files
        .into_iter()
        .take(1)
        .map(|f| SnapshotMatch::from_entry(f, ms))
        .collect())
}

/// Every snapshot of this media with a timestamp in `[from, to)`, oldest first
pub async fn find_in_range<F: VaultFs>(
    fs: &F,
    paths: &SnapshotPaths,
    from: i64,
    to: i64,
) -> Result<Vec<SnapshotMatch>> {
    let prefix = format!("snapshot-{}-", paths.name());
    let mut found: Vec<SnapshotMatch> = fs
        .list_with_prefix(&paths.media_dir(), &prefix)
        .await?
        .into_iter()
        .filter_map(|f| {
            let ts = timestamp_from_file_name(f.name())?;
            (ts >= from && ts < to).then(|| SnapshotMatch::from_entry(f, ts))
        })
        .collect();
    found.sort_by_key(|m| m.timestamp_ms);
    Ok(found)
}

/// Existing snapshots usable for a dialogue entry. With `range` set, every
/// snapshot in it is returned; otherwise only one taken at exactly `target_ms`.
pub async fn find_existing<F: VaultFs>(
    fs: &F,
    paths: &SnapshotPaths,
    target_ms: i64,
    range: Option<(i64, i64)>,
) -> Result<Vec<SnapshotMatch>> {
    let found = match range {
        Some((from, to)) => find_in_range(fs, paths, from, to).await?,
        None => find_exact(fs, paths, target_ms).await?,
    };
    if !found.is_empty() {
        tracing::debug!("Reusing {} snapshot(s) for {}ms", found.len(), target_ms);
    }
    Ok(found)
}
