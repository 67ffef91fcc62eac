//! Vault file system access
//!
//! Snapshot files are addressed by vault-relative paths with `/` separators,
//! the form they take inside embed markup. `LocalFs` maps them onto a root
//! directory on disk.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::Result;

/// A file found by a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Vault-relative path
    pub path: String,
    /// Creation time, or modification time where the platform has none
    pub created: DateTime<Utc>,
}

impl FileEntry {
    /// Last path component
    pub fn name(&self) -> &str {
        file_name(&self.path)
    }
}

/// Last component of a vault-relative path
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Join vault-relative path components
pub fn join(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

/// File system operations the bridge needs from the host
#[allow(async_fn_in_trait)]
pub trait VaultFs {
    async fn exists(&self, path: &str) -> Result<bool>;

    async fn create_dir_all(&self, path: &str) -> Result<()>;

    /// Files directly inside `dir`, sorted by path. A missing directory
    /// lists as empty.
    async fn list(&self, dir: &str) -> Result<Vec<FileEntry>>;

    async fn rename(&self, from: &str, to: &str) -> Result<()>;

    /// Files in `dir` whose name starts with `prefix`
    async fn list_with_prefix(&self, dir: &str, prefix: &str) -> Result<Vec<FileEntry>> {
        let mut files = self.list(dir).await?;
        files.retain(|f| f.name().starts_with(prefix));
        Ok(files)
    }

    /// Files in `dir` created inside `[after, before]`
    async fn list_created_between(
        &self,
        dir: &str,
        after: DateTime<Utc>,
        before: DateTime<Utc>,
    ) -> Result<Vec<FileEntry>> {
        let mut files = self.list(dir).await?;
        files.retain(|f| f.created >= after && f.created <= before);
        Ok(files)
    }
}

/// Vault on the local disk
#[derive(Debug, Clone)]
pub struct LocalFs {
    root: PathBuf,
}

impl LocalFs {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        path.split('/')
            .filter(|c| !c.is_empty())
            .fold(self.root.clone(), |p, c| p.join(c))
    }
}

impl VaultFs for LocalFs {
    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.resolve(path)).await?)
    }

    async fn create_dir_all(&self, path: &str) -> Result<()> {
        tokio::fs::create_dir_all(self.resolve(path)).await?;
        Ok(())
    }

    async fn list(&self, dir: &str) -> Result<Vec<FileEntry>> {
        let mut reader = match tokio::fs::read_dir(self.resolve(dir)).await {
            Ok(r) => r,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                tracing::debug!("Skipping non UTF-8 file name {:?}", entry.file_name());
                continue;
            };
            let created = metadata.created().or_else(|_| metadata.modified())?;
            files.push(FileEntry {
                path: join(dir, &name),
                created: DateTime::<Utc>::from(created),
            });
        }
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        tracing::debug!("Renaming {} -> {}", from, to);
        tokio::fs::rename(self.resolve(from), self.resolve(to)).await?;
        Ok(())
    }
}
