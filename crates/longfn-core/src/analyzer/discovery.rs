use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::future::{self, BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::warn;

use super::{AnalyzeError, SourceDiscovery};

/// Filter describing which files belong to the working set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// A file qualifies when its name ends in one of these.
    pub source_extensions: Vec<String>,
    /// Test-style suffixes excluded even when the extension matches.
    pub excluded_suffixes: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            source_extensions: vec![".ts".to_string()],
            excluded_suffixes: vec![".spec.ts".to_string(), ".spec.tsx".to_string()],
        }
    }
}

impl DiscoveryConfig {
    pub fn should_analyze(&self, path: &Path) -> bool {
        let path = path.to_string_lossy();
        self.source_extensions
            .iter()
            .any(|extension| path.ends_with(extension.as_str()))
            && !self
                .excluded_suffixes
                .iter()
                .any(|suffix| path.ends_with(suffix.as_str()))
    }
}

/// Filesystem-backed discovery: checks the target exists, then resolves it to
/// the flat list of qualifying files.
pub struct FileSourceDiscovery {
    config: DiscoveryConfig,
}

impl FileSourceDiscovery {
    pub fn new(config: DiscoveryConfig) -> Self {
        Self { config }
    }

    /// Enumerate a directory recursively. Each entry gets its own future and
    /// the batch is awaited collectively; completion order is irrelevant
    /// because the merged list is re-sorted downstream. Unreadable subtrees
    /// are skipped with a warning rather than failing the run.
    fn collect_dir(&self, dir: PathBuf) -> BoxFuture<'_, Result<Vec<PathBuf>>> {
        async move {
            let mut reader = match fs::read_dir(&dir).await {
                Ok(reader) => reader,
                Err(err) => {
                    warn!(dir = %dir.display(), %err, "skipping unreadable directory");
                    return Ok(Vec::new());
                }
            };

            let mut entries = Vec::new();
            loop {
                match reader.next_entry().await {
                    Ok(Some(entry)) => entries.push(entry),
                    Ok(None) => break,
                    Err(err) => {
                        warn!(dir = %dir.display(), %err, "skipping unreadable directory entry");
                        break;
                    }
                }
            }

            let pending = entries.into_iter().map(|entry| self.collect_entry(entry));
            let nested = future::try_join_all(pending).await?;
            Ok(nested.into_iter().flatten().collect())
        }
        .boxed()
    }

    async fn collect_entry(&self, entry: fs::DirEntry) -> Result<Vec<PathBuf>> {
        let path = entry.path();
        let file_type = match entry.file_type().await {
            Ok(file_type) => file_type,
            Err(err) => {
                warn!(path = %path.display(), %err, "skipping unreadable entry");
                return Ok(Vec::new());
            }
        };
        if file_type.is_dir() {
            self.collect_dir(path).await
        } else if self.config.should_analyze(&path) {
            Ok(vec![path])
        } else {
            Ok(Vec::new())
        }
    }
}

impl Default for FileSourceDiscovery {
    fn default() -> Self {
        Self::new(DiscoveryConfig::default())
    }
}

#[async_trait]
impl SourceDiscovery for FileSourceDiscovery {
    async fn collect(&self, target: &Path) -> Result<Vec<PathBuf>> {
        let metadata = match fs::metadata(target).await {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(AnalyzeError::PathNotFound(target.to_path_buf()).into());
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to inspect {}", target.display()));
            }
        };

        if metadata.is_dir() {
            self.collect_dir(target.to_path_buf()).await
        } else if self.config.should_analyze(target) {
            Ok(vec![target.to_path_buf()])
        } else {
            Ok(Vec::new())
        }
    }
}
