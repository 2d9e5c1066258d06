// File-based Persistence Sink
// Appends each created page as one JSON line to a file.
// Designed to be wrapped with TracedSink.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::contracts::{Page, PersistenceSink};
use crate::validation::PersistenceError;
use crate::wrappers::TracedSink;

/// Append-only JSON lines sink
pub struct JsonLinesSink {
    path: PathBuf,
    file: Mutex<fs::File>,
}

impl JsonLinesSink {
    /// Open (or create) the log at `path`, creating parent directories
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("Failed to open page log: {}", path.display()))?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every page persisted at `path`
    pub async fn read_all(path: impl AsRef<Path>) -> Result<Vec<Page>> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read page log: {}", path.display()))?;
        raw.lines()
            .filter(|line| !line.trim().is_empty())
            .enumerate()
            .map(|(n, line)| {
                serde_json::from_str(line)
                    .with_context(|| format!("Corrupt page record at line {}", n + 1))
            })
            .collect()
    }
}

#[async_trait]
impl PersistenceSink for JsonLinesSink {
    async fn add(&self, page: &Page) -> Result<(), PersistenceError> {
        let mut line = serde_json::to_vec(page)?;
        line.push(b'\n');

        let mut file = self.file.lock().await;
        file.write_all(&line).await?;
        file.sync_data().await?;
        Ok(())
    }
}

/// Open a JSON lines sink already wrapped with tracing
pub async fn create_file_sink(path: impl AsRef<Path>) -> Result<TracedSink<JsonLinesSink>> {
    Ok(TracedSink::new(JsonLinesSink::open(path).await?))
}
