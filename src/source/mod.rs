pub mod timestamp;

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

pub use timestamp::{TimestampError, TimestampFormat};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read log source: {0}")]
    Io(#[from] std::io::Error),
}

/// Read access to the append-only queue event log.
///
/// The engine re-scans the full log on every recomputation, so a source only
/// has to hand back its current contents. Implementations back onto a file in
/// production and onto in-memory strings in tests.
#[async_trait]
pub trait LogSource: Send + Sync {
    async fn read_all(&self) -> Result<String, SourceError>;
}

/// Log source reading a queue_log file from disk.
pub struct FileLogSource {
    path: PathBuf,
}

impl FileLogSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl LogSource for FileLogSource {
    async fn read_all(&self) -> Result<String, SourceError> {
        Ok(tokio::fs::read_to_string(&self.path).await?)
    }
}
