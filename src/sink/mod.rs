//! Output sinks
//!
//! A sink persists one record per source file under a destination root, at a
//! location derived only from the file's relative path. The record carries the
//! `source_checksum` the incremental cache reads back on the next run.

pub mod json;
pub mod text;

pub use json::JsonSink;
pub use text::TextSink;

use crate::chunk::Chunk;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// What a sink persists for one file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub source_checksum: String,
    pub file_path: String,
    pub chunks: Vec<Chunk>,
}

/// Trait for output sinks
///
/// Implementations must tolerate concurrent calls for different files. They
/// are never asked to write the same file concurrently.
pub trait ChunkSink: Send + Sync {
    /// Short format name (for display)
    fn format_name(&self) -> &str;

    /// Root directory records are written under
    fn destination(&self) -> &Path;

    /// Deterministic record location for a relative source path
    fn record_path(&self, file_path: &str) -> PathBuf;

    /// Persist a record, replacing any previous one for the same file
    fn write(&self, record: &CacheRecord) -> Result<()>;

    /// Read back the checksum of the persisted record, `None` if there is none
    fn read_checksum(&self, file_path: &str) -> Result<Option<String>>;
}

/// Supported output formats
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Text,
}

impl OutputFormat {
    /// Create the sink for this format rooted at `destination`
    pub fn create_sink(&self, destination: &Path) -> Arc<dyn ChunkSink> {
        match self {
            OutputFormat::Json => Arc::new(JsonSink::new(destination)),
            OutputFormat::Text => Arc::new(TextSink::new(destination)),
        }
    }
}

/// Make sure records can be written under `destination`.
///
/// Called before any work starts; failure here is a configuration error.
pub fn ensure_writable(destination: &Path) -> Result<()> {
    std::fs::create_dir_all(destination).map_err(|e| {
        Error::Config(format!("cannot create output directory {}: {}", destination.display(), e))
    })?;

    let check = destination.join(".codechunk-write-check");
    std::fs::write(&check, b"ok").map_err(|e| {
        Error::Config(format!("output directory {} is not writable: {}", destination.display(), e))
    })?;
    std::fs::remove_file(&check).ok();
    Ok(())
}

/// `destination/<file_path><suffix>`, keeping only normal path components
pub(crate) fn record_location(destination: &Path, file_path: &str, suffix: &str) -> PathBuf {
    let mut path = destination.to_path_buf();
    for component in Path::new(file_path).components() {
        if let Component::Normal(part) = component {
            path.push(part);
        }
    }
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(suffix);
    path.set_file_name(name);
    path
}

/// Write through a temporary sibling and rename, so readers never see half a record
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut tmp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    std::fs::write(&tmp, contents)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
