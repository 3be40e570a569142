//! Incremental cache
//!
//! A file is skipped when the sink already holds a record for it whose
//! `source_checksum` equals the BLAKE3 hash of the file's current bytes.
//! Timestamps are never consulted. The cache only reads from the sink.

use crate::sink::ChunkSink;
use std::sync::Arc;

/// Content checksum used as the sole staleness signal (lowercase hex BLAKE3)
pub fn checksum(content: &[u8]) -> String {
    blake3::hash(content).to_hex().to_string()
}

#[derive(Clone)]
pub struct IncrementalCache {
    sink: Arc<dyn ChunkSink>,
    force: bool,
}

impl IncrementalCache {
    pub fn new(sink: Arc<dyn ChunkSink>) -> Self {
        Self { sink, force: false }
    }

    /// Always report a miss, so every file is reprocessed
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Decide whether `file_path` can be skipped.
    ///
    /// Missing, unreadable or malformed records and mismatched checksums all
    /// mean reprocessing; lookup errors never propagate.
    pub fn should_skip(&self, file_path: &str, current_checksum: &str) -> bool {
        if self.force {
            return false;
        }

        match self.sink.read_checksum(file_path) {
            Ok(Some(stored)) if stored == current_checksum => {
                tracing::debug!("Cache hit: {}", file_path);
                true
            }
            Ok(Some(_)) => {
                tracing::debug!("Cache stale: {}", file_path);
                false
            }
            Ok(None) => {
                tracing::debug!("Cache miss: {}", file_path);
                false
            }
            Err(e) => {
                tracing::debug!("Cache lookup failed for {}: {}", file_path, e);
                false
            }
        }
    }
}
