//! JSON sink: one pretty-printed [`CacheRecord`] per source file

use super::{record_location, write_atomic, CacheRecord, ChunkSink};
use crate::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const SUFFIX: &str = ".json";

pub struct JsonSink {
    destination: PathBuf,
}

/// The part of a record the cache needs; the rest is not parsed
#[derive(Deserialize)]
struct RecordHeader {
    source_checksum: String,
}

impl JsonSink {
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
        }
    }

    /// Load a full record back (used by tooling and tests)
    pub fn read_record(&self, file_path: &str) -> Result<CacheRecord> {
        let data = std::fs::read_to_string(self.record_path(file_path))?;
        Ok(serde_json::from_str(&data)?)
    }
}

impl ChunkSink for JsonSink {
    fn format_name(&self) -> &str {
        "json"
    }

    fn destination(&self) -> &Path {
        &self.destination
    }

    fn record_path(&self, file_path: &str) -> PathBuf {
        record_location(&self.destination, file_path, SUFFIX)
    }

    fn write(&self, record: &CacheRecord) -> Result<()> {
        let data = serde_json::to_vec_pretty(record)?;
        write_atomic(&self.record_path(&record.file_path), &data)
    }

    fn read_checksum(&self, file_path: &str) -> Result<Option<String>> {
        let data = match std::fs::read_to_string(self.record_path(file_path)) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let header: RecordHeader = serde_json::from_str(&data)?;
        Ok(Some(header.source_checksum))
    }
}
