//! Provenance metadata for chunks
//!
//! Providers attach version-control facts about a file to its top-level
//! chunks. Absence of provenance never blocks processing.

use crate::chunk::Metadata;
use std::path::Path;
use std::process::Command;

/// Supplies per-file metadata that is merged verbatim into chunk metadata
pub trait ProvenanceProvider: Send {
    fn metadata(&self, file_path: &Path) -> Option<Metadata>;
}

/// Last-commit authorship from `git log`
#[derive(Debug, Default, Clone, Copy)]
pub struct GitProvenance;

impl GitProvenance {
    pub fn new() -> Self {
        Self
    }
}

impl ProvenanceProvider for GitProvenance {
    fn metadata(&self, file_path: &Path) -> Option<Metadata> {
        if !file_path.exists() {
            return None;
        }

        let absolute = std::path::absolute(file_path).ok()?;
        let directory = absolute.parent()?;
        let file_name = absolute.file_name()?;

        let output = Command::new("git")
            .arg("log")
            .arg("-1")
            .arg("--format=%H|%an|%at")
            .arg("--")
            .arg(file_name)
            .current_dir(directory)
            .output()
            .ok()?;

        if !output.status.success() {
            return None;
        }

        parse_log_line(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse `hash|author|timestamp`
fn parse_log_line(line: &str) -> Option<Metadata> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let mut parts = line.splitn(3, '|');
    let hash = parts.next()?;
    let author = parts.next()?;
    let timestamp = parts.next()?;

    let mut metadata = Metadata::new();
    metadata.insert("commit_hash".into(), hash.into());
    metadata.insert("author_name".into(), author.into());
    metadata.insert("timestamp".into(), timestamp.into());
    Some(metadata)
}
