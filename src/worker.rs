//! Worker execution context
//!
//! Each worker owns one set of collaborators for its whole lifetime, so
//! grammars and descriptor memos are built once and reused across files.

use crate::adapter::{self, ParserRegistry};
use crate::builder::ChunkBuilder;
use crate::cache::{self, IncrementalCache};
use crate::chunk::{Chunk, Metadata};
use crate::deps::{self, DependencyResolver};
use crate::provenance::{GitProvenance, ProvenanceProvider};
use crate::status::StatusReporter;
use crate::{Error, Result};
use serde_json::json;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Long-lived per-worker collaborators
pub struct Collaborators {
    pub parsers: ParserRegistry,
    /// In process-wide priority order
    pub resolvers: Vec<Box<dyn DependencyResolver>>,
    pub provenance: Option<Box<dyn ProvenanceProvider>>,
}

impl Collaborators {
    pub fn new(parsers: ParserRegistry, resolvers: Vec<Box<dyn DependencyResolver>>) -> Self {
        Self {
            parsers,
            resolvers,
            provenance: None,
        }
    }

    pub fn with_provenance(mut self, provider: impl ProvenanceProvider + 'static) -> Self {
        self.provenance = Some(Box::new(provider));
        self
    }

    /// Built-in parsers and resolvers, plus git provenance when enabled
    pub fn standard(provenance: bool) -> Result<Self> {
        let collaborators = Self::new(adapter::default_registry()?, deps::default_resolvers());
        Ok(if provenance {
            collaborators.with_provenance(GitProvenance::new())
        } else {
            collaborators
        })
    }
}

/// Builds a fresh set of collaborators; called once per worker
pub type CollaboratorFactory = Arc<dyn Fn() -> Result<Collaborators> + Send + Sync>;

/// How a file ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Parsed and chunked; chunks are ready for the sink
    Processed,
    /// Record already current
    Cached,
    /// No parser for this extension
    Unsupported,
    Failed(String),
}

/// Result of processing one file
#[derive(Debug, Clone)]
pub struct FileResult {
    /// Path relative to the run root, `/`-separated
    pub file_path: String,
    pub checksum: Option<String>,
    /// Empty unless `outcome` is `Processed`
    pub chunks: Vec<Chunk>,
    pub outcome: FileOutcome,
}

impl FileResult {
    fn empty(file_path: String, outcome: FileOutcome) -> Self {
        Self {
            file_path,
            checksum: None,
            chunks: Vec::new(),
            outcome,
        }
    }

    pub(crate) fn failed(file_path: String, reason: impl Into<String>) -> Self {
        Self::empty(file_path, FileOutcome::Failed(reason.into()))
    }
}

/// Per-worker state passed into every call
pub struct WorkerContext {
    root: PathBuf,
    collaborators: std::result::Result<Collaborators, String>,
    builder: ChunkBuilder,
    cache: IncrementalCache,
    status: Option<StatusReporter>,
}

impl WorkerContext {
    /// Construct the context; a factory failure leaves it degraded, not absent
    pub fn new(
        root: impl Into<PathBuf>,
        factory: &CollaboratorFactory,
        builder: ChunkBuilder,
        cache: IncrementalCache,
        status: Option<StatusReporter>,
    ) -> Self {
        let built = panic::catch_unwind(AssertUnwindSafe(|| factory())).unwrap_or_else(|payload| {
            Err(Error::WorkerUnavailable(format!(
                "initialization panicked: {}",
                panic_message(payload.as_ref())
            )))
        });
        let collaborators = built.map_err(|e| {
            let worker = status.as_ref().map(|s| s.worker().to_string()).unwrap_or_default();
            tracing::error!("Worker {} initialization failed: {}", worker, e);
            e.to_string()
        });

        Self {
            root: root.into(),
            collaborators,
            builder,
            cache,
            status,
        }
    }

    /// Whether construction succeeded
    pub fn is_degraded(&self) -> bool {
        self.collaborators.is_err()
    }

    /// Path relative to the root with `/` separators
    pub fn relative_path(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Process one file. Never fails: errors come back as `FileOutcome::Failed`.
    pub fn process_file(&mut self, path: &Path) -> FileResult {
        let file_path = self.relative_path(path);

        let supported = match &self.collaborators {
            Ok(collaborators) => collaborators.parsers.supports(path),
            Err(_) => adapter::is_builtin_extension(path),
        };
        if !supported {
            tracing::debug!("Unsupported file: {}", file_path);
            return FileResult::empty(file_path, FileOutcome::Unsupported);
        }

        if let Some(status) = &self.status {
            status.processing(&file_path);
        }

        match self.try_process(path, &file_path) {
            Ok(result) => {
                if let Some(status) = &self.status {
                    match result.outcome {
                        FileOutcome::Cached => status.skipped(&file_path),
                        _ => status.idle(),
                    }
                }
                result
            }
            Err(e) => {
                let reason = e.to_string();
                tracing::warn!("Error processing {}: {}", file_path, reason);
                if let Some(status) = &self.status {
                    status.error(&file_path, reason.as_str());
                }
                FileResult::empty(file_path, FileOutcome::Failed(reason))
            }
        }
    }

    fn try_process(&mut self, path: &Path, file_path: &str) -> Result<FileResult> {
        let collaborators = self
            .collaborators
            .as_mut()
            .map_err(|e| Error::WorkerUnavailable(e.clone()))?;

        let started = Instant::now();
        let content = std::fs::read(path)?;
        let read_ms = elapsed_ms(started);

        let started = Instant::now();
        let checksum = cache::checksum(&content);
        let checksum_ms = elapsed_ms(started);

        if self.cache.should_skip(file_path, &checksum) {
            let mut result = FileResult::empty(file_path.to_string(), FileOutcome::Cached);
            result.checksum = Some(checksum);
            return Ok(result);
        }

        let started = Instant::now();
        let parser = collaborators
            .parsers
            .find_parser(path)
            .ok_or_else(|| Error::Adapter(format!("no parser for {}", file_path)))?;
        let parsed = parser.parse(&content, file_path)?;
        let parse_ms = elapsed_ms(started);

        let started = Instant::now();
        let lists: Vec<_> = collaborators
            .resolvers
            .iter_mut()
            .map(|r| r.resolve(path))
            .collect();
        let dependencies = deps::merge_dependencies(lists);
        let resolve_ms = elapsed_ms(started);

        let started = Instant::now();
        let mut metadata = collaborators
            .provenance
            .as_ref()
            .and_then(|p| p.metadata(path))
            .unwrap_or_default();
        let provenance_ms = elapsed_ms(started);

        metadata.insert("source_checksum".into(), json!(checksum));
        metadata.insert(
            "timings_ms".into(),
            json!({
                "read": read_ms,
                "checksum": checksum_ms,
                "parse": parse_ms,
                "resolve": resolve_ms,
                "provenance": provenance_ms,
            }),
        );

        let chunks = self.builder.build(&parsed, &dependencies, file_path, &metadata);

        Ok(FileResult {
            file_path: file_path.to_string(),
            checksum: Some(checksum),
            chunks,
            outcome: FileOutcome::Processed,
        })
    }
}

/// Text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

/// Metadata keys that change between runs even for identical input
pub fn volatile_metadata_keys() -> &'static [&'static str] {
    &["timings_ms"]
}

/// Copy of `metadata` without run-dependent entries
pub fn stable_metadata(metadata: &Metadata) -> Metadata {
    metadata
        .iter()
        .filter(|(k, _)| !volatile_metadata_keys().contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}
