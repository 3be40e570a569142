//! # Codechunk - Incremental Code Chunker
//!
//! Turns a tree of source files into hierarchical chunks (file → class → method)
//! enriched with imports and declared build dependencies.
//!
//! Codechunk provides:
//! - A chunk model with deterministic, hierarchical identifiers
//! - Tree-sitter based structural parsing behind a per-extension dispatch table
//! - Maven and Bazel dependency extraction with first-seen-wins merging
//! - A BLAKE3 checksum cache that skips files whose output is already current
//! - A fixed-size worker pool with a message-passing status board

pub mod chunk;
pub mod adapter;
pub mod deps;
pub mod builder;
pub mod cache;
pub mod sink;
pub mod provenance;
pub mod status;
pub mod worker;
pub mod pipeline;
pub mod ignore;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use chunk::{Chunk, ChunkKind, ClassNode, Dependency, DependencyOrigin, Metadata, MethodNode, ParsedResult, SourceSpan};
pub use builder::{ChunkBuilder, TopLevelPolicy};
pub use cache::IncrementalCache;
pub use deps::merge_dependencies;
pub use pipeline::{Pipeline, PipelineOptions, RunSummary};
pub use sink::{ChunkSink, OutputFormat};
pub use worker::{FileOutcome, FileResult, WorkerContext};

/// Result type alias for Codechunk operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Codechunk operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Adapter error: {0}")]
    Adapter(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Output error: {0}")]
    Sink(String),

    #[error("Worker unavailable: {0}")]
    WorkerUnavailable(String),
}
