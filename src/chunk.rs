//! Chunk model - the data that flows from parsers to the output sink
//!
//! A file produces either one flat `File` chunk or one `Class` chunk per
//! top-level class, each holding its `Method` chunks as children:
//! - `File`: `src/Foo.java`
//! - `Class`: `src/Foo.java::Foo`
//! - `Method`: `src/Foo.java::Foo::bar`

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Schema-less metadata attached to top-level chunks.
///
/// Insertion order is preserved through serialization.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Where a dependency declaration was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DependencyOrigin {
    /// A package manifest such as `pom.xml`
    Manifest,
    /// A build graph descriptor such as `BUILD.bazel`
    BuildGraph,
    Unknown,
}

impl DependencyOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyOrigin::Manifest => "manifest",
            DependencyOrigin::BuildGraph => "build-graph",
            DependencyOrigin::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for DependencyOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A declared library dependency.
///
/// Identity is `name` alone; `version` and `origin` are informational.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    pub version: Option<String>,
    pub origin: DependencyOrigin,
}

impl Dependency {
    pub fn new(name: impl Into<String>, origin: DependencyOrigin) -> Self {
        Self {
            name: name.into(),
            version: None,
            origin,
        }
    }

    /// Attach a version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// Location of a node in its source file (1-indexed lines, 0-indexed columns)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpan {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl SourceSpan {
    pub fn new(start_line: u32, start_column: u32, end_line: u32, end_column: u32) -> Self {
        Self { start_line, start_column, end_line, end_column }
    }
}

/// A method or constructor extracted by a structural parser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodNode {
    pub name: String,
    pub signature: String,
    pub code: String,
    pub span: SourceSpan,
    /// File imports textually referenced in the method body, in import order
    pub used_imports: Vec<String>,
    pub is_override: bool,
    pub annotations: Vec<String>,
}

/// A top-level type declaration extracted by a structural parser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassNode {
    pub name: String,
    pub code: String,
    pub span: SourceSpan,
    pub package: String,
    pub extends: Option<String>,
    pub implements: Vec<String>,
    pub methods: Vec<MethodNode>,
    pub annotations: Vec<String>,
}

/// Output of a structural parser for one file.
///
/// An empty `classes` list means the file is chunked flat.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedResult {
    pub raw_code: String,
    pub imports: Vec<String>,
    pub classes: Vec<ClassNode>,
}

impl ParsedResult {
    /// A result with no structure, only code and imports
    pub fn flat(raw_code: impl Into<String>, imports: Vec<String>) -> Self {
        Self {
            raw_code: raw_code.into(),
            imports,
            classes: Vec::new(),
        }
    }
}

/// Granularity of a chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    File,
    Class,
    Method,
}

impl ChunkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkKind::File => "file",
            ChunkKind::Class => "class",
            ChunkKind::Method => "method",
        }
    }
}

impl std::fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The unit emitted to the output sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// `path`, `path::Class` or `path::Class::method`
    pub id: String,
    pub file_path: String,
    pub language: String,
    pub kind: ChunkKind,
    pub code: String,
    /// Only populated on top-level chunks
    pub metadata: Metadata,
    pub package: String,
    pub extends: Option<String>,
    pub implements: Vec<String>,
    /// Full file imports for file/class chunks, used imports for methods
    pub imports: Vec<String>,
    /// Always empty on method chunks
    pub dependencies: Vec<Dependency>,
    pub signature: Option<String>,
    pub is_override: bool,
    pub parent_id: Option<String>,
    pub children: Vec<Chunk>,
}

impl Chunk {
    /// Create a chunk with the required fields; everything else starts empty
    pub fn new(
        id: impl Into<String>,
        file_path: impl Into<String>,
        language: impl Into<String>,
        kind: ChunkKind,
        code: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            file_path: file_path.into(),
            language: language.into(),
            kind,
            code: code.into(),
            metadata: Metadata::new(),
            package: String::new(),
            extends: None,
            implements: Vec::new(),
            imports: Vec::new(),
            dependencies: Vec::new(),
            signature: None,
            is_override: false,
            parent_id: None,
            children: Vec::new(),
        }
    }

    /// Number of chunks in this tree, including `self`
    pub fn tree_len(&self) -> usize {
        1 + self.children.iter().map(Chunk::tree_len).sum::<usize>()
    }
}

/// Detect a chunk language from the file extension
pub fn language_for_path(path: &str) -> &'static str {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "java" => "java",
        "py" => "python",
        "go" => "go",
        _ => "unknown",
    }
}
