//! Core adapter framework
//!
//! Defines the structural parser contract and the extension dispatch table.

use crate::Result;
use crate::chunk::ParsedResult;
use std::path::Path;

/// Trait for structural parsers
///
/// A parser turns raw source bytes into imports plus a class/method tree.
/// Parsing must be side-effect free and deterministic; failures surface as
/// errors, never as partial results. Parsers are owned by exactly one worker,
/// so `parse` takes `&mut self` and may reuse internal buffers.
pub trait StructuralParser: Send {
    /// Get the language name (for display)
    fn language_name(&self) -> &str;

    /// Get file extensions this parser handles
    fn file_extensions(&self) -> &[&str];

    /// Check if this parser can handle a file
    fn can_handle(&self, path: &Path) -> bool {
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            self.file_extensions().contains(&ext)
        } else {
            false
        }
    }

    /// Parse a file into a structured result
    fn parse(&mut self, source: &[u8], file_path: &str) -> Result<ParsedResult>;
}

/// Extension → parser dispatch table
#[derive(Default)]
pub struct ParserRegistry {
    parsers: Vec<Box<dyn StructuralParser>>,
}

impl ParserRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parser
    pub fn register(&mut self, parser: impl StructuralParser + 'static) {
        self.parsers.push(Box::new(parser));
    }

    /// Check whether any parser handles this path
    pub fn supports(&self, path: &Path) -> bool {
        self.parsers.iter().any(|p| p.can_handle(path))
    }

    /// Find the parser for a file
    pub fn find_parser(&mut self, path: &Path) -> Option<&mut (dyn StructuralParser + 'static)> {
        self.parsers
            .iter_mut()
            .find(|p| p.can_handle(path))
            .map(|p| p.as_mut())
    }

    /// Get all registered parsers
    pub fn parsers(&self) -> &[Box<dyn StructuralParser>] {
        &self.parsers
    }
}

/// Create a default registry with all built-in parsers
pub fn default_registry() -> Result<ParserRegistry> {
    let mut registry = ParserRegistry::new();
    registry.register(super::java::JavaParser::new()?);
    Ok(registry)
}

/// Whether a built-in parser claims this path's extension.
///
/// Answers without constructing any grammar, so it holds even when a
/// registry could not be built.
pub fn is_builtin_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| super::java::EXTENSIONS.contains(&ext))
}
