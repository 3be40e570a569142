//! Structural Parser Framework
//!
//! Each language provides a Tree-sitter grammar wrapped in a [`StructuralParser`].
//! Parsers are selected per file by extension through the [`ParserRegistry`];
//! adding a language means adding one parser and one registry entry.

pub mod framework;
pub mod java;

pub use framework::{StructuralParser, ParserRegistry, default_registry, is_builtin_extension};
pub use java::JavaParser;
