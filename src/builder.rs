//! Chunk builder
//!
//! Turns a [`ParsedResult`] plus merged dependencies into a chunk tree.
//! The builder holds no state beyond its policy, so identical inputs always
//! produce identical output.

use crate::chunk::{language_for_path, Chunk, ChunkKind, ClassNode, Dependency, Metadata, MethodNode, ParsedResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which top-level classes of a file become chunks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopLevelPolicy {
    /// Every top-level class becomes its own top-level chunk
    #[default]
    All,
    /// Only the first declared class is chunked; siblings are dropped
    First,
}

impl std::str::FromStr for TopLevelPolicy {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(TopLevelPolicy::All),
            "first" => Ok(TopLevelPolicy::First),
            _ => Err(crate::Error::Config(format!("Unknown top-level policy: {}", s))),
        }
    }
}

/// Builds file/class/method chunks
#[derive(Debug, Clone, Default)]
pub struct ChunkBuilder {
    policy: TopLevelPolicy,
}

impl ChunkBuilder {
    pub fn new(policy: TopLevelPolicy) -> Self {
        Self { policy }
    }

    /// Build the chunk tree for one file.
    ///
    /// Never returns an empty vector: a file without classes (even an empty
    /// one) yields a single `File` chunk.
    pub fn build(
        &self,
        parsed: &ParsedResult,
        dependencies: &[Dependency],
        file_path: &str,
        metadata: &Metadata,
    ) -> Vec<Chunk> {
        let language = language_for_path(file_path);

        if parsed.classes.is_empty() {
            let mut chunk = Chunk::new(file_path, file_path, language, ChunkKind::File, parsed.raw_code.as_str());
            chunk.imports = parsed.imports.clone();
            chunk.dependencies = dependencies.to_vec();
            chunk.metadata = metadata.clone();
            return vec![chunk];
        }

        let classes: &[ClassNode] = match self.policy {
            TopLevelPolicy::All => &parsed.classes,
            TopLevelPolicy::First => &parsed.classes[..1],
        };

        let mut class_ids = IdAllocator::default();
        classes
            .iter()
            .map(|class| {
                let id = class_ids.allocate(format!("{}::{}", file_path, class.name));
                self.class_chunk(id, class, parsed, dependencies, file_path, language, metadata)
            })
            .collect()
    }

    #[allow(clippy::too_many_arguments)]
    fn class_chunk(
        &self,
        id: String,
        class: &ClassNode,
        parsed: &ParsedResult,
        dependencies: &[Dependency],
        file_path: &str,
        language: &str,
        metadata: &Metadata,
    ) -> Chunk {
        let mut chunk = Chunk::new(id, file_path, language, ChunkKind::Class, class.code.as_str());
        chunk.package = class.package.clone();
        chunk.extends = class.extends.clone();
        chunk.implements = class.implements.clone();
        chunk.imports = parsed.imports.clone();
        chunk.dependencies = dependencies.to_vec();
        chunk.metadata = metadata.clone();

        let mut method_ids = IdAllocator::default();
        let children: Vec<Chunk> = class
            .methods
            .iter()
            .map(|method| {
                let id = method_ids.allocate(format!("{}::{}", chunk.id, method.name));
                method_chunk(id, &chunk, method)
            })
            .collect();
        chunk.children = children;

        chunk
    }
}

fn method_chunk(id: String, parent: &Chunk, method: &MethodNode) -> Chunk {
    let mut chunk = Chunk::new(id, parent.file_path.as_str(), parent.language.as_str(), ChunkKind::Method, method.code.as_str());
    chunk.package = parent.package.clone();
    chunk.imports = method.used_imports.clone();
    chunk.signature = Some(method.signature.clone());
    chunk.is_override = method.is_override;
    chunk.parent_id = Some(parent.id.clone());
    chunk
}

/// Hands out ids, suffixing repeats with their declaration ordinal (`#2`, `#3`, ...)
#[derive(Default)]
struct IdAllocator {
    seen: HashMap<String, usize>,
}

impl IdAllocator {
    fn allocate(&mut self, base: String) -> String {
        let count = self.seen.entry(base.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            base
        } else {
            format!("{}#{}", base, count)
        }
    }
}
