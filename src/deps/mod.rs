//! Dependency extraction
//!
//! Resolvers read the nearest enclosing build descriptor of a source file and
//! return the dependencies it declares literally. Nothing here resolves
//! transitive graphs or versions.

pub mod bazel;
pub mod maven;

pub use bazel::BazelResolver;
pub use maven::MavenResolver;

use crate::chunk::{Dependency, DependencyOrigin};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Trait for dependency resolvers, one per build-system flavor
///
/// Missing or malformed build files yield an empty list, never an error.
pub trait DependencyResolver: Send {
    /// Origin tag attached to every dependency this resolver returns
    fn origin(&self) -> DependencyOrigin;

    /// Resolve the dependencies declared for a source file
    fn resolve(&mut self, file_path: &Path) -> Vec<Dependency>;
}

/// Resolvers in process-wide priority order: manifest before build graph
pub fn default_resolvers() -> Vec<Box<dyn DependencyResolver>> {
    vec![
        Box::new(MavenResolver::new()),
        Box::new(BazelResolver::new()),
    ]
}

/// Merge resolver outputs with first-seen-wins deduplication on `name`.
///
/// Lists must be given in resolver priority order. A later entry with an
/// already-seen name is dropped whole; fields are never combined.
pub fn merge_dependencies<I>(lists: I) -> Vec<Dependency>
where
    I: IntoIterator<Item = Vec<Dependency>>,
{
    let mut seen = HashSet::new();
    let mut merged = Vec::new();

    for list in lists {
        for dep in list {
            if seen.insert(dep.name.clone()) {
                merged.push(dep);
            }
        }
    }
    merged
}

/// Finds the nearest ancestor directory holding one of `names`, memoized per directory
#[derive(Debug)]
pub(crate) struct DescriptorLocator {
    names: &'static [&'static str],
    found: HashMap<PathBuf, Option<PathBuf>>,
}

impl DescriptorLocator {
    pub(crate) fn new(names: &'static [&'static str]) -> Self {
        Self {
            names,
            found: HashMap::new(),
        }
    }

    /// Locate the descriptor governing `file_path`
    pub(crate) fn locate(&mut self, file_path: &Path) -> Option<PathBuf> {
        let absolute = std::path::absolute(file_path).unwrap_or_else(|_| file_path.to_path_buf());
        let start = absolute.parent()?.to_path_buf();

        if let Some(cached) = self.found.get(&start) {
            return cached.clone();
        }

        let mut result = None;
        for dir in start.ancestors() {
            if let Some(hit) = self.names.iter().map(|n| dir.join(n)).find(|p| p.is_file()) {
                result = Some(hit);
                break;
            }
        }

        tracing::debug!("Descriptor for {}: {:?}", start.display(), result);
        self.found.insert(start, result.clone());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_first_seen_wins() {
        let a = vec![
            Dependency::new("junit", DependencyOrigin::Manifest),
            Dependency::new("guava", DependencyOrigin::Manifest),
        ];
        let b = vec![
            Dependency::new("guava", DependencyOrigin::BuildGraph).with_version("30"),
            Dependency::new("extra", DependencyOrigin::BuildGraph),
        ];

        let merged = merge_dependencies(vec![a, b]);
        let names: Vec<&str> = merged.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["junit", "guava", "extra"]);

        let guava = &merged[1];
        assert_eq!(guava.version, None);
        assert_eq!(guava.origin, DependencyOrigin::Manifest);
    }

    #[test]
    fn test_merge_collapses_duplicates_within_a_list() {
        let a = vec![
            Dependency::new("x", DependencyOrigin::Manifest).with_version("1"),
            Dependency::new("x", DependencyOrigin::Manifest).with_version("2"),
        ];
        let merged = merge_dependencies(vec![a, Vec::new()]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].version.as_deref(), Some("1"));
    }

    #[test]
    fn test_merge_is_deterministic() {
        let lists = || vec![
            vec![Dependency::new("b", DependencyOrigin::Manifest), Dependency::new("a", DependencyOrigin::Manifest)],
            vec![Dependency::new("c", DependencyOrigin::BuildGraph), Dependency::new("a", DependencyOrigin::BuildGraph)],
        ];
        assert_eq!(merge_dependencies(lists()), merge_dependencies(lists()));
    }

    #[test]
    fn test_locator_finds_nearest_ancestor() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("module/src/main/java");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("pom.xml"), "<project/>").unwrap();
        std::fs::write(dir.path().join("module/pom.xml"), "<project/>").unwrap();

        let mut locator = DescriptorLocator::new(&["pom.xml"]);
        let found = locator.locate(&nested.join("App.java")).unwrap();
        assert_eq!(found, dir.path().join("module/pom.xml"));

        // Second lookup is served from the memo
        assert_eq!(locator.locate(&nested.join("Other.java")), Some(found));
    }

    #[test]
    fn test_default_resolver_priority() {
        let resolvers = default_resolvers();
        let origins: Vec<DependencyOrigin> = resolvers.iter().map(|r| r.origin()).collect();
        assert_eq!(origins, vec![DependencyOrigin::Manifest, DependencyOrigin::BuildGraph]);
    }
}
