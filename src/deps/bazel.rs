//! Bazel build-graph resolver
//!
//! Collects the labels of every `deps = [...]` list in the nearest `BUILD`
//! or `BUILD.bazel` file. The whole file is read, so targets sharing a
//! package contribute together.

use super::{DependencyResolver, DescriptorLocator};
use crate::chunk::{Dependency, DependencyOrigin};
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const DESCRIPTORS: &[&str] = &["BUILD", "BUILD.bazel"];

pub struct BazelResolver {
    locator: DescriptorLocator,
    parsed: HashMap<PathBuf, Vec<Dependency>>,
    deps_list: Regex,
    label: Regex,
}

impl Default for BazelResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl BazelResolver {
    pub fn new() -> Self {
        Self {
            locator: DescriptorLocator::new(DESCRIPTORS),
            parsed: HashMap::new(),
            // `\b` keeps `runtime_deps` / `exports_deps` out
            deps_list: Regex::new(r"(?s)\bdeps\s*=\s*\[(.*?)\]").expect("valid deps pattern"),
            label: Regex::new(r#"["']([^"']*)["']"#).expect("valid label pattern"),
        }
    }

    fn parse_build_file(&self, build_path: &Path) -> Vec<Dependency> {
        match std::fs::read_to_string(build_path) {
            Ok(content) => self.parse_build_str(&content),
            Err(e) => {
                tracing::warn!("Error reading BUILD file {}: {}", build_path.display(), e);
                Vec::new()
            }
        }
    }

    fn parse_build_str(&self, content: &str) -> Vec<Dependency> {
        let mut deps = Vec::new();

        for list in self.deps_list.captures_iter(content).filter_map(|c| c.get(1)) {
            let block = list
                .as_str()
                .lines()
                .map(|line| line.split('#').next().unwrap_or(""))
                .collect::<Vec<_>>()
                .join(" ");

            for label in self.label.captures_iter(&block).filter_map(|c| c.get(1)) {
                if !label.as_str().is_empty() {
                    deps.push(Dependency::new(label.as_str(), DependencyOrigin::BuildGraph));
                }
            }
        }
        deps
    }
}

impl DependencyResolver for BazelResolver {
    fn origin(&self) -> DependencyOrigin {
        DependencyOrigin::BuildGraph
    }

    fn resolve(&mut self, file_path: &Path) -> Vec<Dependency> {
        let Some(build_file) = self.locator.locate(file_path) else {
            return Vec::new();
        };

        if let Some(deps) = self.parsed.get(&build_file) {
            return deps.clone();
        }

        let deps = self.parse_build_file(&build_file);
        self.parsed.insert(build_file, deps.clone());
        deps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUILD: &str = r#"
java_library(
    name = "lib",
    srcs = glob(["src/main/java/**/*.java"]),
    deps = [
        "//path/to/dep:lib",  # core dependency
        "@maven//:com_google_guava_guava",
        # "//commented:out",
    ],
    runtime_deps = ["//runtime:only"],
)

java_test(
    name = "test",
    deps = [':my-lib', "//test/dep:junit", ""],
)
"#;

    #[test]
    fn test_resolve_bazel_deps() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("BUILD.bazel"), BUILD).unwrap();
        let source = dir.path().join("src/main/java/com/example/Test.java");

        let mut resolver = BazelResolver::new();
        let deps = resolver.resolve(&source);

        let names: Vec<&str> = deps.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec![
            "//path/to/dep:lib",
            "@maven//:com_google_guava_guava",
            ":my-lib",
            "//test/dep:junit",
        ]);
        assert!(deps.iter().all(|d| d.origin == DependencyOrigin::BuildGraph && d.version.is_none()));
    }

    #[test]
    fn test_nearest_build_file_wins() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("pkg")).unwrap();
        std::fs::write(dir.path().join("BUILD"), r#"deps = ["//root"]"#).unwrap();
        std::fs::write(dir.path().join("pkg/BUILD"), r#"deps = ["//pkg"]"#).unwrap();

        let mut resolver = BazelResolver::new();
        let deps = resolver.resolve(&dir.path().join("pkg/A.java"));
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].name, "//pkg");
    }

    #[test]
    fn test_garbage_build_file_yields_empty() {
        let resolver = BazelResolver::new();
        assert!(resolver.parse_build_str("deps = [unterminated").is_empty());
        assert!(resolver.parse_build_str("").is_empty());
    }
}
