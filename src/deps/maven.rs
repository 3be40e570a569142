//! Maven manifest resolver
//!
//! Reads the project-level `<dependencies>` of the nearest `pom.xml`.
//! Managed dependencies, plugin dependencies, profiles and exclusions are
//! not declarations of the module itself and are skipped.

use super::{DependencyResolver, DescriptorLocator};
use crate::chunk::{Dependency, DependencyOrigin};
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const DESCRIPTORS: &[&str] = &["pom.xml"];

pub struct MavenResolver {
    locator: DescriptorLocator,
    parsed: HashMap<PathBuf, Vec<Dependency>>,
    patterns: PomPatterns,
}

struct PomPatterns {
    noise: Vec<Regex>,
    dependencies: Regex,
    dependency: Regex,
    exclusions: Regex,
    group_id: Regex,
    artifact_id: Regex,
    version: Regex,
}

impl PomPatterns {
    fn new() -> Self {
        // Static patterns; they are known to compile
        let re = |p: &str| Regex::new(p).expect("valid pom pattern");
        Self {
            noise: vec![
                re(r"(?s)<!--.*?-->"),
                re(r"(?s)<dependencyManagement>.*?</dependencyManagement>"),
                re(r"(?s)<build>.*?</build>"),
                re(r"(?s)<profiles>.*?</profiles>"),
                re(r"(?s)<reporting>.*?</reporting>"),
            ],
            dependencies: re(r"(?s)<dependencies>(.*?)</dependencies>"),
            dependency: re(r"(?s)<dependency>(.*?)</dependency>"),
            exclusions: re(r"(?s)<exclusions>.*?</exclusions>"),
            group_id: re(r"(?s)<groupId>\s*(.*?)\s*</groupId>"),
            artifact_id: re(r"(?s)<artifactId>\s*(.*?)\s*</artifactId>"),
            version: re(r"(?s)<version>\s*(.*?)\s*</version>"),
        }
    }
}

impl Default for MavenResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl MavenResolver {
    pub fn new() -> Self {
        Self {
            locator: DescriptorLocator::new(DESCRIPTORS),
            parsed: HashMap::new(),
            patterns: PomPatterns::new(),
        }
    }

    /// Parse a pom.xml, returning an empty list when it cannot be read
    fn parse_pom(&self, pom_path: &Path) -> Vec<Dependency> {
        match std::fs::read_to_string(pom_path) {
            Ok(content) => self.parse_pom_str(&content),
            Err(e) => {
                tracing::warn!("Error reading POM {}: {}", pom_path.display(), e);
                Vec::new()
            }
        }
    }

    fn parse_pom_str(&self, content: &str) -> Vec<Dependency> {
        let p = &self.patterns;

        let mut cleaned = content.to_string();
        for noise in &p.noise {
            cleaned = noise.replace_all(&cleaned, "").into_owned();
        }

        let Some(block) = p.dependencies.captures(&cleaned).and_then(|c| c.get(1)) else {
            return Vec::new();
        };

        let capture = |re: &Regex, s: &str| -> Option<String> {
            re.captures(s)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
        };

        p.dependency
            .captures_iter(block.as_str())
            .filter_map(|c| c.get(1))
            .map(|m| {
                let stripped = p.exclusions.replace_all(m.as_str(), "");
                let body: &str = &stripped;
                let group_id = capture(&p.group_id, body).unwrap_or_default();
                let artifact_id = capture(&p.artifact_id, body).unwrap_or_default();
                let mut dep = Dependency::new(format!("{}:{}", group_id, artifact_id), DependencyOrigin::Manifest);
                dep.version = capture(&p.version, body);
                dep
            })
            .collect()
    }
}

impl DependencyResolver for MavenResolver {
    fn origin(&self) -> DependencyOrigin {
        DependencyOrigin::Manifest
    }

    fn resolve(&mut self, file_path: &Path) -> Vec<Dependency> {
        let Some(pom) = self.locator.locate(file_path) else {
            return Vec::new();
        };

        if let Some(deps) = self.parsed.get(&pom) {
            return deps.clone();
        }

        let deps = self.parse_pom(&pom);
        self.parsed.insert(pom, deps.clone());
        deps
    }
}
