//! Candidate file discovery

use ::ignore::gitignore::{Gitignore, GitignoreBuilder};
use ::ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Directories and artifacts that never hold chunkable sources
const DEFAULT_EXCLUDES: &[&str] = &[
    // Build output
    "target/", "build/", "out/", "bin/", "dist/", "node_modules/", "coverage/",
    "bazel-*/", ".gradle/", ".idea/", ".vscode/",

    // Binary artifacts
    "*.class", "*.jar", "*.war", "*.ear", "*.zip", "*.tar", "*.gz",
    "*.png", "*.jpg", "*.jpeg", "*.gif", "*.ico", "*.pdf",
    "*.so", "*.dll", "*.dylib", "*.o", "*.a", "*.exe",
];

/// Default patterns plus configured excludes, matched relative to the root
pub struct IgnoreFilter {
    inner: Gitignore,
}

impl IgnoreFilter {
    pub fn new(root: &Path, extra_excludes: &[String]) -> Self {
        let mut builder = GitignoreBuilder::new(root);

        for pattern in DEFAULT_EXCLUDES {
            builder.add_line(None, pattern).ok();
        }

        for pattern in extra_excludes {
            if let Err(e) = builder.add_line(None, pattern) {
                tracing::warn!("Ignoring invalid exclude pattern {:?}: {}", pattern, e);
            }
        }

        let inner = builder.build().unwrap_or_else(|e| {
            tracing::warn!("Failed to build exclude set: {}", e);
            Gitignore::empty()
        });

        Self { inner }
    }

    pub fn is_ignored(&self, path: &Path, is_dir: bool) -> bool {
        self.inner.matched(path, is_dir).is_ignore()
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|want| want.trim_start_matches('.').eq_ignore_ascii_case(ext)))
}

/// Enumerate candidate files under `root`, sorted.
///
/// Hidden directories are skipped (the root itself is always walked),
/// `.gitignore`/`.ignore` files are honored, and only files with one of
/// `extensions` are returned. An empty extension list accepts every file.
pub fn discover_files(root: &Path, extensions: &[String], excludes: &[String]) -> Vec<PathBuf> {
    let filter = Arc::new(IgnoreFilter::new(root, excludes));

    let walker = WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(true)
        .require_git(false)
        .filter_entry(move |entry| {
            if entry.depth() == 0 {
                return true;
            }
            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            if is_dir && is_hidden(entry.path()) {
                return false;
            }
            !filter.is_ignored(entry.path(), is_dir)
        })
        .build();

    let mut files: Vec<PathBuf> = walker
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
        .map(|entry| entry.into_path())
        .filter(|path| has_extension(path, extensions))
        .collect();

    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "class X {}").unwrap();
    }

    fn relative(root: &Path, files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn test_discover_skips_hidden_dirs_and_defaults() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "src/B.java");
        touch(dir.path(), "src/A.java");
        touch(dir.path(), ".hidden/C.java");
        touch(dir.path(), "target/generated/D.java");
        touch(dir.path(), "README.md");
        touch(dir.path(), "src/.Dotfile.java");

        let files = discover_files(dir.path(), &["java".to_string()], &[]);
        assert_eq!(relative(dir.path(), &files), vec!["src/.Dotfile.java", "src/A.java", "src/B.java"]);
    }

    #[test]
    fn test_discover_honors_gitignore_and_excludes() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "src/A.java");
        touch(dir.path(), "gen/B.java");
        touch(dir.path(), "legacy/C.java");
        std::fs::write(dir.path().join(".gitignore"), "gen/\n").unwrap();

        let files = discover_files(dir.path(), &["java".to_string()], &["legacy/".to_string()]);
        assert_eq!(relative(dir.path(), &files), vec!["src/A.java"]);
    }

    #[test]
    fn test_empty_extension_list_accepts_all() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "A.java");
        touch(dir.path(), "notes.md");

        let files = discover_files(dir.path(), &[], &[]);
        assert_eq!(relative(dir.path(), &files), vec!["A.java", "notes.md"]);
    }

    #[test]
    fn test_has_extension() {
        let exts = vec![".java".to_string()];
        assert!(has_extension(Path::new("a/B.JAVA"), &exts));
        assert!(!has_extension(Path::new("a/B.kt"), &exts));
        assert!(!has_extension(Path::new("Makefile"), &exts));
    }
}
