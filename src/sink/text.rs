//! Text sink: human-readable chunk blocks behind a checksum header line

use super::{record_location, write_atomic, CacheRecord, ChunkSink};
use crate::chunk::Chunk;
use crate::{Error, Result};
use std::fmt::Write as _;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

const SUFFIX: &str = ".txt";
const CHECKSUM_HEADER: &str = "Source-Checksum: ";

pub struct TextSink {
    destination: PathBuf,
}

impl TextSink {
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
        }
    }

    /// Render a record; children follow their parent, indented by depth
    pub fn render(record: &CacheRecord) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}{}", CHECKSUM_HEADER, record.source_checksum);
        out.push('\n');
        for chunk in &record.chunks {
            render_chunk(&mut out, chunk);
        }
        out
    }
}

fn render_chunk(out: &mut String, chunk: &Chunk) {
    let _ = writeln!(out, "--- START CHUNK {} ---", chunk.id);
    let _ = writeln!(out, "Language: {}", chunk.language);
    let _ = writeln!(out, "Kind: {}", chunk.kind);
    if let Some(parent) = &chunk.parent_id {
        let _ = writeln!(out, "Parent: {}", parent);
    }
    if !chunk.package.is_empty() {
        let _ = writeln!(out, "Package: {}", chunk.package);
    }
    if let Some(extends) = &chunk.extends {
        let _ = writeln!(out, "Extends: {}", extends);
    }
    if !chunk.implements.is_empty() {
        let _ = writeln!(out, "Implements: {}", chunk.implements.join(", "));
    }
    if let Some(signature) = &chunk.signature {
        let _ = writeln!(out, "Signature: {}", signature);
    }
    if chunk.is_override {
        out.push_str("Override: true\n");
    }
    if !chunk.metadata.is_empty() {
        out.push_str("Metadata:\n");
        for (key, value) in &chunk.metadata {
            match value {
                serde_json::Value::String(s) => { let _ = writeln!(out, "  {}: {}", key, s); }
                other => { let _ = writeln!(out, "  {}: {}", key, other); }
            }
        }
    }
    out.push_str("Imports:\n");
    for import in &chunk.imports {
        let _ = writeln!(out, "  {}", import);
    }
    if !chunk.dependencies.is_empty() {
        out.push_str("Dependencies:\n");
        for dep in &chunk.dependencies {
            let version = dep.version.as_deref().map(|v| format!(":{}", v)).unwrap_or_default();
            let _ = writeln!(out, "  {}{} ({})", dep.name, version, dep.origin);
        }
    }
    out.push_str("Code:\n");
    out.push_str(&chunk.code);
    if !chunk.code.ends_with('\n') {
        out.push('\n');
    }
    let _ = writeln!(out, "--- END CHUNK {} ---\n", chunk.id);

    for child in &chunk.children {
        render_chunk(out, child);
    }
}

impl ChunkSink for TextSink {
    fn format_name(&self) -> &str {
        "text"
    }

    fn destination(&self) -> &Path {
        &self.destination
    }

    fn record_path(&self, file_path: &str) -> PathBuf {
        record_location(&self.destination, file_path, SUFFIX)
    }

    fn write(&self, record: &CacheRecord) -> Result<()> {
        write_atomic(&self.record_path(&record.file_path), Self::render(record).as_bytes())
    }

    fn read_checksum(&self, file_path: &str) -> Result<Option<String>> {
        let file = match std::fs::File::open(self.record_path(file_path)) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut first = String::new();
        BufReader::new(file).read_line(&mut first)?;
        first
            .trim_end()
            .strip_prefix(CHECKSUM_HEADER)
            .filter(|c| !c.is_empty())
            .map(|c| Some(c.to_string()))
            .ok_or_else(|| Error::Sink(format!("record for {} has no checksum header", file_path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{ChunkKind, Dependency, DependencyOrigin};

    fn sample_record() -> CacheRecord {
        let mut class = Chunk::new("src/Test.java::Test", "src/Test.java", "java", ChunkKind::Class, "public class Test {}");
        class.imports = vec!["java.util.List".into()];
        class.dependencies = vec![Dependency::new("junit", DependencyOrigin::Manifest).with_version("4.12")];
        class.metadata.insert("author_name".into(), serde_json::json!("Test User"));

        let mut method = Chunk::new("src/Test.java::Test::run", "src/Test.java", "java", ChunkKind::Method, "void run() {}");
        method.parent_id = Some(class.id.clone());
        method.signature = Some("void run()".into());
        class.children.push(method);

        CacheRecord {
            source_checksum: "deadbeef".into(),
            file_path: "src/Test.java".into(),
            chunks: vec![class],
        }
    }

    #[test]
    fn test_text_sink_render() {
        let text = TextSink::render(&sample_record());

        assert!(text.starts_with("Source-Checksum: deadbeef\n"));
        assert!(text.contains("--- START CHUNK src/Test.java::Test ---"));
        assert!(text.contains("Language: java"));
        assert!(text.contains("junit:4.12 (manifest)"));
        assert!(text.contains("  author_name: Test User"));
        assert!(text.contains("public class Test {}"));
        assert!(text.contains("Parent: src/Test.java::Test"));

        let class_start = text.find("START CHUNK src/Test.java::Test ---").unwrap();
        let method_start = text.find("START CHUNK src/Test.java::Test::run ---").unwrap();
        assert!(class_start < method_start);
    }

    #[test]
    fn test_text_sink_checksum_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let sink = TextSink::new(dir.path());

        assert_eq!(sink.read_checksum("src/Test.java").unwrap(), None);
        sink.write(&sample_record()).unwrap();
        assert!(dir.path().join("src/Test.java.txt").is_file());
        assert_eq!(sink.read_checksum("src/Test.java").unwrap().as_deref(), Some("deadbeef"));

        std::fs::write(sink.record_path("src/Test.java"), "garbage\n").unwrap();
        assert!(sink.read_checksum("src/Test.java").is_err());
    }
}
