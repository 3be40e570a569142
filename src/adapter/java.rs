//! Java structural parser
//!
//! Extracts the package, imports, top-level type declarations and their
//! methods from Java source files using tree-sitter.

use crate::{Result, Error};
use crate::chunk::{ClassNode, MethodNode, ParsedResult, SourceSpan};
use super::framework::StructuralParser;
use tree_sitter::{Language, Node, Parser};

/// Top-level declarations that become class nodes
/// Extensions handled by [`JavaParser`]
pub const EXTENSIONS: &[&str] = &["java"];

const TYPE_DECLARATIONS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
];

/// Body members that become method nodes
const METHOD_DECLARATIONS: &[&str] = &[
    "method_declaration",
    "constructor_declaration",
    "compact_constructor_declaration",
];

/// Java parser backed by the tree-sitter Java grammar
pub struct JavaParser {
    parser: Parser,
}

impl JavaParser {
    /// Create a new Java parser, loading the grammar once
    pub fn new() -> Result<Self> {
        let language: Language = tree_sitter_java::LANGUAGE.into();
        let mut parser = Parser::new();
        parser
            .set_language(&language)
            .map_err(|e| Error::Adapter(format!("Failed to load Java grammar: {}", e)))?;

        Ok(Self { parser })
    }

    /// Extract the package name, if declared
    fn extract_package(&self, root: Node, source: &[u8]) -> String {
        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            if child.kind() == "package_declaration" {
                let mut inner = child.walk();
                let name = child
                    .named_children(&mut inner)
                    .find(|n| matches!(n.kind(), "scoped_identifier" | "identifier"));
                if let Some(name) = name {
                    return text(name, source);
                }
            }
        }
        String::new()
    }

    /// Extract import declarations as `java.util.List`, `static a.B.c`, `a.b.*`
    fn extract_imports(&self, root: Node, source: &[u8]) -> Vec<String> {
        let mut imports = Vec::new();
        let mut cursor = root.walk();

        for child in root.named_children(&mut cursor) {
            if child.kind() != "import_declaration" {
                continue;
            }
            let raw = text(child, source);
            let body = raw
                .trim()
                .trim_start_matches("import")
                .trim_end_matches(';');
            let import = collapse_whitespace(body);
            if !import.is_empty() {
                imports.push(import);
            }
        }
        imports
    }

    /// Extract a top-level type declaration
    fn extract_class(&self, node: Node, source: &[u8], package: &str, imports: &[String]) -> Option<ClassNode> {
        let name = text(node.child_by_field_name("name")?, source);

        let mut extends = None;
        let mut implements = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "superclass" => {
                    extends = child.named_child(0).map(|t| text(t, source));
                }
                "super_interfaces" | "extends_interfaces" => {
                    implements.extend(type_list(child, source));
                }
                _ => {}
            }
        }

        let mut methods = Vec::new();
        if let Some(body) = node.child_by_field_name("body") {
            self.collect_methods(body, source, imports, &mut methods);
        }

        Some(ClassNode {
            name,
            code: text(node, source),
            span: span(node),
            package: package.to_string(),
            extends,
            implements,
            methods,
            annotations: annotations(node, source),
        })
    }

    /// Collect methods declared directly in a class/interface/enum body
    fn collect_methods(&self, body: Node, source: &[u8], imports: &[String], methods: &mut Vec<MethodNode>) {
        let mut cursor = body.walk();
        for member in body.named_children(&mut cursor) {
            if METHOD_DECLARATIONS.contains(&member.kind()) {
                if let Some(method) = self.extract_method(member, source, imports) {
                    methods.push(method);
                }
            } else if member.kind() == "enum_body_declarations" {
                self.collect_methods(member, source, imports, methods);
            }
        }
    }

    /// Extract a method or constructor
    fn extract_method(&self, node: Node, source: &[u8], imports: &[String]) -> Option<MethodNode> {
        let name = text(node.child_by_field_name("name")?, source);
        let code = text(node, source);
        let annotations = annotations(node, source);
        let is_override = annotations
            .iter()
            .any(|a| a == "@Override" || a == "@java.lang.Override");

        Some(MethodNode {
            name,
            signature: signature(node, source),
            used_imports: used_imports(&code, imports),
            code,
            span: span(node),
            is_override,
            annotations,
        })
    }
}

impl StructuralParser for JavaParser {
    fn language_name(&self) -> &str {
        "Java"
    }

    fn file_extensions(&self) -> &[&str] {
        EXTENSIONS
    }

    fn parse(&mut self, source: &[u8], file_path: &str) -> Result<ParsedResult> {
        let tree = self.parser.parse(source, None)
            .ok_or_else(|| Error::Parse(format!("tree-sitter returned no tree for {}", file_path)))?;
        let root = tree.root_node();
        if root.has_error() {
            let line = first_error(root).map_or(0, |n| n.start_position().row + 1);
            return Err(Error::Parse(format!("{}: syntax error near line {}", file_path, line)));
        }

        let package = self.extract_package(root, source);
        let imports = self.extract_imports(root, source);

        let mut classes = Vec::new();
        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            if TYPE_DECLARATIONS.contains(&child.kind()) {
                if let Some(class) = self.extract_class(child, source, &package, &imports) {
                    classes.push(class);
                }
            }
        }

        Ok(ParsedResult {
            raw_code: String::from_utf8_lossy(source).into_owned(),
            imports,
            classes,
        })
    }
}

/// Leftmost `ERROR` or missing node in document order
fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children.into_iter().filter(|c| c.has_error()).find_map(first_error)
}

fn text(node: Node, source: &[u8]) -> String {
    String::from_utf8_lossy(&source[node.byte_range()]).into_owned()
}

fn span(node: Node) -> SourceSpan {
    let start = node.start_position();
    let end = node.end_position();
    SourceSpan::new(start.row as u32 + 1, start.column as u32, end.row as u32 + 1, end.column as u32)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn modifiers(node: Node) -> Option<Node> {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).find(|c| c.kind() == "modifiers");
    found
}

fn is_annotation(node: Node) -> bool {
    matches!(node.kind(), "marker_annotation" | "annotation")
}

/// Annotation texts from a declaration's modifiers, in source order
fn annotations(node: Node, source: &[u8]) -> Vec<String> {
    let Some(mods) = modifiers(node) else {
        return Vec::new();
    };
    let mut cursor = mods.walk();
    mods.children(&mut cursor)
        .filter(|c| is_annotation(*c))
        .map(|c| collapse_whitespace(&text(c, source)))
        .collect()
}

/// Types listed in a `super_interfaces` / `extends_interfaces` clause
fn type_list(clause: Node, source: &[u8]) -> Vec<String> {
    let mut cursor = clause.walk();
    let Some(list) = clause.named_children(&mut cursor).find(|c| c.kind() == "type_list") else {
        return Vec::new();
    };
    let mut inner = list.walk();
    list.named_children(&mut inner).map(|t| text(t, source)).collect()
}

/// Declaration header without annotations or body: `public static int add(int a, int b) throws X`
fn signature(node: Node, source: &[u8]) -> String {
    let end = node
        .child_by_field_name("body")
        .map(|b| b.start_byte())
        .unwrap_or_else(|| node.end_byte());

    let mut parts = Vec::new();
    let mut start = node.start_byte();
    if let Some(mods) = modifiers(node) {
        let mut cursor = mods.walk();
        for child in mods.children(&mut cursor) {
            if !is_annotation(child) {
                parts.push(text(child, source));
            }
        }
        start = mods.end_byte();
    }

    let rest = String::from_utf8_lossy(&source[start..end.max(start)]).into_owned();
    parts.push(rest.trim().trim_end_matches(';').to_string());
    collapse_whitespace(&parts.join(" "))
}

/// The name an import brings into scope; wildcard imports have none
fn simple_name(import: &str) -> Option<&str> {
    let path = import.strip_prefix("static ").unwrap_or(import).trim();
    let name = path.rsplit('.').next()?;
    if name.is_empty() || name == "*" {
        None
    } else {
        Some(name)
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Whole-word containment check using Java identifier characters
fn contains_word(haystack: &str, word: &str) -> bool {
    haystack.match_indices(word).any(|(idx, _)| {
        let before = haystack[..idx].chars().next_back();
        let after = haystack[idx + word.len()..].chars().next();
        !before.is_some_and(is_ident_char) && !after.is_some_and(is_ident_char)
    })
}

/// Imports whose simple name appears in `code`, deduplicated, in import order
fn used_imports(code: &str, imports: &[String]) -> Vec<String> {
    let mut used: Vec<String> = Vec::new();
    for import in imports {
        if let Some(name) = simple_name(import) {
            if contains_word(code, name) && !used.contains(import) {
                used.push(import.clone());
            }
        }
    }
    used
}
