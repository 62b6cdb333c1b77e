//! C extractor using tree-sitter.
//!
//! The walker is shared with C++: the C++ grammar emits a superset of the C
//! node kinds (plus classes and namespaces), so one visit loop serves both
//! and the C++ module only picks the grammar.

use tree_sitter::Node;
use trellis_core::{SymbolKind, Visibility};

use super::{LanguageExtractor, line_of, end_line_of, parse, signature_of, split_callee, text, unquote};
use crate::complexity;
use crate::extractor::{Extraction, RawReference, RawReferenceKind, SymbolDraft};

pub struct CExtractor;

impl LanguageExtractor for CExtractor {
    fn extract(&self, path: &str, content: &str) -> Extraction {
        run(&tree_sitter_c::LANGUAGE.into(), "c", path, content)
    }
}

/// Parse with the given grammar and walk the result. Shared with cpp.
pub(super) fn run(
    language: &tree_sitter::Language,
    grammar_name: &str,
    path: &str,
    content: &str,
) -> Extraction {
    let mut extraction = Extraction::default();
    let Some(tree) = parse(language, content) else {
        extraction.push_parse_error(path, format!("{grammar_name} parser failed to produce a tree"));
        return extraction;
    };
    if tree.root_node().has_error() {
        extraction.push_parse_error(path, "syntax errors; partial extraction");
    }

    let mut walker = Walker {
        source: content,
        extraction: &mut extraction,
    };
    walker.visit(tree.root_node(), &ScopePrefix::default(), None);
    extraction
}

#[derive(Default, Clone)]
struct ScopePrefix(String);

impl ScopePrefix {
    fn qualify(&self, name: &str) -> String {
        if self.0.is_empty() {
            name.to_string()
        } else {
            format!("{}::{}", self.0, name)
        }
    }

    fn nested(&self, segment: &str) -> ScopePrefix {
        ScopePrefix(self.qualify(segment))
    }
}

struct Walker<'a> {
    source: &'a str,
    extraction: &'a mut Extraction,
}

impl Walker<'_> {
    fn visit(&mut self, node: Node<'_>, scope: &ScopePrefix, enclosing: Option<usize>) {
        match node.kind() {
            "function_definition" => {
                self.function(node, scope);
                return;
            }
            "struct_specifier" => self.record(node, scope, SymbolKind::Struct),
            "union_specifier" => self.record(node, scope, SymbolKind::Struct),
            "enum_specifier" => self.record(node, scope, SymbolKind::Enum),
            "class_specifier" => {
                self.class(node, scope);
                return;
            }
            "namespace_definition" => {
                self.namespace(node, scope);
                return;
            }
            "type_definition" => self.typedef(node, scope),
            "preproc_include" => self.include(node),
            "preproc_def" => self.define(node, scope),
            "call_expression" => self.call(node, enclosing),
            _ => {}
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(child, scope, enclosing);
        }
    }

    fn function(&mut self, node: Node<'_>, scope: &ScopePrefix) {
        let Some(name) = declared_name(node, self.source) else {
            return;
        };
        // `Type::method` definitions outside the class body are methods.
        let (qualifier, bare) = split_callee(&name);
        let (kind, qualified) = match &qualifier {
            Some(owner) => (SymbolKind::Method, format!("{owner}::{bare}")),
            None => {
                let kind = if scope.0.is_empty() {
                    SymbolKind::Function
                } else {
                    SymbolKind::Method
                };
                (kind, scope.qualify(&bare))
            }
        };

        let mut draft = SymbolDraft::new(kind, &bare, qualified);
        draft.line_start = line_of(node);
        draft.line_end = end_line_of(node);
        draft.signature = signature_of(node, self.source);
        draft.complexity = Some(complexity::score_function(node, self.source, &bare));
        self.extraction.symbols.push(draft);
        let index = self.extraction.symbols.len() - 1;

        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            for child in body.children(&mut cursor) {
                self.visit(child, scope, Some(index));
            }
        }
    }

    /// Named struct/union/enum; anonymous ones are skipped.
    fn record(&mut self, node: Node<'_>, scope: &ScopePrefix, kind: SymbolKind) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        // Bare `struct foo x;` usages carry a name but no body.
        if node.child_by_field_name("body").is_none() {
            return;
        }
        let name = text(name_node, self.source).to_string();
        let mut draft = SymbolDraft::new(kind, &name, scope.qualify(&name));
        draft.line_start = line_of(node);
        draft.line_end = end_line_of(node);
        draft.signature = signature_of(node, self.source);
        self.extraction.symbols.push(draft);
    }

    fn class(&mut self, node: Node<'_>, scope: &ScopePrefix) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        if node.child_by_field_name("body").is_none() {
            return;
        }
        let name = text(name_node, self.source).to_string();
        let mut draft = SymbolDraft::new(SymbolKind::Class, &name, scope.qualify(&name));
        draft.line_start = line_of(node);
        draft.line_end = end_line_of(node);
        draft.signature = signature_of(node, self.source);
        self.extraction.symbols.push(draft);

        // `class Derived : public Base`.
        if let Some(clause) = child_of_kind(node, "base_class_clause") {
            let mut cursor = clause.walk();
            for child in clause.children(&mut cursor) {
                if matches!(child.kind(), "type_identifier" | "qualified_identifier") {
                    let (qualifier, base) = split_callee(text(child, self.source));
                    let mut reference =
                        RawReference::new(RawReferenceKind::Inherit, base, line_of(child));
                    reference.qualifier = qualifier;
                    self.extraction.references.push(reference);
                }
            }
        }

        let nested = scope.nested(&name);
        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            for child in body.children(&mut cursor) {
                self.visit(child, &nested, None);
            }
        }
    }

    fn namespace(&mut self, node: Node<'_>, scope: &ScopePrefix) {
        let name = node
            .child_by_field_name("name")
            .map(|n| text(n, self.source).to_string());
        let nested = match &name {
            Some(name) => {
                let mut draft =
                    SymbolDraft::new(SymbolKind::Module, name, scope.qualify(name));
                draft.line_start = line_of(node);
                draft.line_end = end_line_of(node);
                self.extraction.symbols.push(draft);
                scope.nested(name)
            }
            None => scope.clone(),
        };
        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            for child in body.children(&mut cursor) {
                self.visit(child, &nested, None);
            }
        }
    }

    fn typedef(&mut self, node: Node<'_>, scope: &ScopePrefix) {
        let Some(declarator) = node.child_by_field_name("declarator") else {
            return;
        };
        if declarator.kind() != "type_identifier" {
            return;
        }
        let name = text(declarator, self.source).to_string();
        let mut draft = SymbolDraft::new(SymbolKind::TypeAlias, &name, scope.qualify(&name));
        draft.line_start = line_of(node);
        draft.line_end = end_line_of(node);
        draft.signature = signature_of(node, self.source);
        self.extraction.symbols.push(draft);
    }

    fn include(&mut self, node: Node<'_>) {
        let Some(path_node) = node.child_by_field_name("path") else {
            return;
        };
        let written = unquote(text(path_node, self.source));
        let header = written.trim_start_matches('<').trim_end_matches('>');
        if header.is_empty() {
            return;
        }
        // Header stem names the unit; "net/server.h" imports server.
        let stem = header
            .rsplit('/')
            .next()
            .unwrap_or(header)
            .trim_end_matches(".h")
            .trim_end_matches(".hpp")
            .to_string();
        let mut reference = RawReference::new(RawReferenceKind::Import, stem, line_of(node));
        reference.detail = Some(header.to_string());
        self.extraction.references.push(reference);
    }

    fn define(&mut self, node: Node<'_>, scope: &ScopePrefix) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = text(name_node, self.source).to_string();
        let mut draft = SymbolDraft::new(SymbolKind::Constant, &name, scope.qualify(&name));
        draft.line_start = line_of(node);
        draft.line_end = end_line_of(node);
        self.extraction.symbols.push(draft);
    }

    fn call(&mut self, node: Node<'_>, enclosing: Option<usize>) {
        let Some(callee) = node.child_by_field_name("function") else {
            return;
        };
        let written = text(callee, self.source);

        if written == "getenv" {
            if let Some(key) = first_string_argument(node, self.source) {
                let mut reference = RawReference::new(RawReferenceKind::EnvRead, key, line_of(node));
                reference.enclosing = enclosing;
                self.extraction.references.push(reference);
            }
            return;
        }

        let (qualifier, name) = split_callee(written);
        if name.is_empty() || !name.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_') {
            return;
        }
        let mut reference = RawReference::new(RawReferenceKind::Call, name, line_of(node));
        reference.qualifier = qualifier;
        reference.enclosing = enclosing;
        self.extraction.references.push(reference);
    }
}

/// Dig through pointer/function declarators to the defined identifier.
fn declared_name(node: Node<'_>, source: &str) -> Option<String> {
    let mut current = node.child_by_field_name("declarator")?;
    loop {
        match current.kind() {
            "identifier" | "field_identifier" | "qualified_identifier" | "destructor_name"
            | "operator_name" => {
                return Some(text(current, source).to_string());
            }
            "function_declarator" | "pointer_declarator" | "parenthesized_declarator"
            | "reference_declarator" => {
                current = current.child_by_field_name("declarator").or_else(|| {
                    let mut cursor = current.walk();
                    current
                        .children(&mut cursor)
                        .find(|c| c.kind().ends_with("declarator") || c.kind().ends_with("identifier"))
                })?;
            }
            _ => return None,
        }
    }
}

fn child_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).find(|c| c.kind() == kind);
    found
}

fn first_string_argument(call: Node<'_>, source: &str) -> Option<String> {
    let args = call.child_by_field_name("arguments")?;
    let mut cursor = args.walk();
    let first = args.children(&mut cursor).find(|c| c.kind() == "string_literal")?;
    let literal = unquote(text(first, source)).to_string();
    (!literal.is_empty()).then_some(literal)
}
