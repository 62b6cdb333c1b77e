//! JavaScript extractor using tree-sitter.
//!
//! The walker is shared with the TypeScript extractor: the TS grammar emits a
//! superset of the JS node kinds, so one visit loop covers both and the
//! TypeScript module only picks the grammar.
//!
//! Beyond declarations, three call shapes matter to the graph: `fetch(...)` /
//! `axios.get(...)` become HttpCall references with the URL as payload,
//! `app.get("/path", handler)` registers a Route symbol wired to its handler,
//! and `process.env.KEY` becomes an EnvRead.

use tree_sitter::Node;
use trellis_core::{SymbolKind, Visibility};

use super::{LanguageExtractor, line_of, end_line_of, parse, signature_of, split_callee, text, unquote};
use crate::complexity;
use crate::extractor::{Extraction, RawReference, RawReferenceKind, SymbolDraft};

pub struct JavaScriptExtractor;

impl LanguageExtractor for JavaScriptExtractor {
    fn extract(&self, path: &str, content: &str) -> Extraction {
        run(&tree_sitter_javascript::LANGUAGE.into(), "javascript", path, content)
    }
}

/// Parse with the given grammar and walk the result. Shared with typescript.
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
    walker.visit(tree.root_node(), None, None);
    extraction
}

const ROUTE_METHODS: &[&str] = &["get", "post", "put", "delete", "patch", "all", "use"];
const HTTP_METHODS: &[&str] = &["get", "post", "put", "delete", "patch", "head", "request"];

struct Walker<'a> {
    source: &'a str,
    extraction: &'a mut Extraction,
}

impl Walker<'_> {
    fn visit(&mut self, node: Node<'_>, class: Option<&str>, enclosing: Option<usize>) {
        match node.kind() {
            "function_declaration" | "generator_function_declaration" => {
                self.function(node, class);
                return;
            }
            "method_definition" => {
                self.method(node, class);
                return;
            }
            "class_declaration" => {
                self.class(node);
                return;
            }
            "interface_declaration" => {
                self.named(node, SymbolKind::Interface);
            }
            "type_alias_declaration" => {
                self.named(node, SymbolKind::TypeAlias);
            }
            "enum_declaration" => {
                self.named(node, SymbolKind::Enum);
            }
            "variable_declarator" => {
                if self.declarator(node, class) {
                    return;
                }
            }
            "import_statement" => self.import(node),
            "call_expression" => {
                if self.call(node, enclosing) {
                    return;
                }
            }
            "member_expression" => self.env_member(node, enclosing),
            _ => {}
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(child, class, enclosing);
        }
    }

    fn function(&mut self, node: Node<'_>, class: Option<&str>) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = text(name_node, self.source).to_string();
        let index = self.push_callable(node, &name, class, SymbolKind::Function);
        self.visit_body(node, class, index);
    }

    fn method(&mut self, node: Node<'_>, class: Option<&str>) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = text(name_node, self.source).to_string();
        let index = self.push_callable(node, &name, class, SymbolKind::Method);
        self.visit_body(node, class, index);
    }

    /// `const f = () => ...` and `const f = function ...` count as functions.
    fn declarator(&mut self, node: Node<'_>, class: Option<&str>) -> bool {
        let Some(value) = node.child_by_field_name("value") else {
            return false;
        };
        if !matches!(value.kind(), "arrow_function" | "function_expression" | "function") {
            return false;
        }
        let Some(name_node) = node.child_by_field_name("name") else {
            return false;
        };
        if name_node.kind() != "identifier" {
            return false;
        }
        let name = text(name_node, self.source).to_string();
        let index = self.push_callable(node, &name, class, SymbolKind::Function);
        self.visit_body(value, class, index);
        true
    }

    fn push_callable(
        &mut self,
        node: Node<'_>,
        name: &str,
        class: Option<&str>,
        kind: SymbolKind,
    ) -> usize {
        let (kind, qualified) = match class {
            Some(class) => (SymbolKind::Method, format!("{class}.{name}")),
            None => (kind, name.to_string()),
        };
        let mut draft = SymbolDraft::new(kind, name, qualified);
        draft.line_start = line_of(node);
        draft.line_end = end_line_of(node);
        draft.signature = signature_of(node, self.source);
        draft.visibility = if name.starts_with('_') {
            Visibility::Private
        } else {
            Visibility::Public
        };
        draft.complexity = Some(complexity::score_function(node, self.source, name));
        self.extraction.symbols.push(draft);
        self.extraction.symbols.len() - 1
    }

    fn visit_body(&mut self, node: Node<'_>, class: Option<&str>, index: usize) {
        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            for child in body.children(&mut cursor) {
                self.visit(child, class, Some(index));
            }
        }
    }

    fn class(&mut self, node: Node<'_>) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = text(name_node, self.source).to_string();
        let mut draft = SymbolDraft::new(SymbolKind::Class, &name, name.clone());
        draft.line_start = line_of(node);
        draft.line_end = end_line_of(node);
        draft.signature = signature_of(node, self.source);
        self.extraction.symbols.push(draft);

        // `class A extends B` and TS `implements` clauses.
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if matches!(child.kind(), "class_heritage" | "extends_clause" | "implements_clause") {
                self.heritage(child);
            }
        }

        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            for child in body.children(&mut cursor) {
                self.visit(child, Some(&name), None);
            }
        }
    }

    fn heritage(&mut self, node: Node<'_>) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "identifier" | "member_expression" | "type_identifier" => {
                    let (qualifier, name) = split_callee(text(child, self.source));
                    let mut reference =
                        RawReference::new(RawReferenceKind::Inherit, name, line_of(child));
                    reference.qualifier = qualifier;
                    self.extraction.references.push(reference);
                }
                "extends_clause" | "implements_clause" => self.heritage(child),
                _ => {}
            }
        }
    }

    fn named(&mut self, node: Node<'_>, kind: SymbolKind) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = text(name_node, self.source).to_string();
        let mut draft = SymbolDraft::new(kind, &name, name.clone());
        draft.line_start = line_of(node);
        draft.line_end = end_line_of(node);
        draft.signature = signature_of(node, self.source);
        self.extraction.symbols.push(draft);
    }

    fn import(&mut self, node: Node<'_>) {
        let Some(source_node) = node.child_by_field_name("source") else {
            return;
        };
        let module = unquote(text(source_node, self.source)).to_string();
        if module.is_empty() {
            return;
        }
        // Last path segment names the module; "./services/auth" imports auth.
        let stem = module.rsplit('/').next().unwrap_or(&module).to_string();
        let mut reference = RawReference::new(RawReferenceKind::Import, stem, line_of(node));
        reference.detail = Some(module);
        self.extraction.references.push(reference);
    }

    /// Returns true when the call was fully consumed (children already
    /// visited or irrelevant).
    fn call(&mut self, node: Node<'_>, enclosing: Option<usize>) -> bool {
        let Some(callee) = node.child_by_field_name("function") else {
            return false;
        };
        let written = text(callee, self.source);

        if let Some(reference) = http_call(node, written, self.source) {
            let mut reference = reference;
            reference.enclosing = enclosing;
            self.extraction.references.push(reference);
            return false;
        }

        if self.route_registration(node, written) {
            return true;
        }

        let (qualifier, name) = split_callee(written.trim_start_matches("this."));
        if !name.is_empty() && name.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$') {
            let mut reference = RawReference::new(RawReferenceKind::Call, name, line_of(node));
            reference.qualifier = qualifier;
            reference.enclosing = enclosing;
            self.extraction.references.push(reference);
        }
        false
    }

    /// `app.get("/users/:id", getUser)` and friends register routes.
    fn route_registration(&mut self, node: Node<'_>, written: &str) -> bool {
        let Some((receiver, method)) = written.rsplit_once('.') else {
            return false;
        };
        if !matches!(receiver, "app" | "router" | "server") || !ROUTE_METHODS.contains(&method) {
            return false;
        }
        let Some(args) = node.child_by_field_name("arguments") else {
            return false;
        };
        let mut cursor = args.walk();
        let children: Vec<Node<'_>> = args.children(&mut cursor).collect();
        let Some(path_node) = children.iter().find(|c| c.kind() == "string") else {
            return false;
        };
        let path = unquote(text(*path_node, self.source)).to_string();
        if path.is_empty() || !path.starts_with('/') {
            return false;
        }

        let verb = if matches!(method, "all" | "use") {
            "ANY".to_string()
        } else {
            method.to_uppercase()
        };
        let mut route = SymbolDraft::new(SymbolKind::Route, &path, format!("{verb} {path}"));
        route.line_start = line_of(node);
        route.line_end = end_line_of(node);
        self.extraction.symbols.push(route);
        let route_index = self.extraction.symbols.len() - 1;

        // A bare-identifier handler argument wires the route through normal
        // resolution; inline closures are walked with the route as scope.
        for child in &children {
            match child.kind() {
                "identifier" => {
                    let handler = text(*child, self.source);
                    let mut reference =
                        RawReference::new(RawReferenceKind::Call, handler, line_of(*child));
                    reference.enclosing = Some(route_index);
                    self.extraction.references.push(reference);
                }
                "arrow_function" | "function_expression" | "function" => {
                    self.visit(*child, None, Some(route_index));
                }
                _ => {}
            }
        }
        true
    }

    /// `process.env.KEY`.
    fn env_member(&mut self, node: Node<'_>, enclosing: Option<usize>) {
        let Some(object) = node.child_by_field_name("object") else {
            return;
        };
        if text(object, self.source) != "process.env" {
            return;
        }
        let Some(property) = node.child_by_field_name("property") else {
            return;
        };
        let key = text(property, self.source).to_string();
        if key.is_empty() {
            return;
        }
        let mut reference = RawReference::new(RawReferenceKind::EnvRead, key, line_of(node));
        reference.enclosing = enclosing;
        self.extraction.references.push(reference);
    }
}

/// `fetch("/api/users")`, `axios.get(url)`, `http.request(...)`. The URL
/// literal rides in `detail` for the REST bridge.
fn http_call(node: Node<'_>, written: &str, source: &str) -> Option<RawReference> {
    let is_http = written == "fetch"
        || written
            .rsplit_once('.')
            .is_some_and(|(receiver, method)| {
                matches!(receiver, "axios" | "http" | "https") && HTTP_METHODS.contains(&method)
            });
    if !is_http {
        return None;
    }
    let args = node.child_by_field_name("arguments")?;
    let mut cursor = args.walk();
    let first = args
        .children(&mut cursor)
        .find(|c| matches!(c.kind(), "string" | "template_string"))?;
    let url = unquote(text(first, source)).to_string();
    if url.is_empty() {
        return None;
    }
    let path = path_of_url(&url).to_string();
    let mut reference = RawReference::new(RawReferenceKind::HttpCall, path, line_of(node));
    reference.detail = Some(url);
    Some(reference)
}

/// Strip scheme and host so `https://api.example.com/users` matches the
/// route `/users`.
fn path_of_url(url: &str) -> &str {
    let rest = url
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(url);
    if rest == url {
        return url;
    }
    match rest.find('/') {
        Some(idx) => &rest[idx..],
        None => "/",
    }
}
