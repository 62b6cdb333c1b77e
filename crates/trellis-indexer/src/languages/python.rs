//! Python extractor using tree-sitter.
//!
//! Besides functions and classes, route decorators (`@app.route`,
//! `@router.get`, ...) produce Route symbols wired to their handler so REST
//! bridge edges have a backend anchor.

use tree_sitter::Node;
use trellis_core::{SymbolKind, Visibility};

use super::{LanguageExtractor, line_of, end_line_of, parse, signature_of, split_callee, text, unquote};
use crate::complexity;
use crate::extractor::{Extraction, RawReference, RawReferenceKind, SymbolDraft};

pub struct PythonExtractor;

const ROUTE_METHODS: &[&str] = &["get", "post", "put", "delete", "patch", "route"];

impl LanguageExtractor for PythonExtractor {
    fn extract(&self, path: &str, content: &str) -> Extraction {
        let mut extraction = Extraction::default();
        let Some(tree) = parse(&tree_sitter_python::LANGUAGE.into(), content) else {
            extraction.push_parse_error(path, "python parser failed to produce a tree");
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
}

struct Walker<'a> {
    source: &'a str,
    extraction: &'a mut Extraction,
}

impl Walker<'_> {
    fn visit(&mut self, node: Node<'_>, class: Option<&str>, enclosing: Option<usize>) {
        match node.kind() {
            "decorated_definition" => {
                self.decorated(node, class);
                return;
            }
            "function_definition" => {
                self.function(node, class, &[]);
                return;
            }
            "class_definition" => {
                self.class(node);
                return;
            }
            "import_statement" | "import_from_statement" => self.import(node),
            "call" => self.call(node, enclosing),
            "subscript" => self.environ_subscript(node, enclosing),
            "assignment" => {
                if class.is_none() && enclosing.is_none() {
                    self.module_constant(node);
                }
            }
            _ => {}
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(child, class, enclosing);
        }
    }

    fn decorated(&mut self, node: Node<'_>, class: Option<&str>) {
        let mut decorators = Vec::new();
        let mut definition = None;
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "decorator" => decorators.push(child),
                "function_definition" => definition = Some(child),
                "class_definition" => {
                    self.class(child);
                    return;
                }
                _ => {}
            }
        }
        if let Some(def) = definition {
            self.function(def, class, &decorators);
        }
    }

    fn function(&mut self, node: Node<'_>, class: Option<&str>, decorators: &[Node<'_>]) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = text(name_node, self.source).to_string();
        let (kind, qualified) = match class {
            Some(class) => (SymbolKind::Method, format!("{class}.{name}")),
            None => (SymbolKind::Function, name.clone()),
        };

        let mut draft = SymbolDraft::new(kind, &name, qualified);
        draft.line_start = line_of(node);
        draft.line_end = end_line_of(node);
        draft.signature = signature_of(node, self.source);
        draft.visibility = if name.starts_with('_') {
            Visibility::Private
        } else {
            Visibility::Public
        };
        draft.complexity = Some(complexity::score_function(node, self.source, &name));
        self.extraction.symbols.push(draft);
        let index = self.extraction.symbols.len() - 1;

        for decorator in decorators {
            self.route_from_decorator(*decorator, &name);
        }

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
        draft.visibility = if name.starts_with('_') {
            Visibility::Private
        } else {
            Visibility::Public
        };
        self.extraction.symbols.push(draft);

        if let Some(superclasses) = node.child_by_field_name("superclasses") {
            let mut cursor = superclasses.walk();
            for base in superclasses.children(&mut cursor) {
                if matches!(base.kind(), "identifier" | "attribute") {
                    let (qualifier, base_name) = split_callee(text(base, self.source));
                    let mut reference =
                        RawReference::new(RawReferenceKind::Inherit, base_name, line_of(base));
                    reference.qualifier = qualifier;
                    self.extraction.references.push(reference);
                }
            }
        }

        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            for child in body.children(&mut cursor) {
                self.visit(child, Some(&name), None);
            }
        }
    }

    /// `@app.route("/users")`, `@router.get("/users/{id}")`.
    fn route_from_decorator(&mut self, decorator: Node<'_>, handler: &str) {
        let Some(call) = child_of_kind(decorator, "call") else {
            return;
        };
        let Some(callee) = call.child_by_field_name("function") else {
            return;
        };
        let written = text(callee, self.source);
        let Some((_, method)) = written.rsplit_once('.') else {
            return;
        };
        if !ROUTE_METHODS.contains(&method) {
            return;
        }
        let Some(path_literal) = first_string_argument(call, self.source) else {
            return;
        };

        let verb = if method == "route" {
            "ANY".to_string()
        } else {
            method.to_uppercase()
        };
        let mut route = SymbolDraft::new(
            SymbolKind::Route,
            &path_literal,
            format!("{verb} {path_literal}"),
        );
        route.line_start = line_of(decorator);
        route.line_end = end_line_of(decorator);
        self.extraction.symbols.push(route);
        let route_index = self.extraction.symbols.len() - 1;

        // Wire the route to its handler through normal resolution.
        let mut reference = RawReference::new(RawReferenceKind::Call, handler, line_of(decorator));
        reference.enclosing = Some(route_index);
        self.extraction.references.push(reference);
    }

    fn import(&mut self, node: Node<'_>) {
        if node.kind() == "import_from_statement" {
            if let Some(module) = node.child_by_field_name("module_name") {
                let written = text(module, self.source);
                let (qualifier, name) = split_callee(written);
                let mut reference = RawReference::new(RawReferenceKind::Import, name, line_of(node));
                reference.qualifier = qualifier;
                self.extraction.references.push(reference);
            }
            return;
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if matches!(child.kind(), "dotted_name" | "aliased_import") {
                let written = text(child, self.source);
                let module = written.split_whitespace().next().unwrap_or(written);
                let (qualifier, name) = split_callee(module);
                let mut reference = RawReference::new(RawReferenceKind::Import, name, line_of(node));
                reference.qualifier = qualifier;
                self.extraction.references.push(reference);
            }
        }
    }

    fn call(&mut self, node: Node<'_>, enclosing: Option<usize>) {
        let Some(callee) = node.child_by_field_name("function") else {
            return;
        };
        let written = text(callee, self.source);

        if matches!(written, "os.getenv" | "os.environ.get") {
            if let Some(key) = first_string_argument(node, self.source) {
                let mut reference = RawReference::new(RawReferenceKind::EnvRead, key, line_of(node));
                reference.enclosing = enclosing;
                self.extraction.references.push(reference);
            }
            return;
        }

        let cleaned = written.trim_start_matches("self.");
        let (qualifier, name) = split_callee(cleaned);
        if name.is_empty() || !name.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_') {
            return;
        }
        let mut reference = RawReference::new(RawReferenceKind::Call, name, line_of(node));
        reference.qualifier = qualifier;
        reference.enclosing = enclosing;
        self.extraction.references.push(reference);
    }

    /// `os.environ["KEY"]`.
    fn environ_subscript(&mut self, node: Node<'_>, enclosing: Option<usize>) {
        let Some(value) = node.child_by_field_name("value") else {
            return;
        };
        if text(value, self.source) != "os.environ" {
            return;
        }
        let Some(subscript) = node.child_by_field_name("subscript") else {
            return;
        };
        if subscript.kind() != "string" {
            return;
        }
        let key = unquote(text(subscript, self.source)).to_string();
        if key.is_empty() {
            return;
        }
        let mut reference = RawReference::new(RawReferenceKind::EnvRead, key, line_of(node));
        reference.enclosing = enclosing;
        self.extraction.references.push(reference);
    }

    /// Module-level `NAME = ...` in all caps becomes a Constant.
    fn module_constant(&mut self, node: Node<'_>) {
        let Some(left) = node.child_by_field_name("left") else {
            return;
        };
        if left.kind() != "identifier" {
            return;
        }
        let name = text(left, self.source);
        if name.len() < 2 || !name.chars().all(|c| c.is_ascii_uppercase() || c == '_' || c.is_ascii_digit()) {
            return;
        }
        let mut draft = SymbolDraft::new(SymbolKind::Constant, name, name.to_string());
        draft.line_start = line_of(node);
        draft.line_end = end_line_of(node);
        self.extraction.symbols.push(draft);
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
    let first = args.children(&mut cursor).find(|c| c.kind() == "string")?;
    let literal = unquote(text(first, source)).to_string();
    (!literal.is_empty()).then_some(literal)
}
