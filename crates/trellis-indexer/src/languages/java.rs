//! Java extractor using tree-sitter.
//!
//! Spring-style mapping annotations (`@GetMapping("/users")`,
//! `@RequestMapping(...)`) produce Route symbols wired to the annotated
//! method.

use tree_sitter::Node;
use trellis_core::{SymbolKind, Visibility};

use super::{LanguageExtractor, line_of, end_line_of, parse, signature_of, split_callee, text, unquote};
use crate::complexity;
use crate::extractor::{Extraction, RawReference, RawReferenceKind, SymbolDraft};

pub struct JavaExtractor;

const MAPPING_ANNOTATIONS: &[(&str, &str)] = &[
    ("GetMapping", "GET"),
    ("PostMapping", "POST"),
    ("PutMapping", "PUT"),
    ("DeleteMapping", "DELETE"),
    ("PatchMapping", "PATCH"),
    ("RequestMapping", "ANY"),
];

impl LanguageExtractor for JavaExtractor {
    fn extract(&self, path: &str, content: &str) -> Extraction {
        let mut extraction = Extraction::default();
        let Some(tree) = parse(&tree_sitter_java::LANGUAGE.into(), content) else {
            extraction.push_parse_error(path, "java parser failed to produce a tree");
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
            "class_declaration" => {
                self.class(node, SymbolKind::Class);
                return;
            }
            "interface_declaration" => {
                self.class(node, SymbolKind::Interface);
                return;
            }
            "enum_declaration" => {
                self.class(node, SymbolKind::Enum);
                return;
            }
            "method_declaration" | "constructor_declaration" => {
                self.method(node, class);
                return;
            }
            "import_declaration" => self.import(node),
            "method_invocation" => self.invocation(node, enclosing),
            "object_creation_expression" => self.instantiation(node, enclosing),
            _ => {}
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(child, class, enclosing);
        }
    }

    fn class(&mut self, node: Node<'_>, kind: SymbolKind) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = text(name_node, self.source).to_string();
        let mut draft = SymbolDraft::new(kind, &name, name.clone());
        draft.line_start = line_of(node);
        draft.line_end = end_line_of(node);
        draft.signature = signature_of(node, self.source);
        draft.visibility = visibility_of(node, self.source);
        self.extraction.symbols.push(draft);

        if let Some(superclass) = node.child_by_field_name("superclass") {
            self.heritage(superclass);
        }
        if let Some(interfaces) = node.child_by_field_name("interfaces") {
            self.heritage(interfaces);
        }

        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            for child in body.children(&mut cursor) {
                self.visit(child, Some(&name), None);
            }
        }
    }

    fn heritage(&mut self, node: Node<'_>) {
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            let mut cursor = current.walk();
            for child in current.children(&mut cursor) {
                match child.kind() {
                    "type_identifier" | "scoped_type_identifier" => {
                        let (qualifier, name) = split_callee(text(child, self.source));
                        let mut reference =
                            RawReference::new(RawReferenceKind::Inherit, name, line_of(child));
                        reference.qualifier = qualifier;
                        self.extraction.references.push(reference);
                    }
                    "type_list" | "generic_type" => stack.push(child),
                    _ => {}
                }
            }
        }
    }

    fn method(&mut self, node: Node<'_>, class: Option<&str>) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = text(name_node, self.source).to_string();
        let qualified = match class {
            Some(class) => format!("{class}.{name}"),
            None => name.clone(),
        };

        let mut draft = SymbolDraft::new(SymbolKind::Method, &name, qualified);
        draft.line_start = line_of(node);
        draft.line_end = end_line_of(node);
        draft.signature = signature_of(node, self.source);
        draft.visibility = visibility_of(node, self.source);
        draft.complexity = Some(complexity::score_function(node, self.source, &name));
        self.extraction.symbols.push(draft);
        let index = self.extraction.symbols.len() - 1;

        self.routes_from_annotations(node, &name);

        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            for child in body.children(&mut cursor) {
                self.visit(child, class, Some(index));
            }
        }
    }

    fn routes_from_annotations(&mut self, method_node: Node<'_>, handler: &str) {
        let Some(modifiers) = child_of_kind(method_node, "modifiers") else {
            return;
        };
        let mut cursor = modifiers.walk();
        for child in modifiers.children(&mut cursor) {
            if !matches!(child.kind(), "annotation" | "marker_annotation") {
                continue;
            }
            let Some(name_node) = child.child_by_field_name("name") else {
                continue;
            };
            let annotation = text(name_node, self.source);
            let Some((_, verb)) = MAPPING_ANNOTATIONS
                .iter()
                .find(|(name, _)| *name == annotation)
            else {
                continue;
            };
            let Some(path) = annotation_path(child, self.source) else {
                continue;
            };

            let mut route = SymbolDraft::new(SymbolKind::Route, &path, format!("{verb} {path}"));
            route.line_start = line_of(child);
            route.line_end = end_line_of(child);
            self.extraction.symbols.push(route);
            let route_index = self.extraction.symbols.len() - 1;

            let mut reference =
                RawReference::new(RawReferenceKind::Call, handler, line_of(child));
            reference.enclosing = Some(route_index);
            self.extraction.references.push(reference);
        }
    }

    fn import(&mut self, node: Node<'_>) {
        let mut cursor = node.walk();
        let Some(path_node) = node
            .children(&mut cursor)
            .find(|c| matches!(c.kind(), "scoped_identifier" | "identifier"))
        else {
            return;
        };
        let written = text(path_node, self.source);
        let (qualifier, name) = split_callee(written);
        let mut reference = RawReference::new(RawReferenceKind::Import, name, line_of(node));
        reference.qualifier = qualifier;
        self.extraction.references.push(reference);
    }

    fn invocation(&mut self, node: Node<'_>, enclosing: Option<usize>) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = text(name_node, self.source).to_string();

        if name == "getenv"
            || (name == "getProperty"
                && node
                    .child_by_field_name("object")
                    .is_some_and(|o| text(o, self.source) == "System"))
        {
            if let Some(key) = first_string_argument(node, self.source) {
                let mut reference = RawReference::new(RawReferenceKind::EnvRead, key, line_of(node));
                reference.enclosing = enclosing;
                self.extraction.references.push(reference);
                return;
            }
        }

        let qualifier = node
            .child_by_field_name("object")
            .map(|o| text(o, self.source).to_string())
            .filter(|o| !o.is_empty() && *o != "this");
        let mut reference = RawReference::new(RawReferenceKind::Call, name, line_of(node));
        reference.qualifier = qualifier;
        reference.enclosing = enclosing;
        self.extraction.references.push(reference);
    }

    /// `new Foo(...)` is a TypeUse plus an implicit constructor call.
    fn instantiation(&mut self, node: Node<'_>, enclosing: Option<usize>) {
        let Some(type_node) = node.child_by_field_name("type") else {
            return;
        };
        let (qualifier, name) = split_callee(text(type_node, self.source));
        let base = name.split('<').next().unwrap_or(&name).to_string();
        if base.is_empty() {
            return;
        }
        let mut reference = RawReference::new(RawReferenceKind::TypeUse, base, line_of(node));
        reference.qualifier = qualifier;
        reference.enclosing = enclosing;
        self.extraction.references.push(reference);
    }
}

fn visibility_of(node: Node<'_>, source: &str) -> Visibility {
    let Some(modifiers) = child_of_kind(node, "modifiers") else {
        return Visibility::Private;
    };
    let written = text(modifiers, source);
    if written.contains("public") {
        Visibility::Public
    } else {
        Visibility::Private
    }
}

fn child_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).find(|c| c.kind() == kind);
    found
}

/// The path literal inside `@GetMapping("/users")` or
/// `@RequestMapping(value = "/users")`.
fn annotation_path(annotation: Node<'_>, source: &str) -> Option<String> {
    let args = child_of_kind(annotation, "annotation_argument_list")?;
    let mut stack = vec![args];
    while let Some(current) = stack.pop() {
        let mut cursor = current.walk();
        for child in current.children(&mut cursor) {
            match child.kind() {
                "string_literal" => {
                    let literal = unquote(text(child, source)).to_string();
                    if !literal.is_empty() {
                        return Some(literal);
                    }
                }
                "element_value_pair" | "element_value_array_initializer" => stack.push(child),
                _ => {}
            }
        }
    }
    None
}
