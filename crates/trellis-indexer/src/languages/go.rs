//! Go extractor using tree-sitter.

use tree_sitter::Node;
use trellis_core::{SymbolKind, Visibility};

use super::{LanguageExtractor, line_of, end_line_of, parse, signature_of, split_callee, text, unquote};
use crate::complexity;
use crate::extractor::{Extraction, RawReference, RawReferenceKind, SymbolDraft};

pub struct GoExtractor;

impl LanguageExtractor for GoExtractor {
    fn extract(&self, path: &str, content: &str) -> Extraction {
        let mut extraction = Extraction::default();
        let Some(tree) = parse(&tree_sitter_go::LANGUAGE.into(), content) else {
            extraction.push_parse_error(path, "go parser failed to produce a tree");
            return extraction;
        };
        if tree.root_node().has_error() {
            extraction.push_parse_error(path, "syntax errors; partial extraction");
        }

        let mut walker = Walker {
            source: content,
            extraction: &mut extraction,
        };
        walker.visit(tree.root_node(), None);
        extraction
    }
}

struct Walker<'a> {
    source: &'a str,
    extraction: &'a mut Extraction,
}

impl Walker<'_> {
    fn visit(&mut self, node: Node<'_>, enclosing: Option<usize>) {
        match node.kind() {
            "function_declaration" => {
                self.function(node, None);
                return;
            }
            "method_declaration" => {
                let receiver = self.receiver_type(node);
                self.function(node, receiver.as_deref());
                return;
            }
            "type_declaration" => self.type_declaration(node),
            "const_declaration" | "var_declaration" => {
                if enclosing.is_none() {
                    self.const_specs(node);
                }
            }
            "import_declaration" => self.imports(node),
            "call_expression" => {
                if self.call(node, enclosing) {
                    return;
                }
            }
            _ => {}
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(child, enclosing);
        }
    }

    fn function(&mut self, node: Node<'_>, receiver: Option<&str>) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = text(name_node, self.source).to_string();
        let (kind, qualified) = match receiver {
            Some(receiver) => (SymbolKind::Method, format!("{receiver}.{name}")),
            None => (SymbolKind::Function, name.clone()),
        };

        let mut draft = SymbolDraft::new(kind, &name, qualified);
        draft.line_start = line_of(node);
        draft.line_end = end_line_of(node);
        draft.signature = signature_of(node, self.source);
        draft.visibility = go_visibility(&name);
        draft.complexity = Some(complexity::score_function(node, self.source, &name));
        self.extraction.symbols.push(draft);
        let index = self.extraction.symbols.len() - 1;

        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            for child in body.children(&mut cursor) {
                self.visit(child, Some(index));
            }
        }
    }

    /// `func (s *Server) Handle(...)` hangs the method off `Server`.
    fn receiver_type(&self, node: Node<'_>) -> Option<String> {
        let receiver = node.child_by_field_name("receiver")?;
        let mut cursor = receiver.walk();
        let param = receiver
            .children(&mut cursor)
            .find(|c| c.kind() == "parameter_declaration")?;
        let type_node = param.child_by_field_name("type")?;
        let written = text(type_node, self.source).trim_start_matches('*');
        (!written.is_empty()).then(|| written.to_string())
    }

    fn type_declaration(&mut self, node: Node<'_>) {
        let mut cursor = node.walk();
        for spec in node.children(&mut cursor) {
            if spec.kind() != "type_spec" {
                continue;
            }
            let Some(name_node) = spec.child_by_field_name("name") else {
                continue;
            };
            let name = text(name_node, self.source).to_string();
            let kind = match spec.child_by_field_name("type").map(|t| t.kind()) {
                Some("struct_type") => SymbolKind::Struct,
                Some("interface_type") => SymbolKind::Interface,
                _ => SymbolKind::TypeAlias,
            };
            let mut draft = SymbolDraft::new(kind, &name, name.clone());
            draft.line_start = line_of(spec);
            draft.line_end = end_line_of(spec);
            draft.signature = signature_of(spec, self.source);
            draft.visibility = go_visibility(&name);
            self.extraction.symbols.push(draft);
        }
    }

    fn const_specs(&mut self, node: Node<'_>) {
        let mut cursor = node.walk();
        for spec in node.children(&mut cursor) {
            if !matches!(spec.kind(), "const_spec" | "var_spec") {
                continue;
            }
            let Some(name_node) = spec.child_by_field_name("name") else {
                continue;
            };
            let name = text(name_node, self.source).to_string();
            let kind = if spec.kind() == "const_spec" {
                SymbolKind::Constant
            } else {
                SymbolKind::Variable
            };
            let mut draft = SymbolDraft::new(kind, &name, name.clone());
            draft.line_start = line_of(spec);
            draft.line_end = end_line_of(spec);
            draft.visibility = go_visibility(&name);
            self.extraction.symbols.push(draft);
        }
    }

    fn imports(&mut self, node: Node<'_>) {
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            let mut cursor = current.walk();
            for child in current.children(&mut cursor) {
                match child.kind() {
                    "import_spec_list" => stack.push(child),
                    "import_spec" => {
                        let Some(path_node) = child.child_by_field_name("path") else {
                            continue;
                        };
                        let module = unquote(text(path_node, self.source)).to_string();
                        if module.is_empty() {
                            continue;
                        }
                        let stem = module.rsplit('/').next().unwrap_or(&module).to_string();
                        let mut reference =
                            RawReference::new(RawReferenceKind::Import, stem, line_of(child));
                        reference.detail = Some(module);
                        self.extraction.references.push(reference);
                    }
                    _ => {}
                }
            }
        }
    }

    /// Returns true when the call registered a route and consumed its
    /// arguments.
    fn call(&mut self, node: Node<'_>, enclosing: Option<usize>) -> bool {
        let Some(callee) = node.child_by_field_name("function") else {
            return false;
        };
        let written = text(callee, self.source);

        if matches!(written, "os.Getenv" | "os.LookupEnv") {
            if let Some(key) = first_string_argument(node, self.source) {
                let mut reference = RawReference::new(RawReferenceKind::EnvRead, key, line_of(node));
                reference.enclosing = enclosing;
                self.extraction.references.push(reference);
            }
            return false;
        }

        if matches!(written, "http.HandleFunc" | "http.Handle")
            || written.ends_with(".HandleFunc")
            || written.ends_with(".Handle")
        {
            if self.route_registration(node) {
                return true;
            }
        }

        let (qualifier, name) = split_callee(written);
        if name.is_empty() || !name.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_') {
            return false;
        }
        let mut reference = RawReference::new(RawReferenceKind::Call, name, line_of(node));
        reference.qualifier = qualifier;
        reference.enclosing = enclosing;
        self.extraction.references.push(reference);
        false
    }

    /// `http.HandleFunc("/users", listUsers)`.
    fn route_registration(&mut self, node: Node<'_>) -> bool {
        let Some(args) = node.child_by_field_name("arguments") else {
            return false;
        };
        let mut cursor = args.walk();
        let children: Vec<Node<'_>> = args.children(&mut cursor).collect();
        let Some(path_node) = children
            .iter()
            .find(|c| c.kind() == "interpreted_string_literal")
        else {
            return false;
        };
        let path = unquote(text(*path_node, self.source)).to_string();
        if path.is_empty() || !path.starts_with('/') {
            return false;
        }

        let mut route = SymbolDraft::new(SymbolKind::Route, &path, format!("ANY {path}"));
        route.line_start = line_of(node);
        route.line_end = end_line_of(node);
        self.extraction.symbols.push(route);
        let route_index = self.extraction.symbols.len() - 1;

        for child in &children {
            if matches!(child.kind(), "identifier" | "selector_expression") {
                let (qualifier, handler) = split_callee(text(*child, self.source));
                let mut reference =
                    RawReference::new(RawReferenceKind::Call, handler, line_of(*child));
                reference.qualifier = qualifier;
                reference.enclosing = Some(route_index);
                self.extraction.references.push(reference);
            }
        }
        true
    }
}

/// Exported names start uppercase.
fn go_visibility(name: &str) -> Visibility {
    if name.chars().next().is_some_and(|c| c.is_uppercase()) {
        Visibility::Public
    } else {
        Visibility::Private
    }
}

fn first_string_argument(call: Node<'_>, source: &str) -> Option<String> {
    let args = call.child_by_field_name("arguments")?;
    let mut cursor = args.walk();
    let first = args
        .children(&mut cursor)
        .find(|c| c.kind() == "interpreted_string_literal")?;
    let literal = unquote(text(first, source)).to_string();
    (!literal.is_empty()).then_some(literal)
}
