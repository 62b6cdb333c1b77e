//! Rust extractor using tree-sitter.

use tree_sitter::Node;
use trellis_core::{SymbolKind, Visibility};

use super::{LanguageExtractor, line_of, end_line_of, parse, signature_of, split_callee, text, unquote};
use crate::complexity;
use crate::extractor::{Extraction, RawReference, RawReferenceKind, SymbolDraft};

pub struct RustExtractor;

impl LanguageExtractor for RustExtractor {
    fn extract(&self, path: &str, content: &str) -> Extraction {
        let mut extraction = Extraction::default();
        let Some(tree) = parse(&tree_sitter_rust::LANGUAGE.into(), content) else {
            extraction.push_parse_error(path, "rust parser failed to produce a tree");
            return extraction;
        };
        if tree.root_node().has_error() {
            extraction.push_parse_error(path, "syntax errors; partial extraction");
        }

        let mut walker = Walker {
            source: content,
            extraction: &mut extraction,
        };
        walker.visit(tree.root_node(), &Scope::default());
        extraction
    }
}

#[derive(Default, Clone)]
struct Scope {
    /// Container path (`Outer::Inner`), empty at module top level.
    prefix: String,
    /// Index of the enclosing function/method symbol, for references.
    enclosing: Option<usize>,
    in_impl: bool,
}

impl Scope {
    fn qualify(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}::{}", self.prefix, name)
        }
    }

    fn nested(&self, segment: &str) -> Scope {
        Scope {
            prefix: self.qualify(segment),
            enclosing: self.enclosing,
            in_impl: self.in_impl,
        }
    }
}

struct Walker<'a> {
    source: &'a str,
    extraction: &'a mut Extraction,
}

impl Walker<'_> {
    fn visit(&mut self, node: Node<'_>, scope: &Scope) {
        match node.kind() {
            "function_item" => {
                self.function(node, scope);
                return; // body handled inside
            }
            "impl_item" => {
                self.impl_block(node, scope);
                return;
            }
            "struct_item" => self.named_item(node, scope, SymbolKind::Struct),
            "enum_item" => self.named_item(node, scope, SymbolKind::Enum),
            "trait_item" => self.named_item(node, scope, SymbolKind::Trait),
            "union_item" => self.named_item(node, scope, SymbolKind::Struct),
            "type_item" => self.named_item(node, scope, SymbolKind::TypeAlias),
            "const_item" => self.named_item(node, scope, SymbolKind::Constant),
            "static_item" => self.named_item(node, scope, SymbolKind::Constant),
            "mod_item" => {
                if let Some(name) = self.name_of(node) {
                    self.push_symbol(node, scope, SymbolKind::Module, &name);
                    let nested = scope.nested(&name);
                    let mut cursor = node.walk();
                    for child in node.children(&mut cursor) {
                        self.visit(child, &nested);
                    }
                }
                return;
            }
            "use_declaration" => {
                self.use_declaration(node, scope);
            }
            _ => {}
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(child, scope);
        }
    }

    fn function(&mut self, node: Node<'_>, scope: &Scope) {
        let Some(name) = self.name_of(node) else {
            return;
        };
        let kind = if scope.in_impl {
            SymbolKind::Method
        } else {
            SymbolKind::Function
        };
        let index = self.push_symbol(node, scope, kind, &name);
        if let Some(draft) = self.extraction.symbols.get_mut(index) {
            draft.complexity = Some(complexity::score_function(node, self.source, &name));
        }

        if let Some(body) = node.child_by_field_name("body") {
            let inner = Scope {
                prefix: scope.prefix.clone(),
                enclosing: Some(index),
                in_impl: scope.in_impl,
            };
            self.collect_references(body, &inner);
        }
    }

    fn impl_block(&mut self, node: Node<'_>, scope: &Scope) {
        let type_name = node
            .child_by_field_name("type")
            .map(|t| text(t, self.source).to_string())
            .unwrap_or_default();

        // `impl Trait for Type` records an Implements reference.
        if let Some(trait_node) = node.child_by_field_name("trait") {
            let written = text(trait_node, self.source);
            let (qualifier, name) = split_callee(written);
            let mut reference =
                RawReference::new(RawReferenceKind::Inherit, name, line_of(node));
            reference.qualifier = qualifier;
            self.extraction.references.push(reference);
        }

        let inner = Scope {
            prefix: scope.qualify(&type_name),
            enclosing: scope.enclosing,
            in_impl: true,
        };
        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            for child in body.children(&mut cursor) {
                self.visit(child, &inner);
            }
        }
    }

    fn use_declaration(&mut self, node: Node<'_>, _scope: &Scope) {
        if let Some(argument) = node.child_by_field_name("argument") {
            let written = text(argument, self.source);
            // Last path segment; glob and brace imports keep the stem.
            let trimmed = written
                .trim_end_matches("::*")
                .split('{')
                .next()
                .unwrap_or(written)
                .trim_end_matches("::");
            let (qualifier, name) = split_callee(trimmed);
            if name.is_empty() {
                return;
            }
            let mut reference = RawReference::new(RawReferenceKind::Import, name, line_of(node));
            reference.qualifier = qualifier;
            self.extraction.references.push(reference);
        }
    }

    fn collect_references(&mut self, node: Node<'_>, scope: &Scope) {
        if node.kind() == "call_expression" {
            if let Some(callee) = node.child_by_field_name("function") {
                let written = text(callee, self.source);
                if let Some(key) = env_var_key(node, written, self.source) {
                    let mut reference =
                        RawReference::new(RawReferenceKind::EnvRead, key, line_of(node));
                    reference.enclosing = scope.enclosing;
                    self.extraction.references.push(reference);
                } else {
                    let cleaned = written.trim_start_matches("self.");
                    let (qualifier, name) = split_callee(cleaned);
                    if is_plausible_name(&name) {
                        let mut reference =
                            RawReference::new(RawReferenceKind::Call, name, line_of(node));
                        reference.qualifier = qualifier;
                        reference.enclosing = scope.enclosing;
                        self.extraction.references.push(reference);
                    }
                }
            }
        }
        if node.kind() == "struct_expression" {
            if let Some(name_node) = node.child_by_field_name("name") {
                let (qualifier, name) = split_callee(text(name_node, self.source));
                let mut reference =
                    RawReference::new(RawReferenceKind::TypeUse, name, line_of(node));
                reference.qualifier = qualifier;
                reference.enclosing = scope.enclosing;
                self.extraction.references.push(reference);
            }
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.collect_references(child, scope);
        }
    }

    fn name_of(&self, node: Node<'_>) -> Option<String> {
        node.child_by_field_name("name")
            .map(|n| text(n, self.source).to_string())
    }

    fn push_symbol(&mut self, node: Node<'_>, scope: &Scope, kind: SymbolKind, name: &str) -> usize {
        let mut draft = SymbolDraft::new(kind, name, scope.qualify(name));
        draft.line_start = line_of(node);
        draft.line_end = end_line_of(node);
        draft.signature = signature_of(node, self.source);
        draft.visibility = if has_pub(node) {
            Visibility::Public
        } else {
            Visibility::Private
        };
        self.extraction.symbols.push(draft);
        self.extraction.symbols.len() - 1
    }
}

fn has_pub(node: Node<'_>) -> bool {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .any(|c| c.kind() == "visibility_modifier")
}

/// `std::env::var("KEY")` and friends; returns the key literal.
fn env_var_key(call: Node<'_>, callee: &str, source: &str) -> Option<String> {
    let is_env = matches!(
        callee,
        "std::env::var" | "env::var" | "std::env::var_os" | "env::var_os"
    );
    if !is_env {
        return None;
    }
    let args = call.child_by_field_name("arguments")?;
    let mut cursor = args.walk();
    let first = args
        .children(&mut cursor)
        .find(|c| c.kind() == "string_literal")?;
    let key = unquote(text(first, source)).to_string();
    (!key.is_empty()).then_some(key)
}

fn is_plausible_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_')
}
