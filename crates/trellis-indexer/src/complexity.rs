//! Cognitive complexity scoring.
//!
//! Language-agnostic walk over the tree-sitter tree: control flow pays one
//! point plus the current nesting depth and deepens the nesting for its
//! children, continuations (else/elif/arms) pay a flat point, jumps and
//! boolean operators pay a point each, and self-recursion pays a point. When
//! no syntax tree is available an indentation heuristic approximates the same
//! signal.

use tree_sitter::Node;

const CONTROL: &[&str] = &[
    "if_statement",
    "if_expression",
    "for_statement",
    "for_expression",
    "for_in_statement",
    "enhanced_for_statement",
    "while_statement",
    "while_expression",
    "do_statement",
    "loop_expression",
    "match_expression",
    "switch_statement",
    "switch_expression",
    "conditional_expression",
    "ternary_expression",
    "catch_clause",
    "except_clause",
];

const CONTINUATION: &[&str] = &[
    "else_clause",
    "elif_clause",
    "match_arm",
    "switch_case",
    "case_clause",
];

const JUMPS: &[&str] = &[
    "break_statement",
    "break_expression",
    "continue_statement",
    "continue_expression",
    "goto_statement",
];

const CALLS: &[&str] = &["call_expression", "call", "method_invocation"];

const BOOL_OPS: &[&str] = &["&&", "||", "and", "or", "??"];

/// Score one function or method definition node. `name` is the symbol's own
/// name, used to spot self-recursion.
pub fn score_function(node: Node<'_>, source: &str, name: &str) -> f64 {
    let mut score = 1.0;
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk(child, source, name, 0, &mut score);
    }
    score
}

fn walk(node: Node<'_>, source: &str, name: &str, depth: u32, score: &mut f64) {
    let kind = node.kind();
    let mut child_depth = depth;

    if CONTROL.contains(&kind) {
        *score += 1.0 + f64::from(depth);
        child_depth = depth + 1;
    } else if CONTINUATION.contains(&kind) {
        *score += 1.0;
    } else if JUMPS.contains(&kind) {
        *score += 1.0;
    } else if is_boolean_operator(node, source) {
        *score += 1.0;
    } else if is_self_call(node, source, name) {
        *score += 1.0;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk(child, source, name, child_depth, score);
    }
}

fn is_boolean_operator(node: Node<'_>, source: &str) -> bool {
    match node.kind() {
        "boolean_operator" => true,
        "binary_expression" => node
            .child_by_field_name("operator")
            .and_then(|op| op.utf8_text(source.as_bytes()).ok())
            .is_some_and(|op| BOOL_OPS.contains(&op)),
        _ => false,
    }
}

fn is_self_call(node: Node<'_>, source: &str, name: &str) -> bool {
    if !CALLS.contains(&node.kind()) {
        return false;
    }
    let callee = node
        .child_by_field_name("function")
        .or_else(|| node.child_by_field_name("name"));
    callee
        .and_then(|c| c.utf8_text(source.as_bytes()).ok())
        .is_some_and(|text| {
            text == name || text.ends_with(&format!(".{name}")) || text.ends_with(&format!("::{name}"))
        })
}

/// Indentation-based approximation for bodies with no usable syntax tree:
/// twice the deepest indent level, plus boolean operators, plus extra
/// returns.
pub fn indentation_score(body: &str) -> f64 {
    let mut max_indent: u32 = 0;
    let mut bool_ops: u32 = 0;
    let mut returns: u32 = 0;

    for line in body.lines() {
        let trimmed = line.trim_start();
        if trimmed.is_empty() {
            continue;
        }
        let mut level: u32 = 0;
        let mut spaces: u32 = 0;
        for ch in line.chars() {
            match ch {
                ' ' => spaces += 1,
                '\t' => level += 1,
                _ => break,
            }
        }
        level += spaces / 4;
        max_indent = max_indent.max(level);

        bool_ops += count_occurrences(trimmed, "&&")
            + count_occurrences(trimmed, "||")
            + count_occurrences(trimmed, " and ")
            + count_occurrences(trimmed, " or ");
        if trimmed.starts_with("return") {
            returns += 1;
        }
    }

    1.0 + f64::from(max_indent * 2) + f64::from(bool_ops) + f64::from(returns.saturating_sub(1))
}

fn count_occurrences(haystack: &str, needle: &str) -> u32 {
    haystack.matches(needle).count() as u32
}
