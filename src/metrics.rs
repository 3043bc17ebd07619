use crate::model::{ComplexityMetrics, Language, LineMetrics};
use tree_sitter::Node;

/// Structural metrics for one function subtree.
///
/// Pure over the node: no I/O, no state shared between calls, so symbols can
/// be scored in any order or in parallel.
pub fn score_function(node: Node<'_>, parameters: usize) -> ComplexityMetrics {
    let mut counts = Counts::default();
    count_nodes(node, &mut counts);
    ComplexityMetrics {
        cyclomatic: 1 + counts.branches + counts.loops + counts.boolean_operators,
        cognitive: counts.cognitive,
        nesting: max_nesting(node, 0),
        statements: counts.statements,
        parameters: parameters as u32,
    }
}

#[derive(Default)]
struct Counts {
    branches: u32,
    loops: u32,
    boolean_operators: u32,
    cognitive: u32,
    statements: u32,
}

fn count_nodes(node: Node<'_>, counts: &mut Counts) {
    match node.kind() {
        "if_statement" => {
            counts.branches += 1;
            counts.cognitive += 1;
            if has_alternative(node) {
                counts.cognitive += 1;
            }
        }
        "elif_clause" => {
            counts.branches += 1;
            counts.cognitive += 1;
            if followed_by_branch(node) {
                counts.cognitive += 1;
            }
        }
        "for_statement" | "while_statement" => {
            counts.loops += 1;
            counts.cognitive += 2;
        }
        // `a and b and c` nests two binary nodes, one per extra operand.
        "boolean_operator" => counts.boolean_operators += 1,
        "expression_statement" | "return_statement" => counts.statements += 1,
        _ => {}
    }
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        count_nodes(child, counts);
    }
}

fn has_alternative(node: Node<'_>) -> bool {
    let mut cursor = node.walk();
    let found = node
        .children_by_field_name("alternative", &mut cursor)
        .next()
        .is_some();
    found
}

fn followed_by_branch(node: Node<'_>) -> bool {
    matches!(
        node.next_named_sibling().map(|sibling| sibling.kind()),
        Some("elif_clause" | "else_clause")
    )
}

fn opens_block(kind: &str) -> bool {
    matches!(
        kind,
        "if_statement" | "for_statement" | "while_statement" | "try_statement"
    )
}

/// An `elif` is an `if` inside the previous branch's else, so each one in a
/// chain sits one level deeper, and the trailing `else` shares the last depth.
fn max_nesting(node: Node<'_>, depth: u32) -> u32 {
    let mut deepest = depth;
    let mut chain = 0;
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        let child_depth = match child.kind() {
            "elif_clause" => {
                chain += 1;
                depth + chain
            }
            "else_clause" => depth + chain,
            kind if opens_block(kind) => depth + 1,
            _ => depth,
        };
        deepest = deepest.max(max_nesting(child, child_depth));
    }
    deepest
}

pub fn compute_file_metrics(source: &str, language: Language) -> LineMetrics {
    let mut total = 0;
    let mut blank = 0;
    let mut comment = 0;
    let mut code = 0;
    let (line_comment, block_start, block_end) = comment_style(language);
    let mut in_block_comment = false;

    for line in source.lines() {
        total += 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            blank += 1;
            continue;
        }
        if in_block_comment {
            comment += 1;
            if let Some(end) = block_end {
                if trimmed.contains(end) {
                    in_block_comment = false;
                }
            }
            continue;
        }
        if let Some(prefix) = line_comment {
            if trimmed.starts_with(prefix) {
                comment += 1;
                continue;
            }
        }
        if let Some(start) = block_start {
            if trimmed.starts_with(start) {
                comment += 1;
                if let Some(end) = block_end {
                    if !trimmed[start.len()..].contains(end) {
                        in_block_comment = true;
                    }
                }
                continue;
            }
        }
        code += 1;
    }
    LineMetrics {
        total,
        code,
        comment,
        blank,
    }
}

/// Keyword-count complexity for text that has no syntax tree.
pub fn keyword_complexity(language: Language, snippet: &str) -> u32 {
    let (keywords, operators) = match language {
        Language::Python => (
            &["if", "elif", "for", "while", "except", "case", "and", "or", "with"][..],
            &[][..],
        ),
        Language::Javascript | Language::Typescript | Language::Tsx | Language::Vue => (
            &["if", "for", "while", "case", "catch", "switch"][..],
            &["&&", "||", "?"][..],
        ),
        Language::Yaml => (&[][..], &[][..]),
    };
    let keyword_hits = count_keyword_hits(snippet, keywords);
    let operator_hits = count_operator_hits(snippet, operators);
    1 + keyword_hits + operator_hits
}

fn count_keyword_hits(snippet: &str, keywords: &[&str]) -> u32 {
    if keywords.is_empty() {
        return 0;
    }
    let mut count = 0;
    let mut token = String::new();
    for ch in snippet.chars() {
        if ch.is_alphanumeric() || ch == '_' {
            token.push(ch);
        } else if !token.is_empty() {
            if keywords.contains(&token.as_str()) {
                count += 1;
            }
            token.clear();
        }
    }
    if !token.is_empty() && keywords.contains(&token.as_str()) {
        count += 1;
    }
    count
}

fn count_operator_hits(snippet: &str, operators: &[&str]) -> u32 {
    let mut count = 0;
    for op in operators {
        // `?.` and `??` are not branches.
        if *op == "?" {
            count += snippet
                .match_indices('?')
                .filter(|(idx, _)| {
                    let next = snippet[idx + 1..].chars().next();
                    let prev = snippet[..*idx].chars().next_back();
                    next != Some('.') && next != Some('?') && prev != Some('?')
                })
                .count() as u32;
            continue;
        }
        count += snippet.matches(op).count() as u32;
    }
    count
}

fn comment_style(
    language: Language,
) -> (
    Option<&'static str>,
    Option<&'static str>,
    Option<&'static str>,
) {
    match language {
        Language::Python | Language::Yaml => (Some("#"), None, None),
        Language::Javascript | Language::Typescript | Language::Tsx => {
            (Some("//"), Some("/*"), Some("*/"))
        }
        Language::Vue => (Some("//"), Some("<!--"), Some("-->")),
    }
}
