//! Structural parser for Python sources built on tree-sitter.
//!
//! One walk over the syntax tree yields the symbol table. Classes push a
//! scope so their methods carry an enclosing-class reference; functions
//! nested in other functions are not separate symbols.

use crate::error::AnalysisError;
use crate::model::{
    DataModel, KeywordArg, Marker, ModelField, Param, ParamKind, SourceFile, Span, Symbol,
    SymbolKind, TestCase,
};
use crate::vocab::Vocabulary;
use anyhow::Result;
use std::path::Path;
use tree_sitter::{Node, Parser, Tree};

#[derive(Clone)]
struct Context {
    module: String,
    class_stack: Vec<String>,
}

pub struct PythonParser {
    parser: Parser,
}

impl PythonParser {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        let language = tree_sitter_python::LANGUAGE;
        parser.set_language(&language.into())?;
        Ok(Self { parser })
    }

    pub fn parse<'a>(&mut self, file: &'a SourceFile) -> Result<ParsedModule<'a>, AnalysisError> {
        let source = file.text.as_str();
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| AnalysisError::parse(&file.path, None, "parser produced no tree"))?;
        let root = tree.root_node();
        if root.has_error() {
            let (line, message) = first_error(root, source);
            return Err(AnalysisError::parse(&file.path, line, message));
        }
        let ctx = Context {
            module: module_name_from_rel_path(&file.path),
            class_stack: Vec::new(),
        };
        let mut symbols = Vec::new();
        walk_node(root, &ctx, &[], file, &mut symbols);
        Ok(ParsedModule {
            file,
            tree,
            symbols,
        })
    }
}

/// A successfully parsed Python file together with its symbol table.
pub struct ParsedModule<'a> {
    pub file: &'a SourceFile,
    tree: Tree,
    pub symbols: Vec<Symbol>,
}

impl<'a> ParsedModule<'a> {
    pub fn source(&self) -> &'a str {
        &self.file.text
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// The `function_definition` / `class_definition` node a symbol was built from.
    pub fn definition(&self, symbol: &Symbol) -> Option<Node<'_>> {
        let kind = match symbol.kind {
            SymbolKind::Function => "function_definition",
            SymbolKind::Class => "class_definition",
        };
        let mut node = self
            .root()
            .descendant_for_byte_range(symbol.span.start_byte, symbol.span.end_byte)?;
        loop {
            if node.kind() == kind
                && node.start_byte() == symbol.span.start_byte
                && node.end_byte() == symbol.span.end_byte
            {
                return Some(node);
            }
            node = node.parent()?;
        }
    }

    /// The body block of a symbol's definition.
    pub fn body(&self, symbol: &Symbol) -> Option<Node<'_>> {
        self.definition(symbol)?.child_by_field_name("body")
    }

    pub fn functions(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter().filter(|symbol| symbol.is_function())
    }
}

fn first_error(root: Node<'_>, source: &str) -> (Option<usize>, String) {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            let line = node.start_position().row + 1;
            let message = if node.is_missing() {
                format!("missing `{}`", node.kind())
            } else {
                let text = node_text(node, source);
                let snippet = crate::util::compact_snippet(&text, 40).unwrap_or_default();
                format!("syntax error near `{snippet}`")
            };
            return (Some(line), message);
        }
        if node.has_error() {
            let mut cursor = node.walk();
            let children: Vec<_> = node.children(&mut cursor).collect();
            for child in children.into_iter().rev() {
                stack.push(child);
            }
        }
    }
    (None, "syntax error".to_string())
}

pub fn module_name_from_rel_path(rel_path: &str) -> String {
    let path = Path::new(rel_path);
    let mut parts: Vec<String> = path
        .components()
        .filter_map(|comp| comp.as_os_str().to_str().map(|s| s.to_string()))
        .collect();
    if parts.is_empty() {
        return "__init__".to_string();
    }
    let file = parts.pop().unwrap_or_default();
    let stem = Path::new(&file)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(&file)
        .to_string();
    if stem != "__init__" {
        parts.push(stem);
    }
    if parts.is_empty() {
        "__init__".to_string()
    } else {
        parts.join(".")
    }
}

fn walk_node(
    node: Node<'_>,
    ctx: &Context,
    decorators: &[Node<'_>],
    file: &SourceFile,
    output: &mut Vec<Symbol>,
) {
    let source = file.text.as_str();
    match node.kind() {
        "decorated_definition" => {
            let mut found = Vec::new();
            let mut definition = None;
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                if child.kind() == "decorator" {
                    found.push(child);
                } else if matches!(child.kind(), "function_definition" | "class_definition") {
                    definition = Some(child);
                }
            }
            if let Some(definition) = definition {
                walk_node(definition, ctx, &found, file, output);
            }
        }
        "class_definition" => {
            let Some(name_node) = node.child_by_field_name("name") else {
                return;
            };
            let name = node_text(name_node, source);
            let qualname = build_qualname(&ctx.module, &ctx.class_stack, &name);
            let bases = node
                .child_by_field_name("superclasses")
                .map(|list| superclass_names(list, source))
                .unwrap_or_default();
            output.push(Symbol {
                name: name.clone(),
                qualname,
                kind: SymbolKind::Class,
                enclosing_class: enclosing_class(ctx),
                is_async: false,
                params: Vec::new(),
                returns: None,
                docstring: node
                    .child_by_field_name("body")
                    .and_then(|body| extract_docstring(body, source)),
                markers: markers_from_decorators(decorators, source),
                bases,
                calls: Vec::new(),
                file: file.path.clone(),
                span: span(node),
            });
            let mut next_ctx = ctx.clone();
            next_ctx.class_stack.push(name);
            if let Some(body) = node.child_by_field_name("body") {
                walk_block(body, &next_ctx, file, output);
            }
        }
        "function_definition" => {
            let Some(name_node) = node.child_by_field_name("name") else {
                return;
            };
            let name = node_text(name_node, source);
            let body = node.child_by_field_name("body");
            output.push(Symbol {
                qualname: build_qualname(&ctx.module, &ctx.class_stack, &name),
                name,
                kind: SymbolKind::Function,
                enclosing_class: enclosing_class(ctx),
                is_async: is_async_definition(node),
                params: node
                    .child_by_field_name("parameters")
                    .map(|params| extract_params(params, source))
                    .unwrap_or_default(),
                returns: node
                    .child_by_field_name("return_type")
                    .map(|ret| node_text(ret, source)),
                docstring: body.and_then(|body| extract_docstring(body, source)),
                markers: markers_from_decorators(decorators, source),
                bases: Vec::new(),
                calls: body
                    .map(|body| collect_calls(body, source))
                    .unwrap_or_default(),
                file: file.path.clone(),
                span: span(node),
            });
        }
        _ => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                walk_node(child, ctx, &[], file, output);
            }
        }
    }
}

fn walk_block(node: Node<'_>, ctx: &Context, file: &SourceFile, output: &mut Vec<Symbol>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        walk_node(child, ctx, &[], file, output);
    }
}

fn enclosing_class(ctx: &Context) -> Option<String> {
    if ctx.class_stack.is_empty() {
        None
    } else {
        Some(container_qualname(&ctx.module, &ctx.class_stack))
    }
}

fn is_async_definition(node: Node<'_>) -> bool {
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .take_while(|child| child.kind() != "def")
        .any(|child| child.kind() == "async");
    found
}

fn superclass_names(node: Node<'_>, source: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == "keyword_argument" {
            continue;
        }
        let base = node_text(child, source);
        if !base.is_empty() {
            out.push(base);
        }
    }
    out
}

fn extract_params(node: Node<'_>, source: &str) -> Vec<Param> {
    let mut params = Vec::new();
    let mut keyword_only = false;
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        let positional_kind = if keyword_only {
            ParamKind::KeywordOnly
        } else {
            ParamKind::Positional
        };
        match child.kind() {
            "identifier" => params.push(Param {
                name: node_text(child, source),
                annotation: None,
                default: None,
                required: true,
                kind: positional_kind,
            }),
            "typed_parameter" => {
                let annotation = child
                    .child_by_field_name("type")
                    .map(|ty| node_text(ty, source));
                let Some(inner) = child.named_child(0) else {
                    continue;
                };
                let (name, kind) = splat_name(inner, source, positional_kind);
                if kind == ParamKind::VarPositional {
                    keyword_only = true;
                }
                params.push(Param {
                    name,
                    annotation,
                    default: None,
                    required: kind == ParamKind::Positional || kind == ParamKind::KeywordOnly,
                    kind,
                });
            }
            "default_parameter" | "typed_default_parameter" => {
                let name = child
                    .child_by_field_name("name")
                    .map(|n| node_text(n, source))
                    .unwrap_or_default();
                params.push(Param {
                    name,
                    annotation: child
                        .child_by_field_name("type")
                        .map(|ty| node_text(ty, source)),
                    default: child
                        .child_by_field_name("value")
                        .map(|value| node_text(value, source)),
                    required: false,
                    kind: positional_kind,
                });
            }
            "list_splat_pattern" | "dictionary_splat_pattern" => {
                let (name, kind) = splat_name(child, source, positional_kind);
                if kind == ParamKind::VarPositional {
                    keyword_only = true;
                }
                params.push(Param {
                    name,
                    annotation: None,
                    default: None,
                    required: false,
                    kind,
                });
            }
            "keyword_separator" => keyword_only = true,
            _ => {}
        }
    }
    params
}

fn splat_name(node: Node<'_>, source: &str, fallback: ParamKind) -> (String, ParamKind) {
    let text = node_text(node, source);
    match node.kind() {
        "list_splat_pattern" => (text.trim_start_matches('*').to_string(), ParamKind::VarPositional),
        "dictionary_splat_pattern" => {
            (text.trim_start_matches('*').to_string(), ParamKind::VarKeyword)
        }
        _ => (text, fallback),
    }
}

fn markers_from_decorators(decorators: &[Node<'_>], source: &str) -> Vec<Marker> {
    decorators
        .iter()
        .filter_map(|decorator| marker_from_decorator(*decorator, source))
        .collect()
}

fn marker_from_decorator(node: Node<'_>, source: &str) -> Option<Marker> {
    let expr = node.named_child(0)?;
    let line = node.start_position().row + 1;
    if expr.kind() == "call" {
        let function = expr.child_by_field_name("function")?;
        let (args, kwargs) = call_arguments(expr, source);
        return Some(Marker {
            name: node_text(function, source),
            attribute: attribute_name(function, source),
            is_call: true,
            args,
            kwargs,
            line,
        });
    }
    Some(Marker {
        name: node_text(expr, source),
        attribute: attribute_name(expr, source),
        is_call: false,
        args: Vec::new(),
        kwargs: Vec::new(),
        line,
    })
}

/// Positional and keyword arguments of a call, each kept as source text.
pub fn call_arguments(node: Node<'_>, source: &str) -> (Vec<String>, Vec<KeywordArg>) {
    let mut positional = Vec::new();
    let mut keywords = Vec::new();
    let Some(args) = node.child_by_field_name("arguments") else {
        return (positional, keywords);
    };
    let mut cursor = args.walk();
    for child in args.named_children(&mut cursor) {
        if child.kind() == "comment" {
            continue;
        }
        if child.kind() == "keyword_argument" {
            if let (Some(name_node), Some(value_node)) = (
                child.child_by_field_name("name"),
                child.child_by_field_name("value"),
            ) {
                keywords.push(KeywordArg {
                    name: node_text(name_node, source),
                    value: node_text(value_node, source),
                });
            }
            continue;
        }
        positional.push(node_text(child, source));
    }
    (positional, keywords)
}

fn attribute_name(node: Node<'_>, source: &str) -> Option<String> {
    if node.kind() != "attribute" {
        return None;
    }
    node.child_by_field_name("attribute")
        .map(|attr| node_text(attr, source))
}

fn collect_calls(body: Node<'_>, source: &str) -> Vec<String> {
    let mut calls = Vec::new();
    let mut stack = vec![body];
    while let Some(node) = stack.pop() {
        if node.kind() == "call" {
            if let Some(function) = node.child_by_field_name("function") {
                let raw = node_text(function, source);
                if is_simple_call_target(&raw) {
                    calls.push(raw);
                }
            }
        }
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            stack.push(child);
        }
    }
    calls.sort();
    calls.dedup();
    calls
}

fn is_simple_call_target(raw: &str) -> bool {
    !raw.is_empty()
        && raw
            .chars()
            .all(|ch| ch.is_alphanumeric() || ch == '_' || ch == '.')
}

/// Classes deriving from a configured model base, with their annotated fields.
pub fn extract_models(module: &ParsedModule<'_>, vocab: &Vocabulary) -> Vec<DataModel> {
    let source = module.source();
    let mut models = Vec::new();
    for symbol in &module.symbols {
        if symbol.kind != SymbolKind::Class {
            continue;
        }
        if !symbol.bases.iter().any(|base| vocab.is_model_base(base)) {
            continue;
        }
        let mut fields = Vec::new();
        if let Some(body) = module.body(symbol) {
            let mut cursor = body.walk();
            for statement in body.named_children(&mut cursor) {
                if statement.kind() != "expression_statement" {
                    continue;
                }
                let Some(assignment) = statement.named_child(0) else {
                    continue;
                };
                if assignment.kind() != "assignment" {
                    continue;
                }
                let (Some(left), Some(annotation)) = (
                    assignment.child_by_field_name("left"),
                    assignment.child_by_field_name("type"),
                ) else {
                    continue;
                };
                if left.kind() != "identifier" {
                    continue;
                }
                fields.push(ModelField {
                    name: node_text(left, source),
                    annotation: node_text(annotation, source),
                    default: assignment
                        .child_by_field_name("right")
                        .map(|value| node_text(value, source)),
                });
            }
        }
        models.push(DataModel {
            name: symbol.name.clone(),
            qualname: symbol.qualname.clone(),
            bases: symbol.bases.clone(),
            fields,
            file: symbol.file.clone(),
            line: symbol.line(),
        });
    }
    models
}

/// `test_*` functions together with the number of assertions in their body.
pub fn extract_tests(module: &ParsedModule<'_>) -> Vec<TestCase> {
    let source = module.source();
    let mut tests = Vec::new();
    for symbol in module.functions() {
        if !symbol.name.starts_with("test") {
            continue;
        }
        let assertions = module
            .body(symbol)
            .map(|body| count_assertions(body, source))
            .unwrap_or(0);
        tests.push(TestCase {
            name: symbol.name.clone(),
            qualname: symbol.qualname.clone(),
            enclosing_class: symbol.enclosing_class.clone(),
            assertions,
            file: symbol.file.clone(),
            line: symbol.line(),
        });
    }
    tests
}

fn count_assertions(body: Node<'_>, source: &str) -> usize {
    let mut count = 0;
    let mut stack = vec![body];
    while let Some(node) = stack.pop() {
        match node.kind() {
            "assert_statement" => count += 1,
            "call" => {
                if let Some(function) = node.child_by_field_name("function") {
                    let raw = node_text(function, source);
                    let last = raw.rsplit('.').next().unwrap_or(&raw);
                    if last.starts_with("assert") || raw == "pytest.raises" {
                        count += 1;
                    }
                }
            }
            _ => {}
        }
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            stack.push(child);
        }
    }
    count
}

fn span(node: Node<'_>) -> Span {
    Span {
        start_line: node.start_position().row + 1,
        end_line: node.end_position().row + 1,
        start_byte: node.start_byte(),
        end_byte: node.end_byte(),
    }
}

fn build_qualname(module: &str, class_stack: &[String], name: &str) -> String {
    if class_stack.is_empty() {
        format!("{module}.{name}")
    } else {
        format!("{module}.{}.{}", class_stack.join("."), name)
    }
}

fn container_qualname(module: &str, class_stack: &[String]) -> String {
    if class_stack.is_empty() {
        module.to_string()
    } else {
        format!("{module}.{}", class_stack.join("."))
    }
}

pub fn node_text(node: Node<'_>, source: &str) -> String {
    let start = node.start_byte();
    let end = node.end_byte();
    source.get(start..end).unwrap_or("").trim().to_string()
}

fn extract_docstring(node: Node<'_>, source: &str) -> Option<String> {
    let mut cursor = node.walk();
    let mut children = node.named_children(&mut cursor);
    let first = children.next()?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let string_node = first.named_child(0)?;
    if string_node.kind() != "string" {
        return None;
    }
    let raw = node_text(string_node, source);
    unquote_string_literal(&raw).map(|doc| doc.trim().to_string())
}

/// Strip prefix letters and quotes from a Python string literal.
pub fn unquote_string_literal(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let mut idx = 0;
    for (offset, ch) in trimmed.char_indices() {
        if ch.is_ascii_alphabetic() {
            idx = offset + ch.len_utf8();
        } else {
            break;
        }
    }
    if idx > 2 {
        return None;
    }
    let rest = &trimmed[idx..];
    if rest.starts_with("'''") && rest.ends_with("'''") && rest.len() >= 6 {
        return Some(rest[3..rest.len() - 3].to_string());
    }
    if rest.starts_with("\"\"\"") && rest.ends_with("\"\"\"") && rest.len() >= 6 {
        return Some(rest[3..rest.len() - 3].to_string());
    }
    if rest.starts_with('"') && rest.ends_with('"') && rest.len() >= 2 {
        return Some(rest[1..rest.len() - 1].to_string());
    }
    if rest.starts_with('\'') && rest.ends_with('\'') && rest.len() >= 2 {
        return Some(rest[1..rest.len() - 1].to_string());
    }
    None
}

/// Elements of a Python list/tuple literal written as source text.
pub fn literal_items(raw: &str) -> Option<Vec<String>> {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .or_else(|| {
            trimmed
                .strip_prefix('(')
                .and_then(|rest| rest.strip_suffix(')'))
        })?;
    Some(
        inner
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| unquote_string_literal(item).unwrap_or_else(|| item.to_string()))
            .collect(),
    )
}
