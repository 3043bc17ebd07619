//! Pattern extractor for JavaScript, TypeScript and Vue sources.
//!
//! There is no syntax tree here: an ordered battery of anchored regular
//! expressions, plus a small bracket scanner for the few places where a
//! balanced region has to be recovered (call arguments, object literals,
//! markup tags). Missing a construct is acceptable; every pattern requires a
//! syntactic anchor so that false positives stay bounded.

use crate::model::{
    ApiCall, Component, ComponentKind, FrontendExtraction, HookKind, HookUse, HttpMethod, Import,
    Language, LazyBinding, RouteDeclaration, RouteShape, SourceFile, StateBinding,
};
use crate::util::{compact_snippet, line_at, module_stem};
use crate::vocab::Vocabulary;
use regex::Regex;
use std::sync::OnceLock;

const MEMO_HOOKS: &[&str] = &["useMemo", "useCallback", "useRef", "computed"];

fn regex_function_component() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?m)^[ \t]*(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s+([A-Z][\w$]*)\s*(?:<[^>()]*>)?\s*\(",
        )
        .unwrap()
    })
}

fn regex_arrow_component() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?m)^[ \t]*(?:export\s+)?(?:const|let|var)\s+([A-Z][\w$]*)\s*(?::\s*[\w$.<>\[\], ]+?)?\s*=\s*(?:(?:React\.)?(?:memo|forwardRef)\s*\(\s*)?(?:async\s*)?(\(|[A-Za-z_$][\w$]*\s*=>)",
        )
        .unwrap()
    })
}

fn regex_class_component() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?m)^[ \t]*(?:export\s+)?(?:default\s+)?class\s+([A-Z][\w$]*)\s+extends\s+(?:React\.)?(?:Pure)?Component\b",
        )
        .unwrap()
    })
}

fn regex_vue_definition() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:export\s+default|defineComponent\s*\()\s*\{").unwrap())
}

fn regex_define_props() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bdefineProps\s*(<)?").unwrap())
}

fn regex_ts_member() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)(?:^|[{;,]\s*|\n\s*)([A-Za-z_$][\w$]*)\??\s*:").unwrap())
}

fn regex_tuple_state() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"\b(?:const|let|var)\s+\[\s*([A-Za-z_$][\w$]*)\s*(?:,\s*([A-Za-z_$][\w$]*)\s*)?\]\s*=\s*(?:React\.)?([A-Za-z_$][\w$]*)\s*(?:<[^>()]*>)?\s*\(",
        )
        .unwrap()
    })
}

fn regex_single_state() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"\b(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*(?::\s*[^=\n]+?)?\s*=\s*([A-Za-z_$][\w$]*)\s*(?:<[^>()]*>)?\s*\(",
        )
        .unwrap()
    })
}

fn regex_call_site() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b([A-Za-z_][\w$]*)\s*(?:<[^>()]*>)?\s*\(").unwrap())
}

fn regex_fetch() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"\bfetch\s*\(\s*["'`]"#).unwrap())
}

fn regex_verb_call() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"([A-Za-z_$][\w$]*)\s*\.\s*(get|post|put|delete|patch|head|options)\s*(?:<[^>()]*>)?\s*\(\s*["'`]"#,
        )
        .unwrap()
    })
}

fn regex_method_option() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"\bmethod\s*:\s*["'`]([A-Za-z]+)["'`]"#).unwrap())
}

fn regex_import() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?m)^[ \t]*import\s+(?:type\s+)?([^;]+?)\s+from\s+["']([^"']+)["']"#).unwrap()
    })
}

fn regex_lazy_binding() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"\b(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*=\s*(?:([\w$.]+)\s*\(\s*)?(?:async\s*)?\(\s*\)\s*=>\s*(?:\{\s*return\s+)?import\s*\(\s*["'`]([^"'`]+)["'`]"#,
        )
        .unwrap()
    })
}

fn regex_dynamic_import() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"\bimport\s*\(\s*["'`]([^"'`]+)["'`]"#).unwrap())
}

fn regex_route_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<(/)?Route\b").unwrap())
}

fn regex_path_key() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"["']?\bpath["']?\s*:\s*["'`]"#).unwrap())
}

fn regex_children_key() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bchildren\s*:\s*\[").unwrap())
}

pub struct HeuristicExtractor<'v> {
    vocab: &'v Vocabulary,
}

impl<'v> HeuristicExtractor<'v> {
    pub fn new(vocab: &'v Vocabulary) -> Self {
        Self { vocab }
    }

    pub fn extract(&self, file: &SourceFile) -> FrontendExtraction {
        let text = file.text.as_str();
        let mut extraction = FrontendExtraction {
            components: components(file),
            state: self.state_bindings(text),
            hooks: self.hook_uses(text),
            api_calls: self.api_calls(text),
            imports: imports(text),
            lazy_bindings: self.lazy_bindings(text),
            route_declarations: route_declarations(text),
            has_children: regex_children_key().is_match(text),
        };
        extraction.components.sort_by_key(|component| component.line);
        extraction
    }

    fn state_bindings(&self, text: &str) -> Vec<StateBinding> {
        let mut out = Vec::new();
        for caps in regex_tuple_state().captures_iter(text) {
            let hook = &caps[3];
            if !self.vocab.state_hooks.iter().any(|h| h == hook) {
                continue;
            }
            let whole = caps.get(0).map(|m| (m.start(), m.end())).unwrap_or((0, 0));
            out.push(StateBinding {
                name: caps[1].to_string(),
                setter: caps.get(2).map(|m| m.as_str().to_string()),
                hook: hook.to_string(),
                initial: call_argument_text(text, whole.1 - 1),
                line: line_at(text, whole.0),
            });
        }
        for caps in regex_single_state().captures_iter(text) {
            let hook = &caps[2];
            if !self.vocab.reactive_hooks.iter().any(|h| h == hook) {
                continue;
            }
            let whole = caps.get(0).map(|m| (m.start(), m.end())).unwrap_or((0, 0));
            out.push(StateBinding {
                name: caps[1].to_string(),
                setter: None,
                hook: hook.to_string(),
                initial: call_argument_text(text, whole.1 - 1),
                line: line_at(text, whole.0),
            });
        }
        out.sort_by_key(|binding| binding.line);
        out
    }

    fn hook_uses(&self, text: &str) -> Vec<HookUse> {
        let mut out = Vec::new();
        for caps in regex_call_site().captures_iter(text) {
            let Some(name_match) = caps.get(1) else {
                continue;
            };
            let name = name_match.as_str();
            if self.vocab.state_hooks.iter().any(|h| h == name)
                || self.vocab.reactive_hooks.iter().any(|h| h == name)
            {
                continue;
            }
            let kind = if self.vocab.composition_hooks.iter().any(|h| h == name) {
                HookKind::Injection
            } else if self.vocab.effect_hooks.iter().any(|h| h == name) {
                HookKind::Effect
            } else if MEMO_HOOKS.contains(&name) {
                HookKind::Memo
            } else if is_custom_hook(name) {
                HookKind::Custom
            } else {
                continue;
            };
            let before = &text[..name_match.start()];
            if before.trim_end().ends_with("function") {
                continue;
            }
            if before.ends_with('.') && !before.ends_with("React.") {
                continue;
            }
            let Some(whole) = caps.get(0) else {
                continue;
            };
            out.push(HookUse {
                hook: name.to_string(),
                kind,
                argument: call_argument_text(text, whole.end() - 1),
                line: line_at(text, name_match.start()),
            });
        }
        out
    }

    fn api_calls(&self, text: &str) -> Vec<ApiCall> {
        let mut out = Vec::new();
        for found in regex_fetch().find_iter(text) {
            let quote = found.end() - 1;
            let Some(url) = quoted_at(text, quote) else {
                continue;
            };
            let open = text[found.start()..]
                .find('(')
                .map(|offset| found.start() + offset);
            let method = open
                .and_then(|open| matching_close(text, open).map(|close| &text[open..close]))
                .and_then(|args| regex_method_option().captures(args))
                .and_then(|caps| HttpMethod::parse(&caps[1]))
                .unwrap_or(HttpMethod::Get);
            out.push(ApiCall {
                method,
                url,
                client: "fetch".to_string(),
                line: line_at(text, found.start()),
            });
        }
        for caps in regex_verb_call().captures_iter(text) {
            let client = &caps[1];
            if !self.vocab.is_http_client(client) {
                continue;
            }
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let Some(url) = quoted_at(text, whole.end() - 1) else {
                continue;
            };
            let Some(method) = HttpMethod::parse(&caps[2]) else {
                continue;
            };
            out.push(ApiCall {
                method,
                url,
                client: client.to_string(),
                line: line_at(text, whole.start()),
            });
        }
        out.sort_by_key(|call| call.line);
        out
    }

    fn lazy_bindings(&self, text: &str) -> Vec<LazyBinding> {
        let mut out = Vec::new();
        for caps in regex_lazy_binding().captures_iter(text) {
            if let Some(wrapper) = caps.get(2) {
                if !self.is_lazy_wrapper(wrapper.as_str()) {
                    continue;
                }
            }
            out.push(LazyBinding {
                name: caps[1].to_string(),
                source: Some(caps[3].to_string()),
            });
        }
        out
    }

    pub fn is_lazy_wrapper(&self, name: &str) -> bool {
        self.vocab.lazy_wrappers.iter().any(|wrapper| wrapper == name)
    }
}

fn is_custom_hook(name: &str) -> bool {
    name.len() > 3
        && name.starts_with("use")
        && name[3..].chars().next().is_some_and(|ch| ch.is_ascii_uppercase())
}

fn components(file: &SourceFile) -> Vec<Component> {
    let text = file.text.as_str();
    let mut out = Vec::new();
    for caps in regex_function_component().captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let params = matching_close(text, whole.end() - 1)
            .map(|close| &text[whole.end()..close])
            .unwrap_or("");
        out.push(Component {
            name: caps[1].to_string(),
            kind: ComponentKind::Function,
            props: destructured_props(params),
            line: line_at(text, whole.start()),
        });
    }
    for caps in regex_arrow_component().captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let props = if &caps[2] == "(" {
            let Some(close) = matching_close(text, whole.end() - 1) else {
                continue;
            };
            if !arrow_follows(&text[close + 1..]) {
                continue;
            }
            destructured_props(&text[whole.end()..close])
        } else {
            Vec::new()
        };
        out.push(Component {
            name: caps[1].to_string(),
            kind: ComponentKind::Arrow,
            props,
            line: line_at(text, whole.start()),
        });
    }
    for caps in regex_class_component().captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        out.push(Component {
            name: caps[1].to_string(),
            kind: ComponentKind::Class,
            props: Vec::new(),
            line: line_at(text, whole.start()),
        });
    }
    out.extend(vue_component(file));
    out
}

fn arrow_follows(rest: &str) -> bool {
    let window: String = rest.chars().take(160).collect();
    match window.find("=>") {
        Some(idx) => !window[..idx].contains([';', '{', '\n']) || window[..idx].trim().is_empty(),
        None => false,
    }
}

/// Names bound by a destructured first parameter: `({ a, b = 1, c: alias }: Props)`.
fn destructured_props(params: &str) -> Vec<String> {
    let trimmed = params.trim_start();
    if !trimmed.starts_with('{') {
        return Vec::new();
    }
    let offset = params.len() - trimmed.len();
    let Some(close) = matching_close(params, offset) else {
        return Vec::new();
    };
    object_entries(&params[offset + 1..close])
        .into_iter()
        .map(|(key, _)| key)
        .filter(|key| !key.starts_with("..."))
        .collect()
}

fn vue_component(file: &SourceFile) -> Option<Component> {
    let text = file.text.as_str();
    let definition = regex_vue_definition().find(text);
    if file.language != Language::Vue && definition.is_none_or(|m| !m.as_str().contains("defineComponent")) {
        return None;
    }
    let mut name = None;
    let mut props = Vec::new();
    let mut line = 1;
    if let Some(found) = definition {
        line = line_at(text, found.start());
        let open = found.end() - 1;
        if let Some(close) = matching_close(text, open) {
            let entries = object_entries(&text[open + 1..close]);
            for (key, value) in &entries {
                match key.as_str() {
                    "name" => name = unquote_js(value),
                    "props" => props = prop_names(value),
                    _ => {}
                }
            }
        }
    }
    if props.is_empty() {
        props = define_props(text);
    }
    let name = name.or_else(|| {
        if file.language == Language::Vue {
            module_stem(&file.path)
        } else {
            None
        }
    })?;
    Some(Component {
        name,
        kind: ComponentKind::Vue,
        props,
        line,
    })
}

/// Prop names from `['a', 'b']` or `{ a: String, b: { type: Number } }`.
fn prop_names(value: &str) -> Vec<String> {
    let value = value.trim();
    if value.starts_with('[') {
        return value
            .trim_start_matches('[')
            .trim_end_matches(']')
            .split(',')
            .filter_map(unquote_js)
            .collect();
    }
    if value.starts_with('{') {
        if let Some(close) = matching_close(value, 0) {
            return object_entries(&value[1..close])
                .into_iter()
                .map(|(key, _)| key)
                .collect();
        }
    }
    Vec::new()
}

fn define_props(text: &str) -> Vec<String> {
    let Some(caps) = regex_define_props().captures(text) else {
        return Vec::new();
    };
    let Some(whole) = caps.get(0) else {
        return Vec::new();
    };
    if caps.get(1).is_some() {
        // defineProps<{ a: string; b?: number }>()
        let rest = &text[whole.end()..];
        let Some(open) = rest.find('{') else {
            return Vec::new();
        };
        let Some(close) = matching_close(rest, open) else {
            return Vec::new();
        };
        let body = &rest[open..close];
        let mut names = Vec::new();
        for member in regex_ts_member().captures_iter(body) {
            let name = member[1].to_string();
            if !names.contains(&name) {
                names.push(name);
            }
        }
        return names;
    }
    let rest = &text[whole.end()..];
    let Some(open) = rest.find('(') else {
        return Vec::new();
    };
    let Some(close) = matching_close(rest, open) else {
        return Vec::new();
    };
    prop_names(&rest[open + 1..close])
}

fn imports(text: &str) -> Vec<Import> {
    let mut out = Vec::new();
    for caps in regex_import().captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        out.push(Import {
            source: caps[2].to_string(),
            names: import_names(&caps[1]),
            line: line_at(text, whole.start()),
        });
    }
    out
}

/// Local names bound by an import clause: default, `{ a, b as c }`, `* as ns`.
fn import_names(clause: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = clause.trim();
    if let Some(open) = rest.find('{') {
        let close = rest[open..].find('}').map(|idx| open + idx).unwrap_or(rest.len());
        for item in rest[open + 1..close].split(',') {
            let item = item.trim().trim_start_matches("type ").trim();
            if item.is_empty() {
                continue;
            }
            let local = item.rsplit(" as ").next().unwrap_or(item).trim();
            names.push(local.to_string());
        }
        let before = rest[..open].trim().trim_end_matches(',').trim();
        if !before.is_empty() {
            names.insert(0, before.to_string());
        }
        return names;
    }
    if let Some(idx) = rest.find("* as ") {
        let before = rest[..idx].trim().trim_end_matches(',').trim();
        if !before.is_empty() {
            names.push(before.to_string());
        }
        rest = rest[idx + 5..].trim();
    }
    if !rest.is_empty() {
        names.push(rest.to_string());
    }
    names
}

/// Raw route declarations of both shapes, with their nesting recorded.
pub fn route_declarations(text: &str) -> Vec<RouteDeclaration> {
    let mut out = markup_routes(text);
    out.extend(object_routes(text, out.len()));
    out
}

fn markup_routes(text: &str) -> Vec<RouteDeclaration> {
    let mut out = Vec::new();
    // `None` holds the place of an opening tag that could not be read, so its
    // closing tag pops the right entry.
    let mut stack: Vec<Option<usize>> = Vec::new();
    for caps in regex_route_tag().captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        if caps.get(1).is_some() {
            stack.pop();
            continue;
        }
        let Some((end, self_closing)) = tag_end(text, whole.end()) else {
            stack.push(None);
            continue;
        };
        let inner_end = if self_closing { end - 1 } else { end };
        let attrs = jsx_attributes(&text[whole.end()..inner_end]);
        let path = attrs
            .iter()
            .find(|(key, _)| key == "path")
            .and_then(|(_, value)| unquote_js(value));
        out.push(RouteDeclaration {
            shape: RouteShape::Markup,
            path,
            attrs,
            parent: stack.iter().rev().find_map(|entry| *entry),
            line: line_at(text, whole.start()),
        });
        if !self_closing {
            stack.push(Some(out.len() - 1));
        }
    }
    out
}

fn object_routes(text: &str, index_offset: usize) -> Vec<RouteDeclaration> {
    let spans = brace_spans(text);
    let mut routes: Vec<((usize, usize), RouteDeclaration)> = Vec::new();
    for found in regex_path_key().find_iter(text) {
        let Some(span) = innermost_span(&spans, found.start()) else {
            continue;
        };
        if routes.iter().any(|(existing, _)| *existing == span) {
            continue;
        }
        let attrs = object_entries(&text[span.0 + 1..span.1]);
        let Some(path) = attrs
            .iter()
            .find(|(key, _)| key == "path")
            .and_then(|(_, value)| unquote_js(value))
        else {
            continue;
        };
        if !attrs
            .iter()
            .any(|(key, _)| matches!(key.as_str(), "component" | "element" | "children"))
        {
            continue;
        }
        routes.push((
            span,
            RouteDeclaration {
                shape: RouteShape::Object,
                path: Some(path),
                attrs,
                parent: None,
                line: line_at(text, span.0),
            },
        ));
    }
    let spans: Vec<(usize, usize)> = routes.iter().map(|(span, _)| *span).collect();
    routes
        .into_iter()
        .map(|(span, mut route)| {
            route.parent = spans
                .iter()
                .enumerate()
                .filter(|(_, other)| other.0 < span.0 && span.1 < other.1)
                .max_by_key(|(_, other)| other.0)
                .map(|(idx, _)| idx + index_offset);
            route
        })
        .collect()
}

fn innermost_span(spans: &[(usize, usize)], offset: usize) -> Option<(usize, usize)> {
    spans
        .iter()
        .filter(|(open, close)| *open < offset && offset < *close)
        .max_by_key(|(open, _)| *open)
        .copied()
}

/// Import path of the first dynamic `import("...")` in a snippet.
pub fn dynamic_import_source(snippet: &str) -> Option<String> {
    regex_dynamic_import()
        .captures(snippet)
        .map(|caps| caps[1].to_string())
}

/// Strip one layer of JS quotes (`'`, `"` or backtick).
pub fn unquote_js(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let mut chars = trimmed.chars();
    let first = chars.next()?;
    if !matches!(first, '"' | '\'' | '`') || trimmed.len() < 2 || !trimmed.ends_with(first) {
        return None;
    }
    Some(trimmed[1..trimmed.len() - 1].to_string())
}

fn call_argument_text(text: &str, open: usize) -> Option<String> {
    let close = matching_close(text, open)?;
    compact_snippet(&text[open + 1..close], 120)
}

/// String literal content starting at the quote at `quote`.
fn quoted_at(text: &str, quote: usize) -> Option<String> {
    let end = skip_string(text.as_bytes(), quote);
    if end <= quote + 1 || end > text.len() {
        return None;
    }
    text.get(quote + 1..end - 1).map(str::to_string)
}

fn skip_string(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' if quote != b'`' => return i + 1,
            ch if ch == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn skip_comment(bytes: &[u8], start: usize) -> Option<usize> {
    if bytes.get(start) != Some(&b'/') {
        return None;
    }
    match bytes.get(start + 1) {
        Some(b'/') => {
            let mut i = start + 2;
            while i < bytes.len() && bytes[i] != b'\n' {
                i += 1;
            }
            Some(i)
        }
        Some(b'*') => {
            let mut i = start + 2;
            while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                i += 1;
            }
            Some((i + 2).min(bytes.len()))
        }
        _ => None,
    }
}

/// Index of the bracket closing the one at `open`, skipping strings and comments.
pub fn matching_close(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    if !matches!(bytes.get(open), Some(b'(' | b'{' | b'[')) {
        return None;
    }
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' | b'`' => {
                i = skip_string(bytes, i);
                continue;
            }
            b'/' => {
                if let Some(next) = skip_comment(bytes, i) {
                    i = next;
                    continue;
                }
            }
            b'(' | b'{' | b'[' => depth += 1,
            b')' | b'}' | b']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Every `{ ... }` pair in the text as `(open, close)` byte offsets.
fn brace_spans(text: &str) -> Vec<(usize, usize)> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut stack = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' | b'`' => {
                i = skip_string(bytes, i);
                continue;
            }
            b'/' => {
                if let Some(next) = skip_comment(bytes, i) {
                    i = next;
                    continue;
                }
            }
            b'{' => stack.push(i),
            b'}' => {
                if let Some(open) = stack.pop() {
                    spans.push((open, i));
                }
            }
            _ => {}
        }
        i += 1;
    }
    spans
}

/// Top-level `key: value` entries of an object literal body, values as source text.
pub fn object_entries(body: &str) -> Vec<(String, String)> {
    split_top_level(body, b',')
        .into_iter()
        .filter_map(|piece| {
            let piece = piece.trim();
            if piece.is_empty() {
                return None;
            }
            if piece.starts_with("...") {
                return Some((piece.to_string(), piece.to_string()));
            }
            match split_top_level(piece, b':').split_first() {
                Some((raw_key, rest)) if !rest.is_empty() => {
                    let value = piece[raw_key.len() + 1..].trim();
                    let key = raw_key.trim();
                    let key = unquote_js(key).unwrap_or_else(|| key.to_string());
                    Some((key, value.to_string()))
                }
                _ => {
                    let ident: String = piece
                        .chars()
                        .take_while(|ch| ch.is_alphanumeric() || *ch == '_' || *ch == '$')
                        .collect();
                    if ident.is_empty() {
                        None
                    } else {
                        Some((ident, piece.to_string()))
                    }
                }
            }
        })
        .collect()
}

fn split_top_level(text: &str, separator: u8) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut pieces = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' | b'`' => {
                i = skip_string(bytes, i);
                continue;
            }
            b'/' => {
                if let Some(next) = skip_comment(bytes, i) {
                    i = next;
                    continue;
                }
            }
            b'(' | b'{' | b'[' => depth += 1,
            b')' | b'}' | b']' => depth = depth.saturating_sub(1),
            ch if ch == separator && depth == 0 => {
                pieces.push(&text[start..i]);
                start = i + 1;
                if separator == b':' {
                    pieces.push(&text[start..]);
                    return pieces;
                }
            }
            _ => {}
        }
        i += 1;
    }
    pieces.push(&text[start..]);
    pieces
}

/// End of a markup tag whose name ends at `from`: offset just past `>` and whether it self-closes.
fn tag_end(text: &str, from: usize) -> Option<(usize, bool)> {
    let bytes = text.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                i = skip_string(bytes, i);
                continue;
            }
            b'{' => {
                i = matching_close(text, i)? + 1;
                continue;
            }
            b'>' => {
                let self_closing = i > from && bytes[i - 1] == b'/';
                return Some((i + 1, self_closing));
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Attributes of a markup tag body; string values keep their quotes, `{expr}` values are unwrapped.
fn jsx_attributes(body: &str) -> Vec<(String, String)> {
    let bytes = body.as_bytes();
    let mut attrs = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_whitespace() || bytes[i] == b'/' || bytes[i] == b'>' {
            i += 1;
            continue;
        }
        let name_start = i;
        while i < bytes.len()
            && (bytes[i].is_ascii_alphanumeric() || matches!(bytes[i], b'_' | b'-' | b':' | b'.'))
        {
            i += 1;
        }
        if i == name_start {
            if bytes[i] == b'{' {
                // spread attributes: {...props}
                match matching_close(body, i) {
                    Some(close) => i = close + 1,
                    None => break,
                }
            } else {
                i += 1;
            }
            continue;
        }
        let name = body[name_start..i].to_string();
        let mut j = i;
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        if j >= bytes.len() || bytes[j] != b'=' {
            attrs.push((name, "true".to_string()));
            continue;
        }
        j += 1;
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        if j >= bytes.len() {
            break;
        }
        match bytes[j] {
            b'"' | b'\'' => {
                let end = skip_string(bytes, j);
                attrs.push((name, body[j..end].to_string()));
                i = end;
            }
            b'{' => {
                let Some(close) = matching_close(body, j) else {
                    break;
                };
                attrs.push((name, body[j + 1..close].trim().to_string()));
                i = close + 1;
            }
            _ => {
                let start = j;
                while j < bytes.len() && !bytes[j].is_ascii_whitespace() {
                    j += 1;
                }
                attrs.push((name, body[start..j].to_string()));
                i = j;
            }
        }
    }
    attrs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(path: &str, language: Language, text: &str) -> FrontendExtraction {
        let vocab = Vocabulary::default();
        let file = SourceFile::new(path, language, text);
        HeuristicExtractor::new(&vocab).extract(&file)
    }

    #[test]
    fn matching_close_skips_strings_and_comments() {
        let text = "f(a, ')', /* ) */ {b: [1]})";
        assert_eq!(matching_close(text, 1), Some(text.len() - 1));
    }

    #[test]
    fn object_entries_split_at_top_level() {
        let entries = object_entries(" path: '/a,b', component: () => import('./A'), meta: { x: 1 }, name ");
        let keys: Vec<_> = entries.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["path", "component", "meta", "name"]);
        assert_eq!(entries[0].1, "'/a,b'");
        assert_eq!(entries[1].1, "() => import('./A')");
        assert_eq!(entries[2].1, "{ x: 1 }");
    }

    #[test]
    fn jsx_attributes_keep_string_quotes() {
        let attrs = jsx_attributes(r#" path="/pods" element={<PodList title="x" />} exact "#);
        assert_eq!(
            attrs,
            vec![
                ("path".to_string(), "\"/pods\"".to_string()),
                ("element".to_string(), "<PodList title=\"x\" />".to_string()),
                ("exact".to_string(), "true".to_string()),
            ]
        );
    }

    #[test]
    fn tuple_state_requires_known_hook() {
        let result = extract(
            "client/src/Pods.jsx",
            Language::Javascript,
            "const [pods, setPods] = useState([]);\nconst [a, b] = useThing(1);\nconst [n, dispatch] = React.useReducer(reducer, 0);\n",
        );
        let names: Vec<_> = result.state.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["pods", "n"]);
        assert_eq!(result.state[0].setter.as_deref(), Some("setPods"));
        assert_eq!(result.state[0].initial.as_deref(), Some("[]"));
        assert_eq!(result.state[1].hook, "useReducer");
    }

    #[test]
    fn arrow_component_needs_arrow() {
        let result = extract(
            "client/src/Nav.tsx",
            Language::Tsx,
            "export const Nav = ({ items, onSelect = noop }: Props) => {\n  return null;\n};\nconst API_URL = (process.env.URL || '/');\n",
        );
        assert_eq!(result.components.len(), 1);
        assert_eq!(result.components[0].name, "Nav");
        assert_eq!(result.components[0].props, vec!["items", "onSelect"]);
    }

    #[test]
    fn import_names_cover_each_clause_form() {
        assert_eq!(import_names("React, { useState, lazy as l }"), vec!["React", "useState", "l"]);
        assert_eq!(import_names("* as api"), vec!["api"]);
        assert_eq!(import_names("PodList"), vec!["PodList"]);
    }

    #[test]
    fn markup_routes_track_nesting() {
        let text = r#"
<Routes>
  <Route element={<AppLayout />}>
    <Route path="/pods" element={<PodList />} />
  </Route>
  <Route path="/login" component={Login} />
</Routes>
"#;
        let routes = route_declarations(text);
        assert_eq!(routes.len(), 3);
        assert_eq!(routes[0].path, None);
        assert_eq!(routes[1].path.as_deref(), Some("/pods"));
        assert_eq!(routes[1].parent, Some(0));
        assert_eq!(routes[2].parent, None);
        assert_eq!(routes[2].attr("component"), Some("Login"));
    }

    #[test]
    fn unreadable_route_tag_keeps_siblings_under_their_parent() {
        let text = r#"
<Route element={<Shell />}>
  <Route path="/admin" element={<Admin /> >
    <Route path="users" element={<Users />} />
  </Route>
  <Route path="/login" element={<Login />} />
</Route>
"#;
        let routes = route_declarations(text);
        let found: Vec<_> = routes
            .iter()
            .map(|r| (r.path.as_deref(), r.parent))
            .collect();
        assert_eq!(
            found,
            vec![(None, None), (Some("users"), Some(0)), (Some("/login"), Some(0))]
        );
    }

    #[test]
    fn object_routes_require_component_or_children() {
        let text = r#"
const routes = [
  { path: '/', component: Layout, children: [
      { path: 'pods', component: PodList },
  ]},
  { path: '/about', name: 'about' },
];
"#;
        let routes = route_declarations(text);
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].path.as_deref(), Some("/"));
        assert_eq!(routes[1].path.as_deref(), Some("pods"));
        assert_eq!(routes[1].parent, Some(0));
    }

    #[test]
    fn lazy_bindings_respect_wrapper_vocabulary() {
        let result = extract(
            "client/src/router/index.js",
            Language::Javascript,
            "const Pods = lazy(() => import('./Pods'));\nconst About = () => import('./About.vue');\nconst X = memoize(() => import('./X'));\n",
        );
        let names: Vec<_> = result.lazy_bindings.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["Pods", "About"]);
    }
}
