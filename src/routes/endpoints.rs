//! Decides which Python functions are network-exposed and describes them.

use crate::analyzer::http;
use crate::analyzer::python::{ParsedModule, call_arguments, literal_items, node_text, unquote_string_literal};
use crate::model::{
    Endpoint, EndpointParam, HttpMethod, Marker, ParamKind, ParamSource, ResponseDescriptor,
    Symbol, WebsocketEndpoint, WebsocketHandlers,
};
use crate::vocab::{MarkerRole, Vocabulary};
use std::collections::BTreeSet;
use tree_sitter::Node;

pub fn classify_module(module: &ParsedModule<'_>, vocab: &Vocabulary) -> Vec<Endpoint> {
    module
        .functions()
        .filter_map(|symbol| classify(symbol, module.body(symbol), module.source(), vocab))
        .collect()
}

/// Build an [`Endpoint`] when the symbol carries a route marker.
///
/// The first route marker wins; any later ones are reported as middleware.
pub fn classify(
    symbol: &Symbol,
    body: Option<Node<'_>>,
    source: &str,
    vocab: &Vocabulary,
) -> Option<Endpoint> {
    if !symbol.is_function() {
        return None;
    }
    let route_idx = route_marker_index(symbol, vocab, MarkerRole::Route)?;
    let route = &symbol.markers[route_idx];

    let method = route_method(route);
    let path = route_path(route);
    let (auth_required, security) = auth_evidence(symbol, route, vocab);
    let middleware = symbol
        .markers
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != route_idx)
        .map(|(_, marker)| marker.name.clone())
        .collect();
    let path_params = http::backend_path_params(&path);
    let params = endpoint_params(symbol, &path_params, vocab);
    let responses = responses(symbol, route, body, source, vocab);

    Some(Endpoint {
        method,
        path,
        handler: symbol.name.clone(),
        qualname: symbol.qualname.clone(),
        enclosing_class: symbol.enclosing_class.clone(),
        file: symbol.file.clone(),
        line: symbol.line(),
        auth_required,
        security,
        middleware,
        params,
        path_params,
        responses,
        summary: symbol.summary(),
    })
}

fn route_marker_index(symbol: &Symbol, vocab: &Vocabulary, role: MarkerRole) -> Option<usize> {
    symbol
        .markers
        .iter()
        .position(|marker| vocab.marker_role(marker) == Some(role))
}

/// Verb marker name, else `methods=[...]`, else a leading positional list, else GET.
pub fn route_method(marker: &Marker) -> HttpMethod {
    if let Some(method) = HttpMethod::parse(marker.key()) {
        return method;
    }
    let listed = marker
        .kwarg("methods")
        .and_then(literal_items)
        .or_else(|| marker.args.first().and_then(|arg| literal_items(arg)));
    listed
        .unwrap_or_default()
        .iter()
        .find_map(|raw| HttpMethod::parse(raw))
        .unwrap_or_default()
}

/// First positional string literal, else `path=` / `pattern=`, else `/`.
pub fn route_path(marker: &Marker) -> String {
    let literal = marker
        .args
        .first()
        .and_then(|arg| unquote_string_literal(arg))
        .or_else(|| {
            ["path", "pattern"]
                .iter()
                .find_map(|key| marker.kwarg(key).and_then(unquote_string_literal))
        });
    match literal {
        Some(path) if !path.trim().is_empty() => path.trim().to_string(),
        _ => "/".to_string(),
    }
}

fn auth_evidence(symbol: &Symbol, route: &Marker, vocab: &Vocabulary) -> (bool, Vec<String>) {
    let mut auth = false;
    let mut schemes = BTreeSet::new();
    for marker in &symbol.markers {
        match vocab.marker_role(marker) {
            Some(MarkerRole::Auth) => auth = true,
            Some(MarkerRole::Dependency) => {
                for text in marker.args.iter().chain(marker.kwargs.iter().map(|kw| &kw.value)) {
                    schemes.extend(referenced_schemes(text, vocab));
                }
            }
            _ => {}
        }
    }
    if let Some(dependencies) = route.kwarg("dependencies") {
        if is_dependency_call(dependencies, vocab) {
            schemes.extend(referenced_schemes(dependencies, vocab));
        }
    }
    for param in &symbol.params {
        if let Some(default) = param.default.as_deref() {
            if is_dependency_call(default, vocab) {
                schemes.extend(referenced_schemes(default, vocab));
            }
        }
    }
    if !schemes.is_empty() {
        auth = true;
    }
    (auth, schemes.into_iter().collect())
}

fn dependency_names(vocab: &Vocabulary) -> impl Iterator<Item = &str> {
    vocab
        .markers
        .iter()
        .filter(|(_, role)| **role == MarkerRole::Dependency)
        .map(|(name, _)| name.as_str())
}

fn is_dependency_call(text: &str, vocab: &Vocabulary) -> bool {
    dependency_names(vocab).any(|name| {
        text.match_indices(name).any(|(idx, _)| {
            let before_ok = text[..idx]
                .chars()
                .next_back()
                .is_none_or(|ch| !(ch.is_alphanumeric() || ch == '_'));
            let after = text[idx + name.len()..].trim_start();
            before_ok && after.starts_with('(')
        })
    })
}

fn referenced_schemes(text: &str, vocab: &Vocabulary) -> Vec<String> {
    text.split(|ch: char| !(ch.is_alphanumeric() || ch == '_' || ch == '.'))
        .filter(|token| !token.is_empty())
        .filter_map(|token| {
            let last = token.rsplit('.').next().unwrap_or(token);
            vocab.is_auth_scheme(last).then(|| last.to_string())
        })
        .collect()
}

fn endpoint_params(symbol: &Symbol, path_params: &[String], vocab: &Vocabulary) -> Vec<EndpointParam> {
    symbol
        .params
        .iter()
        .filter(|param| param.name != "self" && param.name != "cls")
        .filter(|param| matches!(param.kind, ParamKind::Positional | ParamKind::KeywordOnly))
        .map(|param| {
            let is_dependency = param
                .default
                .as_deref()
                .is_some_and(|default| is_dependency_call(default, vocab));
            let source = if path_params.iter().any(|name| *name == param.name) {
                ParamSource::Path
            } else if is_dependency {
                ParamSource::Dependency
            } else {
                ParamSource::Query
            };
            EndpointParam {
                name: param.name.clone(),
                annotation: param.annotation.clone(),
                default: param.default.clone(),
                required: param.required,
                source,
                model: None,
            }
        })
        .collect()
}

fn responses(
    symbol: &Symbol,
    route: &Marker,
    body: Option<Node<'_>>,
    source: &str,
    vocab: &Vocabulary,
) -> Vec<ResponseDescriptor> {
    let mut out = Vec::new();
    let success_type = symbol
        .returns
        .clone()
        .or_else(|| route.kwarg("response_model").map(str::to_string));
    if let Some(type_name) = success_type {
        out.push(ResponseDescriptor {
            status: 200,
            type_name,
            description: None,
        });
    }
    if let Some(body) = body {
        out.extend(raised_errors(body, source, vocab));
    }
    if out.is_empty() {
        out.push(ResponseDescriptor::fallback());
    }
    out
}

/// One descriptor per `raise <ErrorType>(...)` that carries a literal status code.
fn raised_errors(body: Node<'_>, source: &str, vocab: &Vocabulary) -> Vec<ResponseDescriptor> {
    let mut found = Vec::new();
    let mut stack = vec![body];
    while let Some(node) = stack.pop() {
        if node.kind() == "raise_statement" {
            if let Some(descriptor) = raise_descriptor(node, source, vocab) {
                found.push((node.start_byte(), descriptor));
            }
            continue;
        }
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            stack.push(child);
        }
    }
    found.sort_by_key(|(offset, _)| *offset);
    found.into_iter().map(|(_, descriptor)| descriptor).collect()
}

fn raise_descriptor(node: Node<'_>, source: &str, vocab: &Vocabulary) -> Option<ResponseDescriptor> {
    let call = node.named_child(0)?;
    if call.kind() != "call" {
        return None;
    }
    let function = node_text(call.child_by_field_name("function")?, source);
    if !vocab.is_error_type(&function) {
        return None;
    }
    let (args, kwargs) = call_arguments(call, source);
    let keyword = |name: &str| {
        kwargs
            .iter()
            .find(|kw| kw.name == name)
            .map(|kw| kw.value.as_str())
    };
    let status = keyword("status_code")
        .or_else(|| keyword("code"))
        .or_else(|| args.first().map(String::as_str))
        .and_then(http::parse_status_code)?;
    let description = keyword("detail")
        .or_else(|| keyword("reason"))
        .or_else(|| args.get(1).map(String::as_str))
        .map(|raw| unquote_string_literal(raw).unwrap_or_else(|| raw.to_string()));
    Some(ResponseDescriptor {
        status,
        type_name: function.rsplit('.').next().unwrap_or(&function).to_string(),
        description,
    })
}

pub fn websockets_in_module(module: &ParsedModule<'_>, vocab: &Vocabulary) -> Vec<WebsocketEndpoint> {
    module
        .functions()
        .filter_map(|symbol| websocket(symbol, module.body(symbol), module.source(), vocab))
        .collect()
}

pub fn websocket(
    symbol: &Symbol,
    body: Option<Node<'_>>,
    source: &str,
    vocab: &Vocabulary,
) -> Option<WebsocketEndpoint> {
    let idx = route_marker_index(symbol, vocab, MarkerRole::Websocket)?;
    let marker = &symbol.markers[idx];
    let (auth_required, _) = auth_evidence(symbol, marker, vocab);
    let ends_with_any = |suffixes: &[&str]| {
        symbol.calls.iter().any(|call| {
            let last = call.rsplit('.').next().unwrap_or(call);
            suffixes.contains(&last)
        })
    };
    let body_mentions_disconnect = body
        .map(|body| node_text(body, source).contains("WebSocketDisconnect"))
        .unwrap_or(false);
    Some(WebsocketEndpoint {
        path: route_path(marker),
        handler: symbol.name.clone(),
        qualname: symbol.qualname.clone(),
        file: symbol.file.clone(),
        line: symbol.line(),
        auth_required,
        params: symbol
            .params
            .iter()
            .filter(|param| param.name != "self")
            .cloned()
            .collect(),
        handlers: WebsocketHandlers {
            on_connect: ends_with_any(&["accept"]),
            on_message: ends_with_any(&[
                "receive",
                "receive_text",
                "receive_json",
                "receive_bytes",
                "iter_text",
                "iter_json",
            ]),
            on_disconnect: ends_with_any(&["close"]) || body_mentions_disconnect,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(name: &str, args: &[&str], kwargs: &[(&str, &str)]) -> Marker {
        Marker {
            name: name.to_string(),
            attribute: name.rsplit_once('.').map(|(_, attr)| attr.to_string()),
            is_call: true,
            args: args.iter().map(|a| a.to_string()).collect(),
            kwargs: kwargs
                .iter()
                .map(|(k, v)| crate::model::KeywordArg {
                    name: k.to_string(),
                    value: v.to_string(),
                })
                .collect(),
            line: 1,
        }
    }

    #[test]
    fn method_from_verb_marker() {
        assert_eq!(route_method(&marker("app.delete", &["\"/x\""], &[])), HttpMethod::Delete);
    }

    #[test]
    fn method_from_methods_keyword_and_list_argument() {
        let flask = marker("app.route", &["\"/x\""], &[("methods", "[\"PUT\", \"GET\"]")]);
        assert_eq!(route_method(&flask), HttpMethod::Put);
        let drf = marker("api_view", &["['POST']"], &[]);
        assert_eq!(route_method(&drf), HttpMethod::Post);
        let bare = marker("route", &["\"/x\""], &[]);
        assert_eq!(route_method(&bare), HttpMethod::Get);
    }

    #[test]
    fn path_falls_back_to_keywords_then_root() {
        assert_eq!(route_path(&marker("route", &["'/x'"], &[])), "/x");
        assert_eq!(route_path(&marker("route", &[], &[("path", "\"/y\"")])), "/y");
        assert_eq!(route_path(&marker("route", &[], &[("pattern", "'z/'")])), "z/");
        assert_eq!(route_path(&marker("api_view", &["['GET']"], &[])), "/");
        assert_eq!(route_path(&marker("app.get", &["\"\""], &[])), "/");
    }

    #[test]
    fn dependency_call_detection_requires_call_shape() {
        let vocab = Vocabulary::default();
        assert!(is_dependency_call("Depends(oauth2_scheme)", &vocab));
        assert!(is_dependency_call("[Depends (verify)]", &vocab));
        assert!(!is_dependency_call("NotDepends(x)", &vocab));
        assert!(!is_dependency_call("oauth2_scheme", &vocab));
        assert_eq!(
            referenced_schemes("Security(auth.oauth2_scheme, scopes=[])", &vocab),
            vec!["oauth2_scheme"]
        );
    }
}
