//! Resolves raw route declarations into client routes.

use crate::analyzer::heuristic::{dynamic_import_source, object_entries, unquote_js};
use crate::analyzer::http::{frontend_path_params, join_paths};
use crate::model::{FrontendExtraction, FrontendRoute, RouteDeclaration, RouteMeta};
use crate::util::module_stem;
use crate::vocab::Vocabulary;
use regex::Regex;
use std::sync::OnceLock;

const DEFAULT_LAYOUT: &str = "default";
const INLINE_GUARD: &str = "<inline>";

fn regex_markup_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<([A-Z][\w$.]*)").unwrap())
}

fn regex_wrapper_call() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([\w$.]+)\s*\(").unwrap())
}

fn regex_identifier() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_$][\w$.]*$").unwrap())
}

/// Per-declaration values that children inherit.
#[derive(Debug, Clone, Default)]
struct Resolved {
    path: Option<String>,
    layout: Option<String>,
    guards: Vec<String>,
    requires_auth: Option<bool>,
}

#[derive(Debug, Default)]
struct ComponentRef {
    name: Option<String>,
    source: Option<String>,
    lazy: bool,
    wrappers: Vec<String>,
}

pub struct RouteCollector<'v> {
    vocab: &'v Vocabulary,
}

impl<'v> RouteCollector<'v> {
    pub fn new(vocab: &'v Vocabulary) -> Self {
        Self { vocab }
    }

    /// Client routes declared in one file, in declaration order.
    pub fn collect(&self, file: &str, extraction: &FrontendExtraction) -> Vec<FrontendRoute> {
        let declarations = &extraction.route_declarations;
        let mut resolved: Vec<Option<Resolved>> = vec![None; declarations.len()];
        let mut routes = Vec::new();
        for (idx, declaration) in declarations.iter().enumerate() {
            let own = self.resolve(idx, declarations, extraction, &mut resolved, 0);
            let Some(path) = own.path.clone() else {
                continue;
            };
            if declaration.path.is_none() || component_value(declaration).is_none() {
                continue;
            }
            let component = self.component(declaration, extraction);
            let meta = route_meta(declaration);
            let mut guards = own.guards.clone();
            guards.sort();
            guards.dedup();
            // An explicit `requiresAuth` wins over whatever the guards suggest.
            let auth_required = own.requires_auth.unwrap_or_else(|| {
                guards.iter().any(|guard| self.vocab.is_auth_guard(guard))
            });
            routes.push(FrontendRoute {
                params: frontend_path_params(&path),
                path,
                component: component.name,
                component_source: component.source,
                layout: own.layout.unwrap_or_else(|| DEFAULT_LAYOUT.to_string()),
                nested: extraction.has_children || declaration.parent.is_some(),
                guards,
                lazy: component.lazy,
                auth_required,
                meta,
                shape: declaration.shape,
                file: file.to_string(),
                line: declaration.line,
            });
        }
        tracing::debug!(file, routes = routes.len(), "collected client routes");
        routes
    }

    fn resolve(
        &self,
        idx: usize,
        declarations: &[RouteDeclaration],
        extraction: &FrontendExtraction,
        memo: &mut [Option<Resolved>],
        depth: usize,
    ) -> Resolved {
        if let Some(done) = &memo[idx] {
            return done.clone();
        }
        let declaration = &declarations[idx];
        let parent = match declaration.parent {
            Some(parent) if parent != idx && parent < declarations.len() && depth < 64 => {
                self.resolve(parent, declarations, extraction, memo, depth + 1)
            }
            _ => Resolved::default(),
        };

        let path = match (&declaration.path, &parent.path) {
            (Some(own), _) if own.starts_with('/') => Some(own.clone()),
            (Some(own), Some(base)) => Some(join_paths(base, own)),
            (Some(own), None) => Some(join_paths("/", own)),
            (None, base) => base.clone(),
        };

        let component = self.component(declaration, extraction);
        let layout = declaration
            .attr("layout")
            .map(|value| unquote_js(value).unwrap_or_else(|| value.trim().to_string()))
            .filter(|value| !value.is_empty())
            .or_else(|| {
                component
                    .name
                    .as_ref()
                    .filter(|name| name.ends_with("Layout"))
                    .cloned()
            })
            .or_else(|| parent.layout.clone());

        let mut guards = parent.guards.clone();
        guards.extend(self.guards(declaration));
        guards.extend(component.wrappers);

        let requires_auth = route_meta(declaration).requires_auth.or(parent.requires_auth);

        let done = Resolved {
            path,
            layout,
            guards,
            requires_auth,
        };
        memo[idx] = Some(done.clone());
        done
    }

    fn guards(&self, declaration: &RouteDeclaration) -> Vec<String> {
        let mut out = Vec::new();
        for key in &self.vocab.guard_keys {
            let Some(value) = declaration.attr(key) else {
                continue;
            };
            out.extend(guard_names(value));
        }
        out
    }

    fn component(
        &self,
        declaration: &RouteDeclaration,
        extraction: &FrontendExtraction,
    ) -> ComponentRef {
        let Some(value) = component_value(declaration) else {
            return ComponentRef::default();
        };
        let mut component = self.component_ref(value.trim());
        if let Some(name) = &component.name {
            if let Some(binding) = extraction.lazy_bindings.iter().find(|b| &b.name == name) {
                component.lazy = true;
                if component.source.is_none() {
                    component.source = binding.source.clone();
                }
            }
            if component.source.is_none() {
                component.source = extraction
                    .imports
                    .iter()
                    .find(|import| import.names.iter().any(|n| n == name))
                    .map(|import| import.source.clone());
            }
        }
        component
    }

    fn component_ref(&self, value: &str) -> ComponentRef {
        if let Some(source) = dynamic_import_source(value) {
            return ComponentRef {
                name: module_stem(&source),
                source: Some(source),
                lazy: true,
                wrappers: Vec::new(),
            };
        }
        if let Some(caps) = regex_wrapper_call().captures(value) {
            if self.vocab.lazy_wrappers.iter().any(|w| w == &caps[1]) {
                let inner = value[caps[0].len()..].trim_end().trim_end_matches(')').trim();
                let mut inner = self.component_ref(inner);
                inner.lazy = true;
                return inner;
            }
        }
        if value.starts_with('<') {
            let mut component = ComponentRef::default();
            for caps in regex_markup_tag().captures_iter(value) {
                let tag = &caps[1];
                if self.vocab.is_auth_wrapper(tag) {
                    component.wrappers.push(tag.to_string());
                } else if component.name.is_none() {
                    component.name = Some(tag.to_string());
                }
            }
            return component;
        }
        if let Some(literal) = unquote_js(value) {
            return ComponentRef {
                name: Some(literal).filter(|name| !name.is_empty()),
                ..ComponentRef::default()
            };
        }
        if regex_identifier().is_match(value) {
            return ComponentRef {
                name: Some(value.to_string()),
                ..ComponentRef::default()
            };
        }
        ComponentRef::default()
    }
}

fn component_value(declaration: &RouteDeclaration) -> Option<&str> {
    declaration
        .attr("component")
        .or_else(|| declaration.attr("element"))
        .filter(|value| !value.trim().is_empty())
}

/// Guard names from one guard value: `requireAuth`, `[a, b]`, or an inline function.
pub fn guard_names(value: &str) -> Vec<String> {
    let trimmed = value.trim();
    if trimmed.contains("=>") || trimmed.starts_with("function") {
        return vec![INLINE_GUARD.to_string()];
    }
    trimmed
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(|part| {
            let part = part.trim();
            unquote_js(part).unwrap_or_else(|| part.to_string())
        })
        .filter(|part| !part.is_empty())
        .collect()
}

fn route_meta(declaration: &RouteDeclaration) -> RouteMeta {
    let mut meta = RouteMeta::default();
    let Some(value) = declaration.attr("meta") else {
        return meta;
    };
    let value = value.trim();
    if !value.starts_with('{') || !value.ends_with('}') {
        return meta;
    }
    for (key, raw) in object_entries(&value[1..value.len() - 1]) {
        let raw = raw.trim();
        match key.as_str() {
            "title" => meta.title = unquote_js(raw),
            "requiresAuth" | "auth" | "requireAuth" => match raw {
                "true" => meta.requires_auth = Some(true),
                "false" => meta.requires_auth = Some(false),
                _ => {}
            },
            "roles" => {
                meta.roles = raw
                    .trim_start_matches('[')
                    .trim_end_matches(']')
                    .split(',')
                    .filter_map(unquote_js)
                    .collect();
            }
            _ => {}
        }
    }
    meta
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RouteShape;

    fn declaration(path: Option<&str>, attrs: &[(&str, &str)], parent: Option<usize>) -> RouteDeclaration {
        RouteDeclaration {
            shape: RouteShape::Object,
            path: path.map(str::to_string),
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            parent,
            line: 1,
        }
    }

    fn collect(declarations: Vec<RouteDeclaration>) -> Vec<FrontendRoute> {
        let vocab = Vocabulary::default();
        let extraction = FrontendExtraction {
            route_declarations: declarations,
            ..FrontendExtraction::default()
        };
        RouteCollector::new(&vocab).collect("client/src/router/index.js", &extraction)
    }

    #[test]
    fn guard_names_split_and_detect_inline() {
        assert_eq!(guard_names("[requireAuth, 'isAdmin']"), vec!["requireAuth", "isAdmin"]);
        assert_eq!(guard_names("(to, from, next) => next()"), vec!["<inline>"]);
    }

    #[test]
    fn child_paths_join_parent_and_inherit_layout() {
        let routes = collect(vec![
            declaration(Some("/admin"), &[("path", "'/admin'"), ("component", "AdminLayout")], None),
            declaration(Some("pods"), &[("path", "'pods'"), ("component", "PodList")], Some(0)),
        ]);
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].layout, "AdminLayout");
        assert_eq!(routes[1].path, "/admin/pods");
        assert_eq!(routes[1].layout, "AdminLayout");
        assert!(routes[1].nested);
    }

    #[test]
    fn meta_requires_auth_marks_route() {
        let routes = collect(vec![declaration(
            Some("/secrets"),
            &[
                ("path", "'/secrets'"),
                ("component", "Secrets"),
                ("meta", "{ requiresAuth: true, title: 'Secrets', roles: ['admin'] }"),
            ],
            None,
        )]);
        assert!(routes[0].auth_required);
        assert!(routes[0].guards.is_empty());
        assert_eq!(routes[0].meta.title.as_deref(), Some("Secrets"));
        assert_eq!(routes[0].meta.roles, vec!["admin"]);
    }

    #[test]
    fn only_auth_guards_require_auth() {
        let routes = collect(vec![
            declaration(
                Some("/reports"),
                &[("path", "'/reports'"), ("component", "Reports"), ("beforeEnter", "trackPageView")],
                None,
            ),
            declaration(
                Some("/account"),
                &[("path", "'/account'"), ("component", "Account"), ("beforeEnter", "ensureSession")],
                None,
            ),
            declaration(
                Some("/public"),
                &[
                    ("path", "'/public'"),
                    ("component", "Public"),
                    ("beforeEnter", "requireAuth"),
                    ("meta", "{ requiresAuth: false }"),
                ],
                None,
            ),
        ]);
        assert_eq!(routes[0].guards, vec!["trackPageView"]);
        assert!(!routes[0].auth_required);
        assert!(routes[1].auth_required);
        assert_eq!(routes[2].guards, vec!["requireAuth"]);
        assert!(!routes[2].auth_required);
    }

    #[test]
    fn wrapped_lazy_import_resolves_component_name() {
        let routes = collect(vec![declaration(
            Some("/deployments"),
            &[
                ("path", "'/deployments'"),
                ("component", "defineAsyncComponent(() => import('../views/Deployments.vue'))"),
            ],
            None,
        )]);
        assert!(routes[0].lazy);
        assert_eq!(routes[0].component.as_deref(), Some("Deployments"));
        assert_eq!(routes[0].component_source.as_deref(), Some("../views/Deployments.vue"));
    }
}
