use regex::Regex;
use std::sync::OnceLock;

fn regex_brace_param() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([A-Za-z_][\w]*)(?::[^}]*)?\}").unwrap())
}

fn regex_angle_param() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<(?:[A-Za-z_]\w*:)?([A-Za-z_]\w*)>").unwrap())
}

fn regex_colon_param() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r":([A-Za-z_]\w*)\??").unwrap())
}

fn regex_template_param() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([^}]*)\}").unwrap())
}

fn regex_status_literal() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:[\w.]*HTTP_)?([1-5]\d\d)(?:_\w+)?$").unwrap())
}

pub fn join_paths(prefix: &str, suffix: &str) -> String {
    let mut left = prefix.trim().to_string();
    let mut right = suffix.trim().to_string();
    if left.is_empty() {
        left = "/".to_string();
    }
    if right.is_empty() {
        right = "/".to_string();
    }
    if !left.starts_with('/') {
        left = format!("/{left}");
    }
    let left = left.trim_end_matches('/');
    let right = right.trim_start_matches('/');
    if left.is_empty() {
        if right.is_empty() {
            "/".to_string()
        } else {
            format!("/{right}")
        }
    } else if right.is_empty() {
        left.to_string()
    } else {
        format!("{left}/{right}")
    }
}

/// Parameter names declared in a backend path (`{id}`, `{id:int}`, `<int:id>`).
pub fn backend_path_params(path: &str) -> Vec<String> {
    let mut out = Vec::new();
    for caps in regex_brace_param().captures_iter(path) {
        push_unique(&mut out, &caps[1]);
    }
    for caps in regex_angle_param().captures_iter(path) {
        push_unique(&mut out, &caps[1]);
    }
    out
}

/// Parameter names declared in a client path (`:id`, `:id?`, `${id}`).
pub fn frontend_path_params(path: &str) -> Vec<String> {
    let mut out = Vec::new();
    for segment in path.split('/') {
        if let Some(caps) = regex_colon_param().captures(segment) {
            if segment.starts_with(':') {
                push_unique(&mut out, &caps[1]);
            }
        }
    }
    for caps in regex_template_param().captures_iter(path) {
        push_unique(&mut out, caps[1].trim());
    }
    out
}

fn push_unique(out: &mut Vec<String>, value: &str) {
    if !value.is_empty() && !out.iter().any(|existing| existing == value) {
        out.push(value.to_string());
    }
}

/// Replace every placeholder syntax with the canonical `{param}` token.
pub fn canonical_placeholders(path: &str) -> String {
    let path = regex_template_param().replace_all(path, "{param}");
    let path = regex_brace_param().replace_all(&path, "{param}");
    let path = regex_angle_param().replace_all(&path, "{param}");
    path.split('/')
        .map(|segment| {
            if segment.starts_with(':') && regex_colon_param().is_match(segment) {
                "{param}".to_string()
            } else {
                segment.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Status code from `404` or `status.HTTP_404_NOT_FOUND`.
pub fn parse_status_code(raw: &str) -> Option<u16> {
    let trimmed = raw.trim();
    let caps = regex_status_literal().captures(trimmed)?;
    caps[1].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_paths_handles_slashes() {
        assert_eq!(join_paths("/pods", "detail"), "/pods/detail");
        assert_eq!(join_paths("/", "pods"), "/pods");
        assert_eq!(join_paths("/pods/", "/x"), "/pods/x");
        assert_eq!(join_paths("", ""), "/");
    }

    #[test]
    fn extracts_params_from_each_syntax() {
        assert_eq!(backend_path_params("/pods/{name}/logs/{line:int}"), vec!["name", "line"]);
        assert_eq!(backend_path_params("/users/<int:user_id>"), vec!["user_id"]);
        assert_eq!(frontend_path_params("/pods/:id/:tab?"), vec!["id", "tab"]);
        assert_eq!(frontend_path_params("/pods/${podId}"), vec!["podId"]);
        assert!(frontend_path_params("/pods").is_empty());
    }

    #[test]
    fn canonical_placeholders_unify_syntaxes() {
        assert_eq!(canonical_placeholders("/pods/:id"), "/pods/{param}");
        assert_eq!(canonical_placeholders("/pods/{id}"), "/pods/{param}");
        assert_eq!(canonical_placeholders("/pods/<int:id>"), "/pods/{param}");
        assert_eq!(canonical_placeholders("/pods/${pod.id}"), "/pods/{param}");
    }

    #[test]
    fn status_codes_parse_from_literals_and_constants() {
        assert_eq!(parse_status_code("404"), Some(404));
        assert_eq!(parse_status_code("status.HTTP_401_UNAUTHORIZED"), Some(401));
        assert_eq!(parse_status_code("code"), None);
        assert_eq!(parse_status_code("999"), None);
    }
}
