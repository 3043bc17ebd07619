//! Cross-references client routes with backend endpoints.

use crate::analyzer::http::canonical_placeholders;
use crate::model::{Endpoint, FrontendRoute, MatchType, RouteMatch, RouteReconciliationResult};
use crate::vocab::Vocabulary;

/// Bucket order is fixed: auth keywords win over resource keywords.
const BUCKETS: [MatchType; 2] = [MatchType::Auth, MatchType::Resource];

pub fn bucket_of(path: &str, vocab: &Vocabulary) -> Option<MatchType> {
    let lowered = path.to_lowercase();
    if vocab
        .auth_path_keywords
        .iter()
        .any(|keyword| lowered.contains(&keyword.to_lowercase()))
    {
        return Some(MatchType::Auth);
    }
    if vocab
        .resource_keywords
        .iter()
        .any(|keyword| lowered.contains(&keyword.to_lowercase()))
    {
        return Some(MatchType::Resource);
    }
    None
}

pub fn normalize_frontend_path(path: &str) -> String {
    normalize(path)
}

/// Backend paths additionally lose a leading `/api/` segment.
pub fn normalize_backend_path(path: &str) -> String {
    let normalized = normalize(path);
    match normalized.strip_prefix("/api/") {
        Some(rest) => format!("/{rest}"),
        None if normalized == "/api" => "/".to_string(),
        None => normalized,
    }
}

fn normalize(path: &str) -> String {
    let canonical = canonical_placeholders(path.trim());
    let mut out = String::with_capacity(canonical.len());
    // `{param}` survives case folding and separator stripping unchanged.
    for ch in canonical.chars() {
        if ch == '-' || ch == '_' {
            continue;
        }
        out.extend(ch.to_lowercase());
    }
    if !out.starts_with('/') {
        out.insert(0, '/');
    }
    out
}

fn paths_match(frontend: &str, backend: &str) -> bool {
    frontend.contains(backend) || backend.contains(frontend)
}

/// Greedy first-match pairing per bucket. Deterministic for a given input order.
pub fn reconcile(
    frontend: &[FrontendRoute],
    backend: &[Endpoint],
    vocab: &Vocabulary,
) -> RouteReconciliationResult {
    let frontend_buckets: Vec<Option<MatchType>> =
        frontend.iter().map(|route| bucket_of(&route.path, vocab)).collect();
    let backend_buckets: Vec<Option<MatchType>> =
        backend.iter().map(|endpoint| bucket_of(&endpoint.path, vocab)).collect();
    let backend_paths: Vec<String> = backend
        .iter()
        .map(|endpoint| normalize_backend_path(&endpoint.path))
        .collect();

    let mut consumed = vec![false; backend.len()];
    let mut paired = vec![false; frontend.len()];
    let mut result = RouteReconciliationResult::default();

    for bucket in BUCKETS {
        for (fi, route) in frontend.iter().enumerate() {
            if frontend_buckets[fi] != Some(bucket) {
                continue;
            }
            let route_path = normalize_frontend_path(&route.path);
            let candidate = backend.iter().enumerate().position(|(bi, endpoint)| {
                !consumed[bi]
                    && backend_buckets[bi] == Some(bucket)
                    && endpoint.auth_required == route.auth_required
                    && paths_match(&route_path, &backend_paths[bi])
            });
            if let Some(bi) = candidate {
                consumed[bi] = true;
                paired[fi] = true;
                result.matches.push(RouteMatch {
                    frontend: route.clone(),
                    backend: backend[bi].clone(),
                    match_type: bucket,
                });
            }
        }
    }

    for (fi, route) in frontend.iter().enumerate() {
        match frontend_buckets[fi] {
            None => result.excluded_frontend += 1,
            Some(_) => {
                result.considered_frontend += 1;
                if !paired[fi] {
                    result.unmatched_frontend.push(route.clone());
                }
            }
        }
    }
    for (bi, endpoint) in backend.iter().enumerate() {
        match backend_buckets[bi] {
            None => result.excluded_backend += 1,
            Some(_) if !consumed[bi] => result.unmatched_backend.push(endpoint.clone()),
            Some(_) => {}
        }
    }

    result.score = if result.considered_frontend == 0 {
        0.0
    } else {
        100.0 * result.matches.len() as f64 / result.considered_frontend as f64
    };
    tracing::info!(
        matches = result.matches.len(),
        unmatched_frontend = result.unmatched_frontend.len(),
        unmatched_backend = result.unmatched_backend.len(),
        score = result.score,
        "reconciled routes"
    );
    result
}
