use anyhow::{Context, Result};
use blake3::Hasher;
use std::path::{Component, Path};

pub fn normalize_rel_path(repo_root: &Path, path: &Path) -> Result<String> {
    let rel = path.strip_prefix(repo_root).with_context(|| {
        format!(
            "strip prefix {} from {}",
            repo_root.display(),
            path.display()
        )
    })?;
    Ok(normalize_path(rel))
}

pub fn normalize_path(path: &Path) -> String {
    let mut parts = Vec::new();
    for comp in path.components() {
        match comp {
            Component::Normal(os) => parts.push(os.to_string_lossy().to_string()),
            Component::ParentDir => parts.push("..".to_string()),
            Component::CurDir => {}
            _ => {}
        }
    }
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

pub fn content_hash(data: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize().to_hex().to_string()
}

/// 1-based line number of a byte offset.
pub fn line_at(content: &str, offset: usize) -> usize {
    let end = offset.min(content.len());
    content.as_bytes()[..end]
        .iter()
        .filter(|byte| **byte == b'\n')
        .count()
        + 1
}

pub fn truncate_str_bytes(value: &str, max_bytes: usize) -> String {
    if value.len() <= max_bytes {
        return value.to_string();
    }
    let mut end = max_bytes.min(value.len());
    while end > 0 && !value.is_char_boundary(end) {
        end -= 1;
    }
    value[..end].to_string()
}

/// Collapse runs of whitespace into single spaces and cap the length.
pub fn compact_snippet(raw: &str, max_bytes: usize) -> Option<String> {
    let mut out = String::new();
    let mut last_space = false;
    for ch in raw.chars() {
        if ch.is_whitespace() {
            if !last_space {
                out.push(' ');
                last_space = true;
            }
        } else {
            out.push(ch);
            last_space = false;
        }
    }
    let trimmed = out.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(truncate_str_bytes(trimmed, max_bytes))
    }
}

/// File stem of a slash-separated path, falling back to the parent directory for `index.*`.
pub fn module_stem(path: &str) -> Option<String> {
    let trimmed = path.trim().trim_end_matches('/');
    let mut segments = trimmed.rsplit('/');
    let file = segments.next()?;
    let stem = file.split('.').next().unwrap_or(file);
    if stem == "index" {
        let parent = segments.next()?;
        if parent.is_empty() || parent == "." || parent == ".." {
            return None;
        }
        return Some(parent.to_string());
    }
    if stem.is_empty() {
        None
    } else {
        Some(stem.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_at_counts_newlines_before_offset() {
        let text = "a\nb\nc";
        assert_eq!(line_at(text, 0), 1);
        assert_eq!(line_at(text, 2), 2);
        assert_eq!(line_at(text, 4), 3);
        assert_eq!(line_at(text, 100), 3);
    }

    #[test]
    fn compact_snippet_collapses_whitespace() {
        assert_eq!(
            compact_snippet("  useState(\n   0 )", 200).as_deref(),
            Some("useState( 0 )")
        );
        assert_eq!(compact_snippet("   ", 10), None);
        assert_eq!(compact_snippet("abcdef", 3).as_deref(), Some("abc"));
    }

    #[test]
    fn module_stem_handles_index_files() {
        assert_eq!(module_stem("./views/PodList.vue").as_deref(), Some("PodList"));
        assert_eq!(module_stem("./pages/pods/index.tsx").as_deref(), Some("pods"));
        assert_eq!(module_stem("../Login").as_deref(), Some("Login"));
    }

    #[test]
    fn normalize_path_uses_forward_slashes() {
        assert_eq!(normalize_path(Path::new("client/./src/App.tsx")), "client/src/App.tsx");
        assert_eq!(normalize_path(Path::new("")), ".");
    }
}
