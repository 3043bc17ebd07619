//! Declared third-party dependencies from `requirements.txt` and `package.json`.

use crate::config::AnalyzerConfig;
use crate::error::{Issue, IssueKind};
use crate::model::{DependencyInventory, Requirement};
use crate::util::normalize_path;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageJson {
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
    #[serde(default)]
    dev_dependencies: BTreeMap<String, String>,
}

/// Reads manifests at the root and in the client and server base directories.
pub fn read_dependencies(config: &AnalyzerConfig) -> (DependencyInventory, Vec<Issue>) {
    let mut inventory = DependencyInventory::default();
    let mut issues = Vec::new();
    let mut dirs = vec![String::new()];
    for base in [
        &config.locations.server.base_dir,
        &config.locations.client.base_dir,
    ] {
        let base = base.trim_matches('/').to_string();
        if !dirs.contains(&base) {
            dirs.push(base);
        }
    }

    for dir in &dirs {
        let requirements = Path::new(dir).join("requirements.txt");
        if let Some(text) = read_optional(config.root(), &requirements, &mut issues) {
            inventory.python.extend(parse_requirements(&text));
            inventory.sources.push(normalize_path(&requirements));
        }
        let package = Path::new(dir).join("package.json");
        if let Some(text) = read_optional(config.root(), &package, &mut issues) {
            match serde_json::from_str::<PackageJson>(&text) {
                Ok(parsed) => {
                    inventory.node.extend(parsed.dependencies);
                    inventory.node_dev.extend(parsed.dev_dependencies);
                    inventory.sources.push(normalize_path(&package));
                }
                Err(err) => issues.push(Issue::warning(
                    IssueKind::Parse,
                    normalize_path(&package),
                    err.to_string(),
                )),
            }
        }
    }
    (inventory, issues)
}

fn read_optional(root: &Path, rel: &Path, issues: &mut Vec<Issue>) -> Option<String> {
    let path = root.join(rel);
    if !path.is_file() {
        return None;
    }
    match fs::read_to_string(&path) {
        Ok(text) => Some(text),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "dependency manifest unreadable");
            issues.push(Issue::warning(IssueKind::Io, normalize_path(rel), err.to_string()));
            None
        }
    }
}

/// Requirement lines; options, includes and comments are skipped.
pub fn parse_requirements(text: &str) -> Vec<Requirement> {
    text.lines()
        .filter_map(|line| {
            let line = line.split(" #").next().unwrap_or(line).trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('-') {
                return None;
            }
            let line = line.split(';').next().unwrap_or(line).trim();
            let split = line
                .find(|ch: char| matches!(ch, '=' | '<' | '>' | '!' | '~' | '[' | ' ' | '@'))
                .unwrap_or(line.len());
            let name = line[..split].trim();
            if name.is_empty() {
                return None;
            }
            let rest = line[split..].trim();
            // extras: `uvicorn[standard]>=0.20`
            let rest = match rest.strip_prefix('[') {
                Some(after) => after.split_once(']').map(|(_, tail)| tail.trim()).unwrap_or(""),
                None => rest,
            };
            Some(Requirement {
                name: name.to_string(),
                spec: (!rest.is_empty()).then(|| rest.to_string()),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requirements_keep_name_and_spec() {
        let parsed = parse_requirements(
            "# web\nfastapi==0.110.0\nuvicorn[standard]>=0.20  # server\n-r dev.txt\npydantic\n",
        );
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0].name, "fastapi");
        assert_eq!(parsed[0].spec.as_deref(), Some("==0.110.0"));
        assert_eq!(parsed[1].name, "uvicorn");
        assert_eq!(parsed[1].spec.as_deref(), Some(">=0.20"));
        assert_eq!(parsed[2].spec, None);
    }

    #[test]
    fn reads_root_and_base_dir_manifests() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("client")).unwrap();
        fs::create_dir_all(dir.path().join("server")).unwrap();
        fs::write(dir.path().join("server/requirements.txt"), "fastapi\n").unwrap();
        fs::write(
            dir.path().join("client/package.json"),
            r#"{"dependencies": {"vue": "^3.4.0"}, "devDependencies": {"vite": "^5.0.0"}}"#,
        )
        .unwrap();
        fs::write(dir.path().join("package.json"), "{ not json").unwrap();

        let config = AnalyzerConfig::new(dir.path());
        let (inventory, issues) = read_dependencies(&config);
        assert_eq!(inventory.python[0].name, "fastapi");
        assert_eq!(inventory.node.get("vue").map(String::as_str), Some("^3.4.0"));
        assert_eq!(inventory.node_dev.get("vite").map(String::as_str), Some("^5.0.0"));
        assert_eq!(inventory.sources, vec!["server/requirements.txt", "client/package.json"]);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "package.json");
    }
}
