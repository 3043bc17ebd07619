use crate::config::{AnalyzerConfig, LocationSet};
use crate::error::{AnalysisError, Issue};
use crate::model::Language;
use anyhow::Result;
use ignore::WalkBuilder;
use ignore::overrides::{Override, OverrideBuilder};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub rel_path: String,
    pub abs_path: PathBuf,
    pub size: u64,
    pub language: Language,
    /// Matched by the client route-location globs.
    pub client_routes: bool,
    /// Matched by the server route-location globs.
    pub server_routes: bool,
}

#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub files: Vec<ScannedFile>,
    pub skipped: Vec<Issue>,
}

#[derive(Debug, Clone)]
pub struct LanguageSpec {
    pub language: Language,
    pub extensions: &'static [&'static str],
}

static LANGUAGE_SPECS: &[LanguageSpec] = &[
    LanguageSpec {
        language: Language::Python,
        extensions: &["py"],
    },
    LanguageSpec {
        language: Language::Javascript,
        extensions: &["js", "jsx", "mjs", "cjs"],
    },
    LanguageSpec {
        language: Language::Typescript,
        extensions: &["ts", "mts", "cts"],
    },
    LanguageSpec {
        language: Language::Tsx,
        extensions: &["tsx"],
    },
    LanguageSpec {
        language: Language::Vue,
        extensions: &["vue"],
    },
    LanguageSpec {
        language: Language::Yaml,
        extensions: &["yaml", "yml"],
    },
];

pub fn detect_language(path: &Path) -> Option<Language> {
    let ext = path.extension().and_then(|ext| ext.to_str())?;
    if path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(".d.ts"))
    {
        return None;
    }
    LANGUAGE_SPECS
        .iter()
        .find(|spec| spec.extensions.iter().any(|candidate| *candidate == ext))
        .map(|spec| spec.language)
}

/// Compiled route-location globs for one side of the stack.
#[derive(Debug, Clone)]
pub struct LocationMatcher {
    globs: Override,
}

impl LocationMatcher {
    pub fn new(root: &Path, set: &LocationSet) -> Result<Self, AnalysisError> {
        let mut builder = OverrideBuilder::new(root);
        for pattern in set.rooted_patterns() {
            builder.add(&pattern).map_err(|err| {
                AnalysisError::config(format!("invalid location glob `{pattern}`: {err}"))
            })?;
        }
        let globs = builder
            .build()
            .map_err(|err| AnalysisError::config(format!("location globs: {err}")))?;
        Ok(Self { globs })
    }

    pub fn matches(&self, path: &Path) -> bool {
        self.globs.matched(path, false).is_whitelist()
    }
}

/// Exclude globs in gitignore syntax, turned into an ignore-only override set.
pub fn build_excludes(root: &Path, excludes: &[String]) -> Result<Override, AnalysisError> {
    let mut builder = OverrideBuilder::new(root);
    for pattern in excludes {
        let trimmed = pattern.trim();
        if trimmed.is_empty() {
            continue;
        }
        let negated = if trimmed.starts_with('!') {
            trimmed.to_string()
        } else {
            format!("!{trimmed}")
        };
        builder.add(&negated).map_err(|err| {
            AnalysisError::config(format!("invalid exclude glob `{trimmed}`: {err}"))
        })?;
    }
    builder
        .build()
        .map_err(|err| AnalysisError::config(format!("exclude globs: {err}")))
}

/// Walk the root, applying excludes and the size limit before any file is opened.
pub fn scan_repo(config: &AnalyzerConfig) -> Result<ScanOutcome> {
    let root = config.root();
    let excludes = build_excludes(root, &config.excludes)?;
    let client = LocationMatcher::new(root, &config.locations.client)?;
    let server = LocationMatcher::new(root, &config.locations.server)?;

    let mut builder = WalkBuilder::new(root);
    if config.no_ignore {
        builder
            .ignore(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .parents(false);
    } else {
        builder
            .ignore(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .parents(true)
            .require_git(false);
    }
    let walker = builder
        .hidden(false)
        .overrides(excludes)
        .filter_entry(|entry| !is_ignored_entry(entry))
        .build();

    let mut outcome = ScanOutcome::default();
    for entry in walker {
        let entry = match entry {
            Ok(value) => value,
            Err(err) => {
                warn!("walk error: {err}");
                continue;
            }
        };
        if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
            continue;
        }
        let path = entry.path();
        let Some(language) = detect_language(path) else {
            continue;
        };
        let rel_path = crate::util::normalize_rel_path(root, path)?;
        let size = match entry.metadata() {
            Ok(metadata) => metadata.len(),
            Err(err) => {
                warn!("metadata {rel_path}: {err}");
                outcome.skipped.push(Issue::warning(
                    crate::error::IssueKind::Io,
                    rel_path,
                    err.to_string(),
                ));
                continue;
            }
        };
        if size > config.max_file_size {
            debug!("skipping {rel_path}: {size} bytes");
            outcome.skipped.push(Issue::skipped(
                rel_path,
                format!(
                    "{size} bytes exceeds the {} byte limit",
                    config.max_file_size
                ),
            ));
            continue;
        }
        outcome.files.push(ScannedFile {
            client_routes: client.matches(path),
            server_routes: server.matches(path),
            rel_path,
            abs_path: path.to_path_buf(),
            size,
            language,
        });
    }
    outcome.files.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    outcome.skipped.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(outcome)
}

fn is_ignored_entry(entry: &ignore::DirEntry) -> bool {
    entry.file_name() == OsStr::new(".git")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn detects_languages_by_extension() {
        assert_eq!(detect_language(Path::new("a/b.py")), Some(Language::Python));
        assert_eq!(detect_language(Path::new("App.tsx")), Some(Language::Tsx));
        assert_eq!(detect_language(Path::new("Pods.vue")), Some(Language::Vue));
        assert_eq!(detect_language(Path::new("k8s/app.yml")), Some(Language::Yaml));
        assert_eq!(detect_language(Path::new("types.d.ts")), None);
        assert_eq!(detect_language(Path::new("README.md")), None);
    }

    #[test]
    fn location_matcher_supports_brace_globs() {
        let dir = tempfile::tempdir().unwrap();
        let set = LocationSet::new("client", &["src/App.{js,jsx,ts,tsx}", "src/router/**"]);
        let matcher = LocationMatcher::new(dir.path(), &set).unwrap();
        assert!(matcher.matches(&dir.path().join("client/src/App.tsx")));
        assert!(matcher.matches(&dir.path().join("client/src/router/index.js")));
        assert!(!matcher.matches(&dir.path().join("client/src/components/Nav.tsx")));
        assert!(!matcher.matches(&dir.path().join("other/src/App.tsx")));
    }

    #[test]
    fn scan_applies_excludes_and_size_limit() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("node_modules/lib")).unwrap();
        fs::create_dir_all(root.join("server/app/api")).unwrap();
        fs::write(root.join("node_modules/lib/index.js"), "export {}").unwrap();
        fs::write(root.join("server/app/api/pods.py"), "def f():\n    pass\n").unwrap();
        fs::write(root.join("big.js"), "x".repeat(64)).unwrap();

        let mut config = AnalyzerConfig::new(root);
        config.max_file_size = 32;
        let outcome = scan_repo(&config).unwrap();

        let paths: Vec<_> = outcome.files.iter().map(|f| f.rel_path.as_str()).collect();
        assert_eq!(paths, vec!["server/app/api/pods.py"]);
        assert!(outcome.files[0].server_routes);
        assert!(!outcome.files[0].client_routes);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].path, "big.js");
        assert_eq!(outcome.skipped[0].severity, crate::error::Severity::Info);
    }
}
