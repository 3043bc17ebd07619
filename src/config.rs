// Configuration for stackmap
// Environment variables supply defaults; AnalyzerConfig carries one run's settings.

use crate::analyzer::scan;
use crate::error::AnalysisError;
use crate::vocab::Vocabulary;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::warn;

/// Global configuration instance
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Process-wide defaults
#[derive(Debug, Clone)]
pub struct Config {
    /// Files larger than this are skipped unopened (STACKMAP_MAX_FILE_SIZE)
    pub max_file_size: u64,

    /// Per-file wall-clock budget in milliseconds, 0 disables (STACKMAP_FILE_BUDGET_MS)
    pub file_budget_ms: u64,

    /// Cyclomatic score above which a function is reported as complex (STACKMAP_COMPLEXITY_THRESHOLD)
    pub complexity_threshold: u32,

    /// Analyze files on the rayon pool (STACKMAP_PARALLEL)
    pub parallel: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_file_size: 10 * 1024 * 1024,
            file_budget_ms: 0,
            complexity_threshold: 10,
            parallel: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Self {
        let mut config = Config::default();
        read_env("STACKMAP_MAX_FILE_SIZE", &mut config.max_file_size);
        read_env("STACKMAP_FILE_BUDGET_MS", &mut config.file_budget_ms);
        read_env(
            "STACKMAP_COMPLEXITY_THRESHOLD",
            &mut config.complexity_threshold,
        );
        read_env("STACKMAP_PARALLEL", &mut config.parallel);
        config
    }

    /// Get the global configuration instance
    pub fn get() -> &'static Config {
        CONFIG.get_or_init(Config::from_env)
    }
}

fn read_env<T>(key: &str, slot: &mut T)
where
    T: std::str::FromStr + std::fmt::Display,
{
    let Ok(val) = env::var(key) else {
        return;
    };
    match val.trim().parse() {
        Ok(parsed) => *slot = parsed,
        Err(_) => warn!("invalid {key} value: {val}, using default: {slot}"),
    }
}

/// A base directory plus globs relative to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationSet {
    pub base_dir: String,
    pub patterns: Vec<String>,
}

impl LocationSet {
    pub fn new(base_dir: impl Into<String>, patterns: &[&str]) -> Self {
        Self {
            base_dir: base_dir.into(),
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Globs anchored at the repository root.
    pub fn rooted_patterns(&self) -> Vec<String> {
        let base = self.base_dir.trim().trim_matches('/');
        self.patterns
            .iter()
            .map(|pattern| {
                let pattern = pattern.trim().trim_start_matches("./").trim_start_matches('/');
                if base.is_empty() || base == "." {
                    format!("/{pattern}")
                } else {
                    format!("/{base}/{pattern}")
                }
            })
            .collect()
    }
}

/// Where route-declaring files live on each side of the stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteLocations {
    pub client: LocationSet,
    pub server: LocationSet,
}

impl Default for RouteLocations {
    fn default() -> Self {
        Self {
            client: LocationSet::new(
                "client",
                &[
                    "src/App.{js,jsx,ts,tsx,vue}",
                    "src/router/**",
                    "src/routes/**",
                    "src/pages/**",
                    "src/views/**",
                ],
            ),
            server: LocationSet::new(
                "server",
                &[
                    "app/api/**/*.py",
                    "app/routers/**/*.py",
                    "routes/**/*.py",
                    "controllers/**/*.py",
                ],
            ),
        }
    }
}

pub const DEFAULT_EXCLUDES: &[&str] = &[
    "node_modules",
    ".git",
    "venv",
    ".venv",
    "env",
    "__pycache__",
    "dist",
    "build",
    ".pytest_cache",
    ".mypy_cache",
    ".tox",
    ".next",
    "coverage",
];

/// Settings for one analysis run.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub root: PathBuf,
    pub excludes: Vec<String>,
    pub no_ignore: bool,
    pub max_file_size: u64,
    pub file_budget: Option<Duration>,
    pub complexity_threshold: u32,
    pub parallel: bool,
    pub locations: RouteLocations,
    pub vocabulary: Vocabulary,
}

impl AnalyzerConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let defaults = Config::get();
        Self {
            root: root.into(),
            excludes: DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect(),
            no_ignore: false,
            max_file_size: defaults.max_file_size,
            file_budget: (defaults.file_budget_ms > 0)
                .then(|| Duration::from_millis(defaults.file_budget_ms)),
            complexity_threshold: defaults.complexity_threshold,
            parallel: defaults.parallel,
            locations: RouteLocations::default(),
            vocabulary: Vocabulary::default(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Fails before any file is opened when the run cannot be configured.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !self.root.is_dir() {
            return Err(AnalysisError::config(format!(
                "root {} is not a directory",
                self.root.display()
            )));
        }
        if self.max_file_size == 0 {
            return Err(AnalysisError::config("max_file_size must be positive"));
        }
        for (side, set) in [
            ("client", &self.locations.client),
            ("server", &self.locations.server),
        ] {
            if set.patterns.is_empty() {
                return Err(AnalysisError::config(format!(
                    "no {side} route location globs configured"
                )));
            }
        }
        self.vocabulary.validate()?;
        scan::build_excludes(&self.root, &self.excludes)?;
        scan::LocationMatcher::new(&self.root, &self.locations.client)?;
        scan::LocationMatcher::new(&self.root, &self.locations.server)?;
        Ok(())
    }
}
