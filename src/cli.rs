use crate::config::{AnalyzerConfig, LocationSet};
use crate::vocab::Vocabulary;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "stackmap",
    version,
    about = "Inventory a mixed backend/frontend tree and cross-reference its routes",
    after_help = r#"Examples:
  stackmap analyze --repo .
  stackmap endpoints --repo . --server-dir backend --compact
  stackmap routes --repo . --client-dir web --client-pattern 'src/router/**'
  stackmap reconcile --repo . --vocab stackmap-vocab.yaml
  stackmap vocab > stackmap-vocab.yaml

Logging goes to stderr and is controlled by STACKMAP_LOG (default: warn).
"#
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Full report: files, symbols, endpoints, routes, reconciliation.
    Analyze(AnalyzeArgs),
    /// Backend endpoints and websocket handlers only.
    Endpoints(AnalyzeArgs),
    /// Client routes only.
    Routes(AnalyzeArgs),
    /// Route reconciliation result only.
    Reconcile(AnalyzeArgs),
    /// Print the effective vocabulary as YAML.
    Vocab {
        /// Vocabulary file to merge over the built-in defaults.
        #[arg(long, value_name = "FILE")]
        vocab: Option<PathBuf>,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct AnalyzeArgs {
    #[arg(long, default_value = ".")]
    pub repo: PathBuf,
    /// Extra exclude glob (gitignore syntax); repeatable.
    #[arg(long = "exclude", value_name = "GLOB")]
    pub excludes: Vec<String>,
    /// Include files ignored by .gitignore.
    #[arg(long)]
    pub no_ignore: bool,
    /// Skip files larger than this many bytes (STACKMAP_MAX_FILE_SIZE).
    #[arg(long)]
    pub max_file_size: Option<u64>,
    /// Per-file wall-clock budget in milliseconds (STACKMAP_FILE_BUDGET_MS).
    #[arg(long)]
    pub file_budget_ms: Option<u64>,
    /// Cyclomatic score above which a function is listed as complex.
    #[arg(long)]
    pub complexity_threshold: Option<u32>,
    /// Vocabulary YAML file.
    #[arg(long, value_name = "FILE")]
    pub vocab: Option<PathBuf>,
    /// Base directory of the client application.
    #[arg(long)]
    pub client_dir: Option<String>,
    /// Base directory of the backend service.
    #[arg(long)]
    pub server_dir: Option<String>,
    /// Client route-location glob, relative to the client dir; replaces the defaults.
    #[arg(long = "client-pattern", value_name = "GLOB")]
    pub client_patterns: Vec<String>,
    /// Server route-location glob, relative to the server dir; replaces the defaults.
    #[arg(long = "server-pattern", value_name = "GLOB")]
    pub server_patterns: Vec<String>,
    /// Analyze files on a thread pool (STACKMAP_PARALLEL).
    #[arg(long)]
    pub parallel: bool,
    /// Single-line JSON output.
    #[arg(long)]
    pub compact: bool,
}

impl AnalyzeArgs {
    pub fn to_config(&self) -> Result<AnalyzerConfig> {
        let mut config = AnalyzerConfig::new(&self.repo);
        config.excludes.extend(self.excludes.iter().cloned());
        config.no_ignore = self.no_ignore;
        if let Some(max) = self.max_file_size {
            config.max_file_size = max;
        }
        if let Some(ms) = self.file_budget_ms {
            config.file_budget = (ms > 0).then(|| Duration::from_millis(ms));
        }
        if let Some(threshold) = self.complexity_threshold {
            config.complexity_threshold = threshold;
        }
        config.parallel |= self.parallel;
        apply_location(
            &mut config.locations.client,
            self.client_dir.as_deref(),
            &self.client_patterns,
        );
        apply_location(
            &mut config.locations.server,
            self.server_dir.as_deref(),
            &self.server_patterns,
        );
        config.vocabulary = load_vocabulary(self.vocab.as_ref())?;
        Ok(config)
    }
}

fn apply_location(set: &mut LocationSet, base_dir: Option<&str>, patterns: &[String]) {
    if let Some(base) = base_dir {
        set.base_dir = base.to_string();
    }
    if !patterns.is_empty() {
        set.patterns = patterns.to_vec();
    }
}

pub fn load_vocabulary(path: Option<&PathBuf>) -> Result<Vocabulary> {
    match path {
        Some(path) => Vocabulary::from_yaml_file(path)
            .with_context(|| format!("load vocabulary {}", path.display())),
        None => Ok(Vocabulary::default()),
    }
}
