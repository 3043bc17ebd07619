//! Result aggregator: scan, per-file analysis, merge, reconcile.

use crate::config::AnalyzerConfig;
use crate::error::{AnalysisError, Issue, IssueKind};
use crate::model::{
    AnalysisReport, ComplexFunction, Endpoint, FileAnalysis, ParamSource, SourceFile, Summary,
};
use crate::routes::reconcile::reconcile;
use anyhow::Result;
use rayon::prelude::*;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub mod deps;
pub mod heuristic;
pub mod http;
pub mod manifest;
pub mod python;
pub mod scan;
pub mod source;

use scan::ScannedFile;
use source::{AnalyzerSet, RouteScope};

fn regex_type_name() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z_][\w]*").unwrap())
}

pub struct Analyzer {
    config: AnalyzerConfig,
}

impl Analyzer {
    /// Validates the configuration; nothing is read from the tree until [`Analyzer::run`].
    pub fn new(mut config: AnalyzerConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        config.root = config.root.canonicalize().map_err(|err| {
            AnalysisError::config(format!("root {}: {err}", config.root.display()))
        })?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn run(&self) -> Result<AnalysisReport> {
        let started = Instant::now();
        let config = &self.config;
        let scanned = scan::scan_repo(config)?;
        info!(
            root = %config.root().display(),
            files = scanned.files.len(),
            skipped = scanned.skipped.len(),
            parallel = config.parallel,
            "analysis started"
        );

        let outcomes = if config.parallel {
            self.analyze_parallel(&scanned.files)
        } else {
            self.analyze_sequential(&scanned.files)?
        };

        let mut report = AnalysisReport {
            root: config.root().display().to_string(),
            ..AnalysisReport::default()
        };
        report.issues.extend(scanned.skipped.iter().cloned());
        let mut failed = 0;
        for outcome in outcomes {
            match outcome {
                Ok(analysis) => report.files.push(analysis),
                Err(err) => {
                    warn!("{err}");
                    failed += 1;
                    report.issues.push(err.to_issue());
                }
            }
        }
        report.files.sort_by(|a, b| a.path.cmp(&b.path));
        link_models(&mut report.files);

        let server_files: HashSet<&str> = scanned
            .files
            .iter()
            .filter(|file| file.server_routes)
            .map(|file| file.rel_path.as_str())
            .collect();
        let mut backend: Vec<Endpoint> = Vec::new();
        for file in &report.files {
            report.endpoints.extend(file.endpoints.iter().cloned());
            report.websockets.extend(file.websockets.iter().cloned());
            report.frontend_routes.extend(file.routes.iter().cloned());
            report.manifests.extend(file.manifests.iter().cloned());
            if server_files.contains(file.path.as_str()) {
                backend.extend(file.endpoints.iter().cloned());
            }
        }
        report.reconciliation = reconcile(&report.frontend_routes, &backend, &config.vocabulary);

        let (dependencies, dependency_issues) = deps::read_dependencies(config);
        report.dependencies = dependencies;
        report.issues.extend(dependency_issues);

        report.summary = summarize(&report, &scanned.skipped, failed, config.complexity_threshold);
        info!(
            analyzed = report.summary.files_analyzed,
            failed = report.summary.files_failed,
            endpoints = report.summary.endpoints,
            frontend_routes = report.summary.frontend_routes,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "analysis finished"
        );
        Ok(report)
    }

    fn analyze_sequential(
        &self,
        files: &[ScannedFile],
    ) -> Result<Vec<Result<FileAnalysis, AnalysisError>>> {
        let mut set = AnalyzerSet::new(&self.config.vocabulary)?;
        Ok(files
            .iter()
            .map(|file| analyze_file(&mut set, file, self.config.file_budget))
            .collect())
    }

    fn analyze_parallel(&self, files: &[ScannedFile]) -> Vec<Result<FileAnalysis, AnalysisError>> {
        let vocab = &self.config.vocabulary;
        let budget = self.config.file_budget;
        files
            .par_iter()
            .map_init(
                || AnalyzerSet::new(vocab),
                |set, file| match set {
                    Ok(set) => analyze_file(set, file, budget),
                    Err(err) => Err(AnalysisError::parse(
                        &file.rel_path,
                        None,
                        format!("parser unavailable: {err}"),
                    )),
                },
            )
            .collect()
    }
}

/// Convenience wrapper: validate, then run.
pub fn analyze(config: AnalyzerConfig) -> Result<AnalysisReport> {
    Analyzer::new(config)?.run()
}

fn analyze_file(
    set: &mut AnalyzerSet<'_>,
    scanned: &ScannedFile,
    budget: Option<Duration>,
) -> Result<FileAnalysis, AnalysisError> {
    let started = Instant::now();
    let text = std::fs::read_to_string(&scanned.abs_path).map_err(|source| AnalysisError::Io {
        path: scanned.rel_path.clone(),
        source,
    })?;
    let file = SourceFile::new(scanned.rel_path.clone(), scanned.language, text);
    let scope = RouteScope {
        client_routes: scanned.client_routes,
        server_routes: scanned.server_routes,
    };
    let analysis = set.for_language(file.language).analyze(&file, scope)?;
    let elapsed = started.elapsed();
    if let Some(budget) = budget {
        if elapsed > budget {
            return Err(AnalysisError::Timeout {
                path: scanned.rel_path.clone(),
                budget_ms: budget.as_millis() as u64,
            });
        }
    }
    debug!(
        path = %scanned.rel_path,
        language = %scanned.language,
        bytes = scanned.size,
        elapsed_us = elapsed.as_micros() as u64,
        "analyzed file"
    );
    Ok(analysis)
}

/// Point endpoint parameters at the data models their annotations name.
fn link_models(files: &mut [FileAnalysis]) {
    let models: BTreeSet<String> = files
        .iter()
        .flat_map(|file| file.models.iter().map(|model| model.name.clone()))
        .collect();
    if models.is_empty() {
        return;
    }
    for file in files.iter_mut() {
        for endpoint in &mut file.endpoints {
            for param in &mut endpoint.params {
                let Some(annotation) = &param.annotation else {
                    continue;
                };
                let linked = regex_type_name()
                    .find_iter(annotation)
                    .map(|m| m.as_str())
                    .find(|name| models.contains(*name))
                    .map(str::to_string);
                if let Some(model) = linked {
                    if param.source == ParamSource::Query {
                        param.source = ParamSource::Body;
                    }
                    param.model = Some(model);
                }
            }
        }
    }
}

fn summarize(
    report: &AnalysisReport,
    skipped: &[Issue],
    failed: usize,
    threshold: u32,
) -> Summary {
    let mut summary = Summary {
        files_scanned: report.files.len() + failed + skipped.len(),
        files_analyzed: report.files.len(),
        files_failed: failed,
        files_skipped: skipped
            .iter()
            .filter(|issue| issue.kind == IssueKind::Skipped)
            .count(),
        endpoints: report.endpoints.len(),
        websockets: report.websockets.len(),
        frontend_routes: report.frontend_routes.len(),
        ..Summary::default()
    };
    let mut cyclomatic_total = 0u64;
    let mut scored = 0u64;
    for file in &report.files {
        summary.models += file.models.len();
        summary.tests += file.tests.len();
        if let Some(frontend) = &file.frontend {
            summary.api_calls += frontend.api_calls.len();
        }
        for entry in &file.symbols {
            if !entry.symbol.is_function() {
                summary.classes += 1;
                continue;
            }
            summary.functions += 1;
            let Some(metrics) = entry.complexity else {
                continue;
            };
            cyclomatic_total += u64::from(metrics.cyclomatic);
            scored += 1;
            if metrics.cyclomatic > threshold {
                summary.complex_functions.push(ComplexFunction {
                    qualname: entry.symbol.qualname.clone(),
                    file: file.path.clone(),
                    line: entry.symbol.line(),
                    cyclomatic: metrics.cyclomatic,
                    cognitive: metrics.cognitive,
                });
            }
        }
    }
    if scored > 0 {
        summary.average_cyclomatic = cyclomatic_total as f64 / scored as f64;
    }
    summary.complex_functions.sort_by(|a, b| {
        b.cyclomatic
            .cmp(&a.cyclomatic)
            .then_with(|| a.qualname.cmp(&b.qualname))
    });
    summary
}
