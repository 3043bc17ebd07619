//! Per-language analysis strategies.
//!
//! Every file goes through exactly one [`SourceAnalyzer`], chosen by its
//! language tag. Each returns a fresh [`FileAnalysis`]; nothing is shared
//! between files, which is what lets the aggregator run them on a pool.

use crate::analyzer::heuristic::HeuristicExtractor;
use crate::analyzer::manifest::read_manifests;
use crate::analyzer::python::{PythonParser, extract_models, extract_tests};
use crate::error::AnalysisError;
use crate::metrics;
use crate::model::{FileAnalysis, Language, SourceFile, SymbolReport};
use crate::routes::endpoints::{classify_module, websockets_in_module};
use crate::routes::frontend::RouteCollector;
use crate::vocab::Vocabulary;
use anyhow::Result;

/// Location flags of the file being analyzed.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteScope {
    pub client_routes: bool,
    pub server_routes: bool,
}

pub trait SourceAnalyzer {
    fn analyze(&mut self, file: &SourceFile, scope: RouteScope) -> Result<FileAnalysis, AnalysisError>;
}

fn empty_analysis(file: &SourceFile) -> FileAnalysis {
    FileAnalysis::new(file, metrics::compute_file_metrics(&file.text, file.language))
}

/// Python: syntax tree, symbol table, complexity, endpoints.
pub struct StructuralAnalyzer<'v> {
    parser: PythonParser,
    vocab: &'v Vocabulary,
}

impl<'v> StructuralAnalyzer<'v> {
    pub fn new(vocab: &'v Vocabulary) -> Result<Self> {
        Ok(Self {
            parser: PythonParser::new()?,
            vocab,
        })
    }
}

impl SourceAnalyzer for StructuralAnalyzer<'_> {
    fn analyze(&mut self, file: &SourceFile, _scope: RouteScope) -> Result<FileAnalysis, AnalysisError> {
        let module = self.parser.parse(file)?;
        let mut analysis = empty_analysis(file);
        analysis.symbols = module
            .symbols
            .iter()
            .map(|symbol| SymbolReport {
                complexity: if symbol.is_function() {
                    module
                        .definition(symbol)
                        .map(|node| metrics::score_function(node, symbol.positional_params()))
                } else {
                    None
                },
                symbol: symbol.clone(),
            })
            .collect();
        analysis.endpoints = classify_module(&module, self.vocab);
        analysis.websockets = websockets_in_module(&module, self.vocab);
        analysis.models = extract_models(&module, self.vocab);
        analysis.tests = extract_tests(&module);
        Ok(analysis)
    }
}

/// JavaScript, TypeScript and Vue: regex battery, plus route collection in client locations.
pub struct HeuristicAnalyzer<'v> {
    vocab: &'v Vocabulary,
}

impl<'v> HeuristicAnalyzer<'v> {
    pub fn new(vocab: &'v Vocabulary) -> Self {
        Self { vocab }
    }
}

impl SourceAnalyzer for HeuristicAnalyzer<'_> {
    fn analyze(&mut self, file: &SourceFile, scope: RouteScope) -> Result<FileAnalysis, AnalysisError> {
        let extraction = HeuristicExtractor::new(self.vocab).extract(file);
        let mut analysis = empty_analysis(file);
        if scope.client_routes {
            analysis.routes = RouteCollector::new(self.vocab).collect(&file.path, &extraction);
        }
        analysis.keyword_complexity = Some(metrics::keyword_complexity(file.language, &file.text));
        analysis.frontend = Some(extraction);
        Ok(analysis)
    }
}

/// YAML deployment manifests.
pub struct ManifestAnalyzer;

impl SourceAnalyzer for ManifestAnalyzer {
    fn analyze(&mut self, file: &SourceFile, _scope: RouteScope) -> Result<FileAnalysis, AnalysisError> {
        let mut analysis = empty_analysis(file);
        analysis.manifests = read_manifests(file)?;
        Ok(analysis)
    }
}

/// One analyzer per strategy; a worker owns a whole set.
pub struct AnalyzerSet<'v> {
    structural: StructuralAnalyzer<'v>,
    heuristic: HeuristicAnalyzer<'v>,
    manifest: ManifestAnalyzer,
}

impl<'v> AnalyzerSet<'v> {
    pub fn new(vocab: &'v Vocabulary) -> Result<Self> {
        Ok(Self {
            structural: StructuralAnalyzer::new(vocab)?,
            heuristic: HeuristicAnalyzer::new(vocab),
            manifest: ManifestAnalyzer,
        })
    }

    pub fn for_language(&mut self, language: Language) -> &mut dyn SourceAnalyzer {
        match language {
            Language::Python => &mut self.structural,
            Language::Javascript | Language::Typescript | Language::Tsx | Language::Vue => {
                &mut self.heuristic
            }
            Language::Yaml => &mut self.manifest,
        }
    }
}
