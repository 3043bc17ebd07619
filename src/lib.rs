//! Extraction and reconciliation engine for mixed backend/frontend trees.
//!
//! Python sources go through a tree-sitter symbol table; JavaScript,
//! TypeScript and Vue sources through anchored regular expressions. Both
//! sides feed route inventories that [`routes::reconcile`] pairs up.

pub mod analyzer;
pub mod cli;
pub mod config;
pub mod error;
pub mod metrics;
pub mod model;
pub mod routes;
pub mod util;
pub mod vocab;

pub use analyzer::{Analyzer, analyze};
pub use config::AnalyzerConfig;
pub use error::{AnalysisError, Issue};
pub use model::AnalysisReport;
pub use vocab::Vocabulary;
