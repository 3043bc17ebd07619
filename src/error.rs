//! Error taxonomy for a single analysis run.
//!
//! Only [`AnalysisError::Config`] is fatal. Every other variant is turned
//! into an [`Issue`] attached to the report and the run moves on.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Source text that does not conform to the expected grammar.
    #[error("parse error in {path}{}: {message}", line_suffix(.line))]
    Parse {
        path: String,
        line: Option<usize>,
        message: String,
    },

    /// Unreadable file, permission problem, or similar.
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Missing or malformed vocabulary / glob configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The per-file wall-clock budget was exceeded.
    #[error("analysis of {path} exceeded its budget of {budget_ms}ms")]
    Timeout { path: String, budget_ms: u64 },
}

fn line_suffix(line: &Option<usize>) -> String {
    match line {
        Some(line) => format!(":{line}"),
        None => String::new(),
    }
}

impl AnalysisError {
    pub fn parse(path: impl Into<String>, line: Option<usize>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            line,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Convert a recoverable failure into the issue record surfaced in the report.
    pub fn to_issue(&self) -> Issue {
        match self {
            Self::Parse { path, line, message } => Issue {
                severity: Severity::Error,
                kind: IssueKind::Parse,
                path: path.clone(),
                line: *line,
                message: message.clone(),
            },
            Self::Io { path, source } => Issue {
                severity: Severity::Error,
                kind: IssueKind::Io,
                path: path.clone(),
                line: None,
                message: source.to_string(),
            },
            Self::Config(message) => Issue {
                severity: Severity::Error,
                kind: IssueKind::Config,
                path: String::new(),
                line: None,
                message: message.clone(),
            },
            Self::Timeout { path, budget_ms } => Issue {
                severity: Severity::Warning,
                kind: IssueKind::Timeout,
                path: path.clone(),
                line: None,
                message: format!("analysis exceeded {budget_ms}ms budget; file skipped"),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueKind {
    Parse,
    Io,
    Skipped,
    Timeout,
    Config,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub severity: Severity,
    pub kind: IssueKind,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub message: String,
}

impl Issue {
    pub fn skipped(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            kind: IssueKind::Skipped,
            path: path.into(),
            line: None,
            message: message.into(),
        }
    }

    pub fn warning(kind: IssueKind, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
            path: path.into(),
            line: None,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_becomes_error_issue_with_line() {
        let err = AnalysisError::parse("app/main.py", Some(4), "unexpected token");
        let issue = err.to_issue();
        assert_eq!(issue.severity, Severity::Error);
        assert_eq!(issue.kind, IssueKind::Parse);
        assert_eq!(issue.line, Some(4));
        assert_eq!(err.to_string(), "parse error in app/main.py:4: unexpected token");
    }

    #[test]
    fn only_config_errors_are_fatal() {
        assert!(AnalysisError::config("no route markers").is_fatal());
        let timeout = AnalysisError::Timeout {
            path: "a.py".to_string(),
            budget_ms: 5,
        };
        assert!(!timeout.is_fatal());
        assert_eq!(timeout.to_issue().severity, Severity::Warning);
    }

    #[test]
    fn skipped_issue_is_informational() {
        let issue = Issue::skipped("big.js", "too large");
        assert_eq!(issue.severity, Severity::Info);
        assert!(issue.severity < Severity::Warning);
    }
}
