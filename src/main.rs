use anyhow::Result;
use clap::Parser;
use serde::Serialize;
use serde_json::json;
use stackmap::analyzer::Analyzer;
use stackmap::cli::{self, AnalyzeArgs, Command};
use stackmap::model::AnalysisReport;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_env("STACKMAP_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(opts: &AnalyzeArgs) -> Result<AnalysisReport> {
    let config = opts.to_config()?;
    Analyzer::new(config)?.run()
}

fn emit<T: Serialize>(value: &T, compact: bool) -> Result<()> {
    let rendered = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{rendered}");
    Ok(())
}

fn main() -> Result<()> {
    let args = cli::Args::parse();
    init_tracing();

    match args.command {
        Command::Analyze(opts) => {
            let report = run(&opts)?;
            emit(&report, opts.compact)
        }
        Command::Endpoints(opts) => {
            let report = run(&opts)?;
            emit(
                &json!({
                    "endpoints": report.endpoints,
                    "websockets": report.websockets,
                    "issues": report.issues,
                }),
                opts.compact,
            )
        }
        Command::Routes(opts) => {
            let report = run(&opts)?;
            emit(
                &json!({
                    "frontend_routes": report.frontend_routes,
                    "issues": report.issues,
                }),
                opts.compact,
            )
        }
        Command::Reconcile(opts) => {
            let report = run(&opts)?;
            emit(&report.reconciliation, opts.compact)
        }
        Command::Vocab { vocab } => {
            let vocabulary = cli::load_vocabulary(vocab.as_ref())?;
            print!("{}", vocabulary.to_yaml()?);
            Ok(())
        }
    }
}
