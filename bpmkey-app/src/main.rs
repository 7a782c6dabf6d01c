//! bpmkey CLI entry point
//!
//! Prints one JSON object for a single file, or a JSON array (in input
//! order) when several files are given.

mod batch;
mod cli;

use anyhow::Context;
use batch::{Outcome, Report};
use bpmkey_library::{AnalysisPipeline, Config};
use clap::Parser;
use cli::Cli;
use serde::Serialize;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> anyhow::Result<ExitCode> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?,
        None => Config::load(),
    };
    let config = cli.apply(config);
    debug!("Using {:?}", config);

    let mut pipeline = AnalysisPipeline::new().with_aggregator(config.aggregator());
    if let Some(transcoder) = config.transcoder() {
        pipeline = pipeline.with_transcoder(transcoder);
    }

    let jobs = config.jobs.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    });

    let outcomes = batch::analyze_all(Arc::new(pipeline), cli.files.clone(), jobs);
    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();

    match outcomes.as_slice() {
        [Outcome {
            result: Err(e), ..
        }] => eprintln!("Error: {}", e),
        [single] => print_json(&single.report(), cli.pretty)?,
        many => {
            let reports: Vec<Report> = many.iter().map(Outcome::report).collect();
            print_json(&reports, cli.pretty)?;
        }
    }

    Ok(if failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", json);
    Ok(())
}
