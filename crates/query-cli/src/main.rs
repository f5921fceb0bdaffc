use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;

use analytics_agents::constants::defaults;
use analytics_agents::{
    append_to_report, load_samples, AnalyticsPipeline, PipelineConfig, PipelineOutcome,
};
use node_engine::LogEventSink;

#[derive(Parser)]
#[command(
    name = "analytics-query",
    version,
    about = "Answer marketing analytics questions from campaign data and a knowledge base"
)]
struct Cli {
    /// Path to the JSON config file (defaults apply when it does not exist)
    #[arg(short, long, default_value = "analytics.json")]
    config: PathBuf,

    /// Run every query in a sample file instead of a single query
    #[arg(short, long, conflicts_with = "query")]
    samples: Option<PathBuf>,

    /// Append answers to the markdown report
    #[arg(short, long)]
    report: bool,

    /// Report file used with --report
    #[arg(long, default_value = defaults::REPORT_PATH)]
    report_path: PathBuf,

    /// Write the effective default config to --config and exit
    #[arg(long)]
    init: bool,

    /// The question to answer
    #[arg(trailing_var_arg = true)]
    query: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    if cli.init {
        PipelineConfig::default()
            .save(&cli.config)
            .await
            .with_context(|| format!("failed to write {:?}", cli.config))?;
        println!("Wrote default config to {}", cli.config.display());
        return Ok(());
    }

    let queries = match &cli.samples {
        Some(path) => load_samples(path)
            .await
            .with_context(|| format!("failed to read sample queries from {:?}", path))?,
        None if !cli.query.is_empty() => vec![cli.query.join(" ")],
        None => bail!("no query given; pass a question or --samples FILE"),
    };
    if queries.is_empty() {
        bail!("no sample queries found");
    }

    let config = PipelineConfig::load(&cli.config)
        .await
        .with_context(|| format!("failed to load {:?}", cli.config))?
        .with_env_overrides();
    let pipeline = AnalyticsPipeline::from_config(config)
        .await
        .context("failed to set up the analytics pipeline")?;

    let total = queries.len();
    let mut errors = 0;
    for (index, query) in queries.iter().enumerate() {
        if total > 1 {
            println!("\nQuery {}/{}: {}", index + 1, total, query);
            println!("{}", "-".repeat(60));
        }

        let answer = match pipeline.run(query, &LogEventSink).await {
            Ok(outcome) => {
                print_outcome(&outcome);
                outcome.analysis.unwrap_or_else(|| "No result".to_string())
            }
            Err(e) => {
                errors += 1;
                eprintln!("Error processing query: {:#}", anyhow::Error::from(e));
                continue;
            }
        };

        if cli.report {
            append_to_report(&cli.report_path, query, &answer)
                .await
                .with_context(|| format!("failed to append to {:?}", cli.report_path))?;
        }
    }

    if errors > 0 {
        bail!("{} of {} queries could not be processed", errors, total);
    }
    Ok(())
}

fn print_outcome(outcome: &PipelineOutcome) {
    match &outcome.analysis {
        Some(analysis) => println!("{}", analysis),
        None => println!("No analysis result."),
    }
    for failure in &outcome.failures {
        eprintln!("  {} failed: {}", failure.node_id, failure.error);
    }
    log::debug!(
        "Run {} finished in {} ms ({} node(s) executed)",
        outcome.report.run_id,
        outcome.report.elapsed_ms,
        outcome.report.nodes_executed
    );
}
