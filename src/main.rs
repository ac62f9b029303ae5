use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;

use recfilter::app::{
    Cli, OutputFormat, build_constraints, compile_mappings, init_sink, load_settings,
};
use recfilter::pipeline::{FilterProcessor, run_pipeline};
use recfilter::record::RecordReader;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("CLI: Failed to initialize thread pool")?;
    }

    let settings = load_settings(&cli)?;
    let constraints = build_constraints(&settings)?;
    if cli.dump {
        eprint!("{}", constraints.dump());
    }

    let mappings = compile_mappings(&settings)?;
    tracing::info!(
        "Filter: '{}' ({} nodes, {} mappings, {:?} types)",
        constraints.source(),
        constraints.tree().map_or(0, |tree| tree.node_count()),
        mappings.len(),
        constraints.policy()
    );

    let format = cli
        .format
        .unwrap_or_else(|| OutputFormat::detect(&cli.output));

    tracing::info!("Reading records from {:?}", cli.input);
    let records = RecordReader::open(&cli.input)?;
    let sink = init_sink(&format, &cli.output)
        .with_context(|| format!("CLI: Failed to open output {:?}", cli.output))?;

    let processor = Arc::new(FilterProcessor::new(
        Arc::new(constraints),
        Arc::new(mappings),
        settings.on_error,
    ));

    let start = std::time::Instant::now();
    let stats = run_pipeline(records, processor.clone(), sink, settings.batch_size)?;

    let elapsed = start.elapsed();
    tracing::info!(
        "Done! Matched {} of {} records in {:.2}s ({} skipped)",
        stats.matched,
        stats.records,
        elapsed.as_secs_f64(),
        processor.failed()
    );

    Ok(())
}
