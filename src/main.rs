//! vqmetrics command line entry point

mod cli;

use std::fs::File;
use std::io::{self, BufWriter};

use clap::Parser;
use color_eyre::{eyre::WrapErr, Result};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vqmetrics::{capture, pipeline, Config, MetricPipeline, MetricTable, PipelineSummary};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling and logging
    color_eyre::install()?;

    let args = cli::Args::parse();
    let mut config = Config::load(args.config.as_deref()).wrap_err("Failed to load configuration")?;
    args.apply(&mut config);
    init_tracing(config.debug);

    info!("vqmetrics starting");

    let source = capture::open_source(&config.source)?;
    info!("Input: {}", source.properties());

    let mut analysis = MetricPipeline::new(&config.analysis);
    let records = if config.pipeline.pipelined {
        let shutdown = async {
            if tokio::signal::ctrl_c().await.is_err() {
                // No signal handler available, never interrupt
                std::future::pending::<()>().await;
            }
        };
        pipeline::run_pipelined(&mut analysis, source, config.pipeline.queue_depth, shutdown).await?
    } else {
        let mut source = source;
        analysis.run(&mut source)
    };

    let PipelineSummary {
        frames,
        change_events,
    } = analysis.summary();
    info!("Processed {} frames, {} near-duplicates", frames, change_events);
    if frames == 0 {
        warn!("Source produced no frames");
    }

    let table = MetricTable::from_records(config.analysis.add_mse, &records);
    match &config.output.path {
        Some(path) => {
            let file = File::create(path)
                .wrap_err_with(|| format!("Failed to create {}", path.display()))?;
            table.write_csv(BufWriter::new(file))?;
            info!("Wrote {} rows to {}", table.len(), path.display());
        }
        None => table.write_csv(io::stdout().lock())?,
    }

    Ok(())
}

fn init_tracing(debug: u8) {
    let level = match debug {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("vqmetrics={level}")));

    let registry = tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .with_writer(io::stderr)
            .with_timer(fmt::time::uptime()),
    );

    #[cfg(feature = "profiling")]
    let registry = registry.with(tracing_tracy::TracyLayer::default());

    registry.init();
}
