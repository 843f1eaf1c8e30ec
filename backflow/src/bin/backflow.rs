use backflow::config::{parse_queue_kind, Config, Overrides};
use clap::Parser;
use eyre::{Context, Result};
use pipeline::{
    Pipeline, QueueKind, ReadSource, RunReport, Sequence, TelemetryWriter, WriteSink,
};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "backflow")]
#[command(about = "pipe bytes through a regulated bounded queue and report flow telemetry")]
#[command(version)]
struct Args {
    #[arg(
        allow_negative_numbers = true,
        help = "regulator gain (defaults to the config value, 0.0 without one)"
    )]
    gain: Option<f64>,

    #[arg(short, long, help = "configuration file path (toml format)")]
    config: Option<PathBuf>,

    #[arg(
        short,
        long,
        value_parser = parse_queue_kind,
        help = "queue and admission policy: locked, blocking or ring"
    )]
    queue: Option<QueueKind>,

    #[arg(short, long, help = "number of sampler ticks to run")]
    ticks: Option<u64>,

    #[arg(
        short,
        long,
        value_parser = humantime::parse_duration,
        help = "run length (e.g. 10s, 500ms); overrides --ticks"
    )]
    duration: Option<Duration>,

    #[arg(short, long, help = "read items from this file instead of stdin")]
    input: Option<PathBuf>,

    #[arg(long, help = "write telemetry to this file instead of stderr")]
    telemetry: Option<PathBuf>,

    #[arg(
        long,
        conflicts_with = "input",
        help = "feed an endless counter and discard the output"
    )]
    synthetic: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config path={}", path.display()))?,
        None => Config::default(),
    };
    config.apply(&Overrides {
        gain: args.gain,
        queue: args.queue,
        ticks: args.ticks,
        duration: args.duration,
    });

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_filter)),
        )
        .with_writer(io::stderr)
        .init();

    let pipeline = Pipeline::<u8>::new(config.pipeline)?;

    let halt = pipeline.halt_handle();
    ctrlc::set_handler(move || {
        tracing::info!("received ctrl+c, shutting down gracefully...");
        halt.raise();
    })?;

    let telemetry_out: Box<dyn Write> = match &args.telemetry {
        Some(path) => Box::new(BufWriter::new(File::create(path).with_context(|| {
            format!("failed to create telemetry file path={}", path.display())
        })?)),
        None => Box::new(io::stderr()),
    };
    let mut telemetry = TelemetryWriter::new(telemetry_out);

    let poll = pipeline.config().run.tick();
    let report = if args.synthetic {
        pipeline.run(
            &mut Sequence::new(),
            &mut WriteSink::new(io::sink()),
            &mut telemetry,
        )?
    } else if let Some(path) = &args.input {
        let file = File::open(path)
            .with_context(|| format!("failed to open input path={}", path.display()))?;
        pipeline.run(
            &mut ReadSource::spawn(file, pipeline.halt_handle(), poll)?,
            &mut WriteSink::new(io::stdout()),
            &mut telemetry,
        )?
    } else {
        pipeline.run(
            &mut ReadSource::spawn(io::stdin(), pipeline.halt_handle(), poll)?,
            &mut WriteSink::new(io::stdout()),
            &mut telemetry,
        )?
    };

    log_report(&report);
    Ok(())
}

fn log_report(report: &RunReport) {
    tracing::info!(
        ticks = report.summary.ticks,
        interrupted = report.summary.interrupted,
        accepted = report.totals.accepted,
        emitted = report.totals.emitted,
        dropped_at_shutdown = report.remaining,
        peak_queue_len = report.summary.peak_queue_len,
        "run complete"
    );
    if report.producer.exhausted {
        tracing::debug!(items = report.producer.items, "input fully read");
    }
    tracing::debug!(
        producer_bursts = report.producer.bursts,
        producer_truncated = report.producer.truncated,
        consumer_bursts = report.consumer.bursts,
        consumer_truncated = report.consumer.truncated,
        regulator_updates = report.regulator_updates,
        regimes_applied = report.regimes_applied,
        "loop statistics"
    );
}
