//! Upload Relay - replay engine callbacks through the relay
//!
//! Reads a JSON-lines script of engine callbacks and queue operations,
//! prints every emitted event to stdout as one JSON object per line.

use clap::Parser;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use upload_relay::config::Config;
use upload_relay::replay::Replay;
use upload_relay::sink::JsonLinesSink;

/// Upload Relay - relay upload lifecycle events and drain the upload queue
#[derive(Parser, Debug)]
#[command(name = "upload-relay")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Script to replay, `-` for stdin
    #[arg(short, long, default_value = "-")]
    script: String,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short, long)]
    log_level: Option<String>,

    /// Print Prometheus metrics to stderr after the replay
    #[arg(long)]
    metrics: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(level) = args.log_level {
        config.logging.level = level;
        config.validate()?;
    }

    upload_relay::logging::init_subscriber(&config.logging)?;
    info!("Starting Upload Relay v{}", upload_relay::VERSION);
    if let Some(path) = &args.config {
        info!("Loaded configuration from {:?}", path);
    }

    let reader: Box<dyn BufRead + Send> = if args.script == "-" {
        Box::new(BufReader::new(std::io::stdin()))
    } else {
        Box::new(BufReader::new(File::open(&args.script)?))
    };

    // Engine callbacks arrive off the runtime, the same as a real engine.
    // Each event is written and flushed before the next command runs.
    let summary = tokio::task::spawn_blocking(move || {
        let sink = JsonLinesSink::new(std::io::stdout());
        let mut replay = Replay::new(&config, Arc::new(sink));
        replay.run(reader)
    })
    .await??;

    info!(
        commands = summary.commands,
        rejected = summary.rejected,
        "Replay finished"
    );

    if args.metrics {
        eprint!("{}", upload_relay::metrics::gather_text());
    }

    Ok(())
}
