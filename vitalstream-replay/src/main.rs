// VitalStream Replay - Command-line replay tool
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # VitalStream Replay
//!
//! Feeds a recorded capture session through the orchestrator and prints one
//! JSON snapshot per line on stdout.
//!
//! ## Usage
//!
//! ```bash
//! # Replay in real time
//! vitalstream-replay --samples session.csv --results engine.jsonl
//!
//! # 60 fps capture, 20x faster
//! vitalstream-replay --samples s.csv --results r.jsonl --preset 60fps --speed 20
//! ```

mod replay;

use clap::Parser;
use replay::{ReplayConfig, ReplayError};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;
use vitalstream::OrchestratorConfig;

/// VitalStream session replay
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Samples CSV (timestamp_ms,value[,side_confidence])
    #[arg(long)]
    samples: PathBuf,

    /// Recorded engine results (JSON lines)
    #[arg(long)]
    results: PathBuf,

    /// Replay speed multiplier (1.0 = real-time)
    #[arg(short, long, default_value = "1.0")]
    speed: f64,

    /// Orchestrator preset (30fps, 60fps)
    #[arg(long, default_value = "30fps")]
    preset: String,

    /// Override the display window size
    #[arg(long)]
    window: Option<usize>,

    /// Override the tick interval
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Print a JSON summary on stderr when done
    #[arg(long)]
    summary: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn orchestrator_config(&self) -> Result<OrchestratorConfig, ReplayError> {
        let mut config = match self.preset.to_lowercase().as_str() {
            "30fps" => OrchestratorConfig::camera_30fps(),
            "60fps" => OrchestratorConfig::camera_60fps(),
            other => {
                return Err(ReplayError::InvalidFormat(format!(
                    "Unknown preset '{}'",
                    other
                )))
            }
        };
        if let Some(window) = self.window {
            config = config.with_display_window(window);
        }
        if let Some(interval_ms) = self.interval_ms {
            config = config.with_flush_interval_ms(interval_ms);
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match args.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };
        EnvFilter::from_default_env().add_directive(level.into())
    });

    // Logs go to stderr; stdout carries the snapshots.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("VitalStream Replay v{}", env!("CARGO_PKG_VERSION"));

    let orchestrator = match args.orchestrator_config() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let config = ReplayConfig {
        samples_path: args.samples.clone(),
        results_path: args.results.clone(),
        speed: args.speed,
        orchestrator,
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match replay::run(&config, &mut out).await {
        Ok(summary) => {
            if args.summary {
                match serde_json::to_string_pretty(&summary) {
                    Ok(json) => eprintln!("{}", json),
                    Err(e) => error!("Failed to serialize summary: {}", e),
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Replay failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
