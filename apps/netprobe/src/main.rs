use std::{
    io::{self, Write},
    path::PathBuf,
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::Parser;
use diag_core::{
    OverlayConfig, OverlaySurface, ProbeCatalog, ProbeSequencer, ProgressOverlay, StatusBoard,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod terminal;

use config::{load_settings, normalize_server_url};
use terminal::{TerminalNavigator, TerminalSink, TerminalSurface};

/// Runs the ping, traceroute and speedtest probes of a diagnostics server in
/// order and reports each outcome.
#[derive(Parser, Debug)]
#[command(name = "netprobe", version)]
struct Args {
    /// Base url of the diagnostics server.
    #[arg(long)]
    server_url: Option<String>,
    /// Address to ping and trace. Without it only the speedtest runs.
    #[arg(long)]
    target: Option<String>,
    /// Config file (defaults to ./netprobe.toml when present).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Path of the results page on the server.
    #[arg(long)]
    results_path: Option<String>,
    /// Per-probe timeout in seconds; 0 waits indefinitely.
    #[arg(long)]
    probe_timeout_secs: Option<u64>,
    /// Do not draw the progress bar.
    #[arg(long)]
    quiet: bool,
    /// Print the run report as JSON on stdout instead of status lines.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let surface = TerminalSurface::new();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(surface.log_writer())
        .init();
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(v) = args.server_url {
        settings.server_url = normalize_server_url(&v);
    }
    if let Some(v) = args.target {
        settings.target = Some(v);
    }
    if let Some(v) = args.results_path {
        settings.results_path = v;
    }
    if let Some(v) = args.probe_timeout_secs {
        settings.probe_timeout_secs = v;
    }
    settings.quiet |= args.quiet;
    info!(server_url = %settings.server_url, target = ?settings.target, "settings loaded");

    let catalog = ProbeCatalog::new(&settings.server_url)
        .with_context(|| format!("invalid server url '{}'", settings.server_url))?;
    let probes = catalog
        .standard(settings.target.as_deref())
        .context("failed to build probe list")?;
    let destination = catalog
        .results_url(&settings.results_path)
        .with_context(|| format!("invalid results path '{}'", settings.results_path))?;

    let bound_surface: Option<Arc<dyn OverlaySurface>> = if settings.quiet {
        None
    } else {
        Some(surface.clone() as Arc<dyn OverlaySurface>)
    };
    let overlay = ProgressOverlay::new(OverlayConfig::default(), bound_surface);

    let mut board = StatusBoard::new();
    if !args.json {
        for probe in &probes {
            board.bind(probe.id.clone(), TerminalSink::new(surface.clone()));
        }
    }

    let sequencer = ProbeSequencer::builder(
        Arc::new(overlay.clone()),
        Arc::new(TerminalNavigator::new(surface.clone())),
    )
    .probes(probes)
    .status_board(board)
    .destination(destination.as_str())
    .probe_timeout(settings.probe_timeout())
    .build()?;

    let report = sequencer.run().await;
    tokio::time::sleep(overlay.config().hide_delay).await;
    surface.finish();

    if args.json {
        let mut out = io::stdout().lock();
        serde_json::to_writer_pretty(&mut out, &report)?;
        writeln!(out)?;
    }
    info!(
        run_id = %report.run_id,
        probes = report.probes.len(),
        failed = report.failed(),
        "diagnostics finished"
    );

    Ok(())
}
