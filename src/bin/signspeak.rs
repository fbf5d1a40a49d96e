use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use signspeak_engine::config::{AppConfig, SourceMode};
use signspeak_engine::dispatch::{enhancer_from_config, DispatchOutput, PassthroughEnhancer};
use signspeak_engine::engine::{GesturePipeline, ManualTimeSource};
use signspeak_engine::telemetry::TelemetryHub;
use signspeak_engine::transport::{spawn_transports, TransportContext};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "signspeak",
    about = "Gesture pipeline for the SignSpeak sensor glove"
)]
struct Cli {
    /// JSON configuration file (defaults are used when it does not exist)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Listen for sensor lines and publish sentences until Ctrl-C
    Run {
        /// TCP line listener address (overrides transport.tcp_addr)
        #[arg(long)]
        tcp: Option<String>,
        /// UDP datagram listener address (overrides transport.udp_addr)
        #[arg(long)]
        udp: Option<String>,
        /// HTTP listener address (overrides http.addr)
        #[arg(long)]
        http: Option<String>,
        /// Do not start the HTTP server
        #[arg(long)]
        no_http: bool,
        #[arg(long, value_enum)]
        source: Option<SourceArg>,
    },
    /// Feed a file of sensor lines through the pipeline and print confirmations
    Replay {
        #[arg(long)]
        input: PathBuf,
        /// Simulated time between consecutive lines
        #[arg(long, default_value_t = 100)]
        interval_ms: u64,
        #[arg(long, value_enum)]
        source: Option<SourceArg>,
        /// Comma-separated labels the replay must confirm, in order
        #[arg(long, value_delimiter = ',')]
        expect: Option<Vec<String>>,
    },
    /// Validate a configuration file and print the effective configuration
    CheckConfig,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum SourceArg {
    Posture,
    Delta,
    Both,
}

impl From<SourceArg> for SourceMode {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Posture => SourceMode::Posture,
            SourceArg::Delta => SourceMode::Delta,
            SourceArg::Both => SourceMode::Both,
        }
    }
}

fn main() -> ExitCode {
    init_tracing();
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("signspeak_engine=info,signspeak=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            tcp,
            udp,
            http,
            no_http,
            source,
        } => {
            let mut config = config;
            if tcp.is_some() {
                config.transport.tcp_addr = tcp;
            }
            if udp.is_some() {
                config.transport.udp_addr = udp;
            }
            if let Some(addr) = http {
                config.http.addr = addr;
            }
            if let Some(source) = source {
                config.pipeline.source = source.into();
            }
            run_service(config, !no_http)
        }
        Commands::Replay {
            input,
            interval_ms,
            source,
            expect,
        } => {
            let mut config = config;
            if let Some(source) = source {
                config.pipeline.source = source.into();
            }
            run_replay(config, &input, Duration::from_millis(interval_ms), expect)
        }
        Commands::CheckConfig => run_check(&config),
    }
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load_or_default(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(AppConfig::default()),
    }
}

fn run_check(config: &AppConfig) -> Result<ExitCode> {
    config.validate().context("validating configuration")?;
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(ExitCode::from(0))
}

fn run_service(config: AppConfig, serve_http: bool) -> Result<ExitCode> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;
    runtime.block_on(serve(config, serve_http))?;
    Ok(ExitCode::from(0))
}

async fn serve(config: AppConfig, serve_http: bool) -> Result<()> {
    let telemetry = Arc::new(TelemetryHub::default());
    let enhancer = enhancer_from_config(&config.dispatch).context("building enhancer")?;
    let pipeline = Arc::new(
        GesturePipeline::new(config.clone(), enhancer, Arc::clone(&telemetry))
            .context("building pipeline")?,
    );
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let ctx = TransportContext::new(
        pipeline.adapter(),
        telemetry,
        Duration::from_millis(config.transport.retry_backoff_ms),
        shutdown_rx.clone(),
    );
    let mut workers = spawn_transports(&config.transport, ctx);

    if serve_http {
        workers.extend(spawn_http(&pipeline, &config.http.addr, shutdown_rx.clone())?);
    }

    let runner = {
        let pipeline = Arc::clone(&pipeline);
        let shutdown_rx = shutdown_rx.clone();
        tokio::spawn(async move { pipeline.run(shutdown_rx).await })
    };

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;
    tracing::info!("shutdown requested");
    let _ = shutdown_tx.send(true);

    runner
        .await
        .context("polling task panicked")?
        .context("polling loop failed")?;
    for worker in workers {
        if let Err(err) = worker.await {
            tracing::warn!("worker ended abnormally: {err}");
        }
    }
    Ok(())
}

#[cfg(feature = "http")]
fn spawn_http(
    pipeline: &Arc<GesturePipeline>,
    addr: &str,
    shutdown: watch::Receiver<bool>,
) -> Result<Option<tokio::task::JoinHandle<()>>> {
    let addr: std::net::SocketAddr = addr
        .parse()
        .with_context(|| format!("parsing HTTP address {addr}"))?;
    Ok(Some(signspeak_engine::http::spawn(
        Arc::clone(pipeline),
        addr,
        shutdown,
    )))
}

#[cfg(not(feature = "http"))]
fn spawn_http(
    _pipeline: &Arc<GesturePipeline>,
    addr: &str,
    _shutdown: watch::Receiver<bool>,
) -> Result<Option<tokio::task::JoinHandle<()>>> {
    tracing::warn!("built without the http feature; not serving {addr}");
    Ok(None)
}

#[derive(Serialize)]
struct ReplayEvent<'a> {
    line: usize,
    #[serde(flatten)]
    output: &'a DispatchOutput,
}

#[derive(Serialize)]
struct ReplaySummary {
    lines: usize,
    accepted: u64,
    rejected: u64,
    confirmations: u64,
}

fn run_replay(
    mut config: AppConfig,
    input: &Path,
    interval: Duration,
    expect: Option<Vec<String>>,
) -> Result<ExitCode> {
    // Replay is deterministic: templated sentences only
    config.dispatch.enhance = false;

    let text = fs::read_to_string(input)
        .with_context(|| format!("reading replay input {}", input.display()))?;
    let clock = Arc::new(ManualTimeSource::new());
    let pipeline = GesturePipeline::with_time_source(
        config,
        Arc::new(PassthroughEnhancer),
        Arc::new(TelemetryHub::default()),
        clock.clone(),
    )
    .context("building pipeline")?;
    let adapter = pipeline.adapter();

    let mut confirmed = Vec::new();
    let mut lines = 0;
    for (index, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        lines += 1;
        clock.advance(interval);
        adapter.ingest_line(trimmed);

        let report = pipeline.poll_once();
        for ticket in report.dispatched {
            let event = ReplayEvent {
                line: index + 1,
                output: &ticket.output,
            };
            println!("{}", serde_json::to_string(&event)?);
            if let Some(label) = ticket.output.gesture_label {
                confirmed.push(label);
            }
        }
    }

    let stats = adapter.stats();
    let summary = ReplaySummary {
        lines,
        accepted: stats.accepted,
        rejected: stats.rejected,
        confirmations: pipeline.telemetry().counters().confirmations,
    };
    eprintln!("{}", serde_json::to_string(&summary)?);

    match expect {
        Some(expected) if expected != confirmed => {
            let diff = serde_json::json!({ "expected": expected, "actual": confirmed });
            eprintln!("{}", serde_json::to_string_pretty(&diff)?);
            Ok(ExitCode::from(2))
        }
        _ => Ok(ExitCode::from(0)),
    }
}
