use clap::{Parser, ValueEnum};
use dropmap_core::cleanup::Janitor;
use dropmap_core::compose::status_line;
use dropmap_core::workers::{RenderJob, RenderPool};
use dropmap_core::{Compositor, DefaultAssetLoader, RenderConfig, RenderRequest};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the match telemetry (JSON array of events)
    #[arg(value_name = "TELEMETRY")]
    telemetry: PathBuf,

    /// Player to trace (case-sensitive)
    #[arg(short, long)]
    player: String,

    /// Match identifier, used in the output file name
    #[arg(short, long, default_value = "match")]
    match_id: String,

    /// Also trace every teammate of the player
    #[arg(short, long)]
    team: bool,

    /// JSON render configuration
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output directory (overrides the config)
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Render threads (overrides the config, 0 = automatic)
    #[arg(long)]
    workers: Option<usize>,

    /// Directory searched for maps, icons and fonts
    #[arg(long, value_name = "DIR")]
    asset_dir: Option<PathBuf>,

    /// Delete the output after the configured retention delay, blocking until then
    #[arg(long)]
    cleanup: bool,

    /// Like --cleanup, with an explicit delay in seconds
    #[arg(long, value_name = "SECS")]
    cleanup_after: Option<u64>,

    /// Log level
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
enum LogFormat {
    Pretty,
    Json,
}

fn init_logging(level: LogLevel, format: LogFormat) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(level.to_string().parse()?)
        .from_env_lossy();

    let subscriber_builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        LogFormat::Json => subscriber_builder.json().init(),
        LogFormat::Pretty => subscriber_builder.pretty().init(),
    }
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<RenderConfig> {
    let mut config = match &cli.config {
        Some(path) => RenderConfig::from_file(path)?,
        None => RenderConfig::default(),
    };
    if let Some(dir) = &cli.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }
    Ok(config)
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.log_level, cli.log_format) {
        eprintln!("Could not initialize logging: {}", e);
        std::process::exit(2);
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    info!("Telemetry: {:?}", cli.telemetry);
    info!("Output directory: {:?}", config.output_dir);

    let loader = match &cli.asset_dir {
        Some(dir) => DefaultAssetLoader::with_root(dir),
        None => DefaultAssetLoader::default(),
    };
    let threads = config.workers;
    let cleanup_delay = cli
        .cleanup_after
        .map(Duration::from_secs)
        .or_else(|| cli.cleanup.then(|| config.retention()));
    let compositor = Compositor::new(config, Arc::new(loader));
    let mut pool = match RenderPool::new(compositor, threads) {
        Ok(pool) => pool,
        Err(e) => {
            error!("Could not start render workers: {}", e);
            std::process::exit(1);
        }
    };

    let janitor = match cleanup_delay {
        Some(delay) => match Janitor::new(delay) {
            Ok(janitor) => Some(Arc::new(janitor)),
            Err(e) => {
                warn!("Cleanup disabled, could not start janitor: {}", e);
                None
            }
        },
        None => None,
    };
    if let Some(janitor) = &janitor {
        pool = pool.with_janitor(Arc::clone(janitor));
    }

    let request = RenderRequest::new(cli.player, cli.match_id, cli.team);
    let result = pool.render_blocking(RenderJob::new(cli.telemetry, request));

    println!("{}", status_line(&result));
    if let Ok(outcome) = &result {
        if let Some(path) = outcome.output_path() {
            println!("{}", path.display());
        }
    }

    // the pool holds the other janitor handle
    drop(pool);
    if let Some(janitor) = janitor.and_then(|j| Arc::try_unwrap(j).ok()) {
        info!("Waiting {:?} before cleanup", janitor.delay());
        janitor.wait();
    }

    if result.is_err() {
        std::process::exit(1);
    }
}
