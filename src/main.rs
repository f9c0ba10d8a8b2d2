use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use apiary::config::{self, Settings, DEFAULT_MODULES_DIR, DEFAULT_SETTINGS_FILE};
use apiary::modules::{discover_modules, RouteRegistry, API_PREFIX};
use apiary::server;

#[derive(Parser)]
#[command(name = "apiary")]
#[command(about = "Plugin-based JSON API host", long_about = None)]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API host
    Serve(ServeArgs),
    /// Validate the settings document and module files, then exit
    Check(CheckArgs),
    /// Show version information
    Version,
}

#[derive(Args)]
struct ServeArgs {
    /// Path to the settings document
    #[arg(short, long, default_value = DEFAULT_SETTINGS_FILE)]
    config: PathBuf,

    /// Directory scanned for route modules
    #[arg(short, long, default_value = DEFAULT_MODULES_DIR)]
    modules: PathBuf,

    /// Listen port. Falls back to the PORT environment variable, then 3000
    #[arg(short, long)]
    port: Option<u16>,
}

impl Default for ServeArgs {
    fn default() -> Self {
        Self {
            config: PathBuf::from(DEFAULT_SETTINGS_FILE),
            modules: PathBuf::from(DEFAULT_MODULES_DIR),
            port: None,
        }
    }
}

#[derive(Args)]
struct CheckArgs {
    /// Path to the settings document
    #[arg(short, long, default_value = DEFAULT_SETTINGS_FILE)]
    config: PathBuf,

    /// Directory scanned for route modules
    #[arg(short, long, default_value = DEFAULT_MODULES_DIR)]
    modules: PathBuf,
}

fn init_logging(json_logs: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    match cli.command {
        Some(Commands::Serve(args)) => run_serve(args).await,
        None => run_serve(ServeArgs::default()).await,
        Some(Commands::Check(args)) => run_check(args),
        Some(Commands::Version) => {
            println!("apiary {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Load everything, bind the surviving modules, and serve.
async fn run_serve(args: ServeArgs) -> anyhow::Result<()> {
    let settings = Settings::load(&args.config)
        .with_context(|| format!("Failed to load settings document {}", args.config.display()))?;

    let report = discover_modules(&args.modules);

    let mut registry = RouteRegistry::new();
    let mut rejected = 0usize;
    for module in report.modules {
        if let Err(e) = registry.bind_module(module) {
            warn!(error = %e, "Rejected route module");
            rejected += 1;
        }
    }

    info!(
        routes = registry.route_count(),
        skipped = report.skipped.len(),
        rejected,
        "Route modules loaded"
    );

    let port = config::listen_port(args.port);
    server::serve(settings, registry, port).await?;
    Ok(())
}

/// Preflight: run the same loading pipeline as `serve` and report every
/// module file that would not make it into the route table. Exits non-zero
/// if any fail, so it can gate a deployment.
fn run_check(args: CheckArgs) -> anyhow::Result<()> {
    let settings = Settings::load(&args.config)
        .with_context(|| format!("Failed to load settings document {}", args.config.display()))?;
    println!("settings ok: creator \"{}\"", settings.creator());

    let report = discover_modules(&args.modules);

    let mut registry = RouteRegistry::new();
    let mut rejected = 0usize;
    for module in report.modules {
        let label = format!("{} {}{}", module.method, API_PREFIX, module.manifest.path);
        match registry.bind_module(module) {
            Ok(()) => println!("module   ok: {}", label),
            Err(e) => {
                println!("module fail: {}", e);
                rejected += 1;
            }
        }
    }
    for skipped in &report.skipped {
        println!("module fail: {}: {}", skipped.path.display(), skipped.reason);
    }

    println!("{} route(s) bound", registry.route_count());

    let failures = rejected + report.skipped.len();
    if failures > 0 {
        anyhow::bail!("{} module file(s) failed validation", failures);
    }
    Ok(())
}
