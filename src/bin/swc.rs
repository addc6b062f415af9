//! swc — sw-cache CLI
//!
//! Drives a [`CacheWorker`](sw_cache::CacheWorker) over disk-persisted
//! cache storage: seed and activate a version, push requests through it,
//! and inspect the stores it left behind.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use reqwest::Method;
use tracing::{debug, info};

use sw_cache::{
    BuildInfo, CacheStorage, CacheWorker, Config, DiskCacheStorage, HttpFetcher, Registration,
    Request, SwCacheError,
};

/// sw-cache CLI
#[derive(Parser)]
#[command(name = "swc")]
#[command(version = sw_cache::PKG_VERSION)]
#[command(about = "Versioned asset caching layer")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long, env = "SW_CACHE_CONFIG")]
    config: Option<PathBuf>,

    /// Override the storage directory.
    #[arg(long, env = "SW_CACHE_DIR")]
    storage_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Seed the static store without activating
    Install,

    /// Activate an installed version (prune stale stores)
    Activate,

    /// Install, then activate (prune stale stores)
    Update,

    /// Send a request through the active version
    Fetch {
        /// Absolute URL, or a path resolved against the configured origin
        url: String,
        /// HTTP method
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,
    },

    /// Show which strategy a URL is routed to
    Route {
        /// Absolute URL, or a path resolved against the configured origin
        url: String,
    },

    /// List stores and their entries
    Stores,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    info!(version = %BuildInfo::current(), command = ?args.command, "swc starting");
    if let Err(e) = run(args).await {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

async fn run(args: Args) -> sw_cache::Result<()> {
    let config = Config::load(args.config.as_deref())?;
    let origin = config.worker.validate()?;
    let storage_dir = args
        .storage_dir
        .unwrap_or_else(|| config.storage.resolved_dir());

    let storage = Arc::new(DiskCacheStorage::load(&storage_dir).await?);
    let fetcher = Arc::new(HttpFetcher::with_timeout(config.network.timeout())?);
    let worker = CacheWorker::builder()
        .config(config.worker.clone())
        .routing(config.routing.clone())
        .storage(storage.clone())
        .fetcher(fetcher.clone())
        .build()?;

    match args.command {
        Command::Install => {
            worker.install().await?;
            println!(
                "installed {} assets into {}",
                config.worker.static_assets.len(),
                config.worker.static_cache
            );
        }
        Command::Activate => {
            let registration = Registration::new(fetcher);
            registration.activate_installed(worker).await?;
            print_active(&config, storage.as_ref()).await?;
        }
        Command::Update => {
            let registration = Registration::new(fetcher);
            registration.register(worker).await?;
            print_active(&config, storage.as_ref()).await?;
        }
        Command::Fetch { url, method } => {
            let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                .map_err(|e| SwCacheError::Configuration(format!("invalid method: {e}")))?;
            let target = Request::resolve(&origin, &url)?;
            let request = Request::new(method, target.url().clone());

            let registration = Registration::new(fetcher);
            let (_, resumption) = registration.resume(worker).await?;
            debug!(?resumption, "version in control");

            let mut response = registration.fetch(request).await?;
            let body = response.bytes()?;
            println!("{} ({} bytes)", response.status(), body.len());
        }
        Command::Route { url } => {
            let request = Request::resolve(&origin, &url)?;
            println!("{}", config.routing.classify(request.url()));
        }
        Command::Stores => {
            println!("storage: {}", storage.path().display());
            let expected = config.worker.expected_stores();
            for name in storage.keys().await? {
                let marker = if expected.contains(&name.as_str()) { "" } else { " (stale)" };
                let store = storage.open(&name).await?;
                let mut keys = store.keys().await?;
                keys.sort();
                println!("{name}{marker}: {} entries", keys.len());
                for key in keys {
                    println!("  {key}");
                }
            }
        }
    }

    Ok(())
}

async fn print_active(config: &Config, storage: &DiskCacheStorage) -> sw_cache::Result<()> {
    println!("active: {}", config.worker.static_cache);
    for name in storage.keys().await? {
        println!("  {name}");
    }
    Ok(())
}
