//! Radar overlay worker.
//!
//! Polls the configured radar layers, builds display frames for each new
//! product and keeps them current in a frame store:
//! - Products from an HTTP endpoint or a local directory tree
//! - Frame builds on a bounded worker pool
//! - Optional PNG snapshots of raster frames
//! - Optional Prometheus metrics endpoint

mod config;
mod snapshot;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use radar_common::{SiteCatalog, SiteMetadata};
use radar_pipeline::{DirectoryFetcher, FrameStore, HttpFetcher, ProductFetcher, UpdateScheduler};
use renderer::{install_palettes, PaletteRegistry};
use tokio::sync::broadcast;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use config::{SourceConfig, WorkerConfig};

#[derive(Parser, Debug)]
#[command(name = "radar-worker")]
#[command(about = "Keeps radar overlay frames current")]
struct Args {
    /// Layers file
    #[arg(long, env = "RADAR_CONFIG", default_value = "config/layers.yaml")]
    config: PathBuf,

    /// Run one update of every layer and exit
    #[arg(long)]
    once: bool,

    /// Read products from this directory tree instead of the configured source
    #[arg(long, env = "RADAR_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Fetch products from this URL template instead of the configured source
    #[arg(long, env = "RADAR_BASE_URL", conflicts_with = "data_dir")]
    base_url: Option<String>,

    /// Write a PNG of every published raster frame into this directory
    #[arg(long, env = "RADAR_SNAPSHOT_DIR")]
    snapshot_dir: Option<PathBuf>,

    /// Frame build workers (overrides the layers file)
    #[arg(long)]
    pool_size: Option<usize>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Serve Prometheus metrics on this port
    #[arg(long, env = "METRICS_PORT")]
    metrics_port: Option<u16>,
}

fn build_fetcher(args: &Args, config: &WorkerConfig) -> Result<Arc<dyn ProductFetcher>> {
    if let Some(dir) = &args.data_dir {
        info!(path = %dir.display(), "Reading products from directory");
        return Ok(Arc::new(DirectoryFetcher::new(dir.clone())));
    }
    if let Some(url) = &args.base_url {
        info!(template = %url.trim(), "Fetching products over HTTP");
        return Ok(Arc::new(HttpFetcher::new(url, Duration::from_secs(30))?));
    }

    let Some(source) = &config.source else {
        bail!("no product source: set --data-dir, --base-url or `source` in the layers file");
    };
    match source {
        SourceConfig::Http { url_template, .. } => {
            info!(template = %url_template.trim(), "Fetching products over HTTP");
            Ok(Arc::new(HttpFetcher::new(url_template, source.timeout())?))
        }
        SourceConfig::Directory { path } => {
            info!(path = %path.display(), "Reading products from directory");
            Ok(Arc::new(DirectoryFetcher::new(path.clone())))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting radar worker");

    if let Some(port) = args.metrics_port {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(([0, 0, 0, 0], port))
            .install()
            .context("Failed to start Prometheus exporter")?;
        info!(port, "Prometheus metrics exporter initialized");
    }

    let config = WorkerConfig::load(&args.config)?;

    if let Some(path) = &config.palettes_file {
        install_palettes(PaletteRegistry::from_file(path)?)?;
    }

    let sites: Arc<dyn SiteMetadata> = match &config.sites_file {
        Some(path) => Arc::new(SiteCatalog::from_file(path)?),
        None => Arc::new(SiteCatalog::embedded()?),
    };

    let mut pipeline = config.pipeline_config();
    if let Some(pool_size) = args.pool_size {
        pipeline.worker_pool_size = pool_size;
    }

    let layers = config.layer_ids();
    for layer in &layers {
        if let Err(e) = sites.site_info(&layer.site) {
            warn!(layer = %layer, error = %e, "Layer site is not in the catalog");
        }
    }

    let fetcher = build_fetcher(&args, &config)?;
    let store = Arc::new(FrameStore::new(layers.clone()));
    let scheduler = UpdateScheduler::new(&pipeline, fetcher, sites, store.clone())?;

    let snapshots = match &args.snapshot_dir {
        Some(dir) => {
            tokio::fs::create_dir_all(dir).await?;
            Some(tokio::spawn(snapshot::run_snapshots(
                dir.clone(),
                store.clone(),
                scheduler.subscribe_events(),
            )))
        }
        None => None,
    };

    if args.once {
        info!(layers = layers.len(), "Running single update cycle");
        let results = scheduler.update_all(&layers).await;
        let failed = results.iter().filter(|(_, r)| r.is_err()).count();
        if failed == results.len() && !results.is_empty() {
            warn!("Every layer update failed");
        }
    } else {
        let (shutdown_tx, _) = broadcast::channel::<()>(1);

        // Handle Ctrl+C
        let shutdown_tx_clone = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            info!("Received shutdown signal");
            shutdown_tx_clone.send(()).ok();
        });

        scheduler.run_forever(shutdown_tx.subscribe()).await;
    }

    for layer in &layers {
        match store.current_frame(layer) {
            Some(frame) => {
                let summary = frame.summary();
                info!(
                    layer = %layer,
                    frame = %summary.id,
                    valid_time = %summary.valid_time,
                    kind = ?summary.kind,
                    bytes = summary.bytes,
                    "Current frame"
                );
            }
            None => info!(layer = %layer, "No frame published"),
        }
    }

    // Closing the event channel lets the snapshot writer drain and exit.
    drop(scheduler);
    if let Some(handle) = snapshots {
        handle.await.ok();
    }

    info!("Radar worker stopped");
    Ok(())
}
