//! Update scheduler: fetch, decode, georeference, build and publish.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use level3_parser::ProductHeader;
use metrics::{counter, histogram};
use projection::Georeferencer;
use radar_common::{LayerId, SiteInfo, SiteMetadata};
use renderer::{build_frame, palettes, BuildOptions, FrameId, PaletteRegistry, RenderFrame};
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, error, info, instrument, warn};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::fetch::ProductFetcher;
use crate::store::{FrameStore, PublishOutcome};

/// Largest difference in degrees between the catalog position of a site and
/// the position a product carries before it is reported.
const SITE_POSITION_TOLERANCE_DEG: f64 = 0.05;

const EVENT_CAPACITY: usize = 256;

/// Outcome of one layer update, broadcast to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Published {
        layer: LayerId,
        frame: FrameId,
        valid_time: DateTime<Utc>,
        superseded: Option<FrameId>,
    },
    Unchanged {
        layer: LayerId,
        frame: FrameId,
    },
    Stale {
        layer: LayerId,
        candidate: DateTime<Utc>,
        current: DateTime<Utc>,
    },
    UpdateFailed {
        layer: LayerId,
        kind: &'static str,
        message: String,
    },
}

impl PipelineEvent {
    pub fn layer(&self) -> &LayerId {
        match self {
            PipelineEvent::Published { layer, .. }
            | PipelineEvent::Unchanged { layer, .. }
            | PipelineEvent::Stale { layer, .. }
            | PipelineEvent::UpdateFailed { layer, .. } => layer,
        }
    }
}

/// Drives layer updates and publishes the results into a [`FrameStore`].
///
/// Fetches run as tokio tasks. Decoding, georeferencing and geometry building
/// for one frame run on a single worker of a bounded rayon pool, so as many
/// frames build at once as the pool has threads.
pub struct UpdateScheduler {
    fetcher: Arc<dyn ProductFetcher>,
    sites: Arc<dyn SiteMetadata>,
    store: Arc<FrameStore>,
    pool: Arc<rayon::ThreadPool>,
    palettes: &'static PaletteRegistry,
    options: BuildOptions,
    poll_interval: Duration,
    max_concurrent: usize,
    events: broadcast::Sender<PipelineEvent>,
}

impl UpdateScheduler {
    pub fn new(
        config: &PipelineConfig,
        fetcher: Arc<dyn ProductFetcher>,
        sites: Arc<dyn SiteMetadata>,
        store: Arc<FrameStore>,
    ) -> PipelineResult<Self> {
        config.validate().map_err(PipelineError::Config)?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_pool_size)
            .thread_name(|i| format!("radar-build-{}", i))
            .panic_handler(|_| error!("Frame build worker panicked"))
            .build()
            .map_err(|e| PipelineError::Config(e.to_string()))?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        info!(
            workers = config.worker_pool_size,
            poll_interval_secs = config.poll_interval_secs,
            layers = store.layers().len(),
            "Created update scheduler"
        );

        Ok(Self {
            fetcher,
            sites,
            store,
            pool: Arc::new(pool),
            palettes: palettes(),
            options: config.build_options(),
            poll_interval: config.poll_interval(),
            max_concurrent: config.worker_pool_size,
            events,
        })
    }

    /// Use a palette table other than the process-wide one.
    pub fn with_palettes(mut self, palettes: &'static PaletteRegistry) -> Self {
        self.palettes = palettes;
        self
    }

    pub fn store(&self) -> &Arc<FrameStore> {
        &self.store
    }

    pub fn build_options(&self) -> &BuildOptions {
        &self.options
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: PipelineEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Run one update of a layer.
    ///
    /// Any failure leaves the layer's published frame in place.
    #[instrument(skip_all, fields(layer = %layer))]
    pub async fn update(&self, layer: &LayerId) -> PipelineResult<PublishOutcome> {
        self.store.begin_update(layer)?;

        match self.run_update(layer).await {
            Ok((outcome, frame)) => {
                let event = match &outcome {
                    PublishOutcome::Published { superseded } => PipelineEvent::Published {
                        layer: layer.clone(),
                        frame: frame.id,
                        valid_time: frame.valid_time,
                        superseded: *superseded,
                    },
                    PublishOutcome::Unchanged => PipelineEvent::Unchanged {
                        layer: layer.clone(),
                        frame: frame.id,
                    },
                };
                self.emit(event);
                Ok(outcome)
            }
            Err(e) => {
                if let PipelineError::Stale {
                    candidate, current, ..
                } = &e
                {
                    self.emit(PipelineEvent::Stale {
                        layer: layer.clone(),
                        candidate: *candidate,
                        current: *current,
                    });
                    return Err(e);
                }

                let kind = e.kind();
                error!(layer = %layer, kind, error = %e, "Layer update failed");
                counter!("radar_updates_failed_total", "kind" => kind).increment(1);
                self.store.record_failure(layer, &e)?;
                self.emit(PipelineEvent::UpdateFailed {
                    layer: layer.clone(),
                    kind,
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn run_update(
        &self,
        layer: &LayerId,
    ) -> PipelineResult<(PublishOutcome, Arc<RenderFrame>)> {
        let site = self.sites.site_info(&layer.site)?;
        let bytes = self.fetcher.fetch_latest(&layer.site, layer.product).await?;
        debug!(layer = %layer, bytes = bytes.len(), "Fetched product");

        let current = self.store.current_frame(layer).map(|f| f.valid_time);
        let frame = match self.build_on_pool(layer, site, bytes, current).await {
            Ok(frame) => Arc::new(frame),
            Err(PipelineError::Stale {
                candidate, current, ..
            }) => return Err(self.store.reject_stale(layer, candidate, current)),
            Err(e) => return Err(e),
        };
        self.store.mark_built(layer)?;
        let outcome = self.store.publish(layer, Arc::clone(&frame))?;
        Ok((outcome, frame))
    }

    /// Build a frame on one worker of the build pool.
    ///
    /// Products not newer than `current` stop after decoding with
    /// [`PipelineError::Stale`].
    async fn build_on_pool(
        &self,
        layer: &LayerId,
        site: SiteInfo,
        bytes: Bytes,
        current: Option<DateTime<Utc>>,
    ) -> PipelineResult<RenderFrame> {
        let (tx, rx) = oneshot::channel();
        let layer = layer.clone();
        let palettes = self.palettes;
        let options = self.options;

        self.pool.spawn(move || {
            let result = process(&layer, &site, &bytes, current, palettes, &options);
            // The update was abandoned if the receiver is gone.
            let _ = tx.send(result);
        });

        rx.await.map_err(|_| PipelineError::WorkerGone)?
    }

    /// Update several layers concurrently.
    pub async fn update_all(
        &self,
        layers: &[LayerId],
    ) -> Vec<(LayerId, PipelineResult<PublishOutcome>)> {
        stream::iter(layers)
            .map(|layer| async move { (layer.clone(), self.update(layer).await) })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await
    }

    /// Poll every layer of the store until shutdown.
    pub async fn run_forever(&self, mut shutdown: broadcast::Receiver<()>) {
        let layers = self.store.layers();
        info!(layers = layers.len(), "Starting update loop");

        loop {
            let results = self.update_all(&layers).await;
            let published = results
                .iter()
                .filter(|(_, r)| matches!(r, Ok(PublishOutcome::Published { .. })))
                .count();
            let unchanged = results
                .iter()
                .filter(|(_, r)| {
                    matches!(r, Ok(PublishOutcome::Unchanged) | Err(PipelineError::Stale { .. }))
                })
                .count();
            let failed = results.len() - published - unchanged;
            info!(published, unchanged, failed, "Update cycle complete");

            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Shutting down update loop");
                    break;
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }
}

/// CPU stages of one update.
fn process(
    layer: &LayerId,
    site: &SiteInfo,
    bytes: &[u8],
    current: Option<DateTime<Utc>>,
    palettes: &PaletteRegistry,
    options: &BuildOptions,
) -> PipelineResult<RenderFrame> {
    let started = Instant::now();

    let product = level3_parser::decode(bytes)?;
    check_product(layer, site, &product.header);
    if let (Some(candidate), Some(current)) = (product.header.timestamp(), current) {
        if candidate <= current {
            return Err(PipelineError::Stale {
                layer: layer.clone(),
                candidate,
                current,
            });
        }
    }
    if !product.dropped_radials.is_empty() {
        counter!("radar_radials_dropped_total").increment(product.dropped_radials.len() as u64);
    }

    let georef = Georeferencer::new(site)?;
    let frame = build_frame(product, &georef, palettes, options)?;

    let elapsed = started.elapsed();
    histogram!("radar_build_duration_seconds").record(elapsed.as_secs_f64());
    debug!(
        layer = %layer,
        frame = %frame.id,
        kind = ?frame.kind(),
        elapsed_ms = elapsed.as_millis() as u64,
        "Built frame"
    );
    Ok(frame)
}

/// Report products that do not match the layer they were fetched for.
fn check_product(layer: &LayerId, site: &SiteInfo, header: &ProductHeader) {
    if header.product_code != layer.product {
        warn!(
            layer = %layer,
            product = %header.product_code,
            "Product code differs from layer"
        );
    }
    if !header.site_id.is_empty() && !layer.site.ends_with(&header.site_id) {
        warn!(layer = %layer, site = %header.site_id, "Product site differs from layer");
    }
    let lat_diff = (header.site_latitude - site.latitude).abs();
    let lon_diff = (header.site_longitude - site.longitude).abs();
    if lat_diff > SITE_POSITION_TOLERANCE_DEG || lon_diff > SITE_POSITION_TOLERANCE_DEG {
        warn!(
            layer = %layer,
            product_lat = header.site_latitude,
            product_lon = header.site_longitude,
            catalog_lat = site.latitude,
            catalog_lon = site.longitude,
            "Product site position differs from catalog"
        );
    }
}
