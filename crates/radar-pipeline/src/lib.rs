//! Background radar layer updates.
//!
//! For each configured layer the [`UpdateScheduler`] fetches the newest
//! product, decodes and georeferences it, builds a frame on a bounded worker
//! pool and publishes it into the [`FrameStore`]. Readers take the current
//! frame without blocking and can await publishes through a per-layer
//! generation counter.
//!
//! ```no_run
//! # async fn run() -> radar_pipeline::PipelineResult<()> {
//! use radar_common::{LayerId, SiteCatalog};
//! use radar_pipeline::{DirectoryFetcher, FrameStore, PipelineConfig, UpdateScheduler};
//! use std::sync::Arc;
//!
//! let layer = LayerId::new("KTLX", 94);
//! let store = Arc::new(FrameStore::new([layer.clone()]));
//! let scheduler = UpdateScheduler::new(
//!     &PipelineConfig::default(),
//!     Arc::new(DirectoryFetcher::new("/data/level3")),
//!     Arc::new(SiteCatalog::embedded()?),
//!     store.clone(),
//! )?;
//! scheduler.update(&layer).await?;
//! let frame = store.current_frame(&layer);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod fetch;
pub mod scheduler;
pub mod store;

pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};
pub use fetch::{DirectoryFetcher, FetchError, HttpFetcher, ProductFetcher};
pub use scheduler::{PipelineEvent, UpdateScheduler};
pub use store::{FrameStore, PublishOutcome, SlotState, SlotStatus};
