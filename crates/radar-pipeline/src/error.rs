//! Pipeline error types.

use chrono::{DateTime, Utc};
use level3_parser::Level3Error;
use projection::ProjectionError;
use radar_common::{LayerId, RadarError};
use renderer::RenderError;
use thiserror::Error;

use crate::fetch::FetchError;

/// Result type alias using PipelineError.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors from one layer update. None of them stop the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Decode failed: {0}")]
    Decode(#[from] Level3Error),

    #[error("Georeference failed: {0}")]
    Georeference(#[from] ProjectionError),

    #[error("Frame build failed: {0}")]
    Render(#[from] RenderError),

    #[error(transparent)]
    Site(#[from] RadarError),

    #[error("Frame for {layer} at {candidate} is not newer than the current frame at {current}")]
    Stale {
        layer: LayerId,
        candidate: DateTime<Utc>,
        current: DateTime<Utc>,
    },

    #[error("Layer {0} is not configured")]
    UnknownLayer(LayerId),

    #[error("Build worker stopped before returning a result")]
    WorkerGone,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Short machine-readable kind, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Fetch(_) => "fetch",
            PipelineError::Decode(e) => e.kind(),
            PipelineError::Georeference(e) => e.kind(),
            PipelineError::Render(e) => e.kind(),
            PipelineError::Site(e) => e.kind(),
            PipelineError::Stale { .. } => "stale",
            PipelineError::UnknownLayer(_) => "unknown_layer",
            PipelineError::WorkerGone => "worker_gone",
            PipelineError::Config(_) => "config",
        }
    }
}
