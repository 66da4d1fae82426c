//! Frame building errors.

use projection::ProjectionError;
use radar_common::ProductCode;
use thiserror::Error;

pub type RenderResult<T> = Result<T, RenderError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    #[error("Product has nothing to render: {0}")]
    NotRenderable(String),

    #[error("Product has no volume scan or generation time")]
    MissingTimestamp,

    #[error("No palette for product {0}")]
    NoPalette(ProductCode),

    #[error("Invalid palette '{name}': {reason}")]
    InvalidPalette { name: String, reason: String },

    #[error("Palettes were already installed")]
    PalettesInstalled,

    #[error(transparent)]
    Projection(#[from] ProjectionError),

    #[error("Image encoding failed: {0}")]
    Encode(String),
}

impl RenderError {
    pub fn invalid_palette(name: impl Into<String>, reason: impl Into<String>) -> Self {
        RenderError::InvalidPalette {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Short machine-readable kind, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            RenderError::NotRenderable(_) => "not_renderable",
            RenderError::MissingTimestamp => "missing_timestamp",
            RenderError::NoPalette(_) => "no_palette",
            RenderError::InvalidPalette { .. } => "invalid_palette",
            RenderError::PalettesInstalled => "palettes_installed",
            RenderError::Projection(e) => e.kind(),
            RenderError::Encode(_) => "encode",
        }
    }
}
