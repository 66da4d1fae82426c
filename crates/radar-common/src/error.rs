//! Error types shared across the radar crates.

use thiserror::Error;

/// Result type alias using RadarError.
pub type RadarResult<T> = Result<T, RadarError>;

/// Errors for configuration and metadata lookups that are not tied to a
/// single pipeline stage.
#[derive(Debug, Error)]
pub enum RadarError {
    // === Site metadata ===
    #[error("Radar site not found: {0}")]
    SiteNotFound(String),

    #[error("Invalid site metadata for '{site}': {message}")]
    InvalidSite { site: String, message: String },

    // === Layer / product identification ===
    #[error("Invalid layer identifier: {0}")]
    InvalidLayer(String),

    #[error("Unknown product code: {0}")]
    UnknownProduct(i16),

    // === Configuration ===
    #[error("Invalid color: {0}")]
    InvalidColor(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Failed to read data: {0}")]
    DataReadError(String),
}

impl RadarError {
    /// Short machine-readable kind, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            RadarError::SiteNotFound(_) => "site_not_found",
            RadarError::InvalidSite { .. } => "invalid_site",
            RadarError::InvalidLayer(_) => "invalid_layer",
            RadarError::UnknownProduct(_) => "unknown_product",
            RadarError::InvalidColor(_) => "invalid_color",
            RadarError::ConfigError(_) => "config",
            RadarError::DataReadError(_) => "data_read",
        }
    }

    /// Whether the error comes from site metadata (and therefore prevents
    /// georeferencing for that site only).
    pub fn is_site_error(&self) -> bool {
        matches!(
            self,
            RadarError::SiteNotFound(_) | RadarError::InvalidSite { .. }
        )
    }
}

impl From<std::io::Error> for RadarError {
    fn from(err: std::io::Error) -> Self {
        RadarError::DataReadError(err.to_string())
    }
}

impl From<serde_json::Error> for RadarError {
    fn from(err: serde_json::Error) -> Self {
        RadarError::ConfigError(format!("JSON error: {}", err))
    }
}
