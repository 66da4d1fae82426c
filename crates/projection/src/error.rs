//! Georeferencing errors.

use radar_common::RadarError;
use thiserror::Error;

pub type ProjectionResult<T> = Result<T, ProjectionError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    /// Site coordinates cannot be used as a projection origin.
    #[error("Georeference error for site '{site}': {message}")]
    InvalidSite { site: String, message: String },

    /// Gate spacing, start range or elevation angle is unusable.
    #[error("Invalid gate geometry: {0}")]
    InvalidGeometry(String),

    #[error("Invalid raster grid: {0}")]
    InvalidGrid(String),
}

impl ProjectionError {
    pub fn invalid_geometry(message: impl Into<String>) -> Self {
        ProjectionError::InvalidGeometry(message.into())
    }

    /// Short machine-readable kind, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            ProjectionError::InvalidSite { .. } => "georeference",
            ProjectionError::InvalidGeometry(_) => "invalid_geometry",
            ProjectionError::InvalidGrid(_) => "invalid_grid",
        }
    }
}

impl From<RadarError> for ProjectionError {
    fn from(err: RadarError) -> Self {
        match err {
            RadarError::InvalidSite { site, message } => {
                ProjectionError::InvalidSite { site, message }
            }
            RadarError::SiteNotFound(site) => ProjectionError::InvalidSite {
                message: "site not found".to_string(),
                site,
            },
            other => ProjectionError::InvalidSite {
                site: String::new(),
                message: other.to_string(),
            },
        }
    }
}
