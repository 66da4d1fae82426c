//! Pipeline configuration.

use renderer::{BuildOptions, ColorOptions, LodPolicy};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tuning for the update scheduler and frame building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Threads in the frame build pool
    pub worker_pool_size: usize,
    /// Seconds between polls of each layer
    pub poll_interval_secs: u64,
    /// Map zoom level frames are built for
    pub zoom: f64,
    pub mesh_min_zoom: f64,
    pub max_mesh_vertices: usize,
    /// Longer side of raster frames in pixels
    pub raster_size: usize,
    pub boundary_tolerance_deg: f64,
    pub show_range_folded: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let lod = LodPolicy::default();
        let build = BuildOptions::default();
        Self {
            worker_pool_size: 4,
            poll_interval_secs: 60,
            zoom: build.zoom,
            mesh_min_zoom: lod.mesh_min_zoom,
            max_mesh_vertices: lod.max_mesh_vertices,
            raster_size: lod.raster_size,
            boundary_tolerance_deg: build.boundary_tolerance_deg,
            show_range_folded: true,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, target: &mut T) {
    if let Ok(val) = std::env::var(name) {
        if let Ok(parsed) = val.trim().parse() {
            *target = parsed;
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        env_parse("RADAR_WORKER_POOL_SIZE", &mut config.worker_pool_size);
        env_parse("RADAR_POLL_INTERVAL_SECS", &mut config.poll_interval_secs);
        env_parse("RADAR_MESH_MIN_ZOOM", &mut config.mesh_min_zoom);
        env_parse("RADAR_MAX_MESH_VERTICES", &mut config.max_mesh_vertices);
        env_parse("RADAR_RASTER_SIZE", &mut config.raster_size);
        env_parse(
            "RADAR_BOUNDARY_TOLERANCE_DEG",
            &mut config.boundary_tolerance_deg,
        );

        if let Ok(val) = std::env::var("RADAR_SHOW_RANGE_FOLDED") {
            config.show_range_folded = val.to_lowercase() == "true" || val == "1";
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.worker_pool_size == 0 {
            return Err("worker_pool_size must be > 0".to_string());
        }

        if self.poll_interval_secs == 0 {
            return Err("poll_interval_secs must be > 0".to_string());
        }

        if self.raster_size < 16 || self.raster_size > 8192 {
            return Err("raster_size must be 16-8192".to_string());
        }

        if self.max_mesh_vertices > u32::MAX as usize {
            return Err("max_mesh_vertices must fit 32-bit indices".to_string());
        }

        if !(0.0..=5.0).contains(&self.boundary_tolerance_deg) {
            return Err("boundary_tolerance_deg must be 0-5".to_string());
        }

        if !self.zoom.is_finite() || !self.mesh_min_zoom.is_finite() {
            return Err("zoom levels must be finite".to_string());
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            zoom: self.zoom,
            force: None,
            lod: LodPolicy {
                mesh_min_zoom: self.mesh_min_zoom,
                max_mesh_vertices: self.max_mesh_vertices,
                raster_size: self.raster_size,
            },
            boundary_tolerance_deg: self.boundary_tolerance_deg,
            colors: ColorOptions {
                show_range_folded: self.show_range_folded,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.build_options(), BuildOptions::default());
        assert_eq!(config.poll_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_validate_rejects() {
        let config = PipelineConfig {
            worker_pool_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = PipelineConfig {
            raster_size: 4,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = PipelineConfig {
            boundary_tolerance_deg: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_env() {
        // Only this test touches these variables.
        std::env::set_var("RADAR_WORKER_POOL_SIZE", "2");
        std::env::set_var("RADAR_RASTER_SIZE", " 512 ");
        std::env::set_var("RADAR_MESH_MIN_ZOOM", "not a number");
        std::env::set_var("RADAR_SHOW_RANGE_FOLDED", "false");

        let config = PipelineConfig::from_env();
        assert_eq!(config.worker_pool_size, 2);
        assert_eq!(config.raster_size, 512);
        assert_eq!(config.mesh_min_zoom, 7.0);
        assert!(!config.show_range_folded);

        for name in [
            "RADAR_WORKER_POOL_SIZE",
            "RADAR_RASTER_SIZE",
            "RADAR_MESH_MIN_ZOOM",
            "RADAR_SHOW_RANGE_FOLDED",
        ] {
            std::env::remove_var(name);
        }
    }
}
