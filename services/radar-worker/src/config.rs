//! Worker configuration loaded from a YAML layers file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use radar_common::LayerId;
use radar_pipeline::PipelineConfig;
use serde::Deserialize;
use tracing::{debug, info};

/// Root of the layers file.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    #[serde(default)]
    pub source: Option<SourceConfig>,
    /// Pipeline tuning. When absent, `RADAR_*` environment variables apply.
    #[serde(default)]
    pub pipeline: Option<PipelineConfig>,
    /// Site catalog JSON replacing the embedded one.
    #[serde(default)]
    pub sites_file: Option<PathBuf>,
    /// Palette JSON replacing the built-in palettes.
    #[serde(default)]
    pub palettes_file: Option<PathBuf>,
    pub layers: Vec<LayerConfig>,
}

/// Where products are fetched from.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    Http {
        url_template: String,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
    Directory {
        path: PathBuf,
    },
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct LayerConfig {
    pub site: String,
    pub product: i16,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl WorkerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        info!(
            path = %path.display(),
            layers = config.layers.len(),
            "Loaded worker configuration"
        );
        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.layers.is_empty() {
            bail!("no layers configured");
        }
        for layer in &self.layers {
            let site = layer.site.trim();
            if site.len() != 4 || !site.chars().all(|c| c.is_ascii_alphanumeric()) {
                bail!("invalid site id '{}'", layer.site);
            }
            if layer.product <= 0 {
                bail!("invalid product code {} for {}", layer.product, layer.site);
            }
        }
        if let Some(pipeline) = &self.pipeline {
            pipeline
                .validate()
                .map_err(|e| anyhow::anyhow!("pipeline: {}", e))?;
        }
        Ok(())
    }

    /// Enabled layers, without duplicates.
    pub fn layer_ids(&self) -> Vec<LayerId> {
        let mut ids: Vec<LayerId> = Vec::new();
        for layer in &self.layers {
            if !layer.enabled {
                debug!(site = %layer.site, product = layer.product, "Skipping disabled layer");
                continue;
            }
            let id = LayerId::new(layer.site.as_str(), layer.product);
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        self.pipeline.clone().unwrap_or_else(PipelineConfig::from_env)
    }
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        match self {
            SourceConfig::Http { timeout_secs, .. } => Duration::from_secs(*timeout_secs),
            SourceConfig::Directory { .. } => Duration::ZERO,
        }
    }
}
