//! Palette configuration loaded from JSON.
//!
//! Palettes are process-wide and immutable. The built-in set is embedded
//! in the binary; a JSON palette file may replace it once at startup with
//! [`install_palettes`] before the first frame is built.

use once_cell::sync::OnceCell;
use radar_common::{ProductCode, Rgba};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

use crate::error::{RenderError, RenderResult};
use crate::palette::{Palette, PaletteStep};

static BUILTIN_PALETTES: &str = include_str!("../palettes/default.json");

static PALETTES: OnceCell<PaletteRegistry> = OnceCell::new();

/// Palette file loaded from JSON
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaletteConfig {
    pub version: String,
    pub palettes: HashMap<String, PaletteDefinition>,
}

/// A single palette definition
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaletteDefinition {
    pub name: String,
    pub description: Option<String>,
    pub units: Option<String>,
    /// Product codes drawn with this palette
    pub products: Vec<i16>,
    pub stops: Vec<ColorStop>,
    /// Color of range-folded gates, if not the default purple
    pub range_folded: Option<String>,
}

/// Lower bound and color of one palette step
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ColorStop {
    pub value: f32,
    pub color: String,
    pub label: Option<String>,
}

impl PaletteConfig {
    /// Load palette configuration from a JSON string
    pub fn from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }
}

impl PaletteDefinition {
    /// Compile the definition into a lookup palette.
    pub fn compile(&self) -> RenderResult<Palette> {
        let color = |hex: &str| {
            Rgba::from_hex(hex).map_err(|e| RenderError::invalid_palette(&self.name, e.to_string()))
        };

        let steps = self
            .stops
            .iter()
            .map(|stop| {
                Ok(PaletteStep {
                    lower_bound: stop.value,
                    color: color(&stop.color)?,
                    label: stop.label.clone(),
                })
            })
            .collect::<RenderResult<Vec<_>>>()?;

        let mut palette = Palette::new(&self.name, steps)?;
        if let Some(units) = &self.units {
            palette = palette.with_units(units);
        }
        if let Some(hex) = &self.range_folded {
            palette = palette.with_range_folded(color(hex)?);
        }
        Ok(palette)
    }
}

/// Palettes keyed by product code.
#[derive(Debug, Clone, Default)]
pub struct PaletteRegistry {
    by_product: HashMap<ProductCode, Arc<Palette>>,
}

impl PaletteRegistry {
    /// The palettes bundled with the crate.
    pub fn builtin() -> RenderResult<Self> {
        Self::from_json(BUILTIN_PALETTES)
    }

    pub fn from_json(json: &str) -> RenderResult<Self> {
        let config = PaletteConfig::from_json(json)
            .map_err(|e| RenderError::invalid_palette("<config>", e.to_string()))?;
        Self::from_config(&config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> RenderResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            RenderError::invalid_palette(path.display().to_string(), e.to_string())
        })?;
        Self::from_json(&content)
    }

    /// Compile every definition. A product code claimed by two palettes is
    /// an error.
    pub fn from_config(config: &PaletteConfig) -> RenderResult<Self> {
        let mut by_product = HashMap::new();
        let mut keys: Vec<&String> = config.palettes.keys().collect();
        keys.sort();

        for key in keys {
            let definition = &config.palettes[key];
            let palette = Arc::new(definition.compile()?);
            for &code in &definition.products {
                if by_product
                    .insert(ProductCode(code), Arc::clone(&palette))
                    .is_some()
                {
                    return Err(RenderError::invalid_palette(
                        &definition.name,
                        format!("product {} already has a palette", code),
                    ));
                }
            }
        }
        Ok(Self { by_product })
    }

    pub fn insert(&mut self, product: ProductCode, palette: Palette) {
        self.by_product.insert(product, Arc::new(palette));
    }

    pub fn for_product(&self, product: ProductCode) -> Option<Arc<Palette>> {
        self.by_product.get(&product).cloned()
    }

    /// Product codes that have a palette, ascending.
    pub fn products(&self) -> Vec<ProductCode> {
        let mut codes: Vec<ProductCode> = self.by_product.keys().copied().collect();
        codes.sort();
        codes
    }

    pub fn len(&self) -> usize {
        self.by_product.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_product.is_empty()
    }
}

/// Replace the built-in palettes for the rest of the process.
///
/// Fails if palettes were installed or used already.
pub fn install_palettes(registry: PaletteRegistry) -> RenderResult<()> {
    let count = registry.len();
    PALETTES
        .set(registry)
        .map_err(|_| RenderError::PalettesInstalled)?;
    info!(products = count, "Installed palettes");
    Ok(())
}

/// The process-wide palette table.
pub fn palettes() -> &'static PaletteRegistry {
    PALETTES.get_or_init(|| {
        PaletteRegistry::builtin().unwrap_or_else(|e| {
            error!(error = %e, "Built-in palettes failed to load");
            PaletteRegistry::default()
        })
    })
}
