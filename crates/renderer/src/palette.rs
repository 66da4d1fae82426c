//! Value to color mapping.
//!
//! A palette is an ordered list of `(lower_bound, color)` steps: a value
//! takes the color of the highest bound not above it. Values below the
//! first bound get the no-data color. Sentinel levels never go through the
//! steps and map to fixed reserved colors.

use level3_parser::{DataLevels, DataValue};
use radar_common::{ProductCode, Rgba};
use serde::Serialize;

use crate::error::{RenderError, RenderResult};
use crate::style::PaletteRegistry;

/// Color of gates without a displayable value.
pub const NO_DATA_COLOR: Rgba = Rgba::TRANSPARENT;

/// Default color of range-folded gates.
pub const RANGE_FOLDED_COLOR: Rgba = Rgba::opaque(0x77, 0x00, 0x7D);

/// Per-build color choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorOptions {
    /// Draw range-folded gates; hidden gates are transparent.
    pub show_range_folded: bool,
}

impl Default for ColorOptions {
    fn default() -> Self {
        Self {
            show_range_folded: true,
        }
    }
}

/// One palette step, as shown in a legend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaletteStep {
    pub lower_bound: f32,
    pub color: Rgba,
    pub label: Option<String>,
}

/// An immutable step palette.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    pub name: String,
    pub units: Option<String>,
    bounds: Vec<f32>,
    colors: Vec<Rgba>,
    labels: Vec<Option<String>>,
    range_folded: Rgba,
}

impl Palette {
    /// Build a palette from steps in strictly ascending bound order.
    pub fn new(name: impl Into<String>, steps: Vec<PaletteStep>) -> RenderResult<Self> {
        let name = name.into();
        if steps.is_empty() {
            return Err(RenderError::invalid_palette(name, "no color steps"));
        }
        if let Some(bad) = steps.iter().find(|s| !s.lower_bound.is_finite()) {
            return Err(RenderError::invalid_palette(
                name,
                format!("non-finite bound {}", bad.lower_bound),
            ));
        }
        if let Some(pair) = steps
            .windows(2)
            .find(|w| w[0].lower_bound >= w[1].lower_bound)
        {
            return Err(RenderError::invalid_palette(
                name,
                format!(
                    "bounds not ascending at {} -> {}",
                    pair[0].lower_bound, pair[1].lower_bound
                ),
            ));
        }

        let mut bounds = Vec::with_capacity(steps.len());
        let mut colors = Vec::with_capacity(steps.len());
        let mut labels = Vec::with_capacity(steps.len());
        for step in steps {
            bounds.push(step.lower_bound);
            colors.push(step.color);
            labels.push(step.label);
        }
        Ok(Self {
            name,
            units: None,
            bounds,
            colors,
            labels,
            range_folded: RANGE_FOLDED_COLOR,
        })
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    pub fn with_range_folded(mut self, color: Rgba) -> Self {
        self.range_folded = color;
        self
    }

    /// Color of a physical value.
    pub fn lookup(&self, value: f32) -> Rgba {
        if value.is_nan() {
            return NO_DATA_COLOR;
        }
        match self.bounds.partition_point(|&bound| bound <= value) {
            0 => NO_DATA_COLOR,
            n => self.colors[n - 1],
        }
    }

    /// Color of a decoded gate value.
    pub fn color_for(&self, value: DataValue, options: &ColorOptions) -> Rgba {
        match value {
            DataValue::Value(v) => self.lookup(v),
            DataValue::RangeFolded if options.show_range_folded => self.range_folded,
            DataValue::RangeFolded | DataValue::BelowThreshold | DataValue::NoData => {
                NO_DATA_COLOR
            }
        }
    }

    pub fn range_folded_color(&self) -> Rgba {
        self.range_folded
    }

    pub fn steps(&self) -> impl Iterator<Item = PaletteStep> + '_ {
        self.bounds
            .iter()
            .zip(&self.colors)
            .zip(&self.labels)
            .map(|((&lower_bound, &color), label)| PaletteStep {
                lower_bound,
                color,
                label: label.clone(),
            })
    }

    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }
}

/// Color of a gate value for a product, using the palette the table holds
/// for that product code. Products without a palette are not drawn.
pub fn colorize(value: DataValue, product: ProductCode, table: &PaletteRegistry) -> Rgba {
    colorize_with(value, product, table, &ColorOptions::default())
}

pub fn colorize_with(
    value: DataValue,
    product: ProductCode,
    table: &PaletteRegistry,
    options: &ColorOptions,
) -> Rgba {
    table
        .for_product(product)
        .map_or(NO_DATA_COLOR, |palette| palette.color_for(value, options))
}

/// Colors and values for every data level of one product.
///
/// Products have at most 256 levels, so gates are colored by indexing this
/// table instead of searching the palette per gate.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelColors {
    colors: Vec<Rgba>,
    values: Vec<f32>,
}

impl LevelColors {
    pub fn new(levels: &DataLevels, palette: &Palette, options: &ColorOptions) -> Self {
        let (colors, values) = (0..levels.len())
            .map(|level| {
                let value = levels.decode(level as u16);
                (
                    palette.color_for(value, options),
                    value.value().unwrap_or(f32::NAN),
                )
            })
            .unzip();
        Self { colors, values }
    }

    /// Color of a data level; levels past the table are no data.
    #[inline]
    pub fn color(&self, level: u16) -> Rgba {
        self.colors
            .get(usize::from(level))
            .copied()
            .unwrap_or(NO_DATA_COLOR)
    }

    /// Physical value of a level, NaN for sentinels.
    #[inline]
    pub fn value(&self, level: u16) -> f32 {
        self.values
            .get(usize::from(level))
            .copied()
            .unwrap_or(f32::NAN)
    }

    #[inline]
    pub fn is_visible(&self, level: u16) -> bool {
        !self.color(level).is_transparent()
    }
}
