//! Layer and product identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RadarError;

/// NEXRAD Level III product code (message code of the product).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductCode(pub i16);

impl ProductCode {
    pub fn value(self) -> i16 {
        self.0
    }
}

impl fmt::Display for ProductCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A displayable radar layer: one product from one site.
///
/// Each layer owns one slot in the frame store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerId {
    /// Radar site identifier, upper case (e.g. "KTLX").
    pub site: String,
    /// Product code displayed by this layer.
    pub product: ProductCode,
}

impl LayerId {
    pub fn new(site: impl Into<String>, product: i16) -> Self {
        Self {
            site: site.into().trim().to_uppercase(),
            product: ProductCode(product),
        }
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.site, self.product)
    }
}

impl FromStr for LayerId {
    type Err = RadarError;

    /// Parse `SITE/CODE`, e.g. `KTLX/94`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (site, code) = s
            .split_once('/')
            .ok_or_else(|| RadarError::InvalidLayer(s.to_string()))?;
        let site = site.trim();
        if site.is_empty() || !site.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(RadarError::InvalidLayer(s.to_string()));
        }
        let code: i16 = code
            .trim()
            .parse()
            .map_err(|_| RadarError::InvalidLayer(s.to_string()))?;
        Ok(LayerId::new(site, code))
    }
}
