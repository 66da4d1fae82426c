//! Radar site metadata.
//!
//! Georeferencing needs the geographic position and elevation of the radar
//! antenna. Sites are looked up through the [`SiteMetadata`] trait; the
//! default implementation is a [`SiteCatalog`] loaded from embedded JSON.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{RadarError, RadarResult};

static EMBEDDED_SITES: &str = include_str!("../data/sites.json");

/// Location of a single radar site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteInfo {
    /// ICAO identifier, e.g. "KTLX".
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Latitude in degrees (WGS84).
    pub latitude: f64,
    /// Longitude in degrees (WGS84).
    pub longitude: f64,
    /// Site elevation above mean sea level in meters.
    pub elevation_m: f64,
}

impl SiteInfo {
    pub fn new(id: impl Into<String>, latitude: f64, longitude: f64, elevation_m: f64) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            latitude,
            longitude,
            elevation_m,
        }
    }

    /// Check that the coordinates are usable for georeferencing.
    pub fn validate(&self) -> RadarResult<()> {
        let invalid = |message: String| RadarError::InvalidSite {
            site: self.id.clone(),
            message,
        };

        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(invalid(format!("latitude {} out of range", self.latitude)));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(invalid(format!("longitude {} out of range", self.longitude)));
        }
        if !self.elevation_m.is_finite() || !(-500.0..=9000.0).contains(&self.elevation_m) {
            return Err(invalid(format!("elevation {} m out of range", self.elevation_m)));
        }
        Ok(())
    }
}

/// Source of radar site positions.
pub trait SiteMetadata: Send + Sync {
    /// Look up a site by identifier.
    fn site_info(&self, site_id: &str) -> RadarResult<SiteInfo>;
}

#[derive(Debug, Deserialize)]
struct SiteFile {
    sites: Vec<SiteInfo>,
}

/// In-memory site table.
#[derive(Debug, Clone, Default)]
pub struct SiteCatalog {
    sites: HashMap<String, SiteInfo>,
}

impl SiteCatalog {
    /// Catalog of the sites bundled with the crate.
    pub fn embedded() -> RadarResult<Self> {
        Self::from_json(EMBEDDED_SITES)
    }

    /// Parse a catalog from `{"sites": [...]}` JSON.
    pub fn from_json(json: &str) -> RadarResult<Self> {
        let file: SiteFile = serde_json::from_str(json)?;
        let mut catalog = Self::default();
        for site in file.sites {
            catalog.insert(site);
        }
        Ok(catalog)
    }

    /// Load a catalog from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> RadarResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn insert(&mut self, mut site: SiteInfo) {
        site.id = site.id.trim().to_uppercase();
        self.sites.insert(site.id.clone(), site);
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Sorted site identifiers.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.sites.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    fn lookup(&self, site_id: &str) -> Option<&SiteInfo> {
        let id = site_id.trim().to_uppercase();
        if let Some(site) = self.sites.get(&id) {
            return Some(site);
        }

        // Three-letter identifiers (as used in AWIPS product ids) drop the
        // leading ICAO region letter.
        if id.len() == 3 {
            if let Some(site) = self.sites.get(&format!("K{}", id)) {
                return Some(site);
            }
            let mut matches = self.sites.values().filter(|s| s.id.ends_with(&id));
            if let (Some(site), None) = (matches.next(), matches.next()) {
                return Some(site);
            }
        }
        None
    }
}

impl SiteMetadata for SiteCatalog {
    fn site_info(&self, site_id: &str) -> RadarResult<SiteInfo> {
        let site = self
            .lookup(site_id)
            .cloned()
            .ok_or_else(|| RadarError::SiteNotFound(site_id.to_string()))?;
        site.validate()?;
        Ok(site)
    }
}
