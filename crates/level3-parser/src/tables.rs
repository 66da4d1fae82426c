//! Level III product code lookup table.
//!
//! Maps a product code to how its symbology is decoded and how its data
//! levels translate into physical values. Codes missing from the table
//! decode to an unparsed product.

use serde::Serialize;

/// How the radial packet of a product is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProductKind {
    /// 16-level products using run-length radial packets (0xAF1F).
    RunLengthRadial,
    /// 256-level products using digital radial packets (16).
    DigitalRadial,
}

/// How data levels are turned into physical values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DataLevelScheme {
    /// One flagged threshold halfword per level.
    Legacy16,
    /// Minimum, increment and number of levels in thresholds 1-3.
    Linear,
}

/// Static description of a known product code.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProductInfo {
    pub code: i16,
    pub name: &'static str,
    /// AWIPS product category, e.g. "N0Q".
    pub awips_category: &'static str,
    pub units: &'static str,
    pub kind: ProductKind,
    pub scheme: DataLevelScheme,
    /// Range bin size in meters.
    pub gate_spacing_m: f64,
    /// NWS tgftp product directory, the part after `DS.` (e.g. "p94r0").
    pub tgftp_dir: Option<&'static str>,
}

const PRODUCTS: &[ProductInfo] = &[
    ProductInfo {
        code: 19,
        name: "Base Reflectivity",
        awips_category: "N0R",
        units: "dBZ",
        kind: ProductKind::RunLengthRadial,
        scheme: DataLevelScheme::Legacy16,
        gate_spacing_m: 1000.0,
        tgftp_dir: Some("p19r0"),
    },
    ProductInfo {
        code: 20,
        name: "Base Reflectivity (248 nm)",
        awips_category: "N0Z",
        units: "dBZ",
        kind: ProductKind::RunLengthRadial,
        scheme: DataLevelScheme::Legacy16,
        gate_spacing_m: 2000.0,
        tgftp_dir: Some("p20-r"),
    },
    ProductInfo {
        code: 27,
        name: "Base Velocity",
        awips_category: "N0V",
        units: "kt",
        kind: ProductKind::RunLengthRadial,
        scheme: DataLevelScheme::Legacy16,
        gate_spacing_m: 1000.0,
        tgftp_dir: Some("p27v0"),
    },
    ProductInfo {
        code: 30,
        name: "Base Spectrum Width",
        awips_category: "NSW",
        units: "kt",
        kind: ProductKind::RunLengthRadial,
        scheme: DataLevelScheme::Legacy16,
        gate_spacing_m: 1000.0,
        tgftp_dir: Some("p30sw"),
    },
    ProductInfo {
        code: 56,
        name: "Storm Relative Mean Radial Velocity",
        awips_category: "N0S",
        units: "kt",
        kind: ProductKind::RunLengthRadial,
        scheme: DataLevelScheme::Legacy16,
        gate_spacing_m: 1000.0,
        tgftp_dir: Some("p56rm"),
    },
    ProductInfo {
        code: 94,
        name: "Digital Base Reflectivity",
        awips_category: "N0Q",
        units: "dBZ",
        kind: ProductKind::DigitalRadial,
        scheme: DataLevelScheme::Linear,
        gate_spacing_m: 1000.0,
        tgftp_dir: Some("p94r0"),
    },
    ProductInfo {
        code: 99,
        name: "Digital Base Velocity",
        awips_category: "N0U",
        units: "m/s",
        kind: ProductKind::DigitalRadial,
        scheme: DataLevelScheme::Linear,
        gate_spacing_m: 250.0,
        tgftp_dir: Some("p99v0"),
    },
    ProductInfo {
        code: 153,
        name: "Super Resolution Reflectivity",
        awips_category: "N0B",
        units: "dBZ",
        kind: ProductKind::DigitalRadial,
        scheme: DataLevelScheme::Linear,
        gate_spacing_m: 250.0,
        tgftp_dir: None,
    },
    ProductInfo {
        code: 154,
        name: "Super Resolution Velocity",
        awips_category: "N0G",
        units: "m/s",
        kind: ProductKind::DigitalRadial,
        scheme: DataLevelScheme::Linear,
        gate_spacing_m: 250.0,
        tgftp_dir: None,
    },
    ProductInfo {
        code: 155,
        name: "Super Resolution Spectrum Width",
        awips_category: "N0W",
        units: "m/s",
        kind: ProductKind::DigitalRadial,
        scheme: DataLevelScheme::Linear,
        gate_spacing_m: 250.0,
        tgftp_dir: None,
    },
];

/// Look up a product code.
pub fn product_info(code: i16) -> Option<&'static ProductInfo> {
    PRODUCTS.iter().find(|p| p.code == code)
}

/// Look up a product by AWIPS category ("N0Q").
pub fn product_by_category(category: &str) -> Option<&'static ProductInfo> {
    PRODUCTS
        .iter()
        .find(|p| p.awips_category.eq_ignore_ascii_case(category))
}

/// All known products.
pub fn known_products() -> &'static [ProductInfo] {
    PRODUCTS
}
