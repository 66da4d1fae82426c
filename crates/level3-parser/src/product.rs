//! Decoded product types.

use chrono::{DateTime, Utc};
use radar_common::ProductCode;
use serde::Serialize;

use crate::sections::WmoHeading;
use crate::tables::{product_info, ProductInfo};
use crate::thresholds::{DataLevels, DataValue};
use crate::unpacking::{GateEncoding, GateLevels};

const FEET_TO_METERS: f64 = 0.3048;

/// Header fields of the radial packet that carried the moment data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PacketInfo {
    pub code: u16,
    pub first_bin: i16,
    pub i_center: i16,
    pub j_center: i16,
    /// Range scale factor in thousandths.
    pub range_scale: u16,
}

/// Product header, immutable once parsed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductHeader {
    /// Radar identifier from the AWIPS id (e.g. "TLX"); empty when the
    /// product carried no WMO heading.
    pub site_id: String,
    pub product_code: ProductCode,
    /// Start of the volume scan.
    pub volume_time: Option<DateTime<Utc>>,
    pub generation_time: Option<DateTime<Utc>>,
    /// Elevation angle in degrees.
    pub elevation_angle_deg: f64,
    pub elevation_number: u16,
    /// Slant range to the near edge of the first gate in meters.
    pub range_to_first_gate_m: f64,
    pub gate_spacing_m: f64,
    /// Radial count declared by the radial packet.
    pub radial_count: usize,
    pub gates_per_radial: usize,
    /// Radar position as transmitted in the product (0.001 degree precision).
    pub site_latitude: f64,
    pub site_longitude: f64,
    pub site_height_ft: i16,
    pub operational_mode: u16,
    pub vcp: u16,
    pub volume_scan_number: u16,
    pub sequence_number: i16,
    pub source_id: i16,
    pub destination_id: i16,
    /// Raw data level threshold halfwords.
    pub thresholds: [u16; 16],
    /// Product dependent parameters 1 through 10.
    pub parameters: [i16; 10],
    pub version: u8,
    pub spot_blank: u8,
    pub packet: Option<PacketInfo>,
}

impl ProductHeader {
    pub fn site_height_m(&self) -> f64 {
        f64::from(self.site_height_ft) * FEET_TO_METERS
    }

    /// Volume scan time, falling back to the generation time.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.volume_time.or(self.generation_time)
    }

    pub fn info(&self) -> Option<&'static ProductInfo> {
        product_info(self.product_code.value())
    }

    pub fn packet_code(&self) -> Option<u16> {
        self.packet.map(|p| p.code)
    }
}

/// One radial of gate levels.
#[derive(Debug, Clone, PartialEq)]
pub struct Radial {
    /// Start azimuth in degrees, normalized to `[0, 360)`.
    pub azimuth: f64,
    /// Azimuthal width in degrees.
    pub azimuth_delta: f64,
    pub encoding: GateEncoding,
    pub gates: GateLevels,
}

impl Radial {
    /// Azimuth of the radial's far edge, normalized.
    pub fn end_azimuth(&self) -> f64 {
        radar_common::normalize_azimuth(self.azimuth + self.azimuth_delta)
    }

    pub fn gate_count(&self) -> usize {
        self.gates.len()
    }
}

/// A radial discarded because its payload was corrupt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DroppedRadial {
    /// Zero-based index in transmission order.
    pub index: usize,
    pub azimuth: f64,
    pub expected_gates: usize,
    pub actual_gates: usize,
}

/// Why a product's moment data was not decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnparsedReason {
    UnknownProduct,
    UnsupportedPacket(u16),
    NoSymbology,
}

/// What the product's moment data decoded to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Moment {
    Radial,
    Unparsed(UnparsedReason),
}

/// Byte offsets of the optional blocks, measured from the message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BlockLayout {
    pub symbology: Option<usize>,
    pub graphic: Option<usize>,
    pub tabular: Option<usize>,
}

/// A decoded Level III product.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub header: ProductHeader,
    /// Radials in transmitted order.
    pub radials: Vec<Radial>,
    pub dropped_radials: Vec<DroppedRadial>,
    pub moment: Moment,
    pub wmo: Option<WmoHeading>,
    pub blocks: BlockLayout,
}

impl Product {
    /// True when there is radial data to render.
    pub fn is_renderable(&self) -> bool {
        self.moment == Moment::Radial && !self.radials.is_empty()
    }

    /// Level to value table for this product, if its code is known.
    pub fn data_levels(&self) -> Option<DataLevels> {
        self.header
            .info()
            .map(|info| DataLevels::from_thresholds(info.scheme, &self.header.thresholds))
    }

    /// Physical value at a gate.
    pub fn value_at(&self, levels: &DataLevels, radial: usize, gate: usize) -> Option<DataValue> {
        let level = self.radials.get(radial)?.gates.get(gate)?;
        Some(levels.decode(level))
    }
}
