//! Synthetic Level III product bytes.
//!
//! Builds product files byte by byte, independent of the decoder crate's
//! own encoder, so tests check against the wire layout directly.

use bzip2::write::BzEncoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Write;

use crate::fixtures::{thresholds, times};
use crate::generators::{digital_levels, ring_levels};
/// One synthetic radial: start angle and delta in tenths of a degree plus
/// raw payload bytes (run-length bytes or digital levels).
#[derive(Clone)]
pub struct RawRadial {
    pub start_tenths: i16,
    pub delta_tenths: i16,
    pub payload: Vec<u8>,
}

/// Build a minimal Level III product.
pub struct Level3Builder {
    wmo: Option<(String, String)>,
    product_code: i16,
    latitude: i32,
    longitude: i32,
    height_ft: i16,
    vcp: u16,
    volume_date: u16,
    volume_time: u32,
    elevation_tenths: i16,
    thresholds: [u16; 16],
    compression_method: i16,
    packet_code: u16,
    first_bin: i16,
    bins: i16,
    declared_radials: Option<i16>,
    radials: Vec<RawRadial>,
    graphic_offset: u32,
}

impl Level3Builder {
    /// Digital reflectivity (product 94) for KTLX with 360 one-degree
    /// radials of 230 gates.
    pub fn new_digital() -> Self {
        let bins = 230;
        let radials = (0..360)
            .map(|i| RawRadial {
                start_tenths: i * 10,
                delta_tenths: 10,
                payload: digital_levels(i as usize, bins),
            })
            .collect();
        Self {
            wmo: Some(("SDUS54 KOUN 062201".to_string(), "N0QTLX".to_string())),
            product_code: 94,
            latitude: 35_333,
            longitude: -97_278,
            height_ft: 1_213,
            vcp: 212,
            volume_date: times::T1.0,
            volume_time: times::T1.1,
            elevation_tenths: 5,
            thresholds: thresholds::digital_reflectivity(),
            compression_method: 0,
            packet_code: 16,
            first_bin: 0,
            bins: bins as i16,
            declared_radials: None,
            radials,
            graphic_offset: 0,
        }
    }

    /// 16-level base reflectivity (product 19) with run-length radials.
    pub fn new_run_length() -> Self {
        let bins = 230usize;
        let levels = ring_levels(bins, 10, 16);
        let payload = pack(&levels);
        let radials = (0..360)
            .map(|i| RawRadial {
                start_tenths: i * 10,
                delta_tenths: 10,
                payload: payload.clone(),
            })
            .collect();
        Self {
            wmo: Some(("SDUS54 KOUN 062201".to_string(), "N0RTLX".to_string())),
            product_code: 19,
            thresholds: thresholds::sixteen_level_reflectivity(),
            packet_code: 0xAF1F,
            bins: bins as i16,
            radials,
            ..Self::new_digital()
        }
    }

    /// Replace the WMO heading lines, e.g. `("SDUS53 KFFC 062201", "N0QFFC")`.
    pub fn with_wmo(mut self, heading: &str, awips: &str) -> Self {
        self.wmo = Some((heading.to_string(), awips.to_string()));
        self
    }

    /// Radar position in degrees, stored at 0.001 degree precision.
    pub fn with_site_position(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = (latitude * 1000.0).round() as i32;
        self.longitude = (longitude * 1000.0).round() as i32;
        self
    }

    /// Give every digital radial the same gate levels.
    pub fn with_uniform_levels(mut self, levels: &[u8]) -> Self {
        self.bins = levels.len() as i16;
        for radial in &mut self.radials {
            radial.payload = levels.to_vec();
        }
        self
    }

    pub fn without_wmo(mut self) -> Self {
        self.wmo = None;
        self
    }

    pub fn with_product_code(mut self, code: i16) -> Self {
        self.product_code = code;
        self
    }

    pub fn with_volume_time(mut self, (date, time): (u16, u32)) -> Self {
        self.volume_date = date;
        self.volume_time = time;
        self
    }

    pub fn with_radials(mut self, radials: Vec<RawRadial>) -> Self {
        self.radials = radials;
        self
    }

    pub fn with_declared_radials(mut self, count: i16) -> Self {
        self.declared_radials = Some(count);
        self
    }

    pub fn with_compression_method(mut self, method: i16) -> Self {
        self.compression_method = method;
        self
    }

    pub fn with_packet_code(mut self, code: u16) -> Self {
        self.packet_code = code;
        self
    }

    pub fn with_graphic_offset(mut self, halfwords: u32) -> Self {
        self.graphic_offset = halfwords;
        self
    }

    pub fn with_first_bin(mut self, first_bin: i16) -> Self {
        self.first_bin = first_bin;
        self
    }

    pub fn radial_mut(&mut self, index: usize) -> &mut RawRadial {
        &mut self.radials[index]
    }

    fn heading(&self) -> Vec<u8> {
        match &self.wmo {
            Some((line1, line2)) => format!("{}\r\r\n{}\r\r\n", line1, line2).into_bytes(),
            None => Vec::new(),
        }
    }

    /// Build the complete product bytes.
    pub fn build(&self) -> Vec<u8> {
        let mut out = self.heading();
        out.extend(self.build_message());
        out
    }

    /// Build a zlib-compressed product, split across two zlib streams.
    pub fn build_compressed(&self) -> Vec<u8> {
        let mut inner = vec![0x40, 0x0C];
        inner.resize(24, 0);
        inner.extend(self.heading());
        inner.extend(self.build_message());

        let split = inner.len() / 2;
        let mut out = self.heading();
        out.extend(zlib(&inner[..split]));
        out.extend(zlib(&inner[split..]));
        out
    }

    fn build_symbology(&self) -> Vec<u8> {
        let mut packet = Vec::new();
        packet.extend_from_slice(&self.packet_code.to_be_bytes());
        packet.extend_from_slice(&self.first_bin.to_be_bytes());
        packet.extend_from_slice(&self.bins.to_be_bytes());
        packet.extend_from_slice(&0i16.to_be_bytes()); // i center
        packet.extend_from_slice(&0i16.to_be_bytes()); // j center
        packet.extend_from_slice(&1000u16.to_be_bytes()); // range scale
        let declared = self
            .declared_radials
            .unwrap_or(self.radials.len() as i16);
        packet.extend_from_slice(&declared.to_be_bytes());

        for radial in &self.radials {
            let length = if self.packet_code == 0xAF1F {
                (radial.payload.len() / 2) as i16
            } else {
                radial.payload.len() as i16
            };
            packet.extend_from_slice(&length.to_be_bytes());
            packet.extend_from_slice(&radial.start_tenths.to_be_bytes());
            packet.extend_from_slice(&radial.delta_tenths.to_be_bytes());
            packet.extend_from_slice(&radial.payload);
            if radial.payload.len() % 2 == 1 {
                packet.push(0);
            }
        }

        let mut block = Vec::new();
        block.extend_from_slice(&(-1i16).to_be_bytes());
        block.extend_from_slice(&1i16.to_be_bytes());
        block.extend_from_slice(&((packet.len() + 16) as u32).to_be_bytes());
        block.extend_from_slice(&1u16.to_be_bytes());
        block.extend_from_slice(&(-1i16).to_be_bytes());
        block.extend_from_slice(&(packet.len() as u32).to_be_bytes());
        block.extend(packet);
        block
    }

    fn build_message(&self) -> Vec<u8> {
        let symbology = self.build_symbology();
        let plain_size = symbology.len() as u32;
        // Method 1 bzip2-compresses everything after the description block.
        let blocks = if self.compression_method == 1 {
            bzip2_compress(&symbology)
        } else {
            symbology
        };
        let length = 120 + blocks.len();

        let mut out = Vec::with_capacity(length);
        // Message header
        out.extend_from_slice(&self.product_code.to_be_bytes());
        out.extend_from_slice(&self.volume_date.to_be_bytes());
        out.extend_from_slice(&self.volume_time.to_be_bytes());
        out.extend_from_slice(&(length as u32).to_be_bytes());
        out.extend_from_slice(&67i16.to_be_bytes()); // source id
        out.extend_from_slice(&0i16.to_be_bytes()); // destination
        out.extend_from_slice(&3u16.to_be_bytes()); // blocks

        // Product description block
        out.extend_from_slice(&(-1i16).to_be_bytes());
        out.extend_from_slice(&self.latitude.to_be_bytes());
        out.extend_from_slice(&self.longitude.to_be_bytes());
        out.extend_from_slice(&self.height_ft.to_be_bytes());
        out.extend_from_slice(&self.product_code.to_be_bytes());
        out.extend_from_slice(&2u16.to_be_bytes()); // precipitation mode
        out.extend_from_slice(&self.vcp.to_be_bytes());
        out.extend_from_slice(&1i16.to_be_bytes()); // sequence number
        out.extend_from_slice(&42u16.to_be_bytes()); // volume scan number
        out.extend_from_slice(&self.volume_date.to_be_bytes());
        out.extend_from_slice(&self.volume_time.to_be_bytes());
        out.extend_from_slice(&self.volume_date.to_be_bytes());
        out.extend_from_slice(&(self.volume_time + 30).to_be_bytes());
        out.extend_from_slice(&0i16.to_be_bytes()); // p1
        out.extend_from_slice(&0i16.to_be_bytes()); // p2
        out.extend_from_slice(&1u16.to_be_bytes()); // elevation number
        out.extend_from_slice(&self.elevation_tenths.to_be_bytes()); // p3
        for t in &self.thresholds {
            out.extend_from_slice(&t.to_be_bytes());
        }
        for _ in 0..4 {
            out.extend_from_slice(&0i16.to_be_bytes()); // p4-p7
        }
        out.extend_from_slice(&self.compression_method.to_be_bytes()); // p8
        if self.compression_method == 1 {
            out.extend_from_slice(&plain_size.to_be_bytes()); // p9, p10
        } else {
            out.extend_from_slice(&0u32.to_be_bytes()); // p9, p10
        }
        out.push(0); // version
        out.push(0); // spot blank
        out.extend_from_slice(&60u32.to_be_bytes()); // symbology offset
        out.extend_from_slice(&self.graphic_offset.to_be_bytes());
        out.extend_from_slice(&0u32.to_be_bytes()); // tabular offset
        assert_eq!(out.len(), 120);

        out.extend(blocks);
        out
    }
}

/// Run-length pack 4-bit levels, padded to a halfword.
pub fn pack(levels: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < levels.len() {
        let level = levels[i];
        let mut run = 1;
        while run < 15 && i + run < levels.len() && levels[i + run] == level {
            run += 1;
        }
        out.push(((run as u8) << 4) | level);
        i += run;
    }
    if out.len() % 2 == 1 {
        out.push(0);
    }
    out
}

pub fn bzip2_compress(data: &[u8]) -> Vec<u8> {
    let mut enc = BzEncoder::new(Vec::new(), bzip2::Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}
