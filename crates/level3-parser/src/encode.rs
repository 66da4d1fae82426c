//! Product encoder.
//!
//! Writes a [`Product`] back to Level III bytes. Used to build fixtures and
//! to check that decoding preserves every field it understands.

use bzip2::write::BzEncoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use radar_common::julian_from_datetime;
use std::io::Write;

use crate::error::{Level3Error, Level3Result};
use crate::product::{Moment, Product, ProductHeader};
use crate::sections::{MessageHeader, ProductDescription, MESSAGE_HEADER_SIZE, OFFSET_BASE};
use crate::unpacking::{pack_run_length, GateEncoding, GateLevels};

/// Length of the CCB written ahead of a compressed message, in halfwords.
const CCB_HALFWORDS: u16 = 12;

/// Encode a product, including its WMO heading when present.
pub fn encode(product: &Product) -> Level3Result<Vec<u8>> {
    let mut out = Vec::new();
    if let Some(wmo) = &product.wmo {
        out.extend(wmo.to_bytes());
    }
    out.extend(encode_message(product)?);
    Ok(out)
}

/// Encode a product with whole-message zlib compression.
///
/// The compressed payload holds a CCB header, the inner WMO heading and the
/// message. The product must carry a WMO heading.
pub fn encode_compressed(product: &Product) -> Level3Result<Vec<u8>> {
    let wmo = product
        .wmo
        .as_ref()
        .ok_or_else(|| Level3Error::Encode("compressed products need a WMO heading".into()))?;

    let mut payload = Vec::new();
    payload.extend_from_slice(&(0x4000 | CCB_HALFWORDS).to_be_bytes());
    payload.resize(usize::from(CCB_HALFWORDS) * 2, 0);
    payload.extend(wmo.to_bytes());
    payload.extend(encode_message(product)?);

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&payload)
        .and_then(|_| encoder.finish())
        .map(|compressed| {
            let mut out = wmo.to_bytes();
            out.extend(compressed);
            out
        })
        .map_err(|e| Level3Error::Encode(e.to_string()))
}

fn time_fields(time: Option<chrono::DateTime<chrono::Utc>>) -> (u16, u32) {
    time.map(julian_from_datetime).unwrap_or((0, 0))
}

/// Encode the message header, description block and symbology block.
pub fn encode_message(product: &Product) -> Level3Result<Vec<u8>> {
    let header = &product.header;
    let symbology = match product.moment {
        Moment::Radial => Some(encode_symbology(product)?),
        Moment::Unparsed(_) => None,
    };
    let p = &header.parameters;
    // p8 = 1 marks bzip2-compressed blocks; p9/p10 carry their plain size.
    let body = match (&symbology, p[7]) {
        (Some(block), 1) => Some(compress_bzip2(block)?),
        (Some(block), _) => Some(block.clone()),
        (None, _) => None,
    };
    let length = OFFSET_BASE + body.as_ref().map_or(0, Vec::len);

    let (generation_date, generation_time) = time_fields(header.generation_time);
    let (volume_date, volume_time) = time_fields(header.volume_time);

    let msg = MessageHeader {
        message_code: header.product_code.value(),
        date: generation_date,
        time: generation_time,
        length: u32::try_from(length)
            .map_err(|_| Level3Error::Encode(format!("message too long: {}", length)))?,
        source_id: header.source_id,
        destination_id: header.destination_id,
        block_count: if symbology.is_some() { 3 } else { 2 },
    };

    let pdb = ProductDescription {
        latitude: (header.site_latitude * 1000.0).round() as i32,
        longitude: (header.site_longitude * 1000.0).round() as i32,
        height_ft: header.site_height_ft,
        product_code: header.product_code.value(),
        operational_mode: header.operational_mode,
        vcp: header.vcp,
        sequence_number: header.sequence_number,
        volume_scan_number: header.volume_scan_number,
        volume_date,
        volume_time,
        generation_date,
        generation_time,
        p1: p[0],
        p2: p[1],
        elevation_number: header.elevation_number,
        p3: p[2],
        thresholds: header.thresholds,
        p4: p[3],
        p5: p[4],
        p6: p[5],
        p7: p[6],
        p8: p[7],
        p9: p[8],
        p10: p[9],
        version: header.version,
        spot_blank: header.spot_blank,
        offset_symbology: if symbology.is_some() {
            (OFFSET_BASE / 2) as u32
        } else {
            0
        },
        offset_graphic: 0,
        offset_tabular: 0,
    };

    let mut out = Vec::with_capacity(length);
    msg.write(&mut out);
    debug_assert_eq!(out.len(), MESSAGE_HEADER_SIZE);
    pdb.write(&mut out);
    if let Some(block) = body {
        out.extend(block);
    }
    Ok(out)
}

fn compress_bzip2(block: &[u8]) -> Level3Result<Vec<u8>> {
    let mut encoder = BzEncoder::new(Vec::new(), bzip2::Compression::best());
    encoder
        .write_all(block)
        .and_then(|_| encoder.finish())
        .map_err(|e| Level3Error::Encode(format!("bzip2: {}", e)))
}

fn halfword(value: usize, what: &str) -> Level3Result<i16> {
    i16::try_from(value).map_err(|_| Level3Error::Encode(format!("{} {} out of range", what, value)))
}

fn encode_symbology(product: &Product) -> Level3Result<Vec<u8>> {
    let header: &ProductHeader = &product.header;
    let packet = header
        .packet
        .ok_or_else(|| Level3Error::Encode("radial product without packet header".into()))?;

    let mut layer = Vec::new();
    layer.extend_from_slice(&packet.code.to_be_bytes());
    layer.extend_from_slice(&packet.first_bin.to_be_bytes());
    layer.extend_from_slice(&halfword(header.gates_per_radial, "bin count")?.to_be_bytes());
    layer.extend_from_slice(&packet.i_center.to_be_bytes());
    layer.extend_from_slice(&packet.j_center.to_be_bytes());
    layer.extend_from_slice(&packet.range_scale.to_be_bytes());
    layer.extend_from_slice(&halfword(header.radial_count, "radial count")?.to_be_bytes());

    for radial in &product.radials {
        let (length, mut payload) = match (radial.encoding, &radial.gates) {
            (GateEncoding::RunLength4, GateLevels::U8(levels)) => {
                let packed = pack_run_length(levels)?;
                (packed.len() / 2, packed)
            }
            (GateEncoding::Literal8, GateLevels::U8(levels)) => (levels.len(), levels.clone()),
            (encoding, _) => {
                return Err(Level3Error::Encode(format!(
                    "{:?} radials cannot be written to a radial packet",
                    encoding
                )))
            }
        };
        if payload.len() % 2 == 1 {
            payload.push(0);
        }
        let start = (radial.azimuth * 10.0).round() as i16;
        let delta = (radial.azimuth_delta * 10.0).round() as i16;
        layer.extend_from_slice(&halfword(length, "radial length")?.to_be_bytes());
        layer.extend_from_slice(&start.to_be_bytes());
        layer.extend_from_slice(&delta.to_be_bytes());
        layer.extend(payload);
    }

    let mut block = Vec::with_capacity(layer.len() + 16);
    block.extend_from_slice(&(-1i16).to_be_bytes());
    block.extend_from_slice(&1i16.to_be_bytes());
    block.extend_from_slice(&((layer.len() + 16) as u32).to_be_bytes());
    block.extend_from_slice(&1u16.to_be_bytes());
    block.extend_from_slice(&(-1i16).to_be_bytes());
    block.extend_from_slice(&(layer.len() as u32).to_be_bytes());
    block.extend(layer);
    Ok(block)
}
