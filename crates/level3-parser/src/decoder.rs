//! Product decoding entry point.

use radar_common::{datetime_from_julian, ProductCode};
use tracing::{debug, instrument, warn};

use crate::error::{Context, Level3Error, Level3Result, ReadContext};
use crate::product::{BlockLayout, Moment, Product, ProductHeader, UnparsedReason};
use crate::reader::ByteReader;
use crate::sections::{
    looks_like_message, parse_wmo_heading, skip_ccb_header, MessageHeader, ProductDescription,
    WmoHeading, OFFSET_BASE,
};
use crate::symbology::{parse_symbology, SymbologyContent};
use crate::tables::product_info;
use crate::unpacking::{decompress_bzip2, inflate_zlib};

/// First byte of a zlib stream with a 32K window.
const ZLIB_CMF: u8 = 0x78;

/// Gate spacing assumed for product codes missing from the table.
const DEFAULT_GATE_SPACING_M: f64 = 1000.0;

/// Decode a Level III product file.
///
/// Accepts a product with or without its WMO heading, with or without
/// whole-message zlib compression, and with plain or bzip2-compressed
/// product blocks. Unknown product codes decode to a
/// product whose moment is [`Moment::Unparsed`]; corrupt radials are
/// dropped and listed in [`Product::dropped_radials`].
#[instrument(level = "debug", skip(data), fields(len = data.len()))]
pub fn decode(data: &[u8]) -> Level3Result<Product> {
    let (outer, body) = split_framing(data)?;

    let inflated;
    let (wmo, message) = if body.first() == Some(&ZLIB_CMF) {
        inflated = inflate_zlib(body)?;
        debug!(
            compressed = body.len(),
            inflated = inflated.len(),
            "Inflated zlib-compressed product"
        );
        let after_ccb = skip_ccb_header(&inflated)?;
        let (inner, rest) = parse_wmo_heading(after_ccb)?;
        (outer.or(Some(inner)), rest)
    } else {
        (outer, body)
    };

    decode_message(message, wmo)
}

fn split_framing(data: &[u8]) -> Level3Result<(Option<WmoHeading>, &[u8])> {
    if data.first() == Some(&ZLIB_CMF) || looks_like_message(data) {
        return Ok((None, data));
    }
    match parse_wmo_heading(data) {
        Ok((heading, rest)) => Ok((Some(heading), rest)),
        Err(e) => {
            debug!(error = %e, "No WMO heading");
            Err(Level3Error::UnsupportedFormat(
                "data starts with neither a WMO heading nor a Level III message header"
                    .to_string(),
            ))
        }
    }
}

fn decode_message(message: &[u8], wmo: Option<WmoHeading>) -> Level3Result<Product> {
    let mut reader = ByteReader::new(message);
    let msg = MessageHeader::parse(&mut reader)?;
    let pdb = ProductDescription::parse(&mut reader)?;

    if msg.message_code != pdb.product_code {
        warn!(
            message_code = msg.message_code,
            product_code = pdb.product_code,
            "Message and description block disagree on product code"
        );
    }

    let blocks = BlockLayout {
        symbology: ProductDescription::block_offset(pdb.offset_symbology),
        graphic: ProductDescription::block_offset(pdb.offset_graphic),
        tabular: ProductDescription::block_offset(pdb.offset_tabular),
    };
    if let Some(offset) = blocks.graphic {
        debug!(offset, "Graphic alphanumeric block found");
    }
    if let Some(offset) = blocks.tabular {
        debug!(offset, "Tabular alphanumeric block found");
    }

    let mut header = build_header(&msg, &pdb, wmo.as_ref());
    let unparsed = |header: ProductHeader, wmo: Option<WmoHeading>, reason| Product {
        header,
        radials: Vec::new(),
        dropped_radials: Vec::new(),
        moment: Moment::Unparsed(reason),
        wmo,
        blocks,
    };

    if header.info().is_none() {
        debug!(code = msg.message_code, "Unknown product code; symbology not parsed");
        return Ok(unparsed(header, wmo, UnparsedReason::UnknownProduct));
    }

    let Some(offset) = blocks.symbology else {
        return Ok(unparsed(header, wmo, UnparsedReason::NoSymbology));
    };

    let expanded;
    let mut reader = match pdb.p8 {
        0 => reader,
        1 => {
            expanded = expand_compressed_blocks(message, &msg, &pdb)?;
            ByteReader::new(&expanded)
        }
        method => {
            return Err(Level3Error::UnsupportedFormat(format!(
                "compression method {}",
                method
            )))
        }
    };
    reader.seek(offset).context(Context::Symbology)?;

    match parse_symbology(&mut reader)? {
        SymbologyContent::Radials(packet) => {
            header.packet = Some(packet.info);
            header.radial_count = packet.declared_radials;
            header.gates_per_radial = packet.bin_count;
            header.range_to_first_gate_m = f64::from(packet.info.first_bin) * header.gate_spacing_m;

            debug!(
                radials = packet.radials.len(),
                dropped = packet.dropped.len(),
                gates = packet.bin_count,
                "Decoded radial product"
            );

            Ok(Product {
                header,
                radials: packet.radials,
                dropped_radials: packet.dropped,
                moment: Moment::Radial,
                wmo,
                blocks,
            })
        }
        SymbologyContent::Unsupported(code) => Ok(unparsed(
            header,
            wmo,
            UnparsedReason::UnsupportedPacket(code),
        )),
        SymbologyContent::Empty => Ok(unparsed(header, wmo, UnparsedReason::NoSymbology)),
    }
}

/// Rebuild an RPG-compressed message with its blocks decompressed, so block
/// offsets keep counting from the start of the message header.
fn expand_compressed_blocks(
    message: &[u8],
    msg: &MessageHeader,
    pdb: &ProductDescription,
) -> Level3Result<Vec<u8>> {
    let end = (msg.length as usize).clamp(OFFSET_BASE, message.len());
    let uncompressed_size = pdb.uncompressed_size();
    let blocks = decompress_bzip2(&message[OFFSET_BASE..end], uncompressed_size)?;
    if uncompressed_size != 0 && blocks.len() != uncompressed_size {
        warn!(
            declared = uncompressed_size,
            actual = blocks.len(),
            "Decompressed block size differs from the description block"
        );
    }
    debug!(
        compressed = end - OFFSET_BASE,
        inflated = blocks.len(),
        "Decompressed product blocks"
    );

    let mut expanded = Vec::with_capacity(OFFSET_BASE + blocks.len());
    expanded.extend_from_slice(&message[..OFFSET_BASE]);
    expanded.extend(blocks);
    Ok(expanded)
}

fn build_header(
    msg: &MessageHeader,
    pdb: &ProductDescription,
    wmo: Option<&WmoHeading>,
) -> ProductHeader {
    let info = product_info(msg.message_code);
    let site_id = wmo
        .map(|w| w.product_designator.trim().to_uppercase())
        .unwrap_or_default();

    ProductHeader {
        site_id,
        product_code: ProductCode(msg.message_code),
        volume_time: datetime_from_julian(pdb.volume_date, pdb.volume_time),
        generation_time: datetime_from_julian(pdb.generation_date, pdb.generation_time),
        elevation_angle_deg: f64::from(pdb.p3) / 10.0,
        elevation_number: pdb.elevation_number,
        range_to_first_gate_m: 0.0,
        gate_spacing_m: info.map_or(DEFAULT_GATE_SPACING_M, |i| i.gate_spacing_m),
        radial_count: 0,
        gates_per_radial: 0,
        site_latitude: f64::from(pdb.latitude) / 1000.0,
        site_longitude: f64::from(pdb.longitude) / 1000.0,
        site_height_ft: pdb.height_ft,
        operational_mode: pdb.operational_mode,
        vcp: pdb.vcp,
        volume_scan_number: pdb.volume_scan_number,
        sequence_number: pdb.sequence_number,
        source_id: msg.source_id,
        destination_id: msg.destination_id,
        thresholds: pdb.thresholds,
        parameters: [
            pdb.p1, pdb.p2, pdb.p3, pdb.p4, pdb.p5, pdb.p6, pdb.p7, pdb.p8, pdb.p9, pdb.p10,
        ],
        version: pdb.version,
        spot_blank: pdb.spot_blank,
        packet: None,
    }
}
