//! Product symbology block and radial packets.

use tracing::{debug, warn};

use crate::error::{Context, Level3Error, Level3Result, ReadContext};
use crate::product::{DroppedRadial, PacketInfo, Radial};
use crate::reader::ByteReader;
use crate::unpacking::{expand, GateEncoding};

/// Packet code of 16-level run-length radials.
pub const PACKET_RLE_RADIAL: u16 = 0xAF1F;
/// Packet code of digital (256-level) radials.
pub const PACKET_DIGITAL_RADIAL: u16 = 16;

const BLOCK_DIVIDER: i16 = -1;
const SYMBOLOGY_BLOCK_ID: i16 = 1;
const BLOCK_HEADER_SIZE: usize = 10;

/// Decoded contents of a radial packet.
#[derive(Debug)]
pub struct RadialPacket {
    pub info: PacketInfo,
    pub bin_count: usize,
    pub declared_radials: usize,
    pub radials: Vec<Radial>,
    pub dropped: Vec<DroppedRadial>,
}

/// What the symbology block held.
#[derive(Debug)]
pub enum SymbologyContent {
    Radials(RadialPacket),
    Unsupported(u16),
    Empty,
}

/// Parse the symbology block at the reader's position.
///
/// Only the first radial packet is decoded. Block and layer lengths are
/// clamped to the available bytes so a short buffer fails at the radial
/// that is actually missing.
pub fn parse_symbology(reader: &mut ByteReader<'_>) -> Level3Result<SymbologyContent> {
    let divider = reader.read_i16().context(Context::Symbology)?;
    let block_id = reader.read_i16().context(Context::Symbology)?;
    if divider != BLOCK_DIVIDER || block_id != SYMBOLOGY_BLOCK_ID {
        return Err(Level3Error::invalid_section(
            "symbology block",
            format!("divider {} block id {}", divider, block_id),
        ));
    }
    let length = reader.read_u32().context(Context::Symbology)? as usize;
    let layers = reader.read_u16().context(Context::Symbology)?;
    let mut block = reader.take_up_to(length.saturating_sub(BLOCK_HEADER_SIZE));

    debug!(length, layers, "Parsing symbology block");

    for layer in 0..usize::from(layers) {
        let divider = block.read_i16().context(Context::Layer(layer))?;
        if divider != BLOCK_DIVIDER {
            return Err(Level3Error::invalid_section(
                "symbology layer",
                format!("layer {} divider {}", layer + 1, divider),
            ));
        }
        let layer_length = block.read_u32().context(Context::Layer(layer))? as usize;
        let mut packets = block.take_up_to(layer_length);

        if !packets.is_empty() {
            let code = packets.read_u16().context(Context::PacketHeader)?;
            return match code {
                PACKET_RLE_RADIAL => Ok(SymbologyContent::Radials(parse_radial_packet(
                    &mut packets,
                    code,
                    GateEncoding::RunLength4,
                )?)),
                PACKET_DIGITAL_RADIAL => Ok(SymbologyContent::Radials(parse_radial_packet(
                    &mut packets,
                    code,
                    GateEncoding::Literal8,
                )?)),
                other => {
                    debug!(packet_code = other, "Unsupported packet; leaving moment unparsed");
                    Ok(SymbologyContent::Unsupported(other))
                }
            };
        }
    }

    Ok(SymbologyContent::Empty)
}

fn non_negative(value: i16, what: &str) -> Level3Result<usize> {
    usize::try_from(value).map_err(|_| {
        Level3Error::invalid_section("radial packet", format!("negative {}: {}", what, value))
    })
}

fn parse_radial_packet(
    r: &mut ByteReader<'_>,
    code: u16,
    encoding: GateEncoding,
) -> Level3Result<RadialPacket> {
    let first_bin = r.read_i16().context(Context::PacketHeader)?;
    let bin_count = non_negative(r.read_i16().context(Context::PacketHeader)?, "bin count")?;
    let i_center = r.read_i16().context(Context::PacketHeader)?;
    let j_center = r.read_i16().context(Context::PacketHeader)?;
    let range_scale = r.read_u16().context(Context::PacketHeader)?;
    let declared_radials =
        non_negative(r.read_i16().context(Context::PacketHeader)?, "radial count")?;

    debug!(
        packet_code = code,
        first_bin,
        bin_count,
        declared_radials,
        "Parsing radial packet"
    );

    let mut radials = Vec::with_capacity(declared_radials);
    let mut dropped = Vec::new();

    for index in 0..declared_radials {
        let ctx = Context::Radial(index);
        let length = non_negative(r.read_i16().context(ctx)?, "radial length")?;
        let start = r.read_i16().context(ctx)?;
        let delta = r.read_i16().context(ctx)?;

        let payload_len = match encoding {
            GateEncoding::RunLength4 => length * 2,
            _ => length,
        };
        let payload = r.read_bytes(payload_len).context(ctx)?;
        if payload_len % 2 == 1 && !r.is_empty() {
            r.skip(1).context(ctx)?;
        }

        let azimuth = radar_common::normalize_azimuth(f64::from(start) / 10.0);
        match expand(payload, encoding, bin_count) {
            Ok(gates) => radials.push(Radial {
                azimuth,
                azimuth_delta: f64::from(delta) / 10.0,
                encoding,
                gates,
            }),
            Err(Level3Error::MalformedRunLength { expected, actual }) => {
                warn!(
                    radial = index + 1,
                    azimuth,
                    expected,
                    actual,
                    "Dropping radial with malformed gate data"
                );
                dropped.push(DroppedRadial {
                    index,
                    azimuth,
                    expected_gates: expected,
                    actual_gates: actual,
                });
            }
            Err(e) => return Err(e),
        }
    }

    Ok(RadialPacket {
        info: PacketInfo {
            code,
            first_bin,
            i_center,
            j_center,
            range_scale,
        },
        bin_count,
        declared_radials,
        radials,
        dropped,
    })
}
