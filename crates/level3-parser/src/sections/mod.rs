//! Level III header sections.
//!
//! A product file is laid out as:
//! - optional WMO abbreviated heading plus AWIPS identifier line
//! - optionally, one or more zlib streams whose content starts with a CCB
//!   header and a second WMO heading
//! - the message header (18 bytes)
//! - the product description block (102 bytes)
//! - the symbology, graphic alphanumeric and tabular alphanumeric blocks,
//!   located by halfword offsets from the start of the message header

use nom::bytes::complete::{take_while, take_while1, take_while_m_n};
use nom::character::complete::char;
use nom::combinator::{map, opt, recognize};
use nom::sequence::{preceded, terminated, tuple};
use nom::IResult;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Context, Level3Error, Level3Result, ReadContext};
use crate::reader::ByteReader;

/// Size of the message header in bytes.
pub const MESSAGE_HEADER_SIZE: usize = 18;
/// Size of the product description block in bytes.
pub const DESCRIPTION_BLOCK_SIZE: usize = 102;
/// Block offsets are measured from the start of the message header.
pub const OFFSET_BASE: usize = MESSAGE_HEADER_SIZE + DESCRIPTION_BLOCK_SIZE;

const BLOCK_DIVIDER: i16 = -1;

/// WMO abbreviated heading and AWIPS identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WmoHeading {
    /// Transmission sequence number from the SBN start line, if present.
    pub sequence_number: Option<String>,
    /// TTAAii, e.g. "SDUS54".
    pub data_type: String,
    /// Originating office, e.g. "KOUN".
    pub icao: String,
    /// DDHHMM.
    pub date_time: String,
    /// Optional BBB indicator.
    pub bbb: Option<String>,
    /// AWIPS product category, e.g. "N0Q".
    pub product_category: String,
    /// AWIPS product designator, usually the 3-letter radar id.
    pub product_designator: String,
}

impl WmoHeading {
    /// Serialize the heading in its wire form.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = String::new();
        if let Some(seq) = &self.sequence_number {
            out.push_str(&format!("\x01\r\r\n{} \r\r\n", seq));
        }
        out.push_str(&format!(
            "{} {} {}",
            self.data_type, self.icao, self.date_time
        ));
        if let Some(bbb) = &self.bbb {
            out.push(' ');
            out.push_str(bbb);
        }
        out.push_str("\r\r\n");
        out.push_str(&self.product_category);
        out.push_str(&self.product_designator);
        out.push_str("\r\r\n");
        out.into_bytes()
    }
}

fn is_alnum(c: u8) -> bool {
    c.is_ascii_alphanumeric()
}

fn line_end(input: &[u8]) -> IResult<&[u8], &[u8]> {
    recognize(tuple((
        take_while(|c| c == b' '),
        take_while1(|c| c == b'\r'),
        char('\n'),
    )))(input)
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn sequence_line(input: &[u8]) -> IResult<&[u8], String> {
    map(
        preceded(
            terminated(char('\x01'), line_end),
            terminated(take_while1(|c: u8| c.is_ascii_digit()), line_end),
        ),
        text,
    )(input)
}

fn wmo_heading(input: &[u8]) -> IResult<&[u8], WmoHeading> {
    let (input, sequence_number) = opt(sequence_line)(input)?;
    let (input, data_type) = take_while_m_n(6, 6, is_alnum)(input)?;
    let (input, _) = char(' ')(input)?;
    let (input, icao) = take_while_m_n(4, 4, is_alnum)(input)?;
    let (input, _) = char(' ')(input)?;
    let (input, date_time) = take_while_m_n(6, 6, |c: u8| c.is_ascii_digit())(input)?;
    let (input, bbb) = opt(preceded(char(' '), take_while_m_n(3, 3, is_alnum)))(input)?;
    let (input, _) = line_end(input)?;
    let (input, category) = take_while_m_n(3, 3, is_alnum)(input)?;
    let (input, designator) = take_while_m_n(1, 3, is_alnum)(input)?;
    let (input, _) = line_end(input)?;

    Ok((
        input,
        WmoHeading {
            sequence_number,
            data_type: text(data_type),
            icao: text(icao),
            date_time: text(date_time),
            bbb: bbb.map(text),
            product_category: text(category),
            product_designator: text(designator),
        },
    ))
}

/// Parse a WMO heading from the start of `data`, returning the heading and
/// the bytes following it.
pub fn parse_wmo_heading(data: &[u8]) -> Level3Result<(WmoHeading, &[u8])> {
    match wmo_heading(data) {
        Ok((rest, heading)) => {
            debug!(
                data_type = %heading.data_type,
                icao = %heading.icao,
                date_time = %heading.date_time,
                category = %heading.product_category,
                designator = %heading.product_designator,
                "Parsed WMO heading"
            );
            Ok((heading, rest))
        }
        Err(nom::Err::Incomplete(_)) => Err(Level3Error::invalid_section(
            "WMO heading",
            "incomplete heading",
        )),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(Level3Error::invalid_section(
            "WMO heading",
            format!("{:?} at byte {}", e.code, data.len() - e.input.len()),
        )),
    }
}

/// Skip the communications control block that precedes the inner heading
/// of a decompressed product.
///
/// The low 14 bits of the first halfword give the CCB length in halfwords.
pub fn skip_ccb_header(data: &[u8]) -> Level3Result<&[u8]> {
    let mut reader = ByteReader::new(data);
    let word = reader.read_u16().context(Context::CcbHeader)?;
    let length = usize::from(word & 0x3FFF) * 2;
    if length < 2 {
        return Err(Level3Error::invalid_section(
            "CCB header",
            format!("length {} too small", length),
        ));
    }
    reader.skip(length - 2).context(Context::CcbHeader)?;
    Ok(reader.rest())
}

/// Level III message header (18 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHeader {
    pub message_code: i16,
    /// Julian date, 1 = 1970-01-01.
    pub date: u16,
    /// Seconds after midnight UTC.
    pub time: u32,
    /// Length of the message in bytes, including this header.
    pub length: u32,
    pub source_id: i16,
    pub destination_id: i16,
    pub block_count: u16,
}

impl MessageHeader {
    pub fn parse(reader: &mut ByteReader<'_>) -> Level3Result<Self> {
        let mut r = reader.take(MESSAGE_HEADER_SIZE).context(Context::MessageHeader)?;
        let header = (|| {
            Ok::<_, crate::error::ReadError>(MessageHeader {
                message_code: r.read_i16()?,
                date: r.read_u16()?,
                time: r.read_u32()?,
                length: r.read_u32()?,
                source_id: r.read_i16()?,
                destination_id: r.read_i16()?,
                block_count: r.read_u16()?,
            })
        })()
        .context(Context::MessageHeader)?;

        debug!(
            code = header.message_code,
            length = header.length,
            source = header.source_id,
            blocks = header.block_count,
            "Parsed message header"
        );
        Ok(header)
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.message_code.to_be_bytes());
        out.extend_from_slice(&self.date.to_be_bytes());
        out.extend_from_slice(&self.time.to_be_bytes());
        out.extend_from_slice(&self.length.to_be_bytes());
        out.extend_from_slice(&self.source_id.to_be_bytes());
        out.extend_from_slice(&self.destination_id.to_be_bytes());
        out.extend_from_slice(&self.block_count.to_be_bytes());
    }
}

/// Product description block (102 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDescription {
    /// Radar latitude in thousandths of a degree.
    pub latitude: i32,
    /// Radar longitude in thousandths of a degree.
    pub longitude: i32,
    /// Radar height above sea level in feet.
    pub height_ft: i16,
    pub product_code: i16,
    pub operational_mode: u16,
    pub vcp: u16,
    pub sequence_number: i16,
    pub volume_scan_number: u16,
    pub volume_date: u16,
    pub volume_time: u32,
    pub generation_date: u16,
    pub generation_time: u32,
    pub p1: i16,
    pub p2: i16,
    pub elevation_number: u16,
    /// Elevation angle in tenths of a degree for elevation-based products.
    pub p3: i16,
    pub thresholds: [u16; 16],
    pub p4: i16,
    pub p5: i16,
    pub p6: i16,
    pub p7: i16,
    /// Compression method: 0 none, 1 bzip2.
    pub p8: i16,
    pub p9: i16,
    pub p10: i16,
    pub version: u8,
    pub spot_blank: u8,
    /// Halfword offsets from the message start.
    pub offset_symbology: u32,
    pub offset_graphic: u32,
    pub offset_tabular: u32,
}

impl ProductDescription {
    pub fn parse(reader: &mut ByteReader<'_>) -> Level3Result<Self> {
        let mut r = reader
            .take(DESCRIPTION_BLOCK_SIZE)
            .context(Context::ProductDescription)?;

        let divider = r.read_i16().context(Context::ProductDescription)?;
        if divider != BLOCK_DIVIDER {
            return Err(Level3Error::invalid_section(
                "product description block",
                format!("expected divider -1, found {}", divider),
            ));
        }

        let block = (|| {
            let latitude = r.read_i32()?;
            let longitude = r.read_i32()?;
            let height_ft = r.read_i16()?;
            let product_code = r.read_i16()?;
            let operational_mode = r.read_u16()?;
            let vcp = r.read_u16()?;
            let sequence_number = r.read_i16()?;
            let volume_scan_number = r.read_u16()?;
            let volume_date = r.read_u16()?;
            let volume_time = r.read_u32()?;
            let generation_date = r.read_u16()?;
            let generation_time = r.read_u32()?;
            let p1 = r.read_i16()?;
            let p2 = r.read_i16()?;
            let elevation_number = r.read_u16()?;
            let p3 = r.read_i16()?;
            let mut thresholds = [0u16; 16];
            for t in thresholds.iter_mut() {
                *t = r.read_u16()?;
            }
            Ok::<_, crate::error::ReadError>(ProductDescription {
                latitude,
                longitude,
                height_ft,
                product_code,
                operational_mode,
                vcp,
                sequence_number,
                volume_scan_number,
                volume_date,
                volume_time,
                generation_date,
                generation_time,
                p1,
                p2,
                elevation_number,
                p3,
                thresholds,
                p4: r.read_i16()?,
                p5: r.read_i16()?,
                p6: r.read_i16()?,
                p7: r.read_i16()?,
                p8: r.read_i16()?,
                p9: r.read_i16()?,
                p10: r.read_i16()?,
                version: r.read_u8()?,
                spot_blank: r.read_u8()?,
                offset_symbology: r.read_u32()?,
                offset_graphic: r.read_u32()?,
                offset_tabular: r.read_u32()?,
            })
        })()
        .context(Context::ProductDescription)?;

        debug!(
            product_code = block.product_code,
            vcp = block.vcp,
            elevation_number = block.elevation_number,
            offset_symbology = block.offset_symbology,
            "Parsed product description block"
        );
        Ok(block)
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&BLOCK_DIVIDER.to_be_bytes());
        out.extend_from_slice(&self.latitude.to_be_bytes());
        out.extend_from_slice(&self.longitude.to_be_bytes());
        out.extend_from_slice(&self.height_ft.to_be_bytes());
        out.extend_from_slice(&self.product_code.to_be_bytes());
        out.extend_from_slice(&self.operational_mode.to_be_bytes());
        out.extend_from_slice(&self.vcp.to_be_bytes());
        out.extend_from_slice(&self.sequence_number.to_be_bytes());
        out.extend_from_slice(&self.volume_scan_number.to_be_bytes());
        out.extend_from_slice(&self.volume_date.to_be_bytes());
        out.extend_from_slice(&self.volume_time.to_be_bytes());
        out.extend_from_slice(&self.generation_date.to_be_bytes());
        out.extend_from_slice(&self.generation_time.to_be_bytes());
        out.extend_from_slice(&self.p1.to_be_bytes());
        out.extend_from_slice(&self.p2.to_be_bytes());
        out.extend_from_slice(&self.elevation_number.to_be_bytes());
        out.extend_from_slice(&self.p3.to_be_bytes());
        for t in &self.thresholds {
            out.extend_from_slice(&t.to_be_bytes());
        }
        for p in [self.p4, self.p5, self.p6, self.p7, self.p8, self.p9, self.p10] {
            out.extend_from_slice(&p.to_be_bytes());
        }
        out.push(self.version);
        out.push(self.spot_blank);
        out.extend_from_slice(&self.offset_symbology.to_be_bytes());
        out.extend_from_slice(&self.offset_graphic.to_be_bytes());
        out.extend_from_slice(&self.offset_tabular.to_be_bytes());
    }

    /// Whether the blocks after the description are bzip2-compressed.
    pub fn is_compressed(&self) -> bool {
        self.p8 == 1
    }

    /// Size of the decompressed blocks held in p9 (high) and p10 (low).
    /// Zero when the product is not compressed.
    pub fn uncompressed_size(&self) -> usize {
        let high = u32::from(self.p9 as u16);
        let low = u32::from(self.p10 as u16);
        ((high << 16) | low) as usize
    }

    /// Byte offset of a block from the start of the message header, if
    /// the block is present.
    pub fn block_offset(halfwords: u32) -> Option<usize> {
        let bytes = halfwords as usize * 2;
        (bytes >= OFFSET_BASE).then_some(bytes)
    }
}

/// Whether `data` starts like a bare message header followed by a
/// product description block.
pub fn looks_like_message(data: &[u8]) -> bool {
    data.len() >= OFFSET_BASE
        && data[MESSAGE_HEADER_SIZE..MESSAGE_HEADER_SIZE + 2] == BLOCK_DIVIDER.to_be_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wmo_heading() {
        let data = b"SDUS54 KOUN 011200\r\r\nN0QTLX\r\r\n\x00\x5e";
        let (heading, rest) = parse_wmo_heading(data).unwrap();
        assert_eq!(heading.data_type, "SDUS54");
        assert_eq!(heading.icao, "KOUN");
        assert_eq!(heading.date_time, "011200");
        assert_eq!(heading.bbb, None);
        assert_eq!(heading.product_category, "N0Q");
        assert_eq!(heading.product_designator, "TLX");
        assert_eq!(rest, b"\x00\x5e");
        assert_eq!(heading.to_bytes(), data[..data.len() - 2].to_vec());
    }

    #[test]
    fn test_parse_wmo_heading_with_sequence_and_bbb() {
        let data = b"\x01\r\r\n123 \r\r\nSDUS34 KFWD 061412 RRA\r\r\nN0UFWS \r\r\n";
        let (heading, rest) = parse_wmo_heading(data).unwrap();
        assert_eq!(heading.sequence_number.as_deref(), Some("123"));
        assert_eq!(heading.bbb.as_deref(), Some("RRA"));
        assert_eq!(heading.product_designator, "FWS");
        assert!(rest.is_empty());
    }

    #[test]
    fn test_reject_binary_as_wmo() {
        let data = [0x00u8, 0x5E, 0x4C, 0x9A, 0x00, 0x00];
        assert!(parse_wmo_heading(&data).is_err());
    }

    #[test]
    fn test_skip_ccb() {
        // 12 halfwords of CCB followed by payload
        let mut data = vec![0x40, 0x0C];
        data.extend_from_slice(&[0u8; 22]);
        data.extend_from_slice(b"SDUS");
        assert_eq!(skip_ccb_header(&data).unwrap(), b"SDUS");
        assert!(skip_ccb_header(&data[..10]).is_err());
    }

    #[test]
    fn test_block_offset() {
        assert_eq!(ProductDescription::block_offset(60), Some(120));
        assert_eq!(ProductDescription::block_offset(0), None);
    }
}
