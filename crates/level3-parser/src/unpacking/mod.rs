//! Gate payload expansion and whole-message decompression.
//!
//! Radial payloads come in three encodings:
//! - literal 8-bit levels (digital radial packets)
//! - literal 16-bit big-endian levels
//! - 4-bit run-length pairs, one byte per run: high nibble is the run
//!   count, low nibble the level

use std::io::Read;

use bzip2::read::MultiBzDecoder;
use flate2::{Decompress, FlushDecompress, Status};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{Level3Error, Level3Result};

/// Encoding of a radial's gate payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GateEncoding {
    Literal8,
    Literal16,
    RunLength4,
}

/// Dense per-gate data levels of one radial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateLevels {
    U8(Vec<u8>),
    U16(Vec<u16>),
}

impl GateLevels {
    pub fn len(&self) -> usize {
        match self {
            GateLevels::U8(v) => v.len(),
            GateLevels::U16(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Level of gate `i`, widened to u16.
    pub fn get(&self, i: usize) -> Option<u16> {
        match self {
            GateLevels::U8(v) => v.get(i).map(|&l| u16::from(l)),
            GateLevels::U16(v) => v.get(i).copied(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }
}

/// Expand a raw radial payload into exactly `expected_gates` levels.
///
/// Returns [`Level3Error::MalformedRunLength`] when the payload does not
/// describe exactly `expected_gates` gates.
pub fn expand(
    raw: &[u8],
    encoding: GateEncoding,
    expected_gates: usize,
) -> Level3Result<GateLevels> {
    let levels = match encoding {
        GateEncoding::Literal8 => GateLevels::U8(raw.to_vec()),
        GateEncoding::Literal16 => {
            if raw.len() % 2 != 0 {
                return Err(Level3Error::MalformedRunLength {
                    expected: expected_gates,
                    actual: raw.len() / 2,
                });
            }
            GateLevels::U16(
                raw.chunks_exact(2)
                    .map(|c| u16::from_be_bytes([c[0], c[1]]))
                    .collect(),
            )
        }
        GateEncoding::RunLength4 => GateLevels::U8(expand_run_length(raw, expected_gates)?),
    };

    if levels.len() != expected_gates {
        return Err(Level3Error::MalformedRunLength {
            expected: expected_gates,
            actual: levels.len(),
        });
    }
    Ok(levels)
}

fn expand_run_length(raw: &[u8], expected_gates: usize) -> Level3Result<Vec<u8>> {
    let total: usize = raw.iter().map(|&b| usize::from(b >> 4)).sum();
    if total != expected_gates {
        return Err(Level3Error::MalformedRunLength {
            expected: expected_gates,
            actual: total,
        });
    }

    let mut gates = Vec::with_capacity(total);
    for &byte in raw {
        let run = usize::from(byte >> 4);
        gates.extend(std::iter::repeat(byte & 0x0F).take(run));
    }
    Ok(gates)
}

/// Pack 4-bit levels into run-length bytes, padded to a whole halfword
/// with a zero-length run.
pub fn pack_run_length(levels: &[u8]) -> Level3Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut iter = levels.iter().peekable();
    while let Some(&level) = iter.next() {
        if level > 0x0F {
            return Err(Level3Error::Encode(format!(
                "level {} does not fit in 4 bits",
                level
            )));
        }
        let mut run = 1u8;
        while run < 15 && iter.peek() == Some(&&level) {
            iter.next();
            run += 1;
        }
        out.push((run << 4) | level);
    }
    if out.len() % 2 != 0 {
        out.push(0);
    }
    Ok(out)
}

/// Inflate one or more concatenated zlib streams.
///
/// Each stream starts with the 0x78 CMF byte; decoding stops at the first
/// byte after a complete stream that does not start another one.
pub fn inflate_zlib(data: &[u8]) -> Level3Result<Vec<u8>> {
    let mut output = Vec::with_capacity(data.len() * 4);
    let mut consumed = 0usize;

    while data.get(consumed) == Some(&0x78) {
        let mut inflater = Decompress::new(true);
        let input = &data[consumed..];
        loop {
            if output.capacity() - output.len() < 8 * 1024 {
                output.reserve(64 * 1024);
            }
            let in_before = inflater.total_in() as usize;
            let out_before = output.len();
            let status = inflater
                .decompress_vec(&input[in_before..], &mut output, FlushDecompress::None)
                .map_err(|e| Level3Error::Decompression(e.to_string()))?;

            match status {
                Status::StreamEnd => break,
                Status::Ok | Status::BufError => {
                    let progressed = inflater.total_in() as usize != in_before
                        || output.len() != out_before;
                    if !progressed && output.capacity() > output.len() {
                        return Err(Level3Error::Decompression(
                            "zlib stream ended unexpectedly".to_string(),
                        ));
                    }
                }
            }
        }

        let stream_in = inflater.total_in() as usize;
        if stream_in == 0 {
            break;
        }
        trace!(
            stream_in,
            stream_out = inflater.total_out(),
            "Inflated zlib stream"
        );
        consumed += stream_in;
    }

    if consumed == 0 {
        return Err(Level3Error::Decompression(
            "data does not start with a zlib header".to_string(),
        ));
    }
    Ok(output)
}

/// Decompress the bzip2 record that follows the description block of an
/// RPG-compressed product.
pub fn decompress_bzip2(data: &[u8], size_hint: usize) -> Level3Result<Vec<u8>> {
    let mut output = Vec::with_capacity(size_hint.max(data.len() * 4));
    MultiBzDecoder::new(data)
        .read_to_end(&mut output)
        .map_err(|e| Level3Error::Decompression(format!("bzip2: {}", e)))?;
    trace!(compressed = data.len(), inflated = output.len(), "Decompressed bzip2 record");
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn zlib(data: &[u8]) -> Vec<u8> {
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn test_run_length_expansion() {
        // 3 gates of level 2, 2 gates of level 5, padding byte
        let raw = [0x32, 0x25, 0x00, 0x00];
        let levels = expand(&raw, GateEncoding::RunLength4, 5).unwrap();
        assert_eq!(levels, GateLevels::U8(vec![2, 2, 2, 5, 5]));
    }

    #[test]
    fn test_run_length_mismatch() {
        let raw = [0x32, 0x25];
        let err = expand(&raw, GateEncoding::RunLength4, 6).unwrap_err();
        assert_eq!(
            err,
            Level3Error::MalformedRunLength {
                expected: 6,
                actual: 5
            }
        );
    }

    #[test]
    fn test_literal_expansion() {
        let raw = [0x00, 0x10, 0x01, 0x00];
        assert_eq!(
            expand(&raw, GateEncoding::Literal16, 2).unwrap(),
            GateLevels::U16(vec![16, 256])
        );
        assert_eq!(expand(&raw, GateEncoding::Literal8, 4).unwrap().len(), 4);
        assert!(expand(&raw, GateEncoding::Literal8, 5).is_err());
        assert!(expand(&raw[..3], GateEncoding::Literal16, 1).is_err());
    }

    #[test]
    fn test_pack_run_length_splits_long_runs() {
        let levels = vec![7u8; 20];
        let packed = pack_run_length(&levels).unwrap();
        assert_eq!(packed, vec![0xF7, 0x57]);
        assert_eq!(
            expand(&packed, GateEncoding::RunLength4, 20).unwrap(),
            GateLevels::U8(levels)
        );
        assert!(pack_run_length(&[16]).is_err());
    }

    #[test]
    fn test_inflate_concatenated_streams() {
        let mut data = zlib(b"first stream, ");
        data.extend(zlib(b"second stream"));
        data.extend_from_slice(b"\x00trailing");
        let out = inflate_zlib(&data).unwrap();
        assert_eq!(out, b"first stream, second stream");
    }

    #[test]
    fn test_inflate_rejects_garbage() {
        assert!(inflate_zlib(b"not zlib").is_err());
        assert!(inflate_zlib(&[0x78, 0x9C, 0xFF, 0xFF]).is_err());
    }

    #[test]
    fn test_decompress_bzip2_record() {
        let body: Vec<u8> = (0..4000u32).map(|i| (i % 251) as u8).collect();
        let mut enc = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
        enc.write_all(&body).unwrap();
        let compressed = enc.finish().unwrap();

        assert_eq!(decompress_bzip2(&compressed, body.len()).unwrap(), body);
        assert!(matches!(
            decompress_bzip2(b"BZh9 but not really", 0),
            Err(Level3Error::Decompression(_))
        ));
    }
}
