//! NEXRAD Level III radial product decoder.
//!
//! Turns raw product bytes (optionally WMO-framed and zlib-compressed) into
//! a [`Product`]: an immutable header plus dense per-gate data levels for
//! each radial. Decoding is a pure function of its input.
//!
//! ```no_run
//! let bytes = std::fs::read("KTLX_N0Q.bin").unwrap();
//! let product = level3_parser::decode(&bytes).unwrap();
//! println!("{} radials", product.radials.len());
//! ```

pub mod decoder;
pub mod encode;
pub mod error;
pub mod product;
pub mod reader;
pub mod sections;
pub mod symbology;
pub mod tables;
pub mod thresholds;
pub mod unpacking;

pub use decoder::decode;
pub use encode::{encode, encode_compressed};
pub use error::{Context, Level3Error, Level3Result, ReadError, TruncatedInputError};
pub use product::{
    BlockLayout, DroppedRadial, Moment, PacketInfo, Product, ProductHeader, Radial,
    UnparsedReason,
};
pub use reader::{ByteReader, Endian};
pub use sections::WmoHeading;
pub use tables::{product_by_category, product_info, DataLevelScheme, ProductInfo, ProductKind};
pub use thresholds::{DataLevels, DataValue};
pub use unpacking::{expand, inflate_zlib, GateEncoding, GateLevels};
