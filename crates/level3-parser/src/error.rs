//! Decoder error types.

use std::fmt;
use thiserror::Error;

/// Result type alias using Level3Error.
pub type Level3Result<T> = Result<T, Level3Error>;

/// A read ran past the end of the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("requested {requested} bytes at offset {offset}, only {remaining} remaining")]
pub struct TruncatedInputError {
    pub offset: usize,
    pub requested: usize,
    pub remaining: usize,
}

/// Errors from the low-level byte reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReadError {
    #[error(transparent)]
    Truncated(#[from] TruncatedInputError),

    #[error("unsupported field width {0} (expected 1, 2, 4 or 8)")]
    InvalidWidth(usize),
}

/// Where in the product a read failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    WmoHeading,
    CcbHeader,
    MessageHeader,
    ProductDescription,
    Symbology,
    Layer(usize),
    PacketHeader,
    /// Zero-based radial index; displayed one-based.
    Radial(usize),
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Context::WmoHeading => write!(f, "WMO heading"),
            Context::CcbHeader => write!(f, "CCB header"),
            Context::MessageHeader => write!(f, "message header"),
            Context::ProductDescription => write!(f, "product description block"),
            Context::Symbology => write!(f, "symbology block"),
            Context::Layer(i) => write!(f, "symbology layer {}", i + 1),
            Context::PacketHeader => write!(f, "packet header"),
            Context::Radial(i) => write!(f, "radial {}", i + 1),
        }
    }
}

/// Level III decoding errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Level3Error {
    #[error("Truncated input in {context}: {source}")]
    Truncated {
        context: Context,
        #[source]
        source: TruncatedInputError,
    },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Malformed run-length data: expanded to {actual} gates, expected {expected}")]
    MalformedRunLength { expected: usize, actual: usize },

    #[error("Invalid {section}: {reason}")]
    InvalidSection {
        section: &'static str,
        reason: String,
    },

    #[error("Decompression failed: {0}")]
    Decompression(String),

    #[error("Unsupported field width: {0}")]
    InvalidWidth(usize),

    #[error("Cannot encode product: {0}")]
    Encode(String),
}

impl Level3Error {
    pub fn invalid_section(section: &'static str, reason: impl Into<String>) -> Self {
        Level3Error::InvalidSection {
            section,
            reason: reason.into(),
        }
    }

    /// Short machine-readable kind, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            Level3Error::Truncated { .. } => "truncated_input",
            Level3Error::UnsupportedFormat(_) => "unsupported_format",
            Level3Error::MalformedRunLength { .. } => "malformed_run_length",
            Level3Error::InvalidSection { .. } => "invalid_section",
            Level3Error::Decompression(_) => "decompression",
            Level3Error::InvalidWidth(_) => "invalid_width",
            Level3Error::Encode(_) => "encode",
        }
    }
}

/// Attach a [`Context`] to reader errors.
pub trait ReadContext<T> {
    fn context(self, context: Context) -> Level3Result<T>;
}

impl<T> ReadContext<T> for Result<T, ReadError> {
    fn context(self, context: Context) -> Level3Result<T> {
        self.map_err(|err| match err {
            ReadError::Truncated(source) => Level3Error::Truncated { context, source },
            ReadError::InvalidWidth(width) => Level3Error::InvalidWidth(width),
        })
    }
}
