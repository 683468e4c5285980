// Error types for patch parsing and application.
//
// Two kinds only: transport failures (`Io`) and structural violations of the
// patch (`Corrupt`). `Corruption` carries the offsets and lengths needed to
// tell where a patch went wrong.

use std::fmt;
use std::io;

use thiserror::Error;

/// The three compressed segments that follow the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Control,
    Diff,
    Extra,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Control => "control",
            Self::Diff => "diff",
            Self::Extra => "extra",
        })
    }
}

/// A byte source consumed while reconstructing output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteSource {
    Segment(Segment),
    Old,
}

impl fmt::Display for ByteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Segment(s) => write!(f, "{s} segment"),
            Self::Old => f.write_str("old input"),
        }
    }
}

/// Every way a patch can be structurally invalid.
#[derive(Debug, Error)]
pub enum Corruption {
    #[error("truncated header: got {actual} of 32 bytes")]
    TruncatedHeader { actual: usize },

    #[error("bad magic {found:02X?}")]
    BadMagic { found: [u8; 8] },

    #[error("negative {field} in header: {value}")]
    NegativeField { field: &'static str, value: i64 },

    #[error("truncated {segment} segment: expected {expected} bytes, got {actual}")]
    TruncatedSegment {
        segment: Segment,
        expected: u64,
        actual: u64,
    },

    #[error(
        "control stream ended at output offset {newpos} of {new_size} ({actual} bytes of partial triplet)"
    )]
    TruncatedControl {
        newpos: u64,
        new_size: u64,
        actual: usize,
    },

    #[error("{len} bytes at output offset {newpos} would overrun declared size {new_size}")]
    Overrun { newpos: u64, len: u64, new_size: u64 },

    #[error("short read from {from} at output offset {offset}: expected {expected} bytes, got {actual}")]
    ShortRead {
        from: ByteSource,
        offset: u64,
        expected: u64,
        actual: u64,
    },

    #[error("cannot reposition old input to {oldpos}")]
    BadSeek { oldpos: i64 },

    #[error("position arithmetic overflowed")]
    PositionOverflow,

    #[error("{segment} segment failed to decompress: {source}")]
    Decompress {
        segment: Segment,
        #[source]
        source: io::Error,
    },
}

/// Error returned by every patch operation.
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("corrupt patch: {0}")]
    Corrupt(#[from] Corruption),
}

impl PatchError {
    /// True for structural violations, false for transport failures.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::Corrupt(_))
    }

    /// The structural violation, if this is one.
    pub fn corruption(&self) -> Option<&Corruption> {
        match self {
            Self::Corrupt(c) => Some(c),
            Self::Io(_) => None,
        }
    }

    /// Classify an error raised while reading a decompressed segment.
    ///
    /// Decoder failures surface as `InvalidData`, `InvalidInput` or
    /// `UnexpectedEof`; anything else came from the transport underneath.
    pub(crate) fn from_segment(segment: Segment, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::InvalidData
            | io::ErrorKind::InvalidInput
            | io::ErrorKind::UnexpectedEof => {
                Self::Corrupt(Corruption::Decompress {
                    segment,
                    source: err,
                })
            }
            _ => Self::Io(err),
        }
    }
}

impl From<PatchError> for io::Error {
    fn from(e: PatchError) -> io::Error {
        match e {
            PatchError::Io(e) => e,
            PatchError::Corrupt(c) => io::Error::new(io::ErrorKind::InvalidData, c),
        }
    }
}
