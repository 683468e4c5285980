// BSDIFF40 patch header: magic plus three sign-magnitude length fields.
//
//   offset 0   magic     "BSDIFF40"
//   offset 8   ctrl_len  compressed control segment length
//   offset 16  diff_len  compressed diff segment length
//   offset 24  new_size  length of the reconstructed output

use std::io::{self, Read, Write};

use super::{read_full, signmag};
use crate::error::{Corruption, PatchError};

/// Magic tag for bsdiff 4.x patches with bzip2-compressed segments.
pub const BSDIFF_MAGIC: [u8; 8] = *b"BSDIFF40";

/// Fixed header length in bytes.
pub const HEADER_LEN: usize = 32;

/// Validated patch header. All lengths are known to be non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Header {
    /// Byte length of the compressed control segment.
    pub ctrl_len: u64,
    /// Byte length of the compressed diff segment.
    pub diff_len: u64,
    /// Total length of the reconstructed output.
    pub new_size: u64,
}

impl Header {
    /// Parse and validate a header from the first 32 bytes of `data`.
    pub fn parse(data: &[u8]) -> Result<Self, PatchError> {
        let bytes: &[u8; HEADER_LEN] = data
            .get(..HEADER_LEN)
            .and_then(|b| b.try_into().ok())
            .ok_or(Corruption::TruncatedHeader {
                actual: data.len().min(HEADER_LEN),
            })?;

        let mut magic = [0u8; 8];
        magic.copy_from_slice(&bytes[..8]);
        if magic != BSDIFF_MAGIC {
            return Err(Corruption::BadMagic { found: magic }.into());
        }

        Ok(Self {
            ctrl_len: length_field(bytes, 8, "control length")?,
            diff_len: length_field(bytes, 16, "diff length")?,
            new_size: length_field(bytes, 24, "new size")?,
        })
    }

    /// Read and validate a header from a reader, consuming exactly 32 bytes
    /// when the input is long enough.
    pub fn decode<R: Read>(r: &mut R) -> Result<Self, PatchError> {
        let mut buf = [0u8; HEADER_LEN];
        let n = read_full(r, &mut buf)?;
        Self::parse(&buf[..n])
    }

    /// Encode the header to a writer.
    pub fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&BSDIFF_MAGIC)?;
        signmag::write_u64(w, self.ctrl_len)?;
        signmag::write_u64(w, self.diff_len)?;
        signmag::write_u64(w, self.new_size)
    }
}

fn length_field(
    bytes: &[u8; HEADER_LEN],
    offset: usize,
    field: &'static str,
) -> Result<u64, Corruption> {
    let value = signmag::read_i64(&bytes[offset..]).unwrap_or_default();
    u64::try_from(value).map_err(|_| Corruption::NegativeField { field, value })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
