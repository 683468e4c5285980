// Sign-magnitude little-endian 64-bit integers (bsdiff `offtin` / `offtout`).
//
// Bytes 0..7 hold the magnitude, least-significant byte first. Bit 7 of
// byte 7 is the sign. This is NOT two's complement: -1 is
// `01 00 00 00 00 00 00 80`, not `FF FF FF FF FF FF FF FF`.

use std::io::{self, Write};

/// Encoded width of every integer field in the format.
pub const INT_LEN: usize = 8;

const SIGN_BIT: u8 = 0x80;
const MAGNITUDE_MASK: u64 = 0x7FFF_FFFF_FFFF_FFFF;

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode one sign-magnitude integer.
///
/// A set sign bit over a zero magnitude ("negative zero") decodes as 0.
#[inline]
pub fn decode(buf: &[u8; INT_LEN]) -> i64 {
    let magnitude = (u64::from_le_bytes(*buf) & MAGNITUDE_MASK) as i64;
    if buf[7] & SIGN_BIT != 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Decode an integer from the front of `data`, or `None` if fewer than
/// eight bytes are available.
pub fn read_i64(data: &[u8]) -> Option<i64> {
    let bytes: &[u8; INT_LEN] = data.get(..INT_LEN)?.try_into().ok()?;
    Some(decode(bytes))
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Encode `value`, or `None` for `i64::MIN`, whose magnitude does not fit in
/// 63 bits.
#[inline]
pub fn encode(value: i64) -> Option<[u8; INT_LEN]> {
    if value == i64::MIN {
        return None;
    }
    let mut buf = value.unsigned_abs().to_le_bytes();
    if value < 0 {
        buf[7] |= SIGN_BIT;
    }
    Some(buf)
}

/// Encode `value` and write it to a `Write` sink.
pub fn write_i64<W: Write>(w: &mut W, value: i64) -> io::Result<()> {
    let buf = encode(value).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "i64::MIN has no sign-magnitude encoding",
        )
    })?;
    w.write_all(&buf)
}

/// Encode a length or size field.
pub fn write_u64<W: Write>(w: &mut W, value: u64) -> io::Result<()> {
    let value = i64::try_from(value).map_err(|_| {
        io::Error::new(io::ErrorKind::InvalidInput, "length exceeds i64::MAX")
    })?;
    write_i64(w, value)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
