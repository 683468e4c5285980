// bsdiff 4.x patch wire format.
//
// # Modules
//
// - `signmag`: Sign-magnitude little-endian int64 fields
// - `header` : 32-byte patch header (magic + three lengths)
// - `control`: (add, copy, seek) triplets and their streaming reader

pub mod control;
pub mod header;
pub mod signmag;

use std::io::{self, Read};

pub use control::{CONTROL_LEN, Control, ControlRead, ControlReader};
pub use header::{BSDIFF_MAGIC, HEADER_LEN, Header};

/// Read until `buf` is full or the source hits end of stream.
///
/// Returns the number of bytes read; fewer than `buf.len()` means EOF.
pub(crate) fn read_full<R: Read + ?Sized>(r: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
