// Splits the bytes after the header into the three compressed segments and
// wraps each in its own decompressor.
//
// Control and diff are bounded by the header lengths and buffered; the
// extra segment is everything left in the patch and is decompressed straight
// off the patch reader.

use std::io::{Cursor, Read};

use bzip2::read::BzDecoder;
use log::debug;

use crate::codec;
use crate::error::{Corruption, PatchError, Segment};
use crate::format::{ControlReader, Header};

/// Decompressor over a buffered, length-bounded segment.
pub type BoundedSegment = BzDecoder<Cursor<Vec<u8>>>;

/// The three decompressed byte sources for one patch operation.
pub struct Segments<P: Read> {
    pub control: ControlReader<BoundedSegment>,
    pub diff: BoundedSegment,
    pub extra: BzDecoder<P>,
}

/// Carve `patch` (positioned just past the header) into its segments.
///
/// Fails if the patch ends before `ctrl_len + diff_len` bytes. Decompression
/// errors surface later, when the segment is read.
pub fn demultiplex<P: Read>(mut patch: P, header: &Header) -> Result<Segments<P>, PatchError> {
    let control = read_segment(&mut patch, Segment::Control, header.ctrl_len)?;
    let diff = read_segment(&mut patch, Segment::Diff, header.diff_len)?;
    debug!(
        "segments: control {} bytes, diff {} bytes, extra to end of patch",
        header.ctrl_len, header.diff_len
    );

    Ok(Segments {
        control: ControlReader::new(codec::decompress(Cursor::new(control))),
        diff: codec::decompress(Cursor::new(diff)),
        extra: codec::decompress(patch),
    })
}

/// Read exactly `len` compressed bytes.
///
/// The buffer grows with the bytes actually present, so a forged length
/// cannot force a large allocation up front.
fn read_segment<P: Read>(patch: &mut P, segment: Segment, len: u64) -> Result<Vec<u8>, PatchError> {
    let mut buf = Vec::new();
    patch.by_ref().take(len).read_to_end(&mut buf)?;
    let actual = buf.len() as u64;
    if actual != len {
        return Err(Corruption::TruncatedSegment {
            segment,
            expected: len,
            actual,
        }
        .into());
    }
    Ok(buf)
}
