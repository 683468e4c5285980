// bzip2 segment codec.
//
// Every segment of a BSDIFF40 patch is an independent bzip2 stream. The
// decoder side is a lazy `Read` adapter so segments are inflated only as far
// as reconstruction consumes them.

use std::io::{self, Read, Write};

use bzip2::Compression;
use bzip2::read::BzDecoder;
use bzip2::write::BzEncoder;

/// Compression level used by the reference encoder.
pub const DEFAULT_LEVEL: u32 = 9;

/// Wrap a compressed byte source in a streaming decompressor.
pub fn decompress<R: Read>(input: R) -> BzDecoder<R> {
    BzDecoder::new(input)
}

/// Compress `data` as one bzip2 stream. `level` is clamped to 1..=9.
pub fn compress(data: &[u8], level: u32) -> io::Result<Vec<u8>> {
    let mut encoder = BzEncoder::new(Vec::new(), Compression::new(level.clamp(1, 9)));
    encoder.write_all(data)?;
    encoder.finish()
}
