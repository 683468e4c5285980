// Byte-wise modular sum of the diff segment and the old input.
//
// output[i] = diff[i] + old[i] (mod 256). Both sources advance by exactly the
// number of bytes produced; a short read on either side is corruption.

use std::io::Read;

use crate::error::{ByteSource, Corruption, PatchError, Segment};
use crate::format::read_full;

/// Pull adapter over the diff segment and a window of the old input.
///
/// `offset` tracks the output position of the next byte so errors can point
/// at where reconstruction stopped.
pub struct ByteSumCombiner<'a, D: Read, O: Read> {
    diff: &'a mut D,
    old: &'a mut O,
    scratch: &'a mut Vec<u8>,
    offset: u64,
}

impl<'a, D: Read, O: Read> ByteSumCombiner<'a, D, O> {
    /// `scratch` holds the old-side bytes of each call and is reused.
    pub fn new(diff: &'a mut D, old: &'a mut O, scratch: &'a mut Vec<u8>, offset: u64) -> Self {
        Self {
            diff,
            old,
            scratch,
            offset,
        }
    }

    /// Fill `out` with `out.len()` combined bytes.
    pub fn read(&mut self, out: &mut [u8]) -> Result<(), PatchError> {
        let n = out.len();

        let got = read_full(&mut *self.diff, out)
            .map_err(|e| PatchError::from_segment(Segment::Diff, e))?;
        self.check(ByteSource::Segment(Segment::Diff), n, got)?;

        self.scratch.resize(n, 0);
        let got = read_full(&mut *self.old, &mut self.scratch[..n])?;
        self.check(ByteSource::Old, n, got)?;

        for (o, b) in out.iter_mut().zip(self.scratch.iter()) {
            *o = o.wrapping_add(*b);
        }
        self.offset += n as u64;
        Ok(())
    }

    /// Output offset of the next byte this combiner will produce.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    fn check(&self, from: ByteSource, expected: usize, actual: usize) -> Result<(), Corruption> {
        if actual == expected {
            return Ok(());
        }
        Err(Corruption::ShortRead {
            from,
            offset: self.offset,
            expected: expected as u64,
            actual: actual as u64,
        })
    }
}
