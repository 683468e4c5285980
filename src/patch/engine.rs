// Patch engine: header validation, segment setup and the triplet-driven
// reconstruction loop.
//
// Both entry points run the same loop. The whole-buffer mode wraps the old
// bytes in a `Cursor`; the streaming mode takes any seekable reader, so
// memory stays bounded by `PatchOptions::buffer_size` plus the buffered
// control and diff segments.

use std::io::{Cursor, Read, Seek, SeekFrom, Write};

use log::{debug, trace};

use super::combine::ByteSumCombiner;
use super::demux::{self, Segments};
use crate::error::{ByteSource, Corruption, PatchError, Segment};
use crate::format::{ControlRead, Header, read_full};

/// Default chunk size for moving add/copy data (64 KiB).
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Upper bound on output preallocation in whole-buffer mode. The declared
/// size comes from the patch and is not trusted for allocation.
const MAX_PREALLOC: u64 = 1 << 26;

// ---------------------------------------------------------------------------
// Options and stats
// ---------------------------------------------------------------------------

/// Configuration for patch application.
#[derive(Debug, Clone)]
pub struct PatchOptions {
    /// Chunk size used while streaming add and copy data.
    pub buffer_size: usize,
}

impl Default for PatchOptions {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

/// Summary of one successful patch operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchStats {
    /// Bytes written to the output.
    pub new_size: u64,
    /// Control triplets consumed.
    pub controls: u64,
    /// Bytes produced by add steps.
    pub add_bytes: u64,
    /// Bytes produced by copy steps.
    pub copy_bytes: u64,
}

// ---------------------------------------------------------------------------
// Patcher
// ---------------------------------------------------------------------------

/// A patch whose header has been read and validated.
///
/// Construction consumes the 32-byte header; applying consumes the rest.
pub struct Patcher<P: Read> {
    patch: P,
    header: Header,
    options: PatchOptions,
}

impl<P: Read> Patcher<P> {
    /// Read and validate the header of `patch`.
    pub fn new(patch: P) -> Result<Self, PatchError> {
        Self::with_options(patch, PatchOptions::default())
    }

    pub fn with_options(mut patch: P, options: PatchOptions) -> Result<Self, PatchError> {
        let header = Header::decode(&mut patch)?;
        debug!(
            "header: ctrl_len {}, diff_len {}, new_size {}",
            header.ctrl_len, header.diff_len, header.new_size
        );
        Ok(Self {
            patch,
            header,
            options,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Declared output size.
    pub fn hint_new_size(&self) -> u64 {
        self.header.new_size
    }

    /// Reconstruct into memory from a fully materialized old input.
    pub fn apply(self, old: &[u8]) -> Result<Vec<u8>, PatchError> {
        let mut out = Vec::with_capacity(self.header.new_size.min(MAX_PREALLOC) as usize);
        self.apply_streaming(Cursor::new(old), &mut out)?;
        Ok(out)
    }

    /// Reconstruct into `new`, reading `old` through repositionable reads.
    ///
    /// Output written before an error is not rolled back; callers discard it.
    pub fn apply_streaming<O, W>(self, mut old: O, mut new: W) -> Result<PatchStats, PatchError>
    where
        O: Read + Seek,
        W: Write,
    {
        let Self {
            patch,
            header,
            options,
        } = self;
        old.seek(SeekFrom::Start(0))?;
        let segments = demux::demultiplex(patch, &header)?;
        let stats = reconstruct(&header, segments, &mut old, &mut new, &options)?;
        new.flush()?;
        Ok(stats)
    }
}

// ---------------------------------------------------------------------------
// Convenience functions
// ---------------------------------------------------------------------------

/// Apply `patch` to an in-memory `old`, returning the new bytes.
pub fn apply<P: Read>(old: &[u8], patch: P) -> Result<Vec<u8>, PatchError> {
    Patcher::new(patch)?.apply(old)
}

/// Apply `patch` to a seekable `old`, writing the new bytes to `new`.
pub fn apply_streaming<O, W, P>(old: O, new: W, patch: P) -> Result<PatchStats, PatchError>
where
    O: Read + Seek,
    W: Write,
    P: Read,
{
    Patcher::new(patch)?.apply_streaming(old, new)
}

/// Apply `patch` to a non-seekable `old` by reading it fully into memory
/// first.
pub fn apply_reader<O, W, P>(mut old: O, new: W, patch: P) -> Result<PatchStats, PatchError>
where
    O: Read,
    W: Write,
    P: Read,
{
    let mut buf = Vec::new();
    old.read_to_end(&mut buf)?;
    apply_streaming(Cursor::new(buf), new, patch)
}

// ---------------------------------------------------------------------------
// Reconstruction loop
// ---------------------------------------------------------------------------

fn reconstruct<P, O, W>(
    header: &Header,
    segments: Segments<P>,
    old: &mut O,
    new: &mut W,
    options: &PatchOptions,
) -> Result<PatchStats, PatchError>
where
    P: Read,
    O: Read + Seek,
    W: Write,
{
    let Segments {
        mut control,
        mut diff,
        mut extra,
    } = segments;
    let new_size = header.new_size;

    let chunk = (options.buffer_size.max(1) as u64).min(new_size.max(1)) as usize;
    let mut buf = vec![0u8; chunk];
    let mut scratch = Vec::new();

    let mut stats = PatchStats::default();
    let mut oldpos: i64 = 0;
    let mut newpos: u64 = 0;

    while newpos < new_size {
        let ctrl = match control.read_control()? {
            ControlRead::Control(c) => c,
            ControlRead::End => return Err(truncated_control(newpos, new_size, 0)),
            ControlRead::Partial(actual) => {
                return Err(truncated_control(newpos, new_size, actual));
            }
        };
        trace!(
            "control {}: add {} copy {} seek {} (oldpos {oldpos}, newpos {newpos})",
            control.decoded(),
            ctrl.add,
            ctrl.copy,
            ctrl.seek
        );

        // Diff + old -> new.
        if ctrl.add > 0 {
            let add = ctrl.add as u64;
            check_bounds(newpos, add, new_size)?;
            let mut sum = ByteSumCombiner::new(&mut diff, &mut *old, &mut scratch, newpos);
            let mut remaining = add;
            while remaining > 0 {
                let n = remaining.min(chunk as u64) as usize;
                sum.read(&mut buf[..n])?;
                new.write_all(&buf[..n])?;
                remaining -= n as u64;
            }
            newpos += add;
            oldpos = oldpos
                .checked_add(ctrl.add)
                .ok_or(Corruption::PositionOverflow)?;
            stats.add_bytes += add;
        }

        // Extra -> new.
        if ctrl.copy > 0 {
            let copy = ctrl.copy as u64;
            check_bounds(newpos, copy, new_size)?;
            let mut remaining = copy;
            while remaining > 0 {
                let n = remaining.min(chunk as u64) as usize;
                let got = read_full(&mut extra, &mut buf[..n])
                    .map_err(|e| PatchError::from_segment(Segment::Extra, e))?;
                if got != n {
                    return Err(Corruption::ShortRead {
                        from: ByteSource::Segment(Segment::Extra),
                        offset: newpos + (copy - remaining),
                        expected: n as u64,
                        actual: got as u64,
                    }
                    .into());
                }
                new.write_all(&buf[..n])?;
                remaining -= n as u64;
            }
            newpos += copy;
            stats.copy_bytes += copy;
        }

        // The old reader sits at `oldpos` after an exact add, so a relative
        // move lands on the new position. Targets past EOF fail on read.
        if ctrl.seek != 0 {
            oldpos = oldpos
                .checked_add(ctrl.seek)
                .ok_or(Corruption::PositionOverflow)?;
            if oldpos < 0 {
                return Err(Corruption::BadSeek { oldpos }.into());
            }
            old.seek_relative(ctrl.seek)
                .map_err(|_| Corruption::BadSeek { oldpos })?;
        }
    }

    stats.new_size = newpos;
    stats.controls = control.decoded();
    debug!(
        "reconstructed {} bytes from {} controls ({} add, {} copy)",
        stats.new_size, stats.controls, stats.add_bytes, stats.copy_bytes
    );
    Ok(stats)
}

fn check_bounds(newpos: u64, len: u64, new_size: u64) -> Result<(), Corruption> {
    match newpos.checked_add(len) {
        Some(end) if end <= new_size => Ok(()),
        _ => Err(Corruption::Overrun {
            newpos,
            len,
            new_size,
        }),
    }
}

fn truncated_control(newpos: u64, new_size: u64, actual: usize) -> PatchError {
    Corruption::TruncatedControl {
        newpos,
        new_size,
        actual,
    }
    .into()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
