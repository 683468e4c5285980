// Patch writer.
//
// Assembles a BSDIFF40 patch from triplets and their segment bytes. There
// is no match finding here: callers decide what to add, copy and seek.

use std::io::{self, Write};

use log::debug;

use crate::codec;
use crate::format::{Control, Header};

/// Segment compression settings.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// bzip2 level (1-9).
    pub level: u32,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            level: codec::DEFAULT_LEVEL,
        }
    }
}

/// Accumulates triplets plus diff and extra bytes, then writes the patch.
#[derive(Debug, Clone, Default)]
pub struct PatchBuilder {
    controls: Vec<Control>,
    diff: Vec<u8>,
    extra: Vec<u8>,
    new_size: u64,
    declared_size: Option<u64>,
}

impl PatchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one triplet: add `diff.len()` bytes (diff summed with old),
    /// copy `extra` verbatim, then move the old cursor by `seek`.
    pub fn push(&mut self, diff: &[u8], extra: &[u8], seek: i64) -> &mut Self {
        self.controls
            .push(Control::new(diff.len() as i64, extra.len() as i64, seek));
        self.diff.extend_from_slice(diff);
        self.extra.extend_from_slice(extra);
        self.new_size += (diff.len() + extra.len()) as u64;
        self
    }

    /// Record a raw triplet with no segment bytes and no effect on the
    /// computed output size.
    pub fn push_control(&mut self, control: Control) -> &mut Self {
        self.controls.push(control);
        self
    }

    /// Append raw bytes to the diff segment.
    pub fn append_diff(&mut self, bytes: &[u8]) -> &mut Self {
        self.diff.extend_from_slice(bytes);
        self
    }

    /// Append raw bytes to the extra segment.
    pub fn append_extra(&mut self, bytes: &[u8]) -> &mut Self {
        self.extra.extend_from_slice(bytes);
        self
    }

    /// Declare an output size other than the one implied by `push` calls.
    pub fn with_new_size(&mut self, new_size: u64) -> &mut Self {
        self.declared_size = Some(new_size);
        self
    }

    /// Output size written to the header.
    pub fn new_size(&self) -> u64 {
        self.declared_size.unwrap_or(self.new_size)
    }

    /// Write the complete patch. Returns the number of bytes written.
    pub fn finish<W: Write>(&self, w: &mut W, opts: &BuildOptions) -> io::Result<u64> {
        let mut raw_controls = Vec::with_capacity(self.controls.len() * crate::format::CONTROL_LEN);
        for c in &self.controls {
            c.encode(&mut raw_controls)?;
        }

        let ctrl = codec::compress(&raw_controls, opts.level)?;
        let diff = codec::compress(&self.diff, opts.level)?;
        let extra = codec::compress(&self.extra, opts.level)?;

        let header = Header {
            ctrl_len: ctrl.len() as u64,
            diff_len: diff.len() as u64,
            new_size: self.new_size(),
        };
        header.encode(w)?;
        w.write_all(&ctrl)?;
        w.write_all(&diff)?;
        w.write_all(&extra)?;

        let total = (crate::format::HEADER_LEN + ctrl.len() + diff.len() + extra.len()) as u64;
        debug!(
            "wrote patch: {} controls, new size {}, {total} bytes",
            self.controls.len(),
            header.new_size
        );
        Ok(total)
    }

    /// Write the patch into a fresh buffer.
    pub fn to_vec(&self, opts: &BuildOptions) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        self.finish(&mut out, opts)?;
        Ok(out)
    }
}

/// Per-byte deltas that turn `old` into `new` under wrapping addition.
///
/// Only the common prefix length is covered.
pub fn delta_bytes(old: &[u8], new: &[u8]) -> Vec<u8> {
    new.iter()
        .zip(old)
        .map(|(n, o)| n.wrapping_sub(*o))
        .collect()
}
