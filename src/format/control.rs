// Control triplets and the reader that pulls them from the decompressed
// control segment.
//
// Each triplet is 24 bytes: add, copy, seek as sign-magnitude integers.

use std::io::{self, Read, Write};

use super::{read_full, signmag};
use crate::error::{PatchError, Segment};

/// Encoded length of one control triplet.
pub const CONTROL_LEN: usize = 3 * signmag::INT_LEN;

/// One reconstruction instruction.
///
/// `add` and `copy` are lengths; values arriving from the wire are not
/// trusted to be non-negative. `seek` is a signed relative move of the old
/// cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Control {
    pub add: i64,
    pub copy: i64,
    pub seek: i64,
}

impl Control {
    pub fn new(add: i64, copy: i64, seek: i64) -> Self {
        Self { add, copy, seek }
    }

    /// Decode a triplet from its 24-byte wire form.
    pub fn decode(buf: &[u8; CONTROL_LEN]) -> Self {
        let field = |i: usize| {
            let mut b = [0u8; signmag::INT_LEN];
            b.copy_from_slice(&buf[i * signmag::INT_LEN..(i + 1) * signmag::INT_LEN]);
            signmag::decode(&b)
        };
        Self {
            add: field(0),
            copy: field(1),
            seek: field(2),
        }
    }

    pub fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        signmag::write_i64(w, self.add)?;
        signmag::write_i64(w, self.copy)?;
        signmag::write_i64(w, self.seek)
    }
}

/// Result of asking the reader for the next triplet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlRead {
    Control(Control),
    /// The stream ended cleanly on a triplet boundary.
    End,
    /// The stream ended partway through a triplet.
    Partial(usize),
}

/// Lazy decoder over the decompressed control segment.
///
/// Knows nothing about the output size; the caller decides when to stop.
pub struct ControlReader<R: Read> {
    inner: R,
    decoded: u64,
}

impl<R: Read> ControlReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, decoded: 0 }
    }

    /// Decode the next triplet.
    pub fn read_control(&mut self) -> Result<ControlRead, PatchError> {
        let mut buf = [0u8; CONTROL_LEN];
        let n = read_full(&mut self.inner, &mut buf)
            .map_err(|e| PatchError::from_segment(Segment::Control, e))?;
        Ok(match n {
            0 => ControlRead::End,
            CONTROL_LEN => {
                self.decoded += 1;
                ControlRead::Control(Control::decode(&buf))
            }
            partial => ControlRead::Partial(partial),
        })
    }

    /// Number of triplets decoded so far.
    pub fn decoded(&self) -> u64 {
        self.decoded
    }
}

/// Yields triplets until the stream ends. A partial trailing triplet is an
/// error.
impl<R: Read> Iterator for ControlReader<R> {
    type Item = Result<Control, PatchError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_control() {
            Ok(ControlRead::Control(c)) => Some(Ok(c)),
            Ok(ControlRead::End) => None,
            Ok(ControlRead::Partial(actual)) => {
                let eof = io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("partial control triplet: {actual} of {CONTROL_LEN} bytes"),
                );
                Some(Err(PatchError::from_segment(Segment::Control, eof)))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
