// File-level I/O helpers for patch application.
//
// Provides `patch_file()`, which wraps the engines with buffered file I/O.
// Optionally computes a streaming SHA-256 of the output (feature-gated
// behind `file-io`). The digest is reported, never checked.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

#[cfg(feature = "file-io")]
use sha2::Digest;

use log::debug;

use crate::error::PatchError;
use crate::patch::engine::{PatchOptions, PatchStats, Patcher};

// ---------------------------------------------------------------------------
// Mode and stats
// ---------------------------------------------------------------------------

/// How the old file is accessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApplyMode {
    /// Read the old file fully into memory.
    #[default]
    WholeBuffer,
    /// Read the old file through a buffered, seekable handle.
    Streaming,
}

/// Statistics returned by `patch_file()`.
#[derive(Debug, Clone)]
pub struct PatchFileStats {
    /// Old file size in bytes.
    pub old_size: u64,
    /// Patch file size in bytes.
    pub patch_size: u64,
    /// Reconstructed output size in bytes.
    pub output_size: u64,
    /// Control triplets applied.
    pub controls: u64,
    /// SHA-256 of the reconstructed output (if `file-io` feature is enabled).
    pub output_sha256: Option<[u8; 32]>,
}

const BUF_SIZE: usize = 64 * 1024; // 64 KiB

// ---------------------------------------------------------------------------
// patch_file
// ---------------------------------------------------------------------------

/// Apply the patch at `patch_path` to `old_path`, writing `output_path`.
///
/// The patch header is validated and the old file opened before the output
/// path is touched, so a failure there leaves an existing output file as it
/// was. A failure after the output was created removes it.
pub fn patch_file(
    old_path: &Path,
    patch_path: &Path,
    output_path: &Path,
    mode: ApplyMode,
) -> Result<PatchFileStats, PatchError> {
    let patch_file = File::open(patch_path)?;
    let patch_size = patch_file.metadata()?.len();
    let patcher = Patcher::with_options(
        BufReader::with_capacity(BUF_SIZE, patch_file),
        PatchOptions {
            buffer_size: BUF_SIZE,
        },
    )?;
    let old = OldInput::open(old_path, mode)?;
    let old_size = old.size();

    let output_file = File::create(output_path)?;
    let (stats, output_sha256) = match write_output(patcher, old, output_file) {
        Ok(done) => done,
        Err(e) => {
            debug!("removing partial output {}", output_path.display());
            let _ = std::fs::remove_file(output_path);
            return Err(e);
        }
    };

    Ok(PatchFileStats {
        old_size,
        patch_size,
        output_size: stats.new_size,
        controls: stats.controls,
        output_sha256,
    })
}

fn write_output<P: Read>(
    patcher: Patcher<P>,
    old: OldInput,
    output_file: File,
) -> Result<(PatchStats, Option<[u8; 32]>), PatchError> {
    let mut output_writer = BufWriter::with_capacity(BUF_SIZE, output_file);

    #[cfg(feature = "file-io")]
    let mut output_hasher = sha2::Sha256::new();

    let stats = {
        #[cfg(feature = "file-io")]
        let mut sink = HashingWriter {
            inner: &mut output_writer,
            hasher: &mut output_hasher,
        };
        #[cfg(not(feature = "file-io"))]
        let mut sink = &mut output_writer;

        old.apply(patcher, &mut sink)?
    };

    output_writer.flush()?;

    #[cfg(feature = "file-io")]
    let output_sha256 = Some(output_hasher.finalize().into());
    #[cfg(not(feature = "file-io"))]
    let output_sha256: Option<[u8; 32]> = None;

    Ok((stats, output_sha256))
}

// ---------------------------------------------------------------------------
// Old input
// ---------------------------------------------------------------------------

/// Old file opened for the chosen `ApplyMode`.
pub(crate) enum OldInput {
    Buffer(Vec<u8>),
    File { reader: BufReader<File>, size: u64 },
}

impl OldInput {
    pub(crate) fn open(path: &Path, mode: ApplyMode) -> io::Result<Self> {
        match mode {
            ApplyMode::WholeBuffer => Ok(Self::Buffer(std::fs::read(path)?)),
            ApplyMode::Streaming => {
                let file = File::open(path)?;
                let size = file.metadata()?.len();
                Ok(Self::File {
                    reader: BufReader::with_capacity(BUF_SIZE, file),
                    size,
                })
            }
        }
    }

    pub(crate) fn size(&self) -> u64 {
        match self {
            Self::Buffer(old) => old.len() as u64,
            Self::File { size, .. } => *size,
        }
    }

    pub(crate) fn apply<P: Read, W: Write>(
        self,
        patcher: Patcher<P>,
        new: W,
    ) -> Result<PatchStats, PatchError> {
        match self {
            Self::Buffer(old) => patcher.apply_streaming(io::Cursor::new(old), new),
            Self::File { reader, .. } => patcher.apply_streaming(reader, new),
        }
    }
}

/// Lowercase hex rendering of a digest.
pub fn hex_digest(digest: &[u8]) -> String {
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

// ---------------------------------------------------------------------------
// Hashing writer (used with file-io feature)
// ---------------------------------------------------------------------------

#[cfg(feature = "file-io")]
struct HashingWriter<'a, W: Write> {
    inner: &'a mut W,
    hasher: &'a mut sha2::Sha256,
}

#[cfg(feature = "file-io")]
impl<W: Write> Write for HashingWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::builder::{BuildOptions, PatchBuilder, delta_bytes};

    fn sample() -> (Vec<u8>, Vec<u8>, Vec<u8>) {
        let old: Vec<u8> = (0..=255u8).cycle().take(200_000).collect();
        let mut new = old.clone();
        for i in (0..new.len()).step_by(4096) {
            new[i] = new[i].wrapping_add(1);
        }
        new.extend_from_slice(b"appended tail");

        let mut b = PatchBuilder::new();
        b.push(&delta_bytes(&old, &new), &new[old.len()..], 0);
        let patch = b.to_vec(&BuildOptions::default()).unwrap();
        (old, new, patch)
    }

    #[test]
    fn patch_file_both_modes() {
        let dir = tempfile::tempdir().unwrap();
        let (old, new, patch) = sample();
        let old_path = dir.path().join("old.bin");
        let patch_path = dir.path().join("delta.bsdiff");
        std::fs::write(&old_path, &old).unwrap();
        std::fs::write(&patch_path, &patch).unwrap();

        for (mode, name) in [
            (ApplyMode::WholeBuffer, "whole.bin"),
            (ApplyMode::Streaming, "stream.bin"),
        ] {
            let out_path = dir.path().join(name);
            let stats = patch_file(&old_path, &patch_path, &out_path, mode).unwrap();
            assert_eq!(stats.old_size, old.len() as u64);
            assert_eq!(stats.patch_size, patch.len() as u64);
            assert_eq!(stats.output_size, new.len() as u64);
            assert_eq!(stats.controls, 1);
            assert_eq!(std::fs::read(&out_path).unwrap(), new, "{mode:?}");
        }
    }

    #[cfg(feature = "file-io")]
    #[test]
    fn sha256_of_output() {
        let dir = tempfile::tempdir().unwrap();
        let (old, new, patch) = sample();
        let old_path = dir.path().join("old.bin");
        let patch_path = dir.path().join("delta.bsdiff");
        let out_path = dir.path().join("new.bin");
        std::fs::write(&old_path, &old).unwrap();
        std::fs::write(&patch_path, &patch).unwrap();

        let stats = patch_file(&old_path, &patch_path, &out_path, ApplyMode::Streaming).unwrap();
        let expected: [u8; 32] = sha2::Sha256::digest(&new).into();
        assert_eq!(stats.output_sha256, Some(expected));
    }

    #[test]
    fn corrupt_patch_file() {
        let dir = tempfile::tempdir().unwrap();
        let old_path = dir.path().join("old.bin");
        let patch_path = dir.path().join("delta.bsdiff");
        std::fs::write(&old_path, b"old").unwrap();
        std::fs::write(&patch_path, b"BSDIFF40 too short").unwrap();

        let err = patch_file(
            &old_path,
            &patch_path,
            &dir.path().join("new.bin"),
            ApplyMode::WholeBuffer,
        )
        .unwrap_err();
        assert!(err.is_corrupt());
    }

    #[test]
    fn missing_old_file_is_io() {
        let dir = tempfile::tempdir().unwrap();
        let patch_path = dir.path().join("delta.bsdiff");
        std::fs::write(&patch_path, sample().2).unwrap();

        let err = patch_file(
            &dir.path().join("absent.bin"),
            &patch_path,
            &dir.path().join("new.bin"),
            ApplyMode::Streaming,
        )
        .unwrap_err();
        assert!(matches!(err, PatchError::Io(_)));
    }

    #[test]
    fn unusable_inputs_leave_existing_output_alone() {
        let dir = tempfile::tempdir().unwrap();
        let old_path = dir.path().join("old.bin");
        let patch_path = dir.path().join("delta.bsdiff");
        let out_path = dir.path().join("new.bin");
        std::fs::write(&old_path, b"old").unwrap();
        std::fs::write(&patch_path, sample().2).unwrap();
        std::fs::write(&out_path, b"precious").unwrap();

        for mode in [ApplyMode::WholeBuffer, ApplyMode::Streaming] {
            let missing_patch = dir.path().join("absent.bsdiff");
            assert!(patch_file(&old_path, &missing_patch, &out_path, mode).is_err());
            let missing_old = dir.path().join("absent.bin");
            assert!(patch_file(&missing_old, &patch_path, &out_path, mode).is_err());
            assert_eq!(std::fs::read(&out_path).unwrap(), b"precious", "{mode:?}");
        }
    }

    #[test]
    fn failed_reconstruction_removes_output() {
        let dir = tempfile::tempdir().unwrap();
        let (old, _, patch) = sample();
        let old_path = dir.path().join("old.bin");
        let patch_path = dir.path().join("delta.bsdiff");
        let out_path = dir.path().join("new.bin");
        // Old input shorter than the add step.
        std::fs::write(&old_path, &old[..1000]).unwrap();
        std::fs::write(&patch_path, &patch).unwrap();

        let err = patch_file(&old_path, &patch_path, &out_path, ApplyMode::Streaming).unwrap_err();
        assert!(err.is_corrupt());
        assert!(!out_path.exists());
    }

    #[test]
    fn hex_rendering() {
        assert_eq!(hex_digest(&[0x00, 0xAB, 0x7f]), "00ab7f");
    }
}
