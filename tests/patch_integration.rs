use bsdelta::error::{ByteSource, Segment};
use bsdelta::format::{BSDIFF_MAGIC, Control, HEADER_LEN, Header, signmag};
use bsdelta::patch::builder::delta_bytes;
use bsdelta::patch::{BuildOptions, PatchBuilder, PatchOptions, Patcher, apply_reader};
use bsdelta::{Corruption, PatchError, apply, apply_streaming};
use std::io::Cursor;

fn build(b: &PatchBuilder) -> Vec<u8> {
    b.to_vec(&BuildOptions::default()).unwrap()
}

fn apply_both(old: &[u8], patch: &[u8]) -> Result<Vec<u8>, PatchError> {
    let whole = apply(old, patch);
    let mut streamed = Vec::new();
    let stream = apply_streaming(Cursor::new(old), &mut streamed, patch);
    match (&whole, &stream) {
        (Ok(w), Ok(stats)) => {
            assert_eq!(w, &streamed);
            assert_eq!(stats.new_size, w.len() as u64);
        }
        (Err(a), Err(b)) => assert_eq!(a.to_string(), b.to_string()),
        _ => panic!("modes disagree: {whole:?} vs {stream:?}"),
    }
    whole
}

/// A hand-made patch: reorder two halves of the old file and insert a
/// separator, using a backwards seek.
#[test]
fn reorder_halves_with_backward_seek() {
    let old = b"AAAAABBBBB";
    let mut b = PatchBuilder::new();
    // Skip to the B half.
    b.push_control(Control::new(0, 0, 5));
    // Take BBBBB, add "-", then jump back to the start.
    b.push(&[0; 5], b"-", -10);
    // Take AAAAA.
    b.push(&[0; 5], b"", 0);
    assert_eq!(apply_both(old, &build(&b)).unwrap(), b"BBBBB-AAAAA");
}

#[test]
fn negative_seek_rereads_old_bytes() {
    let old = b"0123456789";
    let mut b = PatchBuilder::new();
    b.push(&[0; 10], b"", -5).push(&[0; 5], b"", 0);
    assert_eq!(apply_both(old, &build(&b)).unwrap(), b"012345678956789");
}

#[test]
fn many_small_triplets_match_delta() {
    let old: Vec<u8> = (0..4000u32).map(|i| (i * 7 % 251) as u8).collect();
    let mut new = old.clone();
    for i in (0..new.len()).step_by(97) {
        new[i] ^= 0x5A;
    }

    // One triplet per 100 output bytes: 90 add, 10 copied verbatim, skip 10 old.
    let mut b = PatchBuilder::new();
    for start in (0..new.len()).step_by(100) {
        let add_end = (start + 90).min(new.len());
        let copy_end = (start + 100).min(new.len());
        b.push(
            &delta_bytes(&old[start..add_end], &new[start..add_end]),
            &new[add_end..copy_end],
            (copy_end - add_end) as i64,
        );
    }
    let patch = build(&b);
    assert_eq!(apply_both(&old, &patch).unwrap(), new);

    let mut out = Vec::new();
    let stats = apply_streaming(Cursor::new(&old), &mut out, patch.as_slice()).unwrap();
    assert_eq!(stats.controls, 40);
    assert_eq!(stats.add_bytes, 3600);
    assert_eq!(stats.copy_bytes, 400);
}

#[test]
fn small_buffer_size_gives_same_output() {
    let old: Vec<u8> = (0..10_000u32).map(|i| (i % 256) as u8).collect();
    let new: Vec<u8> = old.iter().map(|b| b.wrapping_add(3)).collect();
    let mut b = PatchBuilder::new();
    b.push(&delta_bytes(&old, &new), b"trailer", 0);
    let patch = build(&b);

    let mut out = Vec::new();
    Patcher::with_options(patch.as_slice(), PatchOptions { buffer_size: 7 })
        .unwrap()
        .apply_streaming(Cursor::new(&old), &mut out)
        .unwrap();
    assert_eq!(&out[..old.len()], &new[..]);
    assert_eq!(&out[old.len()..], b"trailer");
}

#[test]
fn patcher_exposes_header_before_applying() {
    let mut b = PatchBuilder::new();
    b.push(&[1, 1, 1], b"xyz", 0);
    let patch = build(&b);

    let patcher = Patcher::new(patch.as_slice()).unwrap();
    assert_eq!(patcher.header().new_size, 6);
    assert_eq!(patcher.hint_new_size(), 6);
    assert_eq!(patcher.apply(b"abc").unwrap(), b"bcdxyz");
}

#[test]
fn apply_reader_accepts_non_seekable_old() {
    let mut b = PatchBuilder::new();
    b.push(&[0; 4], b"!", 0);
    let patch = build(&b);

    // `&[u8]` is Read but not Seek.
    let old: &[u8] = b"rust";
    let mut out = Vec::new();
    apply_reader(old, &mut out, patch.as_slice()).unwrap();
    assert_eq!(out, b"rust!");
}

#[test]
fn truncated_diff_segment_is_corrupt() {
    let mut b = PatchBuilder::new();
    b.push(&[0; 8], b"", 0);
    let mut patch = build(&b);
    let header = Header::parse(&patch).unwrap();

    // Keep the header, control segment and half the diff segment.
    let cut = HEADER_LEN + header.ctrl_len as usize + header.diff_len as usize / 2;
    patch.truncate(cut);
    let err = apply_both(b"01234567", &patch).unwrap_err();
    assert!(matches!(
        err.corruption(),
        Some(Corruption::TruncatedSegment {
            segment: Segment::Diff,
            ..
        })
    ));
}

#[test]
fn old_file_shorter_than_add_is_corrupt() {
    let mut b = PatchBuilder::new();
    b.push(&[0; 8], b"", 0);
    let err = apply_both(b"0123", &build(&b)).unwrap_err();
    assert!(matches!(
        err.corruption(),
        Some(Corruption::ShortRead {
            from: ByteSource::Old,
            expected: 8,
            actual: 4,
            ..
        })
    ));
}

#[test]
fn seek_past_end_fails_only_when_read() {
    let old = b"0123456789";

    // Seeking past EOF with nothing left to add is fine.
    let mut b = PatchBuilder::new();
    b.push(&[0; 2], b"", 100).push(&[], b"end", 0);
    assert_eq!(apply_both(old, &build(&b)).unwrap(), b"01end");

    // Reading after it is not.
    let mut b = PatchBuilder::new();
    b.push(&[0; 2], b"", 100).push(&[0; 1], b"", 0);
    let err = apply_both(old, &build(&b)).unwrap_err();
    assert!(matches!(
        err.corruption(),
        Some(Corruption::ShortRead {
            from: ByteSource::Old,
            actual: 0,
            ..
        })
    ));
}

#[test]
fn seek_before_start_is_rejected() {
    let mut b = PatchBuilder::new();
    b.push(&[0; 3], b"", -4).push(&[0; 1], b"", 0);
    let err = apply_both(b"abcdef", &build(&b)).unwrap_err();
    assert!(matches!(
        err.corruption(),
        Some(Corruption::BadSeek { oldpos: -1 })
    ));
}

#[test]
fn header_bytes_are_sign_magnitude() {
    let mut b = PatchBuilder::new();
    b.push(&[], b"hi", 0);
    let patch = build(&b);
    assert_eq!(&patch[..8], &BSDIFF_MAGIC);
    assert_eq!(signmag::read_i64(&patch[24..32]), Some(2));

    // Flip the sign bit of new_size: a negative length must be rejected.
    let mut forged = patch.clone();
    forged[31] |= 0x80;
    let err = apply_both(b"", &forged).unwrap_err();
    assert!(matches!(
        err.corruption(),
        Some(Corruption::NegativeField {
            field: "new size",
            value: -2
        })
    ));
}

#[test]
fn corrupt_errors_convert_to_invalid_data() {
    let err = apply(b"", &b"BSDIFF4"[..]).unwrap_err();
    assert!(err.is_corrupt());
    let io_err: std::io::Error = err.into();
    assert_eq!(io_err.kind(), std::io::ErrorKind::InvalidData);
}

#[test]
fn garbage_segments_are_decompress_errors() {
    let mut patch = Vec::new();
    Header {
        ctrl_len: 4,
        diff_len: 4,
        new_size: 1,
    }
    .encode(&mut patch)
    .unwrap();
    patch.extend_from_slice(b"junkjunkjunk");
    let err = apply_both(b"x", &patch).unwrap_err();
    assert!(matches!(
        err.corruption(),
        Some(Corruption::Decompress {
            segment: Segment::Control,
            ..
        })
    ));
}

/// Patch written with Python's `bz2` module and a hand-rolled sign-magnitude
/// encoder, not with `PatchBuilder`: three triplets, wrapping deltas, a
/// literal insert and a backward seek.
#[test]
fn applies_externally_built_patch() {
    let old = include_bytes!("fixtures/golden.old");
    let new = include_bytes!("fixtures/golden.new");
    let patch = include_bytes!("fixtures/golden.bsdiff");

    let header = Header::parse(patch).unwrap();
    assert_eq!(header.new_size, new.len() as u64);

    assert_eq!(apply_both(old, patch).unwrap(), new);

    let mut out = Vec::new();
    let stats = apply_streaming(Cursor::new(old), &mut out, &patch[..]).unwrap();
    assert_eq!(stats.controls, 3);
    assert_eq!(stats.add_bytes, 1300);
    assert_eq!(stats.copy_bytes, 34);
}
