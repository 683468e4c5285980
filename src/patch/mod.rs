// Patch application pipeline.
//
// - `demux`  : Splits the post-header bytes into control/diff/extra decompressors
// - `combine`: ByteSumCombiner: diff + old, wrapping per byte
// - `engine` : Patcher and the reconstruction loop (whole-buffer and streaming)
// - `builder`: PatchBuilder: writes conforming patches from explicit triplets

pub mod builder;
pub mod combine;
pub mod demux;
pub mod engine;

pub use builder::{BuildOptions, PatchBuilder};
pub use combine::ByteSumCombiner;
pub use engine::{PatchOptions, PatchStats, Patcher, apply, apply_reader, apply_streaming};
