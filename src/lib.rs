//! bsdelta: bsdiff 4.x (`BSDIFF40`) patch application in Rust.
//!
//! The crate provides:
//! - The patch wire format (`format`)
//! - The bzip2 segment codec (`codec`)
//! - Whole-buffer and streaming patch engines (`patch`)
//! - File-oriented helpers (`io`)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```no_run
//! use bsdelta::patch::{self, BuildOptions, PatchBuilder};
//!
//! let old = b"hello old world";
//!
//! // Keep "hello ", then splice in literal bytes.
//! let mut builder = PatchBuilder::new();
//! builder.push(&[0; 6], b"new world", 0);
//! let bytes = builder.to_vec(&BuildOptions::default()).unwrap();
//!
//! let new = patch::apply(old, bytes.as_slice()).unwrap();
//! assert_eq!(new, b"hello new world");
//! ```

pub mod codec;
pub mod error;
pub mod format;
pub mod io;
pub mod patch;

#[cfg(feature = "cli")]
pub mod cli;

pub use error::{Corruption, PatchError};
pub use patch::{Patcher, apply, apply_streaming};
