//! # pickemall
//!
//! Browse a directory of JPEGs, decide per image whether to crop it or keep
//! it as is, and apply those decisions in bulk.
//!
//! # Architecture
//!
//! Two independent paths share the same source directory:
//!
//! ```text
//! ls     photos/          →  Directory      (names, sizes, pixel dimensions)
//! apply  operations.json  →  output/        (cropped and picked copies)
//! ```
//!
//! Listing never decodes pixels: dimensions come straight from the JPEG frame
//! header, so a directory of thousands of large images lists in milliseconds.
//! Applying a batch is the only step that touches pixel data, and only for
//! crop operations.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`jpeg`] | Segment walker that reads width and height from the first SOF marker |
//! | [`crop`] | Crop rectangles, their canonical form and content-derived identifier |
//! | [`operation`] | `Crop`/`Pick` operations and decoding from JSON |
//! | [`codec`] | The [`codec::Cropper`] seam and its `image`-crate implementation |
//! | [`apply`] | Bounded-parallel batch executor with per-operation outcomes |
//! | [`listing`] | Recursive JPEG listing with optional dimensions |
//! | [`config`] | `pickemall.toml` loading and validation |
//! | [`logging`] | `tracing` subscriber setup for the binary |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Content-Addressed Crop Outputs
//!
//! A cropped file is named `<source>-<id>.jpg` where the id is derived from the
//! rectangle rounded to two decimals. Re-applying a batch overwrites the same
//! files instead of piling up copies, and two identical crops in one batch
//! converge on one output.
//!
//! ## Sources Are Never Modified
//!
//! Every operation reads from the source directory and writes into the output
//! directory. The executor refuses an output directory that resolves to the
//! source directory, and refuses filenames that would escape either root.
//!
//! ## Failure Isolation
//!
//! A batch keeps going when one operation fails. The caller gets an outcome for
//! every operation and decides what to do with the failures.

pub mod apply;
pub mod codec;
pub mod config;
pub mod crop;
pub mod jpeg;
pub mod listing;
pub mod logging;
pub mod operation;
pub mod output;

#[cfg(test)]
pub(crate) mod test_helpers;
