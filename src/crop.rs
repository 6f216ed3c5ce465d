//! Crop rectangles and their content-derived identity.
//!
//! A [`CropRect`] is expressed in fractions of the image size, so the same
//! rectangle applies to a photo regardless of its pixel dimensions or the zoom
//! level of the UI that produced it.
//!
//! ## Identity
//!
//! Output files of a crop are named after the rectangle, not after a counter:
//!
//! ```text
//! crop(x=0.10,y=0.10,w=0.50,h=0.50)  →  SHA-256  →  first 8 bytes  →  "3f2a…" (16 hex)
//! photo.jpg + id                      →  photo.jpg-3f2a….jpg
//! ```
//!
//! The canonical string keeps two decimal places, the precision of the
//! cropping UI. Rectangles that differ only below that precision share an
//! identifier, so saving the same visual crop twice overwrites one file
//! instead of producing near-duplicates.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

/// Number of digest bytes kept in a crop identifier (16 hex characters).
const ID_BYTES: usize = 8;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid crop dimensions: {0}")]
pub struct InvalidCrop(pub String);

/// Crop rectangle in fractions of the image width (`x`, `w`) and height (`y`, `h`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRect {
    /// Left edge, `0.0` to `1.0` of the image width.
    pub x: f64,
    /// Top edge, `0.0` to `1.0` of the image height.
    pub y: f64,
    /// Width, fraction of the image width.
    pub w: f64,
    /// Height, fraction of the image height.
    pub h: f64,
}

impl CropRect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Canonical two-decimal representation, the input of [`CropRect::id`].
    pub fn canonical(&self) -> String {
        format!(
            "crop(x={:.2},y={:.2},w={:.2},h={:.2})",
            self.x, self.y, self.w, self.h
        )
    }

    /// Stable 16-character lowercase hex identifier of this rectangle.
    pub fn id(&self) -> String {
        let digest = Sha256::digest(self.canonical().as_bytes());
        digest[..ID_BYTES]
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }

    /// Check that the rectangle lies within the unit square and has area.
    pub fn validate(&self) -> Result<(), InvalidCrop> {
        let fields = [("x", self.x), ("y", self.y), ("w", self.w), ("h", self.h)];
        if let Some((name, value)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(InvalidCrop(format!("{name}={value} is not a finite number")));
        }
        if let Some((name, value)) = fields.iter().find(|(_, v)| !(0.0..=1.0).contains(v)) {
            return Err(InvalidCrop(format!("{name}={value} is outside 0..1")));
        }
        if self.w <= 0.0 || self.h <= 0.0 {
            return Err(InvalidCrop(format!(
                "zero-area crop (w={}, h={})",
                self.w, self.h
            )));
        }
        Ok(())
    }
}

impl fmt::Display for CropRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

/// Output filename for a crop of `source_name`: `<source_name>-<id>.jpg`.
pub fn crop_output_name(source_name: &str, crop: &CropRect) -> String {
    format!("{}-{}.jpg", source_name, crop.id())
}
