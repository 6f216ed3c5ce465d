//! Shared test utilities for the pickemall test suite.
//!
//! Two kinds of fixtures:
//!
//! - [`write_test_jpeg`] encodes a real JPEG with the `image` crate, for code
//!   that goes through the codec or needs a file on disk.
//! - [`SegmentStream`] assembles raw marker segments by hand, for scanner tests
//!   that need precise control over lengths and truncation.
//!
//! ```ignore
//! use crate::test_helpers::*;
//!
//! let bytes = SegmentStream::new().app0().sof(0xC0, 1200, 800).finish();
//! let dims = read_dimensions(std::io::Cursor::new(bytes)).unwrap();
//! ```

use image::{ImageEncoder, RgbImage};
use std::path::Path;

/// Write a baseline JPEG of the given size with a simple gradient.
pub fn write_test_jpeg(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new(writer)
        .write_image(
            gradient(width, height).as_raw(),
            width,
            height,
            image::ExtendedColorType::Rgb8,
        )
        .unwrap();
}

/// Encode a JPEG of the given size and return the bytes.
pub fn encode_test_jpeg(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    image::codecs::jpeg::JpegEncoder::new(&mut bytes)
        .write_image(
            gradient(width, height).as_raw(),
            width,
            height,
            image::ExtendedColorType::Rgb8,
        )
        .unwrap();
    bytes
}

/// Insert an APP1 EXIF segment carrying `orientation` right after SOI.
pub fn with_exif_orientation(jpeg: &[u8], orientation: u16) -> Vec<u8> {
    let [o_hi, o_lo] = orientation.to_be_bytes();
    let mut payload = b"Exif\0\0".to_vec();
    // Big-endian TIFF header, IFD0 at offset 8
    payload.extend_from_slice(&[b'M', b'M', 0x00, 0x2A, 0, 0, 0, 8]);
    // One entry: Orientation (0x0112), SHORT, count 1
    payload.extend_from_slice(&[0, 1, 0x01, 0x12, 0, 3, 0, 0, 0, 1, o_hi, o_lo, 0, 0]);
    // No next IFD
    payload.extend_from_slice(&[0, 0, 0, 0]);

    let length = (payload.len() + 2) as u16;
    let mut out = jpeg[..2].to_vec();
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&length.to_be_bytes());
    out.extend_from_slice(&payload);
    out.extend_from_slice(&jpeg[2..]);
    out
}

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    })
}

/// Hand-assembled JPEG marker stream, starting with SOI.
pub struct SegmentStream {
    bytes: Vec<u8>,
}

impl SegmentStream {
    pub fn new() -> Self {
        Self {
            bytes: vec![0xFF, 0xD8],
        }
    }

    /// Append a length-prefixed segment with the given payload.
    pub fn segment(mut self, marker: u8, payload: &[u8]) -> Self {
        let length = (payload.len() + 2) as u16;
        self.bytes.extend_from_slice(&[0xFF, marker]);
        self.bytes.extend_from_slice(&length.to_be_bytes());
        self.bytes.extend_from_slice(payload);
        self
    }

    /// Append a JFIF APP0 segment.
    pub fn app0(self) -> Self {
        self.segment(
            0xE0,
            &[b'J', b'F', b'I', b'F', 0, 1, 1, 0, 0, 1, 0, 1, 0, 0],
        )
    }

    /// Append a three-component frame header.
    pub fn sof(self, marker: u8, width: u16, height: u16) -> Self {
        let [h_hi, h_lo] = height.to_be_bytes();
        let [w_hi, w_lo] = width.to_be_bytes();
        self.segment(
            marker,
            &[8, h_hi, h_lo, w_hi, w_lo, 3, 1, 0x22, 0, 2, 0x11, 1, 3, 0x11, 1],
        )
    }

    /// Append EOI and return the bytes.
    pub fn finish(mut self) -> Vec<u8> {
        self.bytes.extend_from_slice(&[0xFF, 0xD9]);
        self.bytes
    }
}
