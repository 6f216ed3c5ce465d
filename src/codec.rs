//! Pixel work for crop operations: decode → orient → crop → re-encode.
//!
//! The [`Cropper`] trait is the only seam between the batch executor and an
//! image codec. The executor hands over the source file's bytes and a
//! fractional rectangle and gets JPEG bytes back; it never touches pixels.
//!
//! The production implementation is [`ImageCropper`], built on the `image`
//! crate:
//!
//! | Step | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG) | `image::ImageReader` with format sniffing |
//! | Orientation | `ImageDecoder::orientation` + `DynamicImage::apply_orientation` |
//! | Crop | `DynamicImage::crop_imm` on the clipped pixel rectangle |
//! | Encode | `image::codecs::jpeg::JpegEncoder`, quality 90 by default |
//!
//! Orientation is applied before the rectangle is interpreted, so fractions
//! refer to the image as the operator saw it in the browser.

use crate::crop::CropRect;
use image::codecs::jpeg::JpegEncoder;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader};
use std::io::Cursor;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("invalid crop dimensions: {0}")]
    InvalidCropDimensions(String),
    #[error("crop rectangle is outside image bounds")]
    CropOutOfBounds,
    #[error("failed to decode image: {0}")]
    Decode(String),
    #[error("failed to encode image: {0}")]
    Encode(String),
}

/// JPEG encoding quality (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u8);

impl Quality {
    pub fn new(value: u8) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Crops encoded images.
///
/// Implementations must be `Sync`: the executor calls one cropper from every
/// worker thread at once.
pub trait Cropper: Sync {
    /// Crop the encoded image in `source` to `rect` and return JPEG bytes.
    fn crop(&self, source: &[u8], rect: &CropRect) -> Result<Vec<u8>, CodecError>;
}

/// [`Cropper`] backed by the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCropper {
    quality: Quality,
}

impl ImageCropper {
    pub fn new(quality: Quality) -> Self {
        Self { quality }
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }
}

/// Pixel rectangle after clipping to the image bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PixelRect {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

/// Convert a fractional rectangle to pixels and clip it to `width`×`height`.
///
/// Fractions are truncated toward zero, matching how the UI rounds its
/// selection handles.
fn pixel_rect(rect: &CropRect, width: u32, height: u32) -> Result<PixelRect, CodecError> {
    let (w, h) = (f64::from(width), f64::from(height));
    let x = (rect.x * w) as i64;
    let y = (rect.y * h) as i64;
    let cw = (rect.w * w) as i64;
    let ch = (rect.h * h) as i64;

    if cw <= 0 || ch <= 0 {
        return Err(CodecError::InvalidCropDimensions(format!(
            "width={cw}, height={ch}"
        )));
    }

    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = x.saturating_add(cw).min(i64::from(width));
    let y1 = y.saturating_add(ch).min(i64::from(height));
    if x1 <= x0 || y1 <= y0 {
        return Err(CodecError::CropOutOfBounds);
    }

    Ok(PixelRect {
        x: x0 as u32,
        y: y0 as u32,
        width: (x1 - x0) as u32,
        height: (y1 - y0) as u32,
    })
}

/// Decode `source` and apply its EXIF orientation.
fn decode_oriented(source: &[u8]) -> Result<DynamicImage, CodecError> {
    let decode_err = |e: image::ImageError| CodecError::Decode(e.to_string());

    let mut decoder = ImageReader::new(Cursor::new(source))
        .with_guessed_format()
        .map_err(|e| CodecError::Decode(e.to_string()))?
        .into_decoder()
        .map_err(decode_err)?;
    let orientation = decoder
        .orientation()
        .unwrap_or(Orientation::NoTransforms);
    let mut img = DynamicImage::from_decoder(decoder).map_err(decode_err)?;
    img.apply_orientation(orientation);
    Ok(img)
}

impl Cropper for ImageCropper {
    fn crop(&self, source: &[u8], rect: &CropRect) -> Result<Vec<u8>, CodecError> {
        rect.validate()
            .map_err(|e| CodecError::InvalidCropDimensions(e.0))?;
        let img = decode_oriented(source)?;
        let px = pixel_rect(rect, img.width(), img.height())?;
        let cropped = img.crop_imm(px.x, px.y, px.width, px.height);

        // JPEG has no alpha channel; flatten everything to RGB8 first
        let rgb = DynamicImage::ImageRgb8(cropped.to_rgb8());
        let mut out = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut out, self.quality.value());
        rgb.write_with_encoder(encoder)
            .map_err(|e| CodecError::Encode(e.to_string()))?;
        Ok(out)
    }
}
