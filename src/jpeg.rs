//! Minimal JPEG segment scanner.
//!
//! Reads frame dimensions straight from the compressed byte stream without
//! decoding any pixels. The scanner walks the stream marker by marker:
//!
//! ```text
//! FF D8                      Start-Of-Image (must be first)
//! FF E0 <len:u16> <payload>  APPn / DQT / DHT / ... → skipped by seeking
//! FF FF FF C0                fill bytes before a marker are tolerated
//! FF C0 <len:u16> <payload>  Start-Of-Frame → dimensions, stop here
//! ```
//!
//! SOF payload layout (big-endian):
//!   Byte 0:    Sample precision
//!   Bytes 1-2: Frame height
//!   Bytes 3-4: Frame width
//!
//! Only baseline, extended sequential, progressive and lossless Huffman frames
//! (`C0`–`C3`) are recognised. Scanning short-circuits on the first match.
//!
//! Input is untrusted: every length is checked before it is used, so corrupt or
//! truncated files fail with an error instead of reading out of bounds.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufReader, ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;
use thiserror::Error;

const MARKER_PREFIX: u8 = 0xFF;
const SOI: [u8; 2] = [0xFF, 0xD8];
const SOF_MARKERS: std::ops::RangeInclusive<u8> = 0xC0..=0xC3;

/// Bytes of SOF payload needed to reach the end of the width field.
const SOF_MIN_PAYLOAD: usize = 5;

#[derive(Error, Debug)]
pub enum JpegError {
    #[error("not a JPEG file (missing SOI marker)")]
    NotAJpeg,
    #[error("malformed JPEG stream: {0}")]
    MalformedStream(String),
    #[error("no start-of-frame marker found")]
    NoFrameMarker,
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Pixel dimensions of a JPEG frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Open `path` and read its frame dimensions.
pub fn dimensions_of(path: &Path) -> Result<Dimensions, JpegError> {
    let file = File::open(path)?;
    read_dimensions(BufReader::new(file))
}

/// Read frame dimensions from a byte source positioned at the start of a file.
pub fn read_dimensions<R: Read + Seek>(mut reader: R) -> Result<Dimensions, JpegError> {
    let mut buf = [0u8; 2];
    match reader.read_exact(&mut buf) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Err(JpegError::NotAJpeg),
        Err(e) => return Err(e.into()),
    }
    if buf != SOI {
        return Err(JpegError::NotAJpeg);
    }

    loop {
        read_or(&mut reader, &mut buf, || JpegError::NoFrameMarker)?;
        if buf[0] != MARKER_PREFIX {
            return Err(JpegError::MalformedStream(format!(
                "expected marker, found byte 0x{:02X}",
                buf[0]
            )));
        }

        // Fill bytes: any number of 0xFF may precede the marker type
        while buf[1] == MARKER_PREFIX {
            read_or(&mut reader, &mut buf[1..2], || JpegError::NoFrameMarker)?;
        }
        let marker = buf[1];

        let payload_len = read_payload_len(&mut reader, marker)?;

        if SOF_MARKERS.contains(&marker) {
            if payload_len < SOF_MIN_PAYLOAD {
                return Err(JpegError::MalformedStream(format!(
                    "SOF segment too short ({payload_len} payload bytes)"
                )));
            }
            let mut segment = vec![0u8; payload_len];
            read_or(&mut reader, &mut segment, || {
                JpegError::MalformedStream(format!(
                    "truncated SOF segment (declared {payload_len} payload bytes)"
                ))
            })?;
            let height = u16::from_be_bytes([segment[1], segment[2]]);
            let width = u16::from_be_bytes([segment[3], segment[4]]);
            return Ok(Dimensions {
                width: u32::from(width),
                height: u32::from(height),
            });
        }

        reader.seek(SeekFrom::Current(payload_len as i64))?;
    }
}

/// Read the 16-bit segment length that follows a marker and return the
/// number of payload bytes it announces.
fn read_payload_len<R: Read>(reader: &mut R, marker: u8) -> Result<usize, JpegError> {
    let mut len = [0u8; 2];
    read_or(reader, &mut len, || {
        JpegError::MalformedStream(format!("truncated length for marker 0x{marker:02X}"))
    })?;
    let length = u16::from_be_bytes(len) as usize;
    length.checked_sub(2).ok_or_else(|| {
        JpegError::MalformedStream(format!(
            "segment length {length} for marker 0x{marker:02X} is below the minimum of 2"
        ))
    })
}

/// `read_exact` that maps end-of-stream to a caller-chosen error.
fn read_or<R: Read>(
    reader: &mut R,
    buf: &mut [u8],
    on_eof: impl FnOnce() -> JpegError,
) -> Result<(), JpegError> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(on_eof()),
        Err(e) => Err(JpegError::Io(e)),
    }
}
