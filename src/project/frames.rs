//! Sprite-sheet frame inference from raw PNG header bytes.
//!
//! Only the first 24 bytes are read: signature (8) + IHDR length/type (8)
//! + width (4) + height (4). No image decoding happens here.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::descriptor::Direction;

/// Bytes needed to reach the IHDR width/height fields.
const HEADER_LEN: usize = 24;

const PNG_SIGNATURE: [u8; 4] = [0x89, b'P', b'N', b'G'];

/// Infer the number of frames in a sprite sheet.
///
/// Never fails: a missing file, an I/O error, a non-PNG signature, a short
/// header or a zero dimension all yield `1`.
///
/// A valid header is not clamped, so a `horizontal` sheet much taller than
/// wide rounds to `0`.
pub fn infer_frames(path: &Path, direction: Direction) -> u32 {
    let mut buf = [0u8; HEADER_LEN];
    let read = File::open(path).and_then(|mut f| read_up_to(&mut f, &mut buf));

    match read {
        Ok(n) => frames_from_header(&buf[..n], direction),
        Err(e) => {
            crate::debug!("sprites"; "failed to read {}: {}", path.display(), e);
            1
        }
    }
}

/// Compute frames from the leading bytes of an image.
pub fn frames_from_header(bytes: &[u8], direction: Direction) -> u32 {
    if bytes.len() < HEADER_LEN || bytes[..4] != PNG_SIGNATURE {
        return 1;
    }

    let width = u32::from_be_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]);
    let height = u32::from_be_bytes([bytes[20], bytes[21], bytes[22], bytes[23]]);
    if width == 0 || height == 0 {
        return 1;
    }

    let ratio = match direction {
        Direction::Vertical => f64::from(height) / f64::from(width),
        Direction::Horizontal => f64::from(width) / f64::from(height),
    };

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let frames = ratio.round() as u32;
    frames
}

/// Fill as much of `buf` as the reader provides (short files are fine).
fn read_up_to(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Build a minimal PNG header with the given dimensions.
#[cfg(test)]
pub(crate) fn png_header(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend_from_slice(&13u32.to_be_bytes());
    bytes.extend_from_slice(b"IHDR");
    bytes.extend_from_slice(&width.to_be_bytes());
    bytes.extend_from_slice(&height.to_be_bytes());
    // bit depth, color type, compression, filter, interlace
    bytes.extend_from_slice(&[8, 6, 0, 0, 0]);
    bytes
}

// ============================================================================
// Tests
// ============================================================================
