//! Raw QR rasters.
//!
//! Symbol construction is delegated to the `qrcode` crate; this module only maps modules
//! to pixels at a controlled scale, with a quiet-zone border.

use image::{GrayImage, ImageBuffer, Luma};
use qrcode::types::QrError;
use qrcode::{Color, EcLevel, QrCode};
use serde::{Deserialize, Serialize};

use crate::error::EncodeError;

/// Largest accepted pixel scale per module.
pub const MAX_SCALE: u32 = 64;

/// Largest accepted quiet-zone width, in modules.
pub const MAX_BORDER: u32 = 64;

/// The error correction level of a QR code symbol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QrCodeEcc {
    /// The QR Code can tolerate about  7% erroneous codewords.
    Low,
    /// The QR Code can tolerate about 15% erroneous codewords.
    #[default]
    Medium,
    /// The QR Code can tolerate about 25% erroneous codewords.
    Quartile,
    /// The QR Code can tolerate about 30% erroneous codewords.
    High,
}

impl QrCodeEcc {
    /// Single letter used in QR literature (L, M, Q, H).
    pub const fn letter(self) -> char {
        match self {
            QrCodeEcc::Low => 'L',
            QrCodeEcc::Medium => 'M',
            QrCodeEcc::Quartile => 'Q',
            QrCodeEcc::High => 'H',
        }
    }

    fn level(self) -> EcLevel {
        match self {
            QrCodeEcc::Low => EcLevel::L,
            QrCodeEcc::Medium => EcLevel::M,
            QrCodeEcc::Quartile => EcLevel::Q,
            QrCodeEcc::High => EcLevel::H,
        }
    }
}

/// Raster parameters for [`encode_to_buffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterOptions {
    /// Pixels per module side.
    pub scale: u32,
    /// Quiet zone width in modules.
    pub border: u32,
    pub ecc: QrCodeEcc,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            scale: 30,
            border: 4,
            ecc: QrCodeEcc::Medium,
        }
    }
}

/// Encodes `payload` into a grayscale QR raster.
///
/// Every module becomes a `scale × scale` block; the quiet zone is `border` modules wide
/// on each side, so the output side is `(modules + 2 * border) * scale` pixels.
///
/// # Arguments
///
/// * `payload` - The content to encode into the QR Code.
/// * `options` - Scale, border and error correction level.
///
/// # Errors
///
/// Returns [`EncodeError::DataTooLong`] when the payload does not fit the largest symbol
/// at the requested level. The payload is never truncated.
///
/// # Example
///
/// ```
/// use wifiqr::encoder::{encode_to_buffer, QrCodeEcc, RasterOptions};
///
/// let options = RasterOptions { scale: 1, border: 4, ecc: QrCodeEcc::Low };
/// let img = encode_to_buffer("Hello, world!", options).unwrap();
/// assert_eq!(img.dimensions(), (29, 29));
/// ```
pub fn encode_to_buffer(payload: &str, options: RasterOptions) -> Result<GrayImage, EncodeError> {
    if options.scale == 0 || options.scale > MAX_SCALE {
        return Err(EncodeError::Geometry {
            reason: format!("scale must be between 1 and {MAX_SCALE}, got {}", options.scale),
        });
    }
    if options.border > MAX_BORDER {
        return Err(EncodeError::Geometry {
            reason: format!("border must be at most {MAX_BORDER}, got {}", options.border),
        });
    }

    let qr = QrCode::with_error_correction_level(payload.as_bytes(), options.ecc.level()).map_err(
        |err| match err {
            QrError::DataTooLong => EncodeError::DataTooLong {
                len: payload.len(),
                level: options.ecc.letter(),
            },
            other => EncodeError::Symbol {
                message: other.to_string(),
            },
        },
    )?;

    let modules = qr.width() as u32;
    let colors = qr.to_colors();
    let border = options.border;
    let scale = options.scale;
    let size = border
        .checked_mul(2)
        .and_then(|quiet| quiet.checked_add(modules))
        .and_then(|side| side.checked_mul(scale))
        .ok_or_else(|| EncodeError::Geometry {
            reason: format!("{modules} modules with border {border} at scale {scale} overflow"),
        })?;
    let mut img: GrayImage = ImageBuffer::new(size, size);

    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let qr_x = (x / scale) as i64 - border as i64;
        let qr_y = (y / scale) as i64 - border as i64;
        let dark = qr_x >= 0
            && qr_y >= 0
            && (qr_x as u32) < modules
            && (qr_y as u32) < modules
            && colors[qr_y as usize * modules as usize + qr_x as usize] == Color::Dark;
        *pixel = if dark {
            Luma([0u8]) // Black
        } else {
            Luma([255u8]) // White
        };
    }

    tracing::debug!(
        modules,
        size,
        ecc = %options.ecc.letter(),
        "encoded QR raster"
    );
    Ok(img)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_image_buffer() {
        let options = RasterOptions {
            scale: 1,
            border: 4,
            ecc: QrCodeEcc::Low,
        };
        let img = encode_to_buffer("Hello, world!", options).unwrap();

        // Version 1 (21 modules) with a border of 4 on each side.
        assert_eq!(img.dimensions(), (29, 29));
    }

    #[test]
    fn scale_multiplies_every_module() {
        let small = encode_to_buffer(
            "WIFI:S:Hotel_Net;T:WPA;P:abc12345;;",
            RasterOptions {
                scale: 1,
                ..Default::default()
            },
        )
        .unwrap();
        let big = encode_to_buffer(
            "WIFI:S:Hotel_Net;T:WPA;P:abc12345;;",
            RasterOptions {
                scale: 10,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(big.width(), small.width() * 10);
        // Top-left finder pattern corner is dark, quiet zone is light.
        assert_eq!(big.get_pixel(0, 0), &Luma([255u8]));
        assert_eq!(big.get_pixel(40, 40), &Luma([0u8]));
        assert_eq!(big.get_pixel(49, 49), &Luma([0u8]));
    }

    #[test]
    fn high_ecc_needs_a_bigger_symbol() {
        let payload = "WIFI:S:Conference-Center-5G;T:WPA;P:correct horse battery staple;;";
        let low = encode_to_buffer(payload, RasterOptions { scale: 1, border: 0, ecc: QrCodeEcc::Low }).unwrap();
        let high = encode_to_buffer(payload, RasterOptions { scale: 1, border: 0, ecc: QrCodeEcc::High }).unwrap();
        assert!(high.width() > low.width());
    }

    #[test]
    fn oversized_payload_fails() {
        let payload = "x".repeat(3000);
        let err = encode_to_buffer(
            &payload,
            RasterOptions {
                scale: 1,
                border: 0,
                ecc: QrCodeEcc::High,
            },
        )
        .unwrap_err();
        assert_eq!(err, EncodeError::DataTooLong { len: 3000, level: 'H' });
    }

    #[test]
    fn zero_scale_is_rejected() {
        let err = encode_to_buffer("x", RasterOptions { scale: 0, ..Default::default() }).unwrap_err();
        assert!(matches!(err, EncodeError::Geometry { .. }));
    }

    #[test]
    fn huge_border_is_rejected() {
        let options = RasterOptions {
            scale: 30,
            border: u32::MAX / 2,
            ecc: QrCodeEcc::Medium,
        };
        let err = encode_to_buffer("WIFI:S:Lobby;T:nopass;P:;;", options).unwrap_err();
        assert!(matches!(err, EncodeError::Geometry { .. }));

        let widest = RasterOptions {
            scale: 1,
            border: MAX_BORDER,
            ecc: QrCodeEcc::Low,
        };
        let img = encode_to_buffer("Hello, world!", widest).unwrap();
        assert_eq!(img.width(), 21 + 2 * MAX_BORDER);
    }
}
