//! Fixed-size print canvas.
//!
//! Every generated code ends up on the same canvas: uniform Lanczos3 scale into the QR
//! block area, horizontally centered, never cropped.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage, RgbImage};

use crate::error::SettingsError;

/// Largest accepted canvas side in pixels.
pub const MAX_CANVAS_SIDE: u32 = 20_000;

/// Canvas geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasSpec {
    pub width: u32,
    pub height: u32,
    /// Fraction of the canvas height reserved for the code block.
    pub qr_area_fraction: f32,
    /// Distance from the top edge to the code block.
    pub top_margin: u32,
    pub background: Rgba<u8>,
}

impl Default for CanvasSpec {
    fn default() -> Self {
        Self {
            width: 825,
            height: 1100,
            qr_area_fraction: 0.7,
            top_margin: 50,
            background: Rgba([255, 255, 255, 255]),
        }
    }
}

impl CanvasSpec {
    /// Height of the box the composite is fitted into.
    pub fn area_height(&self) -> u32 {
        ((self.height as f32 * self.qr_area_fraction).round() as u32).clamp(1, self.height)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.width == 0 || self.height == 0 {
            return Err(SettingsError::Invalid {
                key: "canvas",
                reason: format!("canvas must be non-empty, got {}x{}", self.width, self.height),
            });
        }
        if self.width > MAX_CANVAS_SIDE || self.height > MAX_CANVAS_SIDE {
            return Err(SettingsError::Invalid {
                key: "canvas",
                reason: format!(
                    "sides must be at most {MAX_CANVAS_SIDE}px, got {}x{}",
                    self.width, self.height
                ),
            });
        }
        if !(self.qr_area_fraction > 0.0 && self.qr_area_fraction <= 1.0) {
            return Err(SettingsError::Invalid {
                key: "canvas.qr_area_fraction",
                reason: format!("must be in (0, 1], got {}", self.qr_area_fraction),
            });
        }
        Ok(())
    }
}

/// Size of `(width, height)` scaled uniformly to fit `(max_w, max_h)`.
pub fn fit_size(width: u32, height: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    let scale = (max_w as f64 / width as f64).min(max_h as f64 / height as f64);
    let w = ((width as f64 * scale).round() as u32).clamp(1, max_w);
    let h = ((height as f64 * scale).round() as u32).clamp(1, max_h);
    (w, h)
}

/// Standardization stage.
///
/// The output is always exactly `spec.width × spec.height`. The composite is centered
/// horizontally and placed at `top_margin`, pulled up when the block would otherwise run
/// past the bottom edge.
pub fn standardize(composite: &RgbaImage, spec: &CanvasSpec) -> RgbImage {
    let mut canvas = RgbaImage::from_pixel(spec.width, spec.height, spec.background);
    if composite.width() > 0 && composite.height() > 0 {
        let (w, h) = fit_size(
            composite.width(),
            composite.height(),
            spec.width,
            spec.area_height(),
        );
        let resized = imageops::resize(composite, w, h, FilterType::Lanczos3);
        let x = (spec.width - w) / 2;
        let y = spec.top_margin.min(spec.height - h);
        imageops::overlay(&mut canvas, &resized, i64::from(x), i64::from(y));
        tracing::debug!(w, h, x, y, "composite placed on canvas");
    }
    image::DynamicImage::ImageRgba8(canvas).to_rgb8()
}
