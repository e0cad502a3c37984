//! Centered property logos.
//!
//! The logo occludes modules, so it must stay within the error correction budget: the
//! pipeline pairs any logo with level H and the overlay never exceeds
//! `size_ratio * min(width, height)` on either side.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::property::PropertyType;

/// Default logo side as a fraction of the QR side (1 / 3.7).
pub const DEFAULT_LOGO_RATIO: f32 = 0.27;
/// Beyond this, level H can no longer absorb the occlusion reliably.
pub const MAX_LOGO_RATIO: f32 = 0.35;

/// Immutable property → logo file lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogoCatalog {
    paths: BTreeMap<PropertyType, PathBuf>,
}

impl LogoCatalog {
    pub fn new(paths: BTreeMap<PropertyType, PathBuf>) -> Self {
        Self { paths }
    }

    #[must_use]
    pub fn with_logo(mut self, property: PropertyType, path: impl Into<PathBuf>) -> Self {
        self.paths.insert(property, path.into());
        self
    }

    pub fn path_for(&self, property: PropertyType) -> Option<&Path> {
        self.paths.get(&property).map(PathBuf::as_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PropertyType, &Path)> {
        self.paths.iter().map(|(p, path)| (*p, path.as_path()))
    }
}

/// Where the logo landed on the raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogoPlacement {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Why a requested logo was not drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogoWarning {
    /// The catalog has no entry for the property.
    Unmapped(PropertyType),
    /// The mapped file does not exist.
    MissingFile(PathBuf),
    /// The file exists but could not be decoded.
    Unreadable { path: PathBuf, reason: String },
}

impl fmt::Display for LogoWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogoWarning::Unmapped(property) => write!(f, "no logo configured for {property}"),
            LogoWarning::MissingFile(path) => write!(f, "logo file not found: {}", path.display()),
            LogoWarning::Unreadable { path, reason } => {
                write!(f, "logo {} could not be read: {reason}", path.display())
            }
        }
    }
}

/// Result of the logo stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogoStatus {
    NotRequested,
    Applied(LogoPlacement),
    Skipped(LogoWarning),
}

/// Largest `(w, h)` with the logo's aspect ratio that fits a `max_side` square.
pub fn fit_within(width: u32, height: u32, max_side: u32) -> (u32, u32) {
    if width == 0 || height == 0 || max_side == 0 {
        return (0, 0);
    }
    if width >= height {
        let h = (u64::from(height) * u64::from(max_side) / u64::from(width)).max(1);
        (max_side, h as u32)
    } else {
        let w = (u64::from(width) * u64::from(max_side) / u64::from(height)).max(1);
        (w as u32, max_side)
    }
}

/// Overlays `logo` at the center of `qr`, alpha-blended, fitted inside
/// `ratio * min(qr_w, qr_h)`.
pub fn overlay_logo(qr: &mut RgbaImage, logo: &RgbaImage, ratio: f32) -> Option<LogoPlacement> {
    let ratio = ratio.clamp(0.0, MAX_LOGO_RATIO);
    let max_side = (qr.width().min(qr.height()) as f32 * ratio).floor() as u32;
    let (width, height) = fit_within(logo.width(), logo.height(), max_side);
    if width == 0 || height == 0 {
        return None;
    }
    let resized = imageops::resize(logo, width, height, FilterType::Lanczos3);
    let x = (qr.width() - width) / 2;
    let y = (qr.height() - height) / 2;
    imageops::overlay(qr, &resized, i64::from(x), i64::from(y));
    Some(LogoPlacement {
        x,
        y,
        width,
        height,
    })
}

/// Logo stage: resolves the property's logo and overlays it.
///
/// Unmapped properties and missing or broken files leave `qr` untouched and come back as
/// [`LogoStatus::Skipped`]. This is a degraded result, not an error.
pub fn apply_logo(
    mut qr: RgbaImage,
    property: Option<PropertyType>,
    catalog: &LogoCatalog,
    ratio: f32,
) -> (RgbaImage, LogoStatus) {
    let Some(property) = property else {
        return (qr, LogoStatus::NotRequested);
    };
    let Some(path) = catalog.path_for(property) else {
        let warning = LogoWarning::Unmapped(property);
        tracing::warn!(%warning, "generating unbranded QR");
        return (qr, LogoStatus::Skipped(warning));
    };
    if !path.exists() {
        let warning = LogoWarning::MissingFile(path.to_path_buf());
        tracing::warn!(%warning, "generating unbranded QR");
        return (qr, LogoStatus::Skipped(warning));
    }
    let logo = match image::open(path) {
        Ok(img) => img.to_rgba8(),
        Err(err) => {
            let warning = LogoWarning::Unreadable {
                path: path.to_path_buf(),
                reason: err.to_string(),
            };
            tracing::warn!(%warning, "generating unbranded QR");
            return (qr, LogoStatus::Skipped(warning));
        }
    };
    match overlay_logo(&mut qr, &logo, ratio) {
        Some(placement) => {
            tracing::debug!(%property, ?placement, "logo applied");
            (qr, LogoStatus::Applied(placement))
        }
        None => {
            let warning = LogoWarning::Unreadable {
                path: path.to_path_buf(),
                reason: "logo has no pixels".to_string(),
            };
            tracing::warn!(%warning, "generating unbranded QR");
            (qr, LogoStatus::Skipped(warning))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn white(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba([255, 255, 255, 255]))
    }

    #[test]
    fn fit_preserves_aspect() {
        assert_eq!(fit_within(400, 200, 100), (100, 50));
        assert_eq!(fit_within(200, 400, 100), (50, 100));
        assert_eq!(fit_within(50, 50, 100), (100, 100));
        assert_eq!(fit_within(1000, 1, 10), (10, 1));
    }

    #[test]
    fn logo_box_never_exceeds_ratio() {
        let logos = [(500, 500), (900, 300), (120, 640), (3, 3)];
        let qrs = [(100, 100), (870, 870), (2000, 2000), (600, 400)];
        for (lw, lh) in logos {
            for (qw, qh) in qrs {
                let mut qr = white(qw, qh);
                let logo = RgbaImage::from_pixel(lw, lh, Rgba([200, 0, 0, 255]));
                let placed = overlay_logo(&mut qr, &logo, 0.27).unwrap();
                let limit = (qw.min(qh) as f32 * 0.27).floor() as u32;
                assert!(placed.width <= limit && placed.height <= limit, "{lw}x{lh} on {qw}x{qh}");
            }
        }
    }

    #[test]
    fn logo_is_centered() {
        let mut qr = white(1000, 1000);
        let logo = RgbaImage::from_pixel(100, 100, Rgba([0, 0, 255, 255]));
        let placed = overlay_logo(&mut qr, &logo, 0.25).unwrap();
        assert_eq!(placed, LogoPlacement { x: 375, y: 375, width: 250, height: 250 });
        assert_eq!(qr.get_pixel(500, 500), &Rgba([0, 0, 255, 255]));
        assert_eq!(qr.get_pixel(10, 10), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn transparent_logo_pixels_keep_the_qr() {
        let mut qr = white(400, 400);
        let logo = RgbaImage::from_pixel(50, 50, Rgba([0, 0, 0, 0]));
        overlay_logo(&mut qr, &logo, 0.25).unwrap();
        assert_eq!(qr.get_pixel(200, 200), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn no_property_is_a_pass_through() {
        let qr = white(50, 50);
        let (out, status) = apply_logo(qr.clone(), None, &LogoCatalog::default(), 0.27);
        assert_eq!(status, LogoStatus::NotRequested);
        assert_eq!(out, qr);
    }

    #[test]
    fn unmapped_and_missing_logos_degrade() {
        let qr = white(50, 50);
        let (out, status) = apply_logo(qr.clone(), Some(PropertyType::Vg), &LogoCatalog::default(), 0.27);
        assert_eq!(status, LogoStatus::Skipped(LogoWarning::Unmapped(PropertyType::Vg)));
        assert_eq!(out, qr);

        let catalog = LogoCatalog::default().with_logo(PropertyType::Vg, "/nonexistent/vg.png");
        let (out, status) = apply_logo(qr.clone(), Some(PropertyType::Vg), &catalog, 0.27);
        assert_eq!(
            status,
            LogoStatus::Skipped(LogoWarning::MissingFile(PathBuf::from("/nonexistent/vg.png")))
        );
        assert_eq!(out, qr);
    }

    #[test]
    fn logo_file_is_loaded_from_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vlev.png");
        RgbaImage::from_pixel(64, 32, Rgba([10, 20, 30, 255]))
            .save(&path)
            .unwrap();
        let catalog = LogoCatalog::default().with_logo(PropertyType::Vlev, &path);
        let (_, status) = apply_logo(white(400, 400), Some(PropertyType::Vlev), &catalog, 0.25);
        assert_eq!(
            status,
            LogoStatus::Applied(LogoPlacement { x: 150, y: 175, width: 100, height: 50 })
        );
    }
}
