//! Caption band under the code.
//!
//! The band height only depends on the image width, the text, the font and the padding,
//! so a batch of codes with the same inputs always gets the same geometry.

use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};
use rusttype::{point, Font, Scale};

/// Largest padding accepted from settings.
pub const MAX_CAPTION_PADDING: u32 = 1000;

/// Layout parameters for [`render_caption`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptionStyle {
    /// Fixed font size in pixels; `None` derives it from the image width.
    pub font_size: Option<f32>,
    pub min_font_size: f32,
    pub width_divisor: f32,
    pub padding: u32,
    /// Extra pixels between lines.
    pub line_gap: u32,
    pub color: Rgba<u8>,
    pub background: Rgba<u8>,
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            font_size: None,
            min_font_size: 24.0,
            width_divisor: 20.0,
            padding: 20,
            line_gap: 8,
            color: Rgba([0, 0, 0, 255]),
            background: Rgba([255, 255, 255, 255]),
        }
    }
}

impl CaptionStyle {
    /// `max(min_font_size, width / width_divisor)`, or the fixed size when set.
    pub fn base_font_size(&self, width: u32) -> f32 {
        self.font_size
            .unwrap_or_else(|| (width as f32 / self.width_divisor).max(self.min_font_size))
    }
}

/// Loads the first readable TrueType/OpenType font among `candidates`.
pub fn load_first_font(candidates: &[PathBuf]) -> Option<Font<'static>> {
    candidates.iter().find_map(|path| load_font(path))
}

fn load_font(path: &Path) -> Option<Font<'static>> {
    let bytes = std::fs::read(path).ok()?;
    let font = Font::try_from_vec(bytes);
    if font.is_none() {
        tracing::warn!(path = %path.display(), "not a usable font file");
    }
    font
}

/// Measured caption block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptionLayout {
    pub font_size: f32,
    pub line_height: u32,
    /// Total text block height (all lines and gaps).
    pub text_height: u32,
    /// Pixels appended under the image: `text_height + 2 * padding`.
    pub band_height: u32,
}

// Without a font, widths are estimated at 0.6 em per character.
fn line_width(font: Option<&Font<'static>>, size: f32, text: &str) -> f32 {
    match font {
        Some(font) => {
            let scale = Scale::uniform(size);
            font.layout(text, scale, point(0.0, 0.0))
                .last()
                .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
                .unwrap_or(0.0)
        }
        None => text.chars().count() as f32 * size * 0.6,
    }
}

fn line_height(font: Option<&Font<'static>>, size: f32) -> u32 {
    match font {
        Some(font) => {
            let v = font.v_metrics(Scale::uniform(size));
            (v.ascent - v.descent).ceil() as u32
        }
        None => size.ceil() as u32,
    }
}

/// Chooses the font size and band height for `lines` under an image `width` pixels wide.
///
/// The size starts at [`CaptionStyle::base_font_size`] and shrinks proportionally when the
/// widest line would not fit inside `width - 2 * padding`.
pub fn layout_caption(
    width: u32,
    lines: &[&str],
    font: Option<&Font<'static>>,
    style: &CaptionStyle,
) -> CaptionLayout {
    let mut size = style.base_font_size(width);
    let margins = style.padding.saturating_mul(2);
    let available = width.saturating_sub(margins).max(1) as f32;
    let widest = lines
        .iter()
        .map(|line| line_width(font, size, line))
        .fold(0.0f32, f32::max);
    if widest > available {
        size = (size * available / widest).floor().max(1.0);
    }
    let line_height = line_height(font, size);
    let count = lines.len() as u32;
    let text_height = line_height
        .saturating_mul(count)
        .saturating_add(style.line_gap.saturating_mul(count.saturating_sub(1)));
    CaptionLayout {
        font_size: size,
        line_height,
        text_height,
        band_height: text_height.saturating_add(margins),
    }
}

/// Caption stage: returns `image` extended downward with the centered caption lines.
///
/// Blank captions return the image unchanged. Without a font the band is still reserved
/// so geometry stays identical, but no glyphs are drawn.
pub fn render_caption(
    image: &RgbaImage,
    caption: &str,
    font: Option<&Font<'static>>,
    style: &CaptionStyle,
) -> RgbaImage {
    let lines: Vec<&str> = caption
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    if lines.is_empty() {
        return image.clone();
    }

    let layout = layout_caption(image.width(), &lines, font, style);
    let mut out = RgbaImage::from_pixel(
        image.width(),
        image.height().saturating_add(layout.band_height),
        style.background,
    );
    image::imageops::replace(&mut out, image, 0, 0);

    let Some(font) = font else {
        tracing::warn!("no caption font available, leaving caption band blank");
        return out;
    };

    let scale = Scale::uniform(layout.font_size);
    let ascent = font.v_metrics(scale).ascent;
    let mut top = image.height().saturating_add(style.padding);
    for line in lines {
        let width = line_width(Some(font), layout.font_size, line);
        let left = ((image.width() as f32 - width) / 2.0).max(0.0);
        draw_line(&mut out, font, scale, left, top as f32 + ascent, style.color, line);
        top = top.saturating_add(layout.line_height + style.line_gap);
    }
    out
}

fn draw_line(
    img: &mut RgbaImage,
    font: &Font<'static>,
    scale: Scale,
    x: f32,
    baseline: f32,
    color: Rgba<u8>,
    text: &str,
) {
    for glyph in font.layout(text, scale, point(x, baseline)) {
        let Some(bb) = glyph.pixel_bounding_box() else {
            continue;
        };
        glyph.draw(|gx, gy, v| {
            let px = gx as i32 + bb.min.x;
            let py = gy as i32 + bb.min.y;
            if px < 0 || py < 0 || px as u32 >= img.width() || py as u32 >= img.height() {
                return;
            }
            let a = v.clamp(0.0, 1.0);
            if a == 0.0 {
                return;
            }
            let dst = img.get_pixel_mut(px as u32, py as u32);
            let inv = 1.0 - a;
            for c in 0..3 {
                dst.0[c] = (color.0[c] as f32 * a + dst.0[c] as f32 * inv).round() as u8;
            }
            dst.0[3] = 255;
        });
    }
}
