//! Composition pipeline: encode → logo → caption → canvas, then write.
//!
//! Stages are plain functions over image values ([`crate::encoder`], [`crate::logo`],
//! [`crate::caption`], [`crate::canvas`]). [`QrPipeline`] runs them in that fixed order;
//! the caption has to be part of the composite before the canvas fit is computed.
//!
//! # Example
//!
//! ```no_run
//! use wifiqr::credential::{CredentialInput, CredentialPolicy, WifiCredential};
//! use wifiqr::pipeline::{CaptionChoice, CompositionRequest, PipelineSettings, QrPipeline};
//! use wifiqr::property::PropertyTable;
//!
//! let input = CredentialInput {
//!     ssid: "Hotel_Net".into(),
//!     password: "abc12345".into(),
//!     property: Some("VDPF".into()),
//!     ..Default::default()
//! };
//! let credential = WifiCredential::new(&input, &PropertyTable::default(), CredentialPolicy::default())?;
//! let pipeline = QrPipeline::new(PipelineSettings::default());
//! let request = CompositionRequest::new(credential, "codes").with_room("1102A");
//! let rendered = pipeline.render(&request)?;
//! println!("{}", rendered.path.display());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use image::{DynamicImage, ImageFormat, RgbImage};
use rusttype::Font;

use crate::canvas::{standardize, CanvasSpec};
use crate::caption::{render_caption, CaptionStyle};
use crate::credential::WifiCredential;
use crate::encoder::{encode_to_buffer, QrCodeEcc, RasterOptions};
use crate::error::ComposeError;
use crate::logging::redact_value;
use crate::logo::{apply_logo, LogoCatalog, LogoStatus, DEFAULT_LOGO_RATIO};

/// Timestamp embedded in output filenames.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Everything the pipeline needs besides the request itself.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub scale: u32,
    pub border: u32,
    /// Level used when no logo is overlaid. Logos always get [`QrCodeEcc::High`].
    pub plain_ecc: QrCodeEcc,
    pub logos: LogoCatalog,
    pub logo_ratio: f32,
    pub caption: CaptionStyle,
    /// Default caption template with `{ssid}` and `{password}` placeholders.
    pub caption_format: String,
    pub canvas: CanvasSpec,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            scale: 30,
            border: 4,
            plain_ecc: QrCodeEcc::Medium,
            logos: LogoCatalog::default(),
            logo_ratio: DEFAULT_LOGO_RATIO,
            caption: CaptionStyle::default(),
            caption_format: DEFAULT_CAPTION_FORMAT.to_string(),
            canvas: CanvasSpec::default(),
        }
    }
}

pub const DEFAULT_CAPTION_FORMAT: &str = "SSID: {ssid}\nPassword: {password}";

/// Caption requested for one code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CaptionChoice {
    /// Settings template filled with the credential.
    #[default]
    Default,
    Custom(String),
    None,
}

/// One code to produce.
#[derive(Debug, Clone)]
pub struct CompositionRequest {
    pub credential: WifiCredential,
    pub caption: CaptionChoice,
    pub output_dir: PathBuf,
    /// Room label used as filename prefix; `manual` when absent.
    pub room: Option<String>,
}

impl CompositionRequest {
    pub fn new(credential: WifiCredential, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            credential,
            caption: CaptionChoice::Default,
            output_dir: output_dir.into(),
            room: None,
        }
    }

    #[must_use]
    pub fn with_room(mut self, room: impl Into<String>) -> Self {
        self.room = Some(room.into());
        self
    }

    #[must_use]
    pub fn with_caption(mut self, caption: CaptionChoice) -> Self {
        self.caption = caption;
        self
    }
}

/// In-memory result of the four stages.
#[derive(Debug, Clone)]
pub struct Composition {
    pub image: RgbImage,
    pub ecc: QrCodeEcc,
    pub logo: LogoStatus,
    pub captioned: bool,
}

/// A composition written to disk.
#[derive(Debug, Clone)]
pub struct RenderedQr {
    pub path: PathBuf,
    pub composition: Composition,
}

/// Runs the composition stages with fixed settings.
pub struct QrPipeline {
    settings: PipelineSettings,
    font: Option<Font<'static>>,
}

impl QrPipeline {
    pub fn new(settings: PipelineSettings) -> Self {
        Self {
            settings,
            font: None,
        }
    }

    /// Font used to draw captions. Without one, caption bands stay blank.
    #[must_use]
    pub fn with_font(mut self, font: Option<Font<'static>>) -> Self {
        self.font = font;
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Caption text for a request, `None` when no caption is drawn.
    pub fn caption_text(&self, request: &CompositionRequest) -> Option<String> {
        match &request.caption {
            CaptionChoice::None => None,
            CaptionChoice::Custom(text) => Some(text.clone()),
            CaptionChoice::Default => {
                let cred = &request.credential;
                let text = self
                    .settings
                    .caption_format
                    .lines()
                    .filter_map(|line| fill_caption_line(line, cred.ssid(), cred.password()))
                    .collect::<Vec<_>>()
                    .join("\n");
                Some(text)
            }
        }
    }

    /// Runs the four stages in memory.
    ///
    /// # Errors
    ///
    /// Only encoding can fail ([`ComposeError::Encode`]); logo problems degrade to an
    /// unbranded code and are reported in [`Composition::logo`].
    pub fn compose(&self, request: &CompositionRequest) -> Result<Composition, ComposeError> {
        let credential = &request.credential;
        let ecc = if credential.property().is_some() {
            QrCodeEcc::High
        } else {
            self.settings.plain_ecc
        };
        let raster = encode_to_buffer(
            &credential.payload(),
            RasterOptions {
                scale: self.settings.scale,
                border: self.settings.border,
                ecc,
            },
        )?;
        let qr = DynamicImage::ImageLuma8(raster).to_rgba8();

        let (branded, logo) = apply_logo(
            qr,
            credential.property(),
            &self.settings.logos,
            self.settings.logo_ratio,
        );

        let caption = self.caption_text(request);
        let captioned = caption.as_deref().is_some_and(|c| !c.trim().is_empty());
        let composite = match caption {
            Some(text) if captioned => {
                render_caption(&branded, &text, self.font.as_ref(), &self.settings.caption)
            }
            _ => branded,
        };

        let image = standardize(&composite, &self.settings.canvas);
        Ok(Composition {
            image,
            ecc,
            logo,
            captioned,
        })
    }

    /// Composes and writes the code into `request.output_dir`.
    pub fn render(&self, request: &CompositionRequest) -> Result<RenderedQr, ComposeError> {
        self.render_at(request, Local::now())
    }

    /// [`QrPipeline::render`] with an explicit timestamp for the filename.
    pub fn render_at(
        &self,
        request: &CompositionRequest,
        now: DateTime<Local>,
    ) -> Result<RenderedQr, ComposeError> {
        let span = tracing::info_span!(
            "render",
            ssid = %request.credential.ssid(),
            password = redact_value(request.credential.password()),
            room = request.room.as_deref().unwrap_or("manual")
        );
        let _guard = span.enter();

        let composition = self.compose(request)?;
        let stem = output_stem(request, now);
        let path = write_png(&composition.image, &request.output_dir, &stem)?;
        tracing::info!(path = %path.display(), ecc = %composition.ecc.letter(), "QR code saved");
        Ok(RenderedQr { path, composition })
    }
}

/// `<room-or-manual>_<property?>_<timestamp>`, filesystem-safe.
pub fn output_stem(request: &CompositionRequest, now: DateTime<Local>) -> String {
    let room = request
        .room
        .as_deref()
        .map(sanitize)
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| "manual".to_string());
    let stamp = now.format(TIMESTAMP_FORMAT);
    match request.credential.property() {
        Some(property) => format!("{room}_{}_{stamp}", property.tag()),
        None => format!("{room}_{stamp}"),
    }
}

fn sanitize(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

const SSID_PLACEHOLDER: &str = "{ssid}";
const PASSWORD_PLACEHOLDER: &str = "{password}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TemplatePiece<'a> {
    Text(&'a str),
    Ssid,
    Password,
}

fn template_pieces(line: &str) -> Vec<TemplatePiece<'_>> {
    let mut pieces = Vec::new();
    let mut rest = line;
    while let Some(start) = rest.find('{') {
        let tail = &rest[start..];
        let (piece, len) = if tail.starts_with(SSID_PLACEHOLDER) {
            (TemplatePiece::Ssid, SSID_PLACEHOLDER.len())
        } else if tail.starts_with(PASSWORD_PLACEHOLDER) {
            (TemplatePiece::Password, PASSWORD_PLACEHOLDER.len())
        } else {
            pieces.push(TemplatePiece::Text(&rest[..=start]));
            rest = &rest[start + 1..];
            continue;
        };
        if start > 0 {
            pieces.push(TemplatePiece::Text(&rest[..start]));
        }
        pieces.push(piece);
        rest = &rest[start + len..];
    }
    if !rest.is_empty() {
        pieces.push(TemplatePiece::Text(rest));
    }
    pieces
}

fn is_caption_separator(c: char) -> bool {
    c.is_whitespace() || matches!(c, ':' | '-' | '/' | '|' | ',' | ';' | '·')
}

/// Fills one caption template line, `None` when nothing worth printing remains.
///
/// Values are inserted in a single pass, so placeholder text inside an SSID or password is
/// kept literally. With an empty password, a line whose only value is the password is
/// dropped; elsewhere the placeholder goes away together with the separator before it.
fn fill_caption_line(line: &str, ssid: &str, password: &str) -> Option<String> {
    let pieces = template_pieces(line);
    let has_ssid = pieces.contains(&TemplatePiece::Ssid);
    if password.is_empty() && !has_ssid && pieces.contains(&TemplatePiece::Password) {
        return None;
    }

    let mut out = String::with_capacity(line.len() + ssid.len() + password.len());
    // End of the last inserted value; separators before it are never trimmed.
    let mut value_end = 0;
    for piece in pieces {
        match piece {
            TemplatePiece::Text(text) => out.push_str(text),
            TemplatePiece::Ssid => {
                out.push_str(ssid);
                value_end = out.len();
            }
            TemplatePiece::Password if password.is_empty() => {
                let kept = out[value_end..].trim_end_matches(is_caption_separator).len();
                out.truncate(value_end + kept);
            }
            TemplatePiece::Password => {
                out.push_str(password);
                value_end = out.len();
            }
        }
    }
    if out.trim().is_empty() {
        None
    } else {
        Some(out)
    }
}

/// Writes `image` as `<stem>.png` in `dir`, adding `_2`, `_3`, … on collisions.
///
/// The PNG is encoded into a temporary file in `dir` and then linked into place without
/// replacing existing files, so readers never see a partial image.
pub fn write_png(image: &RgbImage, dir: &Path, stem: &str) -> Result<PathBuf, ComposeError> {
    fs::create_dir_all(dir).map_err(|source| ComposeError::OutputDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let first = dir.join(format!("{stem}.png"));
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|source| ComposeError::Write {
        path: first.clone(),
        source,
    })?;
    image
        .write_to(tmp.as_file_mut(), ImageFormat::Png)
        .map_err(|source| ComposeError::Png {
            path: first.clone(),
            source,
        })?;
    tmp.as_file()
        .sync_all()
        .map_err(|source| ComposeError::Write {
            path: first.clone(),
            source,
        })?;

    let mut attempt = 1u32;
    loop {
        let candidate = if attempt == 1 {
            first.clone()
        } else {
            dir.join(format!("{stem}_{attempt}.png"))
        };
        match tmp.persist_noclobber(&candidate) {
            Ok(_) => return Ok(candidate),
            Err(err) if err.error.kind() == ErrorKind::AlreadyExists => {
                tmp = err.file;
                attempt += 1;
            }
            Err(err) => {
                return Err(ComposeError::Write {
                    path: candidate,
                    source: err.error,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::{CredentialPolicy, Encryption};
    use crate::property::PropertyType;
    use chrono::TimeZone;

    fn credential(property: Option<PropertyType>) -> WifiCredential {
        WifiCredential::from_parts(
            "Hotel_Net",
            "abc12345",
            Encryption::Wpa2,
            false,
            property,
            CredentialPolicy::default(),
        )
        .unwrap()
    }

    fn noon() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 3, 14, 12, 0, 5).unwrap()
    }

    #[test]
    fn stem_includes_room_property_and_timestamp() {
        let request = CompositionRequest::new(credential(Some(PropertyType::Vg)), "codes")
            .with_room(" 1102 A/B ");
        assert_eq!(output_stem(&request, noon()), "1102_A_B_VG_20260314_120005");
    }

    #[test]
    fn stem_defaults_to_manual() {
        let request = CompositionRequest::new(credential(None), "codes");
        assert_eq!(output_stem(&request, noon()), "manual_20260314_120005");
    }

    #[test]
    fn default_caption_skips_empty_password() {
        let pipeline = QrPipeline::new(PipelineSettings::default());
        let open = WifiCredential::from_parts(
            "Open_Net",
            "",
            Encryption::Open,
            false,
            None,
            CredentialPolicy::default(),
        )
        .unwrap();
        let request = CompositionRequest::new(open, "codes");
        assert_eq!(pipeline.caption_text(&request).as_deref(), Some("SSID: Open_Net"));

        let request = CompositionRequest::new(credential(None), "codes");
        assert_eq!(
            pipeline.caption_text(&request).as_deref(),
            Some("SSID: Hotel_Net\nPassword: abc12345")
        );
        let request = request.with_caption(CaptionChoice::None);
        assert_eq!(pipeline.caption_text(&request), None);
    }

    #[test]
    fn single_line_caption_keeps_ssid_for_open_networks() {
        let pipeline = QrPipeline::new(PipelineSettings {
            scale: 4,
            caption_format: "{ssid}  {password}".to_string(),
            ..PipelineSettings::default()
        });
        let open = WifiCredential::from_parts(
            "Open_Net",
            "",
            Encryption::Open,
            false,
            None,
            CredentialPolicy::default(),
        )
        .unwrap();
        let request = CompositionRequest::new(open, "codes");
        assert_eq!(pipeline.caption_text(&request).as_deref(), Some("Open_Net"));
        assert!(pipeline.compose(&request).unwrap().captioned);

        let request = CompositionRequest::new(credential(None), "codes");
        assert_eq!(
            pipeline.caption_text(&request).as_deref(),
            Some("Hotel_Net  abc12345")
        );
    }

    #[test]
    fn caption_values_are_not_expanded_again() {
        let pipeline = QrPipeline::new(PipelineSettings::default());
        let tricky = WifiCredential::from_parts(
            "Net {password}",
            "abc12345",
            Encryption::Wpa2,
            false,
            None,
            CredentialPolicy::default(),
        )
        .unwrap();
        let request = CompositionRequest::new(tricky, "codes");
        assert_eq!(
            pipeline.caption_text(&request).as_deref(),
            Some("SSID: Net {password}\nPassword: abc12345")
        );
    }

    #[test]
    fn empty_password_trims_only_its_own_separator() {
        assert_eq!(
            fill_caption_line("{ssid} / {password}", "Lobby-", "").as_deref(),
            Some("Lobby-")
        );
        assert_eq!(
            fill_caption_line("Wifi {ssid}, clave: {password}", "Lobby", "").as_deref(),
            Some("Wifi Lobby, clave")
        );
        assert_eq!(fill_caption_line("Password: {password}", "Lobby", ""), None);
        assert_eq!(fill_caption_line("   ", "Lobby", "x"), None);
        assert_eq!(
            fill_caption_line("{room} {ssid}", "Lobby", "x").as_deref(),
            Some("{room} Lobby")
        );
    }

    #[test]
    fn logo_requests_use_high_ecc() {
        let pipeline = QrPipeline::new(PipelineSettings {
            scale: 4,
            ..PipelineSettings::default()
        });
        let plain = pipeline
            .compose(&CompositionRequest::new(credential(None), "codes"))
            .unwrap();
        assert_eq!(plain.ecc, QrCodeEcc::Medium);
        assert_eq!(plain.logo, LogoStatus::NotRequested);

        let branded = pipeline
            .compose(&CompositionRequest::new(credential(Some(PropertyType::Vlev)), "codes"))
            .unwrap();
        assert_eq!(branded.ecc, QrCodeEcc::High);
        assert!(matches!(branded.logo, LogoStatus::Skipped(_)));
    }

    #[test]
    fn colliding_names_get_a_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let image = RgbImage::new(4, 4);
        let first = write_png(&image, dir.path(), "1101_20260314_120005").unwrap();
        let second = write_png(&image, dir.path(), "1101_20260314_120005").unwrap();
        let third = write_png(&image, dir.path(), "1101_20260314_120005").unwrap();
        assert_eq!(first, dir.path().join("1101_20260314_120005.png"));
        assert_eq!(second, dir.path().join("1101_20260314_120005_2.png"));
        assert_eq!(third, dir.path().join("1101_20260314_120005_3.png"));
        // Only the three PNGs remain, no temporary leftovers.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 3);
    }

    #[test]
    fn output_dir_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("codes").join("torre-a");
        let path = write_png(&RgbImage::new(2, 2), &nested, "x").unwrap();
        assert!(path.exists());
        assert_eq!(image::open(&path).unwrap().width(), 2);
    }
}
