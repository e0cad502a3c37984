//! Application settings (`settings.toml`).
//!
//! Settings live in the platform config directory:
//! - Linux: `~/.config/wifiqr/`
//! - macOS: `~/Library/Application Support/com.wifiqr.wifiqr/`
//! - Windows: `%APPDATA%/wifiqr/wifiqr/config/`
//!
//! A missing file means defaults. A file that cannot be parsed is logged and ignored.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::canvas::CanvasSpec;
use crate::caption::{CaptionStyle, MAX_CAPTION_PADDING};
use crate::credential::CredentialPolicy;
use crate::encoder::{QrCodeEcc, MAX_BORDER, MAX_SCALE};
use crate::error::SettingsError;
use crate::logo::{LogoCatalog, MAX_LOGO_RATIO};
use crate::pipeline::{PipelineSettings, DEFAULT_CAPTION_FORMAT};
use crate::property::{PropertyTable, PropertyType};

const APP_QUALIFIER: &str = "com";
const APP_ORG: &str = "wifiqr";
const APP_NAME: &str = "wifiqr";
const SETTINGS_FILENAME: &str = "settings.toml";
const STORE_FILENAME: &str = "sources.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub output_dir: PathBuf,
    /// Per-sheet settings store; defaults to `sources.json` next to `settings.toml`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_path: Option<PathBuf>,
    pub qr: QrSettings,
    pub logo: LogoSettings,
    pub caption: CaptionSettings,
    pub canvas: CanvasSettings,
    pub credentials: CredentialSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("codes"),
            store_path: None,
            qr: QrSettings::default(),
            logo: LogoSettings::default(),
            caption: CaptionSettings::default(),
            canvas: CanvasSettings::default(),
            credentials: CredentialSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QrSettings {
    pub scale: u32,
    pub border: u32,
    /// Error correction when no logo is drawn (low, medium, quartile, high).
    pub plain_ecc: QrCodeEcc,
}

impl Default for QrSettings {
    fn default() -> Self {
        Self {
            scale: 30,
            border: 4,
            plain_ecc: QrCodeEcc::Medium,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogoSettings {
    pub size_ratio: f32,
    /// Canonical tag → logo file.
    pub paths: BTreeMap<String, PathBuf>,
    /// Extra label → canonical tag (empty string for "no logo").
    pub aliases: BTreeMap<String, String>,
}

impl Default for LogoSettings {
    fn default() -> Self {
        Self {
            size_ratio: crate::logo::DEFAULT_LOGO_RATIO,
            paths: BTreeMap::from([
                ("VLEV".to_string(), PathBuf::from("logos/VLEV.png")),
                ("VG".to_string(), PathBuf::from("logos/VG.png")),
            ]),
            aliases: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionSettings {
    pub enabled: bool,
    pub format: String,
    /// Tried in order; the first readable font is used.
    pub font_paths: Vec<PathBuf>,
    pub font_size: Option<f32>,
    pub min_font_size: f32,
    pub width_divisor: f32,
    pub padding: u32,
}

impl Default for CaptionSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            format: DEFAULT_CAPTION_FORMAT.to_string(),
            font_paths: default_font_paths(),
            font_size: None,
            min_font_size: 24.0,
            width_divisor: 20.0,
            padding: 20,
        }
    }
}

fn default_font_paths() -> Vec<PathBuf> {
    [
        "fonts/caption.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
        "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
        "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
        "C:\\Windows\\Fonts\\calibrib.ttf",
        "C:\\Windows\\Fonts\\arialbd.ttf",
    ]
    .into_iter()
    .map(PathBuf::from)
    .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasSettings {
    pub width: u32,
    pub height: u32,
    pub qr_area_fraction: f32,
    pub top_margin: u32,
}

impl Default for CanvasSettings {
    fn default() -> Self {
        let spec = CanvasSpec::default();
        Self {
            width: spec.width,
            height: spec.height,
            qr_area_fraction: spec.qr_area_fraction,
            top_margin: spec.top_margin,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialSettings {
    pub allow_empty_password: bool,
}

impl Settings {
    /// Default `settings.toml` location, `None` when the platform has no config dir.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
            .map(|dirs| dirs.config_dir().join(SETTINGS_FILENAME))
    }

    /// Loads settings from `path`, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(settings) => {
                    tracing::info!(path = %path.display(), "loaded settings");
                    settings
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to parse settings, using defaults");
                    Settings::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no settings file, using defaults");
                Settings::default()
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read settings, using defaults");
                Settings::default()
            }
        }
    }

    /// Writes settings, creating the parent directory if needed.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        tracing::info!(path = %path.display(), "saved settings");
        Ok(())
    }

    /// Store location: explicit `store_path`, else next to `settings_path`.
    pub fn store_path(&self, settings_path: Option<&Path>) -> PathBuf {
        if let Some(path) = &self.store_path {
            return path.clone();
        }
        settings_path
            .and_then(Path::parent)
            .map(|dir| dir.join(STORE_FILENAME))
            .unwrap_or_else(|| PathBuf::from(STORE_FILENAME))
    }

    pub fn policy(&self) -> CredentialPolicy {
        CredentialPolicy {
            allow_empty_password: self.credentials.allow_empty_password,
        }
    }

    /// Default alias table plus configured aliases.
    pub fn property_table(&self) -> Result<PropertyTable, SettingsError> {
        let mut table = PropertyTable::default();
        for (label, tag) in &self.logo.aliases {
            let target = if tag.trim().is_empty() {
                None
            } else {
                Some(parse_tag("logo.aliases", tag)?)
            };
            table = table.with_alias(label, target);
        }
        Ok(table)
    }

    pub fn logo_catalog(&self) -> Result<LogoCatalog, SettingsError> {
        let mut catalog = LogoCatalog::default();
        for (tag, path) in &self.logo.paths {
            catalog = catalog.with_logo(parse_tag("logo.paths", tag)?, path.clone());
        }
        Ok(catalog)
    }

    /// Validated pipeline settings.
    pub fn pipeline(&self) -> Result<PipelineSettings, SettingsError> {
        if self.qr.scale == 0 || self.qr.scale > MAX_SCALE {
            return Err(SettingsError::Invalid {
                key: "qr.scale",
                reason: format!("must be between 1 and {MAX_SCALE}, got {}", self.qr.scale),
            });
        }
        if !(self.logo.size_ratio > 0.0 && self.logo.size_ratio <= MAX_LOGO_RATIO) {
            return Err(SettingsError::Invalid {
                key: "logo.size_ratio",
                reason: format!("must be in (0, {MAX_LOGO_RATIO}], got {}", self.logo.size_ratio),
            });
        }
        if self.qr.border > MAX_BORDER {
            return Err(SettingsError::Invalid {
                key: "qr.border",
                reason: format!("must be at most {MAX_BORDER}, got {}", self.qr.border),
            });
        }
        if self.caption.padding > MAX_CAPTION_PADDING {
            return Err(SettingsError::Invalid {
                key: "caption.padding",
                reason: format!(
                    "must be at most {MAX_CAPTION_PADDING}, got {}",
                    self.caption.padding
                ),
            });
        }
        positive("caption.width_divisor", self.caption.width_divisor)?;
        positive("caption.min_font_size", self.caption.min_font_size)?;
        if let Some(size) = self.caption.font_size {
            positive("caption.font_size", size)?;
        }
        let canvas = CanvasSpec {
            width: self.canvas.width,
            height: self.canvas.height,
            qr_area_fraction: self.canvas.qr_area_fraction,
            top_margin: self.canvas.top_margin,
            ..CanvasSpec::default()
        };
        canvas.validate()?;

        Ok(PipelineSettings {
            scale: self.qr.scale,
            border: self.qr.border,
            plain_ecc: self.qr.plain_ecc,
            logos: self.logo_catalog()?,
            logo_ratio: self.logo.size_ratio,
            caption: CaptionStyle {
                font_size: self.caption.font_size,
                min_font_size: self.caption.min_font_size,
                width_divisor: self.caption.width_divisor,
                padding: self.caption.padding,
                ..CaptionStyle::default()
            },
            caption_format: self.caption.format.clone(),
            canvas,
        })
    }
}

fn positive(key: &'static str, value: f32) -> Result<(), SettingsError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SettingsError::Invalid {
            key,
            reason: format!("must be a positive number, got {value}"),
        })
    }
}

fn parse_tag(key: &'static str, tag: &str) -> Result<PropertyType, SettingsError> {
    tag.parse().map_err(|_| SettingsError::UnknownTag {
        key,
        tag: tag.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_round_trip() {
        let settings = Settings::default();
        let toml_str = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&toml_str).unwrap();
        assert_eq!(settings, parsed);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let parsed: Settings = toml::from_str(
            r#"
            output_dir = "out"

            [qr]
            plain_ecc = "high"

            [canvas]
            width = 600
            "#,
        )
        .unwrap();
        assert_eq!(parsed.output_dir, PathBuf::from("out"));
        assert_eq!(parsed.qr.plain_ecc, QrCodeEcc::High);
        assert_eq!(parsed.qr.scale, 30);
        assert_eq!(parsed.canvas.width, 600);
        assert_eq!(parsed.canvas.height, 1100);
    }

    #[test]
    fn aliases_extend_the_table() {
        let mut settings = Settings::default();
        settings
            .logo
            .aliases
            .insert("Villa Estancia".to_string(), "VLEV".to_string());
        settings.logo.aliases.insert("Generic".to_string(), String::new());
        let table = settings.property_table().unwrap();
        assert_eq!(table.normalize("villa estancia"), Some(PropertyType::Vlev));
        assert_eq!(table.normalize("generic"), None);
    }

    #[test]
    fn unknown_logo_tag_is_rejected() {
        let mut settings = Settings::default();
        settings
            .logo
            .paths
            .insert("XYZ".to_string(), PathBuf::from("logos/xyz.png"));
        assert_eq!(
            settings.logo_catalog(),
            Err(SettingsError::UnknownTag {
                key: "logo.paths",
                tag: "XYZ".to_string()
            })
        );
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut settings = Settings::default();
        settings.logo.size_ratio = 0.5;
        assert!(settings.pipeline().is_err());

        let mut settings = Settings::default();
        settings.canvas.qr_area_fraction = 0.0;
        assert!(settings.pipeline().is_err());

        assert!(Settings::default().pipeline().is_ok());
    }

    #[test]
    fn out_of_range_geometry_is_rejected() {
        let rejected_key = |settings: &Settings| match settings.pipeline() {
            Err(SettingsError::Invalid { key, .. }) => key,
            other => panic!("expected an invalid setting, got {other:?}"),
        };

        let mut settings = Settings::default();
        settings.qr.border = u32::MAX / 2;
        assert_eq!(rejected_key(&settings), "qr.border");

        let mut settings = Settings::default();
        settings.caption.padding = u32::MAX / 2 + 1;
        assert_eq!(rejected_key(&settings), "caption.padding");

        let mut settings = Settings::default();
        settings.caption.width_divisor = f32::NAN;
        assert_eq!(rejected_key(&settings), "caption.width_divisor");

        let mut settings = Settings::default();
        settings.caption.font_size = Some(f32::INFINITY);
        assert_eq!(rejected_key(&settings), "caption.font_size");

        let mut settings = Settings::default();
        settings.canvas.width = u32::MAX;
        assert_eq!(rejected_key(&settings), "canvas");

        let mut settings = Settings::default();
        settings.qr.border = MAX_BORDER;
        settings.caption.padding = MAX_CAPTION_PADDING;
        assert!(settings.pipeline().is_ok());
    }

    #[test]
    fn store_sits_next_to_settings() {
        let settings = Settings::default();
        assert_eq!(
            settings.store_path(Some(Path::new("/etc/wifiqr/settings.toml"))),
            PathBuf::from("/etc/wifiqr/sources.json")
        );
    }

    #[test]
    fn load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("settings.toml"));
        assert_eq!(settings, Settings::default());
    }
}
