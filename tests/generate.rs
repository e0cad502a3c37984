use image::{GenericImageView, Rgba, RgbaImage};

use wifiqr::credential::{parse_payload, CredentialInput, CredentialPolicy, Encryption, WifiCredential};
use wifiqr::encoder::QrCodeEcc;
use wifiqr::logo::{LogoCatalog, LogoStatus, LogoWarning};
use wifiqr::pipeline::{CaptionChoice, CompositionRequest, PipelineSettings, QrPipeline};
use wifiqr::property::{PropertyTable, PropertyType};

fn write_logo(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("VG.png");
    RgbaImage::from_pixel(120, 80, Rgba([200, 30, 30, 255]))
        .save(&path)
        .unwrap();
    path
}

#[test]
fn hotel_scenario_uses_vg_logo_and_standard_canvas() {
    let dir = tempfile::tempdir().unwrap();
    let logo = write_logo(dir.path());
    let input = CredentialInput {
        ssid: "Hotel_Net".into(),
        password: "abc12345".into(),
        encryption: Some("WPA2".into()),
        property: Some("VDPF".into()),
        hidden: false,
    };
    let credential =
        WifiCredential::new(&input, &PropertyTable::default(), CredentialPolicy::default())
            .unwrap();
    assert_eq!(credential.property(), Some(PropertyType::Vg));

    let settings = PipelineSettings {
        logos: LogoCatalog::default().with_logo(PropertyType::Vg, logo),
        ..PipelineSettings::default()
    };
    let pipeline = QrPipeline::new(settings);
    let out = dir.path().join("codes");
    let request = CompositionRequest::new(credential, &out).with_room("1102A");
    let rendered = pipeline.render(&request).unwrap();

    assert_eq!(rendered.composition.ecc, QrCodeEcc::High);
    assert!(matches!(rendered.composition.logo, LogoStatus::Applied(_)));
    assert!(rendered.composition.captioned);

    let name = rendered.path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("1102A_VG_"), "{name}");
    assert!(name.ends_with(".png"));

    let saved = image::open(&rendered.path).unwrap();
    assert_eq!(saved.dimensions(), (825, 1100));
}

#[test]
fn open_network_passes_through_without_password() {
    let input = CredentialInput {
        ssid: "Open_Net".into(),
        password: "ignored".into(),
        encryption: Some("nopass".into()),
        property: None,
        hidden: false,
    };
    let credential =
        WifiCredential::new(&input, &PropertyTable::default(), CredentialPolicy::default())
            .unwrap();
    assert_eq!(credential.payload(), "WIFI:S:Open_Net;T:nopass;P:;;");

    let parsed = parse_payload(&credential.payload()).unwrap();
    assert_eq!(parsed.encryption, Encryption::Open);
    assert_eq!(parsed.password, "");
    assert!(!parsed.hidden);

    let pipeline = QrPipeline::new(PipelineSettings::default());
    let request = CompositionRequest::new(credential, "unused");
    assert_eq!(
        pipeline.caption_text(&request).as_deref(),
        Some("SSID: Open_Net")
    );
    let composition = pipeline.compose(&request).unwrap();
    assert_eq!(composition.ecc, QrCodeEcc::Medium);
    assert_eq!(composition.logo, LogoStatus::NotRequested);
    assert_eq!(composition.image.dimensions(), (825, 1100));
}

#[test]
fn missing_logo_degrades_to_unbranded_code() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("VLEV.png");
    let credential = WifiCredential::from_parts(
        "Villa_Net",
        "secret123",
        Encryption::Wpa2,
        false,
        Some(PropertyType::Vlev),
        CredentialPolicy::default(),
    )
    .unwrap();
    let settings = PipelineSettings {
        scale: 10,
        logos: LogoCatalog::default().with_logo(PropertyType::Vlev, missing.clone()),
        ..PipelineSettings::default()
    };
    let composition = QrPipeline::new(settings)
        .compose(&CompositionRequest::new(credential, dir.path()))
        .unwrap();

    assert_eq!(
        composition.logo,
        LogoStatus::Skipped(LogoWarning::MissingFile(missing))
    );
    assert_eq!(composition.ecc, QrCodeEcc::High);
    assert_eq!(composition.image.dimensions(), (825, 1100));
}

#[test]
fn composition_is_deterministic() {
    let credential = WifiCredential::from_parts(
        "Lobby",
        "welcome!",
        Encryption::Wpa,
        false,
        None,
        CredentialPolicy::default(),
    )
    .unwrap();
    let pipeline = QrPipeline::new(PipelineSettings {
        scale: 8,
        ..PipelineSettings::default()
    });
    let request = CompositionRequest::new(credential, "unused");
    let first = pipeline.compose(&request).unwrap();
    let second = pipeline.compose(&request).unwrap();
    assert_eq!(first.image.as_raw(), second.image.as_raw());

    let bare = pipeline
        .compose(&request.clone().with_caption(CaptionChoice::None))
        .unwrap();
    assert!(!bare.captioned);
    assert_eq!(bare.image.dimensions(), (825, 1100));
}
