//! # wifiqr
//!
//! A Rust library for generating printable WiFi QR codes.
//!
//! `wifiqr` turns network credentials into the standard `WIFI:` join payload, encodes it
//! as a QR symbol and composes a print-ready image: an optional property logo in the
//! centre, a caption band with the network name and password, and a fixed-size canvas.
//! Credentials can be typed in directly or read row by row from a spreadsheet export,
//! with column mappings and defaults remembered per file and sheet.
//!
//! ## Features
//!
//! - Build and parse `WIFI:S:…;T:…;P:…;H:…;;` payloads with full escaping.
//! - Raise error correction to High whenever a logo covers part of the symbol.
//! - Resolve property labels (including legacy aliases) to logo assets.
//! - Caption layout that shrinks text to fit and stays deterministic per input.
//! - Batch generation from CSV sheets with per-row failure isolation and cancellation.
//! - Per-sheet settings persisted atomically.
//!
//! ## Installation
//!
//! Add to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! wifiqr = "0.1" # Replace with the latest version
//! ```
//!
//! ## Example
//!
//! Build a credential and look at its payload:
//!
//! ```rust
//! use wifiqr::credential::{CredentialInput, CredentialPolicy, WifiCredential};
//! use wifiqr::property::{PropertyTable, PropertyType};
//!
//! let input = CredentialInput {
//!     ssid: "Hotel_Net".into(),
//!     password: "abc12345".into(),
//!     encryption: Some("WPA2".into()),
//!     property: Some("VDPF".into()),
//!     hidden: false,
//! };
//! let credential =
//!     WifiCredential::new(&input, &PropertyTable::default(), CredentialPolicy::default()).unwrap();
//! assert_eq!(credential.property(), Some(PropertyType::Vg));
//! assert_eq!(credential.payload(), "WIFI:S:Hotel_Net;T:WPA;P:abc12345;;");
//! ```
//!
//! Generate an in-memory QR buffer:
//!
//! ```rust
//! use wifiqr::encoder::{encode_to_buffer, RasterOptions};
//!
//! let img = encode_to_buffer("WIFI:S:Lobby;T:nopass;;", RasterOptions::default()).unwrap();
//! assert_eq!(img.width(), img.height());
//! ```
//!
//! ## Modules
//!
//! - [`credential`]: Credential validation and the WiFi payload format.
//! - [`property`]: Property tags and label normalization.
//! - [`encoder`]: QR encoding into grayscale buffers.
//! - [`logo`], [`caption`], [`canvas`]: Composition stages.
//! - [`pipeline`]: Runs the stages and writes PNG files.
//! - [`sheet`], [`precedence`], [`batch`]: Spreadsheet import and batch generation.
//! - [`store`]: Per-sheet settings persistence.
//! - [`settings`], [`logging`]: Application configuration and log setup.
//! - [`error`]: Error types.

pub mod batch;
pub mod canvas;
pub mod caption;
pub mod credential;
pub mod encoder;
pub mod error;
pub mod logging;
pub mod logo;
pub mod pipeline;
pub mod precedence;
pub mod property;
pub mod settings;
pub mod sheet;
pub mod store;
