//! Error types for credential validation, QR composition and settings persistence.

use std::path::PathBuf;
use thiserror::Error;

use crate::sheet::ColumnRole;

/// Errors raised while turning raw input into a [`WifiCredential`](crate::credential::WifiCredential).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    /// SSID is blank after trimming.
    #[error("SSID is required")]
    EmptySsid,

    /// SSID longer than the 32 bytes allowed by 802.11.
    #[error("SSID is {len} bytes long, the maximum is 32")]
    SsidTooLong { len: usize },

    /// Encryption token not in the accepted set.
    #[error("unrecognized encryption '{token}' (expected WPA2, WPA, WEP or OPEN)")]
    InvalidEncryption { token: String },

    /// Secured network without a password.
    #[error("a password is required for {encryption} networks")]
    MissingPassword { encryption: &'static str },
}

/// Errors raised when reading a `WIFI:` payload back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("payload does not start with 'WIFI:'")]
    MissingPrefix,

    #[error("payload is not terminated with ';;'")]
    Unterminated,

    #[error("malformed field '{field}'")]
    MalformedField { field: String },

    #[error("payload has no SSID field")]
    MissingSsid,

    #[error(transparent)]
    Credential(#[from] CredentialError),
}

/// QR symbol encoding failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// Payload exceeds the capacity of the largest symbol at the requested level.
    #[error("payload of {len} bytes does not fit a QR code at error correction level {level}")]
    DataTooLong { len: usize, level: char },

    /// Any other rejection from the symbol encoder.
    #[error("QR encoder rejected the payload: {message}")]
    Symbol { message: String },

    /// Scale or border outside the accepted range.
    #[error("invalid raster geometry: {reason}")]
    Geometry { reason: String },
}

/// Failures of a single composition request.
#[derive(Debug, Error)]
pub enum ComposeError {
    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("failed to create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write image {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode PNG for {path}: {source}")]
    Png {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Persistence failures of the per-sheet settings store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to create store directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize source settings: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write source settings to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("source settings store lock poisoned")]
    Poisoned,
}

/// Failures extracting one spreadsheet row into credential input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// Required column neither detected nor mapped by the operator.
    #[error("no column is mapped for {role}; map it with --{role}-col")]
    MissingColumn { role: ColumnRole },

    /// Required cell is blank in this row.
    #[error("row {row} has an empty {role} cell")]
    EmptyCell { row: usize, role: ColumnRole },
}

/// Errors reading a spreadsheet export.
#[derive(Debug, Error)]
pub enum SheetError {
    #[error("sheet file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to read sheet {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("sheet {path} has no header row")]
    Empty { path: PathBuf },

    #[error("invalid column reference '{column}'")]
    InvalidColumn { column: String },
}

/// Invalid values in `settings.toml`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettingsError {
    #[error("invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("unknown property tag '{tag}' in {key}")]
    UnknownTag { key: &'static str, tag: String },
}

/// Per-row failure inside a batch run.
#[derive(Debug, Error)]
pub enum RowError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Compose(#[from] ComposeError),
}
