//! WiFi credentials and the `WIFI:` network configuration payload.
//!
//! A [`WifiCredential`] is only built through [`WifiCredential::new`], which enforces the
//! password/encryption invariant: open networks carry no password, secured networks
//! always carry one (unless the policy explicitly allows blanks).
//!
//! # Example
//!
//! ```rust
//! use wifiqr::credential::{CredentialInput, CredentialPolicy, WifiCredential};
//! use wifiqr::property::PropertyTable;
//!
//! let input = CredentialInput {
//!     ssid: "Open_Net".into(),
//!     encryption: Some("open".into()),
//!     ..Default::default()
//! };
//! let cred = WifiCredential::new(&input, &PropertyTable::default(), CredentialPolicy::default()).unwrap();
//! assert_eq!(cred.payload(), "WIFI:S:Open_Net;T:nopass;P:;;");
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CredentialError, PayloadError};
use crate::property::{PropertyTable, PropertyType};

/// Maximum SSID length in bytes.
pub const MAX_SSID_BYTES: usize = 32;

/// Network security mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Encryption {
    #[default]
    Wpa2,
    Wpa,
    Wep,
    Open,
}

impl Encryption {
    /// `T:` token of the payload. WPA and WPA2 share the `WPA` token.
    pub const fn wire_token(self) -> &'static str {
        match self {
            Encryption::Wpa2 | Encryption::Wpa => "WPA",
            Encryption::Wep => "WEP",
            Encryption::Open => "nopass",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Encryption::Wpa2 => "WPA2",
            Encryption::Wpa => "WPA",
            Encryption::Wep => "WEP",
            Encryption::Open => "OPEN",
        }
    }

    /// Parses an operator or spreadsheet token. Blank input yields the default.
    pub fn parse_token(token: &str) -> Result<Self, CredentialError> {
        let normalized = token.trim().to_ascii_uppercase();
        match normalized.as_str() {
            "" => Ok(Encryption::default()),
            "WPA2" | "WPA2-PSK" | "WPA/WPA2" | "WPA2/WPA3" | "WPA3" => Ok(Encryption::Wpa2),
            "WPA" | "WPA-PSK" => Ok(Encryption::Wpa),
            "WEP" => Ok(Encryption::Wep),
            "OPEN" | "NONE" | "NOPASS" => Ok(Encryption::Open),
            _ => Err(CredentialError::InvalidEncryption {
                token: token.trim().to_string(),
            }),
        }
    }
}

impl fmt::Display for Encryption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Encryption {
    type Err = CredentialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Encryption::parse_token(s)
    }
}

/// Raw, unvalidated credential fields as typed by an operator or read from a row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialInput {
    pub ssid: String,
    pub password: String,
    /// `None` or blank means the default (WPA2).
    pub encryption: Option<String>,
    pub property: Option<String>,
    pub hidden: bool,
}

/// Construction policy switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CredentialPolicy {
    /// Accept secured networks with an empty password instead of failing.
    pub allow_empty_password: bool,
}

/// Validated WiFi connection descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiCredential {
    ssid: String,
    password: String,
    encryption: Encryption,
    hidden: bool,
    property: Option<PropertyType>,
}

impl WifiCredential {
    /// Validates and normalizes raw input.
    ///
    /// # Errors
    ///
    /// - [`CredentialError::EmptySsid`] / [`CredentialError::SsidTooLong`] for bad SSIDs.
    /// - [`CredentialError::InvalidEncryption`] for unknown tokens.
    /// - [`CredentialError::MissingPassword`] for a secured network without password,
    ///   unless `policy.allow_empty_password` is set.
    pub fn new(
        input: &CredentialInput,
        properties: &PropertyTable,
        policy: CredentialPolicy,
    ) -> Result<Self, CredentialError> {
        let encryption = match input.encryption.as_deref() {
            Some(token) => Encryption::parse_token(token)?,
            None => Encryption::default(),
        };
        let property = input
            .property
            .as_deref()
            .and_then(|label| properties.normalize(label));
        Self::from_parts(
            input.ssid.trim(),
            input.password.trim(),
            encryption,
            input.hidden,
            property,
            policy,
        )
    }

    /// Builds from already typed parts, enforcing the same invariants as [`WifiCredential::new`].
    pub fn from_parts(
        ssid: &str,
        password: &str,
        encryption: Encryption,
        hidden: bool,
        property: Option<PropertyType>,
        policy: CredentialPolicy,
    ) -> Result<Self, CredentialError> {
        if ssid.is_empty() {
            return Err(CredentialError::EmptySsid);
        }
        if ssid.len() > MAX_SSID_BYTES {
            return Err(CredentialError::SsidTooLong { len: ssid.len() });
        }
        let password = match encryption {
            Encryption::Open => {
                if !password.is_empty() {
                    tracing::debug!(ssid, "dropping password for open network");
                }
                String::new()
            }
            _ if password.is_empty() => {
                if !policy.allow_empty_password {
                    return Err(CredentialError::MissingPassword {
                        encryption: encryption.label(),
                    });
                }
                tracing::warn!(ssid, %encryption, "secured network generated with an empty password");
                String::new()
            }
            _ => password.to_string(),
        };
        Ok(Self {
            ssid: ssid.to_string(),
            password,
            encryption,
            hidden,
            property,
        })
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn encryption(&self) -> Encryption {
        self.encryption
    }

    pub fn hidden(&self) -> bool {
        self.hidden
    }

    pub fn property(&self) -> Option<PropertyType> {
        self.property
    }

    /// Network configuration string read by phone cameras.
    ///
    /// Field order is fixed: `S`, `T`, `P`, then `H` only for hidden networks.
    pub fn payload(&self) -> String {
        let mut out = String::with_capacity(self.ssid.len() + self.password.len() + 24);
        out.push_str("WIFI:S:");
        out.push_str(&escape_field(&self.ssid));
        out.push_str(";T:");
        out.push_str(self.encryption.wire_token());
        out.push_str(";P:");
        out.push_str(&escape_field(&self.password));
        out.push(';');
        if self.hidden {
            out.push_str("H:true;");
        }
        out.push(';');
        out
    }
}

/// Escapes the reserved characters `\ ; , : "` with a backslash.
pub fn escape_field(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 4);
    for c in value.chars() {
        if matches!(c, '\\' | ';' | ',' | ':' | '"') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Fields recovered from a `WIFI:` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPayload {
    pub ssid: String,
    pub password: String,
    /// `T:WPA` is read back as [`Encryption::Wpa2`].
    pub encryption: Encryption,
    pub hidden: bool,
}

/// Parses a payload produced by [`WifiCredential::payload`] (or any compliant writer).
pub fn parse_payload(payload: &str) -> Result<ParsedPayload, PayloadError> {
    let body = payload
        .strip_prefix("WIFI:")
        .ok_or(PayloadError::MissingPrefix)?;

    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = body.chars();
    let mut terminated = false;
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(escaped) => {
                    current.push('\\');
                    current.push(escaped);
                }
                None => return Err(PayloadError::Unterminated),
            },
            ';' if current.is_empty() => {
                terminated = true;
                break;
            }
            ';' => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    if !terminated {
        return Err(PayloadError::Unterminated);
    }

    let mut ssid = None;
    let mut password = String::new();
    let mut encryption = Encryption::Open;
    let mut hidden = false;
    for field in fields {
        let (key, raw) = field
            .split_once(':')
            .ok_or_else(|| PayloadError::MalformedField {
                field: field.clone(),
            })?;
        let value = unescape_field(raw);
        match key {
            "S" => ssid = Some(value),
            "P" => password = value,
            "T" => {
                encryption = match value.as_str() {
                    "" | "nopass" => Encryption::Open,
                    "WPA" => Encryption::Wpa2,
                    other => Encryption::parse_token(other)?,
                }
            }
            "H" => hidden = value.eq_ignore_ascii_case("true"),
            _ => {}
        }
    }

    Ok(ParsedPayload {
        ssid: ssid.ok_or(PayloadError::MissingSsid)?,
        password,
        encryption,
        hidden,
    })
}

fn unescape_field(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}
