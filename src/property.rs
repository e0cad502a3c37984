//! Property tags and the label normalization table.
//!
//! Spreadsheets label the same property in many ways ("VLE", "vlev ", "Flamingos"...).
//! [`PropertyTable`] folds those labels onto the closed set of [`PropertyType`] tags
//! through an explicit alias map. Labels it does not know resolve to no property.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Canonical property tag selecting the logo overlaid on a code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PropertyType {
    #[serde(rename = "VLEV")]
    Vlev,
    #[serde(rename = "VG")]
    Vg,
}

impl PropertyType {
    pub const ALL: [PropertyType; 2] = [PropertyType::Vlev, PropertyType::Vg];

    /// Tag as written in settings, filenames and the store.
    pub const fn tag(self) -> &'static str {
        match self {
            PropertyType::Vlev => "VLEV",
            PropertyType::Vg => "VG",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for PropertyType {
    type Err = String;

    /// Parses a canonical tag only. Use [`PropertyTable::normalize`] for free-form labels.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PropertyType::ALL
            .into_iter()
            .find(|p| p.tag().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown property tag '{s}'"))
    }
}

const DEFAULT_ALIASES: &[(&str, Option<PropertyType>)] = &[
    ("vlev", Some(PropertyType::Vlev)),
    ("vle", Some(PropertyType::Vlev)),
    ("vg", Some(PropertyType::Vg)),
    ("vdpf", Some(PropertyType::Vg)),
    ("vdp", Some(PropertyType::Vg)),
    ("flamingos", Some(PropertyType::Vg)),
    ("none", None),
    ("no logo", None),
    ("sin logo", None),
];

/// Many-to-one lookup from raw labels to property tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyTable {
    aliases: HashMap<String, Option<PropertyType>>,
}

impl Default for PropertyTable {
    fn default() -> Self {
        let aliases = DEFAULT_ALIASES
            .iter()
            .map(|(label, tag)| ((*label).to_string(), *tag))
            .collect();
        Self { aliases }
    }
}

impl PropertyTable {
    /// Adds or replaces an alias. `None` marks an explicit "no logo" label.
    #[must_use]
    pub fn with_alias(mut self, label: &str, tag: Option<PropertyType>) -> Self {
        self.aliases.insert(fold(label), tag);
        self
    }

    /// Normalizes a raw label. Blank, "no logo" and unknown labels give `None`.
    pub fn normalize(&self, label: &str) -> Option<PropertyType> {
        self.lookup(label).unwrap_or_else(|| {
            tracing::debug!(label, "unrecognized property label, no logo will be used");
            None
        })
    }

    /// Strict lookup: `None` for unknown labels, `Some(None)` for blank labels and the
    /// explicit no-logo aliases.
    pub fn lookup(&self, label: &str) -> Option<Option<PropertyType>> {
        let key = fold(label);
        if key.is_empty() {
            return Some(None);
        }
        self.aliases.get(&key).copied()
    }

    /// Number of known labels.
    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

// Lowercases and collapses inner whitespace so "  No   Logo " matches "no logo".
fn fold(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
