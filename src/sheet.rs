//! Spreadsheet boundary: rows, column roles and header detection.
//!
//! Readers implement [`SheetSource`]. [`CsvSheet`] reads a sheet exported as CSV; its
//! identity is the canonical path of the file.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SheetError;

/// What a column holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnRole {
    Room,
    Ssid,
    Password,
    Encryption,
    Property,
}

impl ColumnRole {
    pub const ALL: [ColumnRole; 5] = [
        ColumnRole::Room,
        ColumnRole::Ssid,
        ColumnRole::Password,
        ColumnRole::Encryption,
        ColumnRole::Property,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            ColumnRole::Room => "room",
            ColumnRole::Ssid => "ssid",
            ColumnRole::Password => "password",
            ColumnRole::Encryption => "encryption",
            ColumnRole::Property => "property",
        }
    }

    /// Header keywords, checked exactly first and then as substrings.
    pub const fn keywords(self) -> &'static [&'static str] {
        match self {
            ColumnRole::Room => &[
                "room", "habitacion", "habitación", "number", "número", "hab", "cuarto", "villa",
            ],
            ColumnRole::Ssid => &["ssid", "network", "red", "wifi", "nombre", "name", "net"],
            ColumnRole::Password => &[
                "password", "contraseña", "pass", "key", "clave", "pwd", "contrasena",
            ],
            ColumnRole::Encryption => &[
                "security", "encryption", "seguridad", "encriptación", "type", "tipo", "encriptacion",
            ],
            ColumnRole::Property => &["property", "propiedad", "hotel", "region", "zona", "lugar", "site"],
        }
    }
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Role → zero-based column index.
pub type ColumnMap = BTreeMap<ColumnRole, usize>;

/// One data row. `number` is the 1-based spreadsheet row (header is row 1).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetRow {
    pub number: usize,
    pub cells: BTreeMap<usize, String>,
}

impl SheetRow {
    pub fn new(number: usize, cells: impl IntoIterator<Item = String>) -> Self {
        Self {
            number,
            cells: cells.into_iter().enumerate().collect(),
        }
    }

    /// Trimmed cell text; blank cells read as `None`.
    pub fn cell(&self, index: usize) -> Option<&str> {
        self.cells
            .get(&index)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }
}

/// A sheet the batch runner can read.
pub trait SheetSource {
    /// Stable identifier of the underlying file.
    fn file_identity(&self) -> &str;
    fn sheet_name(&self) -> &str;
    fn header(&self) -> &[String];
    fn rows(&self) -> &[SheetRow];
}

/// Identity used as the first half of the settings key.
pub fn file_identity(path: &Path) -> String {
    let resolved = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    resolved.to_string_lossy().into_owned()
}

/// CSV export of one sheet.
#[derive(Debug, Clone)]
pub struct CsvSheet {
    identity: String,
    sheet_name: String,
    header: Vec<String>,
    rows: Vec<SheetRow>,
}

impl CsvSheet {
    /// Reads a CSV file. The sheet name defaults to the file stem.
    pub fn open(path: &Path, sheet_name: Option<&str>) -> Result<Self, SheetError> {
        if !path.exists() {
            return Err(SheetError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let read_err = |source| SheetError::Read {
            path: path.to_path_buf(),
            source,
        };
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .map_err(read_err)?;

        let mut records = reader.records();
        let header: Vec<String> = match records.next() {
            Some(record) => record.map_err(read_err)?.iter().map(str::to_string).collect(),
            None => {
                return Err(SheetError::Empty {
                    path: path.to_path_buf(),
                })
            }
        };
        let mut rows = Vec::new();
        for (offset, record) in records.enumerate() {
            let record = record.map_err(read_err)?;
            rows.push(SheetRow::new(offset + 2, record.iter().map(str::to_string)));
        }

        let sheet_name = sheet_name.map(str::to_string).unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        });
        tracing::info!(path = %path.display(), sheet = %sheet_name, rows = rows.len(), "sheet loaded");
        Ok(Self {
            identity: file_identity(path),
            sheet_name,
            header,
            rows,
        })
    }

    /// In-memory sheet, mostly for tests and callers with their own reader.
    pub fn from_parts(
        identity: impl Into<String>,
        sheet_name: impl Into<String>,
        header: Vec<String>,
        rows: Vec<SheetRow>,
    ) -> Self {
        Self {
            identity: identity.into(),
            sheet_name: sheet_name.into(),
            header,
            rows,
        }
    }

    pub fn path(&self) -> PathBuf {
        PathBuf::from(&self.identity)
    }
}

impl SheetSource for CsvSheet {
    fn file_identity(&self) -> &str {
        &self.identity
    }

    fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    fn header(&self) -> &[String] {
        &self.header
    }

    fn rows(&self) -> &[SheetRow] {
        &self.rows
    }
}

/// Maps header cells to roles. Exact keyword matches win over substring matches, and
/// each column is assigned to at most one role.
pub fn detect_columns(header: &[String]) -> ColumnMap {
    let cells: Vec<String> = header.iter().map(|h| h.trim().to_lowercase()).collect();
    let mut found = ColumnMap::new();

    for (idx, cell) in cells.iter().enumerate() {
        if cell.is_empty() {
            continue;
        }
        if let Some(role) = ColumnRole::ALL
            .into_iter()
            .find(|role| !found.contains_key(role) && role.keywords().contains(&cell.as_str()))
        {
            found.insert(role, idx);
        }
    }
    for (idx, cell) in cells.iter().enumerate() {
        if cell.is_empty() || found.values().any(|&used| used == idx) {
            continue;
        }
        if let Some(role) = ColumnRole::ALL.into_iter().find(|role| {
            !found.contains_key(role) && role.keywords().iter().any(|kw| cell.contains(kw))
        }) {
            found.insert(role, idx);
        }
    }

    let missing: Vec<&str> = ColumnRole::ALL
        .into_iter()
        .filter(|r| !found.contains_key(r))
        .map(ColumnRole::name)
        .collect();
    if !missing.is_empty() {
        tracing::warn!(missing = %missing.join(", "), "columns not found in header row");
    }
    found
}

/// Spreadsheet column letters to a zero-based index: `A` → 0, `Z` → 25, `AA` → 26.
pub fn column_index(letters: &str) -> Option<usize> {
    let letters = letters.trim();
    if letters.is_empty() {
        return None;
    }
    let mut result = 0usize;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        result = result.checked_mul(26)?.checked_add(digit)?;
    }
    Some(result - 1)
}

/// Zero-based index to spreadsheet column letters.
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut out = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        out.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    out.iter().rev().collect()
}

/// Column reference given by an operator: letters (`C`) or a 1-based number (`3`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRef(pub usize);

impl FromStr for ColumnRef {
    type Err = SheetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SheetError::InvalidColumn {
            column: s.to_string(),
        };
        let trimmed = s.trim();
        if let Ok(number) = trimmed.parse::<usize>() {
            return number.checked_sub(1).map(ColumnRef).ok_or_else(invalid);
        }
        column_index(trimmed).map(ColumnRef).ok_or_else(invalid)
    }
}

/// First row whose room cell matches `room`, ignoring case and surrounding spaces.
pub fn find_room<'a>(rows: &'a [SheetRow], room_column: usize, room: &str) -> Option<&'a SheetRow> {
    let wanted = room.trim().to_uppercase();
    rows.iter()
        .find(|row| row.cell(room_column).is_some_and(|c| c.to_uppercase() == wanted))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn exact_keywords_are_detected() {
        let map = detect_columns(&header(&["Room", "SSID", "Password", "Security", "Property"]));
        assert_eq!(map.get(&ColumnRole::Room), Some(&0));
        assert_eq!(map.get(&ColumnRole::Ssid), Some(&1));
        assert_eq!(map.get(&ColumnRole::Password), Some(&2));
        assert_eq!(map.get(&ColumnRole::Encryption), Some(&3));
        assert_eq!(map.get(&ColumnRole::Property), Some(&4));
    }

    #[test]
    fn partial_keywords_fill_the_gaps() {
        let map = detect_columns(&header(&["Nombre de Red", "Habitación", "", "Clave WiFi"]));
        assert_eq!(map.get(&ColumnRole::Room), Some(&1));
        assert_eq!(map.get(&ColumnRole::Ssid), Some(&0));
        assert_eq!(map.get(&ColumnRole::Password), Some(&3));
        assert_eq!(map.get(&ColumnRole::Encryption), None);
    }

    #[test]
    fn exact_match_beats_earlier_partial() {
        let map = detect_columns(&header(&["Wifi Network", "SSID"]));
        assert_eq!(map.get(&ColumnRole::Ssid), Some(&1));
    }

    #[test]
    fn column_letters() {
        assert_eq!(column_index("A"), Some(0));
        assert_eq!(column_index("z"), Some(25));
        assert_eq!(column_index("AA"), Some(26));
        assert_eq!(column_index("AB"), Some(27));
        assert_eq!(column_index("A1"), None);
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(701), "ZZ");
    }

    #[test]
    fn column_refs() {
        assert_eq!("C".parse::<ColumnRef>().unwrap(), ColumnRef(2));
        assert_eq!("3".parse::<ColumnRef>().unwrap(), ColumnRef(2));
        assert!("0".parse::<ColumnRef>().is_err());
        assert!("C-3".parse::<ColumnRef>().is_err());
    }

    #[test]
    fn room_lookup_is_case_insensitive() {
        let rows = vec![
            SheetRow::new(2, ["1101".to_string(), "Net-A".to_string()]),
            SheetRow::new(3, [" 1102a ".to_string(), "Net-B".to_string()]),
        ];
        let row = find_room(&rows, 0, "1102A").unwrap();
        assert_eq!(row.number, 3);
        assert!(find_room(&rows, 0, "9999").is_none());
    }

    #[test]
    fn csv_sheet_reads_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rooms.csv");
        std::fs::write(&path, "Room,SSID,Password\n1101,Net-A,abc12345\n1102,Net-B\n").unwrap();
        let sheet = CsvSheet::open(&path, None).unwrap();
        assert_eq!(sheet.sheet_name(), "rooms");
        assert_eq!(sheet.header().len(), 3);
        assert_eq!(sheet.rows().len(), 2);
        assert_eq!(sheet.rows()[1].number, 3);
        assert_eq!(sheet.rows()[1].cell(2), None);
    }

    #[test]
    fn missing_csv_is_reported() {
        let err = CsvSheet::open(Path::new("/nonexistent/rooms.csv"), None).unwrap_err();
        assert!(matches!(err, SheetError::FileNotFound { .. }));
    }
}
