//! Sheet value versus operator default.
//!
//! For encryption and property the operator decides, per sheet, whether the sheet's cell
//! or their own default applies. That decision is made once here for every path that
//! turns rows into credentials, so single-room and batch generation cannot diverge.

use crate::credential::CredentialInput;
use crate::error::ResolveError;
use crate::sheet::{ColumnMap, ColumnRole, SheetRow};
use crate::store::SourceConfigEntry;

/// Where a field's value comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Read the mapped sheet column; a blank or unmapped cell falls back to `fallback`.
    Sheet { column: Option<usize>, fallback: Option<String> },
    /// Always use the operator's value.
    Operator(Option<String>),
}

impl ValueSource {
    fn choose(use_sheet: bool, column: Option<usize>, default: Option<String>) -> Self {
        if use_sheet {
            ValueSource::Sheet {
                column,
                fallback: default,
            }
        } else {
            ValueSource::Operator(default)
        }
    }

    pub fn resolve(&self, row: &SheetRow) -> Option<String> {
        match self {
            ValueSource::Sheet { column, fallback } => column
                .and_then(|c| row.cell(c))
                .map(str::to_string)
                .or_else(|| fallback.clone()),
            ValueSource::Operator(value) => value.clone(),
        }
    }
}

/// Fields of one row ready for credential validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRow {
    pub number: usize,
    pub room: String,
    pub input: CredentialInput,
}

/// Applies a sheet's stored settings to its rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowResolver {
    columns: ColumnMap,
    encryption: ValueSource,
    property: ValueSource,
}

impl RowResolver {
    pub fn new(entry: &SourceConfigEntry) -> Self {
        let columns = entry.column_map.clone();
        let encryption = ValueSource::choose(
            entry.use_excel_security,
            columns.get(&ColumnRole::Encryption).copied(),
            Some(entry.default_encryption.label().to_string()),
        );
        let property = ValueSource::choose(
            entry.use_excel_property,
            columns.get(&ColumnRole::Property).copied(),
            entry.default_property.map(|p| p.tag().to_string()),
        );
        Self {
            columns,
            encryption,
            property,
        }
    }

    pub fn encryption_source(&self) -> &ValueSource {
        &self.encryption
    }

    pub fn property_source(&self) -> &ValueSource {
        &self.property
    }

    /// Room and SSID columns must be mapped before any row can be read.
    pub fn check_required(&self) -> Result<(), ResolveError> {
        for role in [ColumnRole::Room, ColumnRole::Ssid] {
            if !self.columns.contains_key(&role) {
                return Err(ResolveError::MissingColumn { role });
            }
        }
        Ok(())
    }

    pub fn column(&self, role: ColumnRole) -> Option<usize> {
        self.columns.get(&role).copied()
    }

    pub fn resolve(&self, row: &SheetRow) -> Result<ResolvedRow, ResolveError> {
        self.check_required()?;
        let required = |role: ColumnRole| -> Result<String, ResolveError> {
            self.column(role)
                .and_then(|c| row.cell(c))
                .map(str::to_string)
                .ok_or(ResolveError::EmptyCell {
                    row: row.number,
                    role,
                })
        };
        let room = required(ColumnRole::Room)?;
        let ssid = required(ColumnRole::Ssid)?;
        let password = self
            .column(ColumnRole::Password)
            .and_then(|c| row.cell(c))
            .unwrap_or_default()
            .to_string();

        Ok(ResolvedRow {
            number: row.number,
            room,
            input: CredentialInput {
                ssid,
                password,
                encryption: self.encryption.resolve(row),
                property: self.property.resolve(row),
                hidden: false,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::Encryption;
    use crate::property::PropertyType;

    fn row(cells: &[&str]) -> SheetRow {
        SheetRow::new(2, cells.iter().map(|s| s.to_string()))
    }

    fn entry(use_excel_security: bool, use_excel_property: bool) -> SourceConfigEntry {
        SourceConfigEntry {
            column_map: ColumnMap::from([
                (ColumnRole::Room, 0),
                (ColumnRole::Ssid, 1),
                (ColumnRole::Password, 2),
                (ColumnRole::Encryption, 3),
                (ColumnRole::Property, 4),
            ]),
            use_excel_security,
            use_excel_property,
            default_encryption: Encryption::Wpa2,
            default_property: Some(PropertyType::Vlev),
        }
    }

    #[test]
    fn sheet_values_win_when_flagged() {
        let resolver = RowResolver::new(&entry(true, true));
        let resolved = resolver.resolve(&row(&["1101", "Net", "pw123456", "WEP", "VDPF"])).unwrap();
        assert_eq!(resolved.room, "1101");
        assert_eq!(resolved.input.encryption.as_deref(), Some("WEP"));
        assert_eq!(resolved.input.property.as_deref(), Some("VDPF"));
    }

    #[test]
    fn operator_defaults_win_otherwise() {
        let resolver = RowResolver::new(&entry(false, false));
        let resolved = resolver.resolve(&row(&["1101", "Net", "pw123456", "WEP", "VDPF"])).unwrap();
        assert_eq!(resolved.input.encryption.as_deref(), Some("WPA2"));
        assert_eq!(resolved.input.property.as_deref(), Some("VLEV"));
    }

    #[test]
    fn blank_sheet_cell_falls_back_to_default() {
        let resolver = RowResolver::new(&entry(true, true));
        let resolved = resolver.resolve(&row(&["1101", "Net", "pw123456", " ", ""])).unwrap();
        assert_eq!(resolved.input.encryption.as_deref(), Some("WPA2"));
        assert_eq!(resolved.input.property.as_deref(), Some("VLEV"));
    }

    #[test]
    fn unmapped_required_column_is_reported() {
        let mut e = entry(false, false);
        e.column_map.remove(&ColumnRole::Ssid);
        let resolver = RowResolver::new(&e);
        assert_eq!(
            resolver.resolve(&row(&["1101"])),
            Err(ResolveError::MissingColumn { role: ColumnRole::Ssid })
        );
    }

    #[test]
    fn empty_ssid_cell_is_reported() {
        let resolver = RowResolver::new(&entry(false, false));
        assert_eq!(
            resolver.resolve(&row(&["1101", ""])),
            Err(ResolveError::EmptyCell { row: 2, role: ColumnRole::Ssid })
        );
    }
}
