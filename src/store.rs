//! Per-sheet import settings that survive restarts.
//!
//! Entries are keyed by `(file_identity, sheet_name)` and stored in one JSON document under
//! the key `"<file_identity>::<sheet_name>"`. Every [`SourceConfigStore::put`] rewrites
//! the document through a synced temporary file and an atomic rename, under a mutex.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::credential::Encryption;
use crate::error::StoreError;
use crate::property::PropertyType;
use crate::sheet::ColumnMap;

/// Files remembered in the recent list.
pub const MAX_RECENT_FILES: usize = 5;

/// Compound identity of a sheet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceKey {
    pub file_identity: String,
    pub sheet_name: String,
}

impl SourceKey {
    pub fn new(file_identity: impl Into<String>, sheet_name: impl Into<String>) -> Self {
        Self {
            file_identity: file_identity.into(),
            sheet_name: sheet_name.into(),
        }
    }
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.file_identity, self.sheet_name)
    }
}

/// Column mapping, override flags and operator defaults of one sheet.
///
/// The default value (no columns, flags off, WPA2, no property) is what
/// [`SourceConfigStore::get`] returns for sheets it has never seen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfigEntry {
    #[serde(default)]
    pub column_map: ColumnMap,
    #[serde(default)]
    pub use_excel_security: bool,
    #[serde(default)]
    pub use_excel_property: bool,
    #[serde(default)]
    pub default_encryption: Encryption,
    #[serde(default)]
    pub default_property: Option<PropertyType>,
}

/// Recently opened sheet file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentFile {
    pub path: PathBuf,
    pub last_sheet: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    sources: BTreeMap<String, SourceConfigEntry>,
    #[serde(default)]
    recent_files: Vec<RecentFile>,
}

/// Read-only copy of all entries, taken once per batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSnapshot {
    sources: BTreeMap<String, SourceConfigEntry>,
}

impl StoreSnapshot {
    pub fn get(&self, file_identity: &str, sheet_name: &str) -> SourceConfigEntry {
        self.sources
            .get(&SourceKey::new(file_identity, sheet_name).to_string())
            .cloned()
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// JSON-file backed settings store.
#[derive(Debug)]
pub struct SourceConfigStore {
    path: PathBuf,
    state: Mutex<StoreDocument>,
}

impl SourceConfigStore {
    /// Loads the store at `path`. A missing file is an empty store; an unreadable or
    /// corrupt one is logged and treated as empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let document = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<StoreDocument>(&content) {
                Ok(doc) => {
                    tracing::info!(path = %path.display(), sources = doc.sources.len(), "loaded source settings");
                    doc
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "source settings are corrupt, starting empty");
                    StoreDocument::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no source settings yet");
                StoreDocument::default()
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "could not read source settings, starting empty");
                StoreDocument::default()
            }
        };
        Self {
            path,
            state: Mutex::new(document),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored entry for the sheet, or the default entry. Never fails.
    pub fn get(&self, file_identity: &str, sheet_name: &str) -> SourceConfigEntry {
        let key = SourceKey::new(file_identity, sheet_name).to_string();
        match self.state.lock() {
            Ok(state) => state.sources.get(&key).cloned().unwrap_or_default(),
            Err(poisoned) => poisoned
                .into_inner()
                .sources
                .get(&key)
                .cloned()
                .unwrap_or_default(),
        }
    }

    /// Upserts the entry and persists the whole store before returning.
    ///
    /// The in-memory value is only replaced once the write succeeded, so a failed `put`
    /// leaves both the file and later `get`s at the previous value.
    pub fn put(
        &self,
        file_identity: &str,
        sheet_name: &str,
        entry: SourceConfigEntry,
    ) -> Result<(), StoreError> {
        let key = SourceKey::new(file_identity, sheet_name).to_string();
        let mut state = self.state.lock().map_err(|_| StoreError::Poisoned)?;
        let mut next = state.clone();
        next.sources.insert(key.clone(), entry);
        self.persist(&next)?;
        *state = next;
        tracing::debug!(key = %key, "source settings saved");
        Ok(())
    }

    /// Moves `path` to the front of the recent list with its last sheet.
    pub fn remember_file(&self, path: &Path, sheet_name: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().map_err(|_| StoreError::Poisoned)?;
        let mut next = state.clone();
        next.recent_files.retain(|f| f.path != path);
        next.recent_files.insert(
            0,
            RecentFile {
                path: path.to_path_buf(),
                last_sheet: sheet_name.to_string(),
            },
        );
        next.recent_files.truncate(MAX_RECENT_FILES);
        self.persist(&next)?;
        *state = next;
        Ok(())
    }

    /// Recent files that still exist, most recent first. Vanished files are pruned.
    pub fn recent_files(&self) -> Result<Vec<RecentFile>, StoreError> {
        let mut state = self.state.lock().map_err(|_| StoreError::Poisoned)?;
        let existing: Vec<RecentFile> = state
            .recent_files
            .iter()
            .filter(|f| f.path.exists())
            .cloned()
            .collect();
        if existing.len() != state.recent_files.len() {
            let mut next = state.clone();
            next.recent_files = existing.clone();
            self.persist(&next)?;
            *state = next;
        }
        Ok(existing)
    }

    /// Last sheet used with `path`, if it is in the recent list.
    pub fn last_sheet(&self, path: &Path) -> Option<String> {
        let state = self.state.lock().ok()?;
        state
            .recent_files
            .iter()
            .find(|f| f.path == path)
            .map(|f| f.last_sheet.clone())
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let sources = match self.state.lock() {
            Ok(state) => state.sources.clone(),
            Err(poisoned) => poisoned.into_inner().sources.clone(),
        };
        StoreSnapshot { sources }
    }

    fn persist(&self, document: &StoreDocument) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|source| StoreError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        let content = serde_json::to_string_pretty(document)?;
        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };
        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(write_err)?;
        tmp.write_all(content.as_bytes()).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::ColumnRole;

    fn entry() -> SourceConfigEntry {
        SourceConfigEntry {
            column_map: ColumnMap::from([(ColumnRole::Room, 0), (ColumnRole::Ssid, 2)]),
            use_excel_security: true,
            use_excel_property: false,
            default_encryption: Encryption::Wep,
            default_property: Some(PropertyType::Vlev),
        }
    }

    #[test]
    fn unknown_key_reads_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = SourceConfigStore::open(dir.path().join("sources.json"));
        let got = store.get("/data/rooms.xlsx", "Sheet1");
        assert_eq!(got, SourceConfigEntry::default());
        assert!(got.column_map.is_empty());
        assert!(!got.use_excel_security && !got.use_excel_property);
        assert_eq!(got.default_encryption, Encryption::Wpa2);
        assert_eq!(got.default_property, None);
    }

    #[test]
    fn put_then_get_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("sources.json");
        let store = SourceConfigStore::open(&path);
        store.put("/data/rooms.xlsx", "Torre A", entry()).unwrap();
        assert_eq!(store.get("/data/rooms.xlsx", "Torre A"), entry());
        assert_eq!(store.get("/data/rooms.xlsx", "Torre B"), SourceConfigEntry::default());

        let reopened = SourceConfigStore::open(&path);
        assert_eq!(reopened.get("/data/rooms.xlsx", "Torre A"), entry());
    }

    #[test]
    fn last_write_wins() {
        let dir = tempfile::tempdir().unwrap();
        let store = SourceConfigStore::open(dir.path().join("sources.json"));
        store.put("f", "s", entry()).unwrap();
        let mut changed = entry();
        changed.use_excel_property = true;
        store.put("f", "s", changed.clone()).unwrap();
        assert_eq!(store.get("f", "s"), changed);
        assert_eq!(store.snapshot().len(), 1);
    }

    #[test]
    fn persisted_layout_uses_compound_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sources.json");
        let store = SourceConfigStore::open(&path);
        store.put("/data/rooms.xlsx", "Sheet1", entry()).unwrap();
        let doc: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let record = &doc["sources"]["/data/rooms.xlsx::Sheet1"];
        assert_eq!(record["column_map"]["room"], 0);
        assert_eq!(record["column_map"]["ssid"], 2);
        assert_eq!(record["use_excel_security"], true);
        assert_eq!(record["default_encryption"], "WEP");
        assert_eq!(record["default_property"], "VLEV");
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sources.json");
        fs::write(&path, "{ not json").unwrap();
        let store = SourceConfigStore::open(&path);
        assert_eq!(store.get("f", "s"), SourceConfigEntry::default());
    }

    #[test]
    fn failed_put_keeps_previous_value() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        let store = SourceConfigStore::open(blocker.join("sources.json"));
        let err = store.put("f", "s", entry()).unwrap_err();
        assert!(matches!(err, StoreError::CreateDir { .. }));
        assert_eq!(store.get("f", "s"), SourceConfigEntry::default());
    }

    #[test]
    fn recent_files_are_capped_and_pruned() {
        let dir = tempfile::tempdir().unwrap();
        let store = SourceConfigStore::open(dir.path().join("sources.json"));
        let mut files = Vec::new();
        for i in 0..7 {
            let f = dir.path().join(format!("rooms{i}.csv"));
            fs::write(&f, "Room,SSID\n").unwrap();
            store.remember_file(&f, "Sheet1").unwrap();
            files.push(f);
        }
        store.remember_file(&files[3], "Torre B").unwrap();
        let recent = store.recent_files().unwrap();
        assert_eq!(recent.len(), MAX_RECENT_FILES);
        assert_eq!(recent[0].path, files[3]);
        assert_eq!(store.last_sheet(&files[3]).as_deref(), Some("Torre B"));

        fs::remove_file(&files[6]).unwrap();
        let recent = store.recent_files().unwrap();
        assert!(recent.iter().all(|f| f.path != files[6]));
    }
}
