//! Whole-file JSON document persistence.
//!
//! Every store owns exactly one [`JsonDocument`] and rewrites it in full
//! on every mutation.  That is a deliberate simplicity/durability
//! trade-off for single-small-business data volumes; an embedded
//! key-value store could replace this behind the same load/save contract
//! without touching any calling store.
//!
//! Failure policy: `load` never errors (absent, unreadable, or corrupt
//! files yield the default value), and `save` swallows OS-level write
//! errors after logging them — a transient disk problem must not fail a
//! request.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

/// A single JSON document at a fixed path.
#[derive(Debug, Clone)]
pub struct JsonDocument {
    path: PathBuf,
}

impl JsonDocument {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and deserialize the document, falling back to `T::default()`
    /// when the file is missing, unreadable, or not valid JSON for `T`.
    pub fn load<T: DeserializeOwned + Default>(&self) -> T {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return T::default(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read document");
                return T::default();
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "corrupt document, using default");
                T::default()
            }
        }
    }

    /// Serialize `value` with stable pretty indentation and write it via
    /// a sibling temp file + rename, so readers never observe a torn
    /// document.  Errors are logged and swallowed.
    pub fn save<T: Serialize>(&self, value: &T) {
        let json = match serde_json::to_vec_pretty(value) {
            Ok(json) => json,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to serialize document");
                return;
            }
        };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = fs::create_dir_all(parent) {
                    warn!(path = %parent.display(), error = %e, "failed to create data directory");
                    return;
                }
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        if let Err(e) = fs::write(&tmp, &json) {
            warn!(path = %tmp.display(), error = %e, "failed to write document");
            return;
        }
        if let Err(e) = fs::rename(&tmp, &self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to replace document");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn missing_file_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let doc = JsonDocument::new(dir.path().join("absent.json"));
        let value: BTreeMap<String, u32> = doc.load();
        assert!(value.is_empty());
    }

    #[test]
    fn corrupt_file_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, b"{not json").unwrap();
        let doc = JsonDocument::new(&path);
        let value: Vec<String> = doc.load();
        assert!(value.is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let doc = JsonDocument::new(dir.path().join("kv.json"));
        let mut value = BTreeMap::new();
        value.insert("a".to_owned(), 1u32);
        value.insert("b".to_owned(), 2u32);
        doc.save(&value);
        let reloaded: BTreeMap<String, u32> = doc.load();
        assert_eq!(reloaded, value);
    }

    #[test]
    fn save_creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let doc = JsonDocument::new(dir.path().join("nested/deeper/doc.json"));
        doc.save(&vec![1u8, 2, 3]);
        let reloaded: Vec<u8> = doc.load();
        assert_eq!(reloaded, vec![1, 2, 3]);
    }
}
