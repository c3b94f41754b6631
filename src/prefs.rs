//! # Persisted Preferences
//!
//! A flat key/value store backed by a single JSON object file. Both the
//! configuration (base URL, paper width, ...) and the dedup state (the seen
//! identifier lists) live here.
//!
//! Every write goes to disk synchronously before returning. The file is
//! replaced atomically (write to a sibling temp file, then rename), so a
//! crash mid-write leaves the previous contents intact.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde_json::{Map, Value};

use crate::error::RelayError;

/// File name inside the configuration directory.
pub const PREFS_FILE: &str = "prefs.json";

/// Default preferences location: `<config dir>/kds-relay/prefs.json`.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("kds-relay").join(PREFS_FILE))
}

/// Key/value preferences, optionally persisted to a file.
pub struct Preferences {
    path: Option<PathBuf>,
    values: Mutex<Map<String, Value>>,
}

impl Preferences {
    /// Open (or lazily create) a preferences file.
    ///
    /// A missing file starts out empty; it is created on the first write.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RelayError> {
        let path = path.as_ref().to_path_buf();
        let values = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => Map::new(),
            Ok(contents) => match serde_json::from_str::<Value>(&contents)? {
                Value::Object(map) => map,
                _ => {
                    return Err(RelayError::Config(format!(
                        "{} does not contain a JSON object",
                        path.display()
                    )));
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path: Some(path),
            values: Mutex::new(values),
        })
    }

    /// Preferences that are never written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            values: Mutex::new(Map::new()),
        }
    }

    /// Directory holding the preferences file, if persisted.
    pub fn dir(&self) -> Option<&Path> {
        self.path.as_deref().and_then(Path::parent)
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.lock().get(key).cloned()
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        match self.values.lock().get(key) {
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        }
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        match self.values.lock().get(key) {
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.values.lock().get(key) {
            Some(Value::Bool(b)) => Some(*b),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Set one key and persist.
    pub fn put(&self, key: &str, value: impl Into<Value>) -> Result<(), RelayError> {
        self.put_all([(key, value.into())])
    }

    /// Set several keys and persist them in a single write.
    pub fn put_all<'a, I>(&self, entries: I) -> Result<(), RelayError>
    where
        I: IntoIterator<Item = (&'a str, Value)>,
    {
        let mut values = self.values.lock();
        for (key, value) in entries {
            values.insert(key.to_string(), value);
        }
        self.persist(&values)
    }

    /// Remove a key and persist.
    pub fn remove(&self, key: &str) -> Result<(), RelayError> {
        let mut values = self.values.lock();
        if values.remove(key).is_some() {
            self.persist(&values)?;
        }
        Ok(())
    }

    /// Write the map to disk. Called with the lock held so writes never
    /// interleave.
    fn persist(&self, values: &Map<String, Value>) -> Result<(), RelayError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let tmp = path.with_extension("json.tmp");
        let contents = serde_json::to_vec_pretty(values)?;
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = Preferences::open(dir.path().join("prefs.json")).unwrap();
        assert_eq!(prefs.get("base_url"), None);
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("prefs.json");

        let prefs = Preferences::open(&path).unwrap();
        prefs.put("base_url", "https://kitchen.example").unwrap();
        prefs
            .put_all([("paper_width_mm", Value::from(80)), ("sound_enabled", Value::from(false))])
            .unwrap();
        drop(prefs);

        let prefs = Preferences::open(&path).unwrap();
        assert_eq!(
            prefs.get_string("base_url").as_deref(),
            Some("https://kitchen.example")
        );
        assert_eq!(prefs.get_i64("paper_width_mm"), Some(80));
        assert_eq!(prefs.get_bool("sound_enabled"), Some(false));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_string_values_coerce() {
        let prefs = Preferences::in_memory();
        prefs.put("polling_interval_seconds", "30").unwrap();
        prefs.put("use_vendor_printer", "false").unwrap();
        assert_eq!(prefs.get_i64("polling_interval_seconds"), Some(30));
        assert_eq!(prefs.get_bool("use_vendor_printer"), Some(false));
    }

    #[test]
    fn test_rejects_non_object_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(matches!(
            Preferences::open(&path),
            Err(RelayError::Config(_))
        ));
    }

    #[test]
    fn test_remove() {
        let prefs = Preferences::in_memory();
        prefs.put("printer_mac", "00:11:22:33:44:55").unwrap();
        prefs.remove("printer_mac").unwrap();
        assert_eq!(prefs.get_string("printer_mac"), None);
    }
}
