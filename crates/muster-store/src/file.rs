//! Whole-file JSON persistence with atomic replace.

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// A JSON document on disk, always rewritten in full.
#[derive(Debug, Clone)]
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    /// Bind to a path. Nothing is read or created yet.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the document. Returns `None` if the file is missing.
    pub fn read<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        match std::fs::read_to_string(&self.path) {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the document with `value`.
    ///
    /// Writes a temp file in the same directory, syncs it, then renames it
    /// over the target.
    pub fn write<T: Serialize>(&self, value: &T) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, value)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Move an unreadable document aside to `<name>.corrupt`.
    pub fn quarantine(&self) -> Result<PathBuf> {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".corrupt");
        let target = PathBuf::from(name);
        std::fs::rename(&self.path, &target)?;
        tracing::warn!("Moved unreadable store file {:?} to {:?}", self.path, target);
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    #[test]
    fn missing_file_reads_none() {
        let dir = tempdir().unwrap();
        let file = JsonFile::new(dir.path().join("absent.json"));
        let value: Option<BTreeMap<String, String>> = file.read().unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn write_then_read() {
        let dir = tempdir().unwrap();
        let file = JsonFile::new(dir.path().join("nested").join("doc.json"));

        let mut doc = BTreeMap::new();
        doc.insert("S1".to_string(), "p1".to_string());
        file.write(&doc).unwrap();

        let loaded: BTreeMap<String, String> = file.read().unwrap().unwrap();
        assert_eq!(loaded, doc);
    }

    #[test]
    fn rewrite_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let file = JsonFile::new(dir.path().join("doc.json"));

        file.write(&vec![1, 2, 3]).unwrap();
        file.write(&vec![4]).unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
        let loaded: Vec<i32> = file.read().unwrap().unwrap();
        assert_eq!(loaded, vec![4]);
    }

    #[test]
    fn quarantine_renames() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("teams.json");
        std::fs::write(&path, "{broken").unwrap();

        let file = JsonFile::new(&path);
        assert!(file.read::<BTreeMap<String, String>>().is_err());

        let moved = file.quarantine().unwrap();
        assert!(!path.exists());
        assert!(moved.ends_with("teams.json.corrupt"));
    }
}
