//! Registrations persisted in a single JSON config-entries file.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::registration::{BirthEdit, BirthdayStore, MemoryStore, Registration, RegistrationForm};

const FILE_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct EntriesFile {
    version: u32,
    entries: Vec<Registration>,
}

/// A [`MemoryStore`] that rewrites its backing file after every successful
/// mutation. A mutation whose write fails is not applied.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl JsonFileStore {
    /// Loads `path`, or starts empty when the file does not exist yet.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let inner = if path.exists() {
            let content = fs::read_to_string(&path)?;
            let file: EntriesFile = serde_json::from_str(&content)?;
            if file.version != FILE_VERSION {
                tracing::warn!(
                    "Entries file {} has version {}, expected {}",
                    path.display(),
                    file.version,
                    FILE_VERSION
                );
            }
            tracing::debug!("Loaded {} entries from {}", file.entries.len(), path.display());
            MemoryStore::from_entries(file.entries)
        } else {
            tracing::debug!("No entries file at {}, starting empty", path.display());
            MemoryStore::new()
        };

        Ok(Self { path, inner })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, entries: &[Registration]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = EntriesFile {
            version: FILE_VERSION,
            entries: entries.to_vec(),
        };
        fs::write(&self.path, serde_json::to_string_pretty(&file)?)?;
        Ok(())
    }

    /// Applies `change` to a copy of the entries and keeps it only once the
    /// file has been written.
    fn commit<T>(&mut self, change: impl FnOnce(&mut MemoryStore) -> Result<T>) -> Result<T> {
        let mut next = self.inner.clone();
        let out = change(&mut next)?;
        self.save(next.entries()).inspect_err(|e| {
            tracing::error!("Failed to write {}: {}", self.path.display(), e);
        })?;
        self.inner = next;
        Ok(out)
    }
}

impl BirthdayStore for JsonFileStore {
    fn register(&mut self, form: &RegistrationForm, today: NaiveDate) -> Result<Registration> {
        self.commit(|entries| entries.register(form, today))
    }

    fn update(&mut self, id: &str, edit: &BirthEdit, today: NaiveDate) -> Result<Registration> {
        self.commit(|entries| entries.update(id, edit, today))
    }

    fn remove(&mut self, id: &str) -> Result<Registration> {
        self.commit(|entries| entries.remove(id))
    }

    fn list(&self) -> Vec<Registration> {
        self.inner.list()
    }
}
