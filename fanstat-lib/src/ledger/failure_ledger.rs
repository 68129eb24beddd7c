use super::diagnostic;
use crate::Result;
use crate::file_lock::{FileLockGuard, acquire_lock};
use crate::metrics::MetricFamily;
use ohno::IntoAppError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

const LOG_TARGET: &str = "    ledger";

/// One entity with unresolved families.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    #[serde(alias = "Artist")]
    pub entity: String,

    #[serde(alias = "Details")]
    pub diagnostic: String,
}

impl LedgerEntry {
    #[must_use]
    pub fn new(entity: impl Into<String>, diagnostic: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            diagnostic: diagnostic.into(),
        }
    }

    /// The families named by the diagnostic, with their recorded reasons.
    #[must_use]
    pub fn failed_families(&self) -> BTreeMap<MetricFamily, String> {
        diagnostic::parse(&self.diagnostic)
    }
}

/// Durable record of entities whose last run left families unresolved.
///
/// The ledger is a CSV file with an `entity,diagnostic` header, at most one row per
/// entity. Every write replaces the whole file atomically. Writers coordinate
/// through the lock returned by [`Self::lock`]; [`Self::append`] takes it itself.
#[derive(Debug, Clone)]
pub struct FailureLedger {
    path: PathBuf,
}

impl FailureLedger {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Hold the ledger's exclusive lock until the guard is dropped.
    pub async fn lock(&self) -> Result<FileLockGuard> {
        acquire_lock(&self.path).await
    }

    /// All entries in file order; a missing ledger has none.
    pub fn load(&self) -> Result<Vec<LedgerEntry>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).into_app_err_with(|| format!("opening failure ledger '{}'", self.path.display())),
        };

        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(file);
        reader
            .deserialize()
            .collect::<core::result::Result<Vec<LedgerEntry>, _>>()
            .into_app_err_with(|| format!("reading failure ledger '{}'", self.path.display()))
    }

    /// Record `entry`, replacing the row of the same entity in place if there is one.
    pub async fn append(&self, entry: LedgerEntry) -> Result<()> {
        let _guard = self.lock().await?;

        let mut entries = self.load()?;
        if let Some(existing) = entries.iter_mut().find(|e| e.entity == entry.entity) {
            log::debug!(target: LOG_TARGET, "Replacing ledger entry for '{}'", entry.entity);
            *existing = entry;
        } else {
            log::debug!(target: LOG_TARGET, "Adding ledger entry for '{}'", entry.entity);
            entries.push(entry);
        }

        self.write(&entries)
    }

    /// Replace the whole ledger; an empty list removes the file.
    ///
    /// The caller is expected to hold [`Self::lock`].
    pub fn replace_all(&self, entries: &[LedgerEntry]) -> Result<()> {
        if entries.is_empty() {
            return self.clear();
        }
        self.write(entries)
    }

    /// Remove the ledger file.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                log::info!(target: LOG_TARGET, "Removed empty failure ledger '{}'", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).into_app_err_with(|| format!("removing failure ledger '{}'", self.path.display())),
        }
    }

    fn write(&self, entries: &[LedgerEntry]) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).into_app_err_with(|| format!("creating directory '{}'", dir.display()))?;

        let mut temp =
            tempfile::NamedTempFile::new_in(dir).into_app_err_with(|| format!("creating temporary file in '{}'", dir.display()))?;
        {
            let mut writer = csv::Writer::from_writer(temp.as_file_mut());
            for entry in entries {
                writer
                    .serialize(entry)
                    .into_app_err_with(|| format!("writing failure ledger '{}'", self.path.display()))?;
            }
            writer
                .flush()
                .into_app_err_with(|| format!("flushing failure ledger '{}'", self.path.display()))?;
        }

        let _ = temp
            .persist(&self.path)
            .into_app_err_with(|| format!("replacing failure ledger '{}'", self.path.display()))?;
        Ok(())
    }
}
