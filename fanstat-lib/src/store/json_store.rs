use super::{Entity, EntityStore};
use crate::Result;
use crate::file_lock::acquire_lock;
use crate::metrics::{MetricFamily, Source};
use async_trait::async_trait;
use chrono::Utc;
use ohno::{IntoAppError, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

const LOG_TARGET: &str = "     store";

/// On-disk layout of the store.
#[derive(Debug, Default, Deserialize, Serialize)]
struct Document {
    #[serde(default)]
    entities: BTreeMap<String, Entity>,
}

/// An [`EntityStore`] backed by a single JSON file.
///
/// Every mutation is a locked read-modify-write that replaces the file atomically,
/// so readers never observe a half-written document.
#[derive(Debug, Clone)]
pub struct JsonEntityStore {
    path: PathBuf,
}

impl JsonEntityStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All entities in name order.
    pub async fn list(&self) -> Result<Vec<Entity>> {
        let _guard = acquire_lock(&self.path).await?;
        Ok(self.load()?.entities.into_values().collect())
    }

    /// Register an entity, or merge identifiers into an existing one.
    ///
    /// Returns `true` when the entity did not exist before.
    pub async fn upsert(&self, name: &str, identifiers: &BTreeMap<Source, String>) -> Result<bool> {
        let name = name.trim();
        if name.is_empty() {
            bail!("entity name must not be empty");
        }

        self.modify(|doc| {
            let created = !doc.entities.contains_key(name);
            let entity = doc.entities.entry(name.to_string()).or_insert_with(|| Entity::new(name));
            entity.identifiers.extend(identifiers.iter().map(|(source, id)| (*source, id.clone())));
            Ok(created)
        })
        .await
    }

    async fn modify<T>(&self, f: impl FnOnce(&mut Document) -> Result<T> + Send) -> Result<T> {
        let _guard = acquire_lock(&self.path).await?;
        let mut doc = self.load()?;
        let result = f(&mut doc)?;
        self.save(&doc)?;
        Ok(result)
    }

    fn load(&self) -> Result<Document> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!(target: LOG_TARGET, "No store at '{}', starting empty", self.path.display());
                return Ok(Document::default());
            }
            Err(e) => return Err(e).into_app_err_with(|| format!("opening entity store '{}'", self.path.display())),
        };

        serde_json::from_reader(BufReader::new(file)).into_app_err_with(|| format!("parsing entity store '{}'", self.path.display()))
    }

    fn save(&self, doc: &Document) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).into_app_err_with(|| format!("creating directory '{}'", dir.display()))?;

        let temp = tempfile::NamedTempFile::new_in(dir).into_app_err_with(|| format!("creating temporary file in '{}'", dir.display()))?;
        {
            let mut writer = BufWriter::new(temp.as_file());

            #[cfg(debug_assertions)]
            let result = serde_json::to_writer_pretty(&mut writer, doc);
            #[cfg(not(debug_assertions))]
            let result = serde_json::to_writer(&mut writer, doc);

            result.into_app_err_with(|| format!("writing entity store '{}'", self.path.display()))?;
            writer
                .flush()
                .into_app_err_with(|| format!("flushing entity store '{}'", self.path.display()))?;
        }

        let _ = temp
            .persist(&self.path)
            .into_app_err_with(|| format!("replacing entity store '{}'", self.path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl EntityStore for JsonEntityStore {
    async fn get_entity(&self, name: &str) -> Result<Option<Entity>> {
        let _guard = acquire_lock(&self.path).await?;
        Ok(self.load()?.entities.remove(name))
    }

    async fn update_metrics(&self, name: &str, values: &BTreeMap<MetricFamily, u64>, diagnostic: Option<&str>) -> Result<()> {
        self.modify(|doc| {
            let Some(entity) = doc.entities.get_mut(name) else {
                bail!("entity '{name}' is not in the store");
            };

            entity.metrics.extend(values.iter().map(|(family, value)| (*family, *value)));
            entity.last_error = diagnostic.map(ToString::to_string);
            entity.updated_at = Some(Utc::now());
            Ok(())
        })
        .await?;

        log::debug!(target: LOG_TARGET, "Stored {} value(s) for '{name}'", values.len());
        Ok(())
    }

    async fn update_identifiers(&self, name: &str, identifiers: &BTreeMap<Source, String>) -> Result<()> {
        self.modify(|doc| {
            let Some(entity) = doc.entities.get_mut(name) else {
                bail!("entity '{name}' is not in the store");
            };

            entity.identifiers.extend(identifiers.iter().map(|(source, id)| (*source, id.clone())));
            Ok(())
        })
        .await
    }

    async fn update_genre(&self, name: &str, genre: &str) -> Result<()> {
        self.modify(|doc| {
            let Some(entity) = doc.entities.get_mut(name) else {
                bail!("entity '{name}' is not in the store");
            };

            entity.genre = Some(genre.to_string());
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> JsonEntityStore {
        JsonEntityStore::new(dir.path().join("entities.json"))
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    async fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        assert!(store.list().await.unwrap().is_empty());
        assert_eq!(store.get_entity("Nova").await.unwrap(), None);
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    async fn upsert_merges_identifiers() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let ids = BTreeMap::from([(Source::Instagram, "novaofficial".to_string())]);
        assert!(store.upsert("Nova", &ids).await.unwrap());

        let ids = BTreeMap::from([(Source::Spotify, "4abc".to_string())]);
        assert!(!store.upsert("Nova", &ids).await.unwrap());

        let nova = store.get_entity("Nova").await.unwrap().unwrap();
        assert_eq!(nova.identifier(Source::Instagram), Some("novaofficial"));
        assert_eq!(nova.identifier(Source::Spotify), Some("4abc"));
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    async fn upsert_rejects_blank_name() {
        let dir = tempfile::tempdir().unwrap();
        let _ = store_in(&dir).upsert("   ", &BTreeMap::new()).await.unwrap_err();
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    async fn update_metrics_keeps_untouched_families_and_overwrites_diagnostic() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let _ = store.upsert("Echo", &BTreeMap::new()).await.unwrap();

        let first = BTreeMap::from([(MetricFamily::InstagramFollowers, 10), (MetricFamily::TwitterFollowers, 20)]);
        store
            .update_metrics("Echo", &first, Some("stubhub_favorites: not found"))
            .await
            .unwrap();

        let second = BTreeMap::from([(MetricFamily::TwitterFollowers, 25)]);
        store.update_metrics("Echo", &second, None).await.unwrap();

        let echo = store.get_entity("Echo").await.unwrap().unwrap();
        assert_eq!(echo.metrics.get(&MetricFamily::InstagramFollowers), Some(&10));
        assert_eq!(echo.metrics.get(&MetricFamily::TwitterFollowers), Some(&25));
        assert_eq!(echo.last_error, None);
        assert!(echo.updated_at.is_some());
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    async fn updates_for_unknown_entity_fail() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let _ = store.update_metrics("Ghost", &BTreeMap::new(), None).await.unwrap_err();
        let _ = store.update_identifiers("Ghost", &BTreeMap::new()).await.unwrap_err();
        let _ = store.update_genre("Ghost", "pop").await.unwrap_err();
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    async fn genre_survives_metric_updates() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let _ = store.upsert("Echo", &BTreeMap::new()).await.unwrap();

        store.update_genre("Echo", "indie folk").await.unwrap();
        store
            .update_metrics("Echo", &BTreeMap::from([(MetricFamily::SpotifyPopularity, 61)]), None)
            .await
            .unwrap();

        let echo = store.get_entity("Echo").await.unwrap().unwrap();
        assert_eq!(echo.genre.as_deref(), Some("indie folk"));
        assert_eq!(echo.metrics.get(&MetricFamily::SpotifyPopularity), Some(&61));
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "{ not json").unwrap();

        let _ = store.get_entity("Nova").await.unwrap_err();
    }
}
