//! Persistence for entities and their metrics
//!
//! The resolution pipeline only talks to the [`EntityStore`] trait. fanstat ships
//! with [`JsonEntityStore`], a single JSON document guarded by an advisory lock, but
//! any backend that can answer the calls below can stand in for it.

mod entity;
mod json_store;

pub use entity::Entity;
pub use json_store::JsonEntityStore;

use crate::Result;
use crate::metrics::{MetricFamily, Source};
use async_trait::async_trait;
use core::fmt::Debug;
use std::collections::BTreeMap;

/// Gateway to wherever entities live.
#[async_trait]
pub trait EntityStore: Send + Sync + Debug {
    /// Fetch an entity by name, `None` when the store does not know it.
    async fn get_entity(&self, name: &str) -> Result<Option<Entity>>;

    /// Store new values for the given families and record the diagnostic.
    ///
    /// Families absent from `values` keep their previous value. The diagnostic is
    /// always overwritten, so `None` clears an earlier failure.
    async fn update_metrics(&self, name: &str, values: &BTreeMap<MetricFamily, u64>, diagnostic: Option<&str>) -> Result<()>;

    /// Record newly discovered source identifiers.
    async fn update_identifiers(&self, name: &str, identifiers: &BTreeMap<Source, String>) -> Result<()>;

    /// Record the entity's genre.
    async fn update_genre(&self, name: &str, genre: &str) -> Result<()>;
}
