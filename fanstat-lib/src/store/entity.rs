use crate::metrics::{MetricFamily, Source};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A named subject (an artist) whose metrics are tracked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,

    /// Per-source identifiers (username, artist ID, performer path).
    #[serde(default)]
    pub identifiers: BTreeMap<Source, String>,

    /// Last stored value for each family.
    #[serde(default)]
    pub metrics: BTreeMap<MetricFamily, u64>,

    /// Primary genre reported by Spotify.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,

    /// Diagnostic recorded by the last refresh, `None` when it fully succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Entity {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_identifier(mut self, source: Source, identifier: impl Into<String>) -> Self {
        let _ = self.identifiers.insert(source, identifier.into());
        self
    }

    /// The stored identifier for `source`, ignoring blank values.
    #[must_use]
    pub fn identifier(&self, source: Source) -> Option<&str> {
        self.identifiers.get(&source).map(String::as_str).filter(|id| !id.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_identifier_counts_as_missing() {
        let entity = Entity::new("Nova").with_identifier(Source::Instagram, "  ");
        assert_eq!(entity.identifier(Source::Instagram), None);
        assert_eq!(entity.identifier(Source::Twitter), None);

        let entity = entity.with_identifier(Source::Instagram, "novaofficial");
        assert_eq!(entity.identifier(Source::Instagram), Some("novaofficial"));
    }

    #[test]
    fn serialized_maps_use_keys() {
        let mut entity = Entity::new("Echo").with_identifier(Source::Spotify, "abc123");
        let _ = entity.metrics.insert(MetricFamily::SpotifyPopularity, 71);

        let json = serde_json::to_value(&entity).unwrap();
        assert_eq!(json["identifiers"]["spotify"], "abc123");
        assert_eq!(json["metrics"]["spotify_popularity"], 71);
        assert!(json.get("last_error").is_none());
    }
}
