use super::{Source, ValidRange};
use core::str::FromStr;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// One category of count resolved for an entity.
///
/// The variant order is the family-stable order: families are resolved, stored and
/// reported in this order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum MetricFamily {
    /// Instagram follower count
    InstagramFollowers,

    /// Twitter/X follower count
    TwitterFollowers,

    /// Spotify artist follower total
    SpotifyFollowers,

    /// Spotify monthly listeners
    SpotifyListeners,

    /// Spotify popularity score (0..=100)
    SpotifyPopularity,

    /// StubHub performer favorites
    StubhubFavorites,
}

impl MetricFamily {
    /// The platform that owns this family.
    #[must_use]
    pub const fn source(self) -> Source {
        match self {
            Self::InstagramFollowers => Source::Instagram,
            Self::TwitterFollowers => Source::Twitter,
            Self::SpotifyFollowers | Self::SpotifyListeners | Self::SpotifyPopularity => Source::Spotify,
            Self::StubhubFavorites => Source::Stubhub,
        }
    }

    /// Stable snake_case key used in configuration, diagnostics and the CLI.
    #[must_use]
    pub fn key(self) -> &'static str {
        self.into()
    }

    /// Range used when the configuration does not override it.
    #[must_use]
    pub const fn default_range(self) -> ValidRange {
        match self {
            Self::InstagramFollowers | Self::SpotifyListeners | Self::SpotifyFollowers => ValidRange::new(1, 1_999_999_999),
            Self::TwitterFollowers => ValidRange::new(1, 299_999_999),
            Self::SpotifyPopularity => ValidRange::new(0, 100),
            Self::StubhubFavorites => ValidRange::new(1, 99_999_999),
        }
    }

    /// All families in family-stable order.
    pub fn all() -> impl Iterator<Item = Self> {
        Self::iter()
    }

    /// Parse a family from its key, returning `None` for anything else.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::from_str(key.trim()).ok()
    }
}
