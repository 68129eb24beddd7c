use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// A platform that owns one or more metric families.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumIter, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Source {
    Instagram,
    Twitter,
    Spotify,
    Stubhub,
}

impl Source {
    /// Human-readable platform name used in log and console output.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Instagram => "Instagram",
            Self::Twitter => "Twitter",
            Self::Spotify => "Spotify",
            Self::Stubhub => "StubHub",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;

    #[test]
    fn keys_are_snake_case() {
        assert_eq!(Source::Stubhub.to_string(), "stubhub");
        assert_eq!(Source::from_str("instagram").unwrap(), Source::Instagram);
    }

    #[test]
    fn serde_uses_keys() {
        let json = serde_json::to_string(&Source::Twitter).unwrap();
        assert_eq!(json, "\"twitter\"");
    }
}
