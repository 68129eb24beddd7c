use core::fmt::{Display, Formatter};
use serde::{Deserialize, Serialize};

/// Inclusive bounds a value must fall within to be believed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "[u64; 2]", into = "[u64; 2]")]
pub struct ValidRange {
    min: u64,
    max: u64,
}

impl ValidRange {
    /// # Panics
    ///
    /// Panics in const contexts when `min > max`.
    #[must_use]
    pub const fn new(min: u64, max: u64) -> Self {
        assert!(min <= max, "range minimum must not exceed its maximum");
        Self { min, max }
    }

    #[must_use]
    pub const fn min(self) -> u64 {
        self.min
    }

    #[must_use]
    pub const fn max(self) -> u64 {
        self.max
    }

    #[must_use]
    pub const fn contains(self, value: u64) -> bool {
        value >= self.min && value <= self.max
    }
}

impl TryFrom<[u64; 2]> for ValidRange {
    type Error = ohno::AppError;

    fn try_from([min, max]: [u64; 2]) -> Result<Self, Self::Error> {
        if min > max {
            return Err(ohno::app_err!("invalid range [{min}, {max}]: minimum exceeds maximum"));
        }

        Ok(Self { min, max })
    }
}

impl From<ValidRange> for [u64; 2] {
    fn from(range: ValidRange) -> Self {
        [range.min, range.max]
    }
}

impl Display for ValidRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_are_inclusive() {
        let range = ValidRange::new(1_001, 999_999_999);
        assert!(!range.contains(1_000));
        assert!(range.contains(1_001));
        assert!(range.contains(999_999_999));
        assert!(!range.contains(1_000_000_000));
    }

    #[test]
    fn deserializes_from_pair() {
        let range: ValidRange = serde_json::from_str("[0, 100]").unwrap();
        assert_eq!(range, ValidRange::new(0, 100));
    }

    #[test]
    fn rejects_inverted_pair() {
        let _ = serde_json::from_str::<ValidRange>("[10, 1]").unwrap_err();
    }

    #[test]
    fn display() {
        assert_eq!(ValidRange::new(1, 2).to_string(), "[1, 2]");
    }
}
