use core::fmt::{Display, Formatter};

/// Result of resolving one family for one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    /// A value within the family's valid range was found.
    Resolved(u64),

    /// No identifier, or every strategy came up empty without an error.
    NotFound,

    /// At least one strategy failed and none produced a value; carries the last error.
    Failed(String),
}

impl ResolutionOutcome {
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    #[must_use]
    pub const fn value(&self) -> Option<u64> {
        match self {
            Self::Resolved(value) => Some(*value),
            _ => None,
        }
    }

    /// Reason recorded in diagnostics, `None` for a resolved family.
    #[must_use]
    pub fn failure_reason(&self) -> Option<String> {
        match self {
            Self::Resolved(_) => None,
            Self::NotFound => Some("not found".to_string()),
            Self::Failed(reason) => Some(reason.clone()),
        }
    }
}

impl Display for ResolutionOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Resolved(value) => write!(f, "{value}"),
            Self::NotFound => f.write_str("not found"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// The browsing session became unusable; the current entity's run must stop.
#[derive(Debug)]
pub struct SessionFatal(pub ohno::AppError);

impl Display for SessionFatal {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_only_when_resolved() {
        assert_eq!(ResolutionOutcome::Resolved(42).value(), Some(42));
        assert_eq!(ResolutionOutcome::NotFound.value(), None);
        assert_eq!(ResolutionOutcome::Failed("boom".into()).value(), None);
    }

    #[test]
    fn failure_reasons() {
        assert_eq!(ResolutionOutcome::Resolved(1).failure_reason(), None);
        assert_eq!(ResolutionOutcome::NotFound.failure_reason().as_deref(), Some("not found"));
        assert_eq!(ResolutionOutcome::Failed("HTTP 500".into()).failure_reason().as_deref(), Some("HTTP 500"));
    }

    #[test]
    fn display() {
        assert_eq!(ResolutionOutcome::Resolved(154_200).to_string(), "154200");
        assert_eq!(ResolutionOutcome::Failed("x".into()).to_string(), "failed: x");
    }
}
