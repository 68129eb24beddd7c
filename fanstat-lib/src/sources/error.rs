use core::fmt::{Display, Formatter};

/// Failure reported by a capability or a resolution strategy.
#[derive(Debug)]
pub enum SourceError {
    /// Bad status, malformed response, missing element. The next strategy may do better.
    Transient(ohno::AppError),

    /// The browsing session is unusable (hung or unreachable). Nothing further in the
    /// current run should touch it.
    SessionFatal(ohno::AppError),
}

impl SourceError {
    #[must_use]
    pub const fn is_session_fatal(&self) -> bool {
        matches!(self, Self::SessionFatal(_))
    }
}

impl From<ohno::AppError> for SourceError {
    fn from(e: ohno::AppError) -> Self {
        Self::Transient(e)
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Transient(e) => Display::fmt(e, f),
            Self::SessionFatal(e) => {
                f.write_str("browser session failure: ")?;
                Display::fmt(e, f)
            }
        }
    }
}

impl core::error::Error for SourceError {}
