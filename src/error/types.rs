use thiserror::Error;

/// Unified result type for the spatial navigation crate.
pub type Result<T> = std::result::Result<T, NavError>;

/// Errors surfaced by the navigation engine.
///
/// Registration and configuration failures are returned to the caller and
/// leave the context untouched. Navigation failures (`NoOrigin`,
/// `NoCandidate`, `Canceled`, `Blocked`, `Paused`) are expected
/// outcomes; the boolean API folds them into `false`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavError {
    #[error("element `{0}` is already registered")]
    DuplicateElement(String),
    #[error("section `{0}` already exists")]
    DuplicateSection(String),
    #[error("section `{0}` not found")]
    UnknownSection(String),
    #[error("element `{0}` not found")]
    UnknownElement(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("no origin element to navigate from")]
    NoOrigin,
    #[error("no candidate in that direction")]
    NoCandidate,
    #[error("navigation canceled by `{0}` listener")]
    Canceled(&'static str),
    #[error("navigation blocked by leave-for rule")]
    Blocked,
    #[error("navigation is paused")]
    Paused,
}

impl NavError {
    /// True for the recoverable "nothing happened" outcomes of `move`/`focus`.
    pub fn is_navigation_failure(&self) -> bool {
        matches!(
            self,
            NavError::NoOrigin
                | NavError::NoCandidate
                | NavError::Canceled(_)
                | NavError::Blocked
                | NavError::Paused
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_navigation_failures() {
        assert!(NavError::NoCandidate.is_navigation_failure());
        assert!(NavError::Canceled("sn:willfocus").is_navigation_failure());
        assert!(!NavError::UnknownSection("menu".into()).is_navigation_failure());
        assert!(!NavError::DuplicateElement("a".into()).is_navigation_failure());
    }

    #[test]
    fn messages_name_the_offender() {
        let err = NavError::UnknownSection("sidebar".into());
        assert_eq!(err.to_string(), "section `sidebar` not found");
    }
}
