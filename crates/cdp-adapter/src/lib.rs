//! Browser driver port.
//!
//! The engine never talks to a concrete automation backend. It drives pages
//! through the [`Browser`], [`Page`] and [`ElementHandle`] traits defined here;
//! real backends implement them out of tree while [`fixture`] offers an
//! in-memory page for tests and dry runs.

pub mod dom;
pub mod fixture;
pub mod page;

pub mod error {
    use serde::{Deserialize, Serialize};
    use std::fmt;
    use thiserror::Error;

    /// Error taxonomy surfaced by driver implementations.
    #[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
    pub enum AdapterErrorKind {
        #[error("browser not started")]
        NotStarted,
        #[error("browser launch failed")]
        LaunchFailed,
        #[error("navigation timed out")]
        NavTimeout,
        #[error("driver i/o failure")]
        DriverIo,
        #[error("target element not found")]
        TargetNotFound,
        #[error("element not interactable")]
        NotInteractable,
        #[error("option not found")]
        OptionNotFound,
        #[error("invalid selector")]
        InvalidSelector,
        #[error("internal error")]
        Internal,
    }

    /// Enriched error metadata passed back to higher layers.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct AdapterError {
        pub kind: AdapterErrorKind,
        pub hint: Option<String>,
        pub retriable: bool,
    }

    impl fmt::Display for AdapterError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.kind)?;
            if let Some(hint) = &self.hint {
                write!(f, ": {}", hint)?;
            }
            Ok(())
        }
    }

    impl std::error::Error for AdapterError {}

    impl AdapterError {
        pub fn new(kind: AdapterErrorKind) -> Self {
            Self {
                kind,
                hint: None,
                retriable: false,
            }
        }

        pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
            self.hint = Some(hint.into());
            self
        }

        pub fn retriable(mut self, flag: bool) -> Self {
            self.retriable = flag;
            self
        }

        /// Lifecycle failures (launch, not started) are fatal to a run.
        pub fn is_lifecycle(&self) -> bool {
            matches!(
                self.kind,
                AdapterErrorKind::NotStarted | AdapterErrorKind::LaunchFailed
            )
        }
    }
}

pub use dom::{simplify_dom, MAX_DOM_CHARS};
pub use error::{AdapterError, AdapterErrorKind};
pub use page::{dom_snapshot, Browser, Element, ElementHandle, Page};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_includes_hint() {
        let err = AdapterError::new(AdapterErrorKind::TargetNotFound).with_hint("#missing");
        assert_eq!(err.to_string(), "target element not found: #missing");
        assert!(!err.retriable);
        assert!(!err.is_lifecycle());
        assert!(AdapterError::new(AdapterErrorKind::NotStarted).is_lifecycle());
    }
}
