//! Navigation outcomes and reported failures.
//!
//! Navigation calls never panic and never return `Err`. Every call to
//! [`MicroRouter::push`](crate::MicroRouter::push) and friends returns a
//! [`NavigationResult`]:
//!
//! - [`NavigationResult::Navigated`]: a virtual or real history stack was
//!   mutated.
//! - [`NavigationResult::Unchanged`]: the resolved full path equals the
//!   current one, nothing happened.
//! - [`NavigationResult::Failed`]: the request was rejected and logged; the
//!   router stays usable and the caller may reissue a corrected request.
//!
//! Guard panics are not part of this taxonomy. A panicking before-guard
//! unwinds through the navigation call; a panicking after-guard unwinds
//! through whoever drains the idle queue. Guard errors are the guard
//! author's responsibility.
//!
//! # Examples
//!
//! ```
//! use micro_navigator::{NavigationError, NavigationResult};
//!
//! let failed = NavigationResult::Failed(NavigationError::UnknownApplication {
//!     operation: "push",
//!     name: "orders".into(),
//! });
//! assert!(failed.is_failed());
//! assert_eq!(
//!     failed.error().unwrap().to_string(),
//!     "push: unknown application 'orders'"
//! );
//! ```

use crate::host::HistoryMethod;
use std::fmt;

/// Which location was driven by a navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationChannel {
    /// The application's sandboxed virtual history.
    Virtual,
    /// The host document's real URL and history stack.
    Host,
}

/// Outcome of a navigation request.
#[derive(Debug, Clone, PartialEq)]
pub enum NavigationResult {
    /// A history stack was mutated.
    Navigated {
        /// Target application.
        app: String,
        /// Full path written to the history stack.
        full_path: String,
        /// `pushState` or `replaceState`.
        method: HistoryMethod,
        /// Which location was driven.
        channel: NavigationChannel,
    },
    /// Requested path equals the current one; no mutation, no notification.
    Unchanged {
        /// Target application.
        app: String,
        /// The (unchanged) full path.
        full_path: String,
    },
    /// Request was rejected.
    Failed(NavigationError),
}

impl NavigationResult {
    /// Check if a history stack was mutated.
    pub fn is_navigated(&self) -> bool {
        matches!(self, NavigationResult::Navigated { .. })
    }

    /// Check if the request was a no-op.
    pub fn is_unchanged(&self) -> bool {
        matches!(self, NavigationResult::Unchanged { .. })
    }

    /// Check if the request was rejected.
    pub fn is_failed(&self) -> bool {
        matches!(self, NavigationResult::Failed(_))
    }

    /// The method used, if a history stack was mutated.
    pub fn method(&self) -> Option<HistoryMethod> {
        match self {
            NavigationResult::Navigated { method, .. } => Some(*method),
            _ => None,
        }
    }

    /// The channel driven, if a history stack was mutated.
    pub fn channel(&self) -> Option<NavigationChannel> {
        match self {
            NavigationResult::Navigated { channel, .. } => Some(*channel),
            _ => None,
        }
    }

    /// The reported error, if the request was rejected.
    pub fn error(&self) -> Option<&NavigationError> {
        match self {
            NavigationResult::Failed(error) => Some(error),
            _ => None,
        }
    }
}

impl From<NavigationError> for NavigationResult {
    fn from(error: NavigationError) -> Self {
        NavigationResult::Failed(error)
    }
}

/// Reasons a navigation request is rejected.
///
/// Every variant names the public operation that reported it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationError {
    /// Malformed request, e.g. an empty application name.
    InvalidRequest {
        operation: &'static str,
        message: String,
    },

    /// The sandbox registry does not know this application.
    UnknownApplication {
        operation: &'static str,
        name: String,
    },

    /// The application is known but its virtual browsing context is gone.
    SandboxClosed {
        operation: &'static str,
        name: String,
    },

    /// Path (or the base it resolves against) is not a valid URL.
    InvalidPath {
        operation: &'static str,
        path: String,
        message: String,
    },
}

impl NavigationError {
    /// Name of the operation that reported this error.
    pub fn operation(&self) -> &'static str {
        match self {
            NavigationError::InvalidRequest { operation, .. }
            | NavigationError::UnknownApplication { operation, .. }
            | NavigationError::SandboxClosed { operation, .. }
            | NavigationError::InvalidPath { operation, .. } => operation,
        }
    }
}

impl fmt::Display for NavigationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavigationError::InvalidRequest { operation, message } => {
                write!(f, "{}: invalid request: {}", operation, message)
            }
            NavigationError::UnknownApplication { operation, name } => {
                write!(f, "{}: unknown application '{}'", operation, name)
            }
            NavigationError::SandboxClosed { operation, name } => {
                write!(f, "{}: sandbox of '{}' is closed", operation, name)
            }
            NavigationError::InvalidPath {
                operation,
                path,
                message,
            } => {
                write!(f, "{}: cannot resolve path '{}': {}", operation, path, message)
            }
        }
    }
}

impl std::error::Error for NavigationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_result_navigated() {
        let result = NavigationResult::Navigated {
            app: "a".to_string(),
            full_path: "/b".to_string(),
            method: HistoryMethod::Push,
            channel: NavigationChannel::Virtual,
        };
        assert!(result.is_navigated());
        assert!(!result.is_unchanged());
        assert!(!result.is_failed());
        assert_eq!(result.method(), Some(HistoryMethod::Push));
        assert_eq!(result.channel(), Some(NavigationChannel::Virtual));
        assert!(result.error().is_none());
    }

    #[test]
    fn test_navigation_result_unchanged() {
        let result = NavigationResult::Unchanged {
            app: "a".to_string(),
            full_path: "/a".to_string(),
        };
        assert!(result.is_unchanged());
        assert_eq!(result.method(), None);
    }

    #[test]
    fn test_navigation_error_display() {
        let error = NavigationError::SandboxClosed {
            operation: "replace",
            name: "billing".to_string(),
        };
        assert_eq!(error.to_string(), "replace: sandbox of 'billing' is closed");
        assert_eq!(error.operation(), "replace");

        let error = NavigationError::InvalidRequest {
            operation: "push",
            message: "application name is empty".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "push: invalid request: application name is empty"
        );
    }

    #[test]
    fn test_error_into_result() {
        let result: NavigationResult = NavigationError::InvalidPath {
            operation: "push",
            path: "//".to_string(),
            message: "empty host".to_string(),
        }
        .into();
        assert!(result.is_failed());
        assert_eq!(result.error().unwrap().operation(), "push");
    }
}
