//! Plugin-level errors.

use thiserror::Error;

use nodeplug_core::error::{AppError, ErrorKind};

/// Reasons a registry or lifecycle operation was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PluginError {
    /// The namespace is empty after stripping whitespace, or contains `-`.
    #[error("invalid plugin namespace '{0}'")]
    InvalidNamespace(String),
    /// A class is already registered under this namespace.
    #[error("plugin namespace '{0}' is already defined")]
    DuplicateNamespace(String),
    /// No class is registered under this namespace.
    #[error("plugin '{0}' is not registered")]
    NotRegistered(String),
    /// The element's document has no plugin host installed.
    #[error("no plugin host is installed for this element's document")]
    HostUnavailable,
    /// The namespace is not plugged on the element.
    #[error("plugin '{0}' is not plugged")]
    NotPlugged(String),
}

impl PluginError {
    /// The error category used when converting into [`AppError`].
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidNamespace(_) => ErrorKind::Validation,
            Self::DuplicateNamespace(_) => ErrorKind::Conflict,
            Self::NotRegistered(_) | Self::NotPlugged(_) => ErrorKind::NotFound,
            Self::HostUnavailable => ErrorKind::Plugin,
        }
    }
}

impl From<PluginError> for AppError {
    fn from(err: PluginError) -> Self {
        AppError::new(err.kind(), err.to_string())
    }
}
