//! Error types for the binding.

use thiserror::Error;
use wldap_sys::LoadError;

/// Result type for binding operations.
pub type LdapResult<T> = Result<T, LdapError>;

/// Errors surfaced by the binding.
///
/// Errors are `Clone` so that a [`crate::Future`] can hand out its memoized
/// failure as many times as it is asked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LdapError {
    /// A native call failed.
    #[error("{description} (LDAP error {code:#04x})")]
    Directory {
        /// Native return code.
        code: u32,
        /// Description from `ldap_err2string`.
        description: String,
    },

    /// A bounded wait elapsed before the operation produced an outcome.
    #[error("operation timed out")]
    Timeout,

    /// Local misuse detected before any native call.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// What was wrong.
        message: String,
    },

    /// The native library could not be bound.
    #[error("native library unavailable: {message}")]
    Load {
        /// Loader error, rendered.
        message: String,
    },
}

impl LdapError {
    /// Creates a directory error.
    pub fn directory(code: u32, description: impl Into<String>) -> Self {
        Self::Directory {
            code,
            description: description.into(),
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Native return code, for directory errors.
    pub fn code(&self) -> Option<u32> {
        match self {
            Self::Directory { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns true for [`LdapError::Timeout`].
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

impl From<LoadError> for LdapError {
    fn from(err: LoadError) -> Self {
        Self::Load {
            message: err.to_string(),
        }
    }
}
