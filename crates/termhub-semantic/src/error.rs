//! Semantic index error types.

use termhub_store::{HookError, StoreError};

/// Errors raised while maintaining the semantic index.
///
/// Both variants are fatal for the surrounding commit: the store rolls
/// back all staged projection writes, leaving the prior index intact.
/// Integrity warnings (dangling concept references) are logged instead of
/// raised.
#[derive(Debug, thiserror::Error)]
pub enum SemanticError {
    /// The axiom conversion service failed on a member.
    #[error("Axiom conversion failed for member {member_id}: {message}")]
    Conversion {
        /// Id of the axiom reference-set member.
        member_id: String,
        /// The conversion service's error message.
        message: String,
    },

    /// The versioned store reported an error.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SemanticError {
    /// Creates a new `Conversion` error.
    #[must_use]
    pub fn conversion(member_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conversion {
            member_id: member_id.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if this is an axiom conversion failure.
    #[must_use]
    pub fn is_conversion(&self) -> bool {
        matches!(self, Self::Conversion { .. })
    }
}

impl From<SemanticError> for HookError {
    fn from(err: SemanticError) -> Self {
        match err {
            SemanticError::Store(store) => HookError::Store(store),
            other => HookError::execution(other.to_string()),
        }
    }
}

/// Type alias for a semantic index result.
pub type SemanticResult<T> = Result<T, SemanticError>;
