//! Store error types.

/// Errors that can occur during versioned-store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested branch does not exist.
    #[error("Branch not found: {path}")]
    BranchNotFound {
        /// The missing branch path.
        path: String,
    },

    /// A commit could not be opened because the branch is locked.
    #[error("Branch locked: {path}")]
    BranchLocked {
        /// The locked branch path.
        path: String,
    },

    /// A commit hook rejected the commit.
    #[error("Commit aborted by hook '{hook}': {message}")]
    CommitAborted {
        /// Name of the rejecting hook.
        hook: String,
        /// The hook's error message.
        message: String,
    },

    /// A query was malformed or unsupported by the backend.
    #[error("Invalid query: {message}")]
    InvalidQuery {
        /// Description of the problem.
        message: String,
    },

    /// An internal storage error occurred.
    #[error("Internal store error: {message}")]
    Internal {
        /// Description of the problem.
        message: String,
    },
}

impl StoreError {
    /// Creates a new `BranchNotFound` error.
    #[must_use]
    pub fn branch_not_found(path: impl Into<String>) -> Self {
        Self::BranchNotFound { path: path.into() }
    }

    /// Creates a new `BranchLocked` error.
    #[must_use]
    pub fn branch_locked(path: impl Into<String>) -> Self {
        Self::BranchLocked { path: path.into() }
    }

    /// Creates a new `CommitAborted` error.
    #[must_use]
    pub fn commit_aborted(hook: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CommitAborted {
            hook: hook.into(),
            message: message.into(),
        }
    }

    /// Creates a new `InvalidQuery` error.
    #[must_use]
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a branch-not-found error.
    #[must_use]
    pub fn is_branch_not_found(&self) -> bool {
        matches!(self, Self::BranchNotFound { .. })
    }

    /// Returns `true` if a commit hook rejected the commit.
    #[must_use]
    pub fn is_commit_aborted(&self) -> bool {
        matches!(self, Self::CommitAborted { .. })
    }
}

/// Type alias for a store result.
pub type StoreResult<T> = Result<T, StoreError>;
