//! Commit hooks.
//!
//! A hook runs synchronously inside the commit lifecycle, between the
//! staged writes and durability, while the branch lock is held. Unlike
//! fire-and-forget event listeners, a hook error is fatal: the store
//! aborts the commit and rolls back every staged version.

use async_trait::async_trait;

use crate::branch::Commit;
use crate::error::StoreError;

/// Error type for commit hook failures.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    /// Hook logic rejected the commit.
    #[error("Hook execution failed: {0}")]
    Execution(String),

    /// The hook hit a storage error.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Generic error with source.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HookError {
    /// Creates an execution error from a string.
    pub fn execution(msg: impl Into<String>) -> Self {
        HookError::Execution(msg.into())
    }
}

/// A participant in the commit lifecycle.
///
/// Implementations read the commit's staged content through the store's
/// version scopes and may stage further writes into the same commit.
#[async_trait]
pub trait CommitHook: Send + Sync {
    /// Unique name for this hook (for logging and abort attribution).
    fn name(&self) -> &str;

    /// Invoked between staged writes and durability.
    ///
    /// # Errors
    ///
    /// Any error aborts the commit; the store rolls back all versions
    /// staged at the commit timepoint.
    async fn pre_commit_completion(&self, commit: &Commit) -> Result<(), HookError>;
}
