//! Rebase reconciliation.
//!
//! A rebase re-parents a branch onto a newer snapshot of its parent,
//! leaving the branch's own projection rows stale relative to the new
//! base. The reconciler discards them and re-exposes the parent's rows;
//! the normal pipeline then replays all branch-local content over the new
//! base and re-hides or overwrites parent rows as needed.

use termhub_store::{Commit, TermStore};
use tracing::debug;

use crate::error::SemanticError;

/// Invalidates the branch's own projection ahead of a rebase replay.
pub(crate) async fn reconcile_rebased_branch(
    store: &dyn TermStore,
    commit: &Commit,
) -> Result<(), SemanticError> {
    // End every projection-row version authored on this branch.
    store.end_branch_query_concepts(commit).await?;
    // Unhide the parent's projection rows; replay re-hides what it must.
    store.clear_query_concept_versions_replaced(commit).await?;
    debug!(path = commit.branch_path(), "reconciled projection for rebase");
    Ok(())
}
