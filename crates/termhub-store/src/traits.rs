//! The versioned-store trait backends must implement.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use termhub_core::ConceptId;

use crate::branch::{Commit, VersionScope};
use crate::error::StoreResult;
use crate::query::{AxiomMemberQuery, QueryConceptQuery, RelationshipQuery};
use crate::types::{AxiomMember, QueryConcept, Relationship};

/// A bounded-memory cursor over query results.
///
/// Backends may implement this with scroll cursors, search-after, or keyset
/// pagination; consumers only rely on items arriving one at a time.
pub type EntityStream<'a, T> = BoxStream<'a, StoreResult<T>>;

/// The query and write surface the semantic index pipeline requires from
/// the versioned store.
///
/// Implementations must be thread-safe (`Send + Sync`). All reads are
/// scoped by a [`VersionScope`]; all writes belong to an open [`Commit`]
/// and become durable only when the commit finishes successfully.
#[async_trait]
pub trait TermStore: Send + Sync {
    // ==================== Commit lifecycle ====================

    /// Opens a commit on `branch_path`, taking the branch lock.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::BranchNotFound` for an unknown branch and
    /// `StoreError::BranchLocked` if a commit is already open.
    async fn open_commit(
        &self,
        branch_path: &str,
        lock_metadata: Option<String>,
    ) -> StoreResult<Commit>;

    /// Runs registered commit hooks, then makes the commit durable.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::CommitAborted` when a hook rejects the commit;
    /// all staged versions are rolled back in that case.
    async fn finish_commit(&self, commit: Commit) -> StoreResult<()>;

    /// Discards the commit and rolls back all staged versions.
    async fn abort_commit(&self, commit: Commit) -> StoreResult<()>;

    // ==================== Streaming reads ====================

    /// Streams relationship versions matching `query`.
    async fn stream_relationships(
        &self,
        query: RelationshipQuery,
    ) -> StoreResult<EntityStream<'static, Relationship>>;

    /// Streams axiom reference-set members matching `query`.
    async fn stream_axiom_members(
        &self,
        query: AxiomMemberQuery,
    ) -> StoreResult<EntityStream<'static, AxiomMember>>;

    /// Streams projection rows matching `query`.
    async fn stream_query_concepts(
        &self,
        query: QueryConceptQuery,
    ) -> StoreResult<EntityStream<'static, QueryConcept>>;

    /// Counts projection rows matching `query` without materializing them.
    async fn count_query_concepts(&self, query: QueryConceptQuery) -> StoreResult<usize>;

    /// Returns which of `ids` resolve to an active concept in `scope`.
    async fn active_concept_ids(
        &self,
        scope: &VersionScope,
        ids: &HashSet<ConceptId>,
    ) -> StoreResult<HashSet<ConceptId>>;

    // ==================== Projection writes ====================

    /// Upserts projection rows into the commit. A write supersedes any
    /// prior version of the same row visible on the branch.
    async fn save_query_concepts(
        &self,
        commit: &Commit,
        rows: Vec<QueryConcept>,
    ) -> StoreResult<()>;

    /// Ends the projection rows with the given `concept_id_form` keys at
    /// the commit timepoint.
    async fn end_query_concepts(&self, commit: &Commit, keys: &[String]) -> StoreResult<()>;

    /// Ends every projection-row version authored on the commit's branch.
    /// Used by the rebase reconciler.
    async fn end_branch_query_concepts(&self, commit: &Commit) -> StoreResult<()>;

    /// Clears the branch's versions-replaced set for projection rows, so
    /// parent-branch rows previously hidden here become visible again.
    /// Used by the rebase reconciler.
    async fn clear_query_concept_versions_replaced(&self, commit: &Commit) -> StoreResult<()>;
}

/// Type alias for a shared store trait object.
pub type DynTermStore = Arc<dyn TermStore>;
