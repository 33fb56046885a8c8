//! The in-memory branching versioned store.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use futures_util::stream;
use termhub_core::ConceptId;
use termhub_store::{
    AxiomMember, AxiomMemberQuery, Branch, Commit, CommitHook, CommitType, Concept, EntityKind,
    EntityStream, QueryConcept, QueryConceptQuery, Relationship, RelationshipOrder,
    RelationshipQuery, StoreError, StoreResult, TermStore, VersionScope,
};
use time::{Duration, OffsetDateTime};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::rows::VersionedRow;

/// In-memory branching versioned store.
///
/// Branch layering follows the content-store model: a branch sees its own
/// live versions, plus its parent's content frozen at the branch's base
/// timepoint, minus the parent versions recorded in the branch's
/// versions-replaced sets. Commits are atomic; registered commit hooks run
/// before durability and any hook error rolls the staged versions back.
pub struct MemoryStore {
    state: RwLock<StoreState>,
    hooks: RwLock<Vec<Arc<dyn CommitHook>>>,
    /// Logical clock; each tick yields a strictly later timepoint.
    clock: AtomicI64,
}

#[derive(Default)]
struct StoreState {
    branches: HashMap<String, Branch>,
    open_commits: HashSet<String>,
    concepts: Vec<Concept>,
    relationships: Vec<Relationship>,
    axiom_members: Vec<AxiomMember>,
    query_concepts: Vec<QueryConcept>,
}

impl StoreState {
    fn branch(&self, path: &str) -> StoreResult<&Branch> {
        self.branches
            .get(path)
            .ok_or_else(|| StoreError::branch_not_found(path))
    }
}

impl MemoryStore {
    /// Creates an empty store with no branches.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            hooks: RwLock::new(Vec::new()),
            clock: AtomicI64::new(0),
        }
    }

    fn next_timepoint(&self) -> OffsetDateTime {
        let tick = self.clock.fetch_add(1, Ordering::SeqCst) + 1;
        OffsetDateTime::UNIX_EPOCH + Duration::seconds(tick)
    }

    /// Registers a commit hook. Hooks run in registration order inside
    /// every subsequent commit.
    pub async fn add_commit_hook(&self, hook: Arc<dyn CommitHook>) {
        self.hooks.write().await.push(hook);
    }

    /// Creates a branch. Non-root paths require the parent branch to
    /// exist; the new branch is based on the parent's current head.
    pub async fn create_branch(&self, path: &str) -> StoreResult<Branch> {
        let timepoint = self.next_timepoint();
        let mut state = self.state.write().await;
        if state.branches.contains_key(path) {
            return Err(StoreError::internal(format!("branch already exists: {path}")));
        }
        let base = match path.rsplit_once('/') {
            Some((parent, _)) => state.branch(parent)?.head_timepoint,
            None => timepoint,
        };
        let mut branch = Branch::new(path, timepoint);
        branch.base_timepoint = base;
        state.branches.insert(path.to_string(), branch.clone());
        debug!(path, "created branch");
        Ok(branch)
    }

    /// Returns a snapshot of the branch record.
    pub async fn branch(&self, path: &str) -> StoreResult<Branch> {
        Ok(self.state.read().await.branch(path)?.clone())
    }

    /// Opens a rebase commit: re-parents `branch_path` onto its parent's
    /// current head. The returned commit carries the pre-rebase branch
    /// snapshot; the live branch already points at the new base.
    pub async fn open_rebase_commit(&self, branch_path: &str) -> StoreResult<Commit> {
        let timepoint = self.next_timepoint();
        let mut state = self.state.write().await;
        let snapshot = state.branch(branch_path)?.clone();
        let parent_path = snapshot
            .parent_path()
            .ok_or_else(|| StoreError::invalid_query("cannot rebase a root branch"))?;
        let new_base = state.branch(parent_path)?.head_timepoint;
        if !state.open_commits.insert(branch_path.to_string()) {
            return Err(StoreError::branch_locked(branch_path));
        }
        if let Some(live) = state.branches.get_mut(branch_path) {
            live.base_timepoint = new_base;
        }
        debug!(path = branch_path, "opened rebase commit");
        Ok(Commit {
            branch: snapshot,
            timepoint,
            commit_type: CommitType::Rebase,
            entities_deleted: HashMap::new(),
            lock_metadata: None,
        })
    }

    /// Stages a concept version into the commit.
    pub async fn stage_concept(&self, commit: &Commit, concept: Concept) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let StoreState {
            branches, concepts, ..
        } = &mut *state;
        stage_row(concepts, branches, commit, concept)
    }

    /// Stages a relationship version into the commit.
    pub async fn stage_relationship(
        &self,
        commit: &Commit,
        relationship: Relationship,
    ) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let StoreState {
            branches,
            relationships,
            ..
        } = &mut *state;
        stage_row(relationships, branches, commit, relationship)
    }

    /// Stages an axiom member version into the commit.
    pub async fn stage_axiom_member(
        &self,
        commit: &Commit,
        member: AxiomMember,
    ) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let StoreState {
            branches,
            axiom_members,
            ..
        } = &mut *state;
        stage_row(axiom_members, branches, commit, member)
    }

    /// Deletes the relationship visible on the commit's branch. Returns
    /// false when no version of the relationship is visible.
    pub async fn delete_relationship(&self, commit: &mut Commit, id: &str) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        let StoreState {
            branches,
            relationships,
            ..
        } = &mut *state;
        match delete_row(relationships, branches, commit, id)? {
            Some(version_id) => {
                commit.record_deleted(EntityKind::Relationship, version_id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Deletes the axiom member visible on the commit's branch. Returns
    /// false when no version of the member is visible.
    pub async fn delete_axiom_member(&self, commit: &mut Commit, id: &str) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        let StoreState {
            branches,
            axiom_members,
            ..
        } = &mut *state;
        match delete_row(axiom_members, branches, commit, id)? {
            Some(version_id) => {
                commit.record_deleted(EntityKind::AxiomMember, version_id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn rollback(&self, commit: &Commit) {
        let mut state = self.state.write().await;
        let path = commit.branch_path().to_string();
        let tp = commit.timepoint;
        undo_rows(&mut state.concepts, &path, tp);
        undo_rows(&mut state.relationships, &path, tp);
        undo_rows(&mut state.axiom_members, &path, tp);
        undo_rows(&mut state.query_concepts, &path, tp);
        if let Some(branch) = state.branches.get_mut(&path) {
            branch.versions_replaced = commit.branch.versions_replaced.clone();
            if commit.is_rebase() {
                branch.base_timepoint = commit.branch.base_timepoint;
            }
        }
        state.open_commits.remove(&path);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TermStore for MemoryStore {
    async fn open_commit(
        &self,
        branch_path: &str,
        lock_metadata: Option<String>,
    ) -> StoreResult<Commit> {
        let timepoint = self.next_timepoint();
        let mut state = self.state.write().await;
        let snapshot = state.branch(branch_path)?.clone();
        if !state.open_commits.insert(branch_path.to_string()) {
            return Err(StoreError::branch_locked(branch_path));
        }
        Ok(Commit {
            branch: snapshot,
            timepoint,
            commit_type: CommitType::Content,
            entities_deleted: HashMap::new(),
            lock_metadata,
        })
    }

    async fn finish_commit(&self, commit: Commit) -> StoreResult<()> {
        let hooks = self.hooks.read().await.clone();
        for hook in hooks {
            if let Err(err) = hook.pre_commit_completion(&commit).await {
                warn!(
                    hook = hook.name(),
                    error = %err,
                    path = commit.branch_path(),
                    "commit hook rejected commit, rolling back"
                );
                self.rollback(&commit).await;
                return Err(StoreError::commit_aborted(hook.name(), err.to_string()));
            }
        }
        let mut state = self.state.write().await;
        let path = commit.branch_path().to_string();
        if let Some(branch) = state.branches.get_mut(&path) {
            branch.head_timepoint = commit.timepoint;
        }
        state.open_commits.remove(&path);
        Ok(())
    }

    async fn abort_commit(&self, commit: Commit) -> StoreResult<()> {
        self.rollback(&commit).await;
        Ok(())
    }

    async fn stream_relationships(
        &self,
        query: RelationshipQuery,
    ) -> StoreResult<EntityStream<'static, Relationship>> {
        let state = self.state.read().await;
        let mut rows = collect_scope(&state, &state.relationships, &query.scope)?;
        drop(state);
        rows.retain(|r| {
            query.type_id.is_none_or(|t| r.type_id == t)
                && query.exclude_type_id.is_none_or(|t| r.type_id != t)
                && query
                    .characteristic_types
                    .as_ref()
                    .is_none_or(|s| s.contains(&r.characteristic_type_id))
                && query
                    .source_ids
                    .as_ref()
                    .is_none_or(|s| s.contains(&r.source_id))
                && query.active.is_none_or(|a| r.active == a)
        });
        if query.order == RelationshipOrder::EffectiveTimeActiveStart {
            rows.sort_by_key(|r| (r.effective_time_or_max(), r.active, r.start));
        }
        Ok(Box::pin(stream::iter(rows.into_iter().map(Ok::<_, StoreError>))))
    }

    async fn stream_axiom_members(
        &self,
        query: AxiomMemberQuery,
    ) -> StoreResult<EntityStream<'static, AxiomMember>> {
        let state = self.state.read().await;
        let mut rows = collect_scope(&state, &state.axiom_members, &query.scope)?;
        drop(state);
        rows.retain(|m| {
            query
                .referenced_component_ids
                .as_ref()
                .is_none_or(|s| s.contains(&m.referenced_component_id))
                && query.active.is_none_or(|a| m.active == a)
        });
        if query.ordered_for_replay {
            rows.sort_by_key(|m| (m.effective_time_or_max(), m.active, m.start));
        }
        Ok(Box::pin(stream::iter(rows.into_iter().map(Ok::<_, StoreError>))))
    }

    async fn stream_query_concepts(
        &self,
        query: QueryConceptQuery,
    ) -> StoreResult<EntityStream<'static, QueryConcept>> {
        let state = self.state.read().await;
        let mut rows = collect_scope(&state, &state.query_concepts, &query.scope)?;
        drop(state);
        rows.retain(|q| {
            q.stated == query.form.is_stated()
                && query
                    .concept_ids
                    .as_ref()
                    .is_none_or(|s| s.contains(&q.concept_id))
                && query
                    .ancestors_any_of
                    .as_ref()
                    .is_none_or(|s| !s.is_disjoint(&q.ancestors))
        });
        Ok(Box::pin(stream::iter(rows.into_iter().map(Ok::<_, StoreError>))))
    }

    async fn count_query_concepts(&self, query: QueryConceptQuery) -> StoreResult<usize> {
        let state = self.state.read().await;
        let rows = collect_scope(&state, &state.query_concepts, &query.scope)?;
        Ok(rows
            .iter()
            .filter(|q| {
                q.stated == query.form.is_stated()
                    && query
                        .concept_ids
                        .as_ref()
                        .is_none_or(|s| s.contains(&q.concept_id))
                    && query
                        .ancestors_any_of
                        .as_ref()
                        .is_none_or(|s| !s.is_disjoint(&q.ancestors))
            })
            .count())
    }

    async fn active_concept_ids(
        &self,
        scope: &VersionScope,
        ids: &HashSet<ConceptId>,
    ) -> StoreResult<HashSet<ConceptId>> {
        let state = self.state.read().await;
        let rows = collect_scope(&state, &state.concepts, scope)?;
        Ok(rows
            .into_iter()
            .filter(|c| c.active && ids.contains(&c.concept_id))
            .map(|c| c.concept_id)
            .collect())
    }

    async fn save_query_concepts(
        &self,
        commit: &Commit,
        rows: Vec<QueryConcept>,
    ) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let StoreState {
            branches,
            query_concepts,
            ..
        } = &mut *state;
        for row in rows {
            stage_row(query_concepts, branches, commit, row)?;
        }
        Ok(())
    }

    async fn end_query_concepts(&self, commit: &Commit, keys: &[String]) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let StoreState {
            branches,
            query_concepts,
            ..
        } = &mut *state;
        for key in keys {
            delete_row(query_concepts, branches, commit, key)?;
        }
        Ok(())
    }

    async fn end_branch_query_concepts(&self, commit: &Commit) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let path = commit.branch_path();
        let tp = commit.timepoint;
        for row in state.query_concepts.iter_mut() {
            if row.path == path && row.end.is_none() && row.start < tp {
                row.end = Some(tp);
            }
        }
        Ok(())
    }

    async fn clear_query_concept_versions_replaced(&self, commit: &Commit) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if let Some(branch) = state.branches.get_mut(commit.branch_path()) {
            branch.versions_replaced.remove(&EntityKind::QueryConcept);
        }
        Ok(())
    }
}

// ==================== Version layering ====================

/// Collects the entity versions visible on `leaf_path`: own live versions,
/// then each ancestor's content frozen at the child's base, skipping ids
/// already found or hidden by a versions-replaced set along the way.
fn collect_visible<T: VersionedRow>(
    rows: &[T],
    branches: &HashMap<String, Branch>,
    leaf_path: &str,
    exclude_start_at: Option<OffsetDateTime>,
) -> StoreResult<Vec<T>> {
    let mut out: HashMap<String, T> = HashMap::new();
    let mut hidden: HashSet<String> = HashSet::new();
    let mut path = leaf_path.to_string();
    let mut limit: Option<OffsetDateTime> = None;
    loop {
        let branch = branches
            .get(&path)
            .ok_or_else(|| StoreError::branch_not_found(&path))?;
        for row in rows.iter().filter(|r| r.path() == path) {
            let live = match limit {
                None => {
                    row.end().is_none() && exclude_start_at.is_none_or(|tp| row.start() != tp)
                }
                Some(t) => row.start() <= t && row.end().is_none_or(|e| e > t),
            };
            if !live || hidden.contains(row.version_id()) {
                continue;
            }
            let id = row.row_id();
            if out.contains_key(&id) {
                continue;
            }
            out.insert(id, row.clone());
        }
        hidden.extend(branch.versions_replaced(T::KIND).iter().cloned());
        match branch.parent_path() {
            Some(parent) => {
                let base = branch.base_timepoint;
                limit = Some(limit.map_or(base, |l| l.min(base)));
                path = parent.to_string();
            }
            None => break,
        }
    }
    Ok(out.into_values().collect())
}

/// Finds the index of the version of entity `id` visible on `leaf_path`.
fn find_visible_index<T: VersionedRow>(
    rows: &[T],
    branches: &HashMap<String, Branch>,
    leaf_path: &str,
    id: &str,
) -> StoreResult<Option<usize>> {
    let mut hidden: HashSet<String> = HashSet::new();
    let mut path = leaf_path.to_string();
    let mut limit: Option<OffsetDateTime> = None;
    loop {
        let branch = branches
            .get(&path)
            .ok_or_else(|| StoreError::branch_not_found(&path))?;
        for (i, row) in rows.iter().enumerate() {
            if row.path() != path || row.row_id() != id {
                continue;
            }
            let live = match limit {
                None => row.end().is_none(),
                Some(t) => row.start() <= t && row.end().is_none_or(|e| e > t),
            };
            if live && !hidden.contains(row.version_id()) {
                return Ok(Some(i));
            }
        }
        hidden.extend(branch.versions_replaced(T::KIND).iter().cloned());
        match branch.parent_path() {
            Some(parent) => {
                let base = branch.base_timepoint;
                limit = Some(limit.map_or(base, |l| l.min(base)));
                path = parent.to_string();
            }
            None => return Ok(None),
        }
    }
}

/// Versions changed within the open commit: rows started or ended at the
/// commit timepoint, plus the versions the commit recorded as deleted.
/// Parent versions merely superseded by a newer branch version are not
/// part of the commit's deltas.
fn collect_changed_in<T: VersionedRow>(rows: &[T], commit: &Commit) -> Vec<T> {
    let tp = commit.timepoint;
    let path = commit.branch_path();
    let deleted = commit.entities_deleted(T::KIND);
    rows.iter()
        .filter(|r| {
            (r.path() == path && (r.start() == tp || r.end() == Some(tp)))
                || deleted.contains(r.version_id())
        })
        .cloned()
        .collect()
}

/// All versions authored on the branch plus the parent versions it has
/// replaced — the rebase replay scope.
fn collect_changed_on_branch<T: VersionedRow>(rows: &[T], branch: &Branch) -> Vec<T> {
    let replaced = branch.versions_replaced(T::KIND);
    rows.iter()
        .filter(|r| r.path() == branch.path || replaced.contains(r.version_id()))
        .cloned()
        .collect()
}

fn collect_scope<T: VersionedRow>(
    state: &StoreState,
    rows: &[T],
    scope: &VersionScope,
) -> StoreResult<Vec<T>> {
    match scope {
        VersionScope::VisibleBefore(commit) => collect_visible(
            rows,
            &state.branches,
            commit.branch_path(),
            Some(commit.timepoint),
        ),
        VersionScope::VisibleIncluding(commit) => {
            collect_visible(rows, &state.branches, commit.branch_path(), None)
        }
        VersionScope::ChangedIn(commit) => Ok(collect_changed_in(rows, commit)),
        VersionScope::ChangedOnBranch(branch) => {
            let live = state.branch(&branch.path)?;
            Ok(collect_changed_on_branch(rows, live))
        }
    }
}

// ==================== Staging ====================

/// Stages a new version of an entity: supersedes the visible version (end
/// it on this branch, or hide a parent version) and appends the new row at
/// the commit timepoint.
fn stage_row<T: VersionedRow>(
    rows: &mut Vec<T>,
    branches: &mut HashMap<String, Branch>,
    commit: &Commit,
    mut row: T,
) -> StoreResult<()> {
    let path = commit.branch_path();
    let tp = commit.timepoint;
    let id = row.row_id();
    if let Some(i) = find_visible_index(rows, branches, path, &id)? {
        if rows[i].path() == path {
            if rows[i].start() == tp {
                rows.remove(i);
            } else {
                rows[i].set_end(Some(tp));
            }
        } else {
            let replaced_version = rows[i].version_id().to_string();
            if let Some(branch) = branches.get_mut(path) {
                branch
                    .versions_replaced
                    .entry(T::KIND)
                    .or_default()
                    .insert(replaced_version);
            }
        }
    }
    row.set_version(Uuid::new_v4().to_string(), path.to_string(), tp);
    rows.push(row);
    Ok(())
}

/// Removes the visible version of entity `id` from the branch: ends an
/// own-branch version at the commit timepoint, or hides a parent version
/// behind the versions-replaced set. Returns the removed version's id.
fn delete_row<T: VersionedRow>(
    rows: &mut Vec<T>,
    branches: &mut HashMap<String, Branch>,
    commit: &Commit,
    id: &str,
) -> StoreResult<Option<String>> {
    let path = commit.branch_path();
    let tp = commit.timepoint;
    let Some(i) = find_visible_index(rows, branches, path, id)? else {
        return Ok(None);
    };
    let version_id = rows[i].version_id().to_string();
    if rows[i].path() == path {
        if rows[i].start() == tp {
            rows.remove(i);
        } else {
            rows[i].set_end(Some(tp));
        }
    } else if let Some(branch) = branches.get_mut(path) {
        branch
            .versions_replaced
            .entry(T::KIND)
            .or_default()
            .insert(version_id.clone());
    }
    Ok(Some(version_id))
}

fn undo_rows<T: VersionedRow>(rows: &mut Vec<T>, path: &str, tp: OffsetDateTime) {
    rows.retain(|r| !(r.path() == path && r.start() == tp));
    for row in rows.iter_mut() {
        if row.path() == path && row.end() == Some(tp) {
            row.set_end(None);
        }
    }
}
