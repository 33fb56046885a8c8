//! The per-commit update orchestrator.
//!
//! Runs inside the commit lifecycle while the branch lock is held. For
//! every commit it maintains both projection forms: discover the change
//! set, load the relevant stored graph, replay the commit's deltas, and
//! write back the changed rows. Rebase commits first invalidate the
//! branch's own projection and then replay all branch-local content over
//! the new parent base.

use std::collections::HashSet;
use std::time::Instant;

use async_trait::async_trait;
use futures_util::StreamExt;
use termhub_core::{ConceptId, Form, SemanticIndexConfig};
use termhub_store::{
    AxiomMemberQuery, Commit, CommitHook, DynTermStore, EntityKind, HookError,
    QueryConceptQuery, RelationshipQuery, VersionScope,
};
use tracing::{debug, info, warn};

use crate::attributes::AttributeChangeMap;
use crate::axioms::{AxiomStreamAdapter, DynAxiomConverter};
use crate::changes::{ChangeSet, discover_changes};
use crate::error::SemanticError;
use crate::graph::GraphBuilder;
use crate::loader::{load_existing_graph, load_full_graph};
use crate::rebase::reconcile_rebased_branch;
use crate::writer::write_projection;

/// Ids of relationship and axiom versions deleted in the current scope.
#[derive(Debug, Default)]
struct Deletions {
    relationships: HashSet<String>,
    axiom_members: HashSet<String>,
}

/// Maintains the semantic index across commits.
///
/// Register as a commit hook on the store, or call
/// [`SemanticIndexUpdater::rebuild`] to recompute a branch from scratch.
pub struct SemanticIndexUpdater {
    store: DynTermStore,
    converter: DynAxiomConverter,
    config: SemanticIndexConfig,
}

impl SemanticIndexUpdater {
    /// Creates an updater over `store` using `converter` for axioms.
    #[must_use]
    pub fn new(
        store: DynTermStore,
        converter: DynAxiomConverter,
        config: SemanticIndexConfig,
    ) -> Self {
        Self {
            store,
            converter,
            config,
        }
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &SemanticIndexConfig {
        &self.config
    }

    /// Updates both projection forms for `commit`.
    ///
    /// # Errors
    ///
    /// Conversion and storage failures are fatal and must abort the
    /// commit. Dangling concept references are logged at warn level only.
    pub async fn update_for_commit(&self, commit: &Commit) -> Result<(), SemanticError> {
        if !self.config.enabled {
            debug!(
                path = commit.branch_path(),
                "semantic indexing disabled, skipping commit"
            );
            return Ok(());
        }
        let started = Instant::now();
        if commit.is_rebase() {
            info!(path = commit.branch_path(), "updating semantic index for rebase");
            reconcile_rebased_branch(self.store.as_ref(), commit).await?;
            let scope = VersionScope::ChangedOnBranch(commit.branch.clone());
            let deletions = Deletions {
                relationships: commit
                    .branch
                    .versions_replaced(EntityKind::Relationship)
                    .clone(),
                axiom_members: commit
                    .branch
                    .versions_replaced(EntityKind::AxiomMember)
                    .clone(),
            };
            for form in Form::ALL {
                self.update_form(form, commit, &scope, &deletions, false)
                    .await?;
            }
        } else {
            let scope = VersionScope::ChangedIn(commit.clone());
            let deletions = Deletions {
                relationships: commit.entities_deleted(EntityKind::Relationship).clone(),
                axiom_members: commit.entities_deleted(EntityKind::AxiomMember).clone(),
            };
            for form in Form::ALL {
                self.update_form(form, commit, &scope, &deletions, false)
                    .await?;
            }
        }
        debug!(
            path = commit.branch_path(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "semantic index updated"
        );
        Ok(())
    }

    /// Recomputes both projection forms of `branch_path` from scratch in a
    /// fresh commit.
    ///
    /// # Errors
    ///
    /// Any failure aborts the commit, leaving the prior projection intact.
    pub async fn rebuild(&self, branch_path: &str) -> Result<(), SemanticError> {
        info!(path = branch_path, "rebuilding semantic index");
        let started = Instant::now();
        let commit = self
            .store
            .open_commit(branch_path, Some("Rebuilding semantic index".to_string()))
            .await?;
        let scope = VersionScope::VisibleBefore(commit.clone());
        let deletions = Deletions::default();
        for form in Form::ALL {
            if let Err(err) = self
                .update_form(form, &commit, &scope, &deletions, true)
                .await
            {
                self.store.abort_commit(commit).await?;
                return Err(err);
            }
        }
        let mut row_counts = [0usize; 2];
        for (i, form) in Form::ALL.into_iter().enumerate() {
            row_counts[i] = self
                .store
                .count_query_concepts(QueryConceptQuery::new(
                    VersionScope::VisibleIncluding(commit.clone()),
                    form,
                ))
                .await?;
        }
        self.store.finish_commit(commit).await?;
        info!(
            path = branch_path,
            stated_rows = row_counts[0],
            inferred_rows = row_counts[1],
            elapsed_ms = started.elapsed().as_millis() as u64,
            "semantic index rebuilt"
        );
        Ok(())
    }

    /// Runs the pipeline for one form.
    async fn update_form(
        &self,
        form: Form,
        commit: &Commit,
        scope: &VersionScope,
        deletions: &Deletions,
        rebuild: bool,
    ) -> Result<(), SemanticError> {
        let store = self.store.as_ref();
        let mut graph = GraphBuilder::new();

        let (change_set, new_graph) = if rebuild {
            let updated = load_full_graph(
                store,
                self.converter.as_ref(),
                &mut graph,
                &self.config,
                form,
                scope,
            )
            .await?;
            (ChangeSet::seeded(updated), true)
        } else {
            let change_set =
                discover_changes(store, self.converter.as_ref(), &self.config, scope, form)
                    .await?;
            if change_set.is_empty() {
                debug!(%form, path = commit.branch_path(), "no semantic changes in commit");
                return Ok(());
            }
            let before = VersionScope::VisibleBefore(commit.clone());
            load_existing_graph(store, &mut graph, form, &before, &change_set).await?;
            let new_graph = graph.is_empty();
            (change_set, new_graph)
        };

        let mut attribute_changes = AttributeChangeMap::new();
        let mut required_active: HashSet<ConceptId> = HashSet::new();
        self.replay_relationships(
            form,
            commit,
            scope,
            deletions,
            &mut graph,
            &mut attribute_changes,
            &mut required_active,
        )
        .await?;
        if form.includes_axioms() {
            self.replay_axioms(
                commit,
                scope,
                deletions,
                &mut graph,
                &mut attribute_changes,
                &mut required_active,
            )
            .await?;
        }

        self.report_dangling_references(commit, &required_active)
            .await?;

        let summary = write_projection(
            store,
            commit,
            &self.config,
            form,
            &graph,
            &attribute_changes,
            new_graph,
            rebuild,
        )
        .await?;
        info!(
            %form,
            path = commit.branch_path(),
            updated = change_set.updated_concepts.len(),
            saved = summary.saved,
            deleted = summary.deleted,
            "semantic index form updated"
        );
        Ok(())
    }

    /// Replays the relationship deltas of `scope` into the graph and the
    /// attribute accumulator.
    #[allow(clippy::too_many_arguments)]
    async fn replay_relationships(
        &self,
        form: Form,
        commit: &Commit,
        scope: &VersionScope,
        deletions: &Deletions,
        graph: &mut GraphBuilder,
        attribute_changes: &mut AttributeChangeMap,
        required_active: &mut HashSet<ConceptId>,
    ) -> Result<(), SemanticError> {
        let mut versions = self
            .store
            .stream_relationships(
                RelationshipQuery::new(scope.clone())
                    .with_characteristic_types(self.config.characteristic_types(form).clone())
                    .ordered_for_replay(),
            )
            .await?;
        while let Some(relationship) = versions.next().await {
            let relationship = relationship?;
            self.apply_version(
                graph,
                attribute_changes,
                required_active,
                commit.branch_path(),
                &relationship.version_id,
                relationship.source_id,
                relationship.type_id,
                relationship.destination_id,
                relationship.group,
                relationship.active,
                relationship.effective_time,
                relationship.end.is_some(),
                &deletions.relationships,
            );
        }
        Ok(())
    }

    /// Replays the axiom deltas of `scope` through the conversion service.
    async fn replay_axioms(
        &self,
        commit: &Commit,
        scope: &VersionScope,
        deletions: &Deletions,
        graph: &mut GraphBuilder,
        attribute_changes: &mut AttributeChangeMap,
        required_active: &mut HashSet<ConceptId>,
    ) -> Result<(), SemanticError> {
        let members = self
            .store
            .stream_axiom_members(AxiomMemberQuery::new(scope.clone()).ordered_for_replay())
            .await?;
        let branch_path = commit.branch_path();
        AxiomStreamAdapter::new(self.converter.as_ref())
            .for_each_fragment(members, None, |member, fragment| {
                self.apply_version(
                    graph,
                    attribute_changes,
                    required_active,
                    branch_path,
                    &member.version_id,
                    fragment.source_id,
                    fragment.type_id,
                    fragment.destination_id,
                    fragment.group,
                    member.active,
                    member.effective_time,
                    member.end.is_some(),
                    &deletions.axiom_members,
                );
            })
            .await
    }

    /// Routes one delta version into the graph or the attribute log.
    #[allow(clippy::too_many_arguments)]
    fn apply_version(
        &self,
        graph: &mut GraphBuilder,
        attribute_changes: &mut AttributeChangeMap,
        required_active: &mut HashSet<ConceptId>,
        branch_path: &str,
        version_id: &str,
        source_id: ConceptId,
        type_id: ConceptId,
        destination_id: ConceptId,
        group: u8,
        active: bool,
        effective_time: Option<i32>,
        ended: bool,
        deletions: &HashSet<String>,
    ) {
        let deleted = deletions.contains(version_id);
        if ended && !deleted {
            // Superseded within this scope; the newer version carries the
            // state and is processed on its own.
            return;
        }
        if active && !deleted {
            required_active.extend([source_id, type_id, destination_id]);
            if type_id == self.config.is_a_type_id {
                let child = graph.add_parent(source_id, destination_id);
                graph.mark_updated(child, branch_path);
            } else {
                attribute_changes.entry(source_id).or_default().add(
                    effective_time,
                    group,
                    type_id,
                    destination_id,
                );
            }
            if destination_id == self.config.concept_model_object_attribute_id {
                let child = graph.add_parent(
                    self.config.concept_model_object_attribute_id,
                    self.config.concept_model_attribute_id,
                );
                graph.mark_updated(child, branch_path);
            }
        } else if type_id == self.config.is_a_type_id {
            if let Some(child) = graph.remove_parent(source_id, destination_id) {
                graph.mark_updated(child, branch_path);
            }
        } else {
            attribute_changes.entry(source_id).or_default().remove(
                effective_time,
                group,
                type_id,
                destination_id,
            );
        }
    }

    /// Warns about active assertions whose concepts are missing or
    /// inactive. The projection is still written; downstream surfaces may
    /// show the dangling references.
    async fn report_dangling_references(
        &self,
        commit: &Commit,
        required_active: &HashSet<ConceptId>,
    ) -> Result<(), SemanticError> {
        if required_active.is_empty() {
            return Ok(());
        }
        let scope = VersionScope::VisibleIncluding(commit.clone());
        let present = self
            .store
            .active_concept_ids(&scope, required_active)
            .await?;
        let mut missing: Vec<ConceptId> = required_active.difference(&present).copied().collect();
        if !missing.is_empty() {
            missing.sort_unstable();
            warn!(
                path = commit.branch_path(),
                count = missing.len(),
                concepts = ?missing,
                "active relationships reference concepts that are missing or inactive"
            );
        }
        Ok(())
    }
}

#[async_trait]
impl CommitHook for SemanticIndexUpdater {
    fn name(&self) -> &str {
        "semantic-index"
    }

    async fn pre_commit_completion(&self, commit: &Commit) -> Result<(), HookError> {
        self.update_for_commit(commit).await.map_err(HookError::from)
    }
}
