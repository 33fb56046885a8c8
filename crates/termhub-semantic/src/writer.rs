//! Projection writing.
//!
//! Merges recomputed closures and replayed attribute changes with the
//! stored projection, persisting only rows that actually changed. Rows
//! whose parents become empty are deleted unless they belong to the
//! terminology root.

use std::collections::{HashMap, HashSet};

use futures_util::StreamExt;
use termhub_core::{ConceptId, Form, SemanticIndexConfig};
use termhub_store::{Commit, QueryConcept, QueryConceptQuery, TermStore, VersionScope};
use tracing::debug;

use crate::attributes::AttributeChangeMap;
use crate::error::SemanticError;
use crate::graph::GraphBuilder;

/// Maximum id terms per membership query.
const LOAD_CHUNK_SIZE: usize = 10_000;

/// Counts of projection rows written and deleted for one form.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProjectionWriteSummary {
    pub saved: usize,
    pub deleted: usize,
}

/// Writes the projection of `form` back to the store.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn write_projection(
    store: &dyn TermStore,
    commit: &Commit,
    config: &SemanticIndexConfig,
    form: Form,
    graph: &GraphBuilder,
    attribute_changes: &AttributeChangeMap,
    new_graph: bool,
    rebuild: bool,
) -> Result<ProjectionWriteSummary, SemanticError> {
    let branch_path = commit.branch_path();

    // Rows to revisit: nodes whose closure may have changed, plus concepts
    // touched only by attribute changes.
    let mut to_write: HashSet<ConceptId> = graph
        .nodes()
        .filter(|node| {
            new_graph
                || rebuild
                || graph.is_ancestor_or_self_updated(node.concept_id(), branch_path)
                || attribute_changes.contains_key(&node.concept_id())
        })
        .map(|node| node.concept_id())
        .collect();
    to_write.extend(attribute_changes.keys().copied());
    if to_write.is_empty() {
        return Ok(ProjectionWriteSummary::default());
    }

    // Stored rows for those concepts. Rows this commit already ended on
    // the branch are no longer visible here.
    let scope = VersionScope::VisibleIncluding(commit.clone());
    let mut existing: HashMap<ConceptId, QueryConcept> = HashMap::new();
    let ids: Vec<ConceptId> = to_write.iter().copied().collect();
    for chunk in ids.chunks(LOAD_CHUNK_SIZE) {
        let mut rows = store
            .stream_query_concepts(
                QueryConceptQuery::new(scope.clone(), form)
                    .with_concept_ids(chunk.iter().copied().collect()),
            )
            .await?;
        while let Some(row) = rows.next().await {
            let row = row?;
            existing.insert(row.concept_id, row);
        }
    }

    let mut to_save: Vec<QueryConcept> = Vec::new();
    let mut to_delete: Vec<String> = Vec::new();
    for concept_id in ids {
        let node = graph.node(concept_id);
        match existing.remove(&concept_id) {
            Some(mut row) => {
                let parents = match node {
                    Some(node) => node.parents().clone(),
                    None => row.parents.clone(),
                };
                let ancestors = match node {
                    Some(_) => graph.transitive_closure(concept_id),
                    None => row.ancestors.clone(),
                };
                let mut attributes = row.attribute_groups.clone();
                if let Some(changes) = attribute_changes.get(&concept_id) {
                    changes.apply_to(&mut attributes);
                }
                if parents.is_empty() && concept_id != config.root_concept_id {
                    to_delete.push(row.concept_id_form.clone());
                } else if parents != row.parents
                    || ancestors != row.ancestors
                    || attributes != row.attribute_groups
                {
                    row.parents = parents;
                    row.ancestors = ancestors;
                    row.attribute_groups = attributes;
                    to_save.push(row);
                }
            }
            None => {
                let mut row = QueryConcept::new(concept_id, form);
                if let Some(node) = node {
                    row.parents = node.parents().clone();
                    row.ancestors = graph.transitive_closure(concept_id);
                }
                if let Some(changes) = attribute_changes.get(&concept_id) {
                    changes.apply_to(&mut row.attribute_groups);
                }
                // A row that would be born empty-parented is never written.
                if row.parents.is_empty() && concept_id != config.root_concept_id {
                    continue;
                }
                to_save.push(row);
            }
        }
    }

    let summary = ProjectionWriteSummary {
        saved: to_save.len(),
        deleted: to_delete.len(),
    };
    for batch in to_save.chunks(config.batch_save_size) {
        store.save_query_concepts(commit, batch.to_vec()).await?;
    }
    for batch in to_delete.chunks(config.batch_save_size) {
        store.end_query_concepts(commit, batch).await?;
    }
    debug!(
        %form,
        saved = summary.saved,
        deleted = summary.deleted,
        "wrote projection"
    );
    Ok(summary)
}
