//! Existing-graph loading.
//!
//! An incremental update must see enough of the stored projection to
//! re-derive closures correctly: the updated concepts themselves, their
//! pre-existing ancestors, and every concept that currently claims an
//! updated concept as an ancestor (their closures may shrink or move).
//! Term-set queries are chunked because the backing search index bounds
//! clause counts per query.

use std::collections::HashSet;

use futures_util::StreamExt;
use termhub_core::{ConceptId, Form, SemanticIndexConfig};
use termhub_store::{
    AxiomMemberQuery, QueryConceptQuery, Relationship, RelationshipQuery, TermStore, VersionScope,
};
use tracing::debug;

use crate::axioms::{AxiomConverter, AxiomStreamAdapter};
use crate::changes::ChangeSet;
use crate::error::SemanticError;
use crate::graph::GraphBuilder;

/// Maximum id terms per membership query.
const LOAD_CHUNK_SIZE: usize = 10_000;

/// Loads the relevant parts of the stored projection into `graph` for an
/// incremental update of `form`.
pub(crate) async fn load_existing_graph(
    store: &dyn TermStore,
    graph: &mut GraphBuilder,
    form: Form,
    scope: &VersionScope,
    changes: &ChangeSet,
) -> Result<(), SemanticError> {
    // Ancestors already stored for the changed sources and destinations.
    let mut existing_ancestors: HashSet<ConceptId> = HashSet::new();
    let edge_concepts: Vec<ConceptId> = changes
        .update_source
        .union(&changes.update_destination)
        .copied()
        .collect();
    for chunk in edge_concepts.chunks(LOAD_CHUNK_SIZE) {
        let mut rows = store
            .stream_query_concepts(
                QueryConceptQuery::new(scope.clone(), form)
                    .with_concept_ids(chunk.iter().copied().collect()),
            )
            .await?;
        while let Some(row) = rows.next().await {
            existing_ancestors.extend(row?.ancestors);
        }
    }

    // Concepts whose stored closure passes through a changed source.
    let mut existing_descendants: HashSet<ConceptId> = HashSet::new();
    let sources: Vec<ConceptId> = changes.update_source.iter().copied().collect();
    for chunk in sources.chunks(LOAD_CHUNK_SIZE) {
        let mut rows = store
            .stream_query_concepts(
                QueryConceptQuery::new(scope.clone(), form)
                    .with_any_ancestor(chunk.iter().copied().collect()),
            )
            .await?;
        while let Some(row) = rows.next().await {
            existing_descendants.insert(row?.concept_id);
        }
    }

    let mut nodes_to_load: HashSet<ConceptId> = HashSet::new();
    nodes_to_load.extend(&changes.update_source);
    nodes_to_load.extend(&changes.update_destination);
    nodes_to_load.extend(&existing_ancestors);
    nodes_to_load.extend(&existing_descendants);

    // Load the stored parent edges for every relevant node, noting stored
    // ancestors that fall outside the loaded set.
    let mut alternative_ancestors: HashSet<ConceptId> = HashSet::new();
    load_parent_edges(
        store,
        graph,
        form,
        scope,
        &nodes_to_load,
        Some(&mut alternative_ancestors),
    )
    .await?;

    // A diamond can route a descendant's ancestry through a parent that is
    // neither updated nor an existing descendant; one more pass keeps that
    // alternative route in the graph.
    if !alternative_ancestors.is_empty() {
        load_parent_edges(store, graph, form, scope, &alternative_ancestors, None).await?;
    }

    debug!(
        %form,
        nodes = graph.node_count(),
        ancestors = existing_ancestors.len(),
        descendants = existing_descendants.len(),
        "loaded existing graph"
    );
    Ok(())
}

async fn load_parent_edges(
    store: &dyn TermStore,
    graph: &mut GraphBuilder,
    form: Form,
    scope: &VersionScope,
    concept_ids: &HashSet<ConceptId>,
    mut collect_outside: Option<&mut HashSet<ConceptId>>,
) -> Result<(), SemanticError> {
    let ids: Vec<ConceptId> = concept_ids.iter().copied().collect();
    for chunk in ids.chunks(LOAD_CHUNK_SIZE) {
        let mut rows = store
            .stream_query_concepts(
                QueryConceptQuery::new(scope.clone(), form)
                    .with_concept_ids(chunk.iter().copied().collect()),
            )
            .await?;
        while let Some(row) = rows.next().await {
            let row = row?;
            for parent in &row.parents {
                graph.add_parent(row.concept_id, *parent);
            }
            if let Some(outside) = collect_outside.as_deref_mut() {
                outside.extend(
                    row.ancestors
                        .iter()
                        .copied()
                        .filter(|ancestor| !concept_ids.contains(ancestor)),
                );
            }
        }
    }
    Ok(())
}

/// Builds the complete hierarchy graph for a rebuild of `form`: every
/// active hierarchy edge in `scope`, plus the active axiom fragments for
/// the stated form. Returns the concepts seeded as updated.
pub(crate) async fn load_full_graph(
    store: &dyn TermStore,
    converter: &dyn AxiomConverter,
    graph: &mut GraphBuilder,
    config: &SemanticIndexConfig,
    form: Form,
    scope: &VersionScope,
) -> Result<HashSet<ConceptId>, SemanticError> {
    let mut updated_concepts: HashSet<ConceptId> = HashSet::new();

    let mut edges = store
        .stream_relationships(
            RelationshipQuery::new(scope.clone())
                .with_type(config.is_a_type_id)
                .with_characteristic_types(config.characteristic_types(form).clone())
                .active_only(),
        )
        .await?;
    while let Some(relationship) = edges.next().await {
        let relationship = relationship?;
        graph.add_parent(relationship.source_id, relationship.destination_id);
        updated_concepts.insert(relationship.source_id);
    }
    drop(edges);

    if form.includes_axioms() {
        let members = store
            .stream_axiom_members(AxiomMemberQuery::new(scope.clone()).active_only())
            .await?;
        let is_a = config.is_a_type_id;
        AxiomStreamAdapter::new(converter)
            .for_each_fragment(
                members,
                Some(&move |fragment: &Relationship| fragment.type_id == is_a),
                |_, fragment| {
                    graph.add_parent(fragment.source_id, fragment.destination_id);
                    updated_concepts.insert(fragment.source_id);
                },
            )
            .await?;
    }

    debug!(%form, nodes = graph.node_count(), "built full graph for rebuild");
    Ok(updated_concepts)
}
