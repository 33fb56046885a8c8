//! Change-set discovery.
//!
//! Finds the concepts whose projection must be recomputed from a commit's
//! deltas: sources and destinations of changed hierarchy edges (active or
//! not — deletions move closures too), plus sources of changed grouped
//! attributes.

use std::collections::HashSet;

use futures_util::StreamExt;
use termhub_core::{ConceptId, Form, SemanticIndexConfig};
use termhub_store::{AxiomMemberQuery, Relationship, RelationshipQuery, TermStore, VersionScope};
use tracing::debug;

use crate::axioms::{AxiomConverter, AxiomStreamAdapter};
use crate::error::SemanticError;

/// Concepts affected by a commit, per form.
#[derive(Debug, Default)]
pub struct ChangeSet {
    /// Sources of changed hierarchy edges.
    pub update_source: HashSet<ConceptId>,
    /// Destinations of changed hierarchy edges.
    pub update_destination: HashSet<ConceptId>,
    /// Every concept whose projection row must be revisited.
    pub updated_concepts: HashSet<ConceptId>,
}

impl ChangeSet {
    /// A change set covering exactly `updated_concepts`, used by rebuilds.
    #[must_use]
    pub fn seeded(updated_concepts: HashSet<ConceptId>) -> Self {
        Self {
            update_source: updated_concepts.clone(),
            update_destination: HashSet::new(),
            updated_concepts,
        }
    }

    /// Whether the commit is a no-op for the form.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.updated_concepts.is_empty()
    }
}

/// Discovers the change set for `form` from the deltas selected by `scope`.
pub(crate) async fn discover_changes(
    store: &dyn TermStore,
    converter: &dyn AxiomConverter,
    config: &SemanticIndexConfig,
    scope: &VersionScope,
    form: Form,
) -> Result<ChangeSet, SemanticError> {
    let mut update_source = HashSet::new();
    let mut update_destination = HashSet::new();

    // Changed hierarchy edges, active or not.
    let mut is_a_versions = store
        .stream_relationships(
            RelationshipQuery::new(scope.clone())
                .with_type(config.is_a_type_id)
                .with_characteristic_types(config.characteristic_types(form).clone()),
        )
        .await?;
    while let Some(relationship) = is_a_versions.next().await {
        let relationship = relationship?;
        update_source.insert(relationship.source_id);
        update_destination.insert(relationship.destination_id);
    }
    drop(is_a_versions);

    // Changed hierarchy fragments of touched axioms.
    if form.includes_axioms() {
        let members = store
            .stream_axiom_members(AxiomMemberQuery::new(scope.clone()))
            .await?;
        let is_a = config.is_a_type_id;
        AxiomStreamAdapter::new(converter)
            .for_each_fragment(
                members,
                Some(&move |fragment: &Relationship| fragment.type_id == is_a),
                |_, fragment| {
                    update_source.insert(fragment.source_id);
                    update_destination.insert(fragment.destination_id);
                },
            )
            .await?;
    }

    let mut updated_concepts = update_source.clone();

    // Attribute-only changes still require a projection rewrite.
    let mut attribute_versions = store
        .stream_relationships(
            RelationshipQuery::new(scope.clone())
                .without_type(config.is_a_type_id)
                .with_characteristic_types(config.characteristic_types(form).clone()),
        )
        .await?;
    while let Some(relationship) = attribute_versions.next().await {
        let relationship = relationship?;
        updated_concepts.insert(relationship.source_id);
    }
    drop(attribute_versions);

    // The object attribute carries a synthetic parent; touching it also
    // touches that parent's row.
    if update_destination.contains(&config.concept_model_object_attribute_id) {
        updated_concepts.insert(config.concept_model_attribute_id);
    }

    debug!(
        %form,
        sources = update_source.len(),
        destinations = update_destination.len(),
        updated = updated_concepts.len(),
        "discovered change set"
    );

    Ok(ChangeSet {
        update_source,
        update_destination,
        updated_concepts,
    })
}
