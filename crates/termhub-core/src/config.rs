//! Configuration for the semantic index updater.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::form::Form;
use crate::ids::{ConceptId, concepts};

/// Default batch size for projection-row writes.
const DEFAULT_BATCH_SAVE_SIZE: usize = 1000;

/// Configuration for semantic index maintenance.
///
/// All concept-model ids default to the international SNOMED CT values and
/// can be overridden per deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticIndexConfig {
    /// Maintain the semantic index on every commit.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Number of projection rows written per storage batch.
    #[serde(default = "default_batch_save_size")]
    pub batch_save_size: usize,

    /// The hierarchical relationship type.
    #[serde(default = "default_is_a")]
    pub is_a_type_id: ConceptId,

    /// The terminology root. The root keeps a projection row with empty
    /// parents; every other concept's row is deleted when its parents
    /// become empty.
    #[serde(default = "default_root")]
    pub root_concept_id: ConceptId,

    /// `Concept model attribute` — synthetic parent of the object attribute.
    #[serde(default = "default_concept_model_attribute")]
    pub concept_model_attribute_id: ConceptId,

    /// `Concept model object attribute` — gets the synthetic parent edge.
    #[serde(default = "default_concept_model_object_attribute")]
    pub concept_model_object_attribute_id: ConceptId,

    /// The OWL axiom reference set consumed by the stated form.
    #[serde(default = "default_owl_axiom_refset")]
    pub owl_axiom_refset_id: ConceptId,

    /// Characteristic types read by the stated form.
    #[serde(default = "default_stated_types")]
    pub stated_characteristic_types: HashSet<ConceptId>,

    /// Characteristic types read by the inferred form.
    #[serde(default = "default_inferred_types")]
    pub inferred_characteristic_types: HashSet<ConceptId>,
}

fn default_enabled() -> bool {
    true
}

fn default_batch_save_size() -> usize {
    DEFAULT_BATCH_SAVE_SIZE
}

fn default_is_a() -> ConceptId {
    concepts::IS_A
}

fn default_root() -> ConceptId {
    concepts::SNOMEDCT_ROOT
}

fn default_concept_model_attribute() -> ConceptId {
    concepts::CONCEPT_MODEL_ATTRIBUTE
}

fn default_concept_model_object_attribute() -> ConceptId {
    concepts::CONCEPT_MODEL_OBJECT_ATTRIBUTE
}

fn default_owl_axiom_refset() -> ConceptId {
    concepts::OWL_AXIOM_REFERENCE_SET
}

fn default_stated_types() -> HashSet<ConceptId> {
    HashSet::from([concepts::STATED_RELATIONSHIP])
}

fn default_inferred_types() -> HashSet<ConceptId> {
    HashSet::from([
        concepts::INFERRED_RELATIONSHIP,
        concepts::ADDITIONAL_RELATIONSHIP,
    ])
}

impl Default for SemanticIndexConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            batch_save_size: default_batch_save_size(),
            is_a_type_id: default_is_a(),
            root_concept_id: default_root(),
            concept_model_attribute_id: default_concept_model_attribute(),
            concept_model_object_attribute_id: default_concept_model_object_attribute(),
            owl_axiom_refset_id: default_owl_axiom_refset(),
            stated_characteristic_types: default_stated_types(),
            inferred_characteristic_types: default_inferred_types(),
        }
    }
}

impl SemanticIndexConfig {
    /// The characteristic-type ids consumed by `form`.
    #[must_use]
    pub fn characteristic_types(&self, form: Form) -> &HashSet<ConceptId> {
        match form {
            Form::Stated => &self.stated_characteristic_types,
            Form::Inferred => &self.inferred_characteristic_types,
        }
    }
}
