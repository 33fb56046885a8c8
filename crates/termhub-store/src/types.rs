//! Versioned entity types managed by the store.
//!
//! Every entity carries a store-assigned `version_id` and the version
//! triple `(path, start, end)`, all assigned when the version is staged
//! into a commit. `end != None` marks the version superseded on its own
//! branch. Versions-replaced sets and deletion records identify specific
//! versions by `version_id`, never by the entity id.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use termhub_core::{ConceptId, Form};
use time::OffsetDateTime;

/// Effective-time sort key for versions that have not been published yet.
///
/// Sorts after every real `yyyymmdd` effective time so that unpublished
/// changes replay last.
pub const UNPUBLISHED_EFFECTIVE_TIME: i32 = 90_000_000;

/// Grouped non-hierarchical attribute assertions of one concept.
///
/// Outer key is the relationship group number; inner map is a multimap from
/// attribute type to the asserted values.
pub type AttributeGroups = BTreeMap<u8, BTreeMap<ConceptId, BTreeSet<ConceptId>>>;

/// A terminology concept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Concept {
    pub concept_id: ConceptId,
    pub active: bool,
    /// Release date as `yyyymmdd`, `None` for unpublished content.
    pub effective_time: Option<i32>,
    /// Store-assigned id of this specific version.
    pub version_id: String,
    pub path: String,
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub end: Option<OffsetDateTime>,
}

impl Concept {
    /// Creates an active, unpublished concept. Version fields are assigned
    /// by the store when the concept is staged into a commit.
    #[must_use]
    pub fn new(concept_id: ConceptId) -> Self {
        Self {
            concept_id,
            active: true,
            effective_time: None,
            version_id: String::new(),
            path: String::new(),
            start: OffsetDateTime::UNIX_EPOCH,
            end: None,
        }
    }

    /// Marks the concept inactive.
    #[must_use]
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// The store id of this entity, shared across its versions.
    #[must_use]
    pub fn store_id(&self) -> String {
        self.concept_id.to_string()
    }
}

/// A single relationship version.
///
/// `source_id` asserts `type_id = destination_id` within `group`. A type of
/// `IS_A` denotes a parent edge; every other type is a grouped attribute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    /// Stable relationship id, shared across versions.
    pub id: String,
    pub source_id: ConceptId,
    pub destination_id: ConceptId,
    pub type_id: ConceptId,
    pub group: u8,
    pub active: bool,
    pub characteristic_type_id: ConceptId,
    /// Release date as `yyyymmdd`, `None` for unpublished content.
    pub effective_time: Option<i32>,
    /// Store-assigned id of this specific version.
    pub version_id: String,
    pub path: String,
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub end: Option<OffsetDateTime>,
}

impl Relationship {
    /// Creates an active, ungrouped relationship version. Version fields
    /// are assigned by the store when the version is staged into a commit.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        source_id: ConceptId,
        type_id: ConceptId,
        destination_id: ConceptId,
        characteristic_type_id: ConceptId,
    ) -> Self {
        Self {
            id: id.into(),
            source_id,
            destination_id,
            type_id,
            group: 0,
            active: true,
            characteristic_type_id,
            effective_time: None,
            version_id: String::new(),
            path: String::new(),
            start: OffsetDateTime::UNIX_EPOCH,
            end: None,
        }
    }

    /// Sets the relationship group.
    #[must_use]
    pub fn with_group(mut self, group: u8) -> Self {
        self.group = group;
        self
    }

    /// Sets the release date.
    #[must_use]
    pub fn with_effective_time(mut self, effective_time: i32) -> Self {
        self.effective_time = Some(effective_time);
        self
    }

    /// Marks the version inactive.
    #[must_use]
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Effective time with unpublished content sorting last.
    #[must_use]
    pub fn effective_time_or_max(&self) -> i32 {
        self.effective_time.unwrap_or(UNPUBLISHED_EFFECTIVE_TIME)
    }
}

/// One member of the OWL axiom reference set.
///
/// The axiom expression is opaque to the store; the axiom conversion
/// service decomposes it into synthetic relationships.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AxiomMember {
    /// Stable member id (UUID), shared across versions.
    pub id: String,
    /// The concept this axiom is filed under.
    pub referenced_component_id: ConceptId,
    /// OWL functional-syntax expression.
    pub owl_expression: String,
    pub active: bool,
    /// Release date as `yyyymmdd`, `None` for unpublished content.
    pub effective_time: Option<i32>,
    /// Store-assigned id of this specific version.
    pub version_id: String,
    pub path: String,
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub end: Option<OffsetDateTime>,
}

impl AxiomMember {
    /// Creates an active, unpublished member. Version fields are assigned
    /// by the store when the version is staged into a commit.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        referenced_component_id: ConceptId,
        owl_expression: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            referenced_component_id,
            owl_expression: owl_expression.into(),
            active: true,
            effective_time: None,
            version_id: String::new(),
            path: String::new(),
            start: OffsetDateTime::UNIX_EPOCH,
            end: None,
        }
    }

    /// Marks the version inactive.
    #[must_use]
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Effective time with unpublished content sorting last.
    #[must_use]
    pub fn effective_time_or_max(&self) -> i32 {
        self.effective_time.unwrap_or(UNPUBLISHED_EFFECTIVE_TIME)
    }
}

/// A persisted semantic-index projection row.
///
/// One row per `(concept, form)` per branch version, keyed by
/// `concept_id_form`. Ancestors are stored inline and queried by term-set
/// membership; there is no separate ancestor index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryConcept {
    /// `"{concept_id}_s"` for the stated form, `"{concept_id}_i"` for the
    /// inferred form.
    pub concept_id_form: String,
    pub concept_id: ConceptId,
    pub stated: bool,
    /// Direct parents.
    pub parents: HashSet<ConceptId>,
    /// Full transitive closure of strict ancestors.
    pub ancestors: HashSet<ConceptId>,
    /// Grouped non-hierarchical attribute assertions.
    pub attribute_groups: AttributeGroups,
    /// Store-assigned id of this specific version.
    pub version_id: String,
    pub path: String,
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub end: Option<OffsetDateTime>,
}

impl QueryConcept {
    /// Creates an empty projection row for `concept_id` in `form`.
    #[must_use]
    pub fn new(concept_id: ConceptId, form: Form) -> Self {
        Self {
            concept_id_form: Self::form_key(concept_id, form),
            concept_id,
            stated: form.is_stated(),
            parents: HashSet::new(),
            ancestors: HashSet::new(),
            attribute_groups: AttributeGroups::new(),
            version_id: String::new(),
            path: String::new(),
            start: OffsetDateTime::UNIX_EPOCH,
            end: None,
        }
    }

    /// The projection row key for `(concept_id, form)`.
    #[must_use]
    pub fn form_key(concept_id: ConceptId, form: Form) -> String {
        format!("{concept_id}{}", form.doc_suffix())
    }

    /// The form this row belongs to.
    #[must_use]
    pub fn form(&self) -> Form {
        if self.stated { Form::Stated } else { Form::Inferred }
    }
}
