//! Query builders for the streaming range-scans backends must support.
//!
//! Result sets can exceed any single-query upper bound the backing search
//! index imposes, so every query is answered through a bounded-memory
//! cursor stream rather than a collected page.

use std::collections::HashSet;

use termhub_core::{ConceptId, Form};

use crate::branch::VersionScope;

/// Sort order for a relationship scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelationshipOrder {
    /// Backend-native order; cheapest when the consumer only collects ids.
    #[default]
    Unspecified,
    /// `(effective_time, active, start)` ascending — the delta-replay order.
    /// Unpublished effective times sort last; inactive sorts before active
    /// so that a reactivation within one commit window wins.
    EffectiveTimeActiveStart,
}

/// A filtered scan over relationship versions.
#[derive(Debug, Clone)]
pub struct RelationshipQuery {
    pub scope: VersionScope,
    /// Match only this relationship type.
    pub type_id: Option<ConceptId>,
    /// Exclude this relationship type (attribute-only scans).
    pub exclude_type_id: Option<ConceptId>,
    /// Match any of these characteristic types.
    pub characteristic_types: Option<HashSet<ConceptId>>,
    /// Match only these source concepts.
    pub source_ids: Option<HashSet<ConceptId>>,
    /// Match only this activity state.
    pub active: Option<bool>,
    pub order: RelationshipOrder,
}

impl RelationshipQuery {
    /// Creates an unfiltered scan over `scope`.
    #[must_use]
    pub fn new(scope: VersionScope) -> Self {
        Self {
            scope,
            type_id: None,
            exclude_type_id: None,
            characteristic_types: None,
            source_ids: None,
            active: None,
            order: RelationshipOrder::Unspecified,
        }
    }

    /// Restricts the scan to one relationship type.
    #[must_use]
    pub fn with_type(mut self, type_id: ConceptId) -> Self {
        self.type_id = Some(type_id);
        self
    }

    /// Excludes one relationship type from the scan.
    #[must_use]
    pub fn without_type(mut self, type_id: ConceptId) -> Self {
        self.exclude_type_id = Some(type_id);
        self
    }

    /// Restricts the scan to the given characteristic types.
    #[must_use]
    pub fn with_characteristic_types(mut self, types: HashSet<ConceptId>) -> Self {
        self.characteristic_types = Some(types);
        self
    }

    /// Restricts the scan to the given source concepts.
    #[must_use]
    pub fn with_source_ids(mut self, source_ids: HashSet<ConceptId>) -> Self {
        self.source_ids = Some(source_ids);
        self
    }

    /// Restricts the scan to active versions.
    #[must_use]
    pub fn active_only(mut self) -> Self {
        self.active = Some(true);
        self
    }

    /// Sorts the stream in delta-replay order.
    #[must_use]
    pub fn ordered_for_replay(mut self) -> Self {
        self.order = RelationshipOrder::EffectiveTimeActiveStart;
        self
    }
}

/// A filtered scan over axiom reference-set members.
#[derive(Debug, Clone)]
pub struct AxiomMemberQuery {
    pub scope: VersionScope,
    /// Match only members referencing these concepts.
    pub referenced_component_ids: Option<HashSet<ConceptId>>,
    /// Match only this activity state.
    pub active: Option<bool>,
    /// Sort in `(effective_time, active, start)` order when set.
    pub ordered_for_replay: bool,
}

impl AxiomMemberQuery {
    /// Creates an unfiltered scan over `scope`.
    #[must_use]
    pub fn new(scope: VersionScope) -> Self {
        Self {
            scope,
            referenced_component_ids: None,
            active: None,
            ordered_for_replay: false,
        }
    }

    /// Restricts the scan to members referencing the given concepts.
    #[must_use]
    pub fn with_referenced_components(mut self, ids: HashSet<ConceptId>) -> Self {
        self.referenced_component_ids = Some(ids);
        self
    }

    /// Restricts the scan to active members.
    #[must_use]
    pub fn active_only(mut self) -> Self {
        self.active = Some(true);
        self
    }

    /// Sorts the stream in delta-replay order.
    #[must_use]
    pub fn ordered_for_replay(mut self) -> Self {
        self.ordered_for_replay = true;
        self
    }
}

/// A filtered scan over projection rows of one form.
#[derive(Debug, Clone)]
pub struct QueryConceptQuery {
    pub scope: VersionScope,
    pub form: Form,
    /// Match only rows for these concepts.
    pub concept_ids: Option<HashSet<ConceptId>>,
    /// Match rows whose stored ancestor set intersects these ids.
    pub ancestors_any_of: Option<HashSet<ConceptId>>,
}

impl QueryConceptQuery {
    /// Creates a scan over all rows of `form` in `scope`.
    #[must_use]
    pub fn new(scope: VersionScope, form: Form) -> Self {
        Self {
            scope,
            form,
            concept_ids: None,
            ancestors_any_of: None,
        }
    }

    /// Restricts the scan to rows for the given concepts.
    #[must_use]
    pub fn with_concept_ids(mut self, ids: HashSet<ConceptId>) -> Self {
        self.concept_ids = Some(ids);
        self
    }

    /// Restricts the scan to rows claiming any of `ids` as an ancestor.
    #[must_use]
    pub fn with_any_ancestor(mut self, ids: HashSet<ConceptId>) -> Self {
        self.ancestors_any_of = Some(ids);
        self
    }
}
