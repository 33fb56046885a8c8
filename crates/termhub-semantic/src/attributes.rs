//! Per-concept log of grouped attribute changes.
//!
//! Changes accumulate in stream order during delta replay and are applied
//! in effective-time order, so that multiple versions of the same
//! assertion within one commit window replay historical state correctly.

use std::collections::HashMap;

use termhub_core::ConceptId;
use termhub_store::{AttributeGroups, UNPUBLISHED_EFFECTIVE_TIME};

/// One add or remove of a grouped attribute assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeChange {
    /// Release date as `yyyymmdd`; unpublished changes sort last.
    pub effective_time: i32,
    pub group: u8,
    pub type_id: ConceptId,
    pub value_id: ConceptId,
    pub add: bool,
}

/// Append-only attribute-change log for one concept.
#[derive(Debug, Default)]
pub struct AttributeChanges {
    changes: Vec<AttributeChange>,
}

impl AttributeChanges {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an addition.
    pub fn add(
        &mut self,
        effective_time: Option<i32>,
        group: u8,
        type_id: ConceptId,
        value_id: ConceptId,
    ) {
        self.push(effective_time, group, type_id, value_id, true);
    }

    /// Appends a removal.
    pub fn remove(
        &mut self,
        effective_time: Option<i32>,
        group: u8,
        type_id: ConceptId,
        value_id: ConceptId,
    ) {
        self.push(effective_time, group, type_id, value_id, false);
    }

    fn push(
        &mut self,
        effective_time: Option<i32>,
        group: u8,
        type_id: ConceptId,
        value_id: ConceptId,
        add: bool,
    ) {
        self.changes.push(AttributeChange {
            effective_time: effective_time.unwrap_or(UNPUBLISHED_EFFECTIVE_TIME),
            group,
            type_id,
            value_id,
            add,
        });
    }

    /// The changes in replay order: effective time ascending, additions
    /// before removals at equal effective time. The sort is stable, so
    /// same-key changes keep their stream order.
    #[must_use]
    pub fn effective_sorted(&self) -> Vec<&AttributeChange> {
        let mut sorted: Vec<&AttributeChange> = self.changes.iter().collect();
        sorted.sort_by_key(|c| (c.effective_time, !c.add));
        sorted
    }

    /// Replays the log onto `groups`. Additions insert, removals delete
    /// idempotently; groups and type entries left empty are dropped.
    pub fn apply_to(&self, groups: &mut AttributeGroups) {
        for change in self.effective_sorted() {
            if change.add {
                groups
                    .entry(change.group)
                    .or_default()
                    .entry(change.type_id)
                    .or_default()
                    .insert(change.value_id);
            } else if let Some(types) = groups.get_mut(&change.group) {
                if let Some(values) = types.get_mut(&change.type_id) {
                    values.remove(&change.value_id);
                    if values.is_empty() {
                        types.remove(&change.type_id);
                    }
                }
                if types.is_empty() {
                    groups.remove(&change.group);
                }
            }
        }
    }

    /// Whether the log holds no changes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Attribute-change logs for every concept touched by a commit.
pub type AttributeChangeMap = HashMap<ConceptId, AttributeChanges>;
