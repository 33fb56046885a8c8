//! Uniform access to the version metadata of each entity kind.

use termhub_store::{AxiomMember, Concept, EntityKind, QueryConcept, Relationship};
use time::OffsetDateTime;

/// A stored entity version with its store-assigned version id and the
/// `(path, start, end)` triple.
pub(crate) trait VersionedRow: Clone + Send {
    const KIND: EntityKind;

    /// The entity id shared across versions of the same entity.
    fn row_id(&self) -> String;
    /// The id of this specific version.
    fn version_id(&self) -> &str;
    fn path(&self) -> &str;
    fn start(&self) -> OffsetDateTime;
    fn end(&self) -> Option<OffsetDateTime>;
    fn set_version(&mut self, version_id: String, path: String, start: OffsetDateTime);
    fn set_end(&mut self, end: Option<OffsetDateTime>);
}

macro_rules! versioned_row {
    ($ty:ty, $kind:expr, $id:expr) => {
        impl VersionedRow for $ty {
            const KIND: EntityKind = $kind;

            fn row_id(&self) -> String {
                let id: fn(&$ty) -> String = $id;
                id(self)
            }

            fn version_id(&self) -> &str {
                &self.version_id
            }

            fn path(&self) -> &str {
                &self.path
            }

            fn start(&self) -> OffsetDateTime {
                self.start
            }

            fn end(&self) -> Option<OffsetDateTime> {
                self.end
            }

            fn set_version(&mut self, version_id: String, path: String, start: OffsetDateTime) {
                self.version_id = version_id;
                self.path = path;
                self.start = start;
                self.end = None;
            }

            fn set_end(&mut self, end: Option<OffsetDateTime>) {
                self.end = end;
            }
        }
    };
}

versioned_row!(Concept, EntityKind::Concept, |c| c.concept_id.to_string());
versioned_row!(Relationship, EntityKind::Relationship, |r| r.id.clone());
versioned_row!(AxiomMember, EntityKind::AxiomMember, |m| m.id.clone());
versioned_row!(QueryConcept, EntityKind::QueryConcept, |q| q
    .concept_id_form
    .clone());
