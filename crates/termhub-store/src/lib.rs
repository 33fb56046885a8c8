//! # termhub-store
//!
//! Versioned content store abstraction for the TermHub server.
//!
//! Terminology artifacts live on a tree of branches. Each branch layers its
//! own entity versions over a snapshot of its parent; deleting or replacing
//! a parent version on a child branch records the version id in the
//! branch's *versions-replaced* set instead of touching the parent row.
//! Writes happen inside an atomic [`Commit`]; registered [`CommitHook`]s run
//! between the staged writes and durability, and a hook error aborts the
//! commit.
//!
//! This crate defines the model types, the query builders, and the
//! [`TermStore`] trait. It does not contain an implementation — backends
//! are provided by separate crates such as `termhub-store-memory`.

mod branch;
mod error;
mod hooks;
mod query;
mod traits;
mod types;

pub use branch::{Branch, Commit, CommitType, EntityKind, VersionScope};
pub use error::{StoreError, StoreResult};
pub use hooks::{CommitHook, HookError};
pub use query::{
    AxiomMemberQuery, QueryConceptQuery, RelationshipOrder, RelationshipQuery,
};
pub use traits::{DynTermStore, EntityStream, TermStore};
pub use types::{
    AttributeGroups, AxiomMember, Concept, QueryConcept, Relationship,
    UNPUBLISHED_EFFECTIVE_TIME,
};
