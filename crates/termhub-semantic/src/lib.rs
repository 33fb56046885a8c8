//! # termhub-semantic
//!
//! Incremental maintenance of the semantic index: a per-branch projection
//! recording, for every concept, its direct parents, its full ancestor
//! set, and its grouped attribute assertions. The projection is what lets
//! subsumption queries, descendant enumeration, and grouped-attribute
//! search run in near-constant time.
//!
//! Two forms coexist — *stated* (author axioms plus stated hierarchy) and
//! *inferred* (classifier output) — and both are kept consistent with the
//! source artifacts after every commit by [`SemanticIndexUpdater`], which
//! runs as a commit hook. [`SemanticIndexUpdater::rebuild`] recomputes a
//! branch from scratch through the same pipeline.
//!
//! ```ignore
//! use std::sync::Arc;
//! use termhub_semantic::SemanticIndexUpdater;
//!
//! let updater = Arc::new(SemanticIndexUpdater::new(store.clone(), converter, config));
//! store.add_commit_hook(updater.clone()).await;
//! ```

pub mod attributes;
pub mod axioms;
pub mod changes;
pub mod error;
pub mod graph;
mod loader;
mod rebase;
pub mod updater;
mod writer;

pub use attributes::{AttributeChange, AttributeChangeMap, AttributeChanges};
pub use axioms::{AxiomConversionError, AxiomConverter, ConvertedAxiom, DynAxiomConverter};
pub use changes::ChangeSet;
pub use error::{SemanticError, SemanticResult};
pub use graph::{GraphBuilder, Node};
pub use updater::SemanticIndexUpdater;
