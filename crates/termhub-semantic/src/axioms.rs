//! Axiom-to-relationship adaptation.
//!
//! OWL axiom expressions are opaque to the index; an external conversion
//! service decomposes each reference-set member into synthetic
//! relationships. The adapter streams members past that service, stamps
//! the named left-hand-side concept onto each fragment, and feeds the
//! fragments to a consumer. Members the service cannot express as a named
//! concept with right-hand-side relationships (GCI axioms, property
//! chains) are skipped silently.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use termhub_core::ConceptId;
use termhub_store::{AxiomMember, EntityStream, Relationship};
use tracing::trace;

use crate::error::SemanticError;

/// The decomposition of one axiom expression.
///
/// `None` in either field marks the member as not a regular axiom; the
/// adapter skips such members without error.
#[derive(Debug, Clone, Default)]
pub struct ConvertedAxiom {
    /// The named concept on the left-hand side of the axiom.
    pub named_concept: Option<ConceptId>,
    /// The relationship fragments on the right-hand side.
    pub relationships: Option<Vec<Relationship>>,
}

/// Error returned by the axiom conversion service.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct AxiomConversionError {
    /// The service's error message.
    pub message: String,
}

impl AxiomConversionError {
    /// Creates a conversion error from a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// External axiom conversion service.
#[async_trait]
pub trait AxiomConverter: Send + Sync {
    /// Decomposes one axiom member into synthetic relationships.
    ///
    /// # Errors
    ///
    /// A conversion error aborts the surrounding commit.
    async fn convert(&self, member: &AxiomMember) -> Result<ConvertedAxiom, AxiomConversionError>;
}

/// Type alias for a shared converter trait object.
pub type DynAxiomConverter = Arc<dyn AxiomConverter>;

/// Streams axiom members through the conversion service and yields
/// `(member, relationship)` pairs to a consumer.
pub(crate) struct AxiomStreamAdapter<'a> {
    converter: &'a dyn AxiomConverter,
}

impl<'a> AxiomStreamAdapter<'a> {
    pub(crate) fn new(converter: &'a dyn AxiomConverter) -> Self {
        Self { converter }
    }

    /// Drains `members`, handing each right-hand-side relationship that
    /// matches `predicate` to `consumer` with the named concept stamped
    /// onto its source.
    ///
    /// A conversion failure is captured, the stream is still drained, and
    /// the first failure is returned at stream end so the commit aborts.
    pub(crate) async fn for_each_fragment<F>(
        &self,
        mut members: EntityStream<'static, AxiomMember>,
        predicate: Option<&(dyn Fn(&Relationship) -> bool + Send + Sync)>,
        mut consumer: F,
    ) -> Result<(), SemanticError>
    where
        F: FnMut(&AxiomMember, Relationship),
    {
        let mut failure: Option<SemanticError> = None;
        while let Some(member) = members.next().await {
            let member = member?;
            match self.converter.convert(&member).await {
                Ok(converted) => {
                    let (Some(named_concept), Some(relationships)) =
                        (converted.named_concept, converted.relationships)
                    else {
                        trace!(member_id = %member.id, "skipping non-regular axiom");
                        continue;
                    };
                    for mut relationship in relationships {
                        if predicate.is_none_or(|accept| accept(&relationship)) {
                            relationship.source_id = named_concept;
                            consumer(&member, relationship);
                        }
                    }
                }
                Err(err) => {
                    failure
                        .get_or_insert_with(|| SemanticError::conversion(&member.id, err.to_string()));
                }
            }
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
