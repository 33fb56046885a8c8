//! The two coexisting variants of the semantic index.

use serde::{Deserialize, Serialize};

/// Selects which projection of the logical structure is being maintained.
///
/// The *stated* form is derived from author-supplied logical axioms plus
/// stated-hierarchy relationships; the *inferred* form from
/// classifier-produced relationships. Each form reads a disjoint set of
/// characteristic-type ids from the relationship store and writes its own
/// projection rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Form {
    /// Author-stated view: stated relationships plus OWL axiom fragments.
    Stated,
    /// Classifier output: inferred and additional relationships.
    Inferred,
}

impl Form {
    /// Both forms, in the order they are maintained per commit.
    pub const ALL: [Form; 2] = [Form::Stated, Form::Inferred];

    /// Whether this form also consumes OWL axiom reference-set members.
    #[must_use]
    pub fn includes_axioms(&self) -> bool {
        matches!(self, Form::Stated)
    }

    /// True for the stated form. Projection rows carry this as a flag.
    #[must_use]
    pub fn is_stated(&self) -> bool {
        matches!(self, Form::Stated)
    }

    /// The suffix appended to a concept id to build the projection row key.
    #[must_use]
    pub fn doc_suffix(&self) -> &'static str {
        match self {
            Form::Stated => "_s",
            Form::Inferred => "_i",
        }
    }
}

impl std::fmt::Display for Form {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Form::Stated => write!(f, "stated"),
            Form::Inferred => write!(f, "inferred"),
        }
    }
}
