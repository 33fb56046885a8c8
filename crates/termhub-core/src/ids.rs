//! Concept identifiers and the well-known concept model ids.

/// A stable 64-bit concept identifier from the terminology namespace.
pub type ConceptId = i64;

/// Well-known SNOMED CT concept ids used by the concept model.
///
/// Deployments targeting an extension or a different namespace can
/// override each of these through [`crate::SemanticIndexConfig`].
pub mod concepts {
    use super::ConceptId;

    /// `116680003 | Is a (attribute) |` — the hierarchical relationship type.
    pub const IS_A: ConceptId = 116_680_003;

    /// `138875005 | SNOMED CT Concept (SNOMED RT+CTV3) |` — the terminology root.
    pub const SNOMEDCT_ROOT: ConceptId = 138_875_005;

    /// `410662002 | Concept model attribute (attribute) |`
    pub const CONCEPT_MODEL_ATTRIBUTE: ConceptId = 410_662_002;

    /// `762705008 | Concept model object attribute (attribute) |`
    ///
    /// Subsumed by [`CONCEPT_MODEL_ATTRIBUTE`] in every projection form even
    /// though no input relationship asserts the edge.
    pub const CONCEPT_MODEL_OBJECT_ATTRIBUTE: ConceptId = 762_705_008;

    /// `733073007 | OWL axiom reference set (foundation metadata concept) |`
    pub const OWL_AXIOM_REFERENCE_SET: ConceptId = 733_073_007;

    /// `900000000000010007 | Stated relationship (core metadata concept) |`
    pub const STATED_RELATIONSHIP: ConceptId = 900_000_000_000_010_007;

    /// `900000000000011006 | Inferred relationship (core metadata concept) |`
    pub const INFERRED_RELATIONSHIP: ConceptId = 900_000_000_000_011_006;

    /// `900000000000227009 | Additional relationship (core metadata concept) |`
    pub const ADDITIONAL_RELATIONSHIP: ConceptId = 900_000_000_000_227_009;
}
