//! Shared fixtures for the semantic index integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::StreamExt;
use termhub_core::{ConceptId, Form, SemanticIndexConfig, concepts};
use termhub_semantic::{
    AxiomConversionError, AxiomConverter, ConvertedAxiom, SemanticIndexUpdater,
};
use termhub_store::{
    AxiomMember, Concept, QueryConcept, QueryConceptQuery, Relationship, TermStore, VersionScope,
};
use termhub_store_memory::MemoryStore;

/// Conversion-service stub backed by a member-id table. Unregistered
/// members convert to the non-regular-axiom sentinel.
#[derive(Default)]
pub struct TableConverter {
    table: Mutex<HashMap<String, ConvertedAxiom>>,
    failing: Mutex<HashSet<String>>,
}

impl TableConverter {
    /// Registers the decomposition of a member: fragments are
    /// `(type_id, destination_id, group)` stamped with `named_concept`.
    pub fn register(
        &self,
        member_id: &str,
        named_concept: ConceptId,
        fragments: &[(ConceptId, ConceptId, u8)],
    ) {
        let relationships = fragments
            .iter()
            .map(|&(type_id, destination_id, group)| {
                Relationship::new("", 0, type_id, destination_id, concepts::STATED_RELATIONSHIP)
                    .with_group(group)
            })
            .collect();
        self.table.lock().unwrap().insert(
            member_id.to_string(),
            ConvertedAxiom {
                named_concept: Some(named_concept),
                relationships: Some(relationships),
            },
        );
    }

    /// Makes conversion of `member_id` fail.
    pub fn fail_on(&self, member_id: &str) {
        self.failing.lock().unwrap().insert(member_id.to_string());
    }
}

#[async_trait]
impl AxiomConverter for TableConverter {
    async fn convert(&self, member: &AxiomMember) -> Result<ConvertedAxiom, AxiomConversionError> {
        if self.failing.lock().unwrap().contains(&member.id) {
            return Err(AxiomConversionError::new("malformed axiom expression"));
        }
        Ok(self
            .table
            .lock()
            .unwrap()
            .get(&member.id)
            .cloned()
            .unwrap_or_default())
    }
}

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub updater: Arc<SemanticIndexUpdater>,
    pub converter: Arc<TableConverter>,
}

/// Test configuration: concept `1` is the terminology root.
pub fn test_config() -> SemanticIndexConfig {
    SemanticIndexConfig {
        root_concept_id: 1,
        ..SemanticIndexConfig::default()
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub async fn fixture_with_config(config: SemanticIndexConfig) -> Fixture {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    store.create_branch("MAIN").await.unwrap();
    let converter = Arc::new(TableConverter::default());
    let updater = Arc::new(SemanticIndexUpdater::new(
        store.clone(),
        converter.clone(),
        config,
    ));
    store.add_commit_hook(updater.clone()).await;
    Fixture {
        store,
        updater,
        converter,
    }
}

pub async fn fixture() -> Fixture {
    fixture_with_config(test_config()).await
}

pub fn inferred_isa(id: &str, source: ConceptId, destination: ConceptId) -> Relationship {
    Relationship::new(
        id,
        source,
        concepts::IS_A,
        destination,
        concepts::INFERRED_RELATIONSHIP,
    )
}

pub fn stated_isa(id: &str, source: ConceptId, destination: ConceptId) -> Relationship {
    Relationship::new(
        id,
        source,
        concepts::IS_A,
        destination,
        concepts::STATED_RELATIONSHIP,
    )
}

pub fn inferred_attribute(
    id: &str,
    source: ConceptId,
    type_id: ConceptId,
    value_id: ConceptId,
    group: u8,
) -> Relationship {
    Relationship::new(id, source, type_id, value_id, concepts::INFERRED_RELATIONSHIP)
        .with_group(group)
}

pub async fn seed_concepts(f: &Fixture, path: &str, ids: &[ConceptId]) {
    let commit = f.store.open_commit(path, None).await.unwrap();
    for id in ids {
        f.store
            .stage_concept(&commit, Concept::new(*id))
            .await
            .unwrap();
    }
    f.store.finish_commit(commit).await.unwrap();
}

pub async fn commit_content(
    f: &Fixture,
    path: &str,
    relationships: Vec<Relationship>,
    members: Vec<AxiomMember>,
) {
    let commit = f.store.open_commit(path, None).await.unwrap();
    for relationship in relationships {
        f.store
            .stage_relationship(&commit, relationship)
            .await
            .unwrap();
    }
    for member in members {
        f.store.stage_axiom_member(&commit, member).await.unwrap();
    }
    f.store.finish_commit(commit).await.unwrap();
}

pub async fn commit_relationships(f: &Fixture, path: &str, relationships: Vec<Relationship>) {
    commit_content(f, path, relationships, Vec::new()).await;
}

pub async fn delete_relationships(f: &Fixture, path: &str, ids: &[&str]) {
    let mut commit = f.store.open_commit(path, None).await.unwrap();
    for id in ids {
        assert!(f.store.delete_relationship(&mut commit, id).await.unwrap());
    }
    f.store.finish_commit(commit).await.unwrap();
}

pub async fn rebase(f: &Fixture, path: &str) {
    let commit = f.store.open_rebase_commit(path).await.unwrap();
    f.store.finish_commit(commit).await.unwrap();
}

/// All projection rows of `form` visible on `path`, keyed by concept.
pub async fn all_projections(
    f: &Fixture,
    path: &str,
    form: Form,
) -> HashMap<ConceptId, QueryConcept> {
    let commit = f.store.open_commit(path, None).await.unwrap();
    let query = QueryConceptQuery::new(VersionScope::VisibleBefore(commit.clone()), form);
    let mut stream = f.store.stream_query_concepts(query).await.unwrap();
    let mut rows = HashMap::new();
    while let Some(row) = stream.next().await {
        let row = row.unwrap();
        rows.insert(row.concept_id, row);
    }
    drop(stream);
    f.store.abort_commit(commit).await.unwrap();
    rows
}

pub async fn projection(
    f: &Fixture,
    path: &str,
    form: Form,
    concept: ConceptId,
) -> Option<QueryConcept> {
    all_projections(f, path, form).await.remove(&concept)
}

pub fn ids(values: &[ConceptId]) -> HashSet<ConceptId> {
    values.iter().copied().collect()
}

/// Checks the structural invariants of the stored projection: parents are
/// a subset of ancestors, and every ancestor has its own row.
pub async fn assert_projection_invariants(f: &Fixture, path: &str, form: Form) {
    let rows = all_projections(f, path, form).await;
    for row in rows.values() {
        assert!(
            row.parents.is_subset(&row.ancestors),
            "parents of {} are not a subset of its ancestors",
            row.concept_id
        );
        for ancestor in &row.ancestors {
            assert!(
                rows.contains_key(ancestor),
                "ancestor {ancestor} of {} has no projection row",
                row.concept_id
            );
        }
    }
}
