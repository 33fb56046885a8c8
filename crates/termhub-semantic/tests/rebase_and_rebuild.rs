//! Rebase reconciliation, full rebuilds, and the disabled switch.

mod support;

use std::collections::HashMap;

use support::*;
use termhub_core::{ConceptId, Form, SemanticIndexConfig};
use termhub_store::{QueryConcept, TermStore};

fn assert_same_projection(
    actual: &HashMap<ConceptId, QueryConcept>,
    expected: &HashMap<ConceptId, QueryConcept>,
) {
    let mut actual_ids: Vec<_> = actual.keys().copied().collect();
    let mut expected_ids: Vec<_> = expected.keys().copied().collect();
    actual_ids.sort_unstable();
    expected_ids.sort_unstable();
    assert_eq!(actual_ids, expected_ids);
    for (concept_id, row) in expected {
        let other = &actual[concept_id];
        assert_eq!(row.parents, other.parents, "parents of {concept_id}");
        assert_eq!(row.ancestors, other.ancestors, "ancestors of {concept_id}");
        assert_eq!(
            row.attribute_groups, other.attribute_groups,
            "attributes of {concept_id}"
        );
    }
}

#[tokio::test]
async fn rebase_merges_parent_and_branch_content() {
    let f = fixture().await;
    seed_concepts(&f, "MAIN", &[1, 10, 11]).await;
    f.store.create_branch("MAIN/PROJECT").await.unwrap();

    commit_relationships(&f, "MAIN/PROJECT", vec![inferred_isa("r101", 10, 1)]).await;
    commit_relationships(&f, "MAIN", vec![inferred_isa("r111", 11, 1)]).await;

    // The parent's new content is not visible before the rebase.
    let rows = all_projections(&f, "MAIN/PROJECT", Form::Inferred).await;
    assert!(rows.contains_key(&10));
    assert!(!rows.contains_key(&11));

    rebase(&f, "MAIN/PROJECT").await;

    let rows = all_projections(&f, "MAIN/PROJECT", Form::Inferred).await;
    assert_eq!(rows[&10].parents, ids(&[1]));
    assert_eq!(rows[&11].parents, ids(&[1]));
    assert!(rows.contains_key(&1));
    assert_projection_invariants(&f, "MAIN/PROJECT", Form::Inferred).await;
}

#[tokio::test]
async fn rebase_replays_branch_deactivation_over_new_base() {
    let f = fixture().await;
    seed_concepts(&f, "MAIN", &[1, 2, 3, 4]).await;
    commit_relationships(
        &f,
        "MAIN",
        vec![inferred_isa("r21", 2, 1), inferred_isa("r31", 3, 1)],
    )
    .await;
    f.store.create_branch("MAIN/PROJECT").await.unwrap();

    // The branch deactivates 3 -> 1; the parent gains unrelated content.
    commit_relationships(&f, "MAIN/PROJECT", vec![inferred_isa("r31", 3, 1).inactive()])
        .await;
    assert!(
        projection(&f, "MAIN/PROJECT", Form::Inferred, 3)
            .await
            .is_none()
    );
    commit_relationships(&f, "MAIN", vec![inferred_isa("r41", 4, 1)]).await;

    rebase(&f, "MAIN/PROJECT").await;

    let rows = all_projections(&f, "MAIN/PROJECT", Form::Inferred).await;
    // The branch-local deactivation survives the rebase.
    assert!(!rows.contains_key(&3));
    // The parent's new content is picked up.
    assert_eq!(rows[&4].parents, ids(&[1]));
    assert_eq!(rows[&2].parents, ids(&[1]));
    assert_projection_invariants(&f, "MAIN/PROJECT", Form::Inferred).await;
}

#[tokio::test]
async fn rebase_restores_an_edge_reactivated_on_the_branch() {
    let f = fixture().await;
    seed_concepts(&f, "MAIN", &[1, 2, 3]).await;
    commit_relationships(&f, "MAIN", vec![inferred_isa("r31", 3, 1)]).await;
    f.store.create_branch("MAIN/PROJECT").await.unwrap();

    // Deactivate, then reactivate, in separate branch commits.
    commit_relationships(&f, "MAIN/PROJECT", vec![inferred_isa("r31", 3, 1).inactive()])
        .await;
    commit_relationships(&f, "MAIN/PROJECT", vec![inferred_isa("r31", 3, 1)]).await;
    assert_eq!(
        projection(&f, "MAIN/PROJECT", Form::Inferred, 3)
            .await
            .unwrap()
            .parents,
        ids(&[1])
    );

    commit_relationships(&f, "MAIN", vec![inferred_isa("r21", 2, 1)]).await;
    rebase(&f, "MAIN/PROJECT").await;

    let rows = all_projections(&f, "MAIN/PROJECT", Form::Inferred).await;
    assert_eq!(rows[&3].parents, ids(&[1]));
    assert_eq!(rows[&2].parents, ids(&[1]));
    assert_projection_invariants(&f, "MAIN/PROJECT", Form::Inferred).await;
}

#[tokio::test]
async fn rebuild_repairs_a_corrupted_projection() {
    let f = fixture().await;
    seed_concepts(&f, "MAIN", &[1, 2, 3, 4, 5, 7, 8]).await;
    commit_relationships(
        &f,
        "MAIN",
        vec![inferred_isa("r21", 2, 1), inferred_isa("r32", 3, 2)],
    )
    .await;
    commit_relationships(
        &f,
        "MAIN",
        vec![inferred_isa("r42", 4, 2), inferred_isa("r43", 4, 3)],
    )
    .await;
    commit_relationships(
        &f,
        "MAIN",
        vec![inferred_isa("r42", 4, 2).inactive(), inferred_isa("r41", 4, 1)],
    )
    .await;
    commit_relationships(
        &f,
        "MAIN",
        vec![
            inferred_isa("r51", 5, 1),
            inferred_attribute("a1", 5, 7, 8, 1),
        ],
    )
    .await;

    let expected = all_projections(&f, "MAIN", Form::Inferred).await;

    // Damage the stored row for concept 4 behind the updater's back.
    let commit = f.store.open_commit("MAIN", None).await.unwrap();
    let mut bogus = QueryConcept::new(4, Form::Inferred);
    bogus.parents = ids(&[2]);
    bogus.ancestors = ids(&[2]);
    f.store
        .save_query_concepts(&commit, vec![bogus])
        .await
        .unwrap();
    f.store.finish_commit(commit).await.unwrap();
    assert_ne!(
        projection(&f, "MAIN", Form::Inferred, 4).await.unwrap().ancestors,
        expected[&4].ancestors
    );

    f.updater.rebuild("MAIN").await.unwrap();

    let rebuilt = all_projections(&f, "MAIN", Form::Inferred).await;
    assert_same_projection(&rebuilt, &expected);
    assert_projection_invariants(&f, "MAIN", Form::Inferred).await;
}

#[tokio::test]
async fn rebuild_leaves_current_rows_untouched() {
    let f = fixture().await;
    seed_concepts(&f, "MAIN", &[1, 2, 3]).await;
    commit_relationships(
        &f,
        "MAIN",
        vec![inferred_isa("r21", 2, 1), inferred_isa("r32", 3, 2)],
    )
    .await;

    let before = all_projections(&f, "MAIN", Form::Inferred).await;
    f.updater.rebuild("MAIN").await.unwrap();
    let after = all_projections(&f, "MAIN", Form::Inferred).await;

    assert_same_projection(&after, &before);
    // Unchanged rows are not rewritten: the stored versions survive.
    for (concept_id, row) in &before {
        assert_eq!(
            row.version_id, after[concept_id].version_id,
            "row for {concept_id} was rewritten without a content change"
        );
    }
}

#[tokio::test]
async fn disabled_indexing_writes_no_rows() {
    let config = SemanticIndexConfig {
        enabled: false,
        ..test_config()
    };
    let f = fixture_with_config(config).await;
    seed_concepts(&f, "MAIN", &[1, 2]).await;
    commit_relationships(&f, "MAIN", vec![inferred_isa("r21", 2, 1)]).await;

    assert!(all_projections(&f, "MAIN", Form::Inferred).await.is_empty());
    assert!(all_projections(&f, "MAIN", Form::Stated).await.is_empty());
}

#[tokio::test]
async fn commit_without_semantic_changes_is_a_noop() {
    let f = fixture().await;
    seed_concepts(&f, "MAIN", &[1, 2]).await;
    assert!(all_projections(&f, "MAIN", Form::Inferred).await.is_empty());

    commit_relationships(&f, "MAIN", vec![inferred_isa("r21", 2, 1)]).await;
    let before = all_projections(&f, "MAIN", Form::Inferred).await;

    // A concept-only commit leaves the projection untouched.
    seed_concepts(&f, "MAIN", &[9]).await;
    let after = all_projections(&f, "MAIN", Form::Inferred).await;
    assert_same_projection(&after, &before);
}
