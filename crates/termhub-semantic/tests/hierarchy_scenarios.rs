//! End-to-end hierarchy maintenance through the commit hook.

mod support;

use support::*;
use termhub_core::{Form, concepts};

#[tokio::test]
async fn single_chain_builds_parents_and_ancestors() {
    let f = fixture().await;
    seed_concepts(&f, "MAIN", &[1, 2, 3]).await;
    commit_relationships(
        &f,
        "MAIN",
        vec![inferred_isa("r21", 2, 1), inferred_isa("r32", 3, 2)],
    )
    .await;

    let rows = all_projections(&f, "MAIN", Form::Inferred).await;
    assert_eq!(rows[&3].parents, ids(&[2]));
    assert_eq!(rows[&3].ancestors, ids(&[2, 1]));
    assert_eq!(rows[&2].parents, ids(&[1]));
    assert_eq!(rows[&2].ancestors, ids(&[1]));
    // The root keeps a row with empty parents.
    assert!(rows[&1].parents.is_empty());
    assert!(rows[&1].ancestors.is_empty());
    assert_eq!(rows[&1].concept_id_form, "1_i");

    assert_projection_invariants(&f, "MAIN", Form::Inferred).await;
    // Nothing was indexed for the stated form.
    assert!(all_projections(&f, "MAIN", Form::Stated).await.is_empty());
}

#[tokio::test]
async fn diamond_closure_deduplicates() {
    let f = fixture().await;
    seed_concepts(&f, "MAIN", &[1, 2, 3, 4]).await;
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

    let row = projection(&f, "MAIN", Form::Inferred, 4).await.unwrap();
    assert_eq!(row.parents, ids(&[2, 3]));
    assert_eq!(row.ancestors, ids(&[2, 3, 1]));
    assert_projection_invariants(&f, "MAIN", Form::Inferred).await;
}

#[tokio::test]
async fn reparenting_keeps_ancestry_through_remaining_route() {
    let f = fixture().await;
    seed_concepts(&f, "MAIN", &[1, 2, 3, 4]).await;
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

    // Deactivate 4 -> 2 and add 4 -> 1 in the same commit.
    commit_relationships(
        &f,
        "MAIN",
        vec![inferred_isa("r42", 4, 2).inactive(), inferred_isa("r41", 4, 1)],
    )
    .await;

    let row = projection(&f, "MAIN", Form::Inferred, 4).await.unwrap();
    assert_eq!(row.parents, ids(&[3, 1]));
    // 2 stays an ancestor via 3.
    assert_eq!(row.ancestors, ids(&[3, 2, 1]));
    assert_projection_invariants(&f, "MAIN", Form::Inferred).await;
}

#[tokio::test]
async fn descendant_keeps_ancestry_through_a_route_outside_the_change() {
    let f = fixture().await;
    seed_concepts(&f, "MAIN", &[1, 2, 3, 6, 7, 8]).await;
    // 8 inherits through 2 (about to change) and independently through
    // 7 -> 6, a route no changed edge touches.
    commit_relationships(
        &f,
        "MAIN",
        vec![
            inferred_isa("r21", 2, 1),
            inferred_isa("r31", 3, 1),
            inferred_isa("r61", 6, 1),
            inferred_isa("r76", 7, 6),
            inferred_isa("r82", 8, 2),
            inferred_isa("r87", 8, 7),
        ],
    )
    .await;

    commit_relationships(&f, "MAIN", vec![inferred_isa("r23", 2, 3)]).await;

    let row = projection(&f, "MAIN", Form::Inferred, 8).await.unwrap();
    assert_eq!(row.parents, ids(&[2, 7]));
    // The new ancestor 3 arrives via 2; 6 survives via the untouched
    // 7 -> 6 route.
    assert_eq!(row.ancestors, ids(&[2, 3, 7, 6, 1]));
    assert_projection_invariants(&f, "MAIN", Form::Inferred).await;
}

#[tokio::test]
async fn concept_with_no_remaining_parents_loses_its_row() {
    let f = fixture().await;
    seed_concepts(&f, "MAIN", &[1, 2, 3]).await;
    commit_relationships(
        &f,
        "MAIN",
        vec![inferred_isa("r21", 2, 1), inferred_isa("r32", 3, 2)],
    )
    .await;

    commit_relationships(&f, "MAIN", vec![inferred_isa("r32", 3, 2).inactive()]).await;

    assert!(projection(&f, "MAIN", Form::Inferred, 3).await.is_none());
    // The rest of the chain is untouched.
    let rows = all_projections(&f, "MAIN", Form::Inferred).await;
    assert_eq!(rows[&2].parents, ids(&[1]));
    assert!(rows.contains_key(&1));
}

#[tokio::test]
async fn deleting_the_only_parent_edge_also_deletes_the_row() {
    let f = fixture().await;
    seed_concepts(&f, "MAIN", &[1, 2, 3]).await;
    commit_relationships(
        &f,
        "MAIN",
        vec![inferred_isa("r21", 2, 1), inferred_isa("r32", 3, 2)],
    )
    .await;

    delete_relationships(&f, "MAIN", &["r32"]).await;

    assert!(projection(&f, "MAIN", Form::Inferred, 3).await.is_none());
    assert!(projection(&f, "MAIN", Form::Inferred, 2).await.is_some());
}

#[tokio::test]
async fn grouped_attributes_accumulate_across_commits() {
    let f = fixture().await;
    seed_concepts(&f, "MAIN", &[1, 5, 7, 8, 9]).await;
    commit_relationships(
        &f,
        "MAIN",
        vec![
            inferred_isa("r51", 5, 1),
            inferred_attribute("a1", 5, 7, 8, 1),
        ],
    )
    .await;

    let row = projection(&f, "MAIN", Form::Inferred, 5).await.unwrap();
    assert!(row.attribute_groups[&1][&7].contains(&8));

    // A later commit adds a second value for the same type and group.
    commit_relationships(&f, "MAIN", vec![inferred_attribute("a2", 5, 7, 9, 1)]).await;

    let row = projection(&f, "MAIN", Form::Inferred, 5).await.unwrap();
    assert!(row.attribute_groups[&1][&7].contains(&8));
    assert!(row.attribute_groups[&1][&7].contains(&9));
    // The hierarchy did not change.
    assert_eq!(row.parents, ids(&[1]));
}

#[tokio::test]
async fn removing_an_attribute_clears_its_group() {
    let f = fixture().await;
    seed_concepts(&f, "MAIN", &[1, 5, 7, 8]).await;
    commit_relationships(
        &f,
        "MAIN",
        vec![
            inferred_isa("r51", 5, 1),
            inferred_attribute("a1", 5, 7, 8, 2),
        ],
    )
    .await;

    commit_relationships(&f, "MAIN", vec![inferred_attribute("a1", 5, 7, 8, 2).inactive()])
        .await;

    let row = projection(&f, "MAIN", Form::Inferred, 5).await.unwrap();
    assert!(row.attribute_groups.is_empty());
    assert_eq!(row.parents, ids(&[1]));
}

#[tokio::test]
async fn object_attribute_carries_its_synthetic_parent() {
    let f = fixture().await;
    let object_attribute = concepts::CONCEPT_MODEL_OBJECT_ATTRIBUTE;
    let model_attribute = concepts::CONCEPT_MODEL_ATTRIBUTE;
    seed_concepts(&f, "MAIN", &[1, 20, object_attribute, model_attribute]).await;

    commit_relationships(
        &f,
        "MAIN",
        vec![
            inferred_isa("rma", model_attribute, 1),
            inferred_isa("roa", 20, object_attribute),
        ],
    )
    .await;

    let rows = all_projections(&f, "MAIN", Form::Inferred).await;
    // No input relationship asserts the edge, but the object attribute is
    // subsumed by the concept model attribute in every form.
    assert!(rows[&object_attribute].parents.contains(&model_attribute));
    assert!(rows[&object_attribute].ancestors.contains(&model_attribute));
    assert!(rows[&object_attribute].ancestors.contains(&1));
    assert_eq!(rows[&20].ancestors, ids(&[object_attribute, model_attribute, 1]));
    assert_projection_invariants(&f, "MAIN", Form::Inferred).await;
}

#[tokio::test]
async fn stated_and_inferred_forms_are_disjoint() {
    let f = fixture().await;
    seed_concepts(&f, "MAIN", &[1, 2, 3]).await;
    commit_relationships(
        &f,
        "MAIN",
        vec![inferred_isa("r21", 2, 1), stated_isa("s31", 3, 1)],
    )
    .await;

    let inferred = all_projections(&f, "MAIN", Form::Inferred).await;
    assert!(inferred.contains_key(&2));
    assert!(!inferred.contains_key(&3));

    let stated = all_projections(&f, "MAIN", Form::Stated).await;
    assert!(stated.contains_key(&3));
    assert!(!stated.contains_key(&2));
    assert_eq!(stated[&3].concept_id_form, "3_s");
}

#[tokio::test]
async fn additional_relationships_feed_the_inferred_form() {
    let f = fixture().await;
    seed_concepts(&f, "MAIN", &[1, 6, 7, 8]).await;
    let additional = termhub_store::Relationship::new(
        "x1",
        6,
        7,
        8,
        concepts::ADDITIONAL_RELATIONSHIP,
    )
    .with_group(0);
    commit_relationships(&f, "MAIN", vec![inferred_isa("r61", 6, 1), additional]).await;

    let row = projection(&f, "MAIN", Form::Inferred, 6).await.unwrap();
    assert!(row.attribute_groups[&0][&7].contains(&8));
}
