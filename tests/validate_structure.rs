//! Integration tests for structural validation rules (S001–S012).

mod helpers;

use helpers::{
    LOOP_JOURNEY, VALID_JOURNEY, diagnostics, has_code, parse_journey, with_node_edit,
    with_workflow_edit,
};
use serde_json::json;

#[test]
fn valid_journey_produces_no_diagnostics() {
    let journey = parse_journey(VALID_JOURNEY);
    let diags = diagnostics(&journey);
    assert!(diags.is_empty(), "Expected no diagnostics, got: {diags:?}");
}

#[test]
fn valid_loop_journey_produces_no_diagnostics() {
    let journey = parse_journey(LOOP_JOURNEY);
    let diags = diagnostics(&journey);
    assert!(diags.is_empty(), "Expected no diagnostics, got: {diags:?}");
}

#[test]
fn s001_invalid_uuid_key() {
    let journey = with_workflow_edit(VALID_JOURNEY, |workflow| {
        let nodes = workflow.get_mut("nodes").unwrap().as_object_mut().unwrap();
        let mut node = nodes
            .remove("44444444-4444-4444-4444-444444444444")
            .unwrap();
        node["id"] = json!("not-a-uuid");
        nodes.insert("not-a-uuid".into(), node);
        // Keep the condition's yes-branch pointing at the moved node.
        let yes = workflow
            .pointer_mut("/nodes/33333333-3333-3333-3333-333333333333/links/0/target")
            .unwrap();
        *yes = json!("not-a-uuid");
    });
    let diags = diagnostics(&journey);
    assert!(has_code(&diags, "S001"), "Should flag invalid UUID: {diags:?}");
}

#[test]
fn s002_id_key_mismatch() {
    let journey = with_node_edit(VALID_JOURNEY, "44444444-4444-4444-4444-444444444444", |n| {
        n["id"] = json!("55555555-5555-5555-5555-555555555555");
    });
    let diags = diagnostics(&journey);
    assert!(has_code(&diags, "S002"), "Should flag id/key mismatch: {diags:?}");
}

#[test]
fn s003_unknown_node_type() {
    let journey = with_node_edit(VALID_JOURNEY, "44444444-4444-4444-4444-444444444444", |n| {
        n["type"] = json!("teleporter");
    });
    let diags = diagnostics(&journey);
    assert!(has_code(&diags, "S003"), "Should flag unknown type: {diags:?}");
}

#[test]
fn s004_action_kind_used_as_node_tag() {
    let journey = with_node_edit(VALID_JOURNEY, "44444444-4444-4444-4444-444444444444", |n| {
        *n = json!({
            "type": "auth_pass",
            "id": "44444444-4444-4444-4444-444444444444",
            "metadata": { "type": "auth_pass" }
        });
    });
    let diags = diagnostics(&journey);
    assert!(has_code(&diags, "S004"), "Should flag action-kind tag: {diags:?}");
}

#[test]
fn s005_orphan_node() {
    let journey = with_workflow_edit(VALID_JOURNEY, |workflow| {
        let nodes = workflow.get_mut("nodes").unwrap().as_object_mut().unwrap();
        nodes.insert(
            "66666666-6666-6666-6666-666666666666".into(),
            json!({
                "type": "action",
                "id": "66666666-6666-6666-6666-666666666666",
                "action": { "type": "auth_pass", "metadata": { "type": "auth_pass" } }
            }),
        );
    });
    let diags = diagnostics(&journey);
    assert!(has_code(&diags, "S005"), "Should flag orphan: {diags:?}");
}

#[test]
fn s006_dangling_target() {
    let journey = with_node_edit(VALID_JOURNEY, "22222222-2222-2222-2222-222222222222", |n| {
        n["links"][0]["target"] = json!("77777777-7777-7777-7777-777777777777");
    });
    let diags = diagnostics(&journey);
    assert!(has_code(&diags, "S006"), "Should flag dangling target: {diags:?}");
}

#[test]
fn s007_missing_head() {
    let journey = with_workflow_edit(VALID_JOURNEY, |workflow| {
        workflow.as_object_mut().unwrap().remove("head");
    });
    let diags = diagnostics(&journey);
    assert!(has_code(&diags, "S007"), "Should flag missing head: {diags:?}");
}

#[test]
fn s008_body_without_top_level_entry() {
    let journey = with_workflow_edit(LOOP_JOURNEY, |workflow| {
        workflow
            .get_mut("nodes")
            .unwrap()
            .as_object_mut()
            .unwrap()
            .remove("c3333333-3333-3333-3333-333333333333");
    });
    let diags = diagnostics(&journey);
    assert!(has_code(&diags, "S008"), "Should flag missing shadow: {diags:?}");
}

#[test]
fn s009_body_shadow_divergence() {
    // Example 2: edit the top-level entry without touching the embedded copy.
    let journey = with_node_edit(LOOP_JOURNEY, "c3333333-3333-3333-3333-333333333333", |n| {
        n["action"]["text"] = json!({ "type": "expression", "value": "\"Changed\"" });
    });
    let diags = diagnostics(&journey);
    assert!(has_code(&diags, "S009"), "Should flag divergence: {diags:?}");
}

#[test]
fn s010_body_link_back_to_loop_is_a_forbidden_cycle() {
    // Example 3: an explicit edge to the loop node is never a retry.
    let loop_id = "b2222222-2222-2222-2222-222222222222";
    let journey = with_workflow_edit(LOOP_JOURNEY, |workflow| {
        for path in [
            "/nodes/c3333333-3333-3333-3333-333333333333/links/0",
            "/nodes/b2222222-2222-2222-2222-222222222222/loop_body/links/0",
        ] {
            let link = workflow.pointer_mut(path).unwrap();
            link["target"] = json!(loop_id);
        }
    });
    let diags = diagnostics(&journey);
    assert!(has_code(&diags, "S010"), "Should flag forbidden cycle: {diags:?}");
    assert!(!has_code(&diags, "S009"), "Shadow copies were kept in sync: {diags:?}");
}

#[test]
fn s011_targetless_link_outside_a_body() {
    let journey = with_node_edit(VALID_JOURNEY, "22222222-2222-2222-2222-222222222222", |n| {
        n["links"][0].as_object_mut().unwrap().remove("target");
    });
    let diags = diagnostics(&journey);
    assert!(has_code(&diags, "S011"), "Should flag targetless link: {diags:?}");
}

#[test]
fn s011_invalid_link_type() {
    let journey = with_node_edit(VALID_JOURNEY, "22222222-2222-2222-2222-222222222222", |n| {
        n["links"][0]["type"] = json!("jump");
    });
    let diags = diagnostics(&journey);
    assert!(has_code(&diags, "S011"), "Should flag invalid link type: {diags:?}");
}

#[test]
fn s012_outer_path_ending_at_non_terminal() {
    let journey = with_node_edit(VALID_JOURNEY, "44444444-4444-4444-4444-444444444444", |n| {
        // The yes-branch now ends at an information node with no links.
        *n = json!({
            "type": "action",
            "id": "44444444-4444-4444-4444-444444444444",
            "action": {
                "type": "information",
                "text": { "type": "expression", "value": "\"Done\"" },
                "button_text": { "type": "expression", "value": "\"OK\"" }
            }
        });
    });
    let diags = diagnostics(&journey);
    assert!(has_code(&diags, "S012"), "Should flag dead-end path: {diags:?}");
}
