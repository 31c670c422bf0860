//! Integration tests for the auto-fix pipeline.

mod helpers;

use helpers::{BROKEN_JOURNEY, LOOP_JOURNEY, parse_journey};
use journey_validator::fix::variables::{add_missing_variable_inits, extend_variable_shape};
use journey_validator::fix::{fix_journey, fix_source};
use journey_validator::parse::types::{Journey, Node};
use journey_validator::{JourneyError, Registry, expr, fix_path, parse};
use serde_json::{Value, json};

fn fixed_broken() -> Journey {
    let mut journey = parse_journey(BROKEN_JOURNEY);
    fix_journey(&mut journey, Registry::builtin());
    journey
}

#[test]
fn clean_document_needs_no_fixes() {
    let mut journey = parse_journey(LOOP_JOURNEY);
    let before = serde_json::to_value(&journey).unwrap();
    let fixes = fix_journey(&mut journey, Registry::builtin());
    assert!(fixes.is_empty(), "Expected no fixes, got: {fixes:?}");
    assert_eq!(serde_json::to_value(&journey).unwrap(), before);
}

#[test]
fn fixing_is_idempotent() {
    let mut journey = parse_journey(BROKEN_JOURNEY);
    let first = fix_journey(&mut journey, Registry::builtin());
    assert!(!first.is_empty(), "The broken fixture should need repairs");

    let after_first = serde_json::to_value(&journey).unwrap();
    let second = fix_journey(&mut journey, Registry::builtin());
    assert!(second.is_empty(), "Second run should be a no-op: {second:?}");
    assert_eq!(serde_json::to_value(&journey).unwrap(), after_first);
}

#[test]
fn invalid_node_keys_are_regenerated_consistently() {
    let journey = fixed_broken();
    let workflow = journey.workflow().unwrap();

    assert!(!workflow.nodes.contains_key("start-node"));
    let head = workflow.head.as_deref().expect("head survives the remap");
    assert!(expr::is_valid_uuid(head), "head should be a fresh UUID: {head}");
    assert!(workflow.nodes.contains_key(head));

    for (key, node) in &workflow.nodes {
        assert!(expr::is_valid_uuid(key), "key '{key}' should be a UUID");
        assert_eq!(node.id(), Some(key.as_str()), "id/key alignment for '{key}'");
        for link in node.links() {
            if let Some(target) = link.target.as_deref() {
                assert!(
                    workflow.nodes.contains_key(target),
                    "link target '{target}' of '{key}' should resolve"
                );
            }
        }
    }
    assert!(
        workflow.id.as_deref().is_some_and(expr::is_valid_uuid),
        "workflow id should be regenerated"
    );
}

#[test]
fn envelope_is_fully_repaired() {
    let journey = fixed_broken();
    let data = journey.exports.as_ref().unwrap()[0].data.as_ref().unwrap();

    assert_eq!(data.journey_type.as_deref(), Some("anonymous"));
    assert!(data.policy_id.as_deref().is_some_and(expr::is_valid_uuid));
    assert!(data.desc.as_ref().and_then(Value::as_str).is_some());
    assert!(data.created_date.as_ref().and_then(Value::as_i64).is_some());
    assert!(data.last_modified_date.as_ref().and_then(Value::as_i64).is_some());

    let version = &data.versions.as_ref().unwrap()[0];
    assert_eq!(version.schema_version.as_ref().and_then(Value::as_i64), Some(2));
    assert!(version.filter_criteria.as_ref().is_some_and(expr::is_expression_object));
    assert!(version.version_id.as_deref().is_some_and(expr::is_valid_uuid));
    assert_eq!(version.state.as_deref(), Some("version"));
    assert!(version.created_at.as_ref().and_then(Value::as_i64).is_some());
}

#[test]
fn backticked_json_initializer_is_stripped() {
    let journey = fixed_broken();
    let workflow = journey.workflow().unwrap();
    let setvars = workflow
        .nodes
        .values()
        .find(|n| n.field_kind() == Some("set_variables"))
        .expect("the set_variables node survives");
    let init = &setvars.action().unwrap().variables.as_ref().unwrap()[0];
    assert_eq!(init.expression_value(), Some(r#"{"role": "admin"}"#));
}

#[test]
fn failure_link_moves_to_the_escape_side() {
    let journey = fixed_broken();
    let workflow = journey.workflow().unwrap();
    let idp = &workflow.nodes["f6666666-6666-6666-6666-666666666666"];
    let failure = idp
        .links()
        .iter()
        .find(|l| l.name.as_deref() == Some("failure"))
        .expect("failure link survives");
    assert_eq!(failure.link_type.as_deref(), Some("escape"));
}

#[test]
fn terminal_actions_gain_metadata() {
    let journey = fixed_broken();
    let workflow = journey.workflow().unwrap();
    let pass = &workflow.nodes["a7777777-7777-7777-7777-777777777777"];
    assert_eq!(
        pass.action().unwrap().metadata,
        Some(json!({ "type": "auth_pass" }))
    );
}

#[test]
fn strict_equality_and_title_repairs_on_information() {
    let journey = fixed_broken();
    let workflow = journey.workflow().unwrap();
    let info = &workflow.nodes["e5555555-5555-5555-5555-555555555555"];
    let action = info.action().unwrap();

    let text = action.text.as_ref().and_then(expr::expression_value).unwrap();
    assert_eq!(text, "\"Checks passed: ${code == 1}\"");
    let title = action.title.as_ref().and_then(expr::expression_value).unwrap();
    assert_eq!(title, "\"\"");
}

#[test]
fn legacy_get_information_is_migrated_to_form() {
    let journey = fixed_broken();
    let workflow = journey.workflow().unwrap();
    let node = &workflow.nodes["a9999999-9999-9999-9999-999999999999"];

    assert_eq!(node.field_kind(), Some("form"));
    assert_eq!(node.registry_kind(), Some("get_information"));
    assert_eq!(node.output_var(), Some("form_data"));

    let Node::Action(n) = node else { panic!("still an action node") };
    assert_eq!(n.strings, Some(json!([])));
    let app_data = n.action.as_ref().unwrap().app_data.as_ref().unwrap();
    assert!(expr::is_expression_object(app_data));
    assert_eq!(expr::expression_value(app_data), Some("{}"));
}

#[test]
fn missing_inits_append_to_an_existing_set_variables() {
    let mut journey = parse_journey(LOOP_JOURNEY);
    let workflow = journey.workflow_mut().unwrap();
    let mut fixes = Vec::new();
    add_missing_variable_inits(workflow, &["attempts", "retries"], &mut fixes);

    let setvars = &workflow.nodes["a1111111-1111-1111-1111-111111111111"];
    let inits = setvars.action().unwrap().variables.as_ref().unwrap();
    assert_eq!(inits.len(), 2, "only 'retries' is new");
    assert_eq!(inits[1].name.as_deref(), Some("retries"));
    assert_eq!(inits[1].expression_value(), Some("null"));
    assert_eq!(fixes.len(), 1);
}

#[test]
fn missing_inits_insert_a_node_ahead_of_the_head() {
    let text = r#"{
        "workflow": {
            "id": "10000000-0000-0000-0000-000000000001",
            "head": "a7777777-7777-7777-7777-777777777777",
            "nodes": {
                "a7777777-7777-7777-7777-777777777777": {
                    "type": "action",
                    "id": "a7777777-7777-7777-7777-777777777777",
                    "action": { "type": "auth_pass", "metadata": { "type": "auth_pass" } }
                }
            }
        }
    }"#;
    let mut journey = parse_journey(text);
    let workflow = journey.workflow_mut().unwrap();
    let mut fixes = Vec::new();
    add_missing_variable_inits(workflow, &["attempts"], &mut fixes);

    let head = workflow.head.clone().expect("head is set");
    assert_ne!(head, "a7777777-7777-7777-7777-777777777777");
    let inserted = &workflow.nodes[&head];
    assert_eq!(inserted.field_kind(), Some("set_variables"));
    assert_eq!(
        inserted.links()[0].target.as_deref(),
        Some("a7777777-7777-7777-7777-777777777777")
    );
    let inits = inserted.action().unwrap().variables.as_ref().unwrap();
    assert_eq!(inits[0].name.as_deref(), Some("attempts"));
}

#[test]
fn variable_shapes_are_widened_in_place() {
    let mut journey = fixed_broken();
    let workflow = journey.workflow_mut().unwrap();
    let mut fixes = Vec::new();
    extend_variable_shape(workflow, "profile", &["email", "role"], &mut fixes);
    assert_eq!(fixes.len(), 1, "one initializer rewritten: {fixes:?}");

    let setvars = workflow
        .nodes
        .values()
        .find(|n| n.field_kind() == Some("set_variables"))
        .unwrap();
    let init = &setvars.action().unwrap().variables.as_ref().unwrap()[0];
    let parsed: Value = serde_json::from_str(init.expression_value().unwrap()).unwrap();
    assert_eq!(parsed["role"], json!("admin"), "existing fields keep their values");
    assert_eq!(parsed["email"], Value::Null, "missing fields are seeded with null");
}

#[test]
fn fix_path_repairs_the_file_in_place() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("journey.json");
    std::fs::write(&path, BROKEN_JOURNEY).expect("write fixture");

    let fixes = fix_path(&path).expect("repair should succeed");
    assert!(!fixes.is_empty());

    let repaired = std::fs::read_to_string(&path).expect("read back");
    let journey = parse::parse(&repaired).expect("rewritten file parses");
    let workflow = journey.workflow().unwrap();
    assert!(workflow.head.as_deref().is_some_and(expr::is_valid_uuid));
}

#[test]
fn fix_path_leaves_workflowless_documents_untouched() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("journey.json");
    let original = r#"{"exports": [{"data": {"type": "anonymous"}}]}"#;
    std::fs::write(&path, original).expect("write fixture");

    let err = fix_path(&path).expect_err("no workflow to repair");
    assert!(matches!(err, JourneyError::MissingWorkflow));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
}

#[test]
fn source_repair_feeds_the_parser() {
    let broken = BROKEN_JOURNEY.replace("\\\"role\\\"", "\\\\\"role\\\\\"");
    assert!(parse::parse(&broken).is_err() || broken.contains("\\\\\""));

    let (repaired, fixes) = fix_source(&broken);
    assert_eq!(fixes.len(), 1, "one escaping rule triggered: {fixes:?}");
    let journey = parse::parse(&repaired).expect("repaired text parses");
    assert!(journey.workflow().is_some());
}
