//! Integration tests for document parsing and the node model.

mod helpers;

use helpers::{LOOP_JOURNEY, VALID_JOURNEY, parse_journey};
use journey_validator::parse;
use journey_validator::parse::types::Node;

#[test]
fn parses_enveloped_journey() {
    let journey = parse_journey(VALID_JOURNEY);
    let workflow = journey.workflow().expect("Should expose the workflow");
    assert_eq!(workflow.nodes.len(), 5);
    assert_eq!(
        workflow.head.as_deref(),
        Some("11111111-1111-1111-1111-111111111111")
    );
}

#[test]
fn parses_bare_workflow_document() {
    let journey = parse_journey(LOOP_JOURNEY);
    let workflow = journey.workflow().expect("Should expose the workflow");
    assert_eq!(workflow.nodes.len(), 4);
}

#[test]
fn node_variants_dispatch_on_type_tag() {
    let journey = parse_journey(LOOP_JOURNEY);
    let workflow = journey.workflow().unwrap();

    let head = &workflow.nodes["a1111111-1111-1111-1111-111111111111"];
    assert!(matches!(head, Node::Action(_)));
    assert_eq!(head.field_kind(), Some("set_variables"));

    let lp = &workflow.nodes["b2222222-2222-2222-2222-222222222222"];
    assert!(matches!(lp, Node::Loop(_)));
    let (body_key, body) = lp.body().expect("Loop should carry a body");
    assert_eq!(body_key, "loop_body");
    assert_eq!(body.id(), Some("c3333333-3333-3333-3333-333333333333"));
}

#[test]
fn unknown_type_tags_become_platform_nodes() {
    let json = r#"{
        "type": "some_future_node",
        "id": "11111111-1111-1111-1111-111111111111",
        "output_var": "result",
        "custom_field": 42
    }"#;
    let node: Node = serde_json::from_str(json).expect("Should parse");
    let Node::Platform(n) = &node else {
        panic!("Expected a platform node, got {node:?}");
    };
    assert_eq!(n.node_type.as_deref(), Some("some_future_node"));
    assert_eq!(node.output_var(), Some("result"));
    assert_eq!(n.extra.get("custom_field").and_then(|v| v.as_i64()), Some(42));
}

#[test]
fn unknown_fields_survive_a_round_trip() {
    let journey = parse_journey(VALID_JOURNEY);
    let text = parse::to_string_pretty(&journey).expect("Should serialize");
    let reparsed = parse_journey(&text);
    assert_eq!(journey, reparsed);

    let before: serde_json::Value = serde_json::from_str(VALID_JOURNEY).unwrap();
    let after: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(before, after);
}

#[test]
fn links_default_to_empty_when_absent() {
    let journey = parse_journey(VALID_JOURNEY);
    let workflow = journey.workflow().unwrap();
    let terminal = &workflow.nodes["44444444-4444-4444-4444-444444444444"];
    assert!(terminal.links().is_empty());
}

#[test]
fn unparsable_json_is_the_fatal_error() {
    assert!(parse::parse("{ not json").is_err());
}

#[test]
fn graph_tracks_body_membership_and_successors() {
    let journey = parse_journey(LOOP_JOURNEY);
    let workflow = journey.workflow().unwrap();
    let graph = parse::JourneyGraph::build(workflow);

    let loop_id = "b2222222-2222-2222-2222-222222222222";
    let body_id = "c3333333-3333-3333-3333-333333333333";
    assert!(graph.is_in_body(body_id));
    assert_eq!(graph.innermost_container(body_id), Some(loop_id));
    assert!(!graph.is_in_body(loop_id));

    let successors = graph.successors(loop_id);
    assert!(successors.iter().any(|(id, _)| *id == body_id));
    assert!(
        successors
            .iter()
            .any(|(id, _)| *id == "d4444444-4444-4444-4444-444444444444")
    );

    let reachable = graph.reachable_from("a1111111-1111-1111-1111-111111111111");
    assert_eq!(reachable.len(), 4);
}
