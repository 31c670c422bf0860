#![allow(dead_code)]

use journey_validator::error::Diagnostic;
use journey_validator::parse::types::Journey;
use journey_validator::{Registry, parse, validate};
use serde_json::Value;

pub const VALID_JOURNEY: &str = include_str!("../fixtures/valid_journey.json");
pub const LOOP_JOURNEY: &str = include_str!("../fixtures/loop_journey.json");
pub const BROKEN_JOURNEY: &str = include_str!("../fixtures/broken_journey.json");

pub fn parse_journey(json: &str) -> Journey {
    parse::parse(json).expect("fixture should parse")
}

pub fn diagnostics(journey: &Journey) -> Vec<Diagnostic> {
    validate::validate_journey(journey, Registry::builtin())
}

pub fn has_code(diags: &[Diagnostic], code: &str) -> bool {
    diags.iter().any(|d| d.code == code)
}

/// Parse a fixture as raw JSON, run `edit` over the node with the given
/// key, and re-parse. Works for both enveloped and bare-workflow docs.
pub fn with_node_edit(json: &str, node_key: &str, edit: impl FnOnce(&mut Value)) -> Journey {
    with_workflow_edit(json, |workflow| {
        let node = workflow
            .get_mut("nodes")
            .and_then(|n| n.get_mut(node_key))
            .expect("node key should exist in fixture");
        edit(node);
    })
}

/// Parse a fixture as raw JSON, run `edit` over its workflow object, and
/// re-parse.
pub fn with_workflow_edit(json: &str, edit: impl FnOnce(&mut Value)) -> Journey {
    let mut doc: Value = serde_json::from_str(json).expect("fixture should parse as JSON");
    let workflow = if doc.get("workflow").is_some() {
        doc.get_mut("workflow")
    } else {
        doc.pointer_mut("/exports/0/data/versions/0/workflow")
    }
    .expect("fixture should carry a workflow");
    edit(workflow);
    let text = serde_json::to_string(&doc).expect("edited fixture should serialize");
    parse_journey(&text)
}

/// Parse a fixture as raw JSON, run `edit` over the whole document, and
/// re-parse.
pub fn with_doc_edit(json: &str, edit: impl FnOnce(&mut Value)) -> Journey {
    let mut doc: Value = serde_json::from_str(json).expect("fixture should parse as JSON");
    edit(&mut doc);
    let text = serde_json::to_string(&doc).expect("edited fixture should serialize");
    parse_journey(&text)
}
