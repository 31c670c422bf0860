//! Integration tests for variable scoping and shape rules (C001–C008).

mod helpers;

use helpers::{
    LOOP_JOURNEY, VALID_JOURNEY, diagnostics, has_code, with_node_edit, with_workflow_edit,
};
use serde_json::json;

const SETVARS: &str = "11111111-1111-1111-1111-111111111111";
const INFO: &str = "22222222-2222-2222-2222-222222222222";
const LOOP: &str = "b2222222-2222-2222-2222-222222222222";
const BODY: &str = "c3333333-3333-3333-3333-333333333333";

#[test]
fn c001_loop_missing_variables_array() {
    let journey = with_node_edit(LOOP_JOURNEY, LOOP, |n| {
        n.as_object_mut().unwrap().remove("variables");
    });
    let diags = diagnostics(&journey);
    assert!(has_code(&diags, "C001"), "Should flag missing variables: {diags:?}");
}

#[test]
fn c002_use_before_initialization() {
    let journey = with_node_edit(VALID_JOURNEY, INFO, |n| {
        n["action"]["text"] = json!({ "type": "expression", "value": "\"Hi ${nickname}\"" });
    });
    let diags = diagnostics(&journey);
    assert!(has_code(&diags, "C002"), "Should flag undeclared variable: {diags:?}");
}

#[test]
fn c003_body_declaration_escaping_its_scope() {
    let journey = with_workflow_edit(LOOP_JOURNEY, |workflow| {
        // The body now declares a variable; the node after the loop reads it.
        let body = json!({
            "type": "action",
            "id": BODY,
            "links": [{ "name": "child", "type": "branch" }],
            "action": {
                "type": "set_variables",
                "variables": [
                    { "name": "scratch", "value": { "type": "expression", "value": "0" } }
                ]
            }
        });
        workflow["nodes"][BODY] = body.clone();
        workflow["nodes"][LOOP]["loop_body"] = body;
        workflow["nodes"]["d4444444-4444-4444-4444-444444444444"] = json!({
            "type": "action",
            "id": "d4444444-4444-4444-4444-444444444444",
            "links": [
                {
                    "name": "child",
                    "type": "branch",
                    "target": "e5555555-5555-5555-5555-555555555555"
                }
            ],
            "action": {
                "type": "information",
                "text": { "type": "expression", "value": "\"Saw ${scratch}\"" },
                "button_text": { "type": "expression", "value": "\"OK\"" }
            }
        });
        workflow["nodes"]["e5555555-5555-5555-5555-555555555555"] = json!({
            "type": "action",
            "id": "e5555555-5555-5555-5555-555555555555",
            "action": { "type": "auth_pass", "metadata": { "type": "auth_pass" } }
        });
    });
    let diags = diagnostics(&journey);
    assert!(has_code(&diags, "C003"), "Should flag escaping scope: {diags:?}");
    assert!(!has_code(&diags, "C002"), "Not a plain use-before-init: {diags:?}");
}

#[test]
fn c004_platform_implicit_variable() {
    let journey = with_node_edit(VALID_JOURNEY, INFO, |n| {
        n["action"]["text"] = json!({ "type": "expression", "value": "\"Oops: ${error}\"" });
    });
    let diags = diagnostics(&journey);
    assert!(has_code(&diags, "C004"), "Should flag implicit variable: {diags:?}");
}

#[test]
fn c005_field_outside_initialized_shape() {
    let journey = with_workflow_edit(VALID_JOURNEY, |workflow| {
        workflow["nodes"][SETVARS]["action"]["variables"][0] = json!({
            "name": "profile",
            "value": { "type": "expression", "value": "{\"name\": \"Ada\"}" }
        });
        workflow["nodes"][INFO]["action"]["text"] =
            json!({ "type": "expression", "value": "\"Hi ${profile.email}\"" });
    });
    let diags = diagnostics(&journey);
    assert!(has_code(&diags, "C005"), "Should flag unknown field: {diags:?}");
}

#[test]
fn c005_initialized_field_is_accepted() {
    let journey = with_workflow_edit(VALID_JOURNEY, |workflow| {
        workflow["nodes"][SETVARS]["action"]["variables"][0] = json!({
            "name": "profile",
            "value": { "type": "expression", "value": "{\"name\": \"Ada\"}" }
        });
        workflow["nodes"][INFO]["action"]["text"] =
            json!({ "type": "expression", "value": "\"Hi ${profile.name}\"" });
    });
    let diags = diagnostics(&journey);
    assert!(!has_code(&diags, "C005"), "Declared field is legal: {diags:?}");
    assert!(!has_code(&diags, "C006"), "Shape is non-empty: {diags:?}");
}

#[test]
fn c006_empty_object_shape() {
    // Example 4: `error` initialized as {} and then read through a field.
    let journey = with_workflow_edit(VALID_JOURNEY, |workflow| {
        workflow["nodes"][SETVARS]["action"]["variables"][0] = json!({
            "name": "error",
            "value": { "type": "expression", "value": "{}" }
        });
        workflow["nodes"][INFO]["action"]["text"] =
            json!({ "type": "expression", "value": "\"Code: ${error.code}\"" });
    });
    let diags = diagnostics(&journey);
    assert!(has_code(&diags, "C006"), "Should flag empty-shape access: {diags:?}");
}

#[test]
fn c007_access_through_bare_output_var() {
    let journey = with_workflow_edit(VALID_JOURNEY, |workflow| {
        workflow["nodes"][SETVARS]["output_var"] = json!("lookup");
        workflow["nodes"][INFO]["action"]["text"] =
            json!({ "type": "expression", "value": "\"Got ${lookup.status}\"" });
    });
    let diags = diagnostics(&journey);
    assert!(has_code(&diags, "C007"), "Should flag output-only access: {diags:?}");
}

#[test]
fn c008_output_var_without_initialization() {
    let journey = with_node_edit(VALID_JOURNEY, INFO, |n| {
        n["output_var"] = json!("captured");
    });
    let diags = diagnostics(&journey);
    assert!(has_code(&diags, "C008"), "Should flag uninitialized output_var: {diags:?}");
}

#[test]
fn form_schema_fields_define_the_output_shape() {
    let journey = with_node_edit(VALID_JOURNEY, INFO, |n| {
        *n = json!({
            "type": "action",
            "id": INFO,
            "links": [
                {
                    "name": "child",
                    "type": "branch",
                    "target": "33333333-3333-3333-3333-333333333333"
                }
            ],
            "output_var": "form_data",
            "strings": [],
            "action": {
                "type": "form",
                "app_data": { "type": "expression", "value": "{}" },
                "form_schema": {
                    "type": "expression",
                    "value": "[{\"type\": \"input\", \"name\": \"email\", \"label\": \"Email\", \"defaultValue\": \"\", \"dataType\": \"string\", \"format\": \"email\", \"required\": true, \"readonly\": false}]"
                }
            }
        });
    });
    let diags = diagnostics(&journey);
    assert!(!has_code(&diags, "C005"), "Schema fields are declared: {diags:?}");
    assert!(!has_code(&diags, "C008"), "Form output_var needs no initializer: {diags:?}");

    let journey = with_node_edit(VALID_JOURNEY, "33333333-3333-3333-3333-333333333333", |n| {
        n["condition"]["field"] = json!({ "type": "expression", "value": "form_data.email" });
    });
    let diags = diagnostics(&journey);
    assert!(has_code(&diags, "C002"), "No form upstream declares form_data: {diags:?}");
}
