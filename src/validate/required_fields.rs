//! Registry-driven required-field and link-contract rules (F001–F013).

use std::collections::BTreeSet;

use serde_json::Value;

use crate::error::Diagnostic;
use crate::expr;
use crate::parse::types::{Node, Workflow};
use crate::registry::{FieldKind, NodeContract, Registry};

/// The exact property set every form-schema field object must carry.
const FORM_FIELD_PROPS: &[&str] = &[
    "type",
    "name",
    "label",
    "defaultValue",
    "dataType",
    "format",
    "required",
    "readonly",
];

pub fn validate_required_fields(workflow: &Workflow, registry: &Registry) -> Vec<Diagnostic> {
    let mut diags = Vec::new();

    for (key, node) in &workflow.nodes {
        let value = node.to_value();

        if let Some(kind) = node.field_kind()
            && let Some(contract) = registry.contract(kind)
        {
            if contract.deprecated {
                let hint = contract
                    .replacement
                    .as_deref()
                    .map(|r| format!("; use {r}"))
                    .unwrap_or_default();
                diags.push(Diagnostic::required_field(
                    "F001",
                    format!("Node type '{kind}' is deprecated{hint}"),
                    Some(key.clone()),
                ));
            }
            check_fields(key, kind, &value, contract, &mut diags);
            check_at_least_one_of(key, kind, &value, contract, &mut diags);
        }

        if let Some(kind) = node.registry_kind()
            && let Some(contract) = registry.contract(kind)
        {
            check_links(key, kind, node, contract, &mut diags);
        }

        if node.registry_kind() == Some("login_form") {
            check_login_form(key, node, &mut diags);
        }
        if node.registry_kind() == Some("get_information") {
            check_get_information(key, node, &mut diags);
        }
        if let Some(action) = node.action()
            && let Some(schema) = &action.form_schema
        {
            validate_form_schema(key, "action.form_schema", schema, &mut diags);
        }
        if node.field_kind() == Some("events_enrichment") {
            check_events_data(key, node, &mut diags);
        }
        if let Node::Loop(n) = node
            && let Some(max) = &n.max_iterations
            && !max.as_i64().is_some_and(|i| i > 0)
        {
            diags.push(Diagnostic::required_field(
                "F005",
                "'max_iterations' must be a positive integer",
                Some(key.clone()),
            ));
        }
    }

    diags
}

/// Field lookup: action-kind contracts read through the `action` object,
/// structural kinds read the node itself.
fn field_value<'a>(node_value: &'a Value, contract: &NodeContract, field: &str) -> Option<&'a Value> {
    if contract.is_action
        && let Some(v) = node_value.get("action").and_then(|a| a.get(field))
    {
        return Some(v);
    }
    node_value.get(field)
}

fn check_fields(
    node_id: &str,
    kind: &str,
    node_value: &Value,
    contract: &NodeContract,
    diags: &mut Vec<Diagnostic>,
) {
    for (field, field_kind) in &contract.required_fields {
        match field_value(node_value, contract, field) {
            None => diags.push(Diagnostic::required_field(
                "F002",
                format!("'{kind}' node is missing required field '{field}'"),
                Some(node_id.to_string()),
            )),
            Some(v) => check_field_shape(node_id, field, v, *field_kind, diags),
        }
    }
    for (field, field_kind) in &contract.optional_fields {
        if let Some(v) = field_value(node_value, contract, field) {
            check_field_shape(node_id, field, v, *field_kind, diags);
        }
    }
}

fn check_field_shape(
    node_id: &str,
    field: &str,
    value: &Value,
    kind: FieldKind,
    diags: &mut Vec<Diagnostic>,
) {
    let mut wrong_shape = |expected: &str, found: &str| {
        diags.push(Diagnostic::required_field(
            "F005",
            format!("'{field}' must be {expected}, found {found}"),
            Some(node_id.to_string()),
        ));
    };
    match kind {
        FieldKind::Expression => match expr::expression_value(value) {
            Some(raw) => {
                if expr::strip_backticks(raw).trim().is_empty() {
                    diags.push(Diagnostic::required_field(
                        "F003",
                        format!("'{field}' is present but empty"),
                        Some(node_id.to_string()),
                    ));
                }
            }
            None if value.is_string() => {
                wrong_shape("an expression object", "a plain string");
            }
            None => wrong_shape("an expression object", shape_name(value)),
        },
        FieldKind::String => {
            if expr::is_expression_object(value) {
                wrong_shape("a plain string", "an expression object");
            } else if let Some(s) = value.as_str() {
                if s.trim().is_empty() {
                    diags.push(Diagnostic::required_field(
                        "F003",
                        format!("'{field}' is present but empty"),
                        Some(node_id.to_string()),
                    ));
                }
            } else {
                wrong_shape("a plain string", shape_name(value));
            }
        }
        FieldKind::Object => {
            if !value.is_object() {
                wrong_shape("an object", shape_name(value));
            }
        }
        FieldKind::Array => {
            if !value.is_array() {
                wrong_shape("an array", shape_name(value));
            }
        }
        FieldKind::Number => {
            if !value.is_number() {
                wrong_shape("a number", shape_name(value));
            }
        }
    }
}

fn shape_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn check_at_least_one_of(
    node_id: &str,
    kind: &str,
    node_value: &Value,
    contract: &NodeContract,
    diags: &mut Vec<Diagnostic>,
) {
    if contract.at_least_one_of.is_empty() {
        return;
    }
    let any_present = contract
        .at_least_one_of
        .iter()
        .any(|f| field_value(node_value, contract, f).is_some());
    if !any_present {
        diags.push(Diagnostic::required_field(
            "F004",
            format!(
                "'{kind}' node requires at least one of: {}",
                contract.at_least_one_of.join(", ")
            ),
            Some(node_id.to_string()),
        ));
    }
}

fn check_links(
    node_id: &str,
    kind: &str,
    node: &Node,
    contract: &NodeContract,
    diags: &mut Vec<Diagnostic>,
) {
    let links = node.links();
    let sides = [
        ("branch", &contract.required_links.branch),
        ("escape", &contract.required_links.escape),
    ];
    for (side, names) in sides {
        for name in names.iter() {
            match links.iter().find(|l| l.name.as_deref() == Some(name)) {
                None => diags.push(Diagnostic::required_field(
                    "F006",
                    format!("'{kind}' node is missing required {side} link '{name}'"),
                    Some(node_id.to_string()),
                )),
                Some(link) if link.link_type.as_deref() != Some(side) => {
                    diags.push(Diagnostic::required_field(
                        "F007",
                        format!(
                            "Link '{name}' on '{kind}' must be type '{side}', found '{}'",
                            link.link_type.as_deref().unwrap_or("<missing>")
                        ),
                        Some(node_id.to_string()),
                    ));
                }
                _ => {}
            }
        }
    }

    if contract.closed_links {
        let allowed: BTreeSet<&str> = contract
            .required_links
            .branch
            .iter()
            .chain(&contract.required_links.escape)
            .chain(&contract.optional_links)
            .map(String::as_str)
            .collect();
        for link in links {
            if let Some(name) = link.name.as_deref()
                && !allowed.contains(name)
            {
                diags.push(Diagnostic::required_field(
                    "F008",
                    format!(
                        "Link name '{name}' is not allowed on '{kind}' nodes (allowed: {})",
                        allowed.iter().copied().collect::<Vec<_>>().join(", ")
                    ),
                    Some(node_id.to_string()),
                ));
            }
        }
    }
}

fn check_login_form(node_id: &str, node: &Node, diags: &mut Vec<Diagnostic>) {
    let links = node.links();
    let escapes: Vec<_> = links
        .iter()
        .filter(|l| l.link_type.as_deref() == Some("escape"))
        .collect();
    if escapes.is_empty() {
        diags.push(Diagnostic::required_field(
            "F009",
            "login_form must offer at least one authentication method as an escape link",
            Some(node_id.to_string()),
        ));
    }
    if links
        .iter()
        .any(|l| l.name.as_deref() == Some("child") && l.link_type.as_deref() == Some("branch"))
    {
        diags.push(Diagnostic::required_field(
            "F009",
            "login_form must not use a generic 'child' branch link; each authentication \
             method is its own escape link",
            Some(node_id.to_string()),
        ));
    }
    for (i, link) in links.iter().enumerate() {
        if let Some(schema) = &link.data_json_schema {
            validate_form_schema(
                node_id,
                &format!("links.{i}.data_json_schema"),
                schema,
                diags,
            );
        }
    }
}

fn check_get_information(node_id: &str, node: &Node, diags: &mut Vec<Diagnostic>) {
    let Node::Action(n) = node else { return };
    if n.output_var.is_none() {
        diags.push(Diagnostic::required_field(
            "F012",
            "get_information form is missing its top-level 'output_var'",
            Some(node_id.to_string()),
        ));
    }
    match &n.strings {
        None => diags.push(Diagnostic::required_field(
            "F012",
            "get_information form is missing 'strings' (use an empty array)",
            Some(node_id.to_string()),
        )),
        Some(v) if !v.is_array() => diags.push(Diagnostic::required_field(
            "F012",
            "'strings' must be an array",
            Some(node_id.to_string()),
        )),
        _ => {}
    }
    let app_data = n.action.as_ref().and_then(|a| a.app_data.as_ref());
    match app_data {
        None => diags.push(Diagnostic::required_field(
            "F012",
            "get_information form is missing 'action.app_data'",
            Some(node_id.to_string()),
        )),
        Some(v) if !expr::is_expression_object(v) => diags.push(Diagnostic::required_field(
            "F012",
            "'action.app_data' must be an expression object",
            Some(node_id.to_string()),
        )),
        _ => {}
    }
}

fn validate_form_schema(node_id: &str, path: &str, schema: &Value, diags: &mut Vec<Diagnostic>) {
    let Some(raw) = expr::expression_value(schema) else {
        diags.push(Diagnostic::required_field(
            "F010",
            format!("'{path}' must be an expression object holding the schema JSON"),
            Some(node_id.to_string()),
        ));
        return;
    };
    let parsed: Value = match serde_json::from_str(expr::strip_backticks(raw)) {
        Ok(p) => p,
        Err(e) => {
            diags.push(Diagnostic::required_field(
                "F010",
                format!("'{path}' does not parse as JSON: {e}"),
                Some(node_id.to_string()),
            ));
            return;
        }
    };
    let Some(fields) = parsed.as_array() else {
        diags.push(Diagnostic::required_field(
            "F010",
            format!("'{path}' must be a JSON array of field objects"),
            Some(node_id.to_string()),
        ));
        return;
    };
    if fields.is_empty() {
        diags.push(Diagnostic::required_field(
            "F010",
            format!("'{path}' must declare at least one field"),
            Some(node_id.to_string()),
        ));
        return;
    }
    for (i, field) in fields.iter().enumerate() {
        let Some(map) = field.as_object() else {
            diags.push(Diagnostic::required_field(
                "F010",
                format!("'{path}' field {i} must be an object"),
                Some(node_id.to_string()),
            ));
            continue;
        };
        let label = map
            .get("name")
            .and_then(Value::as_str)
            .map(|n| format!("'{n}'"))
            .unwrap_or_else(|| format!("{i}"));
        for prop in FORM_FIELD_PROPS {
            if !map.contains_key(*prop) {
                diags.push(Diagnostic::required_field(
                    "F011",
                    format!("'{path}' field {label} is missing property '{prop}'"),
                    Some(node_id.to_string()),
                ));
            }
        }
        for key in map.keys() {
            if !FORM_FIELD_PROPS.contains(&key.as_str()) {
                diags.push(Diagnostic::required_field(
                    "F011",
                    format!("'{path}' field {label} has unknown property '{key}'"),
                    Some(node_id.to_string()),
                ));
            }
        }
        if map.get("type").and_then(Value::as_str) != Some("input") {
            diags.push(Diagnostic::required_field(
                "F011",
                format!("'{path}' field {label}: property 'type' must be \"input\""),
                Some(node_id.to_string()),
            ));
        }
    }
}

fn check_events_data(node_id: &str, node: &Node, diags: &mut Vec<Diagnostic>) {
    let Some(data) = node.action().and_then(|a| a.data.as_ref()) else {
        return;
    };
    let Some(entries) = data.as_array() else {
        return; // shape reported by the field contract
    };
    for (i, entry) in entries.iter().enumerate() {
        let key_ok = entry.get("key").and_then(Value::as_str).is_some();
        let value_ok = entry.get("value").is_some_and(expr::is_expression_object);
        if !key_ok || !value_ok {
            diags.push(Diagnostic::required_field(
                "F013",
                format!(
                    "'action.data' entry {i} must be a {{key, value}} pair with a string key \
                     and an expression value"
                ),
                Some(node_id.to_string()),
            ));
        }
    }
}
