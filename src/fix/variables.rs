//! Variable-initialization repairs, driven by scope diagnostics the
//! caller has already triaged: seed missing initializers with null, or
//! widen an existing initializer's object shape.

use serde_json::Value;
use uuid::Uuid;

use super::AppliedFix;
use crate::expr;
use crate::parse::types::{
    ActionBody, ActionNode, Expression, Extra, Link, Node, VariableInit, Workflow,
};

/// Make sure every name in `names` has a set_variables initializer.
/// Missing names are appended to the first set_variables node; when none
/// exists, a fresh one is inserted ahead of the current head.
pub fn add_missing_variable_inits(
    workflow: &mut Workflow,
    names: &[&str],
    fixes: &mut Vec<AppliedFix>,
) {
    if names.is_empty() {
        return;
    }

    let existing = workflow
        .nodes
        .iter()
        .find(|(_, node)| node.field_kind() == Some("set_variables"))
        .map(|(key, _)| key.clone());

    match existing {
        Some(key) => {
            let Some(action) = workflow.nodes.get_mut(&key).and_then(Node::action_mut) else {
                return;
            };
            let inits = action.variables.get_or_insert_with(Vec::new);
            for name in names {
                if !inits.iter().any(|i| i.name.as_deref() == Some(*name)) {
                    inits.push(VariableInit::new(*name, Expression::new("null")));
                    fixes.push(AppliedFix::new(
                        "variables",
                        format!("initialized '{name}' with null"),
                        Some(key.clone()),
                    ));
                }
            }
        }
        None => {
            let id = Uuid::new_v4().to_string();
            let inits = names
                .iter()
                .map(|name| VariableInit::new(*name, Expression::new("null")))
                .collect();
            let node = Node::Action(ActionNode {
                node_type: "action".to_string(),
                id: Some(id.clone()),
                links: Some(vec![Link {
                    name: Some("child".to_string()),
                    link_type: Some("branch".to_string()),
                    target: workflow.head.clone(),
                    presentation: None,
                    display_name: None,
                    data_json_schema: None,
                    extra: Extra::new(),
                }]),
                output_var: None,
                strings: None,
                action: Some(ActionBody {
                    action_type: Some("set_variables".to_string()),
                    metadata: None,
                    variables: Some(inits),
                    text: None,
                    title: None,
                    button_text: None,
                    form_schema: None,
                    app_data: None,
                    data: None,
                    var_name: None,
                    extra: Extra::new(),
                }),
                extra: Extra::new(),
            });
            workflow.nodes.insert(id.clone(), node);
            workflow.head = Some(id.clone());
            fixes.push(AppliedFix::new(
                "variables",
                "inserted an initial set_variables node ahead of the head",
                Some(id),
            ));
        }
    }
}

/// Widen the JSON-object initializer of `name` with any of `fields` it
/// does not already carry, each set to null. Only the first matching
/// initializer is touched.
pub fn extend_variable_shape(
    workflow: &mut Workflow,
    name: &str,
    fields: &[&str],
    fixes: &mut Vec<AppliedFix>,
) {
    let keys: Vec<String> = workflow.nodes.keys().cloned().collect();
    for key in keys {
        let Some(node) = workflow.nodes.get_mut(&key) else {
            continue;
        };
        if node.field_kind() != Some("set_variables") {
            continue;
        }
        let Some(inits) = node.action_mut().and_then(|a| a.variables.as_mut()) else {
            continue;
        };

        for init in inits {
            if init.name.as_deref() != Some(name) {
                continue;
            }
            let Some(raw) = init.expression_value().map(str::to_string) else {
                continue;
            };
            let Ok(mut parsed) = serde_json::from_str::<Value>(expr::strip_backticks(&raw)) else {
                continue;
            };
            let Some(obj) = parsed.as_object_mut() else {
                continue;
            };

            let mut added = false;
            for field in fields {
                if !obj.contains_key(*field) {
                    obj.insert((*field).to_string(), Value::Null);
                    added = true;
                }
            }
            if added {
                let rewritten = serde_json::to_string(&parsed).unwrap_or(raw);
                if let Some(value) = init.value.as_mut()
                    && let Some(map) = value.as_object_mut()
                {
                    map.insert("value".into(), Value::String(rewritten));
                }
                fixes.push(AppliedFix::new(
                    "variables",
                    format!("extended '{name}' initializer with missing fields"),
                    Some(key),
                ));
            }
            return;
        }
    }
}
