//! Expression-text repairs: backtick normalization, strict-equality
//! operators, and information-node text canonicalization.

use serde_json::Value;

use super::AppliedFix;
use crate::expr;
use crate::parse::types::{Expression, Node, Workflow};

/// Condition operands and loop conditions wrapped whole in backticks with
/// further backticks inside are unwound: the outer backticks go away and
/// every inner backtick becomes a double quote.
pub fn fix_condition_backticks(workflow: &mut Workflow, fixes: &mut Vec<AppliedFix>) {
    let keys: Vec<String> = workflow.nodes.keys().cloned().collect();
    for key in keys {
        let Some(node) = workflow.nodes.get_mut(&key) else {
            continue;
        };
        match node {
            Node::Loop(n) => {
                if let Some(condition) = n.condition.as_mut() {
                    fix_operand_value(condition, &key, "loop condition", fixes);
                }
            }
            Node::Condition(n) => {
                if let Some(spec) = n.condition.as_mut() {
                    if let Some(field) = spec.field.as_mut() {
                        fix_operand_value(field, &key, "condition field", fixes);
                    }
                    if let Some(value) = spec.value.as_mut() {
                        fix_operand_value(value, &key, "condition value", fixes);
                    }
                }
            }
            _ => {}
        }
    }
}

fn fix_operand_value(value: &mut Value, node_id: &str, label: &str, fixes: &mut Vec<AppliedFix>) {
    let Some(raw) = expr::expression_value(value).map(str::to_string) else {
        return;
    };
    let trimmed = raw.trim();
    if !(expr::is_backticked(trimmed) && trimmed[1..trimmed.len() - 1].contains('`')) {
        return;
    }
    let fixed = trimmed[1..trimmed.len() - 1].replace('`', "\"");

    if let Some(obj) = value.as_object_mut() {
        obj.insert("value".into(), Value::String(fixed));
        fixes.push(AppliedFix::new(
            "expression",
            format!("normalized backticks in {label}"),
            Some(node_id.to_string()),
        ));
    }
}

/// JSON object/array literals assigned by set_variables (and loop
/// variable initializers) must be bare JSON text, not backtick-wrapped.
pub fn fix_set_variables_backticks(workflow: &mut Workflow, fixes: &mut Vec<AppliedFix>) {
    let keys: Vec<String> = workflow.nodes.keys().cloned().collect();
    for key in keys {
        let Some(node) = workflow.nodes.get_mut(&key) else {
            continue;
        };
        let is_set_variables = node.field_kind() == Some("set_variables");
        let inits = match node {
            Node::Action(n) if is_set_variables => n
                .action
                .as_mut()
                .and_then(|a| a.variables.as_mut()),
            Node::Loop(n) => n.variables.as_mut(),
            _ => None,
        };
        let Some(inits) = inits else { continue };

        for init in inits {
            let Some(value) = init.value.as_mut() else {
                continue;
            };
            let Some(raw) = expr::expression_value(value).map(str::to_string) else {
                continue;
            };
            if expr::is_backticked(&raw) && expr::looks_like_json(expr::strip_backticks(&raw)) {
                let stripped = expr::strip_backticks(&raw).to_string();
                if let Some(obj) = value.as_object_mut() {
                    obj.insert("value".into(), Value::String(stripped));
                    fixes.push(AppliedFix::new(
                        "expression",
                        format!(
                            "stripped backticks from JSON initializer of '{}'",
                            init.name.as_deref().unwrap_or("?")
                        ),
                        Some(key.clone()),
                    ));
                }
            }
        }
    }
}

/// Replace JavaScript strict equality with the engine's operators in
/// every expression value of every node.
pub fn fix_strict_equality(workflow: &mut Workflow, fixes: &mut Vec<AppliedFix>) {
    let keys: Vec<String> = workflow.nodes.keys().cloned().collect();
    for key in keys {
        let Some(node) = workflow.nodes.get_mut(&key) else {
            continue;
        };
        let changed = rewrite_expressions(node, &mut |value| {
            if value.contains("===") || value.contains("!==") {
                Some(value.replace("!==", "!=").replace("===", "=="))
            } else {
                None
            }
        });
        if changed {
            fixes.push(AppliedFix::new(
                "expression",
                "replaced strict equality operators with == / !=",
                Some(key),
            ));
        }
    }
}

/// Information nodes get a title when missing, and their display texts
/// rewritten to the canonical double-quoted single-line form.
pub fn fix_information_nodes(workflow: &mut Workflow, fixes: &mut Vec<AppliedFix>) {
    let keys: Vec<String> = workflow.nodes.keys().cloned().collect();
    for key in keys {
        let Some(node) = workflow.nodes.get_mut(&key) else {
            continue;
        };
        if node.field_kind() != Some("information") {
            continue;
        }
        let Some(action) = node.action_mut() else {
            continue;
        };

        if action.title.is_none() {
            action.title = Some(Expression::new("\"\"").to_value());
            fixes.push(AppliedFix::new(
                "expression",
                "added missing information title",
                Some(key.clone()),
            ));
        }

        let texts = [
            ("text", action.text.as_mut()),
            ("title", action.title.as_mut()),
            ("button_text", action.button_text.as_mut()),
        ];
        for (field, value) in texts {
            let Some(value) = value else { continue };
            let Some(raw) = expr::expression_value(value).map(str::to_string) else {
                continue;
            };
            if let Some(canonical) = expr::canonical_information_text(&raw)
                && let Some(obj) = value.as_object_mut()
            {
                obj.insert("value".into(), Value::String(canonical));
                fixes.push(AppliedFix::new(
                    "expression",
                    format!("rewrote information '{field}' to canonical quoted form"),
                    Some(key.clone()),
                ));
            }
        }
    }
}

/// Apply `rewrite` to every expression value found in the node. The node
/// is rebuilt from JSON when anything changed so typed and passthrough
/// fields are handled the same way.
fn rewrite_expressions(node: &mut Node, rewrite: &mut dyn FnMut(&str) -> Option<String>) -> bool {
    let mut value = node.to_value();
    if !rewrite_value(&mut value, rewrite) {
        return false;
    }
    match serde_json::from_value::<Node>(value) {
        Ok(rebuilt) => {
            *node = rebuilt;
            true
        }
        Err(_) => false,
    }
}

fn rewrite_value(value: &mut Value, rewrite: &mut dyn FnMut(&str) -> Option<String>) -> bool {
    match value {
        Value::Object(map) => {
            if map.get("type").and_then(Value::as_str) == Some("expression") {
                let replacement = map
                    .get("value")
                    .and_then(Value::as_str)
                    .and_then(|s| rewrite(s));
                if let Some(new) = replacement {
                    map.insert("value".into(), Value::String(new));
                    return true;
                }
                return false;
            }
            let mut changed = false;
            for (_, child) in map.iter_mut() {
                changed |= rewrite_value(child, rewrite);
            }
            changed
        }
        Value::Array(items) => {
            let mut changed = false;
            for child in items {
                changed |= rewrite_value(child, rewrite);
            }
            changed
        }
        _ => false,
    }
}
