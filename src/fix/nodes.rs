//! Node-level structural repairs: link types, terminal metadata, the
//! get_information migration and form boilerplate.

use serde_json::{Value, json};

use super::AppliedFix;
use crate::parse::types::{Expression, Node, Workflow};
use crate::registry::Registry;

/// Links named by a contract must carry that side's type: required
/// branch names get `branch`, required escape names get `escape`.
pub fn fix_link_types(workflow: &mut Workflow, registry: &Registry, fixes: &mut Vec<AppliedFix>) {
    let keys: Vec<String> = workflow.nodes.keys().cloned().collect();
    for key in keys {
        let Some(node) = workflow.nodes.get_mut(&key) else {
            continue;
        };
        let Some(kind) = node.registry_kind().map(str::to_string) else {
            continue;
        };
        let Some(contract) = registry.contract(&kind) else {
            continue;
        };
        let branch = contract.required_links.branch.clone();
        let escape = contract.required_links.escape.clone();
        let Some(links) = node.links_mut() else {
            continue;
        };

        for link in links {
            let Some(name) = link.name.as_deref() else {
                continue;
            };
            let wanted = if branch.iter().any(|n| n == name) {
                Some("branch")
            } else if escape.iter().any(|n| n == name) {
                Some("escape")
            } else {
                None
            };
            if let Some(wanted) = wanted
                && link.link_type.as_deref() != Some(wanted)
            {
                let name = name.to_string();
                link.link_type = Some(wanted.to_string());
                fixes.push(AppliedFix::new(
                    "links",
                    format!("set link '{name}' type to '{wanted}'"),
                    Some(key.clone()),
                ));
            }
        }
    }
}

/// auth_pass / reject actions must carry a metadata object.
pub fn fix_terminal_metadata(workflow: &mut Workflow, fixes: &mut Vec<AppliedFix>) {
    let keys: Vec<String> = workflow.nodes.keys().cloned().collect();
    for key in keys {
        let Some(action) = workflow.nodes.get_mut(&key).and_then(Node::action_mut) else {
            continue;
        };
        let Some(kind) = action.action_type.clone() else {
            continue;
        };
        if (kind == "auth_pass" || kind == "reject") && action.metadata.is_none() {
            action.metadata = Some(json!({ "type": kind }));
            fixes.push(AppliedFix::new(
                "nodes",
                format!("added missing metadata to '{kind}' action"),
                Some(key),
            ));
        }
    }
}

/// The deprecated get_information action becomes a form action with
/// `metadata.type` preserving the original intent.
pub fn fix_get_information_actions(workflow: &mut Workflow, fixes: &mut Vec<AppliedFix>) {
    let keys: Vec<String> = workflow.nodes.keys().cloned().collect();
    for key in keys {
        let Some(action) = workflow.nodes.get_mut(&key).and_then(Node::action_mut) else {
            continue;
        };
        if action.action_type.as_deref() != Some("get_information") {
            continue;
        }
        action.action_type = Some("form".to_string());
        match action.metadata.as_mut().and_then(Value::as_object_mut) {
            Some(metadata) => {
                metadata.insert("type".into(), json!("get_information"));
            }
            None => {
                action.metadata = Some(json!({ "type": "get_information" }));
            }
        }
        fixes.push(AppliedFix::new(
            "nodes",
            "migrated get_information action to form with metadata.type",
            Some(key),
        ));
    }
}

/// Information-collection forms carry fixed boilerplate: empty `strings`,
/// the `form_data` output variable, and an empty-object `app_data`.
pub fn fix_form_boilerplate(workflow: &mut Workflow, fixes: &mut Vec<AppliedFix>) {
    let keys: Vec<String> = workflow.nodes.keys().cloned().collect();
    for key in keys {
        let Some(node) = workflow.nodes.get_mut(&key) else {
            continue;
        };
        if node.registry_kind() != Some("get_information") {
            continue;
        }
        let Node::Action(n) = node else { continue };

        if n.strings.is_none() {
            n.strings = Some(json!([]));
            fixes.push(AppliedFix::new(
                "nodes",
                "added empty strings array to information-collection form",
                Some(key.clone()),
            ));
        }
        if n.output_var.is_none() {
            n.output_var = Some("form_data".to_string());
            fixes.push(AppliedFix::new(
                "nodes",
                "set form output_var to 'form_data'",
                Some(key.clone()),
            ));
        }
        if let Some(action) = n.action.as_mut()
            && action.app_data.is_none()
        {
            action.app_data = Some(Expression::new("{}").to_value());
            fixes.push(AppliedFix::new(
                "nodes",
                "added empty-object app_data to information-collection form",
                Some(key.clone()),
            ));
        }
    }
}
