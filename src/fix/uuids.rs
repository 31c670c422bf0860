//! Node-identity repair: regenerate invalid UUID keys and keep every
//! reference to them (ids, link targets, body shadows, the head pointer)
//! consistent with the new values.

use std::collections::BTreeMap;

use uuid::Uuid;

use super::AppliedFix;
use crate::expr;
use crate::parse::types::{Node, Workflow};

pub fn fix_workflow_uuids(workflow: &mut Workflow, fixes: &mut Vec<AppliedFix>) {
    let mut mapping: BTreeMap<String, String> = BTreeMap::new();
    for key in workflow.nodes.keys() {
        if !expr::is_valid_uuid(key) {
            mapping.insert(key.clone(), Uuid::new_v4().to_string());
        }
    }

    if !mapping.is_empty() {
        let old_nodes = std::mem::take(&mut workflow.nodes);
        for (key, mut node) in old_nodes {
            let new_key = mapping.get(&key).cloned().unwrap_or(key);
            rewrite_node(&mut node, &mapping);
            workflow.nodes.insert(new_key, node);
        }
        if let Some(head) = workflow.head.as_deref()
            && let Some(new) = mapping.get(head)
        {
            workflow.head = Some(new.clone());
        }
        for (old, new) in &mapping {
            fixes.push(AppliedFix::new(
                "uuid",
                format!("regenerated invalid node id '{old}' as '{new}'"),
                Some(new.clone()),
            ));
        }
    }

    // Ids that disagree with their map key (including ids that were
    // invalid without the key being invalid) are realigned to the key.
    let keys: Vec<String> = workflow.nodes.keys().cloned().collect();
    for key in keys {
        let Some(node) = workflow.nodes.get_mut(&key) else {
            continue;
        };
        if node.id() != Some(key.as_str()) {
            node.set_id(key.clone());
            fixes.push(AppliedFix::new(
                "uuid",
                "aligned node 'id' with its map key",
                Some(key),
            ));
        }
    }

    if !workflow.id.as_deref().is_some_and(expr::is_valid_uuid) {
        let new = Uuid::new_v4().to_string();
        workflow.id = Some(new);
        fixes.push(AppliedFix::new(
            "uuid",
            "regenerated missing or invalid workflow id",
            None,
        ));
    }
}

fn rewrite_node(node: &mut Node, mapping: &BTreeMap<String, String>) {
    let new_id = node.id().and_then(|id| mapping.get(id)).cloned();
    if let Some(new_id) = new_id {
        node.set_id(new_id);
    }
    if let Some(links) = node.links_mut() {
        for link in links {
            if let Some(target) = link.target.as_deref()
                && let Some(new) = mapping.get(target)
            {
                link.target = Some(new.clone());
            }
        }
    }
    if let Some(body) = node.body_mut() {
        rewrite_node(body, mapping);
    }
}
