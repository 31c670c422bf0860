//! Graph-level structural rules (S001–S012).

use std::collections::BTreeSet;

use crate::error::Diagnostic;
use crate::expr::is_valid_uuid;
use crate::parse::graph::JourneyGraph;
use crate::parse::types::{Node, Workflow};
use crate::registry::Registry;

/// Run all structural rules. Returns every violation found.
pub fn validate_structural(
    workflow: &Workflow,
    graph: &JourneyGraph,
    registry: &Registry,
) -> Vec<Diagnostic> {
    let mut diags = Vec::new();

    s001_uuid_format(workflow, &mut diags);
    s002_node_id_matches_key(workflow, &mut diags);
    s003_node_types_known(workflow, registry, &mut diags);
    s004_action_type_misuse(workflow, registry, &mut diags);
    s005_reachability(workflow, graph, &mut diags);
    s006_dangling_targets(workflow, &mut diags);
    s008_body_structure(workflow, &mut diags);
    s009_body_duplication(workflow, &mut diags);
    s010_forbidden_cycles(workflow, graph, &mut diags);
    s011_link_structure(workflow, graph, registry, &mut diags);
    s012_outer_paths_terminate(workflow, graph, registry, &mut diags);

    diags
}

fn s001_uuid_format(workflow: &Workflow, diags: &mut Vec<Diagnostic>) {
    if let Some(id) = &workflow.id
        && !is_valid_uuid(id)
    {
        diags.push(Diagnostic::structural(
            "S001",
            format!("Workflow id '{id}' is not a valid lowercase-hex UUID"),
            None,
        ));
    }
    if let Some(head) = &workflow.head
        && !is_valid_uuid(head)
    {
        diags.push(Diagnostic::structural(
            "S001",
            format!("Workflow head '{head}' is not a valid lowercase-hex UUID"),
            None,
        ));
    }
    for (key, node) in &workflow.nodes {
        if !is_valid_uuid(key) {
            diags.push(Diagnostic::structural(
                "S001",
                format!("Node key '{key}' is not a valid lowercase-hex UUID"),
                Some(key.clone()),
            ));
        }
        if let Some(id) = node.id()
            && !is_valid_uuid(id)
        {
            diags.push(Diagnostic::structural(
                "S001",
                format!("Node id '{id}' is not a valid lowercase-hex UUID"),
                Some(key.clone()),
            ));
        }
        for link in node.links() {
            if let Some(target) = &link.target
                && !is_valid_uuid(target)
            {
                diags.push(Diagnostic::structural(
                    "S001",
                    format!("Link target '{target}' is not a valid lowercase-hex UUID"),
                    Some(key.clone()),
                ));
            }
        }
    }
}

fn s002_node_id_matches_key(workflow: &Workflow, diags: &mut Vec<Diagnostic>) {
    for (key, node) in &workflow.nodes {
        match node.id() {
            None => diags.push(Diagnostic::structural(
                "S002",
                "Node is missing its 'id' field",
                Some(key.clone()),
            )),
            Some(id) if id != key => diags.push(Diagnostic::structural(
                "S002",
                format!("Node id '{id}' does not match its key in 'nodes'"),
                Some(key.clone()),
            )),
            _ => {}
        }
    }
}

fn s003_node_types_known(workflow: &Workflow, registry: &Registry, diags: &mut Vec<Diagnostic>) {
    for (key, node) in &workflow.nodes {
        match node {
            Node::Action(n) => {
                if n.action.is_none() {
                    diags.push(Diagnostic::structural(
                        "S003",
                        "Action node is missing its 'action' object",
                        Some(key.clone()),
                    ));
                } else if node.field_kind().is_none() {
                    diags.push(Diagnostic::structural(
                        "S003",
                        "Action node is missing 'action.type'",
                        Some(key.clone()),
                    ));
                }
            }
            Node::Condition(_) | Node::Loop(_) | Node::Block(_) => {}
            Node::Platform(n) => match n.node_type.as_deref() {
                None => diags.push(Diagnostic::structural(
                    "S003",
                    "Node is missing its 'type' tag",
                    Some(key.clone()),
                )),
                Some(tag) if registry.contract(tag).is_none() => {
                    diags.push(Diagnostic::structural(
                        "S003",
                        format!("Unknown node type '{tag}'"),
                        Some(key.clone()),
                    ));
                }
                _ => {}
            },
        }
    }
}

fn s004_action_type_misuse(workflow: &Workflow, registry: &Registry, diags: &mut Vec<Diagnostic>) {
    for (key, node) in &workflow.nodes {
        match node {
            // An action kind used directly as the node-level tag.
            Node::Platform(n) => {
                if let Some(tag) = n.node_type.as_deref()
                    && registry.is_action_kind(tag)
                {
                    diags.push(Diagnostic::structural(
                        "S004",
                        format!(
                            "'{tag}' is an action type; use type \"action\" with action.type = \"{tag}\""
                        ),
                        Some(key.clone()),
                    ));
                }
            }
            Node::Action(_) => {
                if node.field_kind() == Some("get_information") {
                    diags.push(Diagnostic::structural(
                        "S004",
                        "'get_information' is not a valid action type; use a form action \
                         with metadata.type = \"get_information\"",
                        Some(key.clone()),
                    ));
                }
            }
            _ => {}
        }
    }
}

fn s005_reachability(workflow: &Workflow, graph: &JourneyGraph, diags: &mut Vec<Diagnostic>) {
    let Some(head) = &workflow.head else {
        diags.push(Diagnostic::structural(
            "S007",
            "Workflow has no 'head' node",
            None,
        ));
        return;
    };
    if !workflow.nodes.contains_key(head) {
        diags.push(Diagnostic::structural(
            "S007",
            format!("Workflow head '{head}' is not a key in 'nodes'"),
            None,
        ));
        return;
    }
    let reachable = graph.reachable_from(head);
    for key in workflow.nodes.keys() {
        if !reachable.contains(key) {
            diags.push(Diagnostic::structural(
                "S005",
                "Node is not reachable from the workflow head (orphaned)",
                Some(key.clone()),
            ));
        }
    }
}

fn s006_dangling_targets(workflow: &Workflow, diags: &mut Vec<Diagnostic>) {
    // Checked over every node, reached or not.
    for (key, node) in &workflow.nodes {
        for link in node.links() {
            if let Some(target) = &link.target
                && !workflow.nodes.contains_key(target)
            {
                diags.push(Diagnostic::structural(
                    "S006",
                    format!(
                        "Link '{}' targets '{target}', which is not a key in 'nodes'",
                        link.name.as_deref().unwrap_or("<unnamed>")
                    ),
                    Some(key.clone()),
                ));
            }
        }
    }
}

fn s008_body_structure(workflow: &Workflow, diags: &mut Vec<Diagnostic>) {
    for (key, node) in &workflow.nodes {
        let Some((body_key, body)) = node.body() else {
            continue;
        };
        let Some(body_id) = body.id() else {
            diags.push(Diagnostic::structural(
                "S008",
                format!("The '{body_key}' node is missing its 'id' field"),
                Some(key.clone()),
            ));
            continue;
        };
        if !workflow.nodes.contains_key(body_id) {
            diags.push(Diagnostic::structural(
                "S008",
                format!(
                    "The '{body_key}' entry '{body_id}' has no matching top-level node in 'nodes'"
                ),
                Some(key.clone()),
            ));
        }
    }
}

fn s009_body_duplication(workflow: &Workflow, diags: &mut Vec<Diagnostic>) {
    for (key, node) in &workflow.nodes {
        let Some((body_key, body)) = node.body() else {
            continue;
        };
        let Some(body_id) = body.id() else { continue };
        let Some(entry) = workflow.nodes.get(body_id) else {
            continue;
        };
        if body.to_value() != entry.to_value() {
            diags.push(Diagnostic::structural(
                "S009",
                format!(
                    "The '{body_key}' copy of node '{body_id}' differs from its top-level entry; \
                     the two must stay structurally identical"
                ),
                Some(key.clone()),
            ));
        }
    }
}

fn s010_forbidden_cycles(workflow: &Workflow, graph: &JourneyGraph, diags: &mut Vec<Diagnostic>) {
    for (container, members) in &graph.body_nodes {
        let entry = workflow
            .nodes
            .get(container)
            .and_then(|n| n.body())
            .and_then(|(_, b)| b.id());
        for member in members {
            let Some(node) = workflow.nodes.get(member) else {
                continue;
            };
            for link in node.links() {
                let Some(target) = link.target.as_deref() else {
                    continue;
                };
                if target == container || Some(target) == entry {
                    diags.push(Diagnostic::structural(
                        "S010",
                        format!(
                            "Link '{}' inside the body of '{container}' targets '{target}'; \
                             looping back is expressed by a link with no target, never an \
                             explicit edge to the loop or its body entry",
                            link.name.as_deref().unwrap_or("<unnamed>")
                        ),
                        Some(member.clone()),
                    ));
                }
            }
        }
    }
}

fn s011_link_structure(
    workflow: &Workflow,
    graph: &JourneyGraph,
    registry: &Registry,
    diags: &mut Vec<Diagnostic>,
) {
    let constants = &registry.constants;
    for (key, node) in &workflow.nodes {
        for link in node.links() {
            match link.link_type.as_deref() {
                None => diags.push(Diagnostic::structural(
                    "S011",
                    format!(
                        "Link '{}' is missing its 'type'",
                        link.name.as_deref().unwrap_or("<unnamed>")
                    ),
                    Some(key.clone()),
                )),
                Some(t) if !constants.valid_link_types.iter().any(|v| v == t) => {
                    diags.push(Diagnostic::structural(
                        "S011",
                        format!(
                            "Link '{}' has invalid type '{t}' (expected one of: {})",
                            link.name.as_deref().unwrap_or("<unnamed>"),
                            constants.valid_link_types.join(", ")
                        ),
                        Some(key.clone()),
                    ));
                }
                _ => {}
            }
            if link.target.is_some() && link.name.is_none() {
                diags.push(Diagnostic::structural(
                    "S011",
                    "Targeted link is missing its 'name'",
                    Some(key.clone()),
                ));
            }
            if link.target.is_none() && !graph.is_in_body(key) {
                diags.push(Diagnostic::structural(
                    "S011",
                    format!(
                        "Link '{}' has no target; targetless links are only legal inside a \
                         loop/block body, where they mean retry",
                        link.name.as_deref().unwrap_or("<unnamed>")
                    ),
                    Some(key.clone()),
                ));
            }
            if let Some(p) = link.presentation.as_deref()
                && !constants.valid_presentation_values.iter().any(|v| v == p)
            {
                diags.push(Diagnostic::structural(
                    "S011",
                    format!(
                        "Link '{}' has invalid presentation '{p}' (expected one of: {})",
                        link.name.as_deref().unwrap_or("<unnamed>"),
                        constants.valid_presentation_values.join(", ")
                    ),
                    Some(key.clone()),
                ));
            }
        }
    }
}

fn s012_outer_paths_terminate(
    workflow: &Workflow,
    graph: &JourneyGraph,
    registry: &Registry,
    diags: &mut Vec<Diagnostic>,
) {
    let Some(head) = &workflow.head else { return };
    if !workflow.nodes.contains_key(head) {
        return;
    }
    let reachable = graph.reachable_from(head);
    let body_members: BTreeSet<&String> = graph.body_nodes.values().flatten().collect();

    for (key, node) in &workflow.nodes {
        if !reachable.contains(key) || body_members.contains(key) {
            continue;
        }
        let is_terminal = node
            .registry_kind()
            .is_some_and(|kind| registry.is_terminal(kind));
        let has_targeted_link = node.links().iter().any(|l| l.target.is_some());
        if !is_terminal && !has_targeted_link {
            diags.push(Diagnostic::structural(
                "S012",
                "Path ends at a non-terminal node; every outer-scope path must reach a \
                 terminal action",
                Some(key.clone()),
            ));
        }
    }
}
