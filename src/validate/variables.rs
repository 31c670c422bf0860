//! Variable scoping and shape rules (C001–C008).
//!
//! Walks the graph in structural traversal order threading a scope stack:
//! loop/block bodies open a child scope that is popped when the body
//! exits. A variable's shape is fixed at its initializer; later field
//! accesses are checked against it.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use serde_json::Value;

use crate::error::Diagnostic;
use crate::expr;
use crate::parse::graph::JourneyGraph;
use crate::parse::types::{Node, VariableInit, Workflow};
use crate::registry::Registry;

#[derive(Debug, Clone)]
struct VarShape {
    /// Field names recorded at initialization; `None` when untracked.
    fields: Option<BTreeSet<String>>,
    /// Declared only through an `output_var`, with no explicit initializer.
    output_only: bool,
}

type Scope = BTreeMap<String, VarShape>;

pub fn validate_variables(
    workflow: &Workflow,
    graph: &JourneyGraph,
    registry: &Registry,
) -> Vec<Diagnostic> {
    let mut diags = Vec::new();

    for (key, node) in &workflow.nodes {
        if let Node::Loop(n) = node
            && n.variables.is_none()
        {
            diags.push(Diagnostic::scope(
                "C001",
                "Loop node is missing its 'variables' array (required even when empty)",
                Some(key.clone()),
            ));
        }
    }

    // Names declared inside each container's body, for escaping-scope checks.
    let mut container_decls: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for (container, members) in &graph.body_nodes {
        let mut names = BTreeSet::new();
        for member in members {
            if let Some(node) = workflow.nodes.get(member) {
                for (name, _) in declarations(node) {
                    names.insert(name);
                }
            }
        }
        container_decls.insert(container.clone(), names);
    }

    let Some(head) = workflow.head.as_deref() else {
        return diags;
    };
    if !workflow.nodes.contains_key(head) {
        return diags;
    }

    let mut scopes = vec![Scope::new()];
    let mut visited = HashSet::new();
    visit(
        workflow,
        graph,
        registry,
        head,
        &mut scopes,
        &mut visited,
        &container_decls,
        &mut diags,
    );

    output_var_initialization(workflow, head, &mut diags);
    diags
}

#[allow(clippy::too_many_arguments)]
fn visit(
    workflow: &Workflow,
    graph: &JourneyGraph,
    registry: &Registry,
    node_id: &str,
    scopes: &mut Vec<Scope>,
    visited: &mut HashSet<String>,
    container_decls: &BTreeMap<String, BTreeSet<String>>,
    diags: &mut Vec<Diagnostic>,
) {
    if !visited.insert(node_id.to_string()) {
        return;
    }
    let Some(node) = workflow.nodes.get(node_id) else {
        return;
    };

    for (name, shape) in declarations(node) {
        if let Some(scope) = scopes.last_mut() {
            scope.insert(name, shape);
        }
    }

    check_references(node_id, node, scopes, graph, registry, container_decls, diags);

    if let Some(body_id) = node.body().and_then(|(_, b)| b.id())
        && workflow.nodes.contains_key(body_id)
    {
        scopes.push(Scope::new());
        visit(
            workflow,
            graph,
            registry,
            body_id,
            scopes,
            visited,
            container_decls,
            diags,
        );
        scopes.pop();
    }

    for link in node.links() {
        if let Some(target) = link.target.as_deref()
            && workflow.nodes.contains_key(target)
        {
            visit(
                workflow,
                graph,
                registry,
                target,
                scopes,
                visited,
                container_decls,
                diags,
            );
        }
    }
}

fn check_references(
    node_id: &str,
    node: &Node,
    scopes: &[Scope],
    graph: &JourneyGraph,
    registry: &Registry,
    container_decls: &BTreeMap<String, BTreeSet<String>>,
    diags: &mut Vec<Diagnostic>,
) {
    let value = node.to_value();
    let mut refs = BTreeSet::new();
    let mut accesses = BTreeSet::new();
    for (path, expr_value) in expr::collect_expressions(&value) {
        if skip_path(&path) {
            continue;
        }
        refs.extend(expr::variable_references(&expr_value));
        accesses.extend(expr::field_accesses(&expr_value));
    }

    let lookup = |name: &str| scopes.iter().rev().find_map(|s| s.get(name));

    for name in &refs {
        if lookup(name).is_some() {
            continue;
        }
        if let Some(desc) = registry.constants.platform_implicit_variables.get(name) {
            diags.push(Diagnostic::scope(
                "C004",
                format!("'{name}' is a platform implicit variable ({desc}); journeys must not \
                         rely on it being set"),
                Some(node_id.to_string()),
            ));
            continue;
        }
        let escaping = container_decls.iter().any(|(container, names)| {
            names.contains(name) && !graph.body_nodes[container].contains(node_id)
        });
        if escaping {
            diags.push(Diagnostic::scope(
                "C003",
                format!(
                    "'{name}' is declared only inside a loop/block body and is out of scope here"
                ),
                Some(node_id.to_string()),
            ));
        } else {
            diags.push(Diagnostic::scope(
                "C002",
                format!("'{name}' is used before initialization; add it to a set_variables node \
                         earlier in the flow"),
                Some(node_id.to_string()),
            ));
        }
    }

    for (var, field) in &accesses {
        let Some(shape) = lookup(var) else { continue };
        if shape.output_only {
            diags.push(Diagnostic::scope(
                "C007",
                format!(
                    "'{var}.{field}' is accessed, but '{var}' only comes from an output_var; \
                     initialize it explicitly with set_variables"
                ),
                Some(node_id.to_string()),
            ));
        } else if let Some(fields) = &shape.fields {
            if fields.is_empty() {
                diags.push(Diagnostic::scope(
                    "C006",
                    format!(
                        "'{var}' was initialized as an empty object, so '{var}.{field}' cannot \
                         exist; initialize the field up front"
                    ),
                    Some(node_id.to_string()),
                ));
            } else if !fields.contains(field) {
                diags.push(Diagnostic::scope(
                    "C005",
                    format!(
                        "'{var}.{field}' is not part of '{var}''s initialized shape (fields: {})",
                        fields.iter().cloned().collect::<Vec<_>>().join(", ")
                    ),
                    Some(node_id.to_string()),
                ));
            }
        }
    }
}

fn skip_path(path: &str) -> bool {
    path.starts_with("loop_body")
        || path.starts_with("block.")
        || path.contains("form_schema")
        || path.contains("data_json_schema")
        || path.ends_with("app_data")
}

fn declarations(node: &Node) -> Vec<(String, VarShape)> {
    let mut decls = Vec::new();

    let inits: &[VariableInit] = match node {
        Node::Action(n) if node.field_kind() == Some("set_variables") => n
            .action
            .as_ref()
            .and_then(|a| a.variables.as_deref())
            .unwrap_or(&[]),
        Node::Loop(n) => n.variables.as_deref().unwrap_or(&[]),
        _ => &[],
    };
    for init in inits {
        let Some(name) = init.name.clone() else { continue };
        let fields = shape_of(init.expression_value());
        decls.push((
            name,
            VarShape {
                fields,
                output_only: false,
            },
        ));
    }

    if node.field_kind() == Some("form") {
        if let Some(action) = node.action()
            && let Some(var_name) = &action.var_name
        {
            decls.push((
                var_name.clone(),
                VarShape {
                    fields: None,
                    output_only: false,
                },
            ));
        }
        if let Some(output_var) = node.output_var() {
            let fields = node
                .action()
                .and_then(|a| a.form_schema.as_ref())
                .and_then(form_field_names);
            decls.push((
                output_var.to_string(),
                VarShape {
                    fields,
                    output_only: false,
                },
            ));
        }
    } else {
        let mut names = Vec::new();
        collect_output_vars(&node.to_value(), &mut names);
        for name in names {
            decls.push((
                name,
                VarShape {
                    fields: None,
                    output_only: true,
                },
            ));
        }
        if let Node::Platform(n) = node
            && let Some(error_variable) = &n.error_variable
        {
            decls.push((
                error_variable.clone(),
                VarShape {
                    fields: None,
                    output_only: false,
                },
            ));
        }
    }

    decls
}

/// Shape of an initializer value: the keys of its JSON object literal,
/// empty for `{}`, `None` when the value is not a tracked object.
fn shape_of(value: Option<&str>) -> Option<BTreeSet<String>> {
    let raw = value?;
    let stripped = expr::strip_backticks(raw).trim().to_string();
    if stripped == "{}" {
        return Some(BTreeSet::new());
    }
    match serde_json::from_str::<Value>(&stripped) {
        Ok(Value::Object(map)) => Some(map.keys().cloned().collect()),
        _ => None,
    }
}

fn form_field_names(schema: &Value) -> Option<BTreeSet<String>> {
    let raw = expr::expression_value(schema)?;
    let parsed: Value = serde_json::from_str(expr::strip_backticks(raw)).ok()?;
    let names = parsed
        .as_array()?
        .iter()
        .filter_map(|f| f.get("name").and_then(Value::as_str))
        .map(str::to_string)
        .collect();
    Some(names)
}

fn collect_output_vars(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                // Body shadows declare through their top-level entries.
                if key == "loop_body" || key == "block" {
                    continue;
                }
                if key == "output_var" {
                    if let Some(name) = child.as_str() {
                        out.push(name.to_string());
                    }
                    continue;
                }
                collect_output_vars(child, out);
            }
        }
        Value::Array(items) => {
            for child in items {
                collect_output_vars(child, out);
            }
        }
        _ => {}
    }
}

/// An `output_var` on a non-form node must name a variable some
/// set_variables node initializes; checked over the whole reachable graph.
fn output_var_initialization(workflow: &Workflow, head: &str, diags: &mut Vec<Diagnostic>) {
    let mut initialized = HashSet::new();
    let mut uses = Vec::new();
    let mut visited = HashSet::new();
    let mut queue = VecDeque::from([head.to_string()]);

    while let Some(node_id) = queue.pop_front() {
        if !visited.insert(node_id.clone()) {
            continue;
        }
        let Some(node) = workflow.nodes.get(&node_id) else {
            continue;
        };
        if node.field_kind() == Some("set_variables")
            && let Some(action) = node.action()
            && let Some(inits) = &action.variables
        {
            for init in inits {
                if let Some(name) = &init.name {
                    initialized.insert(name.clone());
                }
            }
        }
        if node.field_kind() != Some("form")
            && let Some(output_var) = node.output_var()
        {
            uses.push((node_id.clone(), output_var.to_string()));
        }
        for link in node.links() {
            if let Some(target) = &link.target {
                queue.push_back(target.clone());
            }
        }
        if let Some(body_id) = node.body().and_then(|(_, b)| b.id()) {
            queue.push_back(body_id.to_string());
        }
    }

    for (node_id, var) in uses {
        if !initialized.contains(&var) {
            diags.push(Diagnostic::scope(
                "C008",
                format!(
                    "output_var '{var}' is never initialized by a set_variables node; \
                     declare it before capturing into it"
                ),
                Some(node_id),
            ));
        }
    }
}
