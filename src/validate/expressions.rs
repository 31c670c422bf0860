//! Context-sensitive expression syntax rules (E001–E013).
//!
//! Every expression field is classified by its enclosing node kind and
//! field path, then checked against that context's grammar. Information
//! nodes are the deliberate exception to the backtick convention: their
//! static text is double-quoted and interpolation is bare `${...}`.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::Diagnostic;
use crate::expr;
use crate::parse::types::{Node, Workflow};
use crate::registry::Registry;

static SQ_STRING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'[^']*'").unwrap_or_else(|e| panic!("quote regex: {e}")));

static BARE_NS_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Known namespaces are exactly std and time.
    Regex::new(r"(?:^|[^@\w.])(std|time)\.[A-Za-z_]\w*\s*\(")
        .unwrap_or_else(|e| panic!("namespace regex: {e}"))
});

static BT_CONCAT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`\s*\+|\+\s*`").unwrap_or_else(|e| panic!("concat regex: {e}")));

static PAREN_LOGIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\([^)]*(?:\|\||&&)[^)]*\)").unwrap_or_else(|e| panic!("logic regex: {e}"))
});

static COMPOUND_ASSIGN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[+*/%-]=(?:[^=]|$)").unwrap_or_else(|e| panic!("assign regex: {e}"))
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Grammar {
    /// information text / title / button_text
    InfoText,
    /// condition field/value and loop condition
    Operand,
    /// set_variables initializer values
    VariableValue,
    /// json_data-family data payloads
    JsonData,
    /// embedded schemas (form_schema, data_json_schema, app_data)
    Schema,
    Generic,
}

pub fn validate_expressions(workflow: &Workflow, registry: &Registry) -> Vec<Diagnostic> {
    let mut diags = Vec::new();
    for (key, node) in &workflow.nodes {
        condition_contract(key, node, registry, &mut diags);

        let value = node.to_value();
        for (path, expr_value) in expr::collect_expressions(&value) {
            // Body shadows are scanned through their top-level entries.
            if path.starts_with("loop_body") || path.starts_with("block.") {
                continue;
            }
            let grammar = classify(node, &path);
            check_expression(key, &path, &expr_value, grammar, registry, &mut diags);
        }
    }
    diags
}

fn classify(node: &Node, path: &str) -> Grammar {
    if path.contains("form_schema") || path.contains("data_json_schema") {
        return Grammar::Schema;
    }
    let last = path.rsplit('.').next().unwrap_or(path);
    if last == "app_data" {
        return Grammar::Schema;
    }
    match node {
        Node::Condition(_) if path == "condition.field" || path == "condition.value" => {
            Grammar::Operand
        }
        Node::Loop(_) if path == "condition" => Grammar::Operand,
        Node::Action(_) => match node.field_kind() {
            Some("information") if matches!(last, "text" | "title" | "button_text") => {
                Grammar::InfoText
            }
            Some("set_variables") if path.contains("variables") => Grammar::VariableValue,
            Some("json_data" | "sdk_data" | "custom_activity_log") if last == "data" => {
                Grammar::JsonData
            }
            _ => Grammar::Generic,
        },
        _ => Grammar::Generic,
    }
}

fn check_expression(
    node_id: &str,
    path: &str,
    value: &str,
    grammar: Grammar,
    registry: &Registry,
    diags: &mut Vec<Diagnostic>,
) {
    match grammar {
        Grammar::Schema => {
            check_double_escaping(node_id, path, value, diags);
            return;
        }
        Grammar::InfoText => check_info_text(node_id, path, value, diags),
        Grammar::Operand => check_operand(node_id, path, value, diags),
        Grammar::VariableValue => check_variable_value(node_id, path, value, diags),
        Grammar::JsonData => check_json_data(node_id, path, value, diags),
        Grammar::Generic => {}
    }
    check_namespaces(node_id, path, value, registry, diags);
    check_operators(node_id, path, value, diags);
    check_interpolations(node_id, path, value, diags);
}

fn check_info_text(node_id: &str, path: &str, value: &str, diags: &mut Vec<Diagnostic>) {
    if value.contains('\n') || value.contains("\\n") {
        diags.push(Diagnostic::expression(
            "E003",
            format!("'{path}' must not contain newlines; information text is a single line"),
            Some(node_id.to_string()),
        ));
    }
    if value.contains('`') {
        let expected = expr::canonical_information_text(value)
            .unwrap_or_else(|| value.replace('`', ""));
        let found_shape = if value.contains("``") || BT_CONCAT_RE.is_match(value) {
            "excessive backticking"
        } else {
            "backtick quoting"
        };
        diags.push(Diagnostic::expression(
            "E002",
            format!(
                "'{path}' uses {found_shape}; information text never uses backticks \
                 (expected: {expected}, found: {value})"
            ),
            Some(node_id.to_string()),
        ));
        return;
    }
    if !value.trim().is_empty() && !expr::is_double_quoted(value) {
        let expected = expr::canonical_information_text(value).unwrap_or_default();
        diags.push(Diagnostic::expression(
            "E001",
            format!(
                "'{path}' static text must be a double-quoted string \
                 (expected: {expected}, found: {value})"
            ),
            Some(node_id.to_string()),
        ));
    }
}

fn check_operand(node_id: &str, path: &str, value: &str, diags: &mut Vec<Diagnostic>) {
    if expr::is_backticked(value) && expr::looks_like_json(value) {
        diags.push(Diagnostic::expression(
            "E004",
            format!("'{path}' wraps a JSON literal in backticks; it would be parsed twice"),
            Some(node_id.to_string()),
        ));
    }
    let trimmed = value.trim();
    if expr::is_backticked(trimmed) && trimmed[1..trimmed.len() - 1].contains('`') {
        diags.push(Diagnostic::expression(
            "E012",
            format!(
                "'{path}' nests backticks inside a backtick-wrapped expression; drop the outer \
                 backticks and quote inner literals with double quotes"
            ),
            Some(node_id.to_string()),
        ));
    } else if expr::strip_strings(value).contains('`') {
        diags.push(Diagnostic::expression(
            "E012",
            format!("'{path}' has unbalanced backticks"),
            Some(node_id.to_string()),
        ));
    }
    check_double_escaping(node_id, path, value, diags);
}

fn check_variable_value(node_id: &str, path: &str, value: &str, diags: &mut Vec<Diagnostic>) {
    if expr::is_backticked(value) && expr::looks_like_json(value) {
        diags.push(Diagnostic::expression(
            "E004",
            format!(
                "'{path}' wraps a JSON object literal in backticks; it would be parsed twice"
            ),
            Some(node_id.to_string()),
        ));
    }
    check_double_escaping(node_id, path, value, diags);
    if expr::looks_like_json(value)
        && !value.contains("\\\"")
        && serde_json::from_str::<serde_json::Value>(expr::strip_backticks(value)).is_err()
        && expr::variable_references(value).is_empty()
    {
        diags.push(Diagnostic::expression(
            "E013",
            format!("'{path}' looks like a JSON literal but does not parse as JSON"),
            Some(node_id.to_string()),
        ));
    }
}

fn check_json_data(node_id: &str, path: &str, value: &str, diags: &mut Vec<Diagnostic>) {
    if value.contains('`') {
        diags.push(Diagnostic::expression(
            "E011",
            format!("'{path}' must be plain JSON; no backtick wrapping"),
            Some(node_id.to_string()),
        ));
    }
    if expr::has_interpolation(value) {
        diags.push(Diagnostic::expression(
            "E011",
            format!(
                "'{path}' must be plain JSON with direct variable references; \
                 no ${{...}} interpolation"
            ),
            Some(node_id.to_string()),
        ));
    }
    check_double_escaping(node_id, path, value, diags);
}

fn check_double_escaping(node_id: &str, path: &str, value: &str, diags: &mut Vec<Diagnostic>) {
    if value.contains("\\\"") {
        diags.push(Diagnostic::expression(
            "E005",
            format!(
                "'{path}' double-escapes quotes inside embedded JSON; escaping must be \
                 single-backslash"
            ),
            Some(node_id.to_string()),
        ));
    }
}

fn check_namespaces(
    node_id: &str,
    path: &str,
    value: &str,
    registry: &Registry,
    diags: &mut Vec<Diagnostic>,
) {
    let constants = &registry.constants;
    for caps in expr::NS_CALL_RE.captures_iter(value) {
        let (Some(ns), Some(func)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let (ns, func) = (ns.as_str(), func.as_str());
        if !constants.known_namespaces.iter().any(|n| n == ns) {
            diags.push(Diagnostic::expression(
                "E007",
                format!(
                    "'{path}' calls unknown namespace '@{ns}' (supported: {})",
                    constants.known_namespaces.join(", ")
                ),
                Some(node_id.to_string()),
            ));
            continue;
        }
        let message = match (ns, func) {
            ("std", "if") => Some(
                "there is no '@std.if' ternary helper; branch with a condition node".to_string(),
            ),
            ("std", "default") => Some(
                "there is no '@std.default'; initialize the variable with set_variables"
                    .to_string(),
            ),
            ("std", "now") => Some("there is no '@std.now'; use '@time.now()'".to_string()),
            ("std", f) if !constants.valid_std_functions.iter().any(|v| v == f) => {
                Some(format!("unknown function '@std.{f}'"))
            }
            ("time", f) if !constants.valid_time_functions.iter().any(|v| v == f) => {
                Some(format!("unknown function '@time.{f}'"))
            }
            _ => None,
        };
        if let Some(message) = message {
            diags.push(Diagnostic::expression(
                "E007",
                format!("'{path}': {message}"),
                Some(node_id.to_string()),
            ));
        }
    }

    let stripped = expr::strip_strings(value);
    if let Some(caps) = BARE_NS_RE.captures(&stripped)
        && let Some(ns) = caps.get(1)
    {
        diags.push(Diagnostic::expression(
            "E008",
            format!(
                "'{path}' calls namespace '{0}' without '@'; write '@{0}.…'",
                ns.as_str()
            ),
            Some(node_id.to_string()),
        ));
    }
}

fn check_operators(node_id: &str, path: &str, value: &str, diags: &mut Vec<Diagnostic>) {
    let stripped = expr::strip_strings(value);
    let mut push = |message: String| {
        diags.push(Diagnostic::expression(
            "E009",
            format!("'{path}': {message}"),
            Some(node_id.to_string()),
        ));
    };

    if stripped.contains("===") || stripped.contains("!==") {
        push("strict equality operators are not supported; use '==' / '!='".to_string());
    }
    if SQ_STRING_RE.is_match(&stripped) {
        push("single-quoted strings are not supported; use backtick quoting".to_string());
    }
    if stripped.contains(';') {
        push("expressions are single statements; ';' is not allowed".to_string());
    }
    if COMPOUND_ASSIGN_RE.is_match(&stripped) {
        push("compound assignment operators are not supported".to_string());
    }
    if stripped.contains("++") || stripped.contains("--") {
        push("increment/decrement operators are not supported".to_string());
    }
    if stripped.contains("**") {
        push("the '**' operator is not supported".to_string());
    }
    if stripped.contains('~') {
        push("the '~' operator is not supported".to_string());
    }
    if stripped.contains('%') {
        push("'%' has no guaranteed modulo semantics on the platform; avoid it".to_string());
    }
}

fn check_interpolations(node_id: &str, path: &str, value: &str, diags: &mut Vec<Diagnostic>) {
    for body in expr::interpolations(value) {
        let stripped = expr::strip_strings(body);
        let has_logic = stripped.contains("||") || stripped.contains("&&");
        let has_arithmetic = stripped.contains(['+', '-', '*', '/']);
        if PAREN_LOGIC_RE.is_match(&stripped) || (has_logic && has_arithmetic) {
            diags.push(Diagnostic::expression(
                "E010",
                format!(
                    "'{path}' interpolation '${{{body}}}' is too complex; compute it in a \
                     set_variables node first"
                ),
                Some(node_id.to_string()),
            ));
        }
    }
}

fn condition_contract(
    node_id: &str,
    node: &Node,
    registry: &Registry,
    diags: &mut Vec<Diagnostic>,
) {
    let Node::Condition(n) = node else { return };
    let Some(cond) = &n.condition else { return };
    let constants = &registry.constants;

    match cond.condition_type.as_deref() {
        Some(t) if constants.valid_condition_types.iter().any(|v| v == t) => {}
        other => diags.push(Diagnostic::expression(
            "E006",
            format!(
                "condition.type must be one of: {} (found: {})",
                constants.valid_condition_types.join(", "),
                other.unwrap_or("<missing>")
            ),
            Some(node_id.to_string()),
        )),
    }
    if cond.negated != Some(false) {
        diags.push(Diagnostic::expression(
            "E006",
            "condition.negated must be present and false; negate in the expression instead",
            Some(node_id.to_string()),
        ));
    }
    let metadata_type = cond
        .metadata
        .as_ref()
        .and_then(|m| m.get("type"))
        .and_then(serde_json::Value::as_str);
    if metadata_type != Some("condition") {
        diags.push(Diagnostic::expression(
            "E006",
            "condition.metadata.type must be \"condition\"",
            Some(node_id.to_string()),
        ));
    }
    match cond.data_type.as_deref() {
        Some(t) if constants.valid_condition_data_types.iter().any(|v| v == t) => {}
        other => diags.push(Diagnostic::expression(
            "E006",
            format!(
                "condition.data_type must be one of: {} (found: {})",
                constants.valid_condition_data_types.join(", "),
                other.unwrap_or("<missing>")
            ),
            Some(node_id.to_string()),
        )),
    }
}
