//! Shared expression scanning and classification helpers.
//!
//! Used by the expression validator (grammar checks), the variable
//! validator (reference/field extraction), and the fixer (canonical
//! rewrites). Everything here is pure string/JSON inspection.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

pub static UUID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$")
        .unwrap_or_else(|e| panic!("uuid regex: {e}"))
});

static DQ_STRING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""(?:[^"\\]|\\.)*""#).unwrap_or_else(|e| panic!("string regex: {e}"))
});

static BT_STRING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`[^`]*`").unwrap_or_else(|e| panic!("backtick regex: {e}")));

static INTERP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([^}]*)\}").unwrap_or_else(|e| panic!("interpolation regex: {e}"))
});

/// `@ns.fn(` call head; replaced with a bare `(` so arguments stay visible
/// to reference extraction.
static CALL_HEAD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@[A-Za-z_]\w*(?:\.[A-Za-z_]\w*)*\s*\(")
        .unwrap_or_else(|e| panic!("call regex: {e}"))
});

pub static NS_CALL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@([A-Za-z_]\w*)\.([A-Za-z_]\w*)\s*\(")
        .unwrap_or_else(|e| panic!("namespace call regex: {e}"))
});

static IDENT_CHAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z_]\w*(?:\.[A-Za-z_]\w*)*")
        .unwrap_or_else(|e| panic!("identifier regex: {e}"))
});

const KEYWORDS: &[&str] = &[
    "true", "false", "null", "and", "or", "not", "if", "else", "in",
];

pub fn is_valid_uuid(s: &str) -> bool {
    UUID_RE.is_match(s)
}

/// The `value` string of an `{"type": "expression", "value": ...}` object.
pub fn expression_value(v: &Value) -> Option<&str> {
    if v.get("type").and_then(Value::as_str) != Some("expression") {
        return None;
    }
    v.get("value").and_then(Value::as_str)
}

pub fn is_expression_object(v: &Value) -> bool {
    expression_value(v).is_some()
}

/// Every expression object in a node's JSON value, as `(path, value)`
/// pairs. Paths are dot-joined key/index chains; the walk does not descend
/// into an expression object itself.
pub fn collect_expressions(value: &Value) -> Vec<(String, String)> {
    let mut found = Vec::new();
    walk(value, String::new(), &mut found);
    found
}

fn walk(value: &Value, path: String, found: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            if let Some(s) = expression_value(value) {
                found.push((path, s.to_string()));
                return;
            }
            for (key, child) in map {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                walk(child, child_path, found);
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                walk(child, format!("{path}.{i}"), found);
            }
        }
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// Literal shape classification
// ---------------------------------------------------------------------------

pub fn is_double_quoted(s: &str) -> bool {
    let t = s.trim();
    t.len() >= 2 && t.starts_with('"') && t.ends_with('"')
}

pub fn is_backticked(s: &str) -> bool {
    let t = s.trim();
    t.len() >= 2 && t.starts_with('`') && t.ends_with('`')
}

/// One layer of outer backticks removed, if present.
pub fn strip_backticks(s: &str) -> &str {
    let t = s.trim();
    if t.len() >= 2 && t.starts_with('`') && t.ends_with('`') {
        &t[1..t.len() - 1]
    } else {
        t
    }
}

pub fn looks_like_json(s: &str) -> bool {
    let t = strip_backticks(s).trim();
    (t.starts_with('{') && t.ends_with('}')) || (t.starts_with('[') && t.ends_with(']'))
}

pub fn has_interpolation(s: &str) -> bool {
    s.contains("${")
}

/// Contents of every `${...}` interpolation.
pub fn interpolations(s: &str) -> Vec<&str> {
    INTERP_RE
        .captures_iter(s)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect()
}

/// The value with string literals (double-quoted and backticked) blanked
/// out, for operator scans that must ignore literal content.
pub fn strip_strings(s: &str) -> String {
    let no_dq = DQ_STRING_RE.replace_all(s, " ");
    BT_STRING_RE.replace_all(&no_dq, " ").into_owned()
}

// ---------------------------------------------------------------------------
// Reference extraction
// ---------------------------------------------------------------------------

/// The pieces of an expression that can carry variable references: each
/// interpolation body, plus the rest of the value with interpolations and
/// string literals blanked out.
fn reference_segments(value: &str) -> Vec<String> {
    let mut segments: Vec<String> = interpolations(value)
        .into_iter()
        .map(str::to_string)
        .collect();
    let remainder = INTERP_RE.replace_all(value, " ");
    segments.push(strip_strings(&remainder));
    segments
}

fn chain_is_call(segment: &str, end: usize) -> bool {
    segment[end..].trim_start().starts_with('(')
}

/// Root identifiers referenced by an expression value. `@ns.fn(...)` call
/// heads are dropped but their arguments are kept; dotted chains count as
/// a reference to their first segment; call targets are skipped.
pub fn variable_references(value: &str) -> BTreeSet<String> {
    let mut refs = BTreeSet::new();
    for segment in reference_segments(value) {
        let cleaned = CALL_HEAD_RE.replace_all(&segment, "(");
        for m in IDENT_CHAIN_RE.find_iter(&cleaned) {
            if chain_is_call(&cleaned, m.end()) {
                continue;
            }
            let root = m.as_str().split('.').next().unwrap_or(m.as_str());
            if KEYWORDS.contains(&root) {
                continue;
            }
            refs.insert(root.to_string());
        }
    }
    refs
}

/// Canonical form of information-node text: backticks removed, newlines
/// collapsed, and the whole value double-quoted with `${...}` left inline.
/// Returns `None` when the value is already canonical or has no content.
pub fn canonical_information_text(value: &str) -> Option<String> {
    let collapsed = value.replace('`', "").replace('\n', " ").replace("\\n", " ");
    let trimmed = collapsed.trim();
    if trimmed.is_empty() {
        return None;
    }
    let canonical = if is_double_quoted(trimmed) {
        trimmed.to_string()
    } else {
        format!("\"{}\"", trimmed.trim_matches('"'))
    };
    if canonical == value {
        None
    } else {
        Some(canonical)
    }
}

/// `(variable, first_field)` pairs for every dotted access in the value.
pub fn field_accesses(value: &str) -> BTreeSet<(String, String)> {
    let mut accesses = BTreeSet::new();
    for segment in reference_segments(value) {
        let cleaned = CALL_HEAD_RE.replace_all(&segment, "(");
        for m in IDENT_CHAIN_RE.find_iter(&cleaned) {
            if chain_is_call(&cleaned, m.end()) {
                continue;
            }
            let mut parts = m.as_str().split('.');
            let (Some(root), Some(field)) = (parts.next(), parts.next()) else {
                continue;
            };
            if KEYWORDS.contains(&root) {
                continue;
            }
            accesses.insert((root.to_string(), field.to_string()));
        }
    }
    accesses
}
