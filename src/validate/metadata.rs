//! Export-envelope rules (M001–M006).

use serde_json::Value;

use crate::error::Diagnostic;
use crate::expr;
use crate::parse::types::{ExportData, Journey, Version};
use crate::registry::Registry;

pub fn validate_metadata(journey: &Journey, registry: &Registry) -> Vec<Diagnostic> {
    let mut diags = Vec::new();

    if journey.workflow().is_none() {
        diags.push(Diagnostic::metadata(
            "M006",
            "Journey document contains no workflow",
            None,
        ));
    }

    let Some(exports) = &journey.exports else {
        // Bare-workflow documents carry no envelope to check.
        return diags;
    };
    if exports.is_empty() {
        diags.push(Diagnostic::metadata("M002", "'exports' is empty", None));
        return diags;
    }

    for export in exports {
        let Some(data) = &export.data else {
            diags.push(Diagnostic::metadata(
                "M002",
                "Export is missing its 'data' object",
                None,
            ));
            continue;
        };
        check_export_data(data, registry, &mut diags);
    }

    diags
}

fn check_export_data(data: &ExportData, registry: &Registry, diags: &mut Vec<Diagnostic>) {
    let constants = &registry.constants;

    match data.journey_type.as_deref() {
        None => diags.push(Diagnostic::metadata(
            "M002",
            "Export data is missing 'type'",
            None,
        )),
        Some(t) if !constants.valid_journey_types.iter().any(|v| v == t) => {
            diags.push(Diagnostic::metadata(
                "M001",
                format!(
                    "Journey type '{t}' is invalid (expected one of: {})",
                    constants.valid_journey_types.join(", ")
                ),
                None,
            ));
        }
        _ => {}
    }

    match data.policy_id.as_deref() {
        None => diags.push(Diagnostic::metadata(
            "M002",
            "Export data is missing 'policy_id'",
            None,
        )),
        Some(id) if !expr::is_valid_uuid(id) => diags.push(Diagnostic::metadata(
            "M002",
            format!("'policy_id' ('{id}') is not a valid lowercase-hex UUID"),
            None,
        )),
        _ => {}
    }

    if !is_nonempty_string(data.desc.as_ref()) {
        diags.push(Diagnostic::metadata(
            "M002",
            "Export data is missing a non-empty 'desc'",
            None,
        ));
    }
    check_timestamp(data.created_date.as_ref(), "created_date", "M002", diags);
    check_timestamp(
        data.last_modified_date.as_ref(),
        "last_modified_date",
        "M002",
        diags,
    );

    match &data.versions {
        None => diags.push(Diagnostic::metadata(
            "M002",
            "Export data is missing 'versions'",
            None,
        )),
        Some(versions) if versions.is_empty() => diags.push(Diagnostic::metadata(
            "M002",
            "'versions' is empty",
            None,
        )),
        Some(versions) => {
            for (i, version) in versions.iter().enumerate() {
                check_version(i, version, registry, diags);
            }
        }
    }
}

fn check_version(index: usize, version: &Version, registry: &Registry, diags: &mut Vec<Diagnostic>) {
    let constants = &registry.constants;

    match &version.schema_version {
        None => diags.push(Diagnostic::metadata(
            "M003",
            format!("Version {index} is missing 'schema_version'"),
            None,
        )),
        Some(v) if v.as_i64() != Some(2) => diags.push(Diagnostic::metadata(
            "M004",
            format!("Version {index}: 'schema_version' must be 2"),
            None,
        )),
        _ => {}
    }

    match &version.filter_criteria {
        None => diags.push(Diagnostic::metadata(
            "M003",
            format!("Version {index} is missing 'filter_criteria'"),
            None,
        )),
        Some(v) if !expr::is_expression_object(v) => diags.push(Diagnostic::metadata(
            "M003",
            format!("Version {index}: 'filter_criteria' must be an expression object"),
            None,
        )),
        _ => {}
    }

    if version.workflow.is_none() {
        diags.push(Diagnostic::metadata(
            "M003",
            format!("Version {index} is missing 'workflow'"),
            None,
        ));
    }

    match version.version_id.as_deref() {
        None => diags.push(Diagnostic::metadata(
            "M003",
            format!("Version {index} is missing 'version_id'"),
            None,
        )),
        Some(id) if !expr::is_valid_uuid(id) => diags.push(Diagnostic::metadata(
            "M003",
            format!("Version {index}: 'version_id' ('{id}') is not a valid lowercase-hex UUID"),
            None,
        )),
        _ => {}
    }

    match version.state.as_deref() {
        None => diags.push(Diagnostic::metadata(
            "M003",
            format!("Version {index} is missing 'state'"),
            None,
        )),
        Some(s) if !constants.valid_version_states.iter().any(|v| v == s) => {
            diags.push(Diagnostic::metadata(
                "M005",
                format!(
                    "Version {index}: state '{s}' is invalid (expected one of: {})",
                    constants.valid_version_states.join(", ")
                ),
                None,
            ));
        }
        _ => {}
    }

    if !is_nonempty_string(version.desc.as_ref()) {
        diags.push(Diagnostic::metadata(
            "M003",
            format!("Version {index} is missing a non-empty 'desc'"),
            None,
        ));
    }
    check_timestamp(version.created_at.as_ref(), "created_at", "M003", diags);
    check_timestamp(version.last_modified.as_ref(), "last_modified", "M003", diags);
}

fn is_nonempty_string(value: Option<&Value>) -> bool {
    value
        .and_then(Value::as_str)
        .is_some_and(|s| !s.trim().is_empty())
}

fn check_timestamp(value: Option<&Value>, field: &str, code: &str, diags: &mut Vec<Diagnostic>) {
    match value {
        None => diags.push(Diagnostic::metadata(
            code,
            format!("Missing timestamp field '{field}'"),
            None,
        )),
        Some(v) if v.as_i64().is_none() => diags.push(Diagnostic::metadata(
            code,
            format!("Timestamp field '{field}' must be an integer epoch value"),
            None,
        )),
        _ => {}
    }
}
