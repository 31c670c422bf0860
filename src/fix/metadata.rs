//! Export-envelope repair: journey type, identifiers, descriptions,
//! timestamps and version bookkeeping.
//!
//! Timestamps are considered stale when older than one hour or in the
//! future, and are restamped with the current time (milliseconds at the
//! data level, seconds at the version level).

use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{Value, json};
use uuid::Uuid;

use super::AppliedFix;
use crate::expr;
use crate::parse::types::{ExportData, Expression, Journey, Version};
use crate::registry::Registry;

const HOUR_SECS: i64 = 3_600;

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

pub fn fix_journey_type(journey: &mut Journey, registry: &Registry, fixes: &mut Vec<AppliedFix>) {
    let Some(exports) = journey.exports.as_mut() else {
        return;
    };
    let valid = &registry.constants.valid_journey_types;
    let default = valid.first().map(String::as_str).unwrap_or("anonymous");

    for export in exports {
        let Some(data) = export.data.as_mut() else {
            continue;
        };
        let current = data.journey_type.as_deref();
        if !current.is_some_and(|t| valid.iter().any(|v| v == t)) {
            data.journey_type = Some(default.to_string());
            fixes.push(AppliedFix::new(
                "metadata",
                format!("set journey type to '{default}'"),
                None,
            ));
        }
    }
}

pub fn fix_envelope(journey: &mut Journey, registry: &Registry, fixes: &mut Vec<AppliedFix>) {
    let Some(exports) = journey.exports.as_mut() else {
        return;
    };
    let now = now_secs();

    for export in exports {
        let data = export.data.get_or_insert_with(ExportData::default);
        fix_export_data(data, registry, now, fixes);
    }
}

fn fix_export_data(data: &mut ExportData, registry: &Registry, now: i64, fixes: &mut Vec<AppliedFix>) {
    if !data.policy_id.as_deref().is_some_and(expr::is_valid_uuid) {
        data.policy_id = Some(Uuid::new_v4().to_string());
        fixes.push(AppliedFix::new(
            "metadata",
            "regenerated missing or invalid policy_id",
            None,
        ));
    }

    fix_desc(&mut data.desc, "export desc", fixes);
    fix_timestamp(&mut data.created_date, now * 1000, HOUR_SECS * 1000, "created_date", fixes);
    fix_timestamp(
        &mut data.last_modified_date,
        now * 1000,
        HOUR_SECS * 1000,
        "last_modified_date",
        fixes,
    );

    let versions = data.versions.get_or_insert_with(Vec::new);
    if versions.is_empty() {
        versions.push(Version::default());
        fixes.push(AppliedFix::new("metadata", "added an empty versions entry", None));
    }
    for version in versions {
        fix_version(version, registry, now, fixes);
    }
}

fn fix_version(version: &mut Version, registry: &Registry, now: i64, fixes: &mut Vec<AppliedFix>) {
    if version.schema_version.as_ref().and_then(Value::as_i64) != Some(2) {
        version.schema_version = Some(json!(2));
        fixes.push(AppliedFix::new("metadata", "set schema_version to 2", None));
    }

    let filter_ok = version
        .filter_criteria
        .as_ref()
        .is_some_and(expr::is_expression_object);
    if !filter_ok {
        version.filter_criteria = Some(Expression::new("true").to_value());
        fixes.push(AppliedFix::new(
            "metadata",
            "set filter_criteria to the always-true expression",
            None,
        ));
    }

    if !version.version_id.as_deref().is_some_and(expr::is_valid_uuid) {
        version.version_id = Some(Uuid::new_v4().to_string());
        fixes.push(AppliedFix::new(
            "metadata",
            "regenerated missing or invalid version_id",
            None,
        ));
    }

    let state_ok = version
        .state
        .as_deref()
        .is_some_and(|s| registry.constants.valid_version_states.iter().any(|v| v == s));
    if !state_ok {
        version.state = Some("version".to_string());
        fixes.push(AppliedFix::new("metadata", "reset version state to 'version'", None));
    }

    fix_desc(&mut version.desc, "version desc", fixes);
    fix_timestamp(&mut version.created_at, now, HOUR_SECS, "created_at", fixes);
    fix_timestamp(&mut version.last_modified, now, HOUR_SECS, "last_modified", fixes);
}

fn fix_desc(desc: &mut Option<Value>, label: &str, fixes: &mut Vec<AppliedFix>) {
    let ok = desc
        .as_ref()
        .and_then(Value::as_str)
        .is_some_and(|s| !s.trim().is_empty());
    if !ok {
        *desc = Some(json!("Auto-generated description"));
        fixes.push(AppliedFix::new("metadata", format!("filled in {label}"), None));
    }
}

fn fix_timestamp(
    value: &mut Option<Value>,
    now: i64,
    window: i64,
    field: &str,
    fixes: &mut Vec<AppliedFix>,
) {
    let in_range = value
        .as_ref()
        .and_then(Value::as_i64)
        .is_some_and(|t| t >= now - window && t <= now);
    if !in_range {
        *value = Some(json!(now));
        fixes.push(AppliedFix::new("metadata", format!("restamped {field}"), None));
    }
}
