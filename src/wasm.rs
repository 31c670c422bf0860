//! WASM entry points for browser use.

use wasm_bindgen::prelude::*;

use crate::error::Diagnostic;
use crate::registry::Registry;

/// Validate a journey document JSON: parse + the full validator suite.
/// Returns a JSON array of Diagnostic objects.
#[wasm_bindgen]
pub fn validate_journey(json: &str) -> JsValue {
    let result = validate_journey_inner(json);
    serde_wasm_bindgen::to_value(&result).unwrap_or(JsValue::NULL)
}

fn validate_journey_inner(json: &str) -> Vec<DiagnosticDto> {
    let journey = match crate::parse::parse(json) {
        Ok(j) => j,
        Err(e) => {
            return vec![DiagnosticDto {
                code: "P001".into(),
                kind: "Parse".into(),
                message: format!("Failed to parse journey JSON: {e}"),
                node_id: None,
            }];
        }
    };

    crate::validate::validate_journey(&journey, Registry::builtin())
        .into_iter()
        .map(DiagnosticDto::from)
        .collect()
}

/// Full repair pipeline: source-level escape repair, parse, document
/// fixes. Returns a JSON object with either the fixed `document` plus
/// the applied `fixes` (success) or a `message` (error).
#[wasm_bindgen]
pub fn fix_journey(json: &str) -> JsValue {
    let result = fix_journey_inner(json);
    serde_wasm_bindgen::to_value(&result).unwrap_or(JsValue::NULL)
}

fn fix_journey_inner(json: &str) -> FixResult {
    let (repaired, source_fixes) = crate::fix::fix_source(json);

    let mut journey = match crate::parse::parse(&repaired) {
        Ok(j) => j,
        Err(e) => {
            return FixResult::Error {
                message: format!("Failed to parse journey JSON: {e}"),
            };
        }
    };

    let mut fixes: Vec<FixDto> = source_fixes.into_iter().map(FixDto::from).collect();
    fixes.extend(
        crate::fix::fix_journey(&mut journey, Registry::builtin())
            .into_iter()
            .map(FixDto::from),
    );

    match crate::parse::to_string_pretty(&journey) {
        Ok(document) => FixResult::Success { document, fixes },
        Err(e) => FixResult::Error {
            message: format!("Failed to serialize fixed journey: {e}"),
        },
    }
}

// ---------------------------------------------------------------------------
// DTOs for serialization to JS
// ---------------------------------------------------------------------------

#[derive(serde::Serialize, serde::Deserialize)]
struct DiagnosticDto {
    code: String,
    kind: String,
    message: String,
    node_id: Option<String>,
}

impl From<Diagnostic> for DiagnosticDto {
    fn from(d: Diagnostic) -> Self {
        DiagnosticDto {
            code: d.code,
            kind: d.kind.to_string(),
            message: d.message,
            node_id: d.node_id,
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct FixDto {
    rule: String,
    message: String,
    node_id: Option<String>,
}

impl From<crate::fix::AppliedFix> for FixDto {
    fn from(f: crate::fix::AppliedFix) -> Self {
        FixDto {
            rule: f.rule,
            message: f.message,
            node_id: f.node_id,
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(tag = "status")]
enum FixResult {
    #[serde(rename = "success")]
    Success { document: String, fixes: Vec<FixDto> },
    #[serde(rename = "error")]
    Error { message: String },
}
