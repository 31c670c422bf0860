pub mod error;
pub mod expr;
pub mod fix;
pub mod parse;
pub mod registry;
pub mod validate;
pub mod wasm;

pub use error::{Diagnostic, DiagnosticKind, JourneyError};
pub use fix::AppliedFix;
pub use registry::Registry;

use std::path::Path;

/// Validate a journey document from its JSON text using the built-in
/// node definitions.
pub fn validate_source(json: &str) -> Result<Vec<Diagnostic>, JourneyError> {
    let journey = parse::parse(json)?;
    Ok(validate::validate_journey(&journey, Registry::builtin()))
}

/// Validate a journey document file.
pub fn validate_path(path: impl AsRef<Path>) -> Result<Vec<Diagnostic>, JourneyError> {
    let journey = parse::load(path)?;
    Ok(validate::validate_journey(&journey, Registry::builtin()))
}

/// Repair a journey document file in place: source-level escape repair,
/// parse, document fixes, pretty-printed write-back. A document without
/// any workflow cannot be repaired and is left untouched.
pub fn fix_path(path: impl AsRef<Path>) -> Result<Vec<AppliedFix>, JourneyError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| JourneyError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let (repaired, mut fixes) = fix::fix_source(&text);
    let mut journey = parse::parse(&repaired)?;
    if journey.workflow().is_none() {
        return Err(JourneyError::MissingWorkflow);
    }
    fixes.extend(fix::fix_journey(&mut journey, Registry::builtin()));

    let output = parse::to_string_pretty(&journey)?;
    std::fs::write(path, output).map_err(|source| JourneyError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(fixes)
}
