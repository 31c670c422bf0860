//! Parse phase: JSON → journey document model + graph construction.

pub mod graph;
pub mod types;

pub use graph::JourneyGraph;
pub use types::*;

use std::path::Path;

use crate::error::JourneyError;

/// Deserialize a journey JSON string. The sole fatal condition.
pub fn parse(json: &str) -> Result<Journey, JourneyError> {
    Ok(serde_json::from_str::<Journey>(json)?)
}

/// Read and parse a journey document from disk.
pub fn load(path: impl AsRef<Path>) -> Result<Journey, JourneyError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| JourneyError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse(&text)
}

/// Serialize a journey document back to pretty-printed JSON.
pub fn to_string_pretty(journey: &Journey) -> Result<String, JourneyError> {
    Ok(serde_json::to_string_pretty(journey)?)
}
