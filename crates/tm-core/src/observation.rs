use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::documents::{ObservationEntry, clamp_confidence};
use crate::enums::{ObservationCategory, ToolType};

/// A curated observation about a validated tool, joined back to the tool by
/// `resource_name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Observation {
    pub resource_name: String,
    pub resource_type: ToolType,
    pub category: ObservationCategory,
    pub details: String,
    #[serde(default)]
    pub doi: Option<String>,
    pub confidence: f64,
}

impl Observation {
    /// Build an observation from a reviewer entry.
    ///
    /// An unknown category label is kept at the front of the detail text so
    /// curators can re-file it.
    #[must_use]
    pub fn from_entry(entry: ObservationEntry, doi: Option<String>) -> Self {
        let (category, unknown) = ObservationCategory::from_label(&entry.category);
        let details = match unknown {
            Some(label) if !label.is_empty() => format!("[{label}] {}", entry.details),
            _ => entry.details,
        };
        Self {
            resource_name: entry.resource_name,
            resource_type: entry.resource_type,
            category,
            details,
            doi,
            confidence: clamp_confidence(entry.confidence),
        }
    }
}
