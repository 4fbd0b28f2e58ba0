//! Central schema registry for reviewer documents.
//!
//! The `SchemaRegistry` builds JSON Schemas from tm-core types at
//! construction time using [`schemars::schema_for!`] and provides
//! validation via `jsonschema`. The `*_response` schemas are what each
//! reviewer request embeds; the `*_document` schemas describe persisted files.

use std::collections::HashMap;

use schemars::schema_for;

use crate::error::SchemaError;

pub const VERDICT_RESPONSE: &str = "verdict_response";
pub const TITLE_SCREENING_RESPONSE: &str = "title_screening_response";
pub const ABSTRACT_SCREENING_RESPONSE: &str = "abstract_screening_response";
pub const OBSERVATION_RESPONSE: &str = "observation_response";

/// Store of every JSON Schema toolmine exchanges or persists.
pub struct SchemaRegistry {
    schemas: HashMap<&'static str, serde_json::Value>,
}

macro_rules! register {
    ($map:expr, $name:expr, $ty:ty) => {
        match serde_json::to_value(schema_for!($ty)) {
            Ok(schema) => {
                $map.insert($name, schema);
            }
            Err(error) => tracing::error!(name = $name, %error, "schema serialization failed"),
        }
    };
}

impl SchemaRegistry {
    #[must_use]
    pub fn new() -> Self {
        let mut schemas = HashMap::new();

        // --- Reviewer responses (4) ---
        register!(schemas, VERDICT_RESPONSE, tm_core::documents::VerdictResponse);
        register!(
            schemas,
            TITLE_SCREENING_RESPONSE,
            tm_core::documents::TitleScreeningResponse
        );
        register!(
            schemas,
            ABSTRACT_SCREENING_RESPONSE,
            tm_core::documents::AbstractScreeningResponse
        );
        register!(
            schemas,
            OBSERVATION_RESPONSE,
            tm_core::documents::ObservationResponse
        );

        // --- Persisted documents (2) ---
        register!(schemas, "verdict_document", tm_core::documents::VerdictDocument);
        register!(
            schemas,
            "observation_document",
            tm_core::documents::ObservationDocument
        );

        // --- Records (4) ---
        register!(schemas, "publication", tm_core::publication::Publication);
        register!(schemas, "tool_candidate", tm_core::tools::ToolCandidate);
        register!(schemas, "observation", tm_core::observation::Observation);
        register!(
            schemas,
            "pattern_suggestion",
            tm_core::documents::PatternSuggestion
        );

        Self { schemas }
    }

    /// Get a schema by name. Returns `None` if not found.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.schemas.get(name)
    }

    /// Validate a JSON value against a named schema.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::NotFound` if the schema name is unknown, or
    /// `SchemaError::ValidationFailed` if validation produces errors.
    pub fn validate(&self, name: &str, instance: &serde_json::Value) -> Result<(), SchemaError> {
        let schema = self
            .get(name)
            .ok_or_else(|| SchemaError::NotFound(name.to_string()))?;

        let validator = jsonschema::validator_for(schema)
            .map_err(|e| SchemaError::Generation(format!("{e}")))?;

        let errors: Vec<String> = validator
            .iter_errors(instance)
            .map(|e| format!("{e}"))
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::ValidationFailed { errors })
        }
    }

    /// List all registered schema names.
    #[must_use]
    pub fn list(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.schemas.keys().copied().collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn schema_count(&self) -> usize {
        self.schemas.len()
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn registry_has_expected_count() {
        // 4 responses + 2 documents + 4 records
        assert_eq!(SchemaRegistry::new().schema_count(), 10);
    }

    #[test]
    fn registry_list_is_sorted() {
        let names = SchemaRegistry::new().list();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
    }

    #[test]
    fn unknown_schema_is_not_found() {
        let err = SchemaRegistry::new()
            .validate("nope", &json!({}))
            .unwrap_err();
        assert!(matches!(err, SchemaError::NotFound(_)));
    }

    #[test]
    fn title_response_accepts_well_formed_batch() {
        let value = json!({
            "results": [
                {"pmid": "1", "verdict": "research", "confidence": 0.9, "reason": "cohort study"},
                {"pmid": "2", "verdict": "non_research", "confidence": 0.8, "reason": "editorial"}
            ]
        });
        assert!(SchemaRegistry::new().validate(TITLE_SCREENING_RESPONSE, &value).is_ok());
    }

    #[test]
    fn title_response_rejects_unknown_label() {
        let value = json!({"results": [{"pmid": "1", "verdict": "maybe"}]});
        let err = SchemaRegistry::new()
            .validate(TITLE_SCREENING_RESPONSE, &value)
            .unwrap_err();
        assert!(matches!(err, SchemaError::ValidationFailed { .. }));
    }
}
