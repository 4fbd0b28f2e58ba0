//! Defensive parsing of reviewer responses.
//!
//! Reviewers answer in free text that usually, but not always, contains the
//! requested JSON document. Parsing never fails: the worst case is an
//! [`ReviewOutcome::Unparseable`] result with no entries, which callers turn
//! into uncertain verdicts or pass-through screening decisions.
//!
//! ```text
//! text ──extract_json──► value ──schema ok──► typed document      (reviewed)
//!                          │
//!                          └──schema fails──► entry-by-entry      (reviewed | partial)
//!                                             no list at all      (unparseable)
//! ```

use serde::de::DeserializeOwned;
use serde_json::Value;
use tm_core::documents::{
    MissedToolCandidate, PatternSuggestion, ReviewOutcome, ValidationVerdict, VerdictResponse,
};

use crate::error::SchemaError;
use crate::registry::{SchemaRegistry, VERDICT_RESPONSE};

/// A list response after defensive parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedList<T> {
    pub items: Vec<T>,
    pub outcome: ReviewOutcome,
}

impl<T> ParsedList<T> {
    fn unparseable(reason: impl Into<String>) -> Self {
        Self {
            items: Vec::new(),
            outcome: ReviewOutcome::Unparseable {
                reason: reason.into(),
            },
        }
    }
}

/// A verdict response after defensive parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedVerdicts {
    pub response: VerdictResponse,
    pub outcome: ReviewOutcome,
}

/// Locate and parse the JSON document inside a reviewer response.
///
/// Tried in order: the whole text, a fenced ```` ```json ```` block, any
/// fenced block, the span from the first `{` to the last `}`, and the span
/// from the first `[` to the last `]`.
///
/// # Errors
///
/// Returns [`SchemaError::NoJson`] when no candidate span exists, or
/// [`SchemaError::Malformed`] with the parser's message for the last span tried.
pub fn extract_json(text: &str) -> Result<Value, SchemaError> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    let mut last_error = None;
    for span in candidate_spans(trimmed) {
        match serde_json::from_str::<Value>(span) {
            Ok(value) => return Ok(value),
            Err(error) => last_error = Some(error.to_string()),
        }
    }
    Err(last_error.map_or(SchemaError::NoJson, SchemaError::Malformed))
}

fn candidate_spans(text: &str) -> Vec<&str> {
    let mut spans = Vec::new();
    if let Some(block) = fenced_block(text, "```json") {
        spans.push(block);
    }
    if let Some(block) = fenced_block(text, "```") {
        spans.push(block);
    }
    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            spans.push(&text[start..=end]);
        }
    }
    if let (Some(start), Some(end)) = (text.find('['), text.rfind(']')) {
        if start < end {
            spans.push(&text[start..=end]);
        }
    }
    spans
}

fn fenced_block<'a>(text: &'a str, opener: &str) -> Option<&'a str> {
    let start = text.find(opener)? + opener.len();
    let rest = &text[start..];
    // skip the rest of the opener line (language tag or nothing)
    let body_start = rest.find('\n').map_or(0, |i| i + 1);
    let body = &rest[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

/// Deserialize every element of `entries`, collecting one issue per bad element.
fn parse_entries<T: DeserializeOwned>(entries: &[Value], what: &str, issues: &mut Vec<String>) -> Vec<T> {
    entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value::<T>(entry.clone()) {
            Ok(item) => Some(item),
            Err(error) => {
                issues.push(format!("{what}[{index}]: {error}"));
                None
            }
        })
        .collect()
}

/// Parse a response whose payload is a single list under `list_key`.
///
/// A bare top-level array is accepted as the list itself.
#[must_use]
pub fn parse_list_response<T: DeserializeOwned>(
    registry: &SchemaRegistry,
    schema: &str,
    list_key: &str,
    text: &str,
) -> ParsedList<T> {
    let value = match extract_json(text) {
        Ok(value) => value,
        Err(error) => return ParsedList::unparseable(error.to_string()),
    };

    let value = match value {
        Value::Array(items) => {
            let mut object = serde_json::Map::new();
            object.insert(list_key.to_string(), Value::Array(items));
            Value::Object(object)
        }
        other => other,
    };

    if let Err(error) = registry.validate(schema, &value) {
        tracing::debug!(schema, %error, "response failed schema validation; parsing entries individually");
    }

    let Some(entries) = value.get(list_key).and_then(Value::as_array) else {
        return ParsedList::unparseable(format!("response has no `{list_key}` array"));
    };

    let mut issues = Vec::new();
    let items = parse_entries(entries, list_key, &mut issues);
    ParsedList {
        items,
        outcome: outcome_from(issues),
    }
}

/// Parse a validation response.
///
/// Bad verdict entries are dropped and recorded as issues; callers give the
/// affected candidates uncertain verdicts. Bad missed-tool or pattern entries
/// are dropped the same way.
#[must_use]
pub fn parse_verdict_response(registry: &SchemaRegistry, text: &str) -> ParsedVerdicts {
    let value = match extract_json(text) {
        Ok(value) => value,
        Err(error) => return unparseable_verdicts(error.to_string()),
    };

    if registry.validate(VERDICT_RESPONSE, &value).is_ok() {
        if let Ok(response) = serde_json::from_value::<VerdictResponse>(value.clone()) {
            return ParsedVerdicts {
                response,
                outcome: ReviewOutcome::Reviewed,
            };
        }
    }

    let Some(verdict_entries) = value.get("verdicts").and_then(Value::as_array) else {
        return unparseable_verdicts("response has no `verdicts` array");
    };

    let mut issues = Vec::new();
    let verdicts: Vec<ValidationVerdict> = parse_entries(verdict_entries, "verdicts", &mut issues);
    let missed_tools: Vec<MissedToolCandidate> = value
        .get("missed_tools")
        .and_then(Value::as_array)
        .map(|entries| parse_entries(entries, "missed_tools", &mut issues))
        .unwrap_or_default();
    let suggested_patterns: Vec<PatternSuggestion> = value
        .get("suggested_patterns")
        .and_then(Value::as_array)
        .map(|entries| parse_entries(entries, "suggested_patterns", &mut issues))
        .unwrap_or_default();
    let publication_type = value
        .get("publication_type")
        .and_then(Value::as_str)
        .map(str::to_string);

    ParsedVerdicts {
        response: VerdictResponse {
            publication_type,
            verdicts,
            missed_tools,
            suggested_patterns,
        },
        outcome: outcome_from(issues),
    }
}

fn unparseable_verdicts(reason: impl Into<String>) -> ParsedVerdicts {
    ParsedVerdicts {
        response: VerdictResponse {
            publication_type: None,
            verdicts: Vec::new(),
            missed_tools: Vec::new(),
            suggested_patterns: Vec::new(),
        },
        outcome: ReviewOutcome::Unparseable {
            reason: reason.into(),
        },
    }
}

fn outcome_from(issues: Vec<String>) -> ReviewOutcome {
    if issues.is_empty() {
        ReviewOutcome::Reviewed
    } else {
        ReviewOutcome::Partial { issues }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::bare(r#"{"a": 1}"#)]
    #[case::fenced("Here you go:\n```json\n{\"a\": 1}\n```\nThanks")]
    #[case::plain_fence("```\n{\"a\": 1}\n```")]
    #[case::prose_wrapped("Sure! {\"a\": 1} Let me know.")]
    fn extracts_object(#[case] text: &str) {
        let value = extract_json(text).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn no_braces_is_no_json() {
        assert!(matches!(extract_json("I cannot help with that."), Err(SchemaError::NoJson)));
    }

    #[test]
    fn truncated_json_is_malformed() {
        let err = extract_json(r#"{"verdicts": [{"tool_name": "x"}"#).unwrap_err();
        assert!(matches!(err, SchemaError::Malformed(_)));
    }
}
