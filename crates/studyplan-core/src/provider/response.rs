//! Parsing and validation of chat-completion responses.
//!
//! Two layers can be malformed. A broken completion body or suggestion
//! envelope rejects the whole batch with a [`ProviderError`]; a broken
//! individual entry (unknown task, unparsable timestamp, end not after
//! start) is dropped on its own.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::ProviderError;

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SuggestionEnvelope {
    suggestions: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSuggestion {
    task_id: String,
    start_at: String,
    end_at: String,
    #[serde(default)]
    rationale: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

/// An external suggestion that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalSuggestion {
    pub task_id: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub rationale: Option<String>,
    pub confidence: Option<f64>,
}

/// Extract the first completion's content from a chat-completion body.
pub fn completion_content(body: &str) -> Result<String, ProviderError> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::InvalidResponse(format!("failed to parse body: {e}")))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| ProviderError::InvalidResponse("no completion content".to_string()))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Validate one entry against the known task ids.
fn validate_entry(value: serde_json::Value, task_ids: &HashSet<&str>) -> Option<ExternalSuggestion> {
    let raw: RawSuggestion = match serde_json::from_value(value) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::debug!(error = %e, "dropping malformed suggestion entry");
            return None;
        }
    };
    if !task_ids.contains(raw.task_id.as_str()) {
        tracing::debug!(task_id = %raw.task_id, "dropping suggestion for unknown task");
        return None;
    }
    let (Some(start_at), Some(end_at)) = (parse_timestamp(&raw.start_at), parse_timestamp(&raw.end_at))
    else {
        tracing::debug!(task_id = %raw.task_id, "dropping suggestion with unparsable timestamps");
        return None;
    };
    if end_at <= start_at {
        tracing::debug!(task_id = %raw.task_id, "dropping suggestion that ends before it starts");
        return None;
    }
    Some(ExternalSuggestion {
        task_id: raw.task_id,
        start_at,
        end_at,
        rationale: raw.rationale,
        confidence: raw.confidence,
    })
}

/// Parse completion content into validated suggestions.
///
/// # Errors
///
/// Returns [`ProviderError::Schema`] if the content is not JSON or lacks a
/// `suggestions` array.
pub fn parse_suggestions(
    content: &str,
    task_ids: &HashSet<&str>,
) -> Result<Vec<ExternalSuggestion>, ProviderError> {
    let envelope: SuggestionEnvelope =
        serde_json::from_str(content.trim()).map_err(|e| ProviderError::Schema(e.to_string()))?;

    Ok(envelope
        .suggestions
        .into_iter()
        .filter_map(|entry| validate_entry(entry, task_ids))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ids() -> HashSet<&'static str> {
        ["a", "b"].into_iter().collect()
    }

    #[test]
    fn extracts_first_choice_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"{}"}}]}"#;
        assert_eq!(completion_content(body).unwrap(), "{}");
    }

    #[test]
    fn missing_choices_is_invalid_response() {
        let err = completion_content(r#"{"choices":[]}"#).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
        let err = completion_content("not json").unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }

    #[test]
    fn valid_entries_pass_through_verbatim() {
        let content = r#"{"suggestions":[
            {"taskId":"a","startAt":"2024-01-02T09:00:00-05:00","endAt":"2024-01-02T10:00:00-05:00","rationale":"morning focus","confidence":0.8}
        ]}"#;
        let parsed = parse_suggestions(content, &ids()).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].start_at, Utc.with_ymd_and_hms(2024, 1, 2, 14, 0, 0).unwrap());
        assert_eq!(parsed[0].rationale.as_deref(), Some("morning focus"));
        assert_eq!(parsed[0].confidence, Some(0.8));
    }

    #[test]
    fn bad_entries_are_dropped_individually() {
        let content = r#"{"suggestions":[
            {"taskId":"ghost","startAt":"2024-01-02T09:00:00Z","endAt":"2024-01-02T10:00:00Z"},
            {"taskId":"a","startAt":"tomorrow","endAt":"2024-01-02T10:00:00Z"},
            {"taskId":"a","startAt":"2024-01-02T10:00:00Z","endAt":"2024-01-02T10:00:00Z"},
            {"taskId":7,"startAt":"2024-01-02T09:00:00Z","endAt":"2024-01-02T10:00:00Z"},
            {"taskId":"b","startAt":"2024-01-03T09:00:00Z","endAt":"2024-01-03T10:00:00Z"}
        ]}"#;
        let parsed = parse_suggestions(content, &ids()).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].task_id, "b");
        assert!(parsed[0].rationale.is_none());
    }

    #[test]
    fn malformed_envelope_rejects_batch() {
        for content in [
            "```json\n{\"suggestions\":[]}\n```",
            r#"{"items":[]}"#,
            r#"{"suggestions":{}}"#,
            r#"[]"#,
        ] {
            let err = parse_suggestions(content, &ids()).unwrap_err();
            assert!(matches!(err, ProviderError::Schema(_)), "{content}");
        }
    }
}
