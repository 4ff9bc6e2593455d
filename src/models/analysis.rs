//! The structured result the model is asked to produce.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AnalysisError;

/// Sentinel standing in for an empty action item list.
pub const NO_ACTION_ITEMS: &str = "None identified.";
/// Sentinel standing in for an empty next steps list.
pub const NO_NEXT_STEPS: &str = "No further suggestions.";

/// Summary, action items and next steps for one analyzed input.
///
/// `action_items` and `next_steps` are never empty; an empty list is
/// represented by the single-element sentinel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub summary: String,
    pub action_items: Vec<String>,
    pub next_steps: Vec<String>,
}

impl AnalysisResult {
    pub fn new(
        summary: impl Into<String>,
        action_items: Vec<String>,
        next_steps: Vec<String>,
    ) -> Self {
        Self {
            summary: summary.into(),
            action_items: with_sentinel(action_items, NO_ACTION_ITEMS),
            next_steps: with_sentinel(next_steps, NO_NEXT_STEPS),
        }
    }

    /// Parse the fully accumulated model output.
    ///
    /// Accepts the JSON object optionally wrapped in a Markdown code fence.
    pub fn parse(raw: &str) -> Result<Self, AnalysisError> {
        let body = strip_code_fence(raw.trim());
        if body.is_empty() {
            return Err(AnalysisError::ResultParseFailure(
                "model returned an empty response".to_string(),
            ));
        }

        let value: Value = serde_json::from_str(body)
            .map_err(|e| AnalysisError::ResultParseFailure(e.to_string()))?;
        let obj = value.as_object().ok_or_else(|| {
            AnalysisError::ResultParseFailure("expected a JSON object".to_string())
        })?;

        let summary = obj
            .get("summary")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                AnalysisError::ResultParseFailure("missing \"summary\" field".to_string())
            })?;

        Ok(Self::new(
            summary,
            string_items(obj.get("actionItems")),
            string_items(obj.get("nextSteps")),
        ))
    }

    /// Whether the action items are only the empty sentinel.
    pub fn has_no_action_items(&self) -> bool {
        self.action_items.len() == 1 && self.action_items[0] == NO_ACTION_ITEMS
    }
}

fn with_sentinel(items: Vec<String>, sentinel: &str) -> Vec<String> {
    let items: Vec<String> = items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if items.is_empty() {
        vec![sentinel.to_string()]
    } else {
        items
    }
}

fn string_items(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    }
}

fn strip_code_fence(s: &str) -> &str {
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    // Drop the info string (e.g. "json"), with or without a newline after it.
    let info_len = rest
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(rest.len());
    let rest = rest[info_len..].trim_start();
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_result() {
        let raw = r#"{"summary":"Groceries and a call.","actionItems":["Buy milk","Call Bob"],"nextSteps":["Plan the week"]}"#;
        let result = AnalysisResult::parse(raw).unwrap();
        assert_eq!(result.summary, "Groceries and a call.");
        assert_eq!(result.action_items, vec!["Buy milk", "Call Bob"]);
        assert_eq!(result.next_steps, vec!["Plan the week"]);
    }

    #[test]
    fn test_empty_arrays_become_sentinels() {
        let result =
            AnalysisResult::parse(r#"{"summary":"x","actionItems":[],"nextSteps":[" "]}"#).unwrap();
        assert_eq!(result.action_items, vec![NO_ACTION_ITEMS]);
        assert_eq!(result.next_steps, vec![NO_NEXT_STEPS]);
        assert!(result.has_no_action_items());
    }

    #[test]
    fn test_missing_arrays_become_sentinels() {
        let result = AnalysisResult::parse(r#"{"summary":"x"}"#).unwrap();
        assert_eq!(result.action_items, vec![NO_ACTION_ITEMS]);
        assert_eq!(result.next_steps, vec![NO_NEXT_STEPS]);
    }

    #[test]
    fn test_single_line_code_fence() {
        let result = AnalysisResult::parse(r#"```json{"summary":"inline"}```"#).unwrap();
        assert_eq!(result.summary, "inline");

        let result = AnalysisResult::parse(r#"```{"summary":"bare"}```"#).unwrap();
        assert_eq!(result.summary, "bare");
    }

    #[test]
    fn test_code_fence_is_tolerated() {
        let raw = "```json\n{\"summary\":\"fenced\",\"actionItems\":[\"a\"]}\n```\n";
        let result = AnalysisResult::parse(raw).unwrap();
        assert_eq!(result.summary, "fenced");
        assert_eq!(result.action_items, vec!["a"]);
    }

    #[test]
    fn test_invalid_documents_fail() {
        for raw in ["", "{\"summary\":", "[1,2]", "{\"actionItems\":[]}", "{\"summary\":\"\"}"] {
            let err = AnalysisResult::parse(raw).unwrap_err();
            assert_eq!(err.kind(), "ResultParseFailure", "input: {raw:?}");
        }
    }
}
