use std::sync::LazyLock;

use regex::Regex;

use crate::models::analysis::StructuredRecord;
use crate::services::analyzer::AnalysisError;

static JSON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```json\r?\n(.*?)\r?\n```").expect("static regex"));

static ANY_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```\r?\n(.*?)\r?\n```").expect("static regex"));

/// Turns raw model output into a structured record.
pub trait ResponseExtractor: Send + Sync {
    fn extract(&self, raw: &str) -> Result<StructuredRecord, AnalysisError>;
}

/// Best-effort extraction: a ```json fence, then any bare ``` fence, then
/// the whole reply.
#[derive(Debug, Default, Clone, Copy)]
pub struct FencedJsonExtractor;

impl FencedJsonExtractor {
    fn select<'a>(raw: &'a str) -> &'a str {
        JSON_FENCE
            .captures(raw)
            .or_else(|| ANY_FENCE.captures(raw))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .unwrap_or(raw)
    }
}

impl ResponseExtractor for FencedJsonExtractor {
    fn extract(&self, raw: &str) -> Result<StructuredRecord, AnalysisError> {
        let candidate = Self::select(raw);
        serde_json::from_str(candidate.trim())
            .map(StructuredRecord)
            .map_err(|e| AnalysisError::MalformedResponse {
                reason: e.to_string(),
                raw: raw.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn extract(raw: &str) -> Result<StructuredRecord, AnalysisError> {
        FencedJsonExtractor.extract(raw)
    }

    #[test]
    fn test_json_fence() {
        let record = extract("```json\n{\"products\":[]}\n```").unwrap();
        assert_eq!(record.0, json!({"products": []}));
    }

    #[test]
    fn test_bare_json() {
        let record = extract("{\"products\": []}").unwrap();
        assert_eq!(record.0, json!({"products": []}));
    }

    #[test]
    fn test_untagged_fence_with_prose() {
        let raw = "Here is the analysis:\n```\n{\"colors\": [{\"name\": \"Red\"}]}\n```\nThanks!";
        let record = extract(raw).unwrap();
        assert_eq!(record.entries("colors").len(), 1);
    }

    #[test]
    fn test_json_fence_preferred_over_other_fence() {
        let raw = "```\nnot json\n```\nand\n```json\n{\"sizes\": []}\n```";
        let record = extract(raw).unwrap();
        assert_eq!(record.0, json!({"sizes": []}));
    }

    #[test]
    fn test_non_json_is_malformed() {
        let err = extract("I could not see a product in this picture.").unwrap_err();
        match err {
            AnalysisError::MalformedResponse { raw, .. } => {
                assert!(raw.contains("could not see"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
