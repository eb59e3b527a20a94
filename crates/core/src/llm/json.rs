use crate::domain::analysis::{fallback, AnalysisResult};
use serde_json::{Map, Value};

pub const FENCE_OPEN: &str = "```json";
pub const FENCE_CLOSE: &str = "```";

/// Removes at most one leading ```` ```json ```` and one trailing ```` ``` ````, trimming
/// whitespace before and after.
pub fn strip_fences(text: &str) -> &str {
    let mut inner = text.trim();
    if let Some(rest) = inner.strip_prefix(FENCE_OPEN) {
        inner = rest;
    }
    if let Some(rest) = inner.strip_suffix(FENCE_CLOSE) {
        inner = rest;
    }
    inner.trim()
}

/// Turns a raw completion into an analysis. Never fails: anything that is not a JSON
/// object once fences are stripped yields [`fallback`] for `sector`.
pub fn normalize(raw_text: &str, sector: &str) -> AnalysisResult {
    let json_str = strip_fences(raw_text);
    if !json_str.starts_with('{') {
        tracing::debug!(%sector, "completion does not start with a JSON object; using fallback");
        return fallback(sector);
    }

    match serde_json::from_str::<Map<String, Value>>(json_str) {
        Ok(fields) => AnalysisResult::from_model(fields),
        Err(err) => {
            tracing::debug!(%sector, error = %err, "completion is not valid JSON; using fallback");
            fallback(sector)
        }
    }
}

/// [`normalize`] for a completion that may be missing altogether.
pub fn normalize_opt(raw_text: Option<&str>, sector: &str) -> AnalysisResult {
    normalize(raw_text.unwrap_or_default(), sector)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::analysis::ResultSource;
    use serde_json::json;

    fn complete_analysis() -> Value {
        json!({
            "sentiment": "Bullish",
            "whySentiment": "Tariff relief for chipmakers.",
            "shortTermOutlook": "Up",
            "whyShortTermOutlook": "Momentum after the announcement.",
            "longTermOutlook": "Consolidate",
            "whyLongTermOutlook": "Policy may be reversed.",
            "stocksAffected": [
                {"ticker": "AAPL", "movement": "Up"},
                {"ticker": "NVDA", "movement": "Up"},
                {"ticker": "INTC", "movement": "Consolidate"},
                {"ticker": "MSFT", "movement": "Down"},
            ],
            "newsSummary": "Markets cheered the new trade stance.",
        })
    }

    #[test]
    fn strip_fences_handles_fenced_blocks() {
        assert_eq!(strip_fences("  ```json\n{\"a\":1}\n```\n"), "{\"a\":1}");
        assert_eq!(strip_fences("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_fences("```json"), "");
    }

    #[test]
    fn strip_fences_removes_each_marker_at_most_once() {
        assert_eq!(strip_fences("```json```json{}``````"), "```json{}```");
    }

    #[test]
    fn fenced_object_is_returned_verbatim() {
        let body = complete_analysis();
        let raw = format!("```json\n{body}\n```");
        let result = normalize(&raw, "technology");
        assert_eq!(result.source(), ResultSource::Model);
        assert_eq!(Value::Object(result.into_map()), body);
    }

    #[test]
    fn bare_object_is_returned_verbatim_without_validation() {
        let body = json!({"sentiment": 42, "unexpected": [1, 2]});
        let result = normalize(&body.to_string(), "technology");
        assert!(!result.is_fallback());
        assert_eq!(Value::Object(result.into_map()), body);
    }

    #[test]
    fn prose_before_json_falls_back() {
        let raw = format!("Sure! Here's the analysis: {}", complete_analysis());
        let result = normalize(&raw, "technology");
        assert!(result.is_fallback());
        assert_eq!(result, fallback("technology"));
    }

    #[test]
    fn empty_and_missing_input_fall_back() {
        assert!(normalize("", "technology").is_fallback());
        assert!(normalize("   \n", "technology").is_fallback());
        assert!(normalize_opt(None, "technology").is_fallback());
        assert!(normalize("```json\n```", "technology").is_fallback());
    }

    #[test]
    fn truncated_or_non_object_json_falls_back() {
        assert!(normalize("{\"sentiment\": \"Bull", "technology").is_fallback());
        assert!(normalize("[1, 2, 3]", "technology").is_fallback());
        assert!(normalize("{} trailing", "technology").is_fallback());
    }

    #[test]
    fn plain_fence_without_language_tag_is_not_stripped() {
        let raw = format!("```\n{}\n```", complete_analysis());
        assert!(normalize(&raw, "technology").is_fallback());
    }
}
