use crate::config::Settings;
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::{LlmClient, Provider};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    max_output_tokens: u32,
}

impl GeminiClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.genai_timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key: settings.genai_api_key.clone(),
            base_url: settings.genai_base_url.clone(),
            model: settings.genai_model.clone(),
            max_output_tokens: settings.genai_max_output_tokens,
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    async fn generate_content(
        &self,
        req: GenerateContentRequest<'_>,
    ) -> anyhow::Result<(serde_json::Value, GenerateContentResponse)> {
        let api_key = self.api_key.as_deref().context("GENAI_API_KEY is required")?;
        let mut headers = HeaderMap::new();
        headers.insert("x-goog-api-key", HeaderValue::from_str(api_key)?);

        let res = self
            .http
            .post(self.url())
            .headers(headers)
            .json(&req)
            .send()
            .await
            .context("Gemini request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read Gemini response body")?;
        Self::parse_response(status, text)
    }

    fn parse_response(
        status: StatusCode,
        text: String,
    ) -> anyhow::Result<(serde_json::Value, GenerateContentResponse)> {
        if !status.is_success() {
            let raw_response_json = serde_json::from_str::<serde_json::Value>(&text).ok();
            return Err(LlmDiagnosticsError {
                provider: Provider::Gemini,
                stage: "http",
                detail: format!("status={status}"),
                raw_output: Some(text),
                raw_response_json,
            }
            .into());
        }

        let raw_json = serde_json::from_str::<serde_json::Value>(&text)
            .with_context(|| format!("failed to parse Gemini response JSON: {text}"))?;
        let parsed = serde_json::from_value::<GenerateContentResponse>(raw_json.clone())
            .context("failed to decode Gemini response into GenerateContentResponse")?;
        Ok((raw_json, parsed))
    }

    fn hit_max_tokens(res: &GenerateContentResponse) -> bool {
        res.candidates
            .first()
            .and_then(|c| c.finish_reason.as_deref())
            == Some("MAX_TOKENS")
    }

    /// Text parts of the first candidate, joined with newlines.
    fn response_text(
        res: &GenerateContentResponse,
        raw_json: &serde_json::Value,
    ) -> anyhow::Result<String> {
        let Some(candidate) = res.candidates.first() else {
            let detail = match res
                .prompt_feedback
                .as_ref()
                .and_then(|f| f.block_reason.as_deref())
            {
                Some(reason) => format!("prompt blocked: {reason}"),
                None => "no candidates returned".to_string(),
            };
            return Err(LlmDiagnosticsError {
                provider: Provider::Gemini,
                stage: "empty_response",
                detail,
                raw_output: None,
                raw_response_json: Some(raw_json.clone()),
            }
            .into());
        };

        let mut out = String::new();
        for part in candidate.content.iter().flat_map(|c| c.parts.iter()) {
            if let Some(text) = &part.text {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(text);
            }
        }
        Ok(out)
    }
}

#[async_trait::async_trait]
impl LlmClient for GeminiClient {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        let req = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: self.max_output_tokens,
            },
        };

        let (raw_json, res) = self.generate_content(req).await?;

        if Self::hit_max_tokens(&res) {
            tracing::warn!(
                model = %self.model,
                max_output_tokens = self.max_output_tokens,
                "Gemini finishReason=MAX_TOKENS; completion is likely truncated"
            );
        }

        Self::response_text(&res, &raw_json)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Clone, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,

    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,

    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Clone, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_generate_content_request() {
        let req = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: "hello" }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: 500,
            },
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "contents": [{"role": "user", "parts": [{"text": "hello"}]}],
                "generationConfig": {"maxOutputTokens": 500},
            })
        );
    }

    #[test]
    fn joins_text_parts_of_first_candidate() {
        let raw = json!({
            "candidates": [
                {
                    "content": {"role": "model", "parts": [{"text": "```json\n{"}, {"text": "}\n```"}]},
                    "finishReason": "STOP"
                },
                {"content": {"parts": [{"text": "ignored"}]}}
            ]
        });
        let res: GenerateContentResponse = serde_json::from_value(raw.clone()).unwrap();
        let text = GeminiClient::response_text(&res, &raw).unwrap();
        assert_eq!(text, "```json\n{\n}\n```");
    }

    #[test]
    fn blocked_prompt_is_a_diagnostics_error() {
        let raw = json!({"promptFeedback": {"blockReason": "SAFETY"}});
        let res: GenerateContentResponse = serde_json::from_value(raw.clone()).unwrap();
        let err = GeminiClient::response_text(&res, &raw).unwrap_err();
        let diag = err.downcast_ref::<LlmDiagnosticsError>().unwrap();
        assert_eq!(diag.stage, "empty_response");
        assert_eq!(diag.detail, "prompt blocked: SAFETY");
    }

    #[test]
    fn non_success_status_keeps_raw_body_for_diagnostics() {
        let body = json!({"error": {"code": 503, "message": "The model is overloaded."}});
        let err = GeminiClient::parse_response(StatusCode::SERVICE_UNAVAILABLE, body.to_string())
            .unwrap_err();
        let diag = err.downcast_ref::<LlmDiagnosticsError>().unwrap();
        assert_eq!(diag.stage, "http");
        assert_eq!(diag.detail, "status=503 Service Unavailable");
        assert_eq!(diag.raw_output.as_deref(), Some(body.to_string().as_str()));
        assert_eq!(diag.raw_response_json, Some(body));
    }

    #[test]
    fn non_json_error_body_has_no_raw_json() {
        let err = GeminiClient::parse_response(StatusCode::BAD_GATEWAY, "<html>".to_string())
            .unwrap_err();
        let diag = err.downcast_ref::<LlmDiagnosticsError>().unwrap();
        assert_eq!(diag.raw_output.as_deref(), Some("<html>"));
        assert!(diag.raw_response_json.is_none());
    }

    #[test]
    fn undecodable_success_body_is_an_error() {
        let err = GeminiClient::parse_response(StatusCode::OK, "not json".to_string()).unwrap_err();
        assert!(err.to_string().contains("failed to parse Gemini response JSON"));
        assert!(err.downcast_ref::<LlmDiagnosticsError>().is_none());
    }

    #[test]
    fn detects_max_tokens_finish_reason() {
        let truncated = json!({
            "candidates": [{"content": {"parts": [{"text": "{\"sentiment\""}]}, "finishReason": "MAX_TOKENS"}]
        });
        let (_, res) = GeminiClient::parse_response(StatusCode::OK, truncated.to_string()).unwrap();
        assert!(GeminiClient::hit_max_tokens(&res));

        let complete = json!({
            "candidates": [{"content": {"parts": [{"text": "{}"}]}, "finishReason": "STOP"}]
        });
        let (_, res) = GeminiClient::parse_response(StatusCode::OK, complete.to_string()).unwrap();
        assert!(!GeminiClient::hit_max_tokens(&res));
    }

    #[test]
    fn builds_model_url() {
        let settings = Settings {
            genai_base_url: "https://example.test/".to_string(),
            genai_model: "gemini-1.5-flash".to_string(),
            ..Settings::default()
        };
        let client = GeminiClient::from_settings(&settings).unwrap();
        assert_eq!(
            client.url(),
            "https://example.test/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[tokio::test]
    async fn missing_api_key_fails_before_any_request() {
        let client = GeminiClient::from_settings(&Settings::default()).unwrap();
        let err = client.complete("prompt").await.unwrap_err();
        assert!(err.to_string().contains("GENAI_API_KEY"));
    }
}
