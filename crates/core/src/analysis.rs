use crate::config::Settings;
use crate::domain::analysis::{fallback, AnalysisResult};
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::{json, prompt, LlmClient};
use crate::news::{NewsFetcher, NewsQuery};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalyzeError {
    NoNews { sector: String },
}

impl fmt::Display for AnalyzeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalyzeError::NoNews { sector } => {
                write!(f, "could not fetch news articles for the {sector} sector")
            }
        }
    }
}

impl std::error::Error for AnalyzeError {}

/// News fetch, prompt, completion and normalization for one sector.
#[derive(Clone)]
pub struct Analyzer {
    news: Arc<dyn NewsFetcher>,
    llm: Arc<dyn LlmClient>,
    settings: Settings,
}

impl fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Analyzer")
            .field("news", &self.news.provider_name())
            .field("llm", &self.llm.provider())
            .finish()
    }
}

impl Analyzer {
    pub fn new(news: Arc<dyn NewsFetcher>, llm: Arc<dyn LlmClient>, settings: Settings) -> Self {
        Self {
            news,
            llm,
            settings,
        }
    }

    async fn fetch_news(&self, sector: &str) -> Result<String, AnalyzeError> {
        let query = NewsQuery::for_sector(sector, &self.settings);
        let articles = self.news.fetch_articles(&query).await;
        if articles.trim().is_empty() {
            return Err(AnalyzeError::NoNews {
                sector: sector.to_string(),
            });
        }
        Ok(articles)
    }

    /// The prompt that [`Analyzer::analyze`] would send, without calling the model.
    pub async fn render_prompt(&self, sector: &str) -> Result<String, AnalyzeError> {
        let articles = self.fetch_news(sector).await?;
        Ok(prompt::build_prompt(&articles, sector))
    }

    /// Fails only when no news is available, in which case the model is not called.
    /// Model failures and malformed completions both yield the fallback payload.
    pub async fn analyze(&self, sector: &str) -> Result<AnalysisResult, AnalyzeError> {
        let articles = self.fetch_news(sector).await?;
        let prompt = prompt::build_prompt(&articles, sector);

        let result = match self.llm.complete(&prompt).await {
            Ok(text) => json::normalize(&text, sector),
            Err(err) => {
                if let Some(diag) = err.downcast_ref::<LlmDiagnosticsError>() {
                    tracing::debug!(
                        stage = diag.stage,
                        raw_output = diag.raw_output.as_deref().unwrap_or(""),
                        "model call diagnostics"
                    );
                }
                tracing::error!(
                    %sector,
                    provider = ?self.llm.provider(),
                    error = %format!("{err:#}"),
                    "model call failed; using fallback"
                );
                fallback(sector)
            }
        };

        if result.is_fallback() {
            tracing::warn!(%sector, "returning fallback analysis");
        } else {
            let missing = result.missing_fields();
            if !missing.is_empty() {
                tracing::warn!(%sector, ?missing, "model analysis is missing fields");
            }
            tracing::info!(
                %sector,
                sentiment = ?result.sentiment(),
                stocks = result.stocks_affected().len(),
                "analysis complete"
            );
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Provider;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct StaticNews(&'static str);

    #[async_trait::async_trait]
    impl NewsFetcher for StaticNews {
        fn provider_name(&self) -> &'static str {
            "static"
        }

        async fn fetch_articles(&self, _query: &NewsQuery) -> String {
            self.0.to_string()
        }
    }

    #[derive(Default)]
    struct RecordingLlm {
        reply: Option<String>,
        calls: AtomicUsize,
        last_prompt: Mutex<Option<String>>,
    }

    #[async_trait::async_trait]
    impl LlmClient for RecordingLlm {
        fn provider(&self) -> Provider {
            Provider::Gemini
        }

        async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
            match &self.reply {
                Some(r) => Ok(r.clone()),
                None => Err(LlmDiagnosticsError {
                    provider: Provider::Gemini,
                    stage: "http",
                    detail: "status=503 Service Unavailable".to_string(),
                    raw_output: Some("overloaded".to_string()),
                    raw_response_json: None,
                }
                .into()),
            }
        }
    }

    fn analyzer(news: &'static str, llm: Arc<RecordingLlm>) -> Analyzer {
        Analyzer::new(Arc::new(StaticNews(news)), llm, Settings::default())
    }

    #[tokio::test]
    async fn empty_news_skips_the_model() {
        let llm = Arc::new(RecordingLlm::default());
        let err = analyzer("  ", llm.clone())
            .analyze("technology")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            AnalyzeError::NoNews {
                sector: "technology".to_string()
            }
        );
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn model_failure_uses_fallback() {
        let llm = Arc::new(RecordingLlm::default());
        let result = analyzer("Title: a\nDescription: b", llm.clone())
            .analyze("technology")
            .await
            .unwrap();
        assert_eq!(result, fallback("technology"));
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fenced_completion_is_normalized() {
        let body = json!({"sentiment": "Bearish", "newsSummary": "s"});
        let llm = Arc::new(RecordingLlm {
            reply: Some(format!("```json\n{body}\n```")),
            ..Default::default()
        });
        let result = analyzer("Title: a\nDescription: b", llm.clone())
            .analyze("energy")
            .await
            .unwrap();
        assert!(!result.is_fallback());
        assert_eq!(Value::Object(result.into_map()), body);

        let prompt = llm.last_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.contains("Title: a\nDescription: b"));
        assert!(prompt.contains("energy sector"));
    }

    #[tokio::test]
    async fn render_prompt_does_not_call_the_model() {
        let llm = Arc::new(RecordingLlm::default());
        let prompt = analyzer("Title: a\nDescription: b", llm.clone())
            .render_prompt("technology")
            .await
            .unwrap();
        assert_eq!(prompt, prompt::build_prompt("Title: a\nDescription: b", "technology"));
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }
}
