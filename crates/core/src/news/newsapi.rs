use crate::config::Settings;
use crate::news::types::{Article, EverythingResponse};
use crate::news::{NewsFetcher, NewsQuery};
use anyhow::{Context, Result};
use reqwest::StatusCode;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct NewsApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl NewsApiClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.news_timeout_secs))
            .build()
            .context("failed to build news http client")?;

        Ok(Self {
            http,
            base_url: settings.news_api_base_url.clone(),
            api_key: settings.news_api_key.clone(),
        })
    }

    async fn fetch_once(&self, query: &NewsQuery) -> Result<EverythingResponse> {
        let api_key = self.api_key.as_deref().context("NEWS_API_KEY is required")?;
        let page_size = query.page_size.to_string();

        let res = self
            .http
            .get(&self.base_url)
            .query(&[
                ("q", query.query.as_str()),
                ("language", query.language.as_str()),
                ("pageSize", page_size.as_str()),
                ("apiKey", api_key),
                ("sortBy", "relevancy"),
            ])
            .send()
            .await
            .context("news request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read news response")?;
        parse_everything(status, &text)
    }
}

/// Decodes an `everything` response, treating non-2xx and `status != "ok"` as errors.
pub fn parse_everything(status: StatusCode, text: &str) -> Result<EverythingResponse> {
    if !status.is_success() {
        anyhow::bail!("news provider HTTP {status}: {text}");
    }

    let parsed = serde_json::from_str::<EverythingResponse>(text)
        .with_context(|| format!("news response is not valid JSON: {text}"))?;
    if parsed.status != "ok" {
        anyhow::bail!(
            "news provider returned status={} code={} message={}",
            parsed.status,
            parsed.code.as_deref().unwrap_or("-"),
            parsed.message.as_deref().unwrap_or("-")
        );
    }
    Ok(parsed)
}

#[async_trait::async_trait]
impl NewsFetcher for NewsApiClient {
    fn provider_name(&self) -> &'static str {
        "newsapi"
    }

    async fn fetch_articles(&self, query: &NewsQuery) -> String {
        match self.fetch_once(query).await {
            Ok(resp) => {
                let latest = resp.articles.iter().filter_map(Article::published_at_utc).max();
                tracing::debug!(
                    query = %query.query,
                    articles = resp.articles.len(),
                    total_results = ?resp.total_results,
                    ?latest,
                    "fetched news articles"
                );
                combine_articles(&resp.articles)
            }
            Err(err) => {
                tracing::warn!(query = %query.query, error = %err, "news fetch failed");
                String::new()
            }
        }
    }
}

/// Joins articles that have both a title and a description into blank-line separated blocks.
pub fn combine_articles(articles: &[Article]) -> String {
    articles
        .iter()
        .filter_map(|a| {
            let title = a.title.as_deref().filter(|s| !s.is_empty())?;
            let description = a.description.as_deref().filter(|s| !s.is_empty())?;
            Some(format!("Title: {title}\nDescription: {description}"))
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
