pub mod newsapi;
pub mod types;

use crate::config::Settings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsQuery {
    pub query: String,
    pub language: String,
    pub page_size: u32,
}

impl NewsQuery {
    pub fn for_sector(sector: &str, settings: &Settings) -> Self {
        Self {
            query: format!("Donald Trump {sector}"),
            language: settings.news_language.clone(),
            page_size: settings.news_page_size,
        }
    }
}

#[async_trait::async_trait]
pub trait NewsFetcher: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// Concatenated `Title:`/`Description:` blocks, or an empty string on any failure.
    async fn fetch_articles(&self, query: &NewsQuery) -> String;
}
