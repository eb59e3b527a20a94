pub mod analysis;
pub mod domain;
pub mod llm;
pub mod news;

pub mod config {
    pub const DEFAULT_SECTOR: &str = "technology";
    pub const DEFAULT_NEWS_BASE_URL: &str = "https://newsapi.org/v2/everything";
    pub const DEFAULT_NEWS_LANGUAGE: &str = "en";
    pub const DEFAULT_NEWS_PAGE_SIZE: u32 = 5;
    pub const DEFAULT_NEWS_TIMEOUT_SECS: u64 = 30;
    pub const DEFAULT_GENAI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
    pub const DEFAULT_GENAI_MODEL: &str = "gemini-1.5-pro";
    pub const DEFAULT_GENAI_MAX_OUTPUT_TOKENS: u32 = 1024;
    pub const DEFAULT_GENAI_TIMEOUT_SECS: u64 = 60;
    pub const DEFAULT_PORT: u16 = 3000;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub news_api_key: Option<String>,
        pub news_api_base_url: String,
        pub news_language: String,
        pub news_page_size: u32,
        pub news_timeout_secs: u64,
        pub genai_api_key: Option<String>,
        pub genai_base_url: String,
        pub genai_model: String,
        pub genai_max_output_tokens: u32,
        pub genai_timeout_secs: u64,
        pub analysis_sector: String,
        pub port: u16,
        pub sentry_dsn: Option<String>,
    }

    impl Default for Settings {
        fn default() -> Self {
            Self {
                news_api_key: None,
                news_api_base_url: DEFAULT_NEWS_BASE_URL.to_string(),
                news_language: DEFAULT_NEWS_LANGUAGE.to_string(),
                news_page_size: DEFAULT_NEWS_PAGE_SIZE,
                news_timeout_secs: DEFAULT_NEWS_TIMEOUT_SECS,
                genai_api_key: None,
                genai_base_url: DEFAULT_GENAI_BASE_URL.to_string(),
                genai_model: DEFAULT_GENAI_MODEL.to_string(),
                genai_max_output_tokens: DEFAULT_GENAI_MAX_OUTPUT_TOKENS,
                genai_timeout_secs: DEFAULT_GENAI_TIMEOUT_SECS,
                analysis_sector: DEFAULT_SECTOR.to_string(),
                port: DEFAULT_PORT,
                sentry_dsn: None,
            }
        }
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let defaults = Self::default();
            Ok(Self {
                news_api_key: non_empty_var("NEWS_API_KEY"),
                news_api_base_url: non_empty_var("NEWS_API_BASE_URL")
                    .unwrap_or(defaults.news_api_base_url),
                news_language: non_empty_var("NEWS_LANGUAGE").unwrap_or(defaults.news_language),
                news_page_size: parsed_var("NEWS_PAGE_SIZE").unwrap_or(defaults.news_page_size),
                news_timeout_secs: parsed_var("NEWS_TIMEOUT_SECS")
                    .unwrap_or(defaults.news_timeout_secs),
                genai_api_key: non_empty_var("GENAI_API_KEY"),
                genai_base_url: non_empty_var("GENAI_BASE_URL").unwrap_or(defaults.genai_base_url),
                genai_model: non_empty_var("GENAI_MODEL").unwrap_or(defaults.genai_model),
                genai_max_output_tokens: parsed_var("GENAI_MAX_OUTPUT_TOKENS")
                    .unwrap_or(defaults.genai_max_output_tokens),
                genai_timeout_secs: parsed_var("GENAI_TIMEOUT_SECS")
                    .unwrap_or(defaults.genai_timeout_secs),
                analysis_sector: non_empty_var("ANALYSIS_SECTOR")
                    .unwrap_or(defaults.analysis_sector),
                port: parsed_var("PORT").unwrap_or(defaults.port),
                sentry_dsn: non_empty_var("SENTRY_DSN"),
            })
        }

        /// Missing keys are reported, not enforced: the affected collaborator fails per call.
        pub fn warn_missing_keys(&self) {
            if self.news_api_key.is_none() {
                tracing::warn!("NEWS_API_KEY is not set; news fetches will return no articles");
            }
            if self.genai_api_key.is_none() {
                tracing::warn!("GENAI_API_KEY is not set; analyses will use the fallback payload");
            }
        }
    }

    fn non_empty_var(key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|s| !s.trim().is_empty())
    }

    fn parsed_var<T: std::str::FromStr>(key: &str) -> Option<T> {
        std::env::var(key).ok().and_then(|s| s.trim().parse::<T>().ok())
    }

}
