pub mod error;
pub mod gemini;
pub mod json;
pub mod prompt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gemini,
}

#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    fn provider(&self) -> Provider;

    /// Raw completion text for `prompt`.
    async fn complete(&self, prompt: &str) -> anyhow::Result<String>;
}
