use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Keys the prompt asks the model to emit, in schema order.
pub const EXPECTED_FIELDS: [&str; 8] = [
    "sentiment",
    "whySentiment",
    "shortTermOutlook",
    "whyShortTermOutlook",
    "longTermOutlook",
    "whyLongTermOutlook",
    "stocksAffected",
    "newsSummary",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentiment {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outlook {
    Up,
    Down,
    Consolidate,
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sentiment::Bullish => write!(f, "Bullish"),
            Sentiment::Bearish => write!(f, "Bearish"),
            Sentiment::Neutral => write!(f, "Neutral"),
        }
    }
}

impl fmt::Display for Outlook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outlook::Up => write!(f, "Up"),
            Outlook::Down => write!(f, "Down"),
            Outlook::Consolidate => write!(f, "Consolidate"),
        }
    }
}

impl FromStr for Sentiment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bullish" => Ok(Sentiment::Bullish),
            "bearish" => Ok(Sentiment::Bearish),
            "neutral" => Ok(Sentiment::Neutral),
            other => anyhow::bail!("unknown sentiment: {other}"),
        }
    }
}

impl FromStr for Outlook {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(Outlook::Up),
            "down" => Ok(Outlook::Down),
            "consolidate" => Ok(Outlook::Consolidate),
            other => anyhow::bail!("unknown outlook: {other}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub ticker: String,
    pub movement: String,
}

/// Fully-populated analysis. Only the fallback payload is built this way; model
/// output is kept as raw JSON in [`AnalysisResult`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    pub sentiment: Sentiment,
    pub why_sentiment: String,
    pub short_term_outlook: Outlook,
    pub why_short_term_outlook: String,
    pub long_term_outlook: Outlook,
    pub why_long_term_outlook: String,
    pub stocks_affected: Vec<StockMovement>,
    pub news_summary: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSource {
    Model,
    Fallback,
}

/// A normalized analysis: either the model's JSON object exactly as parsed, or the
/// fallback payload.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    fields: Map<String, Value>,
    source: ResultSource,
}

impl AnalysisResult {
    pub fn from_model(fields: Map<String, Value>) -> Self {
        Self {
            fields,
            source: ResultSource::Model,
        }
    }

    pub fn from_analysis(analysis: &Analysis, source: ResultSource) -> Self {
        let stocks = analysis
            .stocks_affected
            .iter()
            .map(|s| {
                let mut m = Map::new();
                m.insert("ticker".to_string(), Value::String(s.ticker.clone()));
                m.insert("movement".to_string(), Value::String(s.movement.clone()));
                Value::Object(m)
            })
            .collect();

        let mut fields = Map::new();
        let mut put = |k: &str, v: Value| {
            fields.insert(k.to_string(), v);
        };
        put("sentiment", Value::String(analysis.sentiment.to_string()));
        put("whySentiment", Value::String(analysis.why_sentiment.clone()));
        put(
            "shortTermOutlook",
            Value::String(analysis.short_term_outlook.to_string()),
        );
        put(
            "whyShortTermOutlook",
            Value::String(analysis.why_short_term_outlook.clone()),
        );
        put(
            "longTermOutlook",
            Value::String(analysis.long_term_outlook.to_string()),
        );
        put(
            "whyLongTermOutlook",
            Value::String(analysis.why_long_term_outlook.clone()),
        );
        put("stocksAffected", Value::Array(stocks));
        put("newsSummary", Value::String(analysis.news_summary.clone()));

        Self { fields, source }
    }

    pub fn source(&self) -> ResultSource {
        self.source
    }

    pub fn is_fallback(&self) -> bool {
        self.source == ResultSource::Fallback
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.fields
    }

    /// Value of `name`, or `null` when the model omitted it.
    pub fn field(&self, name: &str) -> Value {
        self.fields.get(name).cloned().unwrap_or(Value::Null)
    }

    pub fn sentiment(&self) -> Option<Sentiment> {
        self.fields
            .get("sentiment")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
    }

    /// Entries of `stocksAffected` that have the expected shape; malformed entries are skipped.
    pub fn stocks_affected(&self) -> Vec<StockMovement> {
        self.fields
            .get("stocksAffected")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| serde_json::from_value::<StockMovement>(v.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn missing_fields(&self) -> Vec<&'static str> {
        EXPECTED_FIELDS
            .iter()
            .copied()
            .filter(|k| self.fields.get(*k).map_or(true, Value::is_null))
            .collect()
    }
}

/// The fixed substitute result. `_sector` is accepted but does not vary the content yet.
pub fn fallback(_sector: &str) -> AnalysisResult {
    let analysis = Analysis {
        sentiment: Sentiment::Neutral,
        why_sentiment: "The model response could not be analyzed, so no directional view is given."
            .to_string(),
        short_term_outlook: Outlook::Consolidate,
        why_short_term_outlook: "Without a usable analysis the short-term outlook defaults to consolidation."
            .to_string(),
        long_term_outlook: Outlook::Consolidate,
        why_long_term_outlook: "Without a usable analysis the long-term outlook defaults to consolidation."
            .to_string(),
        stocks_affected: vec![
            StockMovement {
                ticker: "AAPL".to_string(),
                movement: "Consolidate".to_string(),
            },
            StockMovement {
                ticker: "MSFT".to_string(),
                movement: "Consolidate".to_string(),
            },
            StockMovement {
                ticker: "NVDA".to_string(),
                movement: "Consolidate".to_string(),
            },
            StockMovement {
                ticker: "GOOGL".to_string(),
                movement: "Consolidate".to_string(),
            },
        ],
        news_summary: "Analysis is temporarily unavailable. Recent news could not be summarized; please try again later."
            .to_string(),
    };
    AnalysisResult::from_analysis(&analysis, ResultSource::Fallback)
}

/// HTTP body for a completed analysis. Fields the model omitted serialize as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub sector: String,
    pub sentiment: Value,
    pub why_sentiment: Value,
    pub short_term_outlook: Value,
    pub why_short_term_outlook: Value,
    pub long_term_outlook: Value,
    pub why_long_term_outlook: Value,
    pub stocks_affected: Value,
    pub news_summary: Value,
}

impl AnalysisResponse {
    pub fn from_result(sector: &str, result: &AnalysisResult) -> Self {
        Self {
            sector: sector.to_string(),
            sentiment: result.field("sentiment"),
            why_sentiment: result.field("whySentiment"),
            short_term_outlook: result.field("shortTermOutlook"),
            why_short_term_outlook: result.field("whyShortTermOutlook"),
            long_term_outlook: result.field("longTermOutlook"),
            why_long_term_outlook: result.field("whyLongTermOutlook"),
            stocks_affected: result.field("stocksAffected"),
            news_summary: result.field("newsSummary"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
