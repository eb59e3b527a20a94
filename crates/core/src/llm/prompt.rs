/// Literal skeleton the model is asked to fill in.
pub fn schema_skeleton() -> String {
    [
        "{",
        "  \"sentiment\": \"Bullish | Bearish | Neutral\",",
        "  \"whySentiment\": \"one or two sentences\",",
        "  \"shortTermOutlook\": \"Up | Down | Consolidate\",",
        "  \"whyShortTermOutlook\": \"one or two sentences\",",
        "  \"longTermOutlook\": \"Up | Down | Consolidate\",",
        "  \"whyLongTermOutlook\": \"one or two sentences\",",
        "  \"stocksAffected\": [",
        "    {\"ticker\": \"AAPL\", \"movement\": \"Up\"},",
        "    {\"ticker\": \"GOOG\", \"movement\": \"Consolidate\"},",
        "    {\"ticker\": \"MSFT\", \"movement\": \"Down\"},",
        "    {\"ticker\": \"NVDA\", \"movement\": \"Up\"}",
        "  ],",
        "  \"newsSummary\": \"one paragraph\"",
        "}",
    ]
    .join("\n")
}

/// Renders the analysis prompt. `articles` and `sector` are embedded verbatim.
pub fn build_prompt(articles: &str, sector: &str) -> String {
    let schema = schema_skeleton();
    format!(
        "Analyze the following news articles about Donald Trump's recent actions and their impact on the {sector} sector.\n\n\
NEWS ARTICLES:\n{articles}\n\n\
Based on this, provide:\n\
1. Investor Sentiment (Bullish, Bearish, or Neutral) and why.\n\
2. Short-Term Market Outlook (Up, Down, or Consolidate) and why.\n\
3. Long-Term Market Outlook (Up, Down, or Consolidate) and why.\n\
4. Four popular stocks in the {sector} sector that might be affected, each with its predicted short-term movement (Up, Down, or Consolidate).\n\
5. A concise, paragraph-long summary suitable for a financial news report.\n\n\
Respond with ONLY a single JSON object matching this schema:\n{schema}\n\n\
Rules:\n\
- Output the JSON object and nothing else.\n\
- Do NOT wrap the JSON in markdown, code fences, backticks, or any other delimiters.\n\
- stocksAffected must have exactly 4 entries.\n\
- Use double quotes for all JSON strings. No comments. No trailing commas."
    )
}
