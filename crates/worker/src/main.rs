use std::sync::Arc;

use clap::Parser;
use sectorpulse_core::analysis::Analyzer;
use sectorpulse_core::domain::analysis::AnalysisResponse;
use sectorpulse_core::llm::gemini::GeminiClient;
use sectorpulse_core::news::newsapi::NewsApiClient;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "sectorpulse_worker")]
struct Args {
    /// Sector to analyze. Defaults to ANALYSIS_SECTOR (or "technology").
    #[arg(long)]
    sector: Option<String>,

    /// Fetch news and print the rendered prompt without calling the model.
    #[arg(long)]
    dry_run: bool,

    /// Pretty-print the JSON result.
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = sectorpulse_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();
    settings.warn_missing_keys();

    let sector = args
        .sector
        .clone()
        .unwrap_or_else(|| settings.analysis_sector.clone());

    let analyzer = Analyzer::new(
        Arc::new(NewsApiClient::from_settings(&settings)?),
        Arc::new(GeminiClient::from_settings(&settings)?),
        settings,
    );

    if args.dry_run {
        let prompt = analyzer.render_prompt(&sector).await.map_err(|e| {
            let err = anyhow::Error::new(e);
            sentry_anyhow::capture_anyhow(&err);
            err
        })?;
        tracing::info!(%sector, dry_run = true, prompt_len = prompt.len(), "rendered prompt");
        println!("{prompt}");
        return Ok(());
    }

    match analyzer.analyze(&sector).await {
        Ok(result) => {
            tracing::info!(%sector, fallback = result.is_fallback(), "analysis run finished");
            let body = AnalysisResponse::from_result(&sector, &result);
            let out = if args.pretty {
                serde_json::to_string_pretty(&body)?
            } else {
                serde_json::to_string(&body)?
            };
            println!("{out}");
            Ok(())
        }
        Err(e) => {
            let err = anyhow::Error::new(e);
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(%sector, error = %err, "analysis run failed");
            Err(err)
        }
    }
}

fn init_sentry(settings: &sectorpulse_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
