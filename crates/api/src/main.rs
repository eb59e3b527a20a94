use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sectorpulse_core::analysis::Analyzer;
use sectorpulse_core::domain::analysis::{AnalysisResponse, ErrorResponse};
use sectorpulse_core::llm::gemini::GeminiClient;
use sectorpulse_core::news::newsapi::NewsApiClient;

const INDEX_HTML: &str = include_str!("../static/index.html");
const SCRIPT_JS: &str = include_str!("../static/script.js");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = sectorpulse_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    settings.warn_missing_keys();

    let news = NewsApiClient::from_settings(&settings)?;
    let llm = GeminiClient::from_settings(&settings)?;
    let state = AppState {
        sector: settings.analysis_sector.clone(),
        analyzer: Arc::new(Analyzer::new(
            Arc::new(news),
            Arc::new(llm),
            settings.clone(),
        )),
    };

    let app = router(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], settings.port));

    tracing::info!(%addr, sector = %settings.analysis_sector, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

#[derive(Debug, Clone)]
struct AppState {
    analyzer: Arc<Analyzer>,
    sector: String,
}

fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(index))
        .route("/static/script.js", get(script))
        .route("/healthz", get(healthz))
        .route("/analyze", post(analyze))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        SCRIPT_JS,
    )
}

/// The request body is ignored; the sector comes from configuration.
async fn analyze(
    State(state): State<AppState>,
) -> Result<Json<AnalysisResponse>, (StatusCode, Json<ErrorResponse>)> {
    let sector = state.sector.as_str();
    match state.analyzer.analyze(sector).await {
        Ok(result) => Ok(Json(AnalysisResponse::from_result(sector, &result))),
        Err(e) => {
            let err = anyhow::Error::new(e.clone());
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(%sector, error = %err, "analysis failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            ))
        }
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
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
