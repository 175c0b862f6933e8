// Registration Analytics - Web Server
// JSON API over the analytics facade (dashboard results are cached per filter)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use anyhow::Context;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use registration_analytics::filter::FilterParams;
use registration_analytics::{
    setup_tracing, AnalyticsError, AnalyticsFacade, AppConfig, CacheStats, CachedAnalytics,
    Dashboard, FactFilter, GrowthKind, Insight, KpiSet, Leaderboard, LogFormat, MarketShareSnapshot,
    SeriesDetail, SeriesKey, SqliteFactStore, StoreDomain, SummaryRow, TrendPoint, VehicleCategory,
    VERSION,
};

/// Shared application state
#[derive(Clone)]
struct AppState {
    analytics: Arc<CachedAnalytics<SqliteFactStore>>,
    window_months: u32,
}

impl AppState {
    fn facade(&self) -> &AnalyticsFacade<SqliteFactStore> {
        self.analytics.facade()
    }

    fn resolve(&self, params: &FilterParams) -> Result<FactFilter, ApiError> {
        let domain = self.facade().domain()?;
        Ok(params.resolve(&domain, self.window_months)?)
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn failed(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// SQLite calls block; run them on the blocking pool, not the async workers
async fn blocking<T, F>(state: AppState, query: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&AppState) -> Result<T, ApiError> + Send + 'static,
{
    let data = tokio::task::spawn_blocking(move || query(&state))
        .await
        .map_err(|e| ApiError(AnalyticsError::StoreUnavailable(format!("query task failed: {}", e))))??;
    Ok(Json(ApiResponse::ok(data)))
}

/// Bad filters are the caller's fault (400); everything else is ours (500)
struct ApiError(AnalyticsError);

impl From<AnalyticsError> for ApiError {
    fn from(e: AnalyticsError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            error!(error = %self.0, "request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, Json(ApiResponse::failed(self.0.to_string()))).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct LeaderboardQuery {
    #[serde(default = "default_kind")]
    kind: GrowthKind,
    #[serde(flatten)]
    filter: FilterParams,
}

fn default_kind() -> GrowthKind {
    GrowthKind::YoY
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    fact_set_version: u64,
    cache: CacheStats,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check(State(state): State<AppState>) -> ApiResult<HealthResponse> {
    blocking(state, |state| {
        Ok(HealthResponse {
            status: "OK",
            version: VERSION,
            fact_set_version: state.facade().version()?,
            cache: state.analytics.cache_stats(),
        })
    })
    .await
}

/// GET /api/domain - Months, categories and manufacturers present in the store
async fn get_domain(State(state): State<AppState>) -> ApiResult<StoreDomain> {
    blocking(state, |state| Ok(state.facade().domain()?)).await
}

/// GET /api/dashboard - Every query for one filter (cached)
async fn get_dashboard(State(state): State<AppState>, Query(params): Query<FilterParams>) -> ApiResult<Arc<Dashboard>> {
    blocking(state, move |state| {
        let filter = state.resolve(&params)?;
        Ok(state.analytics.dashboard(&filter)?)
    })
    .await
}

/// GET /api/kpis
async fn get_kpis(State(state): State<AppState>, Query(params): Query<FilterParams>) -> ApiResult<KpiSet> {
    blocking(state, move |state| {
        let filter = state.resolve(&params)?;
        Ok(state.facade().kpis(&filter)?)
    })
    .await
}

/// GET /api/trends - Monthly totals per category
async fn get_trends(State(state): State<AppState>, Query(params): Query<FilterParams>) -> ApiResult<Vec<TrendPoint>> {
    blocking(state, move |state| {
        let filter = state.resolve(&params)?;
        Ok(state.facade().trend_series(&filter)?)
    })
    .await
}

/// GET /api/market-share - Latest-month share within each category
async fn get_market_share(State(state): State<AppState>, Query(params): Query<FilterParams>) -> ApiResult<MarketShareSnapshot> {
    blocking(state, move |state| {
        let filter = state.resolve(&params)?;
        Ok(state.facade().market_share(&filter)?)
    })
    .await
}

/// GET /api/leaderboard?kind=yoy|qoq
async fn get_leaderboard(State(state): State<AppState>, Query(query): Query<LeaderboardQuery>) -> ApiResult<Leaderboard> {
    let LeaderboardQuery { kind, filter: params } = query;
    blocking(state, move |state| {
        let filter = state.resolve(&params)?;
        Ok(state.facade().leaderboard(&filter, kind)?)
    })
    .await
}

/// GET /api/summary - One row per manufacturer
async fn get_summary(State(state): State<AppState>, Query(params): Query<FilterParams>) -> ApiResult<Vec<SummaryRow>> {
    blocking(state, move |state| {
        let filter = state.resolve(&params)?;
        Ok(state.facade().summary_table(&filter)?)
    })
    .await
}

/// GET /api/insights
async fn get_insights(State(state): State<AppState>, Query(params): Query<FilterParams>) -> ApiResult<Vec<Insight>> {
    blocking(state, move |state| {
        let filter = state.resolve(&params)?;
        Ok(state.facade().insights(&filter)?)
    })
    .await
}

/// GET /api/series/:category/:manufacturer - Aligned observations for one series
async fn get_series(
    State(state): State<AppState>,
    Path((category, manufacturer)): Path<(String, String)>,
    Query(params): Query<FilterParams>,
) -> ApiResult<SeriesDetail> {
    // Decode URL-encoded manufacturer ("Hero%20MotoCorp")
    let manufacturer = urlencoding::decode(&manufacturer)
        .unwrap_or_else(|_| manufacturer.clone().into())
        .into_owned();

    let category: VehicleCategory = category
        .parse()
        .map_err(|e| ApiError(AnalyticsError::InvalidFilter(format!("{}", e))))?;

    let series = SeriesKey::new(category, manufacturer);
    blocking(state, move |state| {
        let filter = state.resolve(&params)?;
        Ok(state.facade().series_detail(&series, &filter)?)
    })
    .await
}

fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/domain", get(get_domain))
        .route("/dashboard", get(get_dashboard))
        .route("/kpis", get(get_kpis))
        .route("/trends", get(get_trends))
        .route("/market-share", get(get_market_share))
        .route("/leaderboard", get(get_leaderboard))
        .route("/summary", get(get_summary))
        .route("/insights", get(get_insights))
        .route("/series/:category/:manufacturer", get(get_series))
        .with_state(state);

    Router::new().nest("/api", api_routes).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    )
}

// ============================================================================
// Main Server
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "regstats-server", version, about = "Vehicle registration analytics API")]
struct ServerArgs {
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SQLite database, overrides the config file
    #[arg(long)]
    db: Option<PathBuf>,

    #[arg(long)]
    port: Option<u16>,

    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ServerArgs::parse();

    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(db) = args.db {
        config.database.path = db;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    setup_tracing(&config.logging.level, args.log_format.unwrap_or(config.logging.format));

    println!("🌐 Registration Analytics - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let db_path = &config.database.path;
    if !db_path.exists() {
        eprintln!("❌ Database not found at {:?}", db_path);
        eprintln!("   Run: regstats generate --import");
        eprintln!("   to load registrations first.");
        std::process::exit(1);
    }

    let store = SqliteFactStore::open(db_path)
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    println!("✓ Database opened: {:?} ({} facts)", db_path, store.count()?);

    let state = AppState {
        analytics: Arc::new(CachedAnalytics::new(AnalyticsFacade::with_options(
            store,
            config.analytics_options(),
        ))),
        window_months: config.analytics.default_window_months,
    };

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!(%addr, "listening");
    println!("\n🚀 Server running on http://{}", addr);
    println!("   API: http://{}/api/dashboard", addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, router(state))
        .await
        .context("Server stopped unexpectedly")?;

    Ok(())
}
