// Registration Analytics - Core Library
// Growth, market share and leaderboards over monthly vehicle registrations.
// Exposes all modules for use in CLI, API server, and tests

pub mod fact;
pub mod error;
pub mod filter;
pub mod store;
pub mod db;         // SQLite fact store, CSV import/export, import audit
pub mod growth;     // YoY / QoQ with explicit N/A and New outcomes
pub mod aligner;    // Baseline lookup per fact
pub mod aggregate;  // Totals and scoped market shares
pub mod ranking;    // Deterministic leaderboards
pub mod report;     // Output shapes served to the presentation layer
pub mod insights;   // Rule-based flags over computed aggregates
pub mod quality;    // Density and key checks
pub mod facade;
pub mod cache;
pub mod config;
pub mod generator;

// Re-export commonly used types
pub use fact::{
    ParseError, Quarter, RegistrationFact, SeriesKey, VehicleCategory, YearMonth, YearQuarter,
};
pub use error::{AnalyticsError, Result};
pub use filter::FactFilter;
pub use store::{FactStore, InMemoryFactStore, StoreDomain};
pub use db::{
    load_csv, setup_database, insert_facts, write_csv, verify_count,
    ImportEvent, ImportOutcome, InsertSummary, SqliteFactStore,
};
pub use growth::{growth, Growth, GrowthKind, GrowthMetric};
pub use aligner::{AlignedObservation, PeriodAligner, QuarterTotal, LOOKBACK_MONTHS};
pub use aggregate::{aggregate, share, GroupBy, GroupKey, ShareEntry};
pub use ranking::{rank, RankDirection, RankEntry, Ranked, Ranking};
pub use report::{
    CategoryMarketShare, CategorySummary, Dashboard, KpiSet, Leaderboard, MarketShareSnapshot,
    SeriesDetail, SeriesPoint, SummaryRow, TrendPoint,
};
pub use insights::{Insight, InsightKind, InsightThresholds};
pub use quality::{check_density, DensityReport, QualityIssue, Severity};
pub use facade::{AnalyticsFacade, AnalyticsOptions};
pub use cache::{CacheStats, CachedAnalytics, ResultCache};
pub use config::{AppConfig, LogFormat};
pub use generator::SyntheticGenerator;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the global tracing subscriber (text or JSON lines on stderr).
///
/// `RUST_LOG` wins over the configured level when set.
pub fn setup_tracing(level: &str, format: LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);

    // a second call (tests, embedded use) keeps the first subscriber
    let _ = match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init(),
    };
}
