// 🧭 Analytics Facade - every dashboard query for one filter
//
// Each query is a pure function of (filter, fact set):
//   1. validate the filter against the store domain
//   2. one store call for the window plus LOOKBACK_MONTHS of baselines
//   3. align, then derive KPIs / trend / shares / leaderboards / summary
//
// Facts before `date_from` are baselines only. Nothing is kept between
// calls; memoization lives in cache.rs.

use crate::aggregate::{self, GroupBy, GroupKey};
use crate::aligner::{AlignedObservation, PeriodAligner, LOOKBACK_MONTHS};
use crate::error::Result;
use crate::fact::{RegistrationFact, SeriesKey, VehicleCategory, YearMonth};
use crate::filter::FactFilter;
use crate::growth::{mean_defined, Growth, GrowthKind};
use crate::insights::{self, Insight, InsightThresholds};
use crate::quality::check_density;
use crate::ranking::{rank, RankDirection, RankEntry};
use crate::report::{
    CategoryMarketShare, CategorySummary, Dashboard, KpiSet, Leaderboard, MarketShareSnapshot,
    SeriesDetail, SeriesPoint, SummaryRow, TrendPoint,
};
use crate::store::{FactStore, StoreDomain};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsOptions {
    /// N for both leaders and laggards
    pub leaderboard_size: usize,

    /// Window volume a series needs before its growth is ranked
    pub min_leaderboard_registrations: u64,

    pub insights: InsightThresholds,
}

impl Default for AnalyticsOptions {
    fn default() -> Self {
        AnalyticsOptions {
            leaderboard_size: 10,
            min_leaderboard_registrations: 1000,
            insights: InsightThresholds::default(),
        }
    }
}

impl AnalyticsOptions {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.leaderboard_size == 0 {
            return Err("leaderboard_size must be at least 1".to_string());
        }
        self.insights.validate()
    }
}

// ============================================================================
// WINDOW ANALYSIS
// ============================================================================

struct SeriesStats<'a> {
    total: u64,
    latest: &'a AlignedObservation,
}

/// Facts inside the window, each aligned with its baselines.
/// Ordered by (month, category, manufacturer).
struct WindowAnalysis {
    filter: FactFilter,
    facts: Vec<RegistrationFact>,
    observations: Vec<AlignedObservation>,
}

impl WindowAnalysis {
    fn kpis(&self) -> KpiSet {
        let yoy: Vec<Growth> = self.observations.iter().map(|o| o.yoy_growth()).collect();
        let qoq: Vec<Growth> = self.observations.iter().map(|o| o.qoq_growth()).collect();
        let active: BTreeSet<SeriesKey> = self.facts.iter().map(|f| f.series_key()).collect();

        KpiSet {
            total_registrations: aggregate::total_registrations(&self.facts),
            avg_yoy_growth: mean_defined(&yoy),
            avg_qoq_growth: mean_defined(&qoq),
            active_manufacturers: active.len(),
        }
    }

    fn trend(&self) -> Vec<TrendPoint> {
        let mut by_month: BTreeMap<YearMonth, Vec<RegistrationFact>> = BTreeMap::new();
        for fact in &self.facts {
            by_month.entry(fact.month).or_default().push(fact.clone());
        }

        by_month
            .into_iter()
            .map(|(month, facts)| {
                let totals = aggregate::aggregate(&facts, GroupBy::Category)
                    .into_iter()
                    .filter_map(|(key, total)| match key {
                        GroupKey::Category(category) => Some((category, total)),
                        _ => None,
                    })
                    .collect();
                TrendPoint { month, totals }
            })
            .collect()
    }

    fn market_share(&self) -> MarketShareSnapshot {
        let Some(as_of) = self.facts.iter().map(|f| f.month).max() else {
            return MarketShareSnapshot {
                as_of: None,
                categories: Vec::new(),
            };
        };

        let snapshot: Vec<RegistrationFact> = self
            .facts
            .iter()
            .filter(|f| f.month == as_of)
            .cloned()
            .collect();
        let mut shares = aggregate::shares_within_category(&snapshot);

        let covered: BTreeSet<VehicleCategory> = if self.filter.categories.is_empty() {
            self.facts.iter().map(|f| f.category).collect()
        } else {
            self.filter.categories.clone()
        };

        let categories = covered
            .into_iter()
            .map(|category| {
                let entries = shares.remove(&category).unwrap_or_default();
                CategoryMarketShare {
                    category,
                    total_registrations: entries.iter().map(|e| e.registrations).sum(),
                    entries,
                }
            })
            .collect();

        MarketShareSnapshot {
            as_of: Some(as_of),
            categories,
        }
    }

    fn series_stats(&self) -> BTreeMap<SeriesKey, SeriesStats<'_>> {
        let mut stats: BTreeMap<SeriesKey, SeriesStats<'_>> = BTreeMap::new();
        for obs in &self.observations {
            let key = obs.current.series_key();
            match stats.get_mut(&key) {
                Some(entry) => {
                    entry.total += obs.current.registrations;
                    if obs.current.month > entry.latest.current.month {
                        entry.latest = obs;
                    }
                }
                None => {
                    stats.insert(
                        key,
                        SeriesStats {
                            total: obs.current.registrations,
                            latest: obs,
                        },
                    );
                }
            }
        }
        stats
    }

    fn leaderboard(&self, kind: GrowthKind, options: &AnalyticsOptions) -> Leaderboard {
        let mut entries = Vec::new();
        let mut new_entrants = Vec::new();
        let mut below_volume_floor = Vec::new();

        for (key, stats) in self.series_stats() {
            if stats.total < options.min_leaderboard_registrations {
                below_volume_floor.push(key);
                continue;
            }
            let metric = stats.latest.metric(kind);
            match metric.growth {
                Growth::New => new_entrants.push(key),
                _ => entries.push(RankEntry::new(key, metric.value())),
            }
        }

        let leaders = rank(&entries, RankDirection::Descending, options.leaderboard_size);
        let laggards = rank(&entries, RankDirection::Ascending, options.leaderboard_size);

        Leaderboard {
            kind,
            leaders: leaders.ranked,
            laggards: laggards.ranked,
            insufficient_data: leaders.insufficient_data,
            new_entrants,
            below_volume_floor,
        }
    }

    fn summary(&self, snapshot: &MarketShareSnapshot) -> Vec<SummaryRow> {
        let mut rows: Vec<SummaryRow> = self
            .series_stats()
            .into_iter()
            .map(|(series, stats)| SummaryRow {
                market_share: snapshot.share_of(&series),
                total_registrations: stats.total,
                latest_month: stats.latest.current.month,
                latest_yoy: stats.latest.yoy_growth(),
                latest_qoq: stats.latest.qoq_growth(),
                series,
            })
            .collect();

        rows.sort_by(|a, b| {
            b.total_registrations
                .cmp(&a.total_registrations)
                .then_with(|| a.series.cmp(&b.series))
        });
        rows
    }

    fn category_summary(&self) -> Vec<CategorySummary> {
        aggregate::category_shares(&self.facts)
            .into_iter()
            .map(|entry| {
                let in_category: Vec<&AlignedObservation> = self
                    .observations
                    .iter()
                    .filter(|o| o.current.category == entry.key)
                    .collect();
                let yoy: Vec<Growth> = in_category.iter().map(|o| o.yoy_growth()).collect();
                let qoq: Vec<Growth> = in_category.iter().map(|o| o.qoq_growth()).collect();
                let manufacturers: BTreeSet<&str> = in_category
                    .iter()
                    .map(|o| o.current.manufacturer.as_str())
                    .collect();

                CategorySummary {
                    category: entry.key,
                    total_registrations: entry.registrations,
                    market_share: entry.share,
                    avg_yoy_growth: mean_defined(&yoy),
                    avg_qoq_growth: mean_defined(&qoq),
                    manufacturers: manufacturers.len(),
                }
            })
            .collect()
    }
}

fn series_point(obs: &AlignedObservation) -> SeriesPoint {
    SeriesPoint {
        month: obs.current.month,
        registrations: obs.current.registrations,
        yoy_baseline: obs.yoy_baseline.as_ref().map(|b| b.registrations),
        yoy: obs.yoy_growth(),
        quarter_to_date: obs.quarter_to_date.map(|q| q.registrations),
        qoq_baseline: obs.qoq_baseline.map(|q| q.registrations),
        qoq: obs.qoq_growth(),
    }
}

// ============================================================================
// FACADE
// ============================================================================

pub struct AnalyticsFacade<S> {
    store: S,
    options: AnalyticsOptions,
}

impl<S: FactStore> AnalyticsFacade<S> {
    pub fn new(store: S) -> Self {
        Self::with_options(store, AnalyticsOptions::default())
    }

    pub fn with_options(store: S, options: AnalyticsOptions) -> Self {
        AnalyticsFacade { store, options }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn options(&self) -> &AnalyticsOptions {
        &self.options
    }

    pub fn domain(&self) -> Result<StoreDomain> {
        self.store.domain()
    }

    pub fn version(&self) -> Result<u64> {
        self.store.version()
    }

    fn analyze(&self, filter: &FactFilter) -> Result<WindowAnalysis> {
        let domain = self.store.domain()?;
        filter.validate(&domain)?;

        let fetched = self.store.query(&filter.with_lookback(LOOKBACK_MONTHS))?;
        let aligner = PeriodAligner::new(&fetched)?;

        let mut facts: Vec<RegistrationFact> = fetched
            .into_iter()
            .filter(|f| filter.contains_month(f.month))
            .collect();
        facts.sort_by(|a, b| {
            (a.month, a.category, &a.manufacturer).cmp(&(b.month, b.category, &b.manufacturer))
        });

        let density = check_density(&facts);
        if !density.is_dense() {
            warn!(
                from = %filter.date_from,
                to = %filter.date_to,
                series_with_gaps = density.gaps.len(),
                missing_months = density.missing_months(),
                "window has missing months, growth next to them is N/A"
            );
        }

        let observations = facts.iter().map(|f| aligner.align(f)).collect();
        debug!(
            from = %filter.date_from,
            to = %filter.date_to,
            window_facts = facts.len(),
            "window analysed"
        );

        Ok(WindowAnalysis {
            filter: filter.clone(),
            facts,
            observations,
        })
    }

    pub fn kpis(&self, filter: &FactFilter) -> Result<KpiSet> {
        Ok(self.analyze(filter)?.kpis())
    }

    pub fn trend_series(&self, filter: &FactFilter) -> Result<Vec<TrendPoint>> {
        Ok(self.analyze(filter)?.trend())
    }

    pub fn market_share(&self, filter: &FactFilter) -> Result<MarketShareSnapshot> {
        Ok(self.analyze(filter)?.market_share())
    }

    pub fn leaderboard(&self, filter: &FactFilter, kind: GrowthKind) -> Result<Leaderboard> {
        Ok(self.analyze(filter)?.leaderboard(kind, &self.options))
    }

    pub fn summary_table(&self, filter: &FactFilter) -> Result<Vec<SummaryRow>> {
        let analysis = self.analyze(filter)?;
        let snapshot = analysis.market_share();
        Ok(analysis.summary(&snapshot))
    }

    pub fn category_summary(&self, filter: &FactFilter) -> Result<Vec<CategorySummary>> {
        Ok(self.analyze(filter)?.category_summary())
    }

    pub fn insights(&self, filter: &FactFilter) -> Result<Vec<Insight>> {
        let analysis = self.analyze(filter)?;
        let snapshot = analysis.market_share();
        Ok(insights::evaluate(
            &self.options.insights,
            &analysis.kpis(),
            &analysis.category_summary(),
            &analysis.summary(&snapshot),
            &analysis.leaderboard(GrowthKind::YoY, &self.options),
        ))
    }

    /// All outputs from a single store read
    pub fn dashboard(&self, filter: &FactFilter) -> Result<Dashboard> {
        let fact_set_version = self.store.version()?;
        let analysis = self.analyze(filter)?;

        let kpis = analysis.kpis();
        let categories = analysis.category_summary();
        let market_share = analysis.market_share();
        let summary = analysis.summary(&market_share);
        let yoy_leaderboard = analysis.leaderboard(GrowthKind::YoY, &self.options);
        let qoq_leaderboard = analysis.leaderboard(GrowthKind::QoQ, &self.options);
        let insights = insights::evaluate(
            &self.options.insights,
            &kpis,
            &categories,
            &summary,
            &yoy_leaderboard,
        );

        Ok(Dashboard {
            filter: filter.clone(),
            fact_set_version,
            kpis,
            trend: analysis.trend(),
            categories,
            market_share,
            yoy_leaderboard,
            qoq_leaderboard,
            summary,
            insights,
        })
    }

    /// Month-by-month growth for one series inside the filter window
    pub fn series_detail(&self, series: &SeriesKey, filter: &FactFilter) -> Result<SeriesDetail> {
        let scoped = filter
            .clone()
            .with_categories([series.category])
            .with_manufacturers([series.manufacturer.clone()]);
        let analysis = self.analyze(&scoped)?;

        Ok(SeriesDetail {
            series: series.clone(),
            points: analysis
                .observations
                .iter()
                .filter(|o| o.current.is_same_series(series))
                .map(series_point)
                .collect(),
        })
    }
}
