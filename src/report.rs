use crate::aggregate::ShareEntry;
use crate::fact::{SeriesKey, VehicleCategory, YearMonth};
use crate::filter::FactFilter;
use crate::growth::{Growth, GrowthKind};
use crate::insights::Insight;
use crate::ranking::Ranked;
use serde::Serialize;
use std::collections::BTreeMap;

/// Headline numbers for a filter window.
///
/// Averages only include well-defined growth values; `None` means no fact
/// in the window had a baseline, which presentation shows as "N/A".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiSet {
    pub total_registrations: u64,
    pub avg_yoy_growth: Option<f64>,
    pub avg_qoq_growth: Option<f64>,
    /// Distinct category-scoped manufacturers with at least one fact
    pub active_manufacturers: usize,
}

/// Per-month totals by category. Only months with data appear.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub month: YearMonth,
    pub totals: BTreeMap<VehicleCategory, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryMarketShare {
    pub category: VehicleCategory,
    pub total_registrations: u64,
    pub entries: Vec<ShareEntry<String>>,
}

/// Manufacturer shares within each category, as of the latest month in
/// the window (a snapshot, so no figure double-counts across months)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketShareSnapshot {
    pub as_of: Option<YearMonth>,
    pub categories: Vec<CategoryMarketShare>,
}

impl MarketShareSnapshot {
    pub fn share_of(&self, series: &SeriesKey) -> Option<f64> {
        self.categories
            .iter()
            .find(|c| c.category == series.category)?
            .entries
            .iter()
            .find(|e| e.key == series.manufacturer)?
            .share
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leaderboard {
    pub kind: GrowthKind,
    /// Top N, highest growth first
    pub leaders: Vec<Ranked<SeriesKey>>,
    /// Bottom N, lowest growth first
    pub laggards: Vec<Ranked<SeriesKey>>,
    /// Eligible series with no baseline for their latest month (N/A)
    pub insufficient_data: Vec<SeriesKey>,
    /// Eligible series growing from a zero baseline (New), not ranked
    pub new_entrants: Vec<SeriesKey>,
    /// Series under the minimum window volume, not ranked
    pub below_volume_floor: Vec<SeriesKey>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub series: SeriesKey,
    pub total_registrations: u64,
    pub latest_month: YearMonth,
    pub latest_yoy: Growth,
    pub latest_qoq: Growth,
    /// Share within category in the snapshot month
    pub market_share: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    pub category: VehicleCategory,
    pub total_registrations: u64,
    /// Market-wide share of the window total
    pub market_share: Option<f64>,
    pub avg_yoy_growth: Option<f64>,
    pub avg_qoq_growth: Option<f64>,
    pub manufacturers: usize,
}

/// Everything the dashboard shows for one filter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub filter: FactFilter,
    pub fact_set_version: u64,
    pub kpis: KpiSet,
    pub trend: Vec<TrendPoint>,
    pub categories: Vec<CategorySummary>,
    pub market_share: MarketShareSnapshot,
    pub yoy_leaderboard: Leaderboard,
    pub qoq_leaderboard: Leaderboard,
    pub summary: Vec<SummaryRow>,
    pub insights: Vec<Insight>,
}

/// One month of a single series with both baselines resolved
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub month: YearMonth,
    pub registrations: u64,
    pub yoy_baseline: Option<u64>,
    pub yoy: Growth,
    /// Quarter containing `month`, summed from its first month through `month`
    pub quarter_to_date: Option<u64>,
    pub qoq_baseline: Option<u64>,
    pub qoq: Growth,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesDetail {
    pub series: SeriesKey,
    pub points: Vec<SeriesPoint>,
}
