// ⏮️ Period Aligner - pairs each fact with its prior-year and prior-quarter baseline
//
// YoY: same month one year back, O(1) lookup in the series index.
// QoQ: registrations are monthly but QoQ is reported per quarter. The
//      baseline is the complete previous quarter (sum of its three months).
//      The current side is the quarter to date up to the fact's month, put
//      on a three-month pace: April alone is compared as 3 × April, April
//      plus May as 3/2 × (April + May), a complete quarter as its sum.
//      Any missing month on either side aligns to "absent", never to a
//      partial sum presented as complete. Months after the fact are never
//      read, so a window ending mid-quarter still has a defined QoQ.
//
// Absent baselines stay absent. A synthesized zero baseline would turn
// "no history" into "New" downstream.

use crate::error::{AnalyticsError, Result};
use crate::fact::{RegistrationFact, SeriesKey, YearMonth, YearQuarter};
use crate::growth::{growth, Growth, GrowthKind, GrowthMetric};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Months of history a window needs in front of it to align every fact:
/// 12 for YoY, and the previous quarter always starts inside that span.
pub const LOOKBACK_MONTHS: u32 = 12;

/// Sum of the leading months of one quarter, only built when none is missing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuarterTotal {
    pub quarter: YearQuarter,
    pub registrations: u64,
    /// 1..=3; 3 means the whole quarter
    pub months: u32,
}

impl QuarterTotal {
    pub fn is_complete(&self) -> bool {
        self.months == 3
    }
}

/// A fact with its baselines. Derived per request, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedObservation {
    pub current: RegistrationFact,
    pub yoy_baseline: Option<RegistrationFact>,
    /// Quarter containing `current`, from its first month through `current`
    pub quarter_to_date: Option<QuarterTotal>,
    pub qoq_baseline: Option<QuarterTotal>,
}

impl AlignedObservation {
    pub fn yoy_growth(&self) -> Growth {
        growth(
            self.current.registrations,
            self.yoy_baseline.as_ref().map(|b| b.registrations),
        )
    }

    /// Quarter-to-date pace against the previous quarter.
    /// InsufficientHistory when either side has a missing month.
    pub fn qoq_growth(&self) -> Growth {
        let Some(current) = self.quarter_to_date else {
            return Growth::InsufficientHistory;
        };
        // qtd / n vs base / 3, compared as qtd × 3 vs base × n
        growth(
            current.registrations * 3,
            self.qoq_baseline
                .map(|b| b.registrations * u64::from(current.months)),
        )
    }

    pub fn metric(&self, kind: GrowthKind) -> GrowthMetric {
        GrowthMetric {
            kind,
            growth: match kind {
                GrowthKind::YoY => self.yoy_growth(),
                GrowthKind::QoQ => self.qoq_growth(),
            },
        }
    }
}

// ============================================================================
// PERIOD ALIGNER
// ============================================================================

/// Index of facts keyed by (category, manufacturer) then month.
///
/// Built on demand from whatever the store returned (any order). Building
/// fails if two facts share a (month, category, manufacturer) key, since
/// alignment against either of them would be arbitrary.
#[derive(Debug, Default)]
pub struct PeriodAligner {
    series: HashMap<SeriesKey, BTreeMap<YearMonth, RegistrationFact>>,
}

impl PeriodAligner {
    pub fn new(facts: &[RegistrationFact]) -> Result<Self> {
        let mut series: HashMap<SeriesKey, BTreeMap<YearMonth, RegistrationFact>> = HashMap::new();

        for fact in facts {
            let months = series.entry(fact.series_key()).or_default();
            if months.insert(fact.month, fact.clone()).is_some() {
                let count = facts
                    .iter()
                    .filter(|f| f.month == fact.month && f.is_same_series(&fact.series_key()))
                    .count();
                return Err(AnalyticsError::DataIntegrityViolation {
                    month: fact.month,
                    category: fact.category,
                    manufacturer: fact.manufacturer.clone(),
                    count,
                });
            }
        }

        debug!(facts = facts.len(), series = series.len(), "period aligner indexed");
        Ok(PeriodAligner { series })
    }

    pub fn lookup(&self, key: &SeriesKey, month: YearMonth) -> Option<&RegistrationFact> {
        self.series.get(key)?.get(&month)
    }

    /// Same series, same month-of-year, previous year
    pub fn yoy_baseline(&self, fact: &RegistrationFact) -> Option<&RegistrationFact> {
        self.lookup(&fact.series_key(), fact.month.previous_year())
    }

    /// Sum of a quarter for one series; None if any constituent month is missing
    pub fn quarter_total(&self, key: &SeriesKey, quarter: YearQuarter) -> Option<QuarterTotal> {
        self.sum_months(key, quarter, 3)
    }

    /// Quarter of `fact` from its first month through `fact.month`
    pub fn quarter_to_date(&self, fact: &RegistrationFact) -> Option<QuarterTotal> {
        let quarter = fact.month.year_quarter();
        let months = quarter.months().iter().take_while(|m| **m <= fact.month).count();
        self.sum_months(&fact.series_key(), quarter, months)
    }

    fn sum_months(&self, key: &SeriesKey, quarter: YearQuarter, count: usize) -> Option<QuarterTotal> {
        let months = self.series.get(key)?;
        let mut registrations = 0u64;
        for month in quarter.months().iter().take(count) {
            registrations += months.get(month)?.registrations;
        }
        Some(QuarterTotal {
            quarter,
            registrations,
            months: u32::try_from(count).ok()?,
        })
    }

    /// The complete quarter immediately preceding the fact's quarter
    /// (Q1 compares against Q4 of the prior year)
    pub fn qoq_baseline(&self, fact: &RegistrationFact) -> Option<QuarterTotal> {
        self.quarter_total(&fact.series_key(), fact.month.year_quarter().previous())
    }

    pub fn align(&self, fact: &RegistrationFact) -> AlignedObservation {
        AlignedObservation {
            current: fact.clone(),
            yoy_baseline: self.yoy_baseline(fact).cloned(),
            quarter_to_date: self.quarter_to_date(fact),
            qoq_baseline: self.qoq_baseline(fact),
        }
    }

    /// Aligned observations for every indexed fact of one series, oldest first
    pub fn align_series(&self, key: &SeriesKey) -> Vec<AlignedObservation> {
        self.series
            .get(key)
            .map(|months| months.values().map(|f| self.align(f)).collect())
            .unwrap_or_default()
    }
}
