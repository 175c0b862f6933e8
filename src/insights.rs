// 💡 Insight Triggers - rule-based flags over already computed aggregates
//
// Pure reads of derived data: KPI set, category summary, summary table and
// the YoY leaderboard. Nothing here touches the fact store.

use crate::growth::Growth;
use crate::report::{CategorySummary, KpiSet, Leaderboard, SummaryRow};
use serde::{Deserialize, Serialize};

// ============================================================================
// THRESHOLDS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightThresholds {
    /// Latest YoY above this (percent) flags high growth
    pub high_growth_pct: f64,

    /// Latest YoY below this (percent, negative) flags a decline
    pub decline_pct: f64,

    /// Share within category above this fraction flags a market leader
    pub leader_share: f64,

    /// Market-wide category share above this fraction flags dominance
    pub category_dominance: f64,
}

impl Default for InsightThresholds {
    fn default() -> Self {
        InsightThresholds {
            high_growth_pct: 20.0,
            decline_pct: -10.0,
            leader_share: 0.30,
            category_dominance: 0.60,
        }
    }
}

impl InsightThresholds {
    pub fn validate(&self) -> Result<(), String> {
        let values = [
            self.high_growth_pct,
            self.decline_pct,
            self.leader_share,
            self.category_dominance,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return Err("insight thresholds must be finite numbers".to_string());
        }
        if !(0.0..=1.0).contains(&self.leader_share) || !(0.0..=1.0).contains(&self.category_dominance) {
            return Err("share thresholds are fractions between 0 and 1".to_string());
        }
        if self.decline_pct >= self.high_growth_pct {
            return Err("decline_pct must be below high_growth_pct".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// INSIGHTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    CategoryDominance,
    FastestGrowingCategory,
    GrowthLeader,
    HighGrowth,
    Decline,
    NewEntrant,
    MarketLeader,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub kind: InsightKind,
    pub subject: String,
    /// Percent for growth rules, fraction for share rules
    pub value: Option<f64>,
    pub message: String,
}

impl Insight {
    fn new(kind: InsightKind, subject: String, value: Option<f64>, message: String) -> Self {
        Insight {
            kind,
            subject,
            value,
            message,
        }
    }
}

pub fn evaluate(
    thresholds: &InsightThresholds,
    kpis: &KpiSet,
    categories: &[CategorySummary],
    summary: &[SummaryRow],
    yoy_leaderboard: &Leaderboard,
) -> Vec<Insight> {
    let mut insights = Vec::new();

    if kpis.total_registrations == 0 {
        return insights;
    }

    // Rule 1: a category holds most of the market
    for category in categories {
        if let Some(share) = category.market_share {
            if share > thresholds.category_dominance {
                insights.push(Insight::new(
                    InsightKind::CategoryDominance,
                    category.category.code().to_string(),
                    Some(share),
                    format!(
                        "{} dominates the market with {:.1}% of registrations",
                        category.category.name(),
                        share * 100.0
                    ),
                ));
            }
        }
    }

    // Rule 2: category with the best average YoY
    let fastest = categories
        .iter()
        .filter_map(|c| c.avg_yoy_growth.map(|g| (c, g)))
        .max_by(|(a, ga), (b, gb)| ga.total_cmp(gb).then(b.category.cmp(&a.category)));
    if let Some((category, growth)) = fastest {
        insights.push(Insight::new(
            InsightKind::FastestGrowingCategory,
            category.category.code().to_string(),
            Some(growth),
            format!(
                "{} shows the highest average growth at {:.1}% YoY",
                category.category.name(),
                growth
            ),
        ));
    }

    // Rule 3: top of the YoY leaderboard
    if let Some(leader) = yoy_leaderboard.leaders.first() {
        insights.push(Insight::new(
            InsightKind::GrowthLeader,
            leader.id.to_string(),
            Some(leader.value),
            format!("Growth leader: {} at {:.1}% YoY", leader.id, leader.value),
        ));
    }

    // Rules 4-7: per manufacturer, in summary table order
    for row in summary {
        match row.latest_yoy {
            Growth::Change(g) if g > thresholds.high_growth_pct => {
                insights.push(Insight::new(
                    InsightKind::HighGrowth,
                    row.series.to_string(),
                    Some(g),
                    format!("{} grew {:.1}% YoY in {}", row.series, g, row.latest_month),
                ));
            }
            Growth::Change(g) if g < thresholds.decline_pct => {
                insights.push(Insight::new(
                    InsightKind::Decline,
                    row.series.to_string(),
                    Some(g),
                    format!("{} declined {:.1}% YoY in {}", row.series, g.abs(), row.latest_month),
                ));
            }
            Growth::New => {
                insights.push(Insight::new(
                    InsightKind::NewEntrant,
                    row.series.to_string(),
                    None,
                    format!("{} registered volume where it had none a year earlier", row.series),
                ));
            }
            _ => {}
        }

        if let Some(share) = row.market_share {
            if share > thresholds.leader_share {
                insights.push(Insight::new(
                    InsightKind::MarketLeader,
                    row.series.to_string(),
                    Some(share),
                    format!(
                        "{} leads {} with {:.1}% share",
                        row.series.manufacturer,
                        row.series.category,
                        share * 100.0
                    ),
                ));
            }
        }
    }

    insights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fact::{SeriesKey, VehicleCategory, YearMonth};
    use crate::growth::GrowthKind;
    use crate::ranking::Ranked;

    fn kpis(total: u64) -> KpiSet {
        KpiSet {
            total_registrations: total,
            avg_yoy_growth: None,
            avg_qoq_growth: None,
            active_manufacturers: 2,
        }
    }

    fn category(cat: VehicleCategory, share: f64, yoy: Option<f64>) -> CategorySummary {
        CategorySummary {
            category: cat,
            total_registrations: 100,
            market_share: Some(share),
            avg_yoy_growth: yoy,
            avg_qoq_growth: None,
            manufacturers: 1,
        }
    }

    fn row(name: &str, yoy: Growth, share: Option<f64>) -> SummaryRow {
        SummaryRow {
            series: SeriesKey::new(VehicleCategory::TwoWheeler, name),
            total_registrations: 1000,
            latest_month: YearMonth::new(2024, 12).unwrap(),
            latest_yoy: yoy,
            latest_qoq: Growth::InsufficientHistory,
            market_share: share,
        }
    }

    fn leaderboard(leaders: Vec<Ranked<SeriesKey>>) -> Leaderboard {
        Leaderboard {
            kind: GrowthKind::YoY,
            leaders,
            laggards: Vec::new(),
            insufficient_data: Vec::new(),
            new_entrants: Vec::new(),
            below_volume_floor: Vec::new(),
        }
    }

    #[test]
    fn test_rules_fire_on_thresholds() {
        let categories = vec![
            category(VehicleCategory::TwoWheeler, 0.75, Some(8.0)),
            category(VehicleCategory::FourWheeler, 0.25, Some(12.0)),
        ];
        let summary = vec![
            row("Ather", Growth::Change(45.0), Some(0.05)),
            row("Hero MotoCorp", Growth::Change(2.0), Some(0.35)),
            row("Yamaha", Growth::Change(-15.0), Some(0.08)),
            row("Ola", Growth::New, None),
            row("Honda", Growth::InsufficientHistory, Some(0.2)),
        ];
        let leaders = leaderboard(vec![Ranked {
            rank: 1,
            id: summary[0].series.clone(),
            value: 45.0,
        }]);

        let insights = evaluate(&InsightThresholds::default(), &kpis(5000), &categories, &summary, &leaders);
        let kinds: Vec<_> = insights.iter().map(|i| (i.kind, i.subject.as_str())).collect();

        assert_eq!(
            kinds,
            vec![
                (InsightKind::CategoryDominance, "2W"),
                (InsightKind::FastestGrowingCategory, "4W"),
                (InsightKind::GrowthLeader, "Ather (2W)"),
                (InsightKind::HighGrowth, "Ather (2W)"),
                (InsightKind::MarketLeader, "Hero MotoCorp (2W)"),
                (InsightKind::Decline, "Yamaha (2W)"),
                (InsightKind::NewEntrant, "Ola (2W)"),
            ]
        );
    }

    #[test]
    fn test_undefined_growth_never_counts_as_zero() {
        let summary = vec![row("Honda", Growth::InsufficientHistory, None)];
        let strict = InsightThresholds {
            high_growth_pct: -5.0,
            decline_pct: -50.0,
            ..InsightThresholds::default()
        };
        let insights = evaluate(&strict, &kpis(10), &[], &summary, &leaderboard(Vec::new()));
        assert!(insights.is_empty());
    }

    #[test]
    fn test_empty_window_has_no_insights() {
        let categories = vec![category(VehicleCategory::TwoWheeler, 1.0, Some(10.0))];
        let insights = evaluate(
            &InsightThresholds::default(),
            &kpis(0),
            &categories,
            &[],
            &leaderboard(Vec::new()),
        );
        assert!(insights.is_empty());
    }

    #[test]
    fn test_threshold_validation() {
        assert!(InsightThresholds::default().validate().is_ok());

        let bad_share = InsightThresholds {
            leader_share: 30.0,
            ..InsightThresholds::default()
        };
        assert!(bad_share.validate().is_err());

        let inverted = InsightThresholds {
            decline_pct: 50.0,
            ..InsightThresholds::default()
        };
        assert!(inverted.validate().is_err());
    }
}
