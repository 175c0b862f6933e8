// ✅ Data Quality - density and key checks over a fact set
//
// Runs before analysis so a gap in a series shows up as a warning instead of
// as a silently missing baseline. Duplicate keys are reported here too; the
// period aligner refuses to index them.

use crate::fact::{RegistrationFact, SeriesKey, YearMonth};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Critical, // Analysis over this data would be ambiguous
    Warning,  // Growth for some months will be N/A
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityIssue {
    pub severity: Severity,
    pub subject: String,
    pub issue: String,
    pub recommendation: String,
}

/// Months missing between a series' first and last observed month
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesGap {
    pub series: SeriesKey,
    pub missing: Vec<YearMonth>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateKey {
    pub month: YearMonth,
    pub series: SeriesKey,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DensityReport {
    pub facts_checked: usize,
    pub series_checked: usize,
    pub gaps: Vec<SeriesGap>,
    pub duplicates: Vec<DuplicateKey>,
}

impl DensityReport {
    pub fn is_dense(&self) -> bool {
        self.gaps.is_empty()
    }

    pub fn has_critical_issues(&self) -> bool {
        !self.duplicates.is_empty()
    }

    pub fn missing_months(&self) -> usize {
        self.gaps.iter().map(|g| g.missing.len()).sum()
    }

    pub fn issues(&self) -> Vec<QualityIssue> {
        let mut issues = Vec::new();

        for dup in &self.duplicates {
            issues.push(QualityIssue {
                severity: Severity::Critical,
                subject: dup.series.to_string(),
                issue: format!("{} facts share the key for {}", dup.count, dup.month),
                recommendation: "Keep one fact per (month, category, manufacturer)".to_string(),
            });
        }

        for gap in &self.gaps {
            let months: Vec<String> = gap.missing.iter().map(|m| m.to_string()).collect();
            issues.push(QualityIssue {
                severity: Severity::Warning,
                subject: gap.series.to_string(),
                issue: format!("missing {} month(s): {}", months.len(), months.join(", ")),
                recommendation: "Backfill the months or expect N/A growth around them".to_string(),
            });
        }

        issues
    }

    pub fn summary(&self) -> String {
        format!(
            "Facts: {}, Series: {}, Gaps: {} series / {} months, Duplicate keys: {}",
            self.facts_checked,
            self.series_checked,
            self.gaps.len(),
            self.missing_months(),
            self.duplicates.len()
        )
    }
}

pub fn check_density(facts: &[RegistrationFact]) -> DensityReport {
    let mut per_series: BTreeMap<SeriesKey, BTreeMap<YearMonth, usize>> = BTreeMap::new();
    for fact in facts {
        *per_series
            .entry(fact.series_key())
            .or_default()
            .entry(fact.month)
            .or_insert(0) += 1;
    }

    let mut report = DensityReport {
        facts_checked: facts.len(),
        series_checked: per_series.len(),
        ..DensityReport::default()
    };

    for (series, months) in per_series {
        for (month, count) in &months {
            if *count > 1 {
                report.duplicates.push(DuplicateKey {
                    month: *month,
                    series: series.clone(),
                    count: *count,
                });
            }
        }

        let (Some(first), Some(last)) = (months.keys().next(), months.keys().next_back()) else {
            continue;
        };
        let missing: Vec<YearMonth> = first
            .iter_until(*last)
            .filter(|m| !months.contains_key(m))
            .collect();
        if !missing.is_empty() {
            report.gaps.push(SeriesGap { series, missing });
        }
    }

    report
}

/// Row-level checks applied on import
pub fn validate_fact(fact: &RegistrationFact) -> Vec<QualityIssue> {
    let mut issues = Vec::new();
    let subject = format!("{} {}", fact.month, fact.series_key());

    if fact.manufacturer.trim().is_empty() {
        issues.push(QualityIssue {
            severity: Severity::Critical,
            subject: subject.clone(),
            issue: "manufacturer is empty".to_string(),
            recommendation: "Every fact needs a manufacturer name".to_string(),
        });
    } else if fact.manufacturer.trim() != fact.manufacturer {
        issues.push(QualityIssue {
            severity: Severity::Warning,
            subject: subject.clone(),
            issue: "manufacturer has surrounding whitespace".to_string(),
            recommendation: "Trim names so series are not split".to_string(),
        });
    }

    let today = chrono::Utc::now().date_naive();
    if let Some(current) = YearMonth::new(today.year(), today.month()) {
        if fact.month > current {
            issues.push(QualityIssue {
                severity: Severity::Warning,
                subject,
                issue: format!("month {} is in the future", fact.month),
                recommendation: "Check the date column".to_string(),
            });
        }
    }

    issues
}
