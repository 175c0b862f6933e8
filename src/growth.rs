// 📈 Growth Calculator
// (current - baseline) / baseline * 100, with an explicit three-way outcome.
//
//   baseline absent          → InsufficientHistory  ("N/A")
//   baseline 0, current 0    → Change(0.0)           (no activity, no change)
//   baseline 0, current > 0  → New                   (not a percentage)
//   otherwise                → Change(signed %, unrounded)
//
// InsufficientHistory and New are never coerced to 0%.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GrowthKind {
    #[serde(rename = "yoy")]
    YoY,
    #[serde(rename = "qoq")]
    QoQ,
}

impl GrowthKind {
    pub fn label(&self) -> &'static str {
        match self {
            GrowthKind::YoY => "YoY",
            GrowthKind::QoQ => "QoQ",
        }
    }
}

impl fmt::Display for GrowthKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of one growth computation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Growth {
    /// Signed percentage change
    Change(f64),
    /// No baseline in scope
    InsufficientHistory,
    /// Baseline of zero with current activity
    New,
}

impl Growth {
    /// The numeric change, if well defined
    pub fn value(&self) -> Option<f64> {
        match self {
            Growth::Change(v) => Some(*v),
            Growth::InsufficientHistory | Growth::New => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Growth::Change(_))
    }

    /// Display form used by the CLI ("+12.5%", "N/A", "New")
    pub fn display(&self) -> String {
        match self {
            Growth::Change(v) if *v > 0.0 => format!("+{:.1}%", v),
            Growth::Change(v) => format!("{:.1}%", v),
            Growth::InsufficientHistory => "N/A".to_string(),
            Growth::New => "New".to_string(),
        }
    }
}

impl fmt::Display for Growth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// A growth value tagged with what it compares
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrowthMetric {
    pub kind: GrowthKind,
    pub growth: Growth,
}

impl GrowthMetric {
    pub fn value(&self) -> Option<f64> {
        self.growth.value()
    }
}

pub fn growth(current: u64, baseline: Option<u64>) -> Growth {
    match baseline {
        None => Growth::InsufficientHistory,
        Some(0) if current == 0 => Growth::Change(0.0),
        Some(0) => Growth::New,
        Some(base) => {
            let base = base as f64;
            Growth::Change((current as f64 - base) / base * 100.0)
        }
    }
}

/// Mean of the well-defined values only; None when there are none
pub fn mean_defined<'a>(values: impl IntoIterator<Item = &'a Growth>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .filter_map(Growth::value)
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_baseline_is_insufficient_history() {
        assert_eq!(growth(150, None), Growth::InsufficientHistory);
        assert_eq!(growth(0, None), Growth::InsufficientHistory);
    }

    #[test]
    fn test_zero_to_zero_is_no_change() {
        assert_eq!(growth(0, Some(0)), Growth::Change(0.0));
    }

    #[test]
    fn test_zero_baseline_with_activity_is_new() {
        let g = growth(30, Some(0));
        assert_eq!(g, Growth::New);
        assert_eq!(g.value(), None);
        assert_eq!(g.display(), "New");
    }

    #[test]
    fn test_regular_change_is_signed_and_unrounded() {
        assert_eq!(growth(150, Some(100)), Growth::Change(50.0));
        assert_eq!(growth(50, Some(100)), Growth::Change(-50.0));
        assert_eq!(growth(0, Some(100)), Growth::Change(-100.0));

        let third = growth(4, Some(3)).value().unwrap();
        assert!((third - 33.333_333_333_333_336).abs() < 1e-12);
    }

    #[test]
    fn test_mean_ignores_undefined_values() {
        let values = [
            Growth::Change(10.0),
            Growth::InsufficientHistory,
            Growth::New,
            Growth::Change(-4.0),
        ];
        assert_eq!(mean_defined(&values), Some(3.0));
        assert_eq!(mean_defined(&[Growth::New, Growth::InsufficientHistory]), None);
        assert_eq!(mean_defined(&[]), None);
    }

    #[test]
    fn test_serialized_shape_keeps_states_distinct() {
        let change = serde_json::to_value(Growth::Change(12.5)).unwrap();
        assert_eq!(change, serde_json::json!({"status": "change", "value": 12.5}));

        let new = serde_json::to_value(Growth::New).unwrap();
        assert_eq!(new, serde_json::json!({"status": "new"}));

        let na = serde_json::to_value(Growth::InsufficientHistory).unwrap();
        assert_eq!(na, serde_json::json!({"status": "insufficient_history"}));
    }

    #[test]
    fn test_display() {
        assert_eq!(Growth::Change(12.34).display(), "+12.3%");
        assert_eq!(Growth::Change(-3.0).display(), "-3.0%");
        assert_eq!(Growth::Change(0.0).display(), "0.0%");
        assert_eq!(Growth::InsufficientHistory.to_string(), "N/A");
    }
}
