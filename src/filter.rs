// 🔎 Fact Filter - the one typed shape of a dashboard request
// Validated once at the boundary against the store's domain; every
// component downstream trusts it.

use crate::error::{AnalyticsError, Result};
use crate::fact::{RegistrationFact, VehicleCategory, YearMonth};
use crate::store::StoreDomain;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Date window (inclusive on both ends) plus category and manufacturer
/// selections. Empty selections mean "all".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FactFilter {
    pub date_from: YearMonth,
    pub date_to: YearMonth,
    #[serde(default)]
    pub categories: BTreeSet<VehicleCategory>,
    #[serde(default)]
    pub manufacturers: BTreeSet<String>,
}

impl FactFilter {
    pub fn new(date_from: YearMonth, date_to: YearMonth) -> Self {
        FactFilter {
            date_from,
            date_to,
            categories: BTreeSet::new(),
            manufacturers: BTreeSet::new(),
        }
    }

    /// Last `months` months of the store's data (whole domain when shorter).
    /// None when the store is empty.
    pub fn trailing(domain: &StoreDomain, months: u32) -> Option<Self> {
        let first = domain.first_month?;
        let last = domain.last_month?;
        let start = last.add_months(1 - months.max(1) as i32).max(first);
        Some(FactFilter::new(start, last))
    }

    pub fn with_categories(mut self, categories: impl IntoIterator<Item = VehicleCategory>) -> Self {
        self.categories = categories.into_iter().collect();
        self
    }

    pub fn with_manufacturers<S: Into<String>>(mut self, manufacturers: impl IntoIterator<Item = S>) -> Self {
        self.manufacturers = manufacturers.into_iter().map(Into::into).collect();
        self
    }

    /// Same selection, window extended `months` back to reach baselines
    pub fn with_lookback(&self, months: u32) -> Self {
        FactFilter {
            date_from: self.date_from.add_months(-(months as i32)),
            ..self.clone()
        }
    }

    pub fn contains_month(&self, month: YearMonth) -> bool {
        self.date_from <= month && month <= self.date_to
    }

    pub fn matches(&self, fact: &RegistrationFact) -> bool {
        self.contains_month(fact.month)
            && (self.categories.is_empty() || self.categories.contains(&fact.category))
            && (self.manufacturers.is_empty() || self.manufacturers.contains(&fact.manufacturer))
    }

    /// Reject requests that could silently look like "no data in range".
    ///
    /// A well-formed window that simply has no facts is accepted: the
    /// engine answers it with empty aggregates.
    pub fn validate(&self, domain: &StoreDomain) -> Result<()> {
        if self.date_from > self.date_to {
            return Err(AnalyticsError::InvalidFilter(format!(
                "date_from {} is after date_to {}",
                self.date_from, self.date_to
            )));
        }

        let known_categories = domain.categories();
        if let Some(unknown) = self.categories.iter().find(|c| !known_categories.contains(*c)) {
            return Err(AnalyticsError::InvalidFilter(format!(
                "category {} has no registrations in the store",
                unknown
            )));
        }

        let known_manufacturers = domain.manufacturers_in(&self.categories);
        if let Some(unknown) = self
            .manufacturers
            .iter()
            .find(|m| !known_manufacturers.contains(*m))
        {
            let scope = if self.categories.is_empty() {
                "any category".to_string()
            } else {
                self.categories
                    .iter()
                    .map(|c| c.code())
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            return Err(AnalyticsError::InvalidFilter(format!(
                "manufacturer '{}' is not present in {}",
                unknown, scope
            )));
        }

        Ok(())
    }
}

// ============================================================================
// REQUEST PARAMETERS
// ============================================================================

/// Untyped filter as it arrives from a query string or the command line.
/// Lists are comma separated; missing dates fall back to a trailing window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterParams {
    pub from: Option<String>,
    pub to: Option<String>,
    pub categories: Option<String>,
    pub manufacturers: Option<String>,
}

fn split_list(value: &Option<String>) -> impl Iterator<Item = &str> {
    value
        .as_deref()
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

impl FilterParams {
    /// Parse into a `FactFilter`. Syntax errors are InvalidFilter; the
    /// result still has to pass `FactFilter::validate`.
    pub fn resolve(&self, domain: &StoreDomain, default_window_months: u32) -> Result<FactFilter> {
        let parse_month = |value: &str| -> Result<YearMonth> {
            value
                .parse()
                .map_err(|e| AnalyticsError::InvalidFilter(format!("{}", e)))
        };
        let no_data = || AnalyticsError::InvalidFilter("store has no registrations; give from and to".to_string());

        let date_to = match self.to.as_deref() {
            Some(to) => parse_month(to)?,
            None => domain.last_month.ok_or_else(no_data)?,
        };
        let date_from = match self.from.as_deref() {
            Some(from) => parse_month(from)?,
            None => {
                let start = date_to.add_months(1 - default_window_months.max(1) as i32);
                match domain.first_month {
                    Some(first) if first > start && first <= date_to => first,
                    _ => start,
                }
            }
        };

        let categories = split_list(&self.categories)
            .map(|c| {
                c.parse::<VehicleCategory>()
                    .map_err(|e| AnalyticsError::InvalidFilter(format!("{}", e)))
            })
            .collect::<Result<BTreeSet<_>>>()?;

        Ok(FactFilter {
            date_from,
            date_to,
            categories,
            manufacturers: split_list(&self.manufacturers).map(String::from).collect(),
        })
    }
}
