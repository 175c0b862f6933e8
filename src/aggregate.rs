// ➕ Aggregator - totals and market shares over a fact set
//
// Summation is over `registrations` only, and every fact lands under
// exactly one group key. Manufacturer shares are scoped to their category
// (2W/3W/4W are not substitute goods); category shares are market-wide.

use crate::fact::{RegistrationFact, SeriesKey, VehicleCategory};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    Category,
    /// Category-scoped manufacturer (SeriesKey)
    Manufacturer,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "group", content = "key", rename_all = "snake_case")]
pub enum GroupKey {
    Category(VehicleCategory),
    Manufacturer(SeriesKey),
    All,
}

/// One member of a share scope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareEntry<K> {
    pub key: K,
    pub registrations: u64,
    /// Fraction in 0..=1; None when the scope total is zero
    pub share: Option<f64>,
}

pub fn aggregate(facts: &[RegistrationFact], group_by: GroupBy) -> BTreeMap<GroupKey, u64> {
    let mut totals = BTreeMap::new();
    for fact in facts {
        let key = match group_by {
            GroupBy::Category => GroupKey::Category(fact.category),
            GroupBy::Manufacturer => GroupKey::Manufacturer(fact.series_key()),
            GroupBy::None => GroupKey::All,
        };
        *totals.entry(key).or_insert(0u64) += fact.registrations;
    }
    totals
}

pub fn total_registrations(facts: &[RegistrationFact]) -> u64 {
    facts.iter().map(|f| f.registrations).sum()
}

/// part / total, undefined for an empty (zero) scope
pub fn share(part: u64, total: u64) -> Option<f64> {
    if total == 0 {
        None
    } else {
        Some(part as f64 / total as f64)
    }
}

/// Totals per category with market-wide shares, largest first
pub fn category_shares(facts: &[RegistrationFact]) -> Vec<ShareEntry<VehicleCategory>> {
    let mut totals: BTreeMap<VehicleCategory, u64> = BTreeMap::new();
    for fact in facts {
        *totals.entry(fact.category).or_insert(0) += fact.registrations;
    }
    let market_total: u64 = totals.values().sum();

    let mut entries: Vec<_> = totals
        .into_iter()
        .map(|(key, registrations)| ShareEntry {
            key,
            registrations,
            share: share(registrations, market_total),
        })
        .collect();
    entries.sort_by(|a, b| b.registrations.cmp(&a.registrations).then(a.key.cmp(&b.key)));
    entries
}

/// Manufacturer shares, each computed against its own category total.
/// Entries are ordered largest first, ties by manufacturer name.
pub fn shares_within_category(
    facts: &[RegistrationFact],
) -> BTreeMap<VehicleCategory, Vec<ShareEntry<String>>> {
    let mut per_category: BTreeMap<VehicleCategory, BTreeMap<String, u64>> = BTreeMap::new();
    for fact in facts {
        *per_category
            .entry(fact.category)
            .or_default()
            .entry(fact.manufacturer.clone())
            .or_insert(0) += fact.registrations;
    }

    per_category
        .into_iter()
        .map(|(category, manufacturers)| {
            let scope_total: u64 = manufacturers.values().sum();
            let mut entries: Vec<_> = manufacturers
                .into_iter()
                .map(|(key, registrations)| ShareEntry {
                    key,
                    registrations,
                    share: share(registrations, scope_total),
                })
                .collect();
            entries.sort_by(|a, b| b.registrations.cmp(&a.registrations).then(a.key.cmp(&b.key)));
            (category, entries)
        })
        .collect()
}
