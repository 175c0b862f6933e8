// 🗄️ Fact Store Interface
// Read access to registration facts. The engine never writes through it.
//
// Implementations:
// - SqliteFactStore (db.rs) - persistent store used by the CLI and server
// - InMemoryFactStore        - plain vector, used by tests and dry runs

use crate::error::Result;
use crate::fact::{RegistrationFact, SeriesKey, VehicleCategory, YearMonth};
use crate::filter::FactFilter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// What the store knows about: its calendar span and every series in it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreDomain {
    pub first_month: Option<YearMonth>,
    pub last_month: Option<YearMonth>,
    pub series: BTreeSet<SeriesKey>,
}

impl StoreDomain {
    pub fn from_facts(facts: &[RegistrationFact]) -> Self {
        StoreDomain {
            first_month: facts.iter().map(|f| f.month).min(),
            last_month: facts.iter().map(|f| f.month).max(),
            series: facts.iter().map(|f| f.series_key()).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn categories(&self) -> BTreeSet<VehicleCategory> {
        self.series.iter().map(|s| s.category).collect()
    }

    /// Manufacturer names present in any of `categories` (all when empty)
    pub fn manufacturers_in(&self, categories: &BTreeSet<VehicleCategory>) -> BTreeSet<String> {
        self.series
            .iter()
            .filter(|s| categories.is_empty() || categories.contains(&s.category))
            .map(|s| s.manufacturer.clone())
            .collect()
    }
}

/// Abstract read access to registration facts.
///
/// `query` may return facts in any order; consumers index on demand.
/// Empty category / manufacturer sets in the filter mean "all".
pub trait FactStore {
    fn query(&self, filter: &FactFilter) -> Result<Vec<RegistrationFact>>;

    fn domain(&self) -> Result<StoreDomain>;

    /// Monotonic fact-set version, bumped whenever facts are added
    fn version(&self) -> Result<u64>;
}

impl<S: FactStore + ?Sized> FactStore for &S {
    fn query(&self, filter: &FactFilter) -> Result<Vec<RegistrationFact>> {
        (**self).query(filter)
    }

    fn domain(&self) -> Result<StoreDomain> {
        (**self).domain()
    }

    fn version(&self) -> Result<u64> {
        (**self).version()
    }
}

impl<S: FactStore + ?Sized> FactStore for std::sync::Arc<S> {
    fn query(&self, filter: &FactFilter) -> Result<Vec<RegistrationFact>> {
        (**self).query(filter)
    }

    fn domain(&self) -> Result<StoreDomain> {
        (**self).domain()
    }

    fn version(&self) -> Result<u64> {
        (**self).version()
    }
}

// ============================================================================
// IN-MEMORY STORE
// ============================================================================

/// Vector-backed store. Does not enforce key uniqueness, so it can hand
/// duplicate facts to the engine (which must detect them).
#[derive(Debug, Clone, Default)]
pub struct InMemoryFactStore {
    facts: Vec<RegistrationFact>,
    version: u64,
}

impl InMemoryFactStore {
    pub fn new(facts: Vec<RegistrationFact>) -> Self {
        let version = if facts.is_empty() { 0 } else { 1 };
        InMemoryFactStore { facts, version }
    }

    pub fn extend(&mut self, facts: impl IntoIterator<Item = RegistrationFact>) {
        let before = self.facts.len();
        self.facts.extend(facts);
        if self.facts.len() > before {
            self.version += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn facts(&self) -> &[RegistrationFact] {
        &self.facts
    }
}

impl FactStore for InMemoryFactStore {
    fn query(&self, filter: &FactFilter) -> Result<Vec<RegistrationFact>> {
        Ok(self
            .facts
            .iter()
            .filter(|f| filter.matches(f))
            .cloned()
            .collect())
    }

    fn domain(&self) -> Result<StoreDomain> {
        Ok(StoreDomain::from_facts(&self.facts))
    }

    fn version(&self) -> Result<u64> {
        Ok(self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fact(year: i32, month: u32, category: VehicleCategory, name: &str, n: u64) -> RegistrationFact {
        RegistrationFact::new(YearMonth::new(year, month).unwrap(), category, name, n)
    }

    fn sample_store() -> InMemoryFactStore {
        InMemoryFactStore::new(vec![
            fact(2023, 1, VehicleCategory::TwoWheeler, "Honda", 100),
            fact(2023, 2, VehicleCategory::TwoWheeler, "Honda", 110),
            fact(2023, 1, VehicleCategory::ThreeWheeler, "Bajaj", 40),
            fact(2023, 1, VehicleCategory::TwoWheeler, "Bajaj", 70),
            fact(2024, 1, VehicleCategory::FourWheeler, "Tata", 90),
        ])
    }

    #[test]
    fn test_query_filters_by_range_category_and_manufacturer() {
        let store = sample_store();
        let jan = YearMonth::new(2023, 1).unwrap();
        let dec = YearMonth::new(2023, 12).unwrap();

        let all_2023 = store.query(&FactFilter::new(jan, dec)).unwrap();
        assert_eq!(all_2023.len(), 4);

        let bajaj = store
            .query(&FactFilter::new(jan, dec).with_manufacturers(["Bajaj"]))
            .unwrap();
        assert_eq!(bajaj.len(), 2);

        let bajaj_3w = store
            .query(
                &FactFilter::new(jan, dec)
                    .with_categories([VehicleCategory::ThreeWheeler])
                    .with_manufacturers(["Bajaj"]),
            )
            .unwrap();
        assert_eq!(bajaj_3w.len(), 1);
        assert_eq!(bajaj_3w[0].registrations, 40);
    }

    #[test]
    fn test_domain_lists_category_scoped_series() {
        let domain = sample_store().domain().unwrap();

        assert_eq!(domain.first_month, YearMonth::new(2023, 1));
        assert_eq!(domain.last_month, YearMonth::new(2024, 1));
        assert_eq!(domain.series.len(), 4);
        assert_eq!(domain.categories().len(), 3);

        let three_wheelers = BTreeSet::from([VehicleCategory::ThreeWheeler]);
        assert_eq!(
            domain.manufacturers_in(&three_wheelers),
            BTreeSet::from(["Bajaj".to_string()])
        );
    }

    #[test]
    fn test_version_bumps_only_when_facts_are_added() {
        let mut store = InMemoryFactStore::default();
        assert_eq!(store.version().unwrap(), 0);

        store.extend(Vec::new());
        assert_eq!(store.version().unwrap(), 0);

        store.extend(vec![fact(2023, 1, VehicleCategory::TwoWheeler, "Honda", 1)]);
        assert_eq!(store.version().unwrap(), 1);
    }
}
