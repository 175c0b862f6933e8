// 🎲 Synthetic Data Generator
// Monthly registrations per manufacturer, deterministic for a given seed.
//
// registrations = base(category) × share(manufacturer)
//               × (1 + annual_growth)^(year - start_year)
//               × seasonal(month) × covid(year, month) × uniform(0.85, 1.15)

use crate::config::GeneratorConfig;
use crate::fact::{RegistrationFact, VehicleCategory, YearMonth};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// Manufacturers per category with their simulated share of category volume
pub const MANUFACTURER_SHARES: [(VehicleCategory, &[(&str, f64)]); 3] = [
    (
        VehicleCategory::TwoWheeler,
        &[
            ("Hero MotoCorp", 0.35),
            ("Honda", 0.25),
            ("TVS", 0.15),
            ("Bajaj", 0.12),
            ("Yamaha", 0.08),
            ("Royal Enfield", 0.05),
        ],
    ),
    (
        VehicleCategory::ThreeWheeler,
        &[
            ("Bajaj", 0.45),
            ("Mahindra", 0.25),
            ("TVS", 0.15),
            ("Piaggio", 0.10),
            ("Atul Auto", 0.05),
        ],
    ),
    (
        VehicleCategory::FourWheeler,
        &[
            ("Maruti Suzuki", 0.40),
            ("Hyundai", 0.18),
            ("Tata", 0.12),
            ("Mahindra", 0.10),
            ("Kia", 0.08),
            ("Toyota", 0.07),
            ("MG Motor", 0.05),
        ],
    ),
];

/// Monthly category volume before any factor is applied
pub fn base_volume(category: VehicleCategory) -> f64 {
    match category {
        VehicleCategory::TwoWheeler => 1_200_000.0,
        VehicleCategory::ThreeWheeler => 25_000.0,
        VehicleCategory::FourWheeler => 280_000.0,
    }
}

pub fn seasonal_factor(month: u32) -> f64 {
    match month {
        10 | 11 => 1.3, // festive season
        3 | 4 => 1.1,   // financial year end
        7 | 8 => 0.8,   // monsoon
        _ => 1.0,
    }
}

pub fn covid_factor(year: i32, month: u32) -> f64 {
    match (year, month) {
        (2020, 3..=12) => 0.6,
        (2021, 1..=6) => 0.75,
        _ => 1.0,
    }
}

pub struct SyntheticGenerator {
    config: GeneratorConfig,
    rng: ChaCha8Rng,
}

impl SyntheticGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        SyntheticGenerator { config, rng }
    }

    /// One fact per (month, category, manufacturer) from January of
    /// `start_year` to December of `end_year`
    pub fn generate(&mut self) -> Vec<RegistrationFact> {
        let (Some(first), Some(last)) = (
            YearMonth::new(self.config.start_year, 1),
            YearMonth::new(self.config.end_year, 12),
        ) else {
            return Vec::new();
        };

        let mut facts = Vec::new();
        for month in first.iter_until(last) {
            let growth = (1.0 + self.config.annual_growth)
                .powi(month.year() - self.config.start_year);
            let factor = growth * seasonal_factor(month.month()) * covid_factor(month.year(), month.month());

            for (category, manufacturers) in MANUFACTURER_SHARES.iter() {
                for (name, share) in manufacturers.iter() {
                    let random_factor: f64 = self.rng.gen_range(0.85..1.15);
                    let registrations = (base_volume(*category) * share * factor * random_factor) as u64;
                    facts.push(RegistrationFact::new(month, *category, *name, registrations));
                }
            }
        }

        debug!(
            seed = self.config.seed,
            facts = facts.len(),
            from = %first,
            to = %last,
            "synthetic facts generated"
        );
        facts
    }
}

pub fn generate(config: &GeneratorConfig) -> Vec<RegistrationFact> {
    SyntheticGenerator::new(config.clone()).generate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::check_density;

    fn registrations(facts: &[RegistrationFact], year: i32, month: u32, category: VehicleCategory, name: &str) -> u64 {
        facts
            .iter()
            .find(|f| {
                f.month == YearMonth::new(year, month).unwrap()
                    && f.category == category
                    && f.manufacturer == name
            })
            .map(|f| f.registrations)
            .unwrap()
    }

    #[test]
    fn test_same_seed_same_data() {
        let config = GeneratorConfig::default();
        assert_eq!(generate(&config), generate(&config));

        let other = GeneratorConfig {
            seed: 7,
            ..GeneratorConfig::default()
        };
        assert_ne!(generate(&config), generate(&other));
    }

    #[test]
    fn test_dense_grid_for_every_series() {
        let facts = generate(&GeneratorConfig::default());
        let series: usize = MANUFACTURER_SHARES.iter().map(|(_, m)| m.len()).sum();

        assert_eq!(series, 18);
        assert_eq!(facts.len(), 60 * series);

        let report = check_density(&facts);
        assert!(report.is_dense());
        assert!(!report.has_critical_issues());
    }

    #[test]
    fn test_shares_per_category_sum_to_one() {
        for (_, manufacturers) in MANUFACTURER_SHARES.iter() {
            let total: f64 = manufacturers.iter().map(|(_, s)| s).sum();
            assert!((total - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_factors_shape_the_series() {
        let facts = generate(&GeneratorConfig::default());
        let two = VehicleCategory::TwoWheeler;

        // festive October beats monsoon July even at opposite random extremes
        for year in 2021..=2024 {
            assert!(registrations(&facts, year, 10, two, "Honda") > registrations(&facts, year, 7, two, "Honda"));
        }

        // April 2020: base × share × 1.1 seasonal × 0.6 covid × [0.85, 1.15]
        let april = registrations(&facts, 2020, 4, two, "Hero MotoCorp") as f64;
        let expected = 1_200_000.0 * 0.35 * 1.1 * 0.6;
        assert!(april >= expected * 0.85 - 1.0 && april <= expected * 1.15);
    }

    #[test]
    fn test_factor_tables() {
        assert_eq!(seasonal_factor(11), 1.3);
        assert_eq!(seasonal_factor(8), 0.8);
        assert_eq!(seasonal_factor(1), 1.0);
        assert_eq!(covid_factor(2020, 2), 1.0);
        assert_eq!(covid_factor(2020, 3), 0.6);
        assert_eq!(covid_factor(2021, 6), 0.75);
        assert_eq!(covid_factor(2021, 7), 1.0);
    }

    #[test]
    fn test_inverted_years_generate_nothing() {
        let config = GeneratorConfig {
            start_year: 2025,
            end_year: 2024,
            ..GeneratorConfig::default()
        };
        assert!(generate(&config).is_empty());
    }
}
