// 🚗 Registration Facts - the atomic unit of the engine
// One fact = registrations for one (month, category, manufacturer).
// Facts are produced once by the data source and never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid month '{0}' (expected YYYY-MM or YYYY-MM-DD)")]
    InvalidMonth(String),

    #[error("unknown vehicle category '{0}' (expected 2W, 3W or 4W)")]
    UnknownCategory(String),
}

// ============================================================================
// CALENDAR MONTH
// ============================================================================

/// Calendar month, the natural key granularity of a fact.
///
/// Ordering is chronological (year first, then month).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=9999).contains(&year) && (1..=12).contains(&month) {
            Some(YearMonth { year, month })
        } else {
            None
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn quarter(&self) -> Quarter {
        Quarter::from_month(self.month)
    }

    pub fn year_quarter(&self) -> YearQuarter {
        YearQuarter {
            year: self.year,
            quarter: self.quarter(),
        }
    }

    /// Shift by a signed number of months, crossing year boundaries
    pub fn add_months(&self, delta: i32) -> YearMonth {
        let index = self.year * 12 + (self.month as i32 - 1) + delta;
        YearMonth {
            year: index.div_euclid(12),
            month: index.rem_euclid(12) as u32 + 1,
        }
    }

    /// Same month one year earlier (the YoY baseline month)
    pub fn previous_year(&self) -> YearMonth {
        self.add_months(-12)
    }

    /// Number of months from `self` to `other` (negative when `other` is earlier)
    pub fn months_until(&self, other: YearMonth) -> i32 {
        (other.year * 12 + other.month as i32) - (self.year * 12 + self.month as i32)
    }

    /// Storage form used by the fact store and CSV files: `YYYY-MM-01`
    pub fn to_date_string(&self) -> String {
        format!("{:04}-{:02}-01", self.year, self.month)
    }

    /// Iterate every month from `self` to `end` inclusive
    pub fn iter_until(self, end: YearMonth) -> impl Iterator<Item = YearMonth> {
        let count = self.months_until(end).max(-1) + 1;
        (0..count).map(move |offset| self.add_months(offset))
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = ParseError;

    /// Accepts `YYYY-MM` or `YYYY-MM-DD` (the day and any time part are ignored)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let trimmed = trimmed.split([' ', 'T']).next().unwrap_or(trimmed);
        let invalid = || ParseError::InvalidMonth(s.to_string());

        let date = chrono::NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .or_else(|_| chrono::NaiveDate::parse_from_str(&format!("{}-01", trimmed), "%Y-%m-%d"))
            .map_err(|_| invalid())?;

        use chrono::Datelike;
        YearMonth::new(date.year(), date.month()).ok_or_else(invalid)
    }
}

impl TryFrom<String> for YearMonth {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<YearMonth> for String {
    fn from(value: YearMonth) -> Self {
        value.to_string()
    }
}

// ============================================================================
// QUARTERS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter {
    /// Q1 = Jan-Mar ... Q4 = Oct-Dec
    pub fn from_month(month: u32) -> Quarter {
        match month {
            1..=3 => Quarter::Q1,
            4..=6 => Quarter::Q2,
            7..=9 => Quarter::Q3,
            _ => Quarter::Q4,
        }
    }

    pub fn first_month(&self) -> u32 {
        match self {
            Quarter::Q1 => 1,
            Quarter::Q2 => 4,
            Quarter::Q3 => 7,
            Quarter::Q4 => 10,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Quarter::Q1 => "Q1",
            Quarter::Q2 => "Q2",
            Quarter::Q3 => "Q3",
            Quarter::Q4 => "Q4",
        }
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A quarter anchored to a year, e.g. 2024-Q1
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearQuarter {
    pub year: i32,
    pub quarter: Quarter,
}

impl YearQuarter {
    /// The immediately preceding quarter. Q1 wraps to Q4 of the prior year.
    pub fn previous(&self) -> YearQuarter {
        match self.quarter {
            Quarter::Q1 => YearQuarter {
                year: self.year - 1,
                quarter: Quarter::Q4,
            },
            Quarter::Q2 => YearQuarter {
                year: self.year,
                quarter: Quarter::Q1,
            },
            Quarter::Q3 => YearQuarter {
                year: self.year,
                quarter: Quarter::Q2,
            },
            Quarter::Q4 => YearQuarter {
                year: self.year,
                quarter: Quarter::Q3,
            },
        }
    }

    /// The three constituent months, in order
    pub fn months(&self) -> [YearMonth; 3] {
        let first = YearMonth {
            year: self.year,
            month: self.quarter.first_month(),
        };
        [first, first.add_months(1), first.add_months(2)]
    }
}

impl fmt::Display for YearQuarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.year, self.quarter)
    }
}

// ============================================================================
// VEHICLE CATEGORY
// ============================================================================

/// Fixed set of categories. They are not substitute goods, so shares are
/// always computed within a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VehicleCategory {
    #[serde(rename = "2W")]
    TwoWheeler,
    #[serde(rename = "3W")]
    ThreeWheeler,
    #[serde(rename = "4W")]
    FourWheeler,
}

impl VehicleCategory {
    pub const ALL: [VehicleCategory; 3] = [
        VehicleCategory::TwoWheeler,
        VehicleCategory::ThreeWheeler,
        VehicleCategory::FourWheeler,
    ];

    /// Short code used in storage and CSV files
    pub fn code(&self) -> &'static str {
        match self {
            VehicleCategory::TwoWheeler => "2W",
            VehicleCategory::ThreeWheeler => "3W",
            VehicleCategory::FourWheeler => "4W",
        }
    }

    /// Human-readable name for display
    pub fn name(&self) -> &'static str {
        match self {
            VehicleCategory::TwoWheeler => "Two-Wheeler",
            VehicleCategory::ThreeWheeler => "Three-Wheeler",
            VehicleCategory::FourWheeler => "Four-Wheeler",
        }
    }
}

impl fmt::Display for VehicleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for VehicleCategory {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "2w" | "twowheeler" => Ok(VehicleCategory::TwoWheeler),
            "3w" | "threewheeler" => Ok(VehicleCategory::ThreeWheeler),
            "4w" | "fourwheeler" => Ok(VehicleCategory::FourWheeler),
            _ => Err(ParseError::UnknownCategory(s.to_string())),
        }
    }
}

// ============================================================================
// SERIES KEY
// ============================================================================

/// Identity of a manufacturer. A name is only meaningful inside a category:
/// "Bajaj" in 2W and "Bajaj" in 3W are two different series.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SeriesKey {
    pub category: VehicleCategory,
    pub manufacturer: String,
}

impl SeriesKey {
    pub fn new(category: VehicleCategory, manufacturer: impl Into<String>) -> Self {
        SeriesKey {
            category,
            manufacturer: manufacturer.into(),
        }
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.manufacturer, self.category)
    }
}

// ============================================================================
// REGISTRATION FACT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationFact {
    pub month: YearMonth,
    pub category: VehicleCategory,
    pub manufacturer: String,
    pub registrations: u64,
}

impl RegistrationFact {
    pub fn new(
        month: YearMonth,
        category: VehicleCategory,
        manufacturer: impl Into<String>,
        registrations: u64,
    ) -> Self {
        RegistrationFact {
            month,
            category,
            manufacturer: manufacturer.into(),
            registrations,
        }
    }

    /// Derived from the month, never stored on its own
    pub fn quarter(&self) -> Quarter {
        self.month.quarter()
    }

    pub fn series_key(&self) -> SeriesKey {
        SeriesKey::new(self.category, self.manufacturer.clone())
    }

    pub fn is_same_series(&self, key: &SeriesKey) -> bool {
        self.category == key.category && self.manufacturer == key.manufacturer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ym(year: i32, month: u32) -> YearMonth {
        YearMonth::new(year, month).unwrap()
    }

    #[test]
    fn test_year_month_parsing() {
        assert_eq!("2024-03".parse::<YearMonth>().unwrap(), ym(2024, 3));
        assert_eq!("2024-03-31".parse::<YearMonth>().unwrap(), ym(2024, 3));
        assert_eq!("2024-03-31 00:00:00".parse::<YearMonth>().unwrap(), ym(2024, 3));
        assert!("2024-13".parse::<YearMonth>().is_err());
        assert!("March 2024".parse::<YearMonth>().is_err());
        assert_eq!(ym(2024, 3).to_string(), "2024-03");
        assert_eq!(ym(2024, 3).to_date_string(), "2024-03-01");
    }

    #[test]
    fn test_add_months_crosses_year_boundaries() {
        assert_eq!(ym(2024, 1).add_months(-1), ym(2023, 12));
        assert_eq!(ym(2023, 12).add_months(1), ym(2024, 1));
        assert_eq!(ym(2024, 5).previous_year(), ym(2023, 5));
        assert_eq!(ym(2024, 2).add_months(-14), ym(2022, 12));
        assert_eq!(ym(2023, 11).months_until(ym(2024, 2)), 3);
    }

    #[test]
    fn test_iter_until() {
        let months: Vec<_> = ym(2023, 11).iter_until(ym(2024, 2)).collect();
        assert_eq!(months, vec![ym(2023, 11), ym(2023, 12), ym(2024, 1), ym(2024, 2)]);
        assert_eq!(ym(2024, 2).iter_until(ym(2023, 1)).count(), 0);
    }

    #[test]
    fn test_quarter_derivation() {
        assert_eq!(ym(2024, 1).quarter(), Quarter::Q1);
        assert_eq!(ym(2024, 3).quarter(), Quarter::Q1);
        assert_eq!(ym(2024, 4).quarter(), Quarter::Q2);
        assert_eq!(ym(2024, 9).quarter(), Quarter::Q3);
        assert_eq!(ym(2024, 12).quarter(), Quarter::Q4);
    }

    #[test]
    fn test_previous_quarter_wraps_q1_to_prior_year_q4() {
        let q1 = ym(2024, 2).year_quarter();
        let prev = q1.previous();

        assert_eq!(prev, YearQuarter { year: 2023, quarter: Quarter::Q4 });
        assert_eq!(prev.months(), [ym(2023, 10), ym(2023, 11), ym(2023, 12)]);
        assert_eq!(ym(2024, 8).year_quarter().previous().months()[0], ym(2024, 4));
    }

    #[test]
    fn test_category_parsing() {
        assert_eq!("2W".parse::<VehicleCategory>().unwrap(), VehicleCategory::TwoWheeler);
        assert_eq!("three-wheeler".parse::<VehicleCategory>().unwrap(), VehicleCategory::ThreeWheeler);
        assert_eq!("FourWheeler".parse::<VehicleCategory>().unwrap(), VehicleCategory::FourWheeler);
        assert!("5W".parse::<VehicleCategory>().is_err());
    }

    #[test]
    fn test_series_identity_is_category_scoped() {
        let two = SeriesKey::new(VehicleCategory::TwoWheeler, "Bajaj");
        let three = SeriesKey::new(VehicleCategory::ThreeWheeler, "Bajaj");
        assert_ne!(two, three);
        assert_eq!(two.to_string(), "Bajaj (2W)");
    }

    #[test]
    fn test_year_month_serde_as_string() {
        let json = serde_json::to_string(&ym(2024, 7)).unwrap();
        assert_eq!(json, "\"2024-07\"");
        let back: YearMonth = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ym(2024, 7));
    }
}
