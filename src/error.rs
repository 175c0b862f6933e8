// ❗ Analytics Errors
// Only the failures a caller must act on live here. Missing history and
// empty windows are values (Growth::InsufficientHistory, empty vectors),
// never errors.

use crate::fact::{VehicleCategory, YearMonth};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    /// Filter is malformed or references something the store has never seen
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// Two facts share one (month, category, manufacturer) key
    #[error(
        "data integrity violation: {count} facts for {manufacturer} ({category}) in {month}"
    )]
    DataIntegrityViolation {
        month: YearMonth,
        category: VehicleCategory,
        manufacturer: String,
        count: usize,
    },

    #[error("fact store error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("fact store unavailable: {0}")]
    StoreUnavailable(String),
}

impl AnalyticsError {
    /// Errors caused by the request rather than by the data or the store
    pub fn is_client_error(&self) -> bool {
        matches!(self, AnalyticsError::InvalidFilter(_))
    }
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
