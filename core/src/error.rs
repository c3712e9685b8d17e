use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Data source '{source_name}' unavailable: {reason}")]
    UpstreamUnavailable { source_name: String, reason: String },

    #[error("Invalid date range: end {end} is before start {start}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("Invalid month {month}: expected 1-12")]
    InvalidMonth { month: u32 },

    #[error("Invalid months limit {months_limit}: must be at least 1")]
    InvalidMonthsLimit { months_limit: i32 },

    #[error("No seasonal history for month {month}")]
    NoSeasonalHistory { month: u32 },

    #[error("No daily history for month {month}, day of week {day_of_week}")]
    NoDailyHistory { month: u32, day_of_week: u32 },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AnalyticsError {
    /// True when the failure is about reaching data, not about the data itself.
    /// Presentation shows a connection error instead of "no data" for these.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::UpstreamUnavailable { .. })
    }

    /// True for caller contract violations (bad month, range or horizon).
    pub fn is_invalid_parameter(&self) -> bool {
        matches!(
            self,
            Self::InvalidDateRange { .. } | Self::InvalidMonth { .. } | Self::InvalidMonthsLimit { .. }
        )
    }
}

pub type AnalyticsResult<T> = Result<T, AnalyticsError>;
