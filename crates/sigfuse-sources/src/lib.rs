//! Signal sources feeding the fusion pipeline.
//!
//! The pipeline only depends on the [`SignalSource`] shape. Two
//! implementations ship here: [`FixtureSource`] (fixed records, for tests and
//! replayable runs) and [`SeededSource`] (random sampling, reproducible when
//! seeded).

pub mod error;
pub mod fixture;
pub mod insights;
pub mod seeded;

use chrono::NaiveDate;
use sigfuse_core::SignalRecord;

pub use error::SourceError;
pub use fixture::FixtureSource;
pub use insights::default_customer_insights;
pub use seeded::SeededSource;

/// Supplier of raw, timestamped market records.
///
/// Implementations must only return records dated on or before `reference_date`.
pub trait SignalSource: Send + Sync {
    /// Competitor promotion activity: `category` = mechanic, `channel` = brand.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the records cannot be produced.
    fn competitor_records(&self, reference_date: NaiveDate)
        -> Result<Vec<SignalRecord>, SourceError>;

    /// Trend-context observations carrying season / daypart / situation tags.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the records cannot be produced.
    fn context_records(&self, reference_date: NaiveDate)
        -> Result<Vec<SignalRecord>, SourceError>;

    /// Customer behavior insight lines.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the insights cannot be produced.
    fn customer_insights(&self) -> Result<Vec<String>, SourceError> {
        Ok(default_customer_insights())
    }
}
