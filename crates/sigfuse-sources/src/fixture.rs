//! Fixed-record source, loadable from YAML.

use std::collections::HashSet;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;
use sigfuse_core::SignalRecord;

use crate::error::SourceError;
use crate::insights::default_customer_insights;
use crate::SignalSource;

/// Serves the same records on every call.
///
/// Records are returned as-is: a record dated after the reference date is
/// passed through so the owning scoring stage can reject it.
#[derive(Debug, Clone, Default)]
pub struct FixtureSource {
    pub competitor: Vec<SignalRecord>,
    pub context: Vec<SignalRecord>,
    pub insights: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct FixtureFile {
    #[serde(default)]
    competitor: Vec<SignalRecord>,
    #[serde(default)]
    context: Vec<SignalRecord>,
    #[serde(default)]
    customer_insights: Option<Vec<String>>,
}

impl FixtureSource {
    #[must_use]
    pub fn new(competitor: Vec<SignalRecord>, context: Vec<SignalRecord>) -> Self {
        Self {
            competitor,
            context,
            insights: None,
        }
    }

    #[must_use]
    pub fn with_insights(mut self, insights: Vec<String>) -> Self {
        self.insights = Some(insights);
        self
    }

    /// Load fixtures from a YAML file with optional `competitor`, `context`
    /// and `customer_insights` sections.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the file cannot be read, parsed, or fails validation.
    pub fn from_yaml_path(path: &Path) -> Result<Self, SourceError> {
        let content = std::fs::read_to_string(path).map_err(|e| SourceError::FixtureIo {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Parse fixtures from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the YAML is malformed or fails validation.
    pub fn from_yaml_str(content: &str) -> Result<Self, SourceError> {
        let file: FixtureFile = serde_yaml::from_str(content)?;
        validate_records(&file.competitor, "competitor")?;
        validate_records(&file.context, "context")?;
        Ok(Self {
            competitor: file.competitor,
            context: file.context,
            insights: file.customer_insights,
        })
    }
}

impl SignalSource for FixtureSource {
    fn competitor_records(
        &self,
        _reference_date: NaiveDate,
    ) -> Result<Vec<SignalRecord>, SourceError> {
        Ok(self.competitor.clone())
    }

    fn context_records(&self, _reference_date: NaiveDate) -> Result<Vec<SignalRecord>, SourceError> {
        Ok(self.context.clone())
    }

    fn customer_insights(&self) -> Result<Vec<String>, SourceError> {
        Ok(self
            .insights
            .clone()
            .unwrap_or_else(default_customer_insights))
    }
}

fn validate_records(records: &[SignalRecord], section: &str) -> Result<(), SourceError> {
    let mut seen_ids = HashSet::new();
    for record in records {
        if record.id.trim().is_empty() {
            return Err(SourceError::Validation(format!(
                "{section} record with empty id"
            )));
        }
        if record.category.trim().is_empty() {
            return Err(SourceError::Validation(format!(
                "{section} record '{}' has an empty category",
                record.id
            )));
        }
        if !seen_ids.insert(record.id.as_str()) {
            return Err(SourceError::Validation(format!(
                "duplicate {section} record id: '{}'",
                record.id
            )));
        }
    }
    Ok(())
}
