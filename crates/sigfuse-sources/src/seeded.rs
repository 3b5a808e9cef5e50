//! Synthetic market records drawn from fixed vocabularies.

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use sigfuse_core::{ContextTags, SamplingConfig, SignalRecord};

use crate::error::SourceError;
use crate::SignalSource;

pub const BRANDS: &[&str] = &["McDonald's", "Burger King", "Taco Bell"];
pub const MECHANICS: &[&str] = &["BOGO", "Gamified App Challenge", "Loyalty Multiplier"];
pub const TRENDS: &[&str] = &[
    "Gamified Rewards",
    "Subscription Meal Bundles",
    "Surprise & Delight",
    "Late-Night Value",
    "App-Exclusive Perks",
];
pub const SEASONS: &[&str] = &["Winter", "Spring", "Summer", "Fall"];
pub const DAYPARTS: &[&str] = &["Breakfast", "Lunch", "Dinner", "Late Night"];
pub const SITUATIONS: &[&str] = &["Cold Weather", "Payday", "Commute", "Weekend"];
pub const CHANNELS: &[&str] = &["Reddit", "TikTok", "Press", "Food Blogs"];

/// Random sampler over the vocabularies above.
///
/// With `config.seed` set, every call draws from a fresh generator seeded the
/// same way, so repeated runs produce identical records. Without a seed the
/// generator is seeded from OS entropy on each call.
#[derive(Debug, Clone)]
pub struct SeededSource {
    config: SamplingConfig,
}

impl SeededSource {
    #[must_use]
    pub fn new(config: SamplingConfig) -> Self {
        Self { config }
    }

    /// Fresh generator for one domain. The domain salt keeps the competitor
    /// and context streams independent under a shared seed.
    fn rng(&self, salt: u64) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ salt),
            None => StdRng::from_os_rng(),
        }
    }
}

impl SignalSource for SeededSource {
    fn competitor_records(
        &self,
        reference_date: NaiveDate,
    ) -> Result<Vec<SignalRecord>, SourceError> {
        let mut rng = self.rng(0x636f_6d70);
        let lookback = self.config.competitor_lookback_days;
        let records: Vec<SignalRecord> = (0..self.config.competitor_sample_size)
            .map(|_| SignalRecord {
                id: short_id(&mut rng),
                channel: pick(&mut rng, BRANDS),
                category: pick(&mut rng, MECHANICS),
                observed_on: date_within(&mut rng, reference_date, lookback),
                context: None,
            })
            .collect();

        tracing::debug!(
            count = records.len(),
            seeded = self.config.seed.is_some(),
            "sampled competitor records"
        );
        Ok(records)
    }

    fn context_records(&self, reference_date: NaiveDate) -> Result<Vec<SignalRecord>, SourceError> {
        let mut rng = self.rng(0x6374_7874);
        let lookback = self.config.context_lookback_days;
        let records: Vec<SignalRecord> = (0..self.config.context_sample_size)
            .map(|_| {
                let trend = pick(&mut rng, TRENDS);
                let context = ContextTags {
                    season: pick(&mut rng, SEASONS),
                    daypart: pick(&mut rng, DAYPARTS),
                    situation: pick(&mut rng, SITUATIONS),
                };
                SignalRecord {
                    id: short_id(&mut rng),
                    category: trend,
                    channel: pick(&mut rng, CHANNELS),
                    observed_on: date_within(&mut rng, reference_date, lookback),
                    context: Some(context),
                }
            })
            .collect();

        tracing::debug!(
            count = records.len(),
            seeded = self.config.seed.is_some(),
            "sampled context records"
        );
        Ok(records)
    }
}

fn pick(rng: &mut StdRng, options: &[&str]) -> String {
    options
        .choose(rng)
        .map(|s| (*s).to_string())
        .unwrap_or_default()
}

/// A date in `[reference_date - lookback_days, reference_date]`.
fn date_within(rng: &mut StdRng, reference_date: NaiveDate, lookback_days: u32) -> NaiveDate {
    let age = rng.random_range(0..=lookback_days);
    reference_date - Duration::days(i64::from(age))
}

/// First 8 hex characters of a random UUID.
fn short_id(rng: &mut StdRng) -> String {
    let mut bytes = [0u8; 16];
    rng.fill(&mut bytes);
    let uuid = uuid::Builder::from_random_bytes(bytes).into_uuid();
    uuid.simple().to_string()[..8].to_string()
}
