//! Exponential recency decay and weighted grouping.

use std::collections::HashMap;
use std::hash::Hash;

use chrono::NaiveDate;
use sigfuse_core::{InputError, SignalRecord};

/// One record's contribution to a [`WeightedGroup`].
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedMember {
    pub id: String,
    /// Index of the record in the sequence handed to [`aggregate`].
    pub position: usize,
    pub weight: f64,
}

/// Records sharing a grouping key, with their summed decay weight.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedGroup<K> {
    pub key: K,
    pub weight: f64,
    pub members: Vec<WeightedMember>,
}

impl<K> WeightedGroup<K> {
    pub fn member_ids(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|m| m.id.as_str())
    }

    /// The least-decayed member; the earliest one wins ties.
    #[must_use]
    pub fn strongest_member(&self) -> Option<&WeightedMember> {
        let mut best: Option<&WeightedMember> = None;
        for member in &self.members {
            match best {
                Some(b) if member.weight <= b.weight => {}
                _ => best = Some(member),
            }
        }
        best
    }
}

/// Decay weight of an observation: `exp(-decay_rate * age_in_days)`.
///
/// Age is the whole-day difference `reference_date - observed_on`. A weight
/// is always in `(0, 1]` for a non-negative rate, and strictly decreasing in
/// age for a positive one.
///
/// # Errors
///
/// - [`InputError::NegativeAge`] if `observed_on` is after `reference_date`.
/// - [`InputError::InvalidParameter`] if `decay_rate` is negative or not finite.
pub fn weight(
    observed_on: NaiveDate,
    reference_date: NaiveDate,
    decay_rate: f64,
) -> Result<f64, InputError> {
    if !decay_rate.is_finite() || decay_rate < 0.0 {
        return Err(InputError::InvalidParameter {
            name: "decay_rate",
            reason: format!("must be a non-negative number, got {decay_rate}"),
        });
    }
    let age = (reference_date - observed_on).num_days();
    if age < 0 {
        return Err(InputError::NegativeAge { days: -age });
    }
    #[allow(clippy::cast_precision_loss)]
    let age = age as f64;
    Ok((-decay_rate * age).exp())
}

/// Group records by `key_fn`, summing decay weights per group.
///
/// Groups come back in first-encounter order and members keep input order,
/// so identical input always yields identical groups and sums.
///
/// # Errors
///
/// - [`InputError::FutureDated`] for a record dated after `reference_date`.
/// - Any error returned by `key_fn` or [`weight`].
pub fn aggregate<'a, I, K, F>(
    records: I,
    reference_date: NaiveDate,
    decay_rate: f64,
    mut key_fn: F,
) -> Result<Vec<WeightedGroup<K>>, InputError>
where
    I: IntoIterator<Item = &'a SignalRecord>,
    K: Eq + Hash + Clone,
    F: FnMut(&SignalRecord) -> Result<K, InputError>,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<WeightedGroup<K>> = Vec::new();

    for (position, record) in records.into_iter().enumerate() {
        let w = weight(record.observed_on, reference_date, decay_rate).map_err(|e| match e {
            InputError::NegativeAge { .. } => InputError::FutureDated {
                id: record.id.clone(),
                observed_on: record.observed_on,
                reference_date,
            },
            other => other,
        })?;
        let key = key_fn(record)?;

        let slot = *index.entry(key.clone()).or_insert_with(|| {
            groups.push(WeightedGroup {
                key,
                weight: 0.0,
                members: Vec::new(),
            });
            groups.len() - 1
        });

        let group = &mut groups[slot];
        group.weight += w;
        group.members.push(WeightedMember {
            id: record.id.clone(),
            position,
            weight: w,
        });
    }

    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, d).unwrap()
    }

    fn today() -> NaiveDate {
        day(24)
    }

    #[test]
    fn same_day_weight_is_one() {
        assert_eq!(weight(today(), today(), 0.05).unwrap(), 1.0);
    }

    #[test]
    fn weight_matches_exponential_decay() {
        let w = weight(day(14), today(), 0.05).unwrap();
        assert!((w - (-0.5_f64).exp()).abs() < 1e-12, "got {w}");
    }

    #[test]
    fn weight_strictly_decreases_with_age() {
        let mut previous = f64::INFINITY;
        for age in 0..120 {
            let observed = today() - chrono::Duration::days(age);
            let w = weight(observed, today(), 0.05).unwrap();
            assert!(w < previous, "age {age}: {w} !< {previous}");
            assert!(w > 0.0 && w <= 1.0);
            previous = w;
        }
    }

    #[test]
    fn smaller_rate_retains_more_weight() {
        let slow = weight(day(4), today(), 0.01).unwrap();
        let fast = weight(day(4), today(), 0.05).unwrap();
        assert!(slow > fast);
    }

    #[test]
    fn future_dated_observation_is_rejected() {
        let next_week = today() + chrono::Duration::days(7);
        let err = weight(next_week, today(), 0.05).unwrap_err();
        assert_eq!(err, InputError::NegativeAge { days: 7 });
    }

    #[test]
    fn negative_rate_is_rejected() {
        let err = weight(today(), today(), -0.1).unwrap_err();
        assert!(matches!(
            err,
            InputError::InvalidParameter {
                name: "decay_rate",
                ..
            }
        ));
    }

    #[test]
    fn aggregate_groups_in_encounter_order() {
        let records = vec![
            SignalRecord::competitor("a", "BOGO", "Taco Bell", today()),
            SignalRecord::competitor("b", "Loyalty Multiplier", "Taco Bell", day(23)),
            SignalRecord::competitor("c", "BOGO", "Burger King", day(14)),
        ];
        let groups = aggregate(&records, today(), 0.05, |r| Ok(r.category.clone())).unwrap();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key, "BOGO");
        assert_eq!(groups[1].key, "Loyalty Multiplier");
        assert_eq!(groups[0].member_ids().collect::<Vec<_>>(), vec!["a", "c"]);
        let expected = 1.0 + (-0.5_f64).exp();
        assert!((groups[0].weight - expected).abs() < 1e-12);
    }

    #[test]
    fn aggregate_is_stable_across_runs() {
        let records: Vec<SignalRecord> = (0..40)
            .map(|i| {
                let mechanic = ["BOGO", "Gamified App Challenge", "Loyalty Multiplier"][i % 3];
                let observed = today() - chrono::Duration::days(i64::try_from(i).unwrap());
                SignalRecord::competitor(&format!("r{i}"), mechanic, "McDonald's", observed)
            })
            .collect();

        let first = aggregate(&records, today(), 0.05, |r| Ok(r.category.clone())).unwrap();
        let second = aggregate(&records, today(), 0.05, |r| Ok(r.category.clone())).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn aggregate_reports_future_dated_record_id() {
        let records = vec![SignalRecord::competitor(
            "late",
            "BOGO",
            "Taco Bell",
            today() + chrono::Duration::days(1),
        )];
        let err = aggregate(&records, today(), 0.05, |r| Ok(r.category.clone())).unwrap_err();
        assert!(matches!(err, InputError::FutureDated { ref id, .. } if id == "late"));
    }

    #[test]
    fn strongest_member_prefers_first_on_tie() {
        let records = vec![
            SignalRecord::competitor("old", "BOGO", "Taco Bell", day(10)),
            SignalRecord::competitor("new-1", "BOGO", "Taco Bell", day(20)),
            SignalRecord::competitor("new-2", "BOGO", "Taco Bell", day(20)),
        ];
        let groups = aggregate(&records, today(), 0.05, |r| Ok(r.category.clone())).unwrap();
        assert_eq!(groups[0].strongest_member().unwrap().id, "new-1");
    }

    #[test]
    fn empty_input_yields_no_groups() {
        let records: Vec<SignalRecord> = Vec::new();
        let groups = aggregate(&records, today(), 0.05, |r| Ok(r.category.clone())).unwrap();
        assert!(groups.is_empty());
    }
}
