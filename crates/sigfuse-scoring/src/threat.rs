//! Competitor gap scoring.

use std::collections::BTreeSet;

use sigfuse_core::{round_to, InputError, ScoringConfig, SignalRecord, ThreatEntry};

use crate::recency::{aggregate, WeightedGroup};

/// Upper bound of a threat score.
const MAX_THREAT: f64 = 10.0;

/// Score competitor mechanics the subject brand does not already cover.
///
/// 1. Drop records whose mechanic is in `covered`.
/// 2. Group the rest by mechanic and sum decay weights.
/// 3. Lead brand = brand with the largest summed weight within the mechanic;
///    ties go to the earliest brand in `config.brand_order`, then to the
///    first brand encountered.
/// 4. Score = `min(10, weight / normalizer)`, one decimal.
/// 5. Reference id = least-decayed record of the mechanic.
///
/// Entries come back in mechanic encounter order. An empty gap set is an
/// empty list, not an error.
///
/// # Errors
///
/// Returns [`InputError`] for a future-dated record or a non-positive normalizer.
pub fn score_threats(
    records: &[SignalRecord],
    covered: &BTreeSet<String>,
    config: &ScoringConfig,
) -> Result<Vec<ThreatEntry>, InputError> {
    let normalizer = config.threat_normalizer;
    if !(normalizer.is_finite() && normalizer > 0.0) {
        return Err(InputError::InvalidParameter {
            name: "threat_normalizer",
            reason: format!("must be a positive number, got {normalizer}"),
        });
    }

    let gaps: Vec<&SignalRecord> = records
        .iter()
        .filter(|r| !covered.contains(&r.category))
        .collect();

    let by_mechanic = aggregate(
        gaps.iter().copied(),
        config.reference_date,
        config.decay_rate,
        |r| Ok(r.category.clone()),
    )?;
    let by_brand = aggregate(
        gaps.iter().copied(),
        config.reference_date,
        config.decay_rate,
        |r| Ok((r.category.clone(), r.channel.clone())),
    )?;

    let mut threats = Vec::with_capacity(by_mechanic.len());
    for group in &by_mechanic {
        let brands: Vec<&WeightedGroup<(String, String)>> = by_brand
            .iter()
            .filter(|b| b.key.0 == group.key)
            .collect();
        let Some(leading_brand) = leading_brand(&brands, &config.brand_order) else {
            continue;
        };
        let Some(reference) = group.strongest_member() else {
            continue;
        };

        threats.push(ThreatEntry {
            mechanic: group.key.clone(),
            leading_brand,
            threat_score: round_to((group.weight / normalizer).min(MAX_THREAT), 1),
            reference_id: reference.id.clone(),
        });
    }

    tracing::debug!(
        gap_records = gaps.len(),
        threats = threats.len(),
        "scored competitor threats"
    );

    Ok(threats)
}

/// Render threats as one summary line each.
#[must_use]
pub fn summarize_threats(threats: &[ThreatEntry]) -> String {
    threats
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Pick the brand with the largest summed weight, walking candidates in
/// declared brand order so the first declared brand wins an exact tie.
fn leading_brand(
    brands: &[&WeightedGroup<(String, String)>],
    brand_order: &[String],
) -> Option<String> {
    let rank = |brand: &str, encounter: usize| -> usize {
        brand_order
            .iter()
            .position(|b| b == brand)
            .unwrap_or(brand_order.len() + encounter)
    };

    let mut ordered: Vec<(usize, &WeightedGroup<(String, String)>)> = brands
        .iter()
        .enumerate()
        .map(|(encounter, g)| (rank(&g.key.1, encounter), *g))
        .collect();
    ordered.sort_by_key(|(r, _)| *r);

    let mut best: Option<&WeightedGroup<(String, String)>> = None;
    for (_, group) in ordered {
        match best {
            Some(b) if group.weight <= b.weight => {}
            _ => best = Some(group),
        }
    }
    best.map(|g| g.key.1.clone())
}
