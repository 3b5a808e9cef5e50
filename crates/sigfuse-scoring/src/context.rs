//! Timing-window ranking for trend context signals.

use sigfuse_core::{round_to, ContextWindow, InputError, ScoringConfig, SignalRecord, TimingAction};

use crate::recency::aggregate;

/// Maximum number of windows returned by [`rank_context_windows`].
pub const CONTEXT_WINDOW_LIMIT: usize = 5;

/// `(trend, season, daypart, situation)`
type ContextKey = (String, String, String, String);

/// Rank trend-context groups by recency-weighted strength.
///
/// Records are grouped by `(trend, season, daypart, situation)`. Strength is
/// the group's decay weight rounded to 2 decimals, and each group's
/// relevance is that reported strength relative to the strongest group,
/// scaled to `[0, 10]` with one decimal; the strongest group always scores
/// exactly `10.0`. Groups at or above `config.act_now_threshold` are labelled
/// "Act Now", the rest "Monitor". The result is sorted by relevance
/// (stable on group encounter order) and truncated to
/// [`CONTEXT_WINDOW_LIMIT`].
///
/// # Errors
///
/// Returns [`InputError`] for a future-dated record or one without context tags.
pub fn rank_context_windows(
    records: &[SignalRecord],
    config: &ScoringConfig,
) -> Result<Vec<ContextWindow>, InputError> {
    let groups = aggregate(records, config.reference_date, config.decay_rate, |r| {
        let tags = r.context.as_ref().ok_or_else(|| InputError::MissingField {
            id: r.id.clone(),
            field: "context tags",
        })?;
        Ok::<ContextKey, InputError>((
            r.category.clone(),
            tags.season.clone(),
            tags.daypart.clone(),
            tags.situation.clone(),
        ))
    })?;

    if groups.is_empty() {
        return Ok(Vec::new());
    }

    let strengths: Vec<f64> = groups.iter().map(|g| round_to(g.weight, 2)).collect();
    let max_strength = strengths.iter().copied().fold(0.0_f64, f64::max);

    let mut windows: Vec<ContextWindow> = groups
        .into_iter()
        .zip(strengths)
        .map(|(group, strength)| {
            let relevance = if max_strength > 0.0 {
                round_to(strength / max_strength * 10.0, 1)
            } else {
                0.0
            };
            let action = if relevance >= config.act_now_threshold {
                TimingAction::ActNow
            } else {
                TimingAction::Monitor
            };
            let first_position = group.members.first().map_or(0, |m| m.position);
            let (trend, season, daypart, situation) = group.key;
            ContextWindow {
                signal_id: format!("CTX-{first_position}"),
                trend,
                season,
                daypart,
                situation,
                timing_strength: strength,
                relevance_score: relevance,
                action,
            }
        })
        .collect();

    windows.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
    windows.truncate(CONTEXT_WINDOW_LIMIT);

    tracing::debug!(
        records = records.len(),
        windows = windows.len(),
        "ranked context windows"
    );

    Ok(windows)
}
