//! Mastery estimation: EWMA smoothing with a staleness penalty.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::clock::days_between;
use crate::model::{EvidenceEvent, Tier, DEFAULT_CONFIDENCE};
use crate::store::{EvidenceStore, SkillWindow};

/// Default EWMA smoothing factor.
pub const DEFAULT_ALPHA: f64 = 0.55;

/// Raw mastery assumed when no accuracy has been reported.
pub const NEUTRAL_MASTERY: f64 = 0.5;

/// Lower bound of the reported mastery.
pub const MASTERY_FLOOR: f64 = 0.05;

/// Upper bound of the reported mastery.
pub const MASTERY_CEILING: f64 = 0.98;

/// Days of staleness that cost one full point of mastery.
const PENALTY_DAYS: f64 = 30.0;

/// Largest staleness penalty.
const MAX_RECENCY_PENALTY: f64 = 0.25;

/// Tunables for the estimator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MasteryParams {
    pub alpha: f64,
}

impl Default for MasteryParams {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
        }
    }
}

impl MasteryParams {
    /// Use `alpha` when it lies in (0, 1], otherwise the default.
    pub fn with_alpha(alpha: f64) -> Self {
        if alpha.is_finite() && alpha > 0.0 && alpha <= 1.0 {
            Self { alpha }
        } else {
            Self::default()
        }
    }
}

/// Exponentially weighted moving average of values clamped to `[0, 1]`.
///
/// Returns `None` for an empty series.
pub fn ewma(values: &[f64], alpha: f64) -> Option<f64> {
    let (first, rest) = values.split_first()?;
    let smoothed = rest.iter().fold(first.clamp(0.0, 1.0), |acc, &x| {
        alpha * x.clamp(0.0, 1.0) + (1.0 - alpha) * acc
    });
    Some(smoothed.clamp(0.0, 1.0))
}

/// Penalty subtracted from raw mastery after `staleness_days` without evidence.
pub fn recency_penalty(staleness_days: i64) -> f64 {
    (staleness_days as f64 / PENALTY_DAYS).clamp(0.0, MAX_RECENCY_PENALTY)
}

/// Mastery estimate for one skill window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillMastery {
    /// Rows in the window.
    pub n: usize,
    /// Smoothed accuracy before the staleness penalty.
    pub raw_mastery: f64,
    /// Staleness-adjusted mastery in `[0.05, 0.98]`.
    pub mastery: f64,
    pub last_ts: i64,
    pub staleness_days: i64,
    /// Tier of the most recent row.
    pub tier: Tier,
    /// Reporting confidence of the most recent row.
    pub confidence: f64,
}

/// Estimate mastery from chronologically ordered rows.
///
/// Rows without an accuracy are skipped rather than counted as zero.
pub fn estimate(
    rows: &[EvidenceEvent],
    last_ts: i64,
    now_ms: i64,
    params: &MasteryParams,
) -> SkillMastery {
    let accuracies: Vec<f64> = rows.iter().filter_map(EvidenceEvent::accuracy).collect();
    let raw_mastery = ewma(&accuracies, params.alpha).unwrap_or(NEUTRAL_MASTERY);
    let staleness_days = days_between(last_ts, now_ms);
    let mastery =
        (raw_mastery - recency_penalty(staleness_days)).clamp(MASTERY_FLOOR, MASTERY_CEILING);
    let latest = rows.last();

    SkillMastery {
        n: rows.len(),
        raw_mastery,
        mastery,
        last_ts,
        staleness_days,
        tier: latest.map(|r| r.tier).unwrap_or_default(),
        confidence: latest
            .map(EvidenceEvent::confidence)
            .unwrap_or(DEFAULT_CONFIDENCE),
    }
}

/// Estimate mastery for a stored window.
pub fn estimate_window(
    window: &SkillWindow,
    now_ms: i64,
    params: &MasteryParams,
) -> SkillMastery {
    estimate(&window.sorted_rows(), window.last_ts, now_ms, params)
}

/// Per-skill mastery for one student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillSnapshot {
    pub student_id: String,
    pub generated_at: i64,
    pub skills: BTreeMap<String, SkillMastery>,
}

/// Snapshot every skill tracked for `student_id` with default parameters.
pub fn student_skill_snapshot(store: &EvidenceStore, student_id: &str) -> SkillSnapshot {
    student_skill_snapshot_with(store, student_id, &MasteryParams::default())
}

pub fn student_skill_snapshot_with(
    store: &EvidenceStore,
    student_id: &str,
    params: &MasteryParams,
) -> SkillSnapshot {
    let now_ms = store.now_ms();
    let skills = store
        .student_skills(student_id)
        .iter()
        .map(|(skill_id, window)| (skill_id.clone(), estimate_window(window, now_ms, params)))
        .collect();

    SkillSnapshot {
        student_id: student_id.to_string(),
        generated_at: now_ms,
        skills,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{FixedClock, DAY_MS};
    use crate::model::EvidenceEventInput;
    use std::sync::Arc;

    const NOW: i64 = 1_760_000_000_000;

    fn row(ts: i64, accuracy: Option<f64>) -> EvidenceEvent {
        let mut input = EvidenceEventInput::new("stu", ["S"]).at_ms(ts);
        if let Some(a) = accuracy {
            input = input.accuracy(a);
        }
        input.normalize(NOW).unwrap()
    }

    #[test]
    fn ewma_matches_recursion() {
        let value = ewma(&[0.6, 0.3, 0.5, 0.4, 0.8], 0.55).unwrap();
        let expected = 0.55 * 0.8 + 0.45 * 0.431_837_5;
        assert!((value - expected).abs() < 1e-12, "got {value}");
        assert!((value - 0.634_326_875).abs() < 1e-12);
        assert!((value - 0.635).abs() < 0.001);
    }

    #[test]
    fn ewma_edge_cases() {
        assert_eq!(ewma(&[], 0.55), None);
        assert_eq!(ewma(&[0.7], 0.55), Some(0.7));
        assert_eq!(ewma(&[1.5, -2.0], 1.0), Some(0.0));
    }

    #[test]
    fn no_accuracy_means_neutral_prior() {
        let rows = vec![row(NOW, None), row(NOW, None)];
        let est = estimate(&rows, NOW, NOW, &MasteryParams::default());
        assert_eq!(est.raw_mastery, NEUTRAL_MASTERY);
        assert_eq!(est.mastery, NEUTRAL_MASTERY);
        assert_eq!(est.n, 2);
    }

    #[test]
    fn missing_accuracy_is_skipped_not_zero() {
        let with_gap = vec![row(NOW - 2, Some(0.8)), row(NOW - 1, None), row(NOW, Some(0.8))];
        let est = estimate(&with_gap, NOW, NOW, &MasteryParams::default());
        assert!((est.raw_mastery - 0.8).abs() < 1e-12);
    }

    #[test]
    fn staleness_penalty_is_capped() {
        let rows = vec![row(NOW - 40 * DAY_MS, Some(0.9))];
        let est = estimate(&rows, NOW - 40 * DAY_MS, NOW, &MasteryParams::default());
        assert_eq!(est.staleness_days, 40);
        assert!((est.mastery - 0.65).abs() < 1e-12);

        let est = estimate(&rows, NOW - 3 * DAY_MS, NOW, &MasteryParams::default());
        assert!((est.mastery - (0.9 - 0.1)).abs() < 1e-12);
    }

    #[test]
    fn mastery_is_bounded() {
        let perfect = vec![row(NOW, Some(1.0))];
        assert_eq!(
            estimate(&perfect, NOW, NOW, &MasteryParams::default()).mastery,
            MASTERY_CEILING
        );
        let zero = vec![row(NOW - 90 * DAY_MS, Some(0.0))];
        assert_eq!(
            estimate(&zero, NOW - 90 * DAY_MS, NOW, &MasteryParams::default()).mastery,
            MASTERY_FLOOR
        );
    }

    #[test]
    fn alpha_outside_unit_interval_falls_back() {
        assert_eq!(MasteryParams::with_alpha(0.3).alpha, 0.3);
        assert_eq!(MasteryParams::with_alpha(0.0).alpha, DEFAULT_ALPHA);
        assert_eq!(MasteryParams::with_alpha(f64::NAN).alpha, DEFAULT_ALPHA);
        assert_eq!(MasteryParams::with_alpha(1.2).alpha, DEFAULT_ALPHA);
    }

    #[test]
    fn snapshot_covers_every_skill() {
        let clock = Arc::new(FixedClock::new(NOW));
        let store = EvidenceStore::in_memory_with_clock(clock.clone());
        for (i, acc) in [0.6, 0.3, 0.5, 0.4, 0.8].iter().enumerate() {
            store.record_evidence(
                EvidenceEventInput::new("stu", ["LIT.DEC.SYL"])
                    .at_ms(NOW - (5 - i as i64) * DAY_MS)
                    .accuracy(*acc)
                    .tier(Tier::T3)
                    .confidence(0.7),
            );
        }
        store.record_evidence(EvidenceEventInput::new("stu", ["LIT.FLU.ACC"]).at_ms(NOW));

        let snapshot = student_skill_snapshot(&store, "stu");
        assert_eq!(snapshot.skills.len(), 2);
        let syl = &snapshot.skills["LIT.DEC.SYL"];
        assert_eq!(syl.n, 5);
        assert_eq!(syl.staleness_days, 1);
        assert!((syl.raw_mastery - 0.634_326_875).abs() < 1e-9);
        assert!((syl.mastery - (syl.raw_mastery - 1.0 / 30.0)).abs() < 1e-12);
        assert_eq!(syl.tier, Tier::T3);
        assert_eq!(syl.confidence, 0.7);

        let flu = &snapshot.skills["LIT.FLU.ACC"];
        assert_eq!(flu.raw_mastery, NEUTRAL_MASTERY);
        assert_eq!(flu.staleness_days, 0);

        clock.advance_days(10);
        let later = student_skill_snapshot(&store, "stu");
        assert!(later.skills["LIT.DEC.SYL"].mastery < syl.mastery);
    }

    #[test]
    fn snapshot_of_unknown_student_is_empty() {
        let store = EvidenceStore::in_memory();
        let snapshot = student_skill_snapshot(&store, "ghost");
        assert_eq!(snapshot.student_id, "ghost");
        assert!(snapshot.skills.is_empty());
    }
}
