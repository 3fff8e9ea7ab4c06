//! Growth velocity: how fast accuracy on a skill is changing.
//!
//! Velocity is a two-point slope between the first and last accuracy in the
//! most recent rows, in accuracy per week.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::clock::WEEK_MS;
use crate::ladder::IntensityLadder;
use crate::model::{EvidenceEvent, Tier};
use crate::mastery::MasteryParams;
use crate::priority::{compute_priority_with, MISSING_EVIDENCE};
use crate::store::{EvidenceStore, WINDOW_SIZE};

/// Rows considered by default.
pub const DEFAULT_VELOCITY_POINTS: usize = 4;

/// Accuracy points needed before a trend is reported.
pub const MIN_TREND_POINTS: usize = 3;

/// |slope| at or above which a trend is no longer flat.
pub const SLOPE_THRESHOLD: f64 = 0.02;

/// Mean absolute change between consecutive points above which growth is
/// considered variable.
pub const VARIABILITY_THRESHOLD: f64 = 0.15;

const MIN_WEEKS_SPAN: f64 = 0.25;
const INSUFFICIENT_CONFIDENCE: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GrowthDirection {
    Accelerating,
    Flat,
    Declining,
    Insufficient,
}

impl GrowthDirection {
    pub fn classify(slope: f64) -> Self {
        if slope >= SLOPE_THRESHOLD {
            GrowthDirection::Accelerating
        } else if slope <= -SLOPE_THRESHOLD {
            GrowthDirection::Declining
        } else {
            GrowthDirection::Flat
        }
    }
}

impl fmt::Display for GrowthDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GrowthDirection::Accelerating => "ACCELERATING",
            GrowthDirection::Flat => "FLAT",
            GrowthDirection::Declining => "DECLINING",
            GrowthDirection::Insufficient => "INSUFFICIENT",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthResult {
    /// Accuracy change per week.
    pub slope: f64,
    pub direction: GrowthDirection,
    pub weeks_span: f64,
    pub confidence: f64,
}

impl GrowthResult {
    pub fn insufficient() -> Self {
        Self {
            slope: 0.0,
            direction: GrowthDirection::Insufficient,
            weeks_span: 0.0,
            confidence: INSUFFICIENT_CONFIDENCE,
        }
    }
}

/// Velocity over chronologically ordered rows.
pub fn velocity_from_rows(rows: &[EvidenceEvent]) -> GrowthResult {
    let accuracies: Vec<f64> = rows.iter().filter_map(EvidenceEvent::accuracy).collect();
    let (Some(first_row), Some(last_row)) = (rows.first(), rows.last()) else {
        return GrowthResult::insufficient();
    };
    if accuracies.len() < MIN_TREND_POINTS {
        return GrowthResult::insufficient();
    }

    let weeks_span =
        ((last_row.timestamp - first_row.timestamp) as f64 / WEEK_MS as f64).max(MIN_WEEKS_SPAN);
    let slope = (accuracies[accuracies.len() - 1] - accuracies[0]) / weeks_span;

    GrowthResult {
        slope,
        direction: GrowthDirection::classify(slope),
        weeks_span,
        confidence: (rows.len() as f64 / DEFAULT_VELOCITY_POINTS as f64).min(1.0),
    }
}

fn last_rows(
    store: &EvidenceStore,
    student_id: &str,
    skill_id: &str,
    k: usize,
) -> Vec<EvidenceEvent> {
    let k = k.clamp(1, WINDOW_SIZE);
    let mut rows = store.skill_rows(student_id, skill_id);
    let skip = rows.len().saturating_sub(k);
    rows.drain(..skip);
    rows
}

/// Growth velocity over the last `k` rows (clamped to 1..=5) of the pair.
pub fn compute_growth_velocity(
    store: &EvidenceStore,
    student_id: &str,
    skill_id: &str,
    k: usize,
) -> GrowthResult {
    velocity_from_rows(&last_rows(store, student_id, skill_id, k))
}

/// Weekly accuracy gain expected at `tier`.
pub fn expected_growth_rate(ladder: &IntensityLadder, tier: Tier) -> f64 {
    ladder.tier(tier).expected_growth_rate
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthExpectation {
    pub tier: Tier,
    pub slope: f64,
    pub expected_rate: f64,
    pub delta_from_expected: f64,
    pub meets_expectation: bool,
}

/// Compare velocity over the last `k` rows with the rate expected for the
/// latest tier.
pub fn compare_to_expected(
    store: &EvidenceStore,
    ladder: &IntensityLadder,
    student_id: &str,
    skill_id: &str,
    k: usize,
) -> GrowthExpectation {
    let velocity = compute_growth_velocity(store, student_id, skill_id, k);
    let tier = store
        .skill_rows(student_id, skill_id)
        .last()
        .map(|r| r.tier)
        .unwrap_or_default();
    let expected_rate = expected_growth_rate(ladder, tier);

    GrowthExpectation {
        tier,
        slope: velocity.slope,
        expected_rate,
        delta_from_expected: velocity.slope - expected_rate,
        meets_expectation: velocity.direction != GrowthDirection::Insufficient
            && velocity.slope >= expected_rate,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrackState {
    OnTrack,
    Watch,
    OffTrack,
}

impl fmt::Display for TrackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrackState::OnTrack => "ON_TRACK",
            TrackState::Watch => "WATCH",
            TrackState::OffTrack => "OFF_TRACK",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackStatus {
    pub status: TrackState,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill_id: Option<String>,
}

/// Judge whether the student's top-priority skill is growing as expected.
pub fn compute_track_status(
    store: &EvidenceStore,
    ladder: &IntensityLadder,
    student_id: &str,
) -> TrackStatus {
    compute_track_status_with(store, ladder, student_id, &MasteryParams::default())
}

/// Like [`compute_track_status`], ranking skills with `params` so the judged
/// skill is the one priority reports under the same settings.
pub fn compute_track_status_with(
    store: &EvidenceStore,
    ladder: &IntensityLadder,
    student_id: &str,
    params: &MasteryParams,
) -> TrackStatus {
    let priority = compute_priority_with(store, ladder, student_id, params);
    let top = priority
        .top_skills
        .first()
        .filter(|row| row.skill_id != MISSING_EVIDENCE);
    let Some(top) = top else {
        return TrackStatus {
            status: TrackState::Watch,
            reason: "Insufficient growth evidence".into(),
            skill_id: None,
        };
    };

    let cmp = compare_to_expected(
        store,
        ladder,
        student_id,
        &top.skill_id,
        DEFAULT_VELOCITY_POINTS,
    );
    let (status, reason) = if cmp.slope < 0.0 {
        (TrackState::OffTrack, "Negative growth trend vs expected slope")
    } else if cmp.meets_expectation {
        (TrackState::OnTrack, "Growth rate meets tier expectation")
    } else {
        (TrackState::Watch, "Growth below expected rate")
    };

    TrackStatus {
        status,
        reason: reason.into(),
        skill_id: Some(top.skill_id.clone()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stability {
    Stable,
    Variable,
    Insufficient,
}

impl fmt::Display for Stability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stability::Stable => "STABLE",
            Stability::Variable => "VARIABLE",
            Stability::Insufficient => "INSUFFICIENT",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthStability {
    pub stability: Stability,
    /// Mean absolute change between consecutive accuracy points.
    pub mean_abs_change: f64,
    pub points: usize,
}

/// Classify how erratic the accuracy series of the last `k` rows is.
pub fn compute_growth_stability(
    store: &EvidenceStore,
    student_id: &str,
    skill_id: &str,
    k: usize,
) -> GrowthStability {
    let accuracies: Vec<f64> = last_rows(store, student_id, skill_id, k)
        .iter()
        .filter_map(EvidenceEvent::accuracy)
        .collect();
    if accuracies.len() < MIN_TREND_POINTS {
        return GrowthStability {
            stability: Stability::Insufficient,
            mean_abs_change: 0.0,
            points: accuracies.len(),
        };
    }

    let changes: Vec<f64> = accuracies.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
    let mean_abs_change = changes.iter().sum::<f64>() / changes.len() as f64;

    GrowthStability {
        stability: if mean_abs_change > VARIABILITY_THRESHOLD {
            Stability::Variable
        } else {
            Stability::Stable
        },
        mean_abs_change,
        points: accuracies.len(),
    }
}
