//! Priority ranking of skills that need attention.
//!
//! score = need·0.55 + stalenessNorm·0.25 + (weight − 1)·0.20 − confidence·0.10

use serde::{Deserialize, Serialize};

use crate::ladder::IntensityLadder;
use crate::mastery::{student_skill_snapshot_with, MasteryParams, SkillMastery, SkillSnapshot};
use crate::model::Tier;
use crate::store::EvidenceStore;

/// Skill id of the placeholder row returned when nothing is tracked.
pub const MISSING_EVIDENCE: &str = "MISSING_EVIDENCE";

/// Score of the placeholder row.
pub const MISSING_EVIDENCE_SCORE: f64 = 0.9;

/// Number of skills reported in `top_skills`.
pub const TOP_SKILLS: usize = 3;

const NEED_WEIGHT: f64 = 0.55;
const STALENESS_WEIGHT: f64 = 0.25;
const INTENSITY_WEIGHT: f64 = 0.20;
const CONFIDENCE_WEIGHT: f64 = 0.10;
const MAX_STALENESS_NORM: f64 = 2.0;

/// One ranked skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityRow {
    pub skill_id: String,
    pub priority_score: f64,
    pub need: f64,
    pub staleness_days: i64,
    pub staleness_norm: f64,
    pub tier: Tier,
    pub cadence_days: f64,
    pub intensity_weight: f64,
    pub confidence: f64,
    pub rationale: String,
}

impl PriorityRow {
    /// The placeholder row for a student with no evidence at all.
    pub fn missing_evidence(ladder: &IntensityLadder) -> Self {
        let tier = ladder.tier(Tier::T2);
        Self {
            skill_id: MISSING_EVIDENCE.to_string(),
            priority_score: MISSING_EVIDENCE_SCORE,
            need: 1.0,
            staleness_days: 0,
            staleness_norm: 0.0,
            tier: Tier::T2,
            cadence_days: tier.evidence_cadence_days,
            intensity_weight: tier.priority_weight,
            confidence: 0.0,
            rationale: "No evidence recorded yet; collect a baseline".to_string(),
        }
    }
}

/// Ranked skills for one student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityReport {
    pub student_id: String,
    pub top_skills: Vec<PriorityRow>,
    pub overall_priority: f64,
}

/// Score a single skill against the ladder.
pub fn score_skill(
    skill_id: &str,
    mastery: &SkillMastery,
    ladder: &IntensityLadder,
) -> PriorityRow {
    let tier_cfg = ladder.tier(mastery.tier);
    let cadence_days = tier_cfg.evidence_cadence_days;
    let intensity_weight = tier_cfg.priority_weight;

    let need = 1.0 - mastery.mastery;
    let staleness_norm = if cadence_days > 0.0 {
        (mastery.staleness_days as f64 / cadence_days).clamp(0.0, MAX_STALENESS_NORM)
    } else {
        MAX_STALENESS_NORM
    };
    let confidence = mastery.confidence;
    let priority_score = need * NEED_WEIGHT
        + staleness_norm * STALENESS_WEIGHT
        + (intensity_weight - 1.0) * INTENSITY_WEIGHT
        - confidence * CONFIDENCE_WEIGHT;

    PriorityRow {
        skill_id: skill_id.to_string(),
        priority_score,
        need,
        staleness_days: mastery.staleness_days,
        staleness_norm,
        tier: mastery.tier,
        cadence_days,
        intensity_weight,
        confidence,
        rationale: format!(
            "{skill_id}: mastery {:.0}%, {} day(s) since evidence ({} cadence {}d)",
            mastery.mastery * 100.0,
            mastery.staleness_days,
            mastery.tier,
            cadence_days
        ),
    }
}

/// Every skill in the snapshot, highest priority first. The sort is
/// stable, so equal scores keep snapshot (skill id) order.
pub fn rank_skills(snapshot: &SkillSnapshot, ladder: &IntensityLadder) -> Vec<PriorityRow> {
    let mut rows: Vec<PriorityRow> = snapshot
        .skills
        .iter()
        .map(|(skill_id, mastery)| score_skill(skill_id, mastery, ladder))
        .collect();
    rows.sort_by(|a, b| b.priority_score.total_cmp(&a.priority_score));
    rows
}

/// Build the priority report from an existing snapshot.
pub fn priority_from_snapshot(
    snapshot: &SkillSnapshot,
    ladder: &IntensityLadder,
) -> PriorityReport {
    let mut top_skills = rank_skills(snapshot, ladder);
    top_skills.truncate(TOP_SKILLS);
    if top_skills.is_empty() {
        top_skills.push(PriorityRow::missing_evidence(ladder));
    }
    let overall_priority = top_skills.iter().map(|r| r.priority_score).sum();

    PriorityReport {
        student_id: snapshot.student_id.clone(),
        top_skills,
        overall_priority,
    }
}

/// Rank the skills of `student_id` that most urgently need attention.
pub fn compute_priority(
    store: &EvidenceStore,
    ladder: &IntensityLadder,
    student_id: &str,
) -> PriorityReport {
    compute_priority_with(store, ladder, student_id, &MasteryParams::default())
}

pub fn compute_priority_with(
    store: &EvidenceStore,
    ladder: &IntensityLadder,
    student_id: &str,
    params: &MasteryParams,
) -> PriorityReport {
    let snapshot = student_skill_snapshot_with(store, student_id, params);
    priority_from_snapshot(&snapshot, ladder)
}
