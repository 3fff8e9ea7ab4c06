//! The `skillscope growth` command.

use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;

use skillscope_core::growth::{
    compare_to_expected, compute_growth_stability, compute_growth_velocity, GrowthExpectation,
    GrowthResult, GrowthStability,
};

use super::{load, open_store, print_json, resolve_ladder};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GrowthOutput {
    student_id: String,
    skill_id: String,
    velocity: GrowthResult,
    expectation: GrowthExpectation,
    stability: GrowthStability,
}

pub async fn execute(
    student: String,
    skill: String,
    points: usize,
    config_path: Option<PathBuf>,
    format: String,
) -> Result<()> {
    anyhow::ensure!(points >= 1, "points must be at least 1");

    let config = load(config_path)?;
    let store = open_store(&config)?;
    let ladder = resolve_ladder(&config).await?;

    let output = GrowthOutput {
        velocity: compute_growth_velocity(&store, &student, &skill, points),
        expectation: compare_to_expected(&store, &ladder, &student, &skill, points),
        stability: compute_growth_stability(&store, &student, &skill, points),
        student_id: student,
        skill_id: skill,
    };

    if format == "json" {
        return print_json(&output);
    }

    let v = &output.velocity;
    let e = &output.expectation;
    println!("Student {} / {}", output.student_id, output.skill_id);
    println!(
        "  Velocity:    {} ({:+.3}/week over {:.1} weeks, confidence {:.2})",
        v.direction, v.slope, v.weeks_span, v.confidence
    );
    println!(
        "  Expectation: {} expects {:.3}/week, delta {:+.3} -> {}",
        e.tier,
        e.expected_rate,
        e.delta_from_expected,
        if e.meets_expectation { "meets" } else { "below" }
    );
    println!(
        "  Stability:   {} (mean change {:.3} over {} points)",
        output.stability.stability, output.stability.mean_abs_change, output.stability.points
    );
    Ok(())
}
