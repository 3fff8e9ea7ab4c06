//! The `skillscope priority` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use skillscope_core::priority::compute_priority_with;

use super::{load, open_store, print_json, resolve_ladder};

pub async fn execute(student: String, config_path: Option<PathBuf>, format: String) -> Result<()> {
    let config = load(config_path)?;
    let store = open_store(&config)?;
    let ladder = resolve_ladder(&config).await?;
    let report = compute_priority_with(&store, &ladder, &student, &config.mastery_params());

    if format == "json" {
        return print_json(&report);
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "Skill", "Score", "Need", "Stale", "Tier", "Rationale"]);
    for (rank, row) in report.top_skills.iter().enumerate() {
        table.add_row(vec![
            Cell::new(rank + 1),
            Cell::new(&row.skill_id),
            Cell::new(format!("{:.3}", row.priority_score)),
            Cell::new(format!("{:.2}", row.need)),
            Cell::new(format!("{:.2}", row.staleness_norm)),
            Cell::new(row.tier),
            Cell::new(&row.rationale),
        ]);
    }

    println!(
        "Student {} (overall priority {:.3}, ladder {})\n{table}",
        report.student_id, report.overall_priority, ladder.version
    );
    Ok(())
}
