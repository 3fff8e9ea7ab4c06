//! The `skillscope snapshot` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use skillscope_core::mastery::student_skill_snapshot_with;

use super::{format_ts, load, open_store, print_json};

pub fn execute(student: String, config_path: Option<PathBuf>, format: String) -> Result<()> {
    let config = load(config_path)?;
    let store = open_store(&config)?;
    let snapshot = student_skill_snapshot_with(&store, &student, &config.mastery_params());

    if format == "json" {
        return print_json(&snapshot);
    }

    if snapshot.skills.is_empty() {
        println!("No evidence recorded for {student}.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec![
        "Skill", "Rows", "Raw", "Mastery", "Last evidence", "Stale (d)", "Tier", "Conf",
    ]);
    for (skill_id, m) in &snapshot.skills {
        table.add_row(vec![
            Cell::new(skill_id),
            Cell::new(m.n),
            Cell::new(format!("{:.1}%", m.raw_mastery * 100.0)),
            Cell::new(format!("{:.1}%", m.mastery * 100.0)),
            Cell::new(format_ts(m.last_ts)),
            Cell::new(m.staleness_days),
            Cell::new(m.tier),
            Cell::new(format!("{:.2}", m.confidence)),
        ]);
    }

    println!("Student {student}\n{table}");
    Ok(())
}
