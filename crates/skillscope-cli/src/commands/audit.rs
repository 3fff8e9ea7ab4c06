//! The `skillscope audit` command.

use std::path::PathBuf;

use anyhow::Result;

use skillscope_core::audit::audit_evidence_store;

use super::{load, open_store, print_json};

pub fn execute(
    catalog_path: Option<PathBuf>,
    fail_on_findings: bool,
    config_path: Option<PathBuf>,
    format: String,
) -> Result<()> {
    let config = load(config_path)?;
    let store = open_store(&config)?;
    let catalog = config.load_catalog_with(catalog_path.as_deref())?;
    let report = audit_evidence_store(&store, catalog.as_ref());

    match format.as_str() {
        "json" => print_json(&report)?,
        "markdown" | "md" => println!("{}", report.to_markdown()),
        _ => {
            println!(
                "Audit: {} students, {} skills, {} rows",
                report.tracked_students, report.tracked_skills, report.total_rows
            );
            println!(
                "Stale rows (> {} days): {}",
                report.stale_threshold_days, report.stale_rows
            );
            match &report.orphan_skill_ids {
                None => println!("Orphan check skipped (no skill catalog)"),
                Some(ids) if ids.is_empty() => println!("Orphaned skill ids: none"),
                Some(ids) => println!("Orphaned skill ids: {}", ids.join(", ")),
            }
        }
    }

    if fail_on_findings && report.has_findings() {
        std::process::exit(1);
    }

    Ok(())
}
