//! The `skillscope track` command.

use std::path::PathBuf;

use anyhow::Result;

use skillscope_core::growth::compute_track_status_with;

use super::{load, open_store, print_json, resolve_ladder};

pub async fn execute(student: String, config_path: Option<PathBuf>, format: String) -> Result<()> {
    let config = load(config_path)?;
    let store = open_store(&config)?;
    let ladder = resolve_ladder(&config).await?;
    let status =
        compute_track_status_with(&store, &ladder, &student, &config.mastery_params());

    if format == "json" {
        return print_json(&status);
    }

    match &status.skill_id {
        Some(skill) => println!("{}: {} on {skill} ({})", student, status.status, status.reason),
        None => println!("{}: {} ({})", student, status.status, status.reason),
    }
    Ok(())
}
