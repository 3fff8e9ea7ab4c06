//! The `skillscope record` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde_json::Value;

use skillscope_core::EvidenceEventInput;

use super::{load, open_store, print_json, read_arg_or_file};

pub fn execute(event: String, config_path: Option<PathBuf>, format: String) -> Result<()> {
    let raw = read_arg_or_file(&event)?;
    let payload: Value = serde_json::from_str(&raw).context("event is not valid JSON")?;
    // Entries that are not objects become empty inputs and are reported as rejected.
    let items = match payload {
        Value::Array(items) => items,
        other => vec![other],
    };
    let inputs: Vec<EvidenceEventInput> = items
        .into_iter()
        .map(|item| serde_json::from_value(item).unwrap_or_default())
        .collect();

    let config = load(config_path)?;
    let store = open_store(&config)?;

    let mut recorded = Vec::with_capacity(inputs.len());
    for input in inputs {
        recorded.push(store.try_record_evidence(input)?);
    }

    match format.as_str() {
        "json" => print_json(&recorded)?,
        _ => {
            for (i, outcome) in recorded.iter().enumerate() {
                match outcome {
                    Some(e) => println!(
                        "#{i} recorded: {} -> {} ({}, {})",
                        e.student_id,
                        e.targets.join(", "),
                        e.module.as_str(),
                        e.tier
                    ),
                    None => {
                        println!("#{i} rejected: studentId and at least one target are required")
                    }
                }
            }
        }
    }

    Ok(())
}
