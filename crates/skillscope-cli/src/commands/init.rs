//! The `skillscope init` command.

use std::path::Path;

use anyhow::Result;

use skillscope_core::IntensityLadder;

pub fn execute() -> Result<()> {
    if Path::new("skillscope.toml").exists() {
        println!("skillscope.toml already exists, skipping.");
    } else {
        std::fs::write("skillscope.toml", SAMPLE_CONFIG)?;
        println!("Created skillscope.toml");
    }

    let ladder_path = Path::new("ladder.json");
    if ladder_path.exists() {
        println!("ladder.json already exists, skipping.");
    } else {
        let mut ladder = IntensityLadder::default();
        ladder.version = "local".into();
        std::fs::write(ladder_path, serde_json::to_string_pretty(&ladder)? + "\n")?;
        println!("Created ladder.json");
    }

    println!("\nNext steps:");
    println!("  1. Edit ladder.json to match your intervention tiers");
    println!(
        "  2. Run: skillscope record --event '{{\"studentId\":\"s1\",\"targets\":[\"LIT.DEC.SYL\"],\"result\":{{\"accuracy\":0.7}}}}'"
    );
    println!("  3. Run: skillscope priority --student s1");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# skillscope configuration

# Where the evidence document is stored.
data_dir = "./skillscope-data"

# EWMA smoothing factor for mastery, in (0, 1].
mastery_alpha = 0.55

# Known skill ids; enables orphan detection in `skillscope audit`.
known_skills = []
# catalog_path = "skills.txt"

[ladder]
path = "ladder.json"
# url = "${SKILLSCOPE_LADDER_URL}"
timeout_secs = 10
"#;
