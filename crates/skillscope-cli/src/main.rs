//! skillscope CLI: record evidence and query skill analytics.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "skillscope", version, about = "Literacy evidence analytics")]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format: text, json
    #[arg(long, global = true, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record evidence events
    Record {
        /// Event JSON (object or array), or @path to read it from a file
        #[arg(long)]
        event: String,
    },

    /// Show per-skill mastery for a student
    Snapshot {
        #[arg(long)]
        student: String,
    },

    /// Rank the skills that most need attention
    Priority {
        #[arg(long)]
        student: String,
    },

    /// Growth velocity, expectation and stability for one skill
    Growth {
        #[arg(long)]
        student: String,

        #[arg(long)]
        skill: String,

        /// Number of most recent rows to use (1-5)
        #[arg(long, default_value = "4")]
        points: usize,
    },

    /// Whether the top-priority skill is on track
    Track {
        #[arg(long)]
        student: String,
    },

    /// Scan the evidence store for stale rows and unknown skill ids
    Audit {
        /// Skill catalog file (JSON array or one id per line)
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Exit code 1 if the audit has findings
        #[arg(long)]
        fail_on_findings: bool,
    },

    /// Create a starter config and ladder document
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("skillscope=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config;
    let format = cli.format;

    let result = match cli.command {
        Commands::Record { event } => commands::record::execute(event, config, format),
        Commands::Snapshot { student } => commands::snapshot::execute(student, config, format),
        Commands::Priority { student } => {
            commands::priority::execute(student, config, format).await
        }
        Commands::Growth {
            student,
            skill,
            points,
        } => commands::growth::execute(student, skill, points, config, format).await,
        Commands::Track { student } => commands::track::execute(student, config, format).await,
        Commands::Audit {
            catalog,
            fail_on_findings,
        } => commands::audit::execute(catalog, fail_on_findings, config, format),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
