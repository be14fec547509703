//! inspect_trials.rs: show what a trial table contains and what has been recorded.
//!
//! - Parses the table with the session config (or the defaults) and prints its header.
//! - Lists each participant's trial numbers in the order they will be run.
//! - With a participant, also lists earlier output files for that participant.

use anyhow::{bail, Context, Result};
use std::env;
use tracing_subscriber::{fmt, EnvFilter};
use trialsheet::{
    output::{participant_file_id, previous_outputs},
    FixedDir, OutputDir, ProjectDataDir, SessionConfig, TrialSession,
};

fn main() -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt::Subscriber::builder().with_env_filter(env_filter).init();

    // ─── 1) args: <trials.csv> [participant] [config] ────────────────
    let args: Vec<String> = env::args().collect();
    let Some(trials_path) = args.get(1) else {
        bail!("usage: inspect_trials <trials.csv> [participant] [config]");
    };
    let participant = args
        .get(2)
        .map(|s| s.trim().parse::<i64>())
        .transpose()
        .context("participant must be an integer")?;
    let config = match args.get(3) {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    };

    // ─── 2) load + summarise ─────────────────────────────────────────
    let output_dir: Box<dyn OutputDir> = match &config.output.directory {
        Some(dir) => Box::new(FixedDir(dir.clone())),
        None => Box::new(ProjectDataDir),
    };
    let base_name = config.output.base_name.clone();
    let mut session = TrialSession::new(config, output_dir);
    let index = session
        .load_file(trials_path)
        .with_context(|| format!("loading {}", trials_path))?;

    println!("=== {} ===", trials_path);
    println!("Columns: {}", index.headers().join(", "));
    println!("Indexed keys: {}", index.len());
    println!("Skipped rows: {}", index.skipped());

    println!();
    println!("=== Trials per participant ===");
    for p in index.participants() {
        let trials = index.trials_for(p);
        let list: Vec<String> = trials.iter().map(i64::to_string).collect();
        println!("{:>6}  ({:>3})  {}", p, trials.len(), list.join(" "));
    }

    // ─── 3) earlier outputs for one participant ──────────────────────
    let Some(p) = participant else {
        return Ok(());
    };
    if index.trials_for(p).is_empty() {
        println!();
        println!("participant {} has no trials in this table", p);
    }

    let dir = match &session.config().output.directory {
        Some(dir) => dir.clone(),
        None => ProjectDataDir.resolve()?,
    };
    let file_id = participant_file_id(p);
    let found = previous_outputs(&dir, &base_name, Some(file_id.as_str()))?;

    println!();
    println!("=== Outputs for {} in {} ===", file_id, dir.display());
    if found.is_empty() {
        println!("(none)");
    }
    for path in found {
        let lines = std::fs::read_to_string(&path)
            .map(|text| trialsheet::table::split_lines(&text).count().saturating_sub(1))
            .unwrap_or(0);
        println!("{:>6} lines  {}", lines, path.display());
    }
    Ok(())
}
