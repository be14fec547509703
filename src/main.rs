use anyhow::{bail, Context, Result};
use chrono::Local;
use std::env;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};
use trialsheet::{
    prefs::SelectionStore, FixedDir, OutputDir, ProjectDataDir, Selection, SessionConfig,
    TrialSession,
};

const USAGE: &str = "usage: trialsheet <config.yaml|json> <trials.csv> [participant] [trial]";
const COMPLETED_AT: &str = "CompletedAt";

fn parse_arg(args: &[String], idx: usize, name: &str) -> Result<Option<i64>> {
    args.get(idx)
        .map(|s| s.trim().parse::<i64>())
        .transpose()
        .with_context(|| format!("{} must be an integer", name))
}

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,trialsheet=info"));
    fmt::Subscriber::builder().with_env_filter(env_filter).init();

    // ─── 2) arguments + config ───────────────────────────────────────
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        bail!(USAGE);
    }
    let config = SessionConfig::load(&args[1])
        .with_context(|| format!("loading config {}", args[1]))?;
    let participant_arg = parse_arg(&args, 3, "participant")?;
    let trial_arg = parse_arg(&args, 4, "trial")?;

    // ─── 3) output directory + remembered selection ──────────────────
    let output_dir: Box<dyn OutputDir> = match &config.output.directory {
        Some(dir) => Box::new(FixedDir(dir.clone())),
        None => Box::new(ProjectDataDir),
    };
    let state_dir = output_dir.resolve().context("resolving output directory")?;
    let store = SelectionStore::in_dir(&state_dir);
    let stored = store.load()?;

    let mut session = TrialSession::new(config, output_dir);
    let index = session
        .load_file(&args[2])
        .with_context(|| format!("loading trials from {}", args[2]))?;
    info!(
        participants = index.participants().len(),
        skipped = index.skipped(),
        "trial table ready"
    );

    // ─── 4) choose where to start ────────────────────────────────────
    let first_trial = |participant: i64| -> Result<Selection> {
        let trials = index.trials_for(participant);
        match trials.first() {
            Some(&trial) => Ok(Selection::new(participant, trial)),
            None => bail!("participant {} has no trials", participant),
        }
    };
    let (start, already_done) = match (participant_arg, trial_arg, stored) {
        (Some(p), Some(t), _) => (Selection::new(p, t), false),
        (Some(p), None, _) => (first_trial(p)?, false),
        (None, _, Some(previous)) => (previous, true),
        (None, _, None) => match index.participants().first() {
            Some(&p) => (first_trial(p)?, false),
            None => bail!("no indexable trials in {}", args[2]),
        },
    };

    session
        .resume(&start)
        .with_context(|| format!("loading participant {} trial {}", start.participant, start.trial))?;
    if already_done {
        info!(participant = start.participant, trial = start.trial, "resuming after stored trial");
        if session.load_next_trial()?.is_none() {
            warn!(participant = start.participant, "all trials already recorded");
            return Ok(());
        }
    }

    // ─── 5) record each remaining trial ──────────────────────────────
    let header = session.output_header(&[COMPLETED_AT]);
    let path = session.initialize_output(header, Some(start.participant))?;
    info!(path = %path.display(), remaining = session.trials_remaining() + 1, "recording");

    loop {
        let Some(mut record) = session.output_record() else {
            break;
        };
        record.insert(COMPLETED_AT, Local::now().format("%Y-%m-%d %H:%M:%S").to_string());
        session.write_trial_row(&record)?;
        if let Some(selection) = session.selection() {
            store.save(&selection)?;
        }
        if session.load_next_trial()?.is_none() {
            break;
        }
    }

    info!(
        rows = session.writer().map_or(0, |w| w.rows_written()),
        "all done"
    );
    Ok(())
}
