//! trialsheet: load trial-configuration tables, step a participant through
//! their trials and append one result row per completed trial.
//!
//! - `table`: CSV dialect (quoted fields, doubled quotes) parsing and escaping
//! - `trial`: (participant, trial) index and the per-participant progression cursor
//! - `output`: append-only result writer, file naming and output directories
//! - `session`: the surface the presentation layer talks to
//! - `config` / `prefs`: session configuration and the remembered last selection

pub mod config;
pub mod error;
pub mod output;
pub mod prefs;
pub mod session;
pub mod table;
pub mod trial;

pub use config::{HeaderPolicy, OutputConfig, Selection, SessionConfig};
pub use error::{Result, TrialError};
pub use output::{FixedDir, OutputDir, OutputName, OutputRecord, ProjectDataDir, TabularWriter};
pub use session::{TrialRecord, TrialSession};
pub use table::{parse, parse_line, Header, ParsedTable, Row};
pub use trial::{TrialCursor, TrialIndex, TrialKey};
