use chrono::NaiveDateTime;
use directories_next::ProjectDirs;
use glob::{glob, Pattern};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use tracing::{debug, warn};

use crate::error::{Result, TrialError};

const QUALIFIER: &str = "org";
const ORGANIZATION: &str = "trialsheet";
const APPLICATION: &str = "trialsheet";

/// Where result files go. Implemented once per platform so callers never
/// branch on the target themselves.
pub trait OutputDir {
    /// The directory to write into, created if it does not exist yet.
    fn resolve(&self) -> Result<PathBuf>;
}

/// A directory given up front (config, command line, tests).
#[derive(Debug, Clone)]
pub struct FixedDir(pub PathBuf);

impl OutputDir for FixedDir {
    fn resolve(&self) -> Result<PathBuf> {
        fs::create_dir_all(&self.0).map_err(|source| TrialError::Write {
            path: self.0.clone(),
            source,
        })?;
        Ok(self.0.clone())
    }
}

/// The per-user data directory for this application.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectDataDir;

impl OutputDir for ProjectDataDir {
    fn resolve(&self) -> Result<PathBuf> {
        let Some(dirs) = ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION) else {
            return Err(TrialError::Write {
                path: PathBuf::new(),
                source: io::Error::new(
                    io::ErrorKind::NotFound,
                    "no home directory to place the data directory in",
                ),
            });
        };
        let dir = dirs.data_dir().to_path_buf();
        debug!(dir = %dir.display(), "resolved platform data directory");
        FixedDir(dir).resolve()
    }
}

impl<T: OutputDir + ?Sized> OutputDir for &T {
    fn resolve(&self) -> Result<PathBuf> {
        (**self).resolve()
    }
}

impl<T: OutputDir + ?Sized> OutputDir for Box<T> {
    fn resolve(&self) -> Result<PathBuf> {
        (**self).resolve()
    }
}

/// `{base}[_{file_id}][_{yyyyMMdd_HHmmss}].csv`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputName {
    pub base: String,
    pub file_id: Option<String>,
    pub timestamp: Option<NaiveDateTime>,
}

impl OutputName {
    pub const TIMESTAMP_FORMAT: &'static str = "%Y%m%d_%H%M%S";

    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            file_id: None,
            timestamp: None,
        }
    }

    pub fn with_file_id(mut self, file_id: Option<impl Into<String>>) -> Self {
        self.file_id = file_id.map(Into::into);
        self
    }

    pub fn with_timestamp(mut self, timestamp: Option<NaiveDateTime>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Stem shared by every file of this base and id, timestamp excluded.
    fn prefix(&self) -> String {
        match &self.file_id {
            Some(id) => format!("{}_{}", self.base, id),
            None => self.base.clone(),
        }
    }

    pub fn file_name(&self) -> String {
        match self.timestamp {
            Some(ts) => format!("{}_{}.csv", self.prefix(), ts.format(Self::TIMESTAMP_FORMAT)),
            None => format!("{}.csv", self.prefix()),
        }
    }

    pub fn path_in(&self, dir: &Path) -> PathBuf {
        dir.join(self.file_name())
    }
}

/// File id for a participant: `P` plus the id zero-padded to three digits.
pub fn participant_file_id(participant: i64) -> String {
    format!("P{:03}", participant)
}

/// Output files already in `dir` for this base and id, with or without a
/// timestamp, sorted by name (and so by time).
pub fn previous_outputs(dir: &Path, base: &str, file_id: Option<&str>) -> Result<Vec<PathBuf>> {
    let prefix = OutputName::new(base).with_file_id(file_id).prefix();
    let pattern = format!(
        "{}/{}*.csv",
        Pattern::escape(&dir.to_string_lossy()),
        Pattern::escape(&prefix)
    );

    let entries = glob(&pattern).map_err(|e| TrialError::Io {
        path: dir.to_path_buf(),
        source: io::Error::new(io::ErrorKind::InvalidInput, e.to_string()),
    })?;

    let mut found = Vec::new();
    for entry in entries {
        let path = match entry {
            Ok(p) => p,
            Err(e) => {
                warn!("cannot read glob entry: {}", e);
                continue;
            }
        };
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        // `P001*` would also match `P0010`; only accept the exact stem or a timestamp suffix
        let Some(rest) = stem.strip_prefix(&prefix) else {
            continue;
        };
        if rest.is_empty() || is_timestamp_suffix(rest) {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

fn is_timestamp_suffix(rest: &str) -> bool {
    // `_yyyyMMdd_HHmmss`
    let Some(ts) = rest.strip_prefix('_') else {
        return false;
    };
    ts.len() == 15
        && ts.char_indices().all(|(i, c)| match i {
            8 => c == '_',
            _ => c.is_ascii_digit(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn stamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 7)
            .unwrap()
    }

    #[test]
    fn file_name_variants() {
        let base = OutputName::new("TrialResults");
        assert_eq!(base.file_name(), "TrialResults.csv");

        let with_id = base.clone().with_file_id(Some(participant_file_id(7)));
        assert_eq!(with_id.file_name(), "TrialResults_P007.csv");

        let full = with_id.with_timestamp(Some(stamp()));
        assert_eq!(full.file_name(), "TrialResults_P007_20240309_140507.csv");

        let ts_only = OutputName::new("Run").with_timestamp(Some(stamp()));
        assert_eq!(ts_only.file_name(), "Run_20240309_140507.csv");
    }

    #[test]
    fn participant_ids_pad_to_three_digits() {
        assert_eq!(participant_file_id(1), "P001");
        assert_eq!(participant_file_id(42), "P042");
        assert_eq!(participant_file_id(1234), "P1234");
    }

    #[test]
    fn fixed_dir_is_created() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("nested").join("out");
        let resolved = FixedDir(dir.clone()).resolve().unwrap();
        assert_eq!(resolved, dir);
        assert!(dir.is_dir());
    }

    #[test]
    fn previous_outputs_match_exact_participant() {
        let tmp = tempdir().unwrap();
        for name in [
            "TrialResults_P001.csv",
            "TrialResults_P001_20240309_140507.csv",
            "TrialResults_P0010.csv",
            "TrialResults_P002.csv",
            "TrialResults_P001_notes.csv",
            "TrialResults_P001.txt",
        ] {
            fs::write(tmp.path().join(name), "x\n").unwrap();
        }

        let found = previous_outputs(tmp.path(), "TrialResults", Some("P001")).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec!["TrialResults_P001.csv", "TrialResults_P001_20240309_140507.csv"]
        );
    }
}
