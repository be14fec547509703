//! Remembers the last (participant, trial) between runs.
//!
//! The library itself never reads this; a binary loads the stored
//! [`Selection`] and passes it in explicitly.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};
use tracing::{error, info};

use crate::config::Selection;
use crate::error::{Result, TrialError};

const FILE_NAME: &str = "last_selection.json";

#[derive(Debug, Clone)]
pub struct SelectionStore {
    path: PathBuf,
}

impl SelectionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store inside `dir` under the default file name.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored selection, `None` if there is none or it cannot be parsed.
    pub fn load(&self) -> Result<Option<Selection>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(TrialError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        match serde_json::from_str(&text) {
            Ok(selection) => Ok(Some(selection)),
            Err(e) => {
                error!("ignoring corrupt selection file {:?}: {}", self.path, e);
                Ok(None)
            }
        }
    }

    /// Write to a temp file, then rename over the stored selection.
    pub fn save(&self, selection: &Selection) -> Result<()> {
        let to_write_err = |source: io::Error| TrialError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(to_write_err)?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        let mut tmp = fs::File::create(&tmp_path).map_err(to_write_err)?;
        serde_json::to_writer_pretty(&mut tmp, selection)
            .map_err(|e| to_write_err(io::Error::other(e)))?;
        tmp.write_all(b"\n").map_err(to_write_err)?;
        fs::rename(&tmp_path, &self.path).map_err(to_write_err)?;

        info!(
            participant = selection.participant,
            trial = selection.trial,
            "saved selection"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_then_load() {
        let tmp = tempdir().unwrap();
        let store = SelectionStore::in_dir(tmp.path().join("state"));
        assert_eq!(store.load().unwrap(), None);

        store.save(&Selection::new(3, 12)).unwrap();
        assert_eq!(store.load().unwrap(), Some(Selection::new(3, 12)));

        store.save(&Selection::new(4, 1)).unwrap();
        assert_eq!(store.load().unwrap(), Some(Selection::new(4, 1)));
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn corrupt_file_reads_as_empty() {
        let tmp = tempdir().unwrap();
        let store = SelectionStore::in_dir(tmp.path());
        fs::write(store.path(), "{\"participant\": ").unwrap();
        assert_eq!(store.load().unwrap(), None);
    }
}
