//! The surface the presentation layer drives: load a trial, read its fields,
//! step to the next one, and record results.
//!
//! Every call returns its outcome directly; nothing is broadcast.

use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{info, instrument};

use crate::config::{Selection, SessionConfig};
use crate::error::{Result, TrialError};
use crate::output::{participant_file_id, OutputDir, OutputRecord, ProjectDataDir, TabularWriter};
use crate::table::{parse, Header, Row};
use crate::trial::{TrialCursor, TrialIndex, TrialKey};

/// The loaded trial: its key and every column of its row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialRecord {
    pub key: TrialKey,
    columns: Header,
    values: Row,
}

impl TrialRecord {
    /// Pair `row` with `header`: short rows are padded with empty cells,
    /// surplus cells are dropped.
    fn new(key: TrialKey, header: &[String], row: &[String]) -> Self {
        let values = (0..header.len())
            .map(|i| row.get(i).cloned().unwrap_or_default())
            .collect();
        Self {
            key,
            columns: header.to_vec(),
            values,
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        let idx = self.columns.iter().position(|c| c == name)?;
        self.values.get(idx).map(String::as_str)
    }

    /// (column, value) in header order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(String::as_str))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// A fresh output record holding this trial's fields, ready for the
    /// caller to add measurements to.
    pub fn to_output_record(&self) -> OutputRecord {
        self.fields().collect()
    }
}

pub struct TrialSession<D: OutputDir = ProjectDataDir> {
    config: SessionConfig,
    output_dir: D,
    index: Option<TrialIndex>,
    cursor: TrialCursor,
    current: Option<TrialRecord>,
    writer: Option<TabularWriter>,
}

impl<D: OutputDir> TrialSession<D> {
    pub fn new(config: SessionConfig, output_dir: D) -> Self {
        Self {
            config,
            output_dir,
            index: None,
            cursor: TrialCursor::new(),
            current: None,
            writer: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Parse `text` and index it, replacing whatever was loaded before.
    /// The first non-blank line is always the header: the key columns are
    /// found by name. On failure the previous table stays in place.
    #[instrument(level = "info", skip(self, text))]
    pub fn load_text(&mut self, text: &str) -> Result<&TrialIndex> {
        let table = parse(text, true)?;
        let index = TrialIndex::from_table(
            table,
            &self.config.participant_column,
            &self.config.trial_column,
        )?;

        self.cursor.reset();
        self.current = None;
        Ok(&*self.index.insert(index))
    }

    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<&TrialIndex> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| TrialError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "loading trial table");
        self.load_text(&text)
    }

    pub fn index(&self) -> Option<&TrialIndex> {
        self.index.as_ref()
    }

    /// Make (`participant`, `trial`) the current trial.
    ///
    /// A miss returns `KeyNotFound` and leaves the current trial and cursor as they were.
    pub fn load_trial(&mut self, participant: i64, trial: i64) -> Result<&TrialRecord> {
        let record = self.record_for(participant, trial)?;
        let index = self.index.as_ref().ok_or(TrialError::NoTableLoaded)?;
        self.cursor.load_participant(participant, index);
        self.cursor.set_current(trial);

        info!(participant, trial, "trial loaded");
        Ok(&*self.current.insert(record))
    }

    /// Load the trial a previous run stopped at.
    pub fn resume(&mut self, selection: &Selection) -> Result<&TrialRecord> {
        self.load_trial(selection.participant, selection.trial)
    }

    /// Load the trial after the current one. `Ok(None)` when there is none.
    pub fn load_next_trial(&mut self) -> Result<Option<&TrialRecord>> {
        let (Some(participant), Some(next)) = (self.cursor.participant(), self.cursor.next()) else {
            return Ok(None);
        };
        let record = self.record_for(participant, next)?;
        self.cursor.confirm_next(next);

        info!(participant, trial = next, remaining = self.cursor.remaining(), "advanced to next trial");
        Ok(Some(&*self.current.insert(record)))
    }

    fn record_for(&self, participant: i64, trial: i64) -> Result<TrialRecord> {
        let index = self.index.as_ref().ok_or(TrialError::NoTableLoaded)?;
        let row = index
            .lookup(participant, trial)
            .ok_or(TrialError::KeyNotFound { participant, trial })?;
        Ok(TrialRecord::new(
            TrialKey::new(participant, trial),
            index.headers(),
            row,
        ))
    }

    pub fn current(&self) -> Option<&TrialRecord> {
        self.current.as_ref()
    }

    /// A field of the current trial.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.current.as_ref()?.field(name)
    }

    /// The configured stimulus column of the current trial.
    pub fn stimulus(&self) -> Option<&str> {
        self.field(&self.config.stimulus_column)
    }

    pub fn selection(&self) -> Option<Selection> {
        self.current
            .as_ref()
            .map(|r| Selection::new(r.key.participant, r.key.trial))
    }

    /// The current participant's trial numbers, ascending.
    pub fn trials(&self) -> &[i64] {
        self.cursor.trials()
    }

    pub fn has_next_trial(&self) -> bool {
        self.cursor.has_next()
    }

    pub fn is_last_trial(&self) -> bool {
        self.cursor.is_last()
    }

    pub fn trials_remaining(&self) -> usize {
        self.cursor.remaining()
    }

    /// The loaded table's columns followed by `extra` measurement columns.
    pub fn output_header(&self, extra: &[&str]) -> Header {
        let mut header = self
            .index
            .as_ref()
            .map(|i| i.headers().clone())
            .unwrap_or_default();
        for column in extra {
            if !header.iter().any(|h| h == column) {
                header.push(column.to_string());
            }
        }
        header
    }

    /// Open the result file for `header`. The participant goes into the file
    /// name when the config asks for it.
    pub fn initialize_output(&mut self, header: Header, participant: Option<i64>) -> Result<PathBuf> {
        let out = &self.config.output;
        let dir = match &out.directory {
            Some(dir) => dir.clone(),
            None => self.output_dir.resolve()?,
        };
        let file_id = participant
            .filter(|_| out.include_participant)
            .map(participant_file_id);

        let mut writer = TabularWriter::new(dir, out.base_name.as_str())
            .with_timestamp(out.include_timestamp)
            .with_header_policy(out.header_policy);
        let path = writer.initialize(header, file_id.as_deref())?.to_path_buf();
        self.writer = Some(writer);
        Ok(path)
    }

    /// Append one result row, ordered by the output header.
    pub fn write_trial_row(&mut self, record: &OutputRecord) -> Result<()> {
        self.writer
            .as_mut()
            .ok_or(TrialError::NotInitialized)?
            .append_record(record)
    }

    /// The current trial's fields as an output record.
    pub fn output_record(&self) -> Option<OutputRecord> {
        self.current.as_ref().map(TrialRecord::to_output_record)
    }

    pub fn writer(&self) -> Option<&TabularWriter> {
        self.writer.as_ref()
    }
}
