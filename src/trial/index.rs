use std::collections::{hash_map::Entry, HashMap};

use tracing::{debug, info, instrument};

use crate::error::{Result, TrialError};
use crate::table::{Header, ParsedTable, Row};

/// (participant, trial) pair identifying one configuration row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrialKey {
    pub participant: i64,
    pub trial: i64,
}

impl TrialKey {
    pub fn new(participant: i64, trial: i64) -> Self {
        Self { participant, trial }
    }
}

/// Lookup from `TrialKey` to row plus each participant's sorted trial numbers.
///
/// Built in one pass and never updated; loading a new table builds a new index.
/// Duplicate keys resolve to the first row in file order, and duplicate trial
/// numbers stay in the per-participant list.
#[derive(Debug, Clone)]
pub struct TrialIndex {
    headers: Header,
    rows: Vec<Row>,
    participant_column: usize,
    trial_column: usize,
    by_key: HashMap<TrialKey, usize>,
    trials: HashMap<i64, Vec<i64>>,
    skipped: usize,
}

impl TrialIndex {
    /// Index `rows` by the two named key columns.
    ///
    /// Fails with `ColumnNotFound` if either column is missing from `headers`.
    /// Rows too short to hold both keys, or whose keys are not integers, are
    /// skipped and counted in [`TrialIndex::skipped`].
    #[instrument(level = "info", skip(headers, rows), fields(rows = rows.len()))]
    pub fn build(
        headers: Header,
        rows: Vec<Row>,
        participant_column: &str,
        trial_column: &str,
    ) -> Result<Self> {
        let participant_idx = find_column(&headers, participant_column)?;
        let trial_idx = find_column(&headers, trial_column)?;

        let mut by_key = HashMap::new();
        let mut trials: HashMap<i64, Vec<i64>> = HashMap::new();
        let mut skipped = 0;

        for (row_idx, row) in rows.iter().enumerate() {
            let Some(key) = parse_key(row, participant_idx, trial_idx) else {
                debug!(row = row_idx, cells = row.len(), "skipping row without usable keys");
                skipped += 1;
                continue;
            };

            if let Entry::Vacant(slot) = by_key.entry(key) {
                slot.insert(row_idx);
            } else {
                debug!(
                    participant = key.participant,
                    trial = key.trial,
                    row = row_idx,
                    "duplicate key, keeping the earlier row"
                );
            }
            trials.entry(key.participant).or_default().push(key.trial);
        }

        for list in trials.values_mut() {
            list.sort_unstable();
        }

        info!(
            indexed = rows.len() - skipped,
            skipped,
            participants = trials.len(),
            "trial index built"
        );

        Ok(Self {
            headers,
            rows,
            participant_column: participant_idx,
            trial_column: trial_idx,
            by_key,
            trials,
            skipped,
        })
    }

    pub fn from_table(
        table: ParsedTable,
        participant_column: &str,
        trial_column: &str,
    ) -> Result<Self> {
        Self::build(table.headers, table.rows, participant_column, trial_column)
    }

    /// The first row in file order with this key.
    pub fn lookup(&self, participant: i64, trial: i64) -> Option<&Row> {
        self.by_key
            .get(&TrialKey::new(participant, trial))
            .map(|&idx| &self.rows[idx])
    }

    /// Ascending trial numbers for `participant`, duplicates included.
    /// Empty for an unknown participant.
    pub fn trials_for(&self, participant: i64) -> &[i64] {
        self.trials
            .get(&participant)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every participant with at least one indexed row, ascending.
    pub fn participants(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.trials.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn headers(&self) -> &Header {
        &self.headers
    }

    pub fn participant_column(&self) -> usize {
        self.participant_column
    }

    pub fn trial_column(&self) -> usize {
        self.trial_column
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Rows left out because a key cell was missing or not an integer.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

fn find_column(headers: &[String], name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| TrialError::ColumnNotFound {
            column: name.to_string(),
        })
}

fn parse_key(row: &[String], participant_idx: usize, trial_idx: usize) -> Option<TrialKey> {
    let participant = row.get(participant_idx)?.trim().parse().ok()?;
    let trial = row.get(trial_idx)?.trim().parse().ok()?;
    Some(TrialKey { participant, trial })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn header() -> Header {
        strings(&["ParticipantID", "TrialNumber", "StimulusID"])
    }

    fn build(rows: &[&[&str]]) -> TrialIndex {
        let rows = rows.iter().map(|r| strings(r)).collect();
        TrialIndex::build(header(), rows, "ParticipantID", "TrialNumber").unwrap()
    }

    #[test]
    fn lookup_and_trial_lists() {
        let index = build(&[&["1", "1", "A"], &["1", "2", "B"], &["2", "1", "C"]]);
        assert_eq!(index.trials_for(1), &[1, 2]);
        assert_eq!(index.lookup(1, 2), Some(&strings(&["1", "2", "B"])));
        assert_eq!(index.lookup(9, 9), None);
        assert_eq!(index.participants(), vec![1, 2]);
        assert!(index.trials_for(9).is_empty());
    }

    #[test]
    fn trial_lists_are_sorted_numerically() {
        let index = build(&[&["1", "10", "A"], &["1", "2", "B"], &["1", "-1", "C"]]);
        assert_eq!(index.trials_for(1), &[-1, 2, 10]);
    }

    #[test]
    fn duplicate_keys_keep_first_row_and_list_entry() {
        let index = build(&[&["1", "1", "A"], &["1", "1", "B"]]);
        assert_eq!(index.lookup(1, 1).map(|r| r[2].as_str()), Some("A"));
        assert_eq!(index.trials_for(1), &[1, 1]);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn malformed_rows_are_skipped_not_fatal() {
        let index = build(&[
            &["1"],
            &["x", "1", "A"],
            &["1", "two", "B"],
            &["", "", ""],
            &["1", "3", "C"],
            &["2", "4"],
        ]);
        assert_eq!(index.skipped(), 4);
        assert_eq!(index.trials_for(1), &[3]);
        // key columns are 0 and 1, so a two-cell row is still indexable
        assert_eq!(index.lookup(2, 4), Some(&strings(&["2", "4"])));
    }

    #[test]
    fn missing_key_column_is_reported() {
        let err = TrialIndex::build(header(), Vec::new(), "ParticipantID", "Trial").unwrap_err();
        match err {
            TrialError::ColumnNotFound { column } => assert_eq!(column, "Trial"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn key_columns_resolve_anywhere_in_header() {
        let headers = strings(&["StimulusID", "TrialNumber", "Notes", "ParticipantID"]);
        let rows = vec![strings(&["S1", "7", "n", "3"])];
        let index = TrialIndex::build(headers, rows, "ParticipantID", "TrialNumber").unwrap();
        assert_eq!(index.participant_column(), 3);
        assert_eq!(index.trial_column(), 1);
        assert!(index.lookup(3, 7).is_some());
    }
}
