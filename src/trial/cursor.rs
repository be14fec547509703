use tracing::{debug, trace};

use super::index::TrialIndex;

/// Position within one participant's sorted trial list.
///
/// The cursor never advances on its own: `next` only reports the following
/// trial number, and the caller confirms the move with `set_current` once that
/// trial has actually been loaded.
#[derive(Debug, Clone, Default)]
pub struct TrialCursor {
    participant: Option<i64>,
    trials: Vec<i64>,
    position: Option<usize>,
    /// Last trial number successfully positioned on, restored on reload.
    requested: Option<i64>,
}

impl TrialCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `participant`'s trial list from `index`.
    ///
    /// Reloading the same participant keeps the last requested trial if it is
    /// still present; any other participant starts unpositioned.
    pub fn load_participant(&mut self, participant: i64, index: &TrialIndex) -> &[i64] {
        if self.participant != Some(participant) {
            debug!(participant, previous = ?self.participant, "cursor switched participant");
            self.participant = Some(participant);
            self.requested = None;
        }
        self.trials = index.trials_for(participant).to_vec();
        self.position = self
            .requested
            .and_then(|trial| self.trials.iter().position(|&t| t == trial));
        &self.trials
    }

    /// Move to `trial`. Returns false and leaves the position alone if the
    /// trial is not in the current list.
    pub fn set_current(&mut self, trial: i64) -> bool {
        match self.trials.iter().position(|&t| t == trial) {
            Some(pos) => {
                trace!(trial, pos, "cursor positioned");
                self.position = Some(pos);
                self.requested = Some(trial);
                true
            }
            None => false,
        }
    }

    /// Step onto the trial `next` reported, once it has been loaded.
    ///
    /// Unlike `set_current` this moves exactly one slot, so duplicate trial
    /// numbers in the list are still walked one by one.
    pub fn confirm_next(&mut self, trial: i64) -> bool {
        if self.next() != Some(trial) {
            return false;
        }
        self.position = self.position.map(|pos| pos + 1);
        self.requested = Some(trial);
        true
    }

    /// The trial after the current one, without moving.
    pub fn next(&self) -> Option<i64> {
        let pos = self.position?;
        self.trials.get(pos + 1).copied()
    }

    pub fn has_next(&self) -> bool {
        self.next().is_some()
    }

    pub fn is_last(&self) -> bool {
        matches!(self.position, Some(pos) if pos + 1 == self.trials.len())
    }

    /// Trials after the current one; the whole list when unpositioned.
    pub fn remaining(&self) -> usize {
        match self.position {
            Some(pos) => self.trials.len() - pos - 1,
            None => self.trials.len(),
        }
    }

    pub fn current(&self) -> Option<i64> {
        self.position.map(|pos| self.trials[pos])
    }

    pub fn position(&self) -> Option<usize> {
        self.position
    }

    pub fn participant(&self) -> Option<i64> {
        self.participant
    }

    pub fn trials(&self) -> &[i64] {
        &self.trials
    }

    /// Forget everything, as when a new table replaces the index.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(rows: &[(i64, i64)]) -> TrialIndex {
        let headers = vec!["ParticipantID".to_string(), "TrialNumber".to_string()];
        let rows = rows
            .iter()
            .map(|(p, t)| vec![p.to_string(), t.to_string()])
            .collect();
        TrialIndex::build(headers, rows, "ParticipantID", "TrialNumber").unwrap()
    }

    #[test]
    fn walks_through_trials() {
        let idx = index(&[(1, 5), (1, 1), (1, 2)]);
        let mut cursor = TrialCursor::new();
        assert_eq!(cursor.load_participant(1, &idx), &[1, 2, 5]);
        assert!(!cursor.has_next());
        assert!(!cursor.is_last());

        assert!(cursor.set_current(2));
        assert!(cursor.has_next());
        assert_eq!(cursor.next(), Some(5));
        assert!(!cursor.is_last());
        // next() does not move the cursor
        assert_eq!(cursor.current(), Some(2));

        assert!(cursor.set_current(5));
        assert!(cursor.is_last());
        assert!(!cursor.has_next());
        assert_eq!(cursor.next(), None);
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn missing_trial_leaves_position_unchanged() {
        let idx = index(&[(1, 1), (1, 2), (1, 5)]);
        let mut cursor = TrialCursor::new();
        cursor.load_participant(1, &idx);
        assert!(cursor.set_current(2));
        assert!(!cursor.set_current(99));
        assert_eq!(cursor.current(), Some(2));
        assert_eq!(cursor.position(), Some(1));
    }

    #[test]
    fn failed_set_on_unpositioned_cursor_stays_unset() {
        let idx = index(&[(1, 1)]);
        let mut cursor = TrialCursor::new();
        cursor.load_participant(1, &idx);
        assert!(!cursor.set_current(3));
        assert_eq!(cursor.position(), None);
        assert_eq!(cursor.remaining(), 1);
    }

    #[test]
    fn reloading_same_participant_restores_position() {
        let idx = index(&[(1, 1), (1, 2), (1, 5)]);
        let mut cursor = TrialCursor::new();
        cursor.load_participant(1, &idx);
        cursor.set_current(5);

        let rebuilt = index(&[(1, 0), (1, 1), (1, 2), (1, 5)]);
        cursor.load_participant(1, &rebuilt);
        assert_eq!(cursor.position(), Some(3));
        assert_eq!(cursor.current(), Some(5));
    }

    #[test]
    fn switching_participant_resets_position() {
        let idx = index(&[(1, 1), (1, 2), (2, 1), (2, 2)]);
        let mut cursor = TrialCursor::new();
        cursor.load_participant(1, &idx);
        cursor.set_current(1);

        cursor.load_participant(2, &idx);
        assert_eq!(cursor.participant(), Some(2));
        assert_eq!(cursor.position(), None);
        assert!(!cursor.has_next());

        // coming back does not remember participant 1's position either
        cursor.load_participant(1, &idx);
        assert_eq!(cursor.position(), None);
    }

    #[test]
    fn duplicate_trial_numbers_position_on_first() {
        let idx = index(&[(1, 1), (1, 1), (1, 2)]);
        let mut cursor = TrialCursor::new();
        cursor.load_participant(1, &idx);
        assert!(cursor.set_current(1));
        assert_eq!(cursor.position(), Some(0));
        assert_eq!(cursor.next(), Some(1));
        assert_eq!(cursor.remaining(), 2);

        assert!(cursor.confirm_next(1));
        assert_eq!(cursor.position(), Some(1));
        assert_eq!(cursor.next(), Some(2));
    }

    #[test]
    fn confirm_next_rejects_anything_but_the_next_trial() {
        let idx = index(&[(1, 1), (1, 2), (1, 5)]);
        let mut cursor = TrialCursor::new();
        cursor.load_participant(1, &idx);
        assert!(!cursor.confirm_next(1));
        cursor.set_current(1);
        assert!(!cursor.confirm_next(5));
        assert_eq!(cursor.current(), Some(1));
        assert!(cursor.confirm_next(2));
        assert_eq!(cursor.current(), Some(2));
    }
}
