use crate::{
    error::StateError,
    request::{BatchEntry, EntryState, EntryStatus, FailureStage, SubmissionRequest},
    validator::{self, DestinationFormat},
};
use std::{fmt, sync::Arc};
use tracing::debug;

/// Read-only notification fired after every entry state change
pub type ProgressFn = Arc<dyn Fn(&BatchEntry) + Send + Sync>;

/// Ordered entries of a single batch run and their lifecycle state.
///
/// Every state change goes through [`EntryStore::transition`], which rejects
/// anything the state machine does not allow and keeps at most one entry in
/// `Processing`.
pub struct EntryStore {
    entries: Vec<BatchEntry>,
    processing: Option<usize>,
    observer: Option<ProgressFn>,
}

impl EntryStore {
    /// Screens raw requests into entries.
    ///
    /// Structurally valid requests start `Pending` carrying their trimmed
    /// fields; the rest keep the raw request, start in `Error` and are never
    /// handed to the dispatcher.
    pub fn intake(
        requests: impl IntoIterator<Item = SubmissionRequest>,
        format: &dyn DestinationFormat,
        observer: Option<ProgressFn>,
    ) -> Self {
        let mut store = Self {
            entries: Vec::new(),
            processing: None,
            observer,
        };

        for (index, request) in requests.into_iter().enumerate() {
            let (request, state) = match validator::validate(&request, format) {
                Ok(validated) => (validated.request, EntryState::Pending),
                Err(e) => (
                    request,
                    EntryState::Error {
                        stage: FailureStage::Intake,
                        detail: e.to_string(),
                    },
                ),
            };
            store.entries.push(BatchEntry::new(index, request, state));

            if store.entries[index].status() == EntryStatus::Error {
                store.notify(index);
            }
        }

        store
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }

    pub fn get(&self, position: usize) -> Option<&BatchEntry> {
        self.entries.get(position)
    }

    pub fn count(&self, status: EntryStatus) -> usize {
        self.entries.iter().filter(|e| e.status() == status).count()
    }

    /// Position of the first entry still waiting for dispatch
    pub fn next_pending(&self) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.status() == EntryStatus::Pending)
    }

    pub fn has_pending(&self) -> bool {
        self.next_pending().is_some()
    }

    pub fn transition(&mut self, position: usize, next: EntryState) -> Result<(), StateError> {
        let entry = self
            .entries
            .get(position)
            .ok_or(StateError::UnknownPosition(position))?;

        let from = entry.status();
        let to = next.status();
        if !from.can_transition_to(to) {
            return Err(StateError::IllegalTransition {
                entry: entry.id,
                from,
                to,
            });
        }

        if to == EntryStatus::Processing {
            if let Some(active) = self.processing {
                return Err(StateError::AlreadyProcessing {
                    entry: entry.id,
                    active: self.entries[active].id,
                });
            }
            self.processing = Some(position);
        } else if from == EntryStatus::Processing {
            self.processing = None;
        }

        debug!(entry = %entry.id, index = entry.index, %from, %to, "Entry transition");
        self.entries[position].state = next;
        self.notify(position);

        Ok(())
    }

    /// Moves every `Pending` entry to `Skipped`, returning how many moved
    pub fn skip_remaining(&mut self) -> Result<usize, StateError> {
        let mut skipped = 0;

        while let Some(position) = self.next_pending() {
            self.transition(position, EntryState::Skipped)?;
            skipped += 1;
        }

        Ok(skipped)
    }

    pub fn into_entries(self) -> Vec<BatchEntry> {
        self.entries
    }

    fn notify(&self, position: usize) {
        if let Some(observer) = &self.observer {
            observer(&self.entries[position]);
        }
    }
}

impl fmt::Debug for EntryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryStore")
            .field("entries", &self.entries)
            .field("processing", &self.processing)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::HexAddressFormat;
    use std::sync::Mutex;

    const ADDR: &str = "0x1111111111111111111111111111111111111111";

    fn store(requests: Vec<SubmissionRequest>) -> EntryStore {
        EntryStore::intake(requests, &HexAddressFormat, None)
    }

    fn success(sequence_number: u64) -> EntryState {
        EntryState::Success {
            submission_ref: format!("0x{sequence_number:x}"),
            sequence_number,
        }
    }

    #[test]
    fn test_intake_screens_requests() {
        let store = store(vec![
            SubmissionRequest::new(ADDR, "1"),
            SubmissionRequest::new("", "1"),
            SubmissionRequest::new(ADDR, "0"),
        ]);

        assert_eq!(store.len(), 3);
        assert_eq!(store.count(EntryStatus::Pending), 1);
        assert_eq!(store.count(EntryStatus::Error), 2);
        assert_eq!(
            store.get(2).unwrap().failure_stage(),
            Some(FailureStage::Intake)
        );
        assert_eq!(store.next_pending(), Some(0));
    }

    #[test]
    fn test_intake_keeps_trimmed_request() {
        let store = store(vec![
            SubmissionRequest::new(format!("  {ADDR} "), " 1.50 "),
            SubmissionRequest::new(" nope ", " 1 "),
        ]);

        let accepted = &store.get(0).unwrap().request;
        assert_eq!(accepted.destination, ADDR);
        assert_eq!(accepted.amount, "1.50");

        let rejected = &store.get(1).unwrap().request;
        assert_eq!(rejected.destination, " nope ");
    }

    #[test]
    fn test_entry_ids_are_unique() {
        let store = store(vec![SubmissionRequest::new(ADDR, "1"); 3]);
        let ids: std::collections::HashSet<_> = store.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn test_full_walk() {
        let mut store = store(vec![SubmissionRequest::new(ADDR, "1")]);

        store.transition(0, EntryState::Validating).unwrap();
        store.transition(0, EntryState::Processing).unwrap();
        store.transition(0, success(9)).unwrap();

        assert_eq!(store.get(0).unwrap().sequence_number(), Some(9));
        assert!(!store.has_pending());
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut store = store(vec![SubmissionRequest::new(ADDR, "1")]);
        store.transition(0, EntryState::Skipped).unwrap();

        let err = store.transition(0, EntryState::Pending).unwrap_err();
        assert!(matches!(
            err,
            StateError::IllegalTransition {
                from: EntryStatus::Skipped,
                to: EntryStatus::Pending,
                ..
            }
        ));
    }

    #[test]
    fn test_intake_errors_never_dispatch() {
        let mut store = store(vec![SubmissionRequest::new("nope", "1")]);

        assert_eq!(store.next_pending(), None);
        assert!(store.transition(0, EntryState::Validating).is_err());
    }

    #[test]
    fn test_single_processing_entry() {
        let mut store = store(vec![SubmissionRequest::new(ADDR, "1"); 2]);
        store.transition(0, EntryState::Validating).unwrap();
        store.transition(0, EntryState::Processing).unwrap();
        store.transition(1, EntryState::Validating).unwrap();

        let err = store.transition(1, EntryState::Processing).unwrap_err();
        assert!(matches!(err, StateError::AlreadyProcessing { .. }));

        store.transition(0, success(1)).unwrap();
        store.transition(1, EntryState::Processing).unwrap();
    }

    #[test]
    fn test_skip_remaining() {
        let mut store = store(vec![
            SubmissionRequest::new(ADDR, "1"),
            SubmissionRequest::new(ADDR, "-1"),
            SubmissionRequest::new(ADDR, "1"),
            SubmissionRequest::new(ADDR, "1"),
        ]);
        store.transition(0, EntryState::Validating).unwrap();

        assert_eq!(store.skip_remaining().unwrap(), 2);
        assert_eq!(store.count(EntryStatus::Skipped), 2);
        assert_eq!(store.get(1).unwrap().status(), EntryStatus::Error);
        assert_eq!(store.get(0).unwrap().status(), EntryStatus::Validating);
    }

    #[test]
    fn test_observer_sees_every_transition() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let observer: ProgressFn = Arc::new(move |entry: &BatchEntry| {
            sink.lock().unwrap().push((entry.index, entry.status()));
        });

        let mut store = EntryStore::intake(
            vec![
                SubmissionRequest::new("", "1"),
                SubmissionRequest::new(ADDR, "1"),
            ],
            &HexAddressFormat,
            Some(observer),
        );
        store.transition(1, EntryState::Validating).unwrap();
        store.transition(1, EntryState::Processing).unwrap();
        store.transition(1, success(3)).unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                (0, EntryStatus::Error),
                (1, EntryStatus::Validating),
                (1, EntryStatus::Processing),
                (1, EntryStatus::Success),
            ]
        );
    }
}
