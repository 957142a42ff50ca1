use crate::{
    audit::AuditReporter,
    collaborators::{PolicyValidator, Submitter},
    error::StateError,
    policy::{ContinuationPolicy, Decision},
    request::{BatchEntry, EntryState, EntryStatus, FailureStage, SenderId},
    result::{summarize, BatchOutcome, BatchResult},
    store::EntryStore,
};
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, warn};

/// Walks a batch in order, one submission at a time.
///
/// Entries share the sender's sequence counter, so nothing here is ever run
/// concurrently: an entry leaves `Processing` before the next one is looked
/// at, and consecutive dispatches are spaced by `interval`.
pub struct Dispatcher {
    sender: SenderId,
    policy_validator: Arc<dyn PolicyValidator>,
    submitter: Arc<dyn Submitter>,
    audit: AuditReporter,
    interval: Duration,
    expected_sequence: Option<u64>,
}

impl Dispatcher {
    pub fn new(
        sender: SenderId,
        policy_validator: Arc<dyn PolicyValidator>,
        submitter: Arc<dyn Submitter>,
        audit: AuditReporter,
        interval: Duration,
    ) -> Self {
        Self {
            sender,
            policy_validator,
            submitter,
            audit,
            interval,
            expected_sequence: None,
        }
    }

    /// Sequence number the first submission is expected to consume
    pub const fn with_expected_sequence(mut self, sequence: Option<u64>) -> Self {
        self.expected_sequence = sequence;
        self
    }

    pub async fn run(
        &self,
        mut store: EntryStore,
        policy: &ContinuationPolicy,
    ) -> Result<BatchResult, StateError> {
        let mut expected = self.expected_sequence;
        let mut dispatched = 0usize;
        let mut outcome = BatchOutcome::Completed;

        while let Some(position) = store.next_pending() {
            if dispatched > 0 && !self.interval.is_zero() {
                tokio::time::sleep(self.interval).await;
            }
            dispatched += 1;

            self.dispatch(&mut store, position, &mut expected).await?;

            let entry = entry_at(&store, position)?;
            if entry.status() != EntryStatus::Error {
                continue;
            }

            let remaining = store.count(EntryStatus::Pending);
            if remaining == 0 {
                break;
            }

            let index = entry.index;
            let decision = policy.on_failure(entry, remaining).await;
            match decision {
                Decision::Continue => {
                    info!(index, remaining, "Continuing after failed entry");
                }
                Decision::Abort => {
                    let skipped = store.skip_remaining()?;
                    warn!(index, skipped, "Batch aborted after failed entry");
                    outcome = BatchOutcome::Aborted;
                    break;
                }
            }
        }

        let result = summarize(store.into_entries()).with_outcome(outcome);
        info!(
            sender = %self.sender,
            succeeded = result.succeeded,
            failed = result.failed,
            skipped = result.skipped,
            "Batch finished"
        );

        Ok(result)
    }

    /// Runs one `Pending` entry through to a terminal state
    async fn dispatch(
        &self,
        store: &mut EntryStore,
        position: usize,
        expected: &mut Option<u64>,
    ) -> Result<(), StateError> {
        store.transition(position, EntryState::Validating)?;
        let entry = entry_at(store, position)?;
        let (id, index) = (entry.id, entry.index);
        let request = entry.request.clone();

        let rejection = match self.policy_validator.validate(&request).await {
            Ok(decision) if decision.approved => None,
            Ok(decision) => Some(decision.rejection_detail()),
            Err(e) => Some(format!("Policy check failed: {e:#}")),
        };

        if let Some(detail) = rejection {
            warn!(entry = %id, index, "{detail}");
            store.transition(
                position,
                EntryState::Error {
                    stage: FailureStage::Policy,
                    detail,
                },
            )?;
            self.audit.record(entry_at(store, position)?).await;

            return Ok(());
        }

        store.transition(position, EntryState::Processing)?;

        let next = match self.submitter.submit(&request, &self.sender).await {
            Ok(receipt) => {
                self.check_sequence(expected, receipt.sequence_number);
                info!(
                    entry = %id,
                    index,
                    sequence = receipt.sequence_number,
                    submission = %receipt.submission_ref,
                    "Submitted"
                );
                EntryState::Success {
                    submission_ref: receipt.submission_ref,
                    sequence_number: receipt.sequence_number,
                }
            }
            Err(failure) => {
                warn!(entry = %id, index, "Submission failed: {failure}");
                EntryState::Error {
                    stage: FailureStage::Submission,
                    detail: failure.message,
                }
            }
        };

        store.transition(position, next)?;
        self.audit.record(entry_at(store, position)?).await;

        Ok(())
    }

    fn check_sequence(&self, expected: &mut Option<u64>, sequence: u64) {
        match *expected {
            Some(want) if sequence < want => warn!(
                sender = %self.sender,
                expected = want,
                got = sequence,
                "Submission reused an already consumed sequence number"
            ),
            Some(want) if sequence > want => debug!(
                sender = %self.sender,
                expected = want,
                got = sequence,
                "Sequence advanced past expected value"
            ),
            _ => {}
        }

        *expected = Some(sequence.saturating_add(1));
    }
}

fn entry_at(store: &EntryStore, position: usize) -> Result<&BatchEntry, StateError> {
    store
        .get(position)
        .ok_or(StateError::UnknownPosition(position))
}
