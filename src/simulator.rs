use anyhow::Result;
use async_trait::async_trait;
use batch_submitter::{
    SenderId, SequenceSource, SequenceStatus, SubmissionFailure, SubmissionReceipt,
    SubmissionRequest, Submitter,
};
use std::{collections::HashSet, sync::Mutex};

/// In-process stand-in for the signer and RPC layer.
///
/// Hands out contiguous sequence numbers and refuses the configured
/// destinations without consuming a number. With `unconfirmed_from` set, the
/// sequence status reports submissions from that number on as still in
/// flight.
pub struct SimulatedChain {
    next_sequence: Mutex<u64>,
    unconfirmed_from: Option<u64>,
    refused: HashSet<String>,
}

impl SimulatedChain {
    pub fn new(start_sequence: u64, refused: impl IntoIterator<Item = String>) -> Self {
        Self {
            next_sequence: Mutex::new(start_sequence),
            unconfirmed_from: None,
            refused: refused
                .into_iter()
                .map(|d| d.to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn with_unconfirmed_from(mut self, sequence: Option<u64>) -> Self {
        self.unconfirmed_from = sequence;
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, u64> {
        self.next_sequence
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl Submitter for SimulatedChain {
    async fn submit(
        &self,
        request: &SubmissionRequest,
        sender: &SenderId,
    ) -> Result<SubmissionReceipt, SubmissionFailure> {
        let destination = request.destination.trim().to_ascii_lowercase();
        if self.refused.contains(&destination) {
            return Err(SubmissionFailure::new(format!(
                "execution reverted: transfer to {} refused",
                request.destination
            )));
        }

        let mut next = self.lock();
        let sequence_number = *next;
        *next += 1;

        Ok(SubmissionReceipt {
            submission_ref: format!("sim:{sender}:{sequence_number}"),
            sequence_number,
        })
    }
}

#[async_trait]
impl SequenceSource for SimulatedChain {
    async fn sequence_status(&self, _sender: &SenderId) -> Result<SequenceStatus> {
        let next = *self.lock();
        let lowest_unconfirmed = self.unconfirmed_from.map_or(next, |from| from.min(next));

        Ok(SequenceStatus {
            next_expected: next,
            lowest_unconfirmed,
        })
    }
}
