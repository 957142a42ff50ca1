use crate::request::{EntryId, EntryStatus, SenderId};
use thiserror::Error;

/// Illegal move in the entry state machine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("Entry {entry} cannot move from {from} to {to}")]
    IllegalTransition {
        entry: EntryId,
        from: EntryStatus,
        to: EntryStatus,
    },

    #[error("Entry {entry} cannot start processing while entry {active} is in flight")]
    AlreadyProcessing { entry: EntryId, active: EntryId },

    #[error("No entry at position {0}")]
    UnknownPosition(usize),
}

/// Errors returned by [`crate::engine::BatchEngine::run_batch`].
///
/// Individual entry failures never show up here; they are reported through
/// the [`crate::result::BatchResult`].
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Sender identity must not be empty")]
    EmptySender,

    #[error("A batch is already running for sender {0}")]
    SenderBusy(SenderId),

    #[error(transparent)]
    InvalidTransition(#[from] StateError),
}
