use crate::{
    gap::GapReport,
    request::{BatchEntry, EntryOutput, EntryStatus},
};
use serde::Serialize;

/// How the run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchOutcome {
    /// Every dispatchable entry was attempted
    Completed,
    /// The operator stopped the batch after a failed entry
    Aborted,
    /// The operator declined to dispatch into a sequence gap
    DeclinedAtGap,
}

/// Final report of a batch run, owned by the caller
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub entries: Vec<BatchEntry>,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Number of requests accounted for, `succeeded + failed + skipped`
    pub total_attempted: usize,
    pub outcome: BatchOutcome,
    pub gap_report: Option<GapReport>,
}

impl BatchResult {
    pub fn with_outcome(mut self, outcome: BatchOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn with_gap_report(mut self, report: GapReport) -> Self {
        self.gap_report = Some(report);
        self
    }

    pub fn statuses(&self) -> Vec<EntryStatus> {
        self.entries.iter().map(BatchEntry::status).collect()
    }

    pub fn outputs(&self) -> impl Iterator<Item = EntryOutput> + '_ {
        self.entries.iter().map(EntryOutput::new)
    }
}

/// Tallies final entry snapshots by terminal state
pub fn summarize(entries: Vec<BatchEntry>) -> BatchResult {
    let count = |status: EntryStatus| entries.iter().filter(|e| e.status() == status).count();

    let succeeded = count(EntryStatus::Success);
    let failed = count(EntryStatus::Error);
    let skipped = count(EntryStatus::Skipped);

    BatchResult {
        total_attempted: succeeded + failed + skipped,
        entries,
        succeeded,
        failed,
        skipped,
        outcome: BatchOutcome::Completed,
        gap_report: None,
    }
}
