use crate::{collaborators::SequenceSource, request::SenderId};
use serde::Serialize;
use tracing::{info, warn};

/// Snapshot of unresolved sequence numbers taken before dispatch starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GapReport {
    pub has_gap: bool,
    pub gap_size: u64,
    /// `None` when the sequence source could not be reached
    pub next_expected_sequence: Option<u64>,
}

impl GapReport {
    /// Report used when monitoring is unavailable: assume no gap
    pub const fn unknown() -> Self {
        Self {
            has_gap: false,
            gap_size: 0,
            next_expected_sequence: None,
        }
    }

    pub const fn from_status(next_expected: u64, lowest_unconfirmed: u64) -> Self {
        let gap_size = next_expected.saturating_sub(lowest_unconfirmed);

        Self {
            has_gap: gap_size > 0,
            gap_size,
            next_expected_sequence: Some(next_expected),
        }
    }
}

/// Looks for submissions from `sender` that were claimed but never resolved.
///
/// An unreachable source degrades to [`GapReport::unknown`] and the batch
/// proceeds optimistically.
pub async fn detect_gap(source: &dyn SequenceSource, sender: &SenderId) -> GapReport {
    match source.sequence_status(sender).await {
        Ok(status) => {
            let report = GapReport::from_status(status.next_expected, status.lowest_unconfirmed);
            if report.has_gap {
                warn!(
                    %sender,
                    gap_size = report.gap_size,
                    lowest_unconfirmed = status.lowest_unconfirmed,
                    next_expected = status.next_expected,
                    "Sender has unconfirmed submissions in flight"
                );
            } else {
                info!(%sender, next_expected = status.next_expected, "No sequence gap");
            }
            report
        }
        Err(e) => {
            warn!(%sender, "Sequence status unavailable, proceeding without gap check: {e:#}");
            GapReport::unknown()
        }
    }
}
