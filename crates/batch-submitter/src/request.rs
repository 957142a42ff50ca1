use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Account on whose behalf every submission in a batch is sent
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SenderId(String);

impl SenderId {
    pub fn new(sender: impl Into<String>) -> Self {
        let sender = sender.into();
        match sender.trim() {
            trimmed if trimmed.len() == sender.len() => Self(sender),
            trimmed => Self(trimmed.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for SenderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Engine-assigned entry identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(Uuid);

impl EntryId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Submission request record from CSV
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRequest {
    pub destination: String,
    pub amount: String,
    #[serde(default, alias = "auxiliaryId", alias = "token_id")]
    pub auxiliary_id: Option<String>,
}

impl SubmissionRequest {
    pub fn new(destination: impl Into<String>, amount: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            amount: amount.into(),
            auxiliary_id: None,
        }
    }

    pub fn with_auxiliary_id(mut self, auxiliary_id: impl Into<String>) -> Self {
        self.auxiliary_id = Some(auxiliary_id.into());
        self
    }
}

/// Where an entry that ended in `Error` failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Intake,
    Policy,
    Submission,
}

/// Lifecycle state of a batch entry.
///
/// ```text
/// Pending ──> Validating ──> Processing ──> Success
///    │             │              └───────> Error
///    │             └──────────────────────> Error   (policy rejection)
///    └──> Skipped                                   (abort decision)
/// ```
///
/// Entries rejected at intake start life in `Error` and never enter the
/// dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum EntryState {
    Pending,
    Validating,
    Processing,
    Success {
        submission_ref: String,
        sequence_number: u64,
    },
    Error {
        stage: FailureStage,
        detail: String,
    },
    Skipped,
}

impl EntryState {
    pub const fn status(&self) -> EntryStatus {
        match self {
            Self::Pending => EntryStatus::Pending,
            Self::Validating => EntryStatus::Validating,
            Self::Processing => EntryStatus::Processing,
            Self::Success { .. } => EntryStatus::Success,
            Self::Error { .. } => EntryStatus::Error,
            Self::Skipped => EntryStatus::Skipped,
        }
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Success { .. } | Self::Error { .. } | Self::Skipped
        )
    }
}

/// Fieldless view of [`EntryState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Pending,
    Validating,
    Processing,
    Success,
    Error,
    Skipped,
}

impl EntryStatus {
    /// Whether the state machine allows moving from `self` to `next`
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Validating)
                | (Self::Pending, Self::Skipped)
                | (Self::Validating, Self::Processing)
                | (Self::Validating, Self::Error)
                | (Self::Processing, Self::Success)
                | (Self::Processing, Self::Error)
        )
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Validating => "validating",
            Self::Processing => "processing",
            Self::Success => "success",
            Self::Error => "error",
            Self::Skipped => "skipped",
        };
        f.write_str(name)
    }
}

/// One tracked request inside a batch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchEntry {
    pub id: EntryId,
    /// Position in the caller's original request list
    pub index: usize,
    pub request: SubmissionRequest,
    pub state: EntryState,
}

impl BatchEntry {
    pub(crate) fn new(index: usize, request: SubmissionRequest, state: EntryState) -> Self {
        Self {
            id: EntryId::new(),
            index,
            request,
            state,
        }
    }

    pub const fn status(&self) -> EntryStatus {
        self.state.status()
    }

    pub fn submission_ref(&self) -> Option<&str> {
        match &self.state {
            EntryState::Success { submission_ref, .. } => Some(submission_ref),
            _ => None,
        }
    }

    pub const fn sequence_number(&self) -> Option<u64> {
        match &self.state {
            EntryState::Success {
                sequence_number, ..
            } => Some(*sequence_number),
            _ => None,
        }
    }

    pub fn error_detail(&self) -> Option<&str> {
        match &self.state {
            EntryState::Error { detail, .. } => Some(detail),
            _ => None,
        }
    }

    pub const fn failure_stage(&self) -> Option<FailureStage> {
        match &self.state {
            EntryState::Error { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Flat per-entry report row for CSV output
#[derive(Debug, Clone, Serialize)]
pub struct EntryOutput {
    pub index: usize,
    pub id: EntryId,
    pub destination: String,
    pub amount: String,
    pub auxiliary_id: Option<String>,
    pub status: EntryStatus,
    pub sequence_number: Option<u64>,
    pub submission_ref: Option<String>,
    pub error: Option<String>,
}

impl EntryOutput {
    pub fn new(entry: &BatchEntry) -> Self {
        Self {
            index: entry.index,
            id: entry.id,
            destination: entry.request.destination.clone(),
            amount: entry.request.amount.clone(),
            auxiliary_id: entry.request.auxiliary_id.clone(),
            status: entry.status(),
            sequence_number: entry.sequence_number(),
            submission_ref: entry.submission_ref().map(str::to_owned),
            error: entry.error_detail().map(str::to_owned),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions_only() {
        use EntryStatus::{Error, Pending, Processing, Skipped, Success, Validating};

        assert!(Pending.can_transition_to(Validating));
        assert!(Pending.can_transition_to(Skipped));
        assert!(Validating.can_transition_to(Processing));
        assert!(Validating.can_transition_to(Error));
        assert!(Processing.can_transition_to(Success));
        assert!(Processing.can_transition_to(Error));

        assert!(!Validating.can_transition_to(Pending));
        assert!(!Processing.can_transition_to(Skipped));
        assert!(!Pending.can_transition_to(Processing));

        for terminal in [Success, Error, Skipped] {
            for next in [Pending, Validating, Processing, Success, Error, Skipped] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_accessors_follow_state() {
        let mut entry = BatchEntry::new(
            0,
            SubmissionRequest::new("0xabc", "1"),
            EntryState::Pending,
        );
        assert_eq!(entry.submission_ref(), None);
        assert_eq!(entry.sequence_number(), None);

        entry.state = EntryState::Success {
            submission_ref: "0xdead".to_string(),
            sequence_number: 7,
        };
        assert_eq!(entry.submission_ref(), Some("0xdead"));
        assert_eq!(entry.sequence_number(), Some(7));
        assert_eq!(entry.error_detail(), None);

        let output = EntryOutput::new(&entry);
        assert_eq!(output.status, EntryStatus::Success);
        assert_eq!(output.sequence_number, Some(7));
    }

    #[test]
    fn test_request_deserializes_camel_case_alias() {
        let request: SubmissionRequest = serde_json::from_str(
            r#"{"destination":"0x1","amount":"2.5","auxiliaryId":"3"}"#,
        )
        .unwrap();

        assert_eq!(request.auxiliary_id.as_deref(), Some("3"));
    }
}
