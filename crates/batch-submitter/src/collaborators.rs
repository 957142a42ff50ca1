//! Contracts for the external systems the engine drives.
//!
//! Signing and broadcasting, compliance checks, sequence monitoring and
//! history persistence all live outside this crate. The dispatcher only sees
//! these traits.

use crate::request::{BatchEntry, SenderId, SubmissionRequest};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Verdict of the compliance service on a single request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDecision {
    pub approved: bool,
    #[serde(default)]
    pub reasons: Vec<String>,
}

impl PolicyDecision {
    pub const fn approve() -> Self {
        Self {
            approved: true,
            reasons: Vec::new(),
        }
    }

    pub fn reject(reasons: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            approved: false,
            reasons: reasons.into_iter().map(Into::into).collect(),
        }
    }

    pub(crate) fn rejection_detail(&self) -> String {
        if self.reasons.is_empty() {
            "Rejected by policy".to_string()
        } else {
            format!("Rejected by policy: {}", self.reasons.join("; "))
        }
    }
}

/// Outcome of a successful broadcast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub submission_ref: String,
    pub sequence_number: u64,
}

/// The submit collaborator could not get the operation accepted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SubmissionFailure {
    pub message: String,
}

impl SubmissionFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Sender sequence counters as seen by the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceStatus {
    pub next_expected: u64,
    pub lowest_unconfirmed: u64,
}

/// Compliance check, called at most once per entry.
#[async_trait]
pub trait PolicyValidator: Send + Sync {
    async fn validate(&self, request: &SubmissionRequest) -> anyhow::Result<PolicyDecision>;
}

/// Signs and broadcasts one operation, consuming one sequence number.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(
        &self,
        request: &SubmissionRequest,
        sender: &SenderId,
    ) -> Result<SubmissionReceipt, SubmissionFailure>;
}

/// Read-only view of the sender's sequence counters.
#[async_trait]
pub trait SequenceSource: Send + Sync {
    async fn sequence_status(&self, sender: &SenderId) -> anyhow::Result<SequenceStatus>;
}

/// Write-only history of attempted submissions.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn write(&self, entry: &BatchEntry) -> anyhow::Result<()>;
}

/// Approves everything
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproveAll;

#[async_trait]
impl PolicyValidator for ApproveAll {
    async fn validate(&self, _request: &SubmissionRequest) -> anyhow::Result<PolicyDecision> {
        Ok(PolicyDecision::approve())
    }
}

/// Drops every audit record
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAudit;

#[async_trait]
impl AuditSink for NoAudit {
    async fn write(&self, _entry: &BatchEntry) -> anyhow::Result<()> {
        Ok(())
    }
}
