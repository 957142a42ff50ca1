use crate::{
    audit::AuditReporter,
    collaborators::{ApproveAll, AuditSink, NoAudit, PolicyValidator, SequenceSource, Submitter},
    config::EngineConfig,
    dispatcher::Dispatcher,
    error::EngineError,
    gap::detect_gap,
    policy::{ContinuationPolicy, Decision},
    request::{EntryStatus, SenderId, SubmissionRequest},
    result::{summarize, BatchOutcome, BatchResult},
    store::{EntryStore, ProgressFn},
    validator::{DestinationFormat, HexAddressFormat},
};
use dashmap::DashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Caller-facing batch submission engine.
///
/// One engine may serve many senders at once; runs for the same sender are
/// mutually exclusive. Senders are compared by their canonical form under the
/// engine's [`DestinationFormat`], so differently-cased spellings of one hex
/// account share a slot.
pub struct BatchEngine {
    submitter: Arc<dyn Submitter>,
    sequence_source: Arc<dyn SequenceSource>,
    policy_validator: Arc<dyn PolicyValidator>,
    audit_sink: Arc<dyn AuditSink>,
    destination_format: Arc<dyn DestinationFormat>,
    config: EngineConfig,
    progress: Option<ProgressFn>,
    active_senders: Arc<DashSet<String>>,
}

impl BatchEngine {
    pub fn new(submitter: Arc<dyn Submitter>, sequence_source: Arc<dyn SequenceSource>) -> Self {
        Self {
            submitter,
            sequence_source,
            policy_validator: Arc::new(ApproveAll),
            audit_sink: Arc::new(NoAudit),
            destination_format: Arc::new(HexAddressFormat),
            config: EngineConfig::default(),
            progress: None,
            active_senders: Arc::default(),
        }
    }

    pub fn with_policy_validator(mut self, validator: Arc<dyn PolicyValidator>) -> Self {
        self.policy_validator = validator;
        self
    }

    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit_sink = sink;
        self
    }

    pub fn with_destination_format(mut self, format: Arc<dyn DestinationFormat>) -> Self {
        self.destination_format = format;
        self
    }

    pub const fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validates, gap-checks and dispatches `requests` for `sender`.
    ///
    /// Only programmer errors are returned as `Err`; every request is
    /// accounted for in the returned [`BatchResult`].
    pub async fn run_batch(
        &self,
        requests: Vec<SubmissionRequest>,
        sender: SenderId,
        policy: &ContinuationPolicy,
    ) -> Result<BatchResult, EngineError> {
        if sender.is_blank() {
            return Err(EngineError::EmptySender);
        }
        let _guard = SenderGuard::acquire(
            &self.active_senders,
            self.destination_format.canonical(sender.as_str()),
        )
        .ok_or_else(|| EngineError::SenderBusy(sender.clone()))?;

        let mut store = EntryStore::intake(
            requests,
            self.destination_format.as_ref(),
            self.progress.clone(),
        );
        let pending = store.count(EntryStatus::Pending);
        info!(
            %sender,
            total = store.len(),
            pending,
            rejected = store.len() - pending,
            "Starting batch"
        );

        if pending == 0 {
            return Ok(summarize(store.into_entries()));
        }

        let gap = detect_gap(self.sequence_source.as_ref(), &sender).await;
        if gap.has_gap && policy.on_gap(&gap).await == Decision::Abort {
            let skipped = store.skip_remaining()?;
            warn!(%sender, gap_size = gap.gap_size, skipped, "Batch declined at sequence gap");

            return Ok(summarize(store.into_entries())
                .with_outcome(BatchOutcome::DeclinedAtGap)
                .with_gap_report(gap));
        }

        let dispatcher = Dispatcher::new(
            sender,
            Arc::clone(&self.policy_validator),
            Arc::clone(&self.submitter),
            AuditReporter::new(Arc::clone(&self.audit_sink), self.config.audit_timeout),
            self.config.submission_interval,
        )
        .with_expected_sequence(gap.next_expected_sequence);

        let result = dispatcher.run(store, policy).await?;

        Ok(result.with_gap_report(gap))
    }
}

/// Marks a sender busy for the lifetime of one run
struct SenderGuard {
    active: Arc<DashSet<String>>,
    key: String,
}

impl SenderGuard {
    fn acquire(active: &Arc<DashSet<String>>, key: String) -> Option<Self> {
        active.insert(key.clone()).then(|| Self {
            active: Arc::clone(active),
            key,
        })
    }
}

impl Drop for SenderGuard {
    fn drop(&mut self) {
        self.active.remove(&self.key);
    }
}
