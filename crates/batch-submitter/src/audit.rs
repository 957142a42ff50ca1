use crate::{collaborators::AuditSink, request::BatchEntry};
use std::{sync::Arc, time::Duration};
use tracing::warn;

/// Best-effort recorder of submission attempts.
///
/// Writes are awaited so records keep dispatch order, but bounded by a
/// timeout and never reported back: a failed or slow sink cannot change an
/// entry's state or stop the batch.
#[derive(Clone)]
pub struct AuditReporter {
    sink: Arc<dyn AuditSink>,
    timeout: Duration,
}

impl AuditReporter {
    pub fn new(sink: Arc<dyn AuditSink>, timeout: Duration) -> Self {
        Self { sink, timeout }
    }

    pub async fn record(&self, entry: &BatchEntry) {
        match tokio::time::timeout(self.timeout, self.sink.write(entry)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(entry = %entry.id, "Audit write failed: {e:#}"),
            Err(_) => warn!(
                entry = %entry.id,
                timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                "Audit write timed out"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{EntryState, SubmissionRequest};
    use anyhow::bail;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingSink(AtomicUsize);

    #[async_trait]
    impl AuditSink for FailingSink {
        async fn write(&self, _entry: &BatchEntry) -> anyhow::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            bail!("database offline")
        }
    }

    struct StuckSink;

    #[async_trait]
    impl AuditSink for StuckSink {
        async fn write(&self, _entry: &BatchEntry) -> anyhow::Result<()> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    fn entry() -> BatchEntry {
        BatchEntry::new(
            0,
            SubmissionRequest::new("0x1", "1"),
            EntryState::Skipped,
        )
    }

    #[tokio::test]
    async fn test_failure_is_swallowed() {
        let sink = Arc::new(FailingSink(AtomicUsize::new(0)));
        let reporter = AuditReporter::new(sink.clone(), Duration::from_secs(1));

        reporter.record(&entry()).await;

        assert_eq!(sink.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stuck_sink_times_out() {
        let reporter = AuditReporter::new(Arc::new(StuckSink), Duration::from_secs(5));

        reporter.record(&entry()).await;
    }
}
