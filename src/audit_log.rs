use anyhow::{Context, Result};
use async_trait::async_trait;
use batch_submitter::{AuditSink, BatchEntry};
use serde_json::json;
use std::{
    path::Path,
    time::{SystemTime, UNIX_EPOCH},
};
use tokio::{
    fs::{File, OpenOptions},
    io::AsyncWriteExt,
    sync::Mutex,
};
use tracing::info;

/// Appends one JSON line per attempted submission
pub struct JsonLinesAudit {
    file: Mutex<File>,
}

impl JsonLinesAudit {
    pub async fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .with_context(|| format!("Failed to open audit log {}", path.display()))?;

        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

#[async_trait]
impl AuditSink for JsonLinesAudit {
    async fn write(&self, entry: &BatchEntry) -> Result<()> {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let recorded_at = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        let mut line = serde_json::to_string(&json!({
            "recorded_at_ms": recorded_at,
            "entry": entry,
        }))?;
        line.push('\n');

        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes())
            .await
            .context("Failed to append audit record")?;
        file.flush().await.context("Failed to flush audit log")?;

        Ok(())
    }
}

/// Used when no audit file is configured: the record goes to the log
pub struct LogAudit;

#[async_trait]
impl AuditSink for LogAudit {
    async fn write(&self, entry: &BatchEntry) -> Result<()> {
        info!(
            entry = %entry.id,
            index = entry.index,
            status = %entry.status(),
            sequence = ?entry.sequence_number(),
            "Audit"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::SimulatedChain;
    use batch_submitter::{
        BatchEngine, ContinuationPolicy, EngineConfig, SenderId, SubmissionRequest,
    };
    use std::{sync::Arc, time::Duration};

    #[tokio::test]
    async fn test_one_line_per_attempted_entry() {
        let path = std::env::temp_dir()
            .join(format!("bulk-mint-audit-{}.jsonl", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let chain = Arc::new(SimulatedChain::new(
            0,
            ["0x2222222222222222222222222222222222222222".to_string()],
        ));
        let audit = Arc::new(JsonLinesAudit::open(&path).await.unwrap());
        let engine = BatchEngine::new(chain.clone(), chain)
            .with_audit_sink(audit)
            .with_config(EngineConfig::default().with_submission_interval(Duration::ZERO));

        let requests = vec![
            SubmissionRequest::new("0x1111111111111111111111111111111111111111", "1"),
            SubmissionRequest::new("0x2222222222222222222222222222222222222222", "1"),
            SubmissionRequest::new("not-an-address", "1"),
        ];
        let result = engine
            .run_batch(
                requests,
                SenderId::new("0xme"),
                &ContinuationPolicy::AlwaysContinue,
            )
            .await
            .unwrap();
        assert_eq!(result.succeeded, 1);
        assert_eq!(result.failed, 2);

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        std::fs::remove_file(&path).unwrap();

        let records: Vec<serde_json::Value> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["entry"]["state"]["state"], "success");
        assert_eq!(records[1]["entry"]["state"]["state"], "error");
        assert!(records[0]["recorded_at_ms"].as_u64().unwrap() > 0);
    }
}
