use async_trait::async_trait;
use batch_submitter::{BatchEntry, Decision, GapReport, Operator};
use tokio::{
    io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin},
    sync::Mutex,
};
use tracing::warn;

/// Asks the person at the terminal, on stderr/stdin
pub struct PromptOperator {
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl PromptOperator {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(io::stdin()).lines()),
        }
    }

    async fn ask(&self, question: &str) -> Decision {
        let mut stderr = io::stderr();
        let mut lines = self.lines.lock().await;

        loop {
            if let Err(e) = stderr.write_all(question.as_bytes()).await {
                warn!("Failed to write prompt: {e}");
                return Decision::Abort;
            }
            if let Err(e) = stderr.flush().await {
                warn!("Failed to flush prompt: {e}");
            }

            match lines.next_line().await {
                Ok(Some(answer)) => {
                    if let Some(decision) = parse_answer(&answer) {
                        return decision;
                    }
                }
                // Closed stdin means nobody can approve continuing.
                Ok(None) => return Decision::Abort,
                Err(e) => {
                    warn!("Failed to read answer: {e}");
                    return Decision::Abort;
                }
            }
        }
    }
}

impl Default for PromptOperator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Operator for PromptOperator {
    async fn on_failure(&self, entry: &BatchEntry, remaining: usize) -> Decision {
        let question = format!(
            "Entry {} to {} failed: {}\n{remaining} entries remaining. Continue? [y/n] ",
            entry.index,
            entry.request.destination,
            entry.error_detail().unwrap_or("unknown error"),
        );
        self.ask(&question).await
    }

    async fn on_gap(&self, report: &GapReport) -> Decision {
        let question = format!(
            "Sender has {} unconfirmed submission(s) in flight. Submitting now may leave \
             transactions stuck. Proceed anyway? [y/n] ",
            report.gap_size
        );
        self.ask(&question).await
    }
}

fn parse_answer(answer: &str) -> Option<Decision> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "c" | "continue" => Some(Decision::Continue),
        "n" | "no" | "a" | "abort" => Some(Decision::Abort),
        _ => None,
    }
}
