use crate::{gap::GapReport, request::BatchEntry};
use async_trait::async_trait;
use std::{fmt, sync::Arc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Continue,
    Abort,
}

/// Human (or scripted) supervisor consulted at the engine's decision points
#[async_trait]
pub trait Operator: Send + Sync {
    /// An entry ended in `Error` and `remaining` entries are still pending
    async fn on_failure(&self, entry: &BatchEntry, remaining: usize) -> Decision;

    /// The sender has unresolved submissions before the batch starts
    async fn on_gap(&self, report: &GapReport) -> Decision;
}

/// How a batch proceeds past a failed entry or a pre-existing sequence gap
#[derive(Clone)]
pub enum ContinuationPolicy {
    AlwaysContinue,
    AlwaysAbort,
    AskCaller(Arc<dyn Operator>),
}

impl ContinuationPolicy {
    pub fn ask(operator: impl Operator + 'static) -> Self {
        Self::AskCaller(Arc::new(operator))
    }

    pub async fn on_failure(&self, entry: &BatchEntry, remaining: usize) -> Decision {
        match self {
            Self::AlwaysContinue => Decision::Continue,
            Self::AlwaysAbort => Decision::Abort,
            Self::AskCaller(operator) => operator.on_failure(entry, remaining).await,
        }
    }

    pub async fn on_gap(&self, report: &GapReport) -> Decision {
        match self {
            Self::AlwaysContinue => Decision::Continue,
            Self::AlwaysAbort => Decision::Abort,
            Self::AskCaller(operator) => operator.on_gap(report).await,
        }
    }
}

impl fmt::Debug for ContinuationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlwaysContinue => f.write_str("AlwaysContinue"),
            Self::AlwaysAbort => f.write_str("AlwaysAbort"),
            Self::AskCaller(_) => f.write_str("AskCaller"),
        }
    }
}
