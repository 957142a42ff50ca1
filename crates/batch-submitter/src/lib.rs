//! Sequential batch submission engine.
//!
//! Submits many operations from one sender whose shared sequence counter
//! forbids parallel dispatch. Requests are screened at intake, the sender is
//! checked for unresolved submissions, then entries are dispatched strictly
//! one at a time with an operator decision after each failure.

pub mod audit;
pub mod collaborators;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod gap;
pub mod policy;
pub mod request;
pub mod result;
pub mod store;
pub mod validator;

pub use collaborators::{
    AuditSink, PolicyDecision, PolicyValidator, SequenceSource, SequenceStatus,
    SubmissionFailure, SubmissionReceipt, Submitter,
};
pub use config::EngineConfig;
pub use engine::BatchEngine;
pub use error::{EngineError, StateError};
pub use gap::GapReport;
pub use policy::{ContinuationPolicy, Decision, Operator};
pub use request::{BatchEntry, EntryState, EntryStatus, SenderId, SubmissionRequest};
pub use result::{BatchOutcome, BatchResult};
pub use validator::{DestinationFormat, ValidationError};
