//! Submission orchestrator.
//!
//! Drives one match result through the league site:
//! - **Validate**: the league must exist (single attempt)
//! - **Submit**: record the result (retried with backoff)
//! - **Upload**: attach the scorecard image if there is one (retried; a
//!   failure here leaves the submission partially successful)

mod config;
mod runner;
mod types;

pub use config::OrchestratorConfig;
pub use runner::{PhaseCallback, SubmissionOrchestrator};
pub use types::{
    FailureKind, OutcomeStatus, StepStatus, SubmissionOutcome, SubmissionPhase, SubmissionRequest,
};
