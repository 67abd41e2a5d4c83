//! Types for the submission orchestrator.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::league::{Credentials, LeagueError};
use crate::match_result::MatchResult;

/// Where a submission currently is.
///
/// `Idle → Validating → Submitting → Uploading → Done`, with early exits to
/// `Failed` from validation and submission and to `Cancelled` from any
/// point that waits on the league site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionPhase {
    Idle,
    Validating,
    Submitting,
    Uploading,
    Done,
    Failed,
    Cancelled,
}

impl SubmissionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::Submitting => "submitting",
            Self::Uploading => "uploading",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Cancelled)
    }
}

/// Machine-checkable failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The request itself was unusable; nothing was sent.
    InvalidInput,
    /// The league does not exist.
    PreconditionFailed,
    /// Timeouts, 5xx, rate limiting and dropped connections.
    TransientExternalFailure,
    /// The site refused the credentials or the session.
    AuthenticationFailure,
    /// The site declined a well-formed request, or its pages no longer
    /// have the expected structure.
    Rejected,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::PreconditionFailed => "precondition_failed",
            Self::TransientExternalFailure => "transient_external_failure",
            Self::AuthenticationFailure => "authentication_failure",
            Self::Rejected => "rejected",
        }
    }
}

impl From<&LeagueError> for FailureKind {
    fn from(error: &LeagueError) -> Self {
        match error {
            LeagueError::AuthenticationFailed(_) => Self::AuthenticationFailure,
            LeagueError::NotFound(_)
            | LeagueError::InvalidRequest(_)
            | LeagueError::UnexpectedResponse(_) => Self::Rejected,
            LeagueError::RateLimited
            | LeagueError::ServerError { .. }
            | LeagueError::Timeout(_)
            | LeagueError::ConnectionFailed(_) => Self::TransientExternalFailure,
            LeagueError::ImageRead { .. } | LeagueError::ImageRejected(_) => Self::InvalidInput,
        }
    }
}

/// Result of one orchestration step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepStatus {
    Success {
        attempts: u32,
    },
    Failed {
        kind: FailureKind,
        reason: String,
        attempts: u32,
    },
    Skipped,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::Failed { .. } => "failed",
            Self::Skipped => "skipped",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Failed { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Attempts made by this step (0 when skipped).
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Success { attempts } | Self::Failed { attempts, .. } => *attempts,
            Self::Skipped => 0,
        }
    }
}

/// Aggregate status of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    /// The result was recorded but the image could not be attached.
    PartialSuccess,
    Failed,
    Cancelled,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::PartialSuccess => "partial_success",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Everything the caller needs to know about one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    pub submission_id: Uuid,
    pub league_id: String,
    pub status: OutcomeStatus,
    pub validated: StepStatus,
    pub submitted: StepStatus,
    pub image_uploaded: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_kind: Option<FailureKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub duration_ms: u64,
}

impl SubmissionOutcome {
    /// The match result was recorded on the league site.
    ///
    /// Holds for a cancelled run too when cancellation arrived after the
    /// submit step had already succeeded.
    pub fn result_recorded(&self) -> bool {
        self.submitted.is_success()
    }
}

/// One request to record a match result.
#[derive(Debug, Clone)]
pub struct SubmissionRequest {
    pub match_result: MatchResult,
    pub credentials: Credentials,
    pub league_id: String,
}

impl SubmissionRequest {
    pub fn new(
        match_result: MatchResult,
        credentials: Credentials,
        league_id: impl Into<String>,
    ) -> Self {
        Self {
            match_result,
            credentials,
            league_id: league_id.into(),
        }
    }
}
