//! Submission orchestrator implementation.
//!
//! One call to [`SubmissionOrchestrator::submit`] runs one submission to
//! completion on the caller's task. Steps are strictly sequential; the
//! orchestrator itself holds no per-submission state, so independent
//! submissions can run concurrently on a shared instance.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::league::{resolve_image, LeagueError, LeagueSite};
use crate::metrics::{SUBMISSIONS_TOTAL, SUBMISSION_DURATION, SUBMISSION_STEPS};
use crate::retry::{Attempted, RetryError, RetryPolicy};

use super::config::OrchestratorConfig;
use super::types::{
    FailureKind, OutcomeStatus, StepStatus, SubmissionOutcome, SubmissionPhase, SubmissionRequest,
};

/// Callback invoked on every phase transition.
///
/// Receives the submission id and the phase being entered.
pub type PhaseCallback = Arc<dyn Fn(Uuid, SubmissionPhase) + Send + Sync>;

const LEAGUE_INVALID: &str = "league invalid or unreachable";
const SUBMISSION_FAILED: &str = "submission failed";
const UPLOAD_FAILED: &str = "image upload failed";

/// Step results collected while a submission runs.
struct Progress {
    submission_id: Uuid,
    league_id: String,
    started: Instant,
    validated: StepStatus,
    submitted: StepStatus,
    image_uploaded: StepStatus,
}

impl Progress {
    fn new(league_id: &str) -> Self {
        Self {
            submission_id: Uuid::new_v4(),
            league_id: league_id.to_string(),
            started: Instant::now(),
            validated: StepStatus::Skipped,
            submitted: StepStatus::Skipped,
            image_uploaded: StepStatus::Skipped,
        }
    }
}

/// How a retried step ended.
enum StepEnd {
    Succeeded(StepStatus),
    Failed(StepStatus, FailureKind, String),
    Cancelled,
}

/// Validates the league, submits the result and uploads the scorecard image.
pub struct SubmissionOrchestrator {
    config: OrchestratorConfig,
    policy: RetryPolicy,
    league_site: Arc<dyn LeagueSite>,
    phase_callback: Option<PhaseCallback>,
    image_root: Option<PathBuf>,
}

impl SubmissionOrchestrator {
    pub fn new(config: OrchestratorConfig, league_site: Arc<dyn LeagueSite>) -> Self {
        let policy = RetryPolicy::from_config(&config.retry);
        Self {
            config,
            policy,
            league_site,
            phase_callback: None,
            image_root: None,
        }
    }

    /// Refuse scorecard images outside `root` before anything is submitted.
    pub fn with_image_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.image_root = Some(root.into());
        self
    }

    /// Set a callback to be invoked on every phase transition.
    pub fn with_phase_callback(mut self, callback: PhaseCallback) -> Self {
        self.phase_callback = Some(callback);
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Name of the league site backend.
    pub fn league_site_name(&self) -> &str {
        self.league_site.name()
    }

    /// Run one submission to completion.
    ///
    /// Never returns an error: every failure, including cancellation, is
    /// reported in the outcome.
    pub async fn submit(
        &self,
        request: SubmissionRequest,
        cancel: &CancellationToken,
    ) -> SubmissionOutcome {
        let mut progress = Progress::new(&request.league_id);
        let id = progress.submission_id;

        info!(
            submission_id = %id,
            league_id = %request.league_id,
            fixture = %request.match_result.fixture_label(),
            games = request.match_result.games.len(),
            has_image = request.match_result.image.is_some(),
            "Starting submission"
        );
        self.enter(id, SubmissionPhase::Idle);

        if let Err(reason) = check_input(&request) {
            progress.validated = StepStatus::Failed {
                kind: FailureKind::InvalidInput,
                reason: reason.clone(),
                attempts: 0,
            };
            return self.finish(
                progress,
                OutcomeStatus::Failed,
                Some((FailureKind::InvalidInput, reason)),
            );
        }

        if let (Some(root), Some(image)) = (&self.image_root, &request.match_result.image) {
            if let Err(e) = resolve_image(root, image).await {
                let reason = e.to_string();
                progress.validated = StepStatus::Failed {
                    kind: FailureKind::InvalidInput,
                    reason: reason.clone(),
                    attempts: 0,
                };
                return self.finish(
                    progress,
                    OutcomeStatus::Failed,
                    Some((FailureKind::InvalidInput, reason)),
                );
            }
        }

        let site = self.league_site.as_ref();
        let league_id = request.league_id.as_str();
        let match_result = &request.match_result;
        let credentials = &request.credentials;

        // Validate league (single attempt)
        self.enter(id, SubmissionPhase::Validating);
        let check = RetryPolicy::no_retry()
            .run("league_exists", cancel, move |_| {
                self.bounded(site.league_exists(league_id))
            })
            .await;

        match check {
            Ok(Attempted {
                value: true,
                attempts,
            }) => {
                progress.validated = StepStatus::Success { attempts };
            }
            Ok(Attempted {
                value: false,
                attempts,
            }) => {
                let detail = format!("league {} does not exist", league_id);
                progress.validated = StepStatus::Failed {
                    kind: FailureKind::PreconditionFailed,
                    reason: detail.clone(),
                    attempts,
                };
                return self.finish(
                    progress,
                    OutcomeStatus::Failed,
                    Some((
                        FailureKind::PreconditionFailed,
                        format!("{}: {}", LEAGUE_INVALID, detail),
                    )),
                );
            }
            Err(RetryError::Cancelled { .. }) => {
                return self.finish(progress, OutcomeStatus::Cancelled, None);
            }
            Err(e) => {
                let kind = match e.last_error() {
                    Some(LeagueError::NotFound(_)) => FailureKind::PreconditionFailed,
                    Some(error) => FailureKind::from(error),
                    None => FailureKind::TransientExternalFailure,
                };
                let detail = describe(&e);
                progress.validated = StepStatus::Failed {
                    kind,
                    reason: detail.clone(),
                    attempts: e.attempts(),
                };
                return self.finish(
                    progress,
                    OutcomeStatus::Failed,
                    Some((kind, format!("{}: {}", LEAGUE_INVALID, detail))),
                );
            }
        }

        // Submit result (retried)
        self.enter(id, SubmissionPhase::Submitting);
        let submit = self
            .policy
            .run("submit_result", cancel, move |attempt| {
                debug!(submission_id = %id, attempt, "Posting match result");
                self.bounded(site.submit_result(league_id, match_result, credentials))
            })
            .await;

        match classify_step(submit, "site did not confirm the result") {
            StepEnd::Succeeded(status) => progress.submitted = status,
            StepEnd::Failed(status, kind, detail) => {
                progress.submitted = status;
                return self.finish(
                    progress,
                    OutcomeStatus::Failed,
                    Some((kind, format!("{}: {}", SUBMISSION_FAILED, detail))),
                );
            }
            StepEnd::Cancelled => {
                return self.finish(progress, OutcomeStatus::Cancelled, None);
            }
        }

        // Upload image (retried, failure is partial success)
        let Some(image) = match_result.image.as_ref() else {
            debug!(submission_id = %id, "No scorecard image, skipping upload");
            return self.finish(progress, OutcomeStatus::Success, None);
        };

        self.enter(id, SubmissionPhase::Uploading);
        let upload = self
            .policy
            .run("upload_image", cancel, move |attempt| {
                debug!(submission_id = %id, attempt, "Uploading scorecard image");
                self.bounded(site.upload_image(league_id, image, credentials))
            })
            .await;

        match classify_step(upload, "site did not confirm the image") {
            StepEnd::Succeeded(status) => {
                progress.image_uploaded = status;
                self.finish(progress, OutcomeStatus::Success, None)
            }
            StepEnd::Failed(status, kind, detail) => {
                progress.image_uploaded = status;
                self.finish(
                    progress,
                    OutcomeStatus::PartialSuccess,
                    Some((kind, format!("{}: {}", UPLOAD_FAILED, detail))),
                )
            }
            StepEnd::Cancelled => self.finish(progress, OutcomeStatus::Cancelled, None),
        }
    }

    /// Bound one league-site call by the configured call timeout.
    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, LeagueError>>,
    ) -> Result<T, LeagueError> {
        let limit = self.config.call_timeout();
        tokio::time::timeout(limit, call)
            .await
            .unwrap_or_else(|_| Err(LeagueError::Timeout(limit)))
    }

    fn enter(&self, submission_id: Uuid, phase: SubmissionPhase) {
        debug!(%submission_id, phase = phase.as_str(), "Submission phase");
        if let Some(ref callback) = self.phase_callback {
            callback(submission_id, phase);
        }
    }

    fn finish(
        &self,
        progress: Progress,
        status: OutcomeStatus,
        failure: Option<(FailureKind, String)>,
    ) -> SubmissionOutcome {
        let phase = match status {
            OutcomeStatus::Success | OutcomeStatus::PartialSuccess => SubmissionPhase::Done,
            OutcomeStatus::Failed => SubmissionPhase::Failed,
            OutcomeStatus::Cancelled => SubmissionPhase::Cancelled,
        };
        self.enter(progress.submission_id, phase);

        let elapsed = progress.started.elapsed();
        SUBMISSIONS_TOTAL.with_label_values(&[status.as_str()]).inc();
        SUBMISSION_DURATION
            .with_label_values(&[status.as_str()])
            .observe(elapsed.as_secs_f64());
        for (step, step_status) in [
            ("validate", &progress.validated),
            ("submit", &progress.submitted),
            ("upload", &progress.image_uploaded),
        ] {
            SUBMISSION_STEPS
                .with_label_values(&[step, step_status.as_str()])
                .inc();
        }

        let (failure_kind, reason) = match failure {
            Some((kind, reason)) => (Some(kind), Some(reason)),
            None if status == OutcomeStatus::Cancelled => {
                let reason = if progress.submitted.is_success() {
                    "submission cancelled after the result was recorded"
                } else {
                    "submission cancelled"
                };
                (None, Some(reason.to_string()))
            }
            None => (None, None),
        };

        let outcome = SubmissionOutcome {
            submission_id: progress.submission_id,
            league_id: progress.league_id,
            status,
            validated: progress.validated,
            submitted: progress.submitted,
            image_uploaded: progress.image_uploaded,
            failure_kind,
            reason,
            duration_ms: elapsed.as_millis() as u64,
        };

        match outcome.status {
            OutcomeStatus::Success | OutcomeStatus::Cancelled => info!(
                submission_id = %outcome.submission_id,
                status = outcome.status.as_str(),
                duration_ms = outcome.duration_ms,
                "Submission finished"
            ),
            OutcomeStatus::PartialSuccess | OutcomeStatus::Failed => warn!(
                submission_id = %outcome.submission_id,
                status = outcome.status.as_str(),
                failure_kind = outcome.failure_kind.map(|k| k.as_str()).unwrap_or("none"),
                reason = outcome.reason.as_deref().unwrap_or(""),
                duration_ms = outcome.duration_ms,
                "Submission finished"
            ),
        }

        outcome
    }
}

/// Reject requests that could never succeed before touching the site.
fn check_input(request: &SubmissionRequest) -> Result<(), String> {
    let mut problems = Vec::new();
    if request.league_id.trim().is_empty() {
        problems.push("league_id is required".to_string());
    }
    if !request.credentials.is_complete() {
        problems.push("username and password are required".to_string());
    }
    if let Err(invalid) = request.match_result.validate() {
        problems.push(invalid.to_string());
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(problems.join("; "))
    }
}

fn describe(error: &RetryError<LeagueError>) -> String {
    match error.last_error() {
        Some(e) => e.to_string(),
        None => "cancelled".to_string(),
    }
}

/// Fold a retried league-site call into a step result.
/// `Ok(false)` is a terminal rejection described by `unconfirmed`.
fn classify_step(
    result: Result<Attempted<bool>, RetryError<LeagueError>>,
    unconfirmed: &str,
) -> StepEnd {
    match result {
        Ok(Attempted {
            value: true,
            attempts,
        }) => StepEnd::Succeeded(StepStatus::Success { attempts }),
        Ok(Attempted {
            value: false,
            attempts,
        }) => StepEnd::Failed(
            StepStatus::Failed {
                kind: FailureKind::Rejected,
                reason: unconfirmed.to_string(),
                attempts,
            },
            FailureKind::Rejected,
            unconfirmed.to_string(),
        ),
        Err(RetryError::Cancelled { .. }) => StepEnd::Cancelled,
        Err(e) => {
            let kind = e
                .last_error()
                .map(FailureKind::from)
                .unwrap_or(FailureKind::TransientExternalFailure);
            let detail = describe(&e);
            StepEnd::Failed(
                StepStatus::Failed {
                    kind,
                    reason: detail.clone(),
                    attempts: e.attempts(),
                },
                kind,
                detail,
            )
        }
    }
}
