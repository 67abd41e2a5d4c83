//! Mock league site for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::league::{Credentials, LeagueError, LeagueSite};
use crate::match_result::{ImageRef, MatchResult};

/// Which league-site operation was called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeagueOperation {
    LeagueExists,
    SubmitResult,
    UploadImage,
}

/// A recorded call for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub operation: LeagueOperation,
    pub league_id: String,
    /// Username, for authenticated operations.
    pub username: Option<String>,
    /// When the call was made (tokio clock, so paused-time tests see
    /// exact backoff gaps).
    pub at: Instant,
}

#[derive(Default)]
struct Scripted {
    responses: VecDeque<Result<bool, LeagueError>>,
    delay: Option<Duration>,
}

/// Mock implementation of the LeagueSite trait.
///
/// Provides controllable behavior for testing:
/// - Queue per-operation responses (errors or `Ok(false)`); once a queue
///   is empty the operation succeeds
/// - Track every call for assertions
/// - Simulate slow responses
///
/// # Example
///
/// ```rust,ignore
/// use scorecard_core::testing::MockLeagueSite;
///
/// let site = MockLeagueSite::new();
/// site.queue_submit(Err(LeagueError::ServerError { status: 503 })).await;
///
/// // First submit fails with 503, the retry succeeds
/// let outcome = orchestrator.submit(request, &cancel).await;
/// assert_eq!(site.submit_calls().await, 2);
/// ```
pub struct MockLeagueSite {
    league_exists: Arc<RwLock<bool>>,
    league_checks: Arc<RwLock<Scripted>>,
    submits: Arc<RwLock<Scripted>>,
    uploads: Arc<RwLock<Scripted>>,
    calls: Arc<RwLock<Vec<RecordedCall>>>,
    submitted_results: Arc<RwLock<Vec<MatchResult>>>,
    uploaded_images: Arc<RwLock<Vec<ImageRef>>>,
}

impl std::fmt::Debug for MockLeagueSite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockLeagueSite")
            .field("league_exists", &"<league_exists>")
            .field("calls", &"<calls>")
            .finish()
    }
}

impl Default for MockLeagueSite {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLeagueSite {
    /// Create a mock where the league exists and every call succeeds.
    pub fn new() -> Self {
        Self {
            league_exists: Arc::new(RwLock::new(true)),
            league_checks: Arc::new(RwLock::new(Scripted::default())),
            submits: Arc::new(RwLock::new(Scripted::default())),
            uploads: Arc::new(RwLock::new(Scripted::default())),
            calls: Arc::new(RwLock::new(Vec::new())),
            submitted_results: Arc::new(RwLock::new(Vec::new())),
            uploaded_images: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Answer for league checks once the queue is empty.
    pub async fn set_league_exists(&self, exists: bool) {
        *self.league_exists.write().await = exists;
    }

    pub async fn queue_league_check(&self, response: Result<bool, LeagueError>) {
        self.league_checks.write().await.responses.push_back(response);
    }

    pub async fn queue_submit(&self, response: Result<bool, LeagueError>) {
        self.submits.write().await.responses.push_back(response);
    }

    pub async fn queue_upload(&self, response: Result<bool, LeagueError>) {
        self.uploads.write().await.responses.push_back(response);
    }

    /// Queue the same retryable failure `count` times for submission.
    pub async fn fail_submits(&self, count: usize) {
        let mut submits = self.submits.write().await;
        for _ in 0..count {
            submits
                .responses
                .push_back(Err(LeagueError::ServerError { status: 503 }));
        }
    }

    /// Queue the same retryable failure `count` times for upload.
    pub async fn fail_uploads(&self, count: usize) {
        let mut uploads = self.uploads.write().await;
        for _ in 0..count {
            uploads
                .responses
                .push_back(Err(LeagueError::ConnectionFailed("connection reset".into())));
        }
    }

    pub async fn set_league_check_delay(&self, delay: Duration) {
        self.league_checks.write().await.delay = Some(delay);
    }

    pub async fn set_submit_delay(&self, delay: Duration) {
        self.submits.write().await.delay = Some(delay);
    }

    pub async fn set_upload_delay(&self, delay: Duration) {
        self.uploads.write().await.delay = Some(delay);
    }

    /// Get every recorded call in order.
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.read().await.clone()
    }

    /// Recorded calls for one operation.
    pub async fn calls_for(&self, operation: LeagueOperation) -> Vec<RecordedCall> {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| c.operation == operation)
            .cloned()
            .collect()
    }

    pub async fn league_checks(&self) -> usize {
        self.calls_for(LeagueOperation::LeagueExists).await.len()
    }

    pub async fn submit_calls(&self) -> usize {
        self.calls_for(LeagueOperation::SubmitResult).await.len()
    }

    pub async fn upload_calls(&self) -> usize {
        self.calls_for(LeagueOperation::UploadImage).await.len()
    }

    /// Results the site accepted.
    pub async fn submitted_results(&self) -> Vec<MatchResult> {
        self.submitted_results.read().await.clone()
    }

    /// Images the site accepted.
    pub async fn uploaded_images(&self) -> Vec<ImageRef> {
        self.uploaded_images.read().await.clone()
    }

    /// Clear all recorded state.
    pub async fn clear(&self) {
        self.calls.write().await.clear();
        self.submitted_results.write().await.clear();
        self.uploaded_images.write().await.clear();
    }

    async fn record(&self, operation: LeagueOperation, league_id: &str, username: Option<&str>) {
        self.calls.write().await.push(RecordedCall {
            operation,
            league_id: league_id.to_string(),
            username: username.map(str::to_string),
            at: Instant::now(),
        });
    }

    /// Take the next scripted response, sleeping for the configured delay.
    async fn respond(script: &RwLock<Scripted>, default: bool) -> Result<bool, LeagueError> {
        let (response, delay) = {
            let mut script = script.write().await;
            (script.responses.pop_front(), script.delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        response.unwrap_or(Ok(default))
    }
}

#[async_trait]
impl LeagueSite for MockLeagueSite {
    fn name(&self) -> &str {
        "mock"
    }

    async fn league_exists(&self, league_id: &str) -> Result<bool, LeagueError> {
        self.record(LeagueOperation::LeagueExists, league_id, None)
            .await;
        let default = *self.league_exists.read().await;
        Self::respond(&self.league_checks, default).await
    }

    async fn submit_result(
        &self,
        league_id: &str,
        result: &MatchResult,
        credentials: &Credentials,
    ) -> Result<bool, LeagueError> {
        self.record(
            LeagueOperation::SubmitResult,
            league_id,
            Some(&credentials.username),
        )
        .await;
        let response = Self::respond(&self.submits, true).await;
        if matches!(response, Ok(true)) {
            self.submitted_results.write().await.push(result.clone());
        }
        response
    }

    async fn upload_image(
        &self,
        league_id: &str,
        image: &ImageRef,
        credentials: &Credentials,
    ) -> Result<bool, LeagueError> {
        self.record(
            LeagueOperation::UploadImage,
            league_id,
            Some(&credentials.username),
        )
        .await;
        let response = Self::respond(&self.uploads, true).await;
        if matches!(response, Ok(true)) {
            self.uploaded_images.write().await.push(image.clone());
        }
        response
    }
}
