//! Mock vision analyzer for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::match_result::MatchResult;
use crate::vision::{AnalysisOutcome, ImageUpload, VisionAnalyzer, VisionError};

/// A recorded analysis request.
#[derive(Debug, Clone)]
pub struct RecordedAnalysis {
    pub file_name: String,
    pub content_type: String,
    pub size: usize,
}

/// Mock implementation of the VisionAnalyzer trait.
///
/// Returns a configurable match result and confidence, or a one-shot
/// error set with [`MockVision::set_next_error`].
pub struct MockVision {
    result: Arc<RwLock<MatchResult>>,
    confidence: Arc<RwLock<f64>>,
    next_error: Arc<RwLock<Option<VisionError>>>,
    analyses: Arc<RwLock<Vec<RecordedAnalysis>>>,
}

impl std::fmt::Debug for MockVision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockVision")
            .field("result", &"<result>")
            .field("next_error", &"<next_error>")
            .finish()
    }
}

impl Default for MockVision {
    fn default() -> Self {
        Self::new()
    }
}

impl MockVision {
    /// Create a mock that reads every image as the fixture scorecard.
    pub fn new() -> Self {
        Self::with_result(super::fixtures::scorecard_match(), 0.85)
    }

    pub fn with_result(result: MatchResult, confidence: f64) -> Self {
        Self {
            result: Arc::new(RwLock::new(result)),
            confidence: Arc::new(RwLock::new(confidence)),
            next_error: Arc::new(RwLock::new(None)),
            analyses: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn set_result(&self, result: MatchResult) {
        *self.result.write().await = result;
    }

    pub async fn set_confidence(&self, confidence: f64) {
        *self.confidence.write().await = confidence;
    }

    /// The next analysis fails with this error.
    pub async fn set_next_error(&self, error: VisionError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn recorded_analyses(&self) -> Vec<RecordedAnalysis> {
        self.analyses.read().await.clone()
    }
}

#[async_trait]
impl VisionAnalyzer for MockVision {
    fn provider(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-vision"
    }

    async fn analyze(&self, image: &ImageUpload) -> Result<AnalysisOutcome, VisionError> {
        self.analyses.write().await.push(RecordedAnalysis {
            file_name: image.file_name.clone(),
            content_type: image.content_type.clone(),
            size: image.bytes.len(),
        });

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        let result = self.result.read().await.clone();
        let confidence = *self.confidence.read().await;
        AnalysisOutcome::new(result, "mock analysis", confidence)
    }
}
