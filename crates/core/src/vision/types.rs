//! Types for the vision capability.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::match_result::MatchResult;

/// Errors from scorecard image analysis.
#[derive(Debug, Error)]
pub enum VisionError {
    /// The image could not be interpreted as a scorecard.
    #[error("Unreadable image: {0}")]
    UnreadableImage(String),

    /// The vision service could not be reached or refused the request.
    #[error("Vision service unavailable: {0}")]
    ServiceUnavailable(String),

    /// The service answered but the answer could not be used.
    #[error("Invalid response from vision service: {0}")]
    InvalidResponse(String),

    #[error("Vision request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Vision service not configured")]
    NotConfigured,
}

/// An uploaded image as received from the caller.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub content_type: String,
}

impl ImageUpload {
    pub fn new(
        bytes: impl Into<Vec<u8>>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            bytes: bytes.into(),
            file_name: file_name.into(),
            content_type: content_type.into(),
        }
    }
}

/// Result of analysing one scorecard image.
///
/// Immutable once created; the confidence is always within [0.0, 1.0].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisOutcome {
    match_result: MatchResult,
    raw_analysis: String,
    confidence: f64,
}

impl AnalysisOutcome {
    pub fn new(
        match_result: MatchResult,
        raw_analysis: impl Into<String>,
        confidence: f64,
    ) -> Result<Self, VisionError> {
        if confidence.is_nan() || !(0.0..=1.0).contains(&confidence) {
            return Err(VisionError::InvalidResponse(format!(
                "confidence must be within [0, 1], got {}",
                confidence
            )));
        }
        Ok(Self {
            match_result,
            raw_analysis: raw_analysis.into(),
            confidence,
        })
    }

    pub fn match_result(&self) -> &MatchResult {
        &self.match_result
    }

    pub fn raw_analysis(&self) -> &str {
        &self.raw_analysis
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Confidence is strictly below `threshold`.
    pub fn is_below(&self, threshold: f64) -> bool {
        self.confidence < threshold
    }

    pub fn into_match_result(self) -> MatchResult {
        self.match_result
    }
}

/// Extracts a structured match result from a scorecard image.
#[async_trait]
pub trait VisionAnalyzer: Send + Sync {
    /// Provider name (e.g., "azure_openai", "mock")
    fn provider(&self) -> &str;

    /// Model or deployment name
    fn model(&self) -> &str;

    async fn analyze(&self, image: &ImageUpload) -> Result<AnalysisOutcome, VisionError>;
}
