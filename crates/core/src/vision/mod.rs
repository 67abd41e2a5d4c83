//! Scorecard image analysis.
//!
//! A [`VisionAnalyzer`] turns an uploaded scorecard image into an
//! [`AnalysisOutcome`]: the extracted match result plus the model's
//! self-reported confidence.

mod azure;
mod types;

pub use azure::AzureOpenAiVision;
pub use types::*;
