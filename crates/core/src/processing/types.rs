//! Types for the processing service.

use serde::Serialize;
use thiserror::Error;

use crate::league::LeagueError;
use crate::match_result::ValidationIssue;
use crate::vision::{AnalysisOutcome, VisionError};

/// Errors from the processing service.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// Scorecard analysis failed.
    #[error("analysis failed: {0}")]
    Analysis(#[from] VisionError),

    /// League site client could not be created.
    #[error("league site client: {0}")]
    LeagueSite(#[from] LeagueError),
}

/// Analysis result returned to the caller for confirmation.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub analysis: AnalysisOutcome,
    /// Confidence is below the threshold or the result is inconsistent.
    pub needs_review: bool,
    pub threshold: f64,
    /// Inconsistencies found in the extracted result.
    pub issues: Vec<ValidationIssue>,
}

impl AnalysisReport {
    pub fn new(analysis: AnalysisOutcome, threshold: f64) -> Self {
        let issues = analysis.match_result().issues();
        let needs_review = analysis.is_below(threshold) || !issues.is_empty();
        Self {
            analysis,
            needs_review,
            threshold,
            issues,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::match_result::GameResult;
    use crate::testing::fixtures;

    #[test]
    fn test_report_flags_inconsistent_game() {
        let result = fixtures::match_result()
            .with_game(GameResult::new("P1", "P2", "P2").with_scores(21, 10));
        let analysis = AnalysisOutcome::new(result, "", 0.99).unwrap();

        let report = AnalysisReport::new(analysis, 0.8);
        assert!(report.needs_review);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].field, "games[0].winner");
    }

    #[test]
    fn test_report_serializes_analysis() {
        let analysis = AnalysisOutcome::new(fixtures::match_result(), "raw", 0.9).unwrap();
        let json = serde_json::to_value(AnalysisReport::new(analysis, 0.8)).unwrap();

        assert_eq!(json["needs_review"], false);
        assert_eq!(json["analysis"]["confidence"], 0.9);
        assert_eq!(json["analysis"]["match_result"]["home_team"], "A");
        assert_eq!(json["analysis"]["raw_analysis"], "raw");
    }
}
