//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the external capabilities,
//! so the orchestrator, the processing service and the HTTP API can be
//! tested without a league site or vision service.
//!
//! # Example
//!
//! ```rust,ignore
//! use scorecard_core::testing::{fixtures, MockLeagueSite, MockVision};
//!
//! let site = MockLeagueSite::new();
//! let vision = MockVision::new();
//!
//! // Configure mock responses
//! site.set_league_exists(false).await;
//! vision.set_confidence(0.4).await;
//! ```

mod mock_league_site;
mod mock_vision;

pub use mock_league_site::{LeagueOperation, MockLeagueSite, RecordedCall};
pub use mock_vision::{MockVision, RecordedAnalysis};

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::NaiveDate;

    use crate::league::Credentials;
    use crate::match_result::{GameResult, ImageRef, MatchResult};
    use crate::orchestrator::SubmissionRequest;

    pub const LEAGUE_ID: &str = "186006607";

    pub fn match_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, 18).expect("valid fixture date")
    }

    /// A vs B, 3-2, no games, no image.
    pub fn match_result() -> MatchResult {
        MatchResult::new("A", "B", 3, 2, match_date())
    }

    /// A five-game scorecard with per-game scores.
    pub fn scorecard_match() -> MatchResult {
        MatchResult::new("Team A", "Team B", 3, 2, match_date())
            .with_game(GameResult::new("Player 1", "Player 2", "Player 1").with_scores(21, 18))
            .with_game(GameResult::new("Player 3", "Player 4", "Player 4").with_scores(15, 21))
            .with_game(GameResult::new("Player 5", "Player 6", "Player 5").with_scores(21, 19))
            .with_game(GameResult::new("Player 7", "Player 8", "Player 7").with_scores(21, 16))
            .with_game(GameResult::new("Player 9", "Player 10", "Player 10").with_scores(18, 21))
    }

    pub fn image_ref() -> ImageRef {
        ImageRef::new("/tmp/scorecard.jpg").with_content_type("image/jpeg")
    }

    pub fn credentials() -> Credentials {
        Credentials::new("coach", "secret")
    }

    pub fn request(result: MatchResult) -> SubmissionRequest {
        SubmissionRequest::new(result, credentials(), LEAGUE_ID)
    }
}
