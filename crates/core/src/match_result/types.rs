//! Match result types shared by analysis and submission.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Final structured outcome of a played match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub home_team: String,
    pub away_team: String,
    pub home_score: u32,
    pub away_score: u32,
    pub match_date: NaiveDate,
    /// Individual games in play order.
    #[serde(default)]
    pub games: Vec<GameResult>,
    /// Scorecard image to attach after the result is recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,
}

impl MatchResult {
    pub fn new(
        home_team: impl Into<String>,
        away_team: impl Into<String>,
        home_score: u32,
        away_score: u32,
        match_date: NaiveDate,
    ) -> Self {
        Self {
            home_team: home_team.into(),
            away_team: away_team.into(),
            home_score,
            away_score,
            match_date,
            games: Vec::new(),
            image: None,
        }
    }

    pub fn with_game(mut self, game: GameResult) -> Self {
        self.games.push(game);
        self
    }

    pub fn with_image(mut self, image: ImageRef) -> Self {
        self.image = Some(image);
        self
    }

    /// Short "Home vs Away" label for logs.
    pub fn fixture_label(&self) -> String {
        format!("{} vs {}", self.home_team, self.away_team)
    }
}

/// A single game within a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResult {
    pub home_player: String,
    pub away_player: String,
    /// Must equal either `home_player` or `away_player`.
    pub winner: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_player_score: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub away_player_score: Option<u32>,
}

impl GameResult {
    pub fn new(
        home_player: impl Into<String>,
        away_player: impl Into<String>,
        winner: impl Into<String>,
    ) -> Self {
        Self {
            home_player: home_player.into(),
            away_player: away_player.into(),
            winner: winner.into(),
            home_player_score: None,
            away_player_score: None,
        }
    }

    pub fn with_scores(mut self, home: u32, away: u32) -> Self {
        self.home_player_score = Some(home);
        self.away_player_score = Some(away);
        self
    }
}

/// Content types accepted for scorecard uploads.
pub const ACCEPTED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png", "image/gif"];

/// Whether a declared content type is an accepted scorecard image type.
pub fn is_accepted_image_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    ACCEPTED_IMAGE_TYPES.contains(&essence.as_str())
}

/// Reference to a scorecard image held on local disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl ImageRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// File name component used as the upload file name.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "scorecard".to_string())
    }

    /// Declared content type, falling back to a guess from the extension.
    pub fn resolved_content_type(&self) -> &str {
        if let Some(ct) = &self.content_type {
            return ct;
        }
        match self
            .path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("png") => "image/png",
            Some("gif") => "image/gif",
            Some("jpg") | Some("jpeg") => "image/jpeg",
            _ => "application/octet-stream",
        }
    }
}
