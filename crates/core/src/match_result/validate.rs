use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

use super::types::{GameResult, MatchResult};

/// A single problem found in a match result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Field path, e.g. `games[2].winner`.
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Match result failed validation.
#[derive(Debug, Clone, Error)]
#[error("invalid match result: {}", summarize(.0))]
pub struct InvalidMatchResult(pub Vec<ValidationIssue>);

fn summarize(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl MatchResult {
    /// Collects every issue rather than stopping at the first one.
    pub fn issues(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        if self.home_team.trim().is_empty() {
            issues.push(ValidationIssue::new("home_team", "must not be empty"));
        }
        if self.away_team.trim().is_empty() {
            issues.push(ValidationIssue::new("away_team", "must not be empty"));
        }

        for (idx, game) in self.games.iter().enumerate() {
            check_game(idx, game, &mut issues);
        }

        issues
    }

    pub fn validate(&self) -> Result<(), InvalidMatchResult> {
        let issues = self.issues();
        if issues.is_empty() {
            Ok(())
        } else {
            Err(InvalidMatchResult(issues))
        }
    }
}

fn check_game(idx: usize, game: &GameResult, issues: &mut Vec<ValidationIssue>) {
    let field = |name: &str| format!("games[{}].{}", idx, name);

    if game.home_player.trim().is_empty() {
        issues.push(ValidationIssue::new(field("home_player"), "must not be empty"));
    }
    if game.away_player.trim().is_empty() {
        issues.push(ValidationIssue::new(field("away_player"), "must not be empty"));
    }

    if game.winner != game.home_player && game.winner != game.away_player {
        issues.push(ValidationIssue::new(
            field("winner"),
            format!(
                "'{}' is neither '{}' nor '{}'",
                game.winner, game.home_player, game.away_player
            ),
        ));
        return;
    }

    if let (Some(home), Some(away)) = (game.home_player_score, game.away_player_score) {
        let expected = match home.cmp(&away) {
            Ordering::Greater => &game.home_player,
            Ordering::Less => &game.away_player,
            Ordering::Equal => {
                issues.push(ValidationIssue::new(
                    field("winner"),
                    format!("scores are tied at {} but a winner is recorded", home),
                ));
                return;
            }
        };
        if &game.winner != expected {
            issues.push(ValidationIssue::new(
                field("winner"),
                format!(
                    "score {}-{} favours '{}' but winner is '{}'",
                    home, away, expected, game.winner
                ),
            ));
        }
    }
}
