//! Types for the league site capability.

use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::match_result::{ImageRef, MatchResult};
use crate::retry::Retryable;

/// League site account credentials.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Both username and password are present.
    pub fn is_complete(&self) -> bool {
        !self.username.trim().is_empty() && !self.password.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Errors from the league site.
#[derive(Debug, Error)]
pub enum LeagueError {
    /// Credentials rejected or session refused.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// League or page does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The site rejected the request as malformed (4xx).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Too many requests (429).
    #[error("Rate limited by league site")]
    RateLimited,

    /// Server-side failure (5xx).
    #[error("Server error: HTTP {status}")]
    ServerError { status: u16 },

    /// Request did not complete in time.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Connection refused, reset or dropped.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Page structure did not match what the client expects.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Image reference is not an uploadable scorecard (wrong type, or outside
    /// the image directory).
    #[error("Image rejected: {0}")]
    ImageRejected(String),

    /// Local image could not be read for upload.
    #[error("Failed to read image {path}: {source}")]
    ImageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LeagueError {
    /// Map a transport error from reqwest.
    pub fn from_reqwest(error: reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            Self::Timeout(timeout)
        } else if error.is_connect() || error.is_request() || error.is_body() {
            Self::ConnectionFailed(error.to_string())
        } else if error.is_decode() {
            Self::UnexpectedResponse(error.to_string())
        } else {
            Self::ConnectionFailed(error.to_string())
        }
    }

    /// Map a non-success HTTP status.
    pub fn from_status(status: u16, context: &str) -> Self {
        match status {
            401 | 403 => Self::AuthenticationFailed(format!("{} (HTTP {})", context, status)),
            404 | 410 => Self::NotFound(context.to_string()),
            429 => Self::RateLimited,
            400..=499 => Self::InvalidRequest(format!("{} (HTTP {})", context, status)),
            _ => Self::ServerError { status },
        }
    }
}

impl Retryable for LeagueError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::ConnectionFailed(_) | Self::ServerError { .. } | Self::RateLimited
        )
    }
}

/// Remote league-management site.
///
/// Implementations talk to an unreliable, stateful web surface; every error
/// must be classified so callers can tell transient failures from rejected
/// credentials and malformed requests.
#[async_trait]
pub trait LeagueSite: Send + Sync {
    /// Backend name (e.g., "leaguerepublic", "mock")
    fn name(&self) -> &str;

    /// Whether the league exists. `Ok(false)` means the site answered that it
    /// does not.
    async fn league_exists(&self, league_id: &str) -> Result<bool, LeagueError>;

    /// Record a match result. `Ok(false)` means the site did not confirm it.
    async fn submit_result(
        &self,
        league_id: &str,
        result: &MatchResult,
        credentials: &Credentials,
    ) -> Result<bool, LeagueError>;

    /// Attach a scorecard image to the league.
    async fn upload_image(
        &self,
        league_id: &str,
        image: &ImageRef,
        credentials: &Credentials,
    ) -> Result<bool, LeagueError>;
}
