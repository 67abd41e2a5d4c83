//! LeagueRepublic web client.
//!
//! LeagueRepublic has no public API, so the client drives the same HTML forms
//! a league administrator would: log in, fetch the form to pick up its CSRF
//! token, then post the form. Each authenticated operation runs in its own
//! cookie session so concurrent submissions for different accounts never
//! share state.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use reqwest::{multipart, Client, RequestBuilder, Response};
use tracing::{debug, info, warn};

use crate::config::LeagueSiteConfig;
use crate::match_result::{ImageRef, MatchResult};
use crate::metrics::observe_external_call;

use super::{resolve_image, Credentials, LeagueError, LeagueSite};

/// Hidden form field carrying the anti-forgery token.
const CSRF_FIELD: &str = "csrf_token";

/// Present on any page that renders the login form.
const LOGIN_FORM_MARKER: &str = "name=\"password\"";

static CSRF_NAME_FIRST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"name="(?:csrf_token|_csrf)"[^>]*?value="([^"]+)""#).unwrap()
});

static CSRF_VALUE_FIRST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"value="([^"]+)"[^>]*?name="(?:csrf_token|_csrf)""#).unwrap()
});

static FORM_ERROR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"class="form-error"[^>]*>([^<]*)<"#).unwrap());

/// Network-backed [`LeagueSite`] for leaguerepublic.com.
pub struct LeagueRepublicClient {
    config: LeagueSiteConfig,
    /// Cookie-less client for public pages.
    public: Client,
}

/// One logged-in browser session.
struct Session {
    client: Client,
}

impl LeagueRepublicClient {
    /// Create a new client with the given configuration.
    pub fn new(config: LeagueSiteConfig) -> Result<Self, LeagueError> {
        let public = build_client(&config, false)?;
        Ok(Self { config, public })
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs as u64)
    }

    /// Get the base URL without trailing slash.
    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    fn league_url(&self, league_id: &str, suffix: &str) -> String {
        format!(
            "{}/league/{}{}",
            self.base_url(),
            urlencoding::encode(league_id),
            suffix
        )
    }

    /// Send a request, recording its duration and mapping transport errors.
    async fn send(&self, operation: &str, request: RequestBuilder) -> Result<Response, LeagueError> {
        let start = Instant::now();
        let result = request
            .send()
            .await
            .map_err(|e| LeagueError::from_reqwest(e, self.timeout()));
        let ok = matches!(&result, Ok(r) if r.status().is_success());
        observe_external_call("league_site", operation, start.elapsed().as_secs_f64(), ok);
        result
    }

    async fn read_body(&self, response: Response) -> Result<String, LeagueError> {
        response
            .text()
            .await
            .map_err(|e| LeagueError::from_reqwest(e, self.timeout()))
    }

    /// Log in with a fresh cookie jar.
    async fn login(&self, credentials: &Credentials) -> Result<Session, LeagueError> {
        let client = build_client(&self.config, true)?;
        let login_url = format!("{}/login", self.base_url());

        let page = self.fetch_page(&client, "login_form", &login_url).await?;
        let token = extract_csrf_token(&page)?;

        let params = [
            ("username", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
            (CSRF_FIELD, token.as_str()),
        ];
        let response = self
            .send("login", client.post(&login_url).form(&params))
            .await?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            return Err(LeagueError::from_status(status, "login"));
        }

        let body = self.read_body(response).await?;
        if body.contains(LOGIN_FORM_MARKER) {
            return Err(LeagueError::AuthenticationFailed(
                "Invalid username or password".to_string(),
            ));
        }

        debug!(username = %credentials.username, "LeagueRepublic login successful");
        Ok(Session { client })
    }

    /// GET a page and return its body, treating a login form as an expired
    /// or refused session.
    async fn fetch_page(
        &self,
        client: &Client,
        operation: &str,
        url: &str,
    ) -> Result<String, LeagueError> {
        let response = self.send(operation, client.get(url)).await?;
        let status = response.status().as_u16();
        if !response.status().is_success() {
            return Err(LeagueError::from_status(status, url));
        }
        self.read_body(response).await
    }

    /// GET an authenticated form page and return its CSRF token.
    async fn form_token(&self, session: &Session, operation: &str, url: &str) -> Result<String, LeagueError> {
        let page = self.fetch_page(&session.client, operation, url).await?;
        if page.contains(LOGIN_FORM_MARKER) {
            return Err(LeagueError::AuthenticationFailed(
                "Session not accepted by league site".to_string(),
            ));
        }
        extract_csrf_token(&page)
    }

    /// Interpret the response to a form post.
    async fn check_form_response(&self, response: Response, context: &str) -> Result<bool, LeagueError> {
        let status = response.status().as_u16();
        if !response.status().is_success() {
            return Err(LeagueError::from_status(status, context));
        }

        let body = self.read_body(response).await?;
        if body.contains(LOGIN_FORM_MARKER) {
            return Err(LeagueError::AuthenticationFailed(
                "Session expired during submission".to_string(),
            ));
        }
        if let Some(message) = extract_form_error(&body) {
            return Err(LeagueError::InvalidRequest(message));
        }
        Ok(true)
    }
}

fn build_client(config: &LeagueSiteConfig, cookies: bool) -> Result<Client, LeagueError> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs as u64))
        .user_agent(config.user_agent.clone())
        .cookie_store(cookies)
        .build()
        .map_err(|e| LeagueError::ConnectionFailed(format!("Failed to create HTTP client: {}", e)))
}

/// Pull the CSRF token out of a form page.
fn extract_csrf_token(html: &str) -> Result<String, LeagueError> {
    CSRF_NAME_FIRST
        .captures(html)
        .or_else(|| CSRF_VALUE_FIRST.captures(html))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| {
            LeagueError::UnexpectedResponse("CSRF token not found in form page".to_string())
        })
}

fn extract_form_error(html: &str) -> Option<String> {
    FORM_ERROR.captures(html).map(|c| {
        let message = c.get(1).map(|m| m.as_str().trim()).unwrap_or("");
        if message.is_empty() {
            "Form rejected by league site".to_string()
        } else {
            message.to_string()
        }
    })
}

/// Encode a match result as result-form fields, games in play order.
fn result_form_fields(result: &MatchResult) -> Vec<(String, String)> {
    let mut fields = vec![
        ("home_team".to_string(), result.home_team.clone()),
        ("away_team".to_string(), result.away_team.clone()),
        ("home_score".to_string(), result.home_score.to_string()),
        ("away_score".to_string(), result.away_score.to_string()),
        (
            "match_date".to_string(),
            result.match_date.format("%Y-%m-%d").to_string(),
        ),
    ];

    for (idx, game) in result.games.iter().enumerate() {
        let key = |name: &str| format!("games[{}][{}]", idx, name);
        fields.push((key("home_player"), game.home_player.clone()));
        fields.push((key("away_player"), game.away_player.clone()));
        fields.push((key("winner"), game.winner.clone()));
        if let Some(score) = game.home_player_score {
            fields.push((key("home_player_score"), score.to_string()));
        }
        if let Some(score) = game.away_player_score {
            fields.push((key("away_player_score"), score.to_string()));
        }
    }

    fields
}

#[async_trait]
impl LeagueSite for LeagueRepublicClient {
    fn name(&self) -> &str {
        "leaguerepublic"
    }

    async fn league_exists(&self, league_id: &str) -> Result<bool, LeagueError> {
        let url = self.league_url(league_id, "");
        debug!(league_id, "Checking league exists");

        let response = self.send("league_exists", self.public.get(&url)).await?;
        let status = response.status();

        if status.is_success() {
            return Ok(true);
        }
        match LeagueError::from_status(status.as_u16(), &url) {
            LeagueError::NotFound(_) => {
                info!(league_id, "League not found on LeagueRepublic");
                Ok(false)
            }
            other => Err(other),
        }
    }

    async fn submit_result(
        &self,
        league_id: &str,
        result: &MatchResult,
        credentials: &Credentials,
    ) -> Result<bool, LeagueError> {
        let session = self.login(credentials).await?;

        let form_url = self.league_url(league_id, "/results/new");
        let token = self.form_token(&session, "result_form", &form_url).await?;

        let mut fields = result_form_fields(result);
        fields.push((CSRF_FIELD.to_string(), token));

        let post_url = self.league_url(league_id, "/results");
        let response = self
            .send("submit_result", session.client.post(&post_url).form(&fields))
            .await?;

        let accepted = self.check_form_response(response, "submit result").await?;
        info!(
            league_id,
            fixture = %result.fixture_label(),
            games = result.games.len(),
            "Match result posted to LeagueRepublic"
        );
        Ok(accepted)
    }

    async fn upload_image(
        &self,
        league_id: &str,
        image: &ImageRef,
        credentials: &Credentials,
    ) -> Result<bool, LeagueError> {
        let path = resolve_image(&self.config.image_dir, image).await?;
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|source| LeagueError::ImageRead {
                path: image.path.clone(),
                source,
            })?;

        let session = self.login(credentials).await?;

        let form_url = self.league_url(league_id, "/images/new");
        let token = self.form_token(&session, "image_form", &form_url).await?;

        let size = bytes.len();
        let part = multipart::Part::bytes(bytes)
            .file_name(image.file_name())
            .mime_str(image.resolved_content_type())
            .map_err(|e| LeagueError::InvalidRequest(format!("Invalid content type: {}", e)))?;
        let form = multipart::Form::new()
            .text(CSRF_FIELD, token)
            .part("image", part);

        let post_url = self.league_url(league_id, "/images");
        let response = self
            .send("upload_image", session.client.post(&post_url).multipart(form))
            .await?;

        match self.check_form_response(response, "upload image").await {
            Ok(accepted) => {
                info!(league_id, bytes = size, "Scorecard image uploaded");
                Ok(accepted)
            }
            Err(e) => {
                warn!(league_id, error = %e, "Scorecard image upload rejected");
                Err(e)
            }
        }
    }
}
