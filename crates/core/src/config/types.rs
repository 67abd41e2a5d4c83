use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::orchestrator::OrchestratorConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub league: LeagueSiteConfig,
    #[serde(default)]
    pub vision: Option<VisionConfig>,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// League site configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LeagueSiteConfig {
    /// Numeric league identifier on the league site (e.g., "186006607")
    pub league_id: String,
    /// League site URL (default: "https://www.leaguerepublic.com")
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_league_timeout")]
    pub timeout_secs: u32,
    /// User-Agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Directory scorecard images are uploaded from; image paths outside it
    /// are refused (default: "scorecards")
    #[serde(default = "default_image_dir")]
    pub image_dir: PathBuf,
}

fn default_base_url() -> String {
    "https://www.leaguerepublic.com".to_string()
}

fn default_league_timeout() -> u32 {
    30
}

fn default_user_agent() -> String {
    "LeagueRepublic.AI/1.0".to_string()
}

fn default_image_dir() -> PathBuf {
    PathBuf::from("scorecards")
}

impl LeagueSiteConfig {
    pub fn new(league_id: impl Into<String>) -> Self {
        Self {
            league_id: league_id.into(),
            base_url: default_base_url(),
            timeout_secs: default_league_timeout(),
            user_agent: default_user_agent(),
            image_dir: default_image_dir(),
        }
    }
}

/// Vision service configuration (Azure OpenAI)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VisionConfig {
    /// Resource endpoint (e.g., "https://my-resource.openai.azure.com")
    pub endpoint: String,
    /// API key
    pub api_key: String,
    /// Deployment / model name (default: "gpt-4o")
    #[serde(default = "default_model")]
    pub model: String,
    /// API version query parameter
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Request timeout in seconds (default: 60)
    #[serde(default = "default_vision_timeout")]
    pub timeout_secs: u32,
    /// Analyses below this confidence are flagged for review (default: 0.8)
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    /// Completion token limit
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_api_version() -> String {
    "2024-06-01".to_string()
}

fn default_vision_timeout() -> u32 {
    60
}

pub(crate) fn default_confidence_threshold() -> f64 {
    0.8
}

fn default_max_tokens() -> u32 {
    1500
}

impl Config {
    /// Review threshold, falling back to the default when vision is not configured.
    pub fn confidence_threshold(&self) -> f64 {
        self.vision
            .as_ref()
            .map(|v| v.confidence_threshold)
            .unwrap_or_else(default_confidence_threshold)
    }
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub league: LeagueSiteConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vision: Option<SanitizedVisionConfig>,
    pub orchestrator: OrchestratorConfig,
}

/// Sanitized vision config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedVisionConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key_configured: bool,
    pub timeout_secs: u32,
    pub confidence_threshold: f64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            league: config.league.clone(),
            vision: config.vision.as_ref().map(|v| SanitizedVisionConfig {
                endpoint: v.endpoint.clone(),
                model: v.model.clone(),
                api_key_configured: !v.api_key.is_empty(),
                timeout_secs: v.timeout_secs,
                confidence_threshold: v.confidence_threshold,
            }),
            orchestrator: config.orchestrator.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal_config() {
        let toml = r#"
[league]
league_id = "186006607"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.league.league_id, "186006607");
        assert_eq!(config.league.base_url, "https://www.leaguerepublic.com");
        assert_eq!(config.league.timeout_secs, 30);
        assert_eq!(config.league.image_dir, PathBuf::from("scorecards"));
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert!(config.vision.is_none());
        assert_eq!(config.orchestrator.retry.max_retries, 3);
    }

    #[test]
    fn test_deserialize_missing_league_fails() {
        let toml = r#"
[server]
port = 8080
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_with_vision_config() {
        let toml = r#"
[league]
league_id = "42"

[vision]
endpoint = "https://example.openai.azure.com"
api_key = "test-api-key"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let vision = config.vision.as_ref().unwrap();
        assert_eq!(vision.model, "gpt-4o");
        assert_eq!(vision.timeout_secs, 60);
        assert_eq!(vision.confidence_threshold, 0.8);
        assert_eq!(config.confidence_threshold(), 0.8);
    }

    #[test]
    fn test_deserialize_orchestrator_retry() {
        let toml = r#"
[league]
league_id = "42"

[orchestrator]
call_timeout_secs = 10

[orchestrator.retry]
max_retries = 5
base_delay_ms = 250
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.orchestrator.call_timeout_secs, 10);
        assert_eq!(config.orchestrator.retry.max_retries, 5);
        assert_eq!(config.orchestrator.retry.base_delay_ms, 250);
        assert_eq!(config.orchestrator.retry.max_delay_ms, 5000);
    }

    #[test]
    fn test_sanitized_config_hides_api_key() {
        let config = Config {
            server: ServerConfig::default(),
            league: LeagueSiteConfig::new("42"),
            vision: Some(VisionConfig {
                endpoint: "https://example.openai.azure.com".to_string(),
                api_key: "secret-key".to_string(),
                model: default_model(),
                api_version: default_api_version(),
                timeout_secs: 60,
                confidence_threshold: 0.7,
                max_tokens: 1500,
            }),
            orchestrator: OrchestratorConfig::default(),
        };

        let sanitized = SanitizedConfig::from(&config);
        let vision = sanitized.vision.as_ref().unwrap();
        assert!(vision.api_key_configured);
        assert_eq!(vision.confidence_threshold, 0.7);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("secret-key"));
    }
}
