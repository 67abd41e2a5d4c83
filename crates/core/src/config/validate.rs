use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - League section exists (enforced by serde)
/// - Server port is not 0
/// - League id is numeric and base URL is http(s)
/// - League and vision timeouts are not 0
/// - Vision confidence threshold is within [0, 1]
/// - Retry delays are usable
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    // League validation
    let league_id = config.league.league_id.trim();
    if league_id.is_empty() || !league_id.chars().all(|c| c.is_ascii_digit()) {
        return Err(ConfigError::ValidationError(format!(
            "league.league_id must be numeric, got '{}'",
            config.league.league_id
        )));
    }
    if !config.league.base_url.starts_with("http://")
        && !config.league.base_url.starts_with("https://")
    {
        return Err(ConfigError::ValidationError(
            "league.base_url must start with http:// or https://".to_string(),
        ));
    }
    if config.league.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "league.timeout_secs cannot be 0".to_string(),
        ));
    }

    // Vision validation
    if let Some(vision) = &config.vision {
        if !(0.0..=1.0).contains(&vision.confidence_threshold) {
            return Err(ConfigError::ValidationError(
                "vision.confidence_threshold must be between 0.0 and 1.0".to_string(),
            ));
        }
        if vision.endpoint.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "vision.endpoint cannot be empty".to_string(),
            ));
        }
        if vision.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "vision.timeout_secs cannot be 0".to_string(),
            ));
        }
    }

    // Orchestrator validation
    let retry = &config.orchestrator.retry;
    if retry.base_delay_ms == 0 {
        return Err(ConfigError::ValidationError(
            "orchestrator.retry.base_delay_ms cannot be 0".to_string(),
        ));
    }
    if retry.max_delay_ms < retry.base_delay_ms {
        return Err(ConfigError::ValidationError(
            "orchestrator.retry.max_delay_ms cannot be below base_delay_ms".to_string(),
        ));
    }
    if config.orchestrator.call_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "orchestrator.call_timeout_secs cannot be 0".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LeagueSiteConfig, ServerConfig, VisionConfig};
    use crate::orchestrator::OrchestratorConfig;
    use std::net::IpAddr;

    fn valid_config() -> Config {
        Config {
            server: ServerConfig::default(),
            league: LeagueSiteConfig::new("186006607"),
            vision: None,
            orchestrator: OrchestratorConfig::default(),
        }
    }

    fn assert_invalid(config: &Config) {
        let result = validate_config(config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let mut config = valid_config();
        config.server = ServerConfig {
            host: "0.0.0.0".parse::<IpAddr>().unwrap(),
            port: 0,
        };
        assert_invalid(&config);
    }

    #[test]
    fn test_validate_non_numeric_league_id() {
        let mut config = valid_config();
        config.league.league_id = "abc".to_string();
        assert_invalid(&config);

        config.league.league_id = String::new();
        assert_invalid(&config);
    }

    #[test]
    fn test_validate_base_url_scheme() {
        let mut config = valid_config();
        config.league.base_url = "ftp://leaguerepublic.com".to_string();
        assert_invalid(&config);
    }

    fn vision_config() -> VisionConfig {
        VisionConfig {
            endpoint: "https://example.openai.azure.com".to_string(),
            api_key: "key".to_string(),
            model: "gpt-4o".to_string(),
            api_version: "2024-06-01".to_string(),
            timeout_secs: 60,
            confidence_threshold: 0.8,
            max_tokens: 1500,
        }
    }

    #[test]
    fn test_validate_confidence_threshold_range() {
        let mut config = valid_config();
        config.vision = Some(VisionConfig {
            confidence_threshold: 1.5,
            ..vision_config()
        });
        assert_invalid(&config);
    }

    #[test]
    fn test_validate_zero_timeouts() {
        let mut config = valid_config();
        config.league.timeout_secs = 0;
        assert_invalid(&config);

        let mut config = valid_config();
        config.vision = Some(vision_config());
        assert!(validate_config(&config).is_ok());

        config.vision = Some(VisionConfig {
            timeout_secs: 0,
            ..vision_config()
        });
        assert_invalid(&config);
    }

    #[test]
    fn test_validate_retry_delays() {
        let mut config = valid_config();
        config.orchestrator.retry.base_delay_ms = 0;
        assert_invalid(&config);

        let mut config = valid_config();
        config.orchestrator.retry.base_delay_ms = 1000;
        config.orchestrator.retry.max_delay_ms = 500;
        assert_invalid(&config);
    }
}
