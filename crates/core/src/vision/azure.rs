//! Azure OpenAI vision client.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::VisionConfig;
use crate::match_result::{GameResult, MatchResult};
use crate::metrics::{observe_external_call, ANALYSIS_CONFIDENCE};

use super::{AnalysisOutcome, ImageUpload, VisionAnalyzer, VisionError};

const SYSTEM_PROMPT: &str = r#"You read photographs of sports league scorecards.
Reply with a single JSON object and nothing else:
{
  "readable": true,
  "home_team": "...",
  "away_team": "...",
  "home_score": 0,
  "away_score": 0,
  "match_date": "YYYY-MM-DD",
  "games": [
    {"home_player": "...", "away_player": "...", "winner": "...",
     "home_player_score": 0, "away_player_score": 0}
  ],
  "confidence": 0.0
}
List games in the order they appear on the card. "winner" must repeat the
winning player's name exactly. Omit a player score you cannot read.
"confidence" is your certainty from 0 to 1 that every value is correct.
If the image is not a legible scorecard, reply {"readable": false, "reason": "..."}."#;

const USER_PROMPT: &str = "Extract the match result from this scorecard.";

/// Chat-completions client for an Azure OpenAI vision deployment.
pub struct AzureOpenAiVision {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    deployment: String,
    api_version: String,
    max_tokens: u32,
    timeout: Duration,
}

impl AzureOpenAiVision {
    pub fn new(config: &VisionConfig) -> Result<Self, VisionError> {
        let timeout = Duration::from_secs(config.timeout_secs as u64);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VisionError::ServiceUnavailable(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            deployment: config.model.clone(),
            api_version: config.api_version.clone(),
            max_tokens: config.max_tokens,
            timeout,
        })
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint,
            urlencoding::encode(&self.deployment),
            urlencoding::encode(&self.api_version)
        )
    }

    fn build_request(&self, image: &ImageUpload) -> ChatRequest {
        let data_url = format!(
            "data:{};base64,{}",
            image.content_type,
            STANDARD.encode(&image.bytes)
        );

        ChatRequest {
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: vec![ContentPart::Text {
                        text: SYSTEM_PROMPT.to_string(),
                    }],
                },
                ChatMessage {
                    role: "user",
                    content: vec![
                        ContentPart::Text {
                            text: USER_PROMPT.to_string(),
                        },
                        ContentPart::ImageUrl {
                            image_url: ImageUrl { url: data_url },
                        },
                    ],
                },
            ],
            max_tokens: self.max_tokens,
            temperature: 0.0,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    code: Option<String>,
    message: String,
}

/// What the model is asked to produce.
#[derive(Debug, Deserialize)]
struct ScorecardExtraction {
    #[serde(default = "default_readable")]
    readable: bool,
    #[serde(default)]
    reason: Option<String>,
    home_team: Option<String>,
    away_team: Option<String>,
    home_score: Option<u32>,
    away_score: Option<u32>,
    match_date: Option<NaiveDate>,
    #[serde(default)]
    games: Vec<GameResult>,
    confidence: Option<f64>,
}

fn default_readable() -> bool {
    true
}

/// Strip a Markdown code fence the model sometimes wraps JSON in.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Turn the model's message content into an analysis outcome.
fn parse_analysis(content: &str) -> Result<AnalysisOutcome, VisionError> {
    let json = strip_code_fence(content);
    let extraction: ScorecardExtraction = serde_json::from_str(json)
        .map_err(|e| VisionError::InvalidResponse(format!("{}: {}", e, content)))?;

    if !extraction.readable {
        return Err(VisionError::UnreadableImage(
            extraction
                .reason
                .unwrap_or_else(|| "image is not a legible scorecard".to_string()),
        ));
    }

    let missing = |field: &str| VisionError::InvalidResponse(format!("missing field '{}'", field));
    let home_team = extraction.home_team.ok_or_else(|| missing("home_team"))?;
    let away_team = extraction.away_team.ok_or_else(|| missing("away_team"))?;
    let home_score = extraction.home_score.ok_or_else(|| missing("home_score"))?;
    let away_score = extraction.away_score.ok_or_else(|| missing("away_score"))?;
    let match_date = extraction.match_date.ok_or_else(|| missing("match_date"))?;
    let confidence = extraction.confidence.ok_or_else(|| missing("confidence"))?;

    let mut result = MatchResult::new(home_team, away_team, home_score, away_score, match_date);
    result.games = extraction.games;

    AnalysisOutcome::new(result, content, confidence)
}

fn classify_api_error(status: u16, body: &str) -> VisionError {
    let detail = serde_json::from_str::<ApiError>(body).ok().map(|e| e.error);
    let message = detail
        .as_ref()
        .map(|d| d.message.clone())
        .unwrap_or_else(|| body.to_string());

    match status {
        400 | 415 | 422 => {
            let image_problem = detail
                .as_ref()
                .and_then(|d| d.code.as_deref())
                .map(|code| code.contains("image"))
                .unwrap_or(false)
                || message.to_ascii_lowercase().contains("image");
            if image_problem {
                VisionError::UnreadableImage(message)
            } else {
                VisionError::InvalidResponse(format!("HTTP {}: {}", status, message))
            }
        }
        _ => VisionError::ServiceUnavailable(format!("HTTP {}: {}", status, message)),
    }
}

#[async_trait]
impl VisionAnalyzer for AzureOpenAiVision {
    fn provider(&self) -> &str {
        "azure_openai"
    }

    fn model(&self) -> &str {
        &self.deployment
    }

    async fn analyze(&self, image: &ImageUpload) -> Result<AnalysisOutcome, VisionError> {
        if image.bytes.is_empty() {
            return Err(VisionError::UnreadableImage("empty image".to_string()));
        }

        info!(
            file_name = %image.file_name,
            bytes = image.bytes.len(),
            model = %self.deployment,
            "Starting scorecard analysis"
        );

        let start = Instant::now();
        let response = self
            .client
            .post(self.completions_url())
            .header("api-key", &self.api_key)
            .json(&self.build_request(image))
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                observe_external_call("vision", "analyze", start.elapsed().as_secs_f64(), false);
                if e.is_timeout() {
                    return Err(VisionError::Timeout(self.timeout));
                }
                return Err(VisionError::ServiceUnavailable(e.to_string()));
            }
        };

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                VisionError::Timeout(self.timeout)
            } else {
                VisionError::ServiceUnavailable(e.to_string())
            }
        });
        observe_external_call(
            "vision",
            "analyze",
            start.elapsed().as_secs_f64(),
            status == 200 && body.is_ok(),
        );
        let body = body?;

        if status != 200 {
            warn!(status, "Vision service returned an error");
            return Err(classify_api_error(status, &body));
        }

        let chat: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| VisionError::InvalidResponse(e.to_string()))?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| VisionError::InvalidResponse("no completion content".to_string()))?;

        let outcome = parse_analysis(&content)?;
        ANALYSIS_CONFIDENCE
            .with_label_values(&[])
            .observe(outcome.confidence());

        debug!(
            games = outcome.match_result().games.len(),
            "Scorecard parsed"
        );
        info!(
            confidence = outcome.confidence(),
            fixture = %outcome.match_result().fixture_label(),
            "Scorecard analysis completed"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> VisionConfig {
        VisionConfig {
            endpoint: "https://example.openai.azure.com/".to_string(),
            api_key: "key".to_string(),
            model: "gpt-4o".to_string(),
            api_version: "2024-06-01".to_string(),
            timeout_secs: 60,
            confidence_threshold: 0.8,
            max_tokens: 1500,
        }
    }

    #[test]
    fn test_completions_url() {
        let client = AzureOpenAiVision::new(&config()).unwrap();
        assert_eq!(
            client.completions_url(),
            "https://example.openai.azure.com/openai/deployments/gpt-4o/chat/completions?api-version=2024-06-01"
        );
        assert_eq!(client.provider(), "azure_openai");
        assert_eq!(client.model(), "gpt-4o");
    }

    #[test]
    fn test_request_embeds_image_as_data_url() {
        let client = AzureOpenAiVision::new(&config()).unwrap();
        let upload = ImageUpload::new(vec![1u8, 2, 3], "card.png", "image/png");
        let json = serde_json::to_value(client.build_request(&upload)).unwrap();

        let parts = &json["messages"][1]["content"];
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[1]["type"], "image_url");
        assert_eq!(parts[1]["image_url"]["url"], "data:image/png;base64,AQID");
        assert_eq!(json["response_format"]["type"], "json_object");
    }

    #[test]
    fn test_parse_analysis() {
        let content = r#"{
            "readable": true,
            "home_team": "Team A",
            "away_team": "Team B",
            "home_score": 3,
            "away_score": 2,
            "match_date": "2025-09-18",
            "games": [
                {"home_player": "P1", "away_player": "P2", "winner": "P1", "home_player_score": 21, "away_player_score": 18},
                {"home_player": "P3", "away_player": "P4", "winner": "P4"}
            ],
            "confidence": 0.85
        }"#;

        let outcome = parse_analysis(content).unwrap();
        assert_eq!(outcome.confidence(), 0.85);
        let result = outcome.match_result();
        assert_eq!(result.home_team, "Team A");
        assert_eq!(result.games.len(), 2);
        assert_eq!(result.games[1].winner, "P4");
        assert_eq!(result.games[1].home_player_score, None);
        assert!(result.image.is_none());
    }

    #[test]
    fn test_parse_analysis_fenced() {
        let content = "```json\n{\"home_team\":\"A\",\"away_team\":\"B\",\"home_score\":1,\"away_score\":0,\"match_date\":\"2025-01-02\",\"confidence\":0.5}\n```";
        let outcome = parse_analysis(content).unwrap();
        assert!(outcome.match_result().games.is_empty());
    }

    #[test]
    fn test_parse_analysis_unreadable() {
        let content = r#"{"readable": false, "reason": "photo of a cat"}"#;
        match parse_analysis(content) {
            Err(VisionError::UnreadableImage(reason)) => assert_eq!(reason, "photo of a cat"),
            other => panic!("expected UnreadableImage, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_analysis_rejects_bad_confidence() {
        let content = r#"{"home_team":"A","away_team":"B","home_score":1,"away_score":0,"match_date":"2025-01-02","confidence":7}"#;
        assert!(matches!(
            parse_analysis(content),
            Err(VisionError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_parse_analysis_missing_field() {
        let content = r#"{"home_team":"A","confidence":0.9}"#;
        assert!(matches!(
            parse_analysis(content),
            Err(VisionError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_classify_api_error() {
        let body = r#"{"error":{"code":"invalid_image","message":"Invalid image data"}}"#;
        assert!(matches!(
            classify_api_error(400, body),
            VisionError::UnreadableImage(_)
        ));
        assert!(matches!(
            classify_api_error(429, "slow down"),
            VisionError::ServiceUnavailable(_)
        ));
        assert!(matches!(
            classify_api_error(503, ""),
            VisionError::ServiceUnavailable(_)
        ));
        assert!(matches!(
            classify_api_error(400, r#"{"error":{"message":"max_tokens too large"}}"#),
            VisionError::InvalidResponse(_)
        ));
    }
}
