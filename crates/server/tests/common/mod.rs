//! Common test utilities for E2E testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with mock dependencies injected, enabling endpoint testing without a
//! league site or vision service.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use scorecard_core::{
    load_config_from_str, Config, MatchProcessingService, RetryConfig, SubmissionOrchestrator,
    testing::{MockLeagueSite, MockVision},
};

/// Re-export fixtures for test convenience
#[allow(unused_imports)]
pub use scorecard_core::testing::fixtures;

const MULTIPART_BOUNDARY: &str = "scorecard-test-boundary";

/// Scorecard placed in the fixture's image directory.
pub const SCORECARD_IMAGE: &str = "scorecard.jpg";

/// Test fixture for E2E testing with mock dependencies.
///
/// Provides an in-process server with fully controllable mocks for:
/// - League site (MockLeagueSite)
/// - Vision analysis (MockVision)
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_submit() {
///     let fixture = TestFixture::new();
///
///     let response = fixture.post("/api/v1/matches/submit", json!({
///         "match_result": { ... },
///         "username": "coach",
///         "password": "secret"
///     })).await;
///
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock league site - configure league checks, submissions and uploads
    pub league_site: Arc<MockLeagueSite>,
    /// Mock vision analyzer - configure extracted results and errors
    pub vision: Arc<MockVision>,
    /// Shutdown token shared with the app state
    pub shutdown: CancellationToken,
    /// Image directory submissions may upload from; holds `SCORECARD_IMAGE`
    pub image_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Config used by the fixture; retries are fast so exhaustion tests stay quick.
fn base_config(with_vision: bool) -> Config {
    let mut toml = String::from(
        r#"
[server]
host = "127.0.0.1"
port = 8080

[league]
league_id = "186006607"
"#,
    );
    if with_vision {
        toml.push_str(
            r#"
[vision]
endpoint = "https://vision.invalid"
api_key = "super-secret-key"
confidence_threshold = 0.8
"#,
        );
    }
    load_config_from_str(&toml).expect("Failed to parse test config")
}

#[allow(dead_code)]
impl TestFixture {
    /// Create a new test fixture with default mocks.
    pub fn new() -> Self {
        Self::with_config(TestConfig::default())
    }

    /// Create a test fixture with custom configuration.
    pub fn with_config(test_config: TestConfig) -> Self {
        let mut config = base_config(test_config.enable_vision);
        config.orchestrator.retry = RetryConfig {
            max_retries: 2,
            base_delay_ms: 1,
            max_delay_ms: 5,
        };

        let image_dir = TempDir::new().expect("Failed to create image dir");
        std::fs::write(image_dir.path().join(SCORECARD_IMAGE), b"\xFF\xD8\xFF\xE0")
            .expect("Failed to write scorecard image");
        config.league.image_dir = image_dir.path().to_path_buf();

        let league_site = Arc::new(MockLeagueSite::new());
        let vision = Arc::new(MockVision::new());

        let orchestrator =
            SubmissionOrchestrator::new(config.orchestrator.clone(), league_site.clone())
                .with_image_root(image_dir.path());
        let mut service = MatchProcessingService::new(
            orchestrator,
            config.league.league_id.clone(),
            config.confidence_threshold(),
        );
        if test_config.enable_vision {
            service = service.with_analyzer(vision.clone());
        }

        let shutdown = CancellationToken::new();
        let state = Arc::new(scorecard_server::state::AppState::new(
            config,
            service,
            shutdown.clone(),
        ));

        let router = scorecard_server::api::create_router(state);

        Self {
            router,
            league_site,
            vision,
            shutdown,
            image_dir,
        }
    }

    /// Absolute path of a file in the fixture's image directory.
    pub fn image_path(&self, name: &str) -> String {
        self.image_dir.path().join(name).to_string_lossy().to_string()
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a GET request and return the raw text body.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        let (status, bytes) = self.send(request).await;
        (status, String::from_utf8_lossy(&bytes).to_string())
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send_for_json(request).await
    }

    /// Send a multipart POST with a single file field.
    pub async fn post_multipart(
        &self,
        path: &str,
        field_name: &str,
        file_name: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> TestResponse {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{}\r\n", MULTIPART_BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                field_name, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());

        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={}", MULTIPART_BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();
        self.send_for_json(request).await
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();
        self.send_for_json(request).await
    }

    async fn send_for_json(&self, request: Request<Body>) -> TestResponse {
        let (status, body_bytes) = self.send(request).await;

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        (status, body_bytes.to_vec())
    }
}

/// Configuration for test fixture.
#[derive(Debug, Clone)]
pub struct TestConfig {
    /// Install the mock vision analyzer and a [vision] config section
    pub enable_vision: bool,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            enable_vision: true,
        }
    }
}

#[allow(dead_code)]
impl TestConfig {
    /// Create config without a vision analyzer.
    pub fn without_vision() -> Self {
        Self {
            enable_vision: false,
        }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
