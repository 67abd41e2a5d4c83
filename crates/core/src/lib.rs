pub mod config;
pub mod league;
pub mod match_result;
pub mod metrics;
pub mod orchestrator;
pub mod processing;
pub mod retry;
pub mod testing;
pub mod vision;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, LeagueSiteConfig,
    SanitizedConfig, ServerConfig, VisionConfig,
};
pub use league::{Credentials, LeagueError, LeagueRepublicClient, LeagueSite};
pub use match_result::{GameResult, ImageRef, InvalidMatchResult, MatchResult, ValidationIssue};
pub use orchestrator::{
    FailureKind, OrchestratorConfig, OutcomeStatus, PhaseCallback, StepStatus,
    SubmissionOrchestrator, SubmissionOutcome, SubmissionPhase, SubmissionRequest,
};
pub use processing::{AnalysisReport, MatchProcessingService, ProcessingError};
pub use retry::{Attempted, RetryConfig, RetryError, RetryPolicy, Retryable};
pub use vision::{
    AnalysisOutcome, AzureOpenAiVision, ImageUpload, VisionAnalyzer, VisionError,
};
