//! Match processing service.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::league::{Credentials, LeagueRepublicClient, LeagueSite};
use crate::match_result::MatchResult;
use crate::metrics::ANALYSES_NEEDING_REVIEW;
use crate::orchestrator::{SubmissionOrchestrator, SubmissionOutcome, SubmissionRequest};
use crate::vision::{AzureOpenAiVision, ImageUpload, VisionAnalyzer, VisionError};

use super::types::{AnalysisReport, ProcessingError};

/// Analyses scorecards and submits match results.
pub struct MatchProcessingService {
    analyzer: Option<Arc<dyn VisionAnalyzer>>,
    orchestrator: SubmissionOrchestrator,
    default_league_id: String,
    confidence_threshold: f64,
}

impl MatchProcessingService {
    pub fn new(
        orchestrator: SubmissionOrchestrator,
        default_league_id: impl Into<String>,
        confidence_threshold: f64,
    ) -> Self {
        Self {
            analyzer: None,
            orchestrator,
            default_league_id: default_league_id.into(),
            confidence_threshold,
        }
    }

    pub fn with_analyzer(mut self, analyzer: Arc<dyn VisionAnalyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    /// Build the service with the network-backed adapters from configuration.
    pub fn from_config(config: &Config) -> Result<Self, ProcessingError> {
        let league_site: Arc<dyn LeagueSite> =
            Arc::new(LeagueRepublicClient::new(config.league.clone())?);
        let orchestrator = SubmissionOrchestrator::new(config.orchestrator.clone(), league_site)
            .with_image_root(config.league.image_dir.clone());

        let mut service = Self::new(
            orchestrator,
            config.league.league_id.clone(),
            config.confidence_threshold(),
        );

        match &config.vision {
            Some(vision) => {
                let analyzer = AzureOpenAiVision::new(vision)?;
                info!(
                    provider = analyzer.provider(),
                    model = analyzer.model(),
                    "Vision analyzer configured"
                );
                service = service.with_analyzer(Arc::new(analyzer));
            }
            None => warn!("No [vision] section configured, image analysis is disabled"),
        }

        Ok(service)
    }

    pub fn has_analyzer(&self) -> bool {
        self.analyzer.is_some()
    }

    pub fn default_league_id(&self) -> &str {
        &self.default_league_id
    }

    pub fn confidence_threshold(&self) -> f64 {
        self.confidence_threshold
    }

    pub fn orchestrator(&self) -> &SubmissionOrchestrator {
        &self.orchestrator
    }

    /// Analyse an uploaded scorecard and flag results that need review.
    pub async fn analyze(&self, image: ImageUpload) -> Result<AnalysisReport, ProcessingError> {
        let analyzer = self
            .analyzer
            .as_ref()
            .ok_or(ProcessingError::Analysis(VisionError::NotConfigured))?;

        info!(file_name = %image.file_name, "Processing scorecard image");

        let analysis = analyzer.analyze(&image).await.map_err(|e| {
            error!(file_name = %image.file_name, error = %e, "Scorecard analysis failed");
            ProcessingError::Analysis(e)
        })?;

        let report = AnalysisReport::new(analysis, self.confidence_threshold);
        if report.needs_review {
            ANALYSES_NEEDING_REVIEW.inc();
            warn!(
                confidence = report.analysis.confidence(),
                threshold = report.threshold,
                issues = report.issues.len(),
                "Scorecard analysis needs review"
            );
        } else {
            info!(
                confidence = report.analysis.confidence(),
                "Scorecard analysis accepted"
            );
        }

        Ok(report)
    }

    /// Submit a match result, defaulting to the configured league.
    pub async fn submit(
        &self,
        match_result: MatchResult,
        credentials: Credentials,
        league_id: Option<String>,
        cancel: &CancellationToken,
    ) -> SubmissionOutcome {
        let league_id = league_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| self.default_league_id.clone());

        let request = SubmissionRequest::new(match_result, credentials, league_id);
        self.orchestrator.submit(request, cancel).await
    }
}
