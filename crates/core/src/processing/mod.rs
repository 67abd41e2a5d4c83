//! Application service used by the request boundary.
//!
//! Owns the optional vision analyzer and the submission orchestrator, and
//! applies the configured league id and review threshold.

mod service;
mod types;

pub use crate::match_result::{is_accepted_image_type, ACCEPTED_IMAGE_TYPES};
pub use service::MatchProcessingService;
pub use types::{AnalysisReport, ProcessingError};
