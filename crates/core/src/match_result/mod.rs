//! Match result data model.
//!
//! A [`MatchResult`] is produced by scorecard analysis (or entered by hand)
//! and is the payload submitted to the league site. Game order is play order
//! and is kept as-is everywhere the result travels.

mod types;
mod validate;

pub use types::{is_accepted_image_type, GameResult, ImageRef, MatchResult, ACCEPTED_IMAGE_TYPES};
pub use validate::{InvalidMatchResult, ValidationIssue};
