//! League site abstraction.
//!
//! This module provides a `LeagueSite` trait for the three operations a
//! submission needs (league check, result entry, image upload) and a
//! LeagueRepublic implementation that drives the site's web forms.

mod image;
mod league_republic;
mod types;

pub use image::resolve_image;
pub use league_republic::LeagueRepublicClient;
pub use types::*;
