//! Scorecard image resolution.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::match_result::{is_accepted_image_type, ImageRef};

use super::LeagueError;

/// Resolve an image reference to a readable file under `root`.
///
/// Relative paths are taken from `root`. Symlinks and `..` segments are
/// resolved before the containment check, and only accepted image types
/// are allowed.
pub async fn resolve_image(root: &Path, image: &ImageRef) -> Result<PathBuf, LeagueError> {
    let content_type = image.resolved_content_type();
    if !is_accepted_image_type(content_type) {
        return Err(LeagueError::ImageRejected(format!(
            "unsupported image type '{}' for {}",
            content_type,
            image.path.display()
        )));
    }

    let root = tokio::fs::canonicalize(root)
        .await
        .map_err(|source| LeagueError::ImageRead {
            path: root.to_path_buf(),
            source,
        })?;

    let candidate = if image.path.is_absolute() {
        image.path.clone()
    } else {
        root.join(&image.path)
    };

    let resolved = tokio::fs::canonicalize(&candidate)
        .await
        .map_err(|source| LeagueError::ImageRead {
            path: image.path.clone(),
            source,
        })?;

    if !resolved.starts_with(&root) {
        warn!(
            path = %resolved.display(),
            image_dir = %root.display(),
            "Refusing scorecard image outside the image directory"
        );
        return Err(LeagueError::ImageRejected(format!(
            "{} is outside the image directory",
            image.path.display()
        )));
    }

    Ok(resolved)
}
