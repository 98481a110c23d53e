// Serves files from a fixed root directory. The resolved path must stay inside
// that root; anything else is answered with 403.

use axum::{
    http::header,
    response::{IntoResponse, Response},
};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

use super::error::ApiError;

pub async fn serve_contained(root: &Path, relative: &str) -> Result<Response, ApiError> {
    let path = resolve_contained(root, relative).await?;
    let data = tokio::fs::read(&path).await.map_err(|e| {
        debug!(path = %path.display(), error = %e, "Failed to read file");
        ApiError::NotFound(format!("File not found: {}", relative))
    })?;

    Ok(([(header::CONTENT_TYPE, content_type_for(&path).to_string())], data).into_response())
}

/// Canonical path of `relative` under `root`, or why it cannot be served.
pub async fn resolve_contained(root: &Path, relative: &str) -> Result<PathBuf, ApiError> {
    if !is_lexically_contained(Path::new(relative)) {
        warn!(root = %root.display(), relative, "Rejected path outside of its root");
        return Err(ApiError::Forbidden("Access denied".to_string()));
    }

    let not_found = || ApiError::NotFound(format!("File not found: {}", relative));
    let root = tokio::fs::canonicalize(root).await.map_err(|_| not_found())?;
    let resolved = tokio::fs::canonicalize(root.join(relative))
        .await
        .map_err(|_| not_found())?;

    // Symlinks may still point elsewhere.
    if !resolved.starts_with(&root) {
        warn!(root = %root.display(), resolved = %resolved.display(), "Rejected path outside of its root");
        return Err(ApiError::Forbidden("Access denied".to_string()));
    }
    if !resolved.is_file() {
        return Err(not_found());
    }
    Ok(resolved)
}

// True if joining `relative` onto a root can never climb above it.
fn is_lexically_contained(relative: &Path) -> bool {
    let mut depth = 0usize;
    for component in relative.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return false;
                }
                depth -= 1;
            }
            Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    true
}

fn content_type_for(path: &Path) -> mime::Mime {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("json") => mime::APPLICATION_JSON,
        Some("png") => mime::IMAGE_PNG,
        Some("jpg" | "jpeg") => mime::IMAGE_JPEG,
        Some("webp") => "image/webp".parse().unwrap_or(mime::APPLICATION_OCTET_STREAM),
        Some("svg") => mime::IMAGE_SVG,
        Some("css") => mime::TEXT_CSS,
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}
