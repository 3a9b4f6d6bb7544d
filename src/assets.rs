//! Static front-end assets served from the configured root.

use std::path::{Component, Path, PathBuf};

use axum::{
    extract::{Path as UrlPath, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use crate::AppState;

/// `GET /` serves `index.html`.
pub async fn index(State(state): State<AppState>) -> Response {
    let path = state.static_dir.join("index.html");
    match tokio::fs::read(&path).await {
        Ok(bytes) => file_response(&path, bytes),
        Err(_) => (
            StatusCode::NOT_FOUND,
            "index.html not found in frontend folder.",
        )
            .into_response(),
    }
}

/// `GET /{*path}` serves any file below the root.
pub async fn asset(State(state): State<AppState>, UrlPath(requested): UrlPath<String>) -> Response {
    let Some(path) = contained_path(&state.static_dir, &requested) else {
        warn!("Rejected asset path outside the static root: {:?}", requested);
        return StatusCode::FORBIDDEN.into_response();
    };

    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => match tokio::fs::read(&path).await {
            Ok(bytes) => file_response(&path, bytes),
            Err(e) => {
                warn!("Failed to read asset {:?}: {}", path, e);
                StatusCode::NOT_FOUND.into_response()
            }
        },
        _ => {
            debug!("Asset not found: {:?}", path);
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

/// Lexically resolve `requested` under `root`; `None` if it would leave it
/// or name a hidden entry such as `.env` or `.git`.
fn contained_path(root: &Path, requested: &str) -> Option<PathBuf> {
    let mut relative = PathBuf::new();
    for component in Path::new(requested).components() {
        match component {
            Component::Normal(part) if part.to_string_lossy().starts_with('.') => return None,
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !relative.pop() {
                    return None;
                }
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(root.join(relative))
}

fn file_response(path: &Path, bytes: Vec<u8>) -> Response {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    ([(header::CONTENT_TYPE, mime.as_ref().to_string())], bytes).into_response()
}
