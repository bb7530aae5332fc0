// File: src/statics.rs
// Purpose: Serve built assets straight from the build directory

use axum::body::Body;
use axum::extract::Request;
use axum::http::request::Parts;
use axum::http::{header, HeaderValue};
use axum::response::Response;
use std::path::{Path, PathBuf};
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::assets::AssetRegistry;
use crate::error::Error;

/// Suffixes tried, in order, after the request path
const SUFFIXES: [&str; 3] = ["", ".html", "index.html"];

const IMMUTABLE: &str = "public, max-age=31536000, immutable";

/// First regular file under `root` for `pathname`, trying [`SUFFIXES`]
///
/// Paths with `..` segments never resolve.
pub async fn find_file(root: &Path, pathname: &str) -> Option<PathBuf> {
    let decoded = urlencoding::decode(pathname).ok()?;
    if decoded.split('/').any(|segment| segment == "..") {
        return None;
    }

    let relative = decoded.trim_start_matches('/');
    let base = root.join(relative);

    for suffix in SUFFIXES {
        let candidate = match suffix {
            "" => base.clone(),
            "index.html" => base.join(suffix),
            _ if relative.is_empty() || relative.ends_with('/') => continue,
            _ => PathBuf::from(format!("{}{suffix}", base.display())),
        };
        if let Ok(metadata) = tokio::fs::metadata(&candidate).await {
            if metadata.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}

/// Serves `request` from the build directory if a file matches
///
/// Requests naming a content hash get a long-lived immutable cache policy.
pub async fn serve_static(
    root: &Path,
    assets: &AssetRegistry,
    request: &Parts,
) -> Result<Option<Response>, Error> {
    let (asset, hashed) = assets.resolve_request(request.uri.path(), request.uri.query());
    let Some(file) = find_file(root, asset).await else {
        return Ok(None);
    };

    let mut forwarded = Request::new(Body::empty());
    *forwarded.method_mut() = request.method.clone();
    *forwarded.uri_mut() = request.uri.clone();
    *forwarded.headers_mut() = request.headers.clone();

    let response = match ServeFile::new(&file).oneshot(forwarded).await {
        Ok(response) => response,
        Err(never) => match never {},
    };
    let mut response = response.map(Body::new);

    if hashed {
        response
            .headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static(IMMUTABLE));
    }
    tracing::debug!("Served static {:?}", file);
    Ok(Some(response))
}
