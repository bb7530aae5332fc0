// File: src/error.rs
// Purpose: Engine error types and their HTTP mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rssr_core::WireError;
use rssr_router::{MatchError, PatternError};
use std::path::PathBuf;
use thiserror::Error;

/// Build-time class defects: the page tree and the build output disagree
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no client-side script found for server-side page `{module}`")]
    MissingClientRoute { module: String },

    #[error("no default export in `{module}`")]
    MissingDefaultExport { module: String },

    #[error("redirect target `{target}` is not a valid header value")]
    InvalidRedirect { target: String },
}

/// A page module could not be produced by the loader
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("page module `{0}` is not registered")]
    NotFound(String),

    #[error("page module `{path}` failed to load: {source}")]
    Failed {
        path: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Errors raised while building route state or serving a request
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error(transparent)]
    Match(#[from] MatchError),

    #[error("failed to load build manifest {path:?}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to scan routes under {path:?}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("data fetch failed: {0:#}")]
    DataFetch(anyhow::Error),

    #[error(transparent)]
    Wire(#[from] WireError),
}

impl Error {
    /// Status code used when the error reaches an HTTP client
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Match(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "rejected request");
        }
        (status, self.to_string()).into_response()
    }
}
