// File: src/error.rs
// Purpose: Why a client-side navigation could not complete

use rssr_core::WireError;
use thiserror::Error;

/// A navigation failed; the caller falls back to a full page load
#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("no client route matches `{0}`")]
    NoRoute(String),

    #[error("failed to import `{module}`: {source}")]
    Import {
        module: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to fetch props for `{target}`: {source}")]
    Fetch {
        target: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Decode(#[from] WireError),
}
