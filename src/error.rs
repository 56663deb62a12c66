//! Error types for the onedrive crate.

use std::path::PathBuf;

use thiserror::Error;

use crate::models::ApiErrorDetail;

/// Errors that can occur when authenticating against or talking to the
/// Microsoft Graph API.
#[derive(Error, Debug)]
pub enum OneDriveError {
    /// The token file does not exist or could not be opened. Recoverable:
    /// callers may run the interactive authorization flow instead.
    #[error("token file missing: {path}")]
    TokenFileMissing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The `state` returned in the redirect URL does not match the one sent
    /// with the authorization request, indicating a possible Cross-Site
    /// Request Forgery.
    #[error("state mismatch in redirect URL, possible CSRF")]
    StateMismatch,

    /// The redirect URL lacked a required query parameter.
    #[error("redirect URL missing '{0}' parameter")]
    MissingRedirectParam(&'static str),

    #[error("authorization code exchange failed: {0}")]
    TokenExchangeError(String),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// A structured error response from the Graph API.
    #[error("API error: {0}")]
    ApiError(ApiErrorDetail),

    #[error("failed to decode JSON: {0}")]
    DecodeError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("invalid URL: {0}")]
    UrlError(#[from] url::ParseError),
}

/// Result type alias for OneDriveError.
pub type Result<T> = std::result::Result<T, OneDriveError>;
