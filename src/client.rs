//! Authenticated Microsoft Graph client and the OneDrive API operations.

use std::path::Path;

use reqwest::{Client, StatusCode};
use url::Url;

use crate::auth::{prompt_for_redirect, Authorizer, Token};
use crate::error::{OneDriveError, Result};
use crate::models::{ApiErrorResponse, Drive, DriveItem, DriveItemList, DriveList};

/// Base URL for Microsoft Graph API v1.0.
const GRAPH_API_BASE: &str = "https://graph.microsoft.com/v1.0";

/// Status codes for which Graph returns a structured error body.
///
/// Any other status, 2xx or not, passes the raw body through to the caller.
const ERROR_STATUS_CODES: &[u16] = &[
    400, 401, 403, 404, 405, 406, 409, 410, 411, 412, 413, 415, 416, 422, 423, 429, 500, 501, 503,
    504, 507, 509,
];

fn is_error_status(status: StatusCode) -> bool {
    ERROR_STATUS_CODES.contains(&status.as_u16())
}

/// Client for the Microsoft Graph OneDrive API.
///
/// Holds one bearer token for its whole lifetime; there is no refresh.
#[derive(Debug)]
pub struct OneDriveClient {
    token: Token,
    base_url: String,
    http: Client,
}

impl OneDriveClient {
    /// Create a client from an existing token.
    pub fn new(token: Token) -> Self {
        Self::with_base_url(token, GRAPH_API_BASE)
    }

    /// Create a client against a non-default base URL. Tests point this at a
    /// mock server.
    pub fn with_base_url(token: Token, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            token,
            base_url,
            http: Client::new(),
        }
    }

    /// Load a token from `token_path`, or obtain one interactively.
    ///
    /// If the token file is missing, prints the authorization URL and blocks
    /// on standard input for the redirect URL. A stored token that parses is
    /// used as-is and skips the flow entirely.
    pub async fn connect<P: AsRef<Path>>(token_path: P) -> Result<Self> {
        let authorizer = Authorizer::with_defaults()?;
        Self::connect_with(token_path, &authorizer, prompt_for_redirect).await
    }

    /// Like [`connect`], but with an explicit authorizer and a callback that
    /// supplies the redirect URL instead of the console prompt.
    ///
    /// The callback is only invoked when no usable token file exists. A newly
    /// exchanged token is saved to `token_path` before the client is built.
    ///
    /// [`connect`]: OneDriveClient::connect
    pub async fn connect_with<P, F>(token_path: P, authorizer: &Authorizer, redirect: F) -> Result<Self>
    where
        P: AsRef<Path>,
        F: FnOnce(&Url) -> Result<String>,
    {
        let token = match Token::load(&token_path) {
            Ok(token) => {
                tracing::debug!("using stored token");
                token
            }
            Err(OneDriveError::TokenFileMissing { path, .. }) => {
                tracing::info!(path = %path.display(), "no token file, starting authorization");
                let pending = authorizer.begin();
                let redirect_url = redirect(pending.auth_url())?;
                let token = pending.exchange(&redirect_url).await?;
                token.save(&token_path)?;
                token
            }
            Err(e) => return Err(e),
        };

        Ok(Self::new(token))
    }

    /// The token this client authenticates with.
    pub fn token(&self) -> &Token {
        &self.token
    }

    /// Issue an authenticated GET and return the raw response body.
    ///
    /// Statuses in the Graph error set have their body decoded as a
    /// structured error and returned as [`OneDriveError::ApiError`]; an error
    /// body that is not valid JSON yields [`OneDriveError::DecodeError`].
    pub async fn get(&self, url: &str) -> Result<Vec<u8>> {
        tracing::debug!(%url, "GET");
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token.access_token)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if is_error_status(status) {
            let decoded: ApiErrorResponse = serde_json::from_slice(&body)?;
            tracing::warn!(%status, code = %decoded.error.code, "Graph API error");
            return Err(OneDriveError::ApiError(decoded.error));
        }

        Ok(body.to_vec())
    }

    /// Get the signed-in user's drive.
    pub async fn get_my_drive(&self) -> Result<Drive> {
        let body = self.get(&self.endpoint("/me/drive")).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// List all drives available to the signed-in user.
    pub async fn list_my_drives(&self) -> Result<Vec<Drive>> {
        let body = self.get(&self.endpoint("/me/drives")).await?;
        let list: DriveList = serde_json::from_slice(&body)?;
        Ok(list.value)
    }

    /// List files the signed-in user recently used.
    pub async fn list_recent_files(&self) -> Result<Vec<DriveItem>> {
        let body = self.get(&self.endpoint("/me/drive/recent")).await?;
        let list: DriveItemList = serde_json::from_slice(&body)?;
        Ok(list.value)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}
