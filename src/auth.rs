//! OAuth2 token storage and the interactive authorization-code flow.
//!
//! A [`Token`] is persisted as plain JSON and reused across runs. When no
//! usable token file exists, an [`Authorizer`] walks the user through the
//! authorization-code grant: it hands out an authorization URL, the user signs
//! in with a browser and pastes the redirect URL back, and the one-time code
//! inside it is exchanged for a token.

use std::fs;
use std::io::{stdin, stdout, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use oauth2::basic::{BasicClient, BasicTokenResponse, BasicTokenType};
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, CsrfToken, RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{OneDriveError, Result};

/// Microsoft identity platform authorization endpoint (common tenant).
const MS_AUTH_URL: &str = "https://login.microsoftonline.com/common/oauth2/v2.0/authorize";
/// Microsoft identity platform token endpoint.
const MS_TOKEN_URL: &str = "https://login.microsoftonline.com/common/oauth2/v2.0/token";
/// Redirect URL for native clients without their own callback server.
const NATIVE_REDIRECT_URL: &str = "https://login.microsoftonline.com/common/oauth2/nativeclient";
/// Application (client) ID registered for this tool.
const CLIENT_ID: &str = "c32f556d-11cc-45ce-9b73-37f701abf48c";
/// Graph permissions requested during authorization.
const SCOPES: &[&str] = &["Files.Read.All", "offline_access"];

/// Length in bytes of the random anti-CSRF `state` value.
const STATE_LEN: u32 = 32;

/// An OAuth2 token as persisted to disk.
///
/// The JSON field names follow the standard OAuth2 token layout, so token
/// files written by other tooling load unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl Token {
    /// Read a JSON-encoded token from `path`.
    ///
    /// A file that cannot be opened yields
    /// [`OneDriveError::TokenFileMissing`]; a file that does not contain a
    /// valid token yields [`OneDriveError::DecodeError`]. A token that loads
    /// is used as-is: expiry is not checked here.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Token> {
        let path = path.as_ref();
        let contents =
            fs::read_to_string(path).map_err(|source| OneDriveError::TokenFileMissing {
                path: path.to_path_buf(),
                source,
            })?;
        let token = serde_json::from_str(&contents)?;
        Ok(token)
    }

    /// Write the JSON-encoded token to `path`, replacing any existing file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = serde_json::to_string(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    fn from_response(response: &BasicTokenResponse) -> Token {
        let token_type = match response.token_type() {
            BasicTokenType::Bearer => "Bearer".to_string(),
            other => format!("{:?}", other),
        };
        let expiry = response.expires_in().map(|expires_in| {
            Utc::now()
                + chrono::Duration::from_std(expires_in)
                    .unwrap_or_else(|_| chrono::Duration::hours(1))
        });

        Token {
            access_token: response.access_token().secret().clone(),
            token_type,
            refresh_token: response.refresh_token().map(|t| t.secret().clone()),
            expiry,
        }
    }
}

/// Configuration for the authorization-code flow.
///
/// The defaults target the Microsoft identity platform; the endpoints only
/// change in tests.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub client_id: String,
    pub auth_url: String,
    pub token_url: String,
    pub redirect_url: String,
    pub scopes: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_id: CLIENT_ID.to_string(),
            auth_url: MS_AUTH_URL.to_string(),
            token_url: MS_TOKEN_URL.to_string(),
            redirect_url: NATIVE_REDIRECT_URL.to_string(),
            scopes: SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Drives the OAuth2 authorization-code grant.
pub struct Authorizer {
    oauth: BasicClient,
    scopes: Vec<String>,
}

impl Authorizer {
    /// Create an authorizer from a configuration.
    pub fn new(config: AuthConfig) -> Result<Self> {
        let AuthConfig {
            client_id,
            auth_url,
            token_url,
            redirect_url,
            scopes,
        } = config;

        // Public (native) client: no secret, the client id travels in the
        // token request body.
        let oauth = BasicClient::new(
            ClientId::new(client_id),
            None,
            AuthUrl::new(auth_url)?,
            Some(TokenUrl::new(token_url)?),
        )
        .set_redirect_uri(RedirectUrl::new(redirect_url)?);

        Ok(Self { oauth, scopes })
    }

    /// Create an authorizer with the default Microsoft configuration.
    pub fn with_defaults() -> Result<Self> {
        Self::new(AuthConfig::default())
    }

    /// Start a new authorization attempt with a fresh anti-CSRF state.
    pub fn begin(&self) -> PendingAuthorization {
        let mut request = self
            .oauth
            .authorize_url(|| CsrfToken::new_random_len(STATE_LEN))
            .add_extra_param("access_type", "offline");
        for scope in &self.scopes {
            request = request.add_scope(Scope::new(scope.clone()));
        }
        let (url, state) = request.url();

        tracing::debug!(%url, "built authorization URL");

        PendingAuthorization {
            oauth: self.oauth.clone(),
            url,
            state,
        }
    }
}

/// A single authorization attempt awaiting the browser redirect.
///
/// Holds the `state` value for exactly one round trip; [`exchange`] consumes
/// the attempt whether it succeeds or fails, so a state value is never reused.
///
/// [`exchange`]: PendingAuthorization::exchange
pub struct PendingAuthorization {
    oauth: BasicClient,
    url: Url,
    state: CsrfToken,
}

impl PendingAuthorization {
    /// The URL the user must visit in a browser to sign in.
    pub fn auth_url(&self) -> &Url {
        &self.url
    }

    /// Validate the redirect URL pasted by the user and exchange the
    /// authorization code in it for a token.
    ///
    /// The `state` query parameter must match the generated value
    /// byte-for-byte; anything else fails with
    /// [`OneDriveError::StateMismatch`] before any request is made.
    pub async fn exchange(self, redirect_url: &str) -> Result<Token> {
        let redirect = Url::parse(redirect_url.trim())?;

        let mut state = None;
        let mut code = None;
        for (key, value) in redirect.query_pairs() {
            match key.as_ref() {
                "state" => state = Some(value.into_owned()),
                "code" => code = Some(value.into_owned()),
                _ => {}
            }
        }

        let state = state.ok_or(OneDriveError::MissingRedirectParam("state"))?;
        if state != *self.state.secret() {
            return Err(OneDriveError::StateMismatch);
        }
        let code = code.ok_or(OneDriveError::MissingRedirectParam("code"))?;

        tracing::debug!("exchanging authorization code for a token");
        let response = self
            .oauth
            .exchange_code(AuthorizationCode::new(code))
            .request_async(async_http_client)
            .await
            .map_err(|e| OneDriveError::TokenExchangeError(e.to_string()))?;

        Ok(Token::from_response(&response))
    }
}

/// Print sign-in instructions and read the redirect URL from standard input.
///
/// Blocks until the user pastes a line; no timeout is applied.
pub fn prompt_for_redirect(auth_url: &Url) -> Result<String> {
    println!("Visit the following URL in a browser to authorize this application.");
    println!("After signing in, copy the full redirect URL from the address bar.");
    println!("{auth_url}");
    print!("Redirect URL: ");
    stdout().flush()?;

    let mut line = String::new();
    stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
