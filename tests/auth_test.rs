//! Tests for the token store and the authorization-code flow.

use std::io::Write;

use mockito::Server;
use serde_json::json;
use tempfile::{tempdir, NamedTempFile};
use url::Url;

use onedrive::{AuthConfig, Authorizer, OneDriveClient, OneDriveError, Token};

fn config_for(server: &Server) -> AuthConfig {
    AuthConfig {
        token_url: format!("{}/token", server.url()),
        ..AuthConfig::default()
    }
}

/// Read the `state` query parameter out of an authorization URL.
fn state_of(auth_url: &Url) -> String {
    auth_url
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .expect("authorization URL carries a state parameter")
}

mod token_store {
    use super::*;

    #[test]
    fn test_save_load_round_trip() {
        let file = NamedTempFile::new().unwrap();
        let token = Token {
            access_token: "EwBYA8l6BAAU".to_string(),
            token_type: "Bearer".to_string(),
            refresh_token: Some("M.R3_BAY.CYxV".to_string()),
            expiry: Some("2024-06-01T12:00:00Z".parse().unwrap()),
        };

        token.save(file.path()).unwrap();
        let restored = Token::load(file.path()).unwrap();

        assert_eq!(restored.access_token, token.access_token);
        assert_eq!(restored.token_type, token.token_type);
        assert_eq!(restored.refresh_token, token.refresh_token);
        assert_eq!(restored.expiry, token.expiry);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let err = Token::load(dir.path().join("no-such-token.json")).unwrap_err();
        assert!(matches!(err, OneDriveError::TokenFileMissing { .. }));
    }

    #[test]
    fn test_load_corrupt_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();

        let err = Token::load(file.path()).unwrap_err();
        assert!(matches!(err, OneDriveError::DecodeError(_)));
    }

    #[test]
    fn test_save_replaces_existing_file() {
        let file = NamedTempFile::new().unwrap();
        let first = Token {
            access_token: "first".to_string(),
            token_type: "Bearer".to_string(),
            refresh_token: None,
            expiry: None,
        };
        let second = Token {
            access_token: "second".to_string(),
            ..first.clone()
        };

        first.save(file.path()).unwrap();
        second.save(file.path()).unwrap();

        assert_eq!(Token::load(file.path()).unwrap().access_token, "second");
    }
}

mod authorization_flow {
    use super::*;

    #[tokio::test]
    async fn test_exchange_with_matching_state() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "access_token": "new-access",
                    "token_type": "bearer",
                    "expires_in": 3600,
                    "refresh_token": "new-refresh"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let authorizer = Authorizer::new(config_for(&server)).unwrap();
        let pending = authorizer.begin();
        let state = state_of(pending.auth_url());

        let redirect = format!(
            "https://login.microsoftonline.com/common/oauth2/nativeclient?code=fake-code&state={}",
            state
        );
        let token = pending.exchange(&redirect).await.unwrap();

        assert_eq!(token.access_token, "new-access");
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.refresh_token.as_deref(), Some("new-refresh"));
        assert!(token.expiry.is_some());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_state_mismatch_rejected_before_exchange() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .expect(0)
            .create_async()
            .await;

        let authorizer = Authorizer::new(config_for(&server)).unwrap();
        let pending = authorizer.begin();

        let redirect = "https://login.microsoftonline.com/common/oauth2/nativeclient\
                        ?code=fake-code&state=forged-by-someone-else";
        let err = pending.exchange(redirect).await.unwrap_err();

        assert!(matches!(err, OneDriveError::StateMismatch));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_redirect_missing_code() {
        let server = Server::new_async().await;
        let authorizer = Authorizer::new(config_for(&server)).unwrap();
        let pending = authorizer.begin();
        let state = state_of(pending.auth_url());

        let redirect = format!(
            "https://login.microsoftonline.com/common/oauth2/nativeclient?state={}",
            state
        );
        let err = pending.exchange(&redirect).await.unwrap_err();

        assert!(matches!(err, OneDriveError::MissingRedirectParam("code")));
    }

    #[tokio::test]
    async fn test_unparseable_redirect() {
        let server = Server::new_async().await;
        let authorizer = Authorizer::new(config_for(&server)).unwrap();
        let pending = authorizer.begin();

        let err = pending.exchange("not a url at all").await.unwrap_err();
        assert!(matches!(err, OneDriveError::UrlError(_)));
    }

    #[tokio::test]
    async fn test_exchange_failure() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/token")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(json!({"error": "invalid_grant"}).to_string())
            .create_async()
            .await;

        let authorizer = Authorizer::new(config_for(&server)).unwrap();
        let pending = authorizer.begin();
        let state = state_of(pending.auth_url());

        let redirect = format!(
            "https://login.microsoftonline.com/common/oauth2/nativeclient?code=expired&state={}",
            state
        );
        let err = pending.exchange(&redirect).await.unwrap_err();

        assert!(matches!(err, OneDriveError::TokenExchangeError(_)));
    }
}

mod connect {
    use super::*;

    #[tokio::test]
    async fn test_stored_token_skips_interactive_flow() {
        let file = NamedTempFile::new().unwrap();
        let token = Token {
            access_token: "stored".to_string(),
            token_type: "Bearer".to_string(),
            refresh_token: None,
            expiry: None,
        };
        token.save(file.path()).unwrap();

        let authorizer = Authorizer::with_defaults().unwrap();
        let client = OneDriveClient::connect_with(file.path(), &authorizer, |_| {
            panic!("redirect callback must not run when a token file exists")
        })
        .await
        .unwrap();

        assert_eq!(client.token().access_token, "stored");
    }

    #[tokio::test]
    async fn test_corrupt_token_file_is_not_silently_replaced() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();

        let authorizer = Authorizer::with_defaults().unwrap();
        let err = OneDriveClient::connect_with(file.path(), &authorizer, |_| {
            panic!("redirect callback must not run for a corrupt token file")
        })
        .await
        .unwrap_err();

        assert!(matches!(err, OneDriveError::DecodeError(_)));
    }

    #[tokio::test]
    async fn test_missing_token_runs_flow_and_saves() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "access_token": "fresh-access",
                    "token_type": "bearer",
                    "expires_in": 3600
                })
                .to_string(),
            )
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let token_path = dir.path().join("token.json");

        let authorizer = Authorizer::new(config_for(&server)).unwrap();
        let client = OneDriveClient::connect_with(&token_path, &authorizer, |auth_url| {
            let state = state_of(auth_url);
            Ok(format!(
                "https://login.microsoftonline.com/common/oauth2/nativeclient?code=c&state={}",
                state
            ))
        })
        .await
        .unwrap();

        assert_eq!(client.token().access_token, "fresh-access");
        // The exchanged token was persisted for the next run.
        assert_eq!(Token::load(&token_path).unwrap().access_token, "fresh-access");
    }
}
