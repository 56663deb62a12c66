//! onedrive - a client library for the Microsoft Graph OneDrive API.
//!
//! This library provides OAuth2-authenticated access to:
//! - Get the signed-in user's drive metadata
//! - List all drives available to the user
//! - List recently-used files
//!
//! A token obtained through the interactive authorization-code flow is stored
//! as a JSON file and reused on later runs.
//!
//! # Example
//!
//! ```no_run
//! use onedrive::OneDriveClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Loads .token.json, or walks through browser sign-in if it is missing.
//!     let client = OneDriveClient::connect(".token.json").await?;
//!
//!     for drive in client.list_my_drives().await? {
//!         println!("{}", drive);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod models;

// Re-exports for convenience
pub use auth::{AuthConfig, Authorizer, Token};
pub use client::OneDriveClient;
pub use error::{OneDriveError, Result};
pub use models::{Drive, DriveItem};
