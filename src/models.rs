//! Data models for Microsoft Graph API responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A drive: the top-level container for a user's files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Drive {
    pub id: String,
    /// "personal", "business" or "documentLibrary".
    #[serde(default)]
    pub drive_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub owner: Option<IdentitySet>,
    #[serde(default)]
    pub quota: Option<Quota>,
}

/// Storage quota for a drive, in bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quota {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub used: u64,
    #[serde(default)]
    pub remaining: u64,
    #[serde(default)]
    pub deleted: u64,
    /// "normal", "nearing", "critical" or "exceeded".
    #[serde(default)]
    pub state: Option<String>,
}

/// The identities that own or last acted on a resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentitySet {
    #[serde(default)]
    pub user: Option<Identity>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// A file or folder entry within a drive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub web_url: Option<String>,
    #[serde(default)]
    pub created_date_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_modified_date_time: Option<DateTime<Utc>>,
    /// Present when the item is a file.
    #[serde(default)]
    pub file: Option<FileFacet>,
    /// Present when the item is a folder.
    #[serde(default)]
    pub folder: Option<FolderFacet>,
    #[serde(default)]
    pub parent_reference: Option<ParentReference>,
}

impl DriveItem {
    /// Check if this item is a folder.
    pub fn is_folder(&self) -> bool {
        self.folder.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileFacet {
    #[serde(default)]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderFacet {
    #[serde(default)]
    pub child_count: Option<u64>,
}

/// Location of an item within its drive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentReference {
    #[serde(default)]
    pub drive_id: Option<String>,
    #[serde(default)]
    pub drive_type: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

/// Response envelope for collection endpoints.
#[derive(Debug, Deserialize)]
pub struct DriveList {
    #[serde(default)]
    pub value: Vec<Drive>,
}

#[derive(Debug, Deserialize)]
pub struct DriveItemList {
    #[serde(default)]
    pub value: Vec<DriveItem>,
}

/// Graph API error response body.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub inner_error: Option<InnerError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InnerError {
    #[serde(default, rename = "request-id")]
    pub request_id: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

impl std::fmt::Display for ApiErrorDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "code: {} message: {}", self.code, self.message)?;
        if let Some(inner) = &self.inner_error {
            if let Some(request_id) = &inner.request_id {
                write!(f, " request-id: {}", request_id)?;
            }
            if let Some(date) = &inner.date {
                write!(f, " date: {}", date)?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for Drive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let owner = self
            .owner
            .as_ref()
            .and_then(|o| o.user.as_ref())
            .and_then(|u| u.display_name.as_deref())
            .unwrap_or("-");
        let quota = self
            .quota
            .as_ref()
            .map(|q| format!("{} / {}", format_size(q.used), format_size(q.total)))
            .unwrap_or_else(|| "-".to_string());
        write!(f, "{}\t{}\t{}\t{}", self.id, self.drive_type, quota, owner)
    }
}

impl std::fmt::Display for DriveItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let size_str = self
            .size
            .map(format_size)
            .unwrap_or_else(|| "-".to_string());
        let kind = if self.is_folder() {
            "folder"
        } else {
            self.file
                .as_ref()
                .and_then(|file| file.mime_type.as_deref())
                .unwrap_or("-")
        };
        write!(f, "{}\t{}\t{}\t{}", self.id, size_str, kind, self.name)
    }
}

/// Format bytes into human-readable size.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
