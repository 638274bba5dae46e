use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};
use std::str::FromStr;
use ts_rs::TS;

use crate::libs::error::{AnyResult, MulticloudError};

pub type AccountId = i64;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, AsRefStr, TS,
)]
#[ts(export, export_to = "cloud.ts")]
pub enum ProviderKind {
    #[serde(rename = "GOOGLE_DRIVE")]
    #[strum(serialize = "GOOGLE_DRIVE")]
    GoogleDrive,
    #[serde(rename = "ONEDRIVE")]
    #[strum(serialize = "ONEDRIVE")]
    OneDrive,
    #[serde(rename = "DROPBOX")]
    #[strum(serialize = "DROPBOX")]
    Dropbox,
}

impl ProviderKind {
    pub fn parse(s: &str) -> AnyResult<Self> {
        ProviderKind::from_str(s).map_err(|_| MulticloudError::InvalidProviderType)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::GoogleDrive => "Google Drive",
            ProviderKind::OneDrive => "OneDrive",
            ProviderKind::Dropbox => "Dropbox",
        }
    }

    /// Path segment of the backend's OAuth authorize endpoint.
    pub fn oauth_slug(&self) -> &'static str {
        match self {
            ProviderKind::GoogleDrive => "google",
            ProviderKind::OneDrive => "onedrive",
            ProviderKind::Dropbox => "dropbox",
        }
    }
}

/// A connected cloud-storage account, as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "cloud.ts")]
pub struct Account {
    pub id: AccountId,
    #[serde(rename = "providerName")]
    pub provider_kind: ProviderKind,
    pub account_email: String,
    #[serde(default, rename = "totalStorage")]
    pub total_storage_bytes: Option<u64>,
    #[serde(default, rename = "usedStorage")]
    pub used_storage_bytes: Option<u64>,
    #[serde(default, rename = "availableStorage")]
    pub available_storage_bytes: Option<u64>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub connected_at: Option<NaiveDateTime>,
    #[serde(default, rename = "lastSynced")]
    pub last_synced_at: Option<NaiveDateTime>,
}

impl Account {
    pub fn storage_percentage(&self) -> f64 {
        match (self.total_storage_bytes, self.used_storage_bytes) {
            (Some(total), Some(used)) if total > 0 => used as f64 / total as f64 * 100.0,
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_wire_names() {
        assert_eq!(ProviderKind::from_str("ONEDRIVE").unwrap(), ProviderKind::OneDrive);
        assert_eq!(ProviderKind::GoogleDrive.as_ref(), "GOOGLE_DRIVE");
        assert!(matches!(
            ProviderKind::parse("BOX"),
            Err(MulticloudError::InvalidProviderType)
        ));
        assert_eq!(
            serde_json::to_string(&ProviderKind::Dropbox).unwrap(),
            "\"DROPBOX\""
        );
    }

    #[test]
    fn account_from_backend_payload() {
        let account: Account = serde_json::from_value(serde_json::json!({
            "id": 7,
            "providerName": "GOOGLE_DRIVE",
            "accountEmail": "ana@example.com",
            "totalStorage": 1000,
            "usedStorage": 250,
            "isActive": true,
            "connectedAt": "2024-03-01T10:15:30",
            "lastSynced": null
        }))
        .unwrap();

        assert_eq!(account.id, 7);
        assert_eq!(account.provider_kind, ProviderKind::GoogleDrive);
        assert_eq!(account.last_synced_at, None);
        assert!((account.storage_percentage() - 25.0).abs() < f64::EPSILON);
    }
}
