use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use ts_rs::TS;

/// Aggregate storage numbers across every connected account
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export, export_to = "cloud.ts")]
pub struct StorageStats {
    pub total_files: Option<u64>,
    pub total_folders: Option<u64>,
    pub total_size: Option<u64>,
    pub file_type_distribution: HashMap<String, u64>,
    pub storage_by_cloud: HashMap<String, u64>,
    pub files_by_type: HashMap<String, u64>,
    pub upload_count: Option<u64>,
    pub download_count: Option<u64>,
    pub today_uploads: Option<u64>,
    pub today_downloads: Option<u64>,
    pub most_used_provider: Option<String>,
}
