use chrono::NaiveDateTime;
use itertools::Itertools;
use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;
use strum::EnumString;
use ts_rs::TS;

pub type FileId = i64;

/// One item of a listing. Ids are unique across accounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "cloud.ts")]
pub struct FileEntry {
    pub id: FileId,
    pub file_name: String,
    #[serde(default, rename = "fileSize")]
    pub file_size_bytes: Option<u64>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default, deserialize_with = "null_as_false")]
    pub is_folder: bool,
    #[serde(default)]
    pub modified_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub cloud_file_id: Option<String>,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub cloud_provider: Option<String>,
    #[serde(default)]
    pub parent_folder_id: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub web_view_link: Option<String>,
}

fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

impl FileEntry {
    /// Lowercased extension, empty for folders and extension-less names.
    pub fn extension(&self) -> String {
        if self.is_folder {
            return String::new();
        }
        match self.file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
            _ => String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, TS)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[ts(export, export_to = "cloud.ts")]
pub enum SortBy {
    #[default]
    Name,
    Size,
    Date,
    Type,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, TS)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[ts(export, export_to = "cloud.ts")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/**
 * Sorted copy of a listing, for display only. The listing itself keeps
 * server order. `Date` ascending puts the most recent entries first, the
 * way the file browser has always shown it.
 */
pub fn sort_entries(entries: &[FileEntry], sort_by: SortBy, order: SortOrder) -> Vec<FileEntry> {
    entries
        .iter()
        .cloned()
        .sorted_by(|a, b| {
            let ordering = compare_by(a, b, sort_by);
            match order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        })
        .collect()
}

fn compare_by(a: &FileEntry, b: &FileEntry, sort_by: SortBy) -> Ordering {
    match sort_by {
        SortBy::Name => a
            .file_name
            .to_lowercase()
            .cmp(&b.file_name.to_lowercase()),
        SortBy::Size => a
            .file_size_bytes
            .unwrap_or(0)
            .cmp(&b.file_size_bytes.unwrap_or(0)),
        SortBy::Date => {
            let stamp = |e: &FileEntry| e.modified_at.or(e.created_at);
            stamp(b).cmp(&stamp(a))
        }
        SortBy::Type => a.extension().cmp(&b.extension()),
    }
}
