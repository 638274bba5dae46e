use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::file_entry::FileId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "cloud.ts")]
pub enum PreviewMode {
    Text,
    Image,
    Pdf,
    #[serde(other)]
    Unsupported,
}

/// Preview payload: either inline content or a URL the view can embed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "cloud.ts")]
pub struct FilePreview {
    #[serde(default)]
    pub file_id: Option<FileId>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub preview_available: bool,
    #[serde(default)]
    pub preview_mode: Option<PreviewMode>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub inline_content: Option<String>,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl FilePreview {
    pub fn mode(&self) -> PreviewMode {
        self.preview_mode.unwrap_or(PreviewMode::Unsupported)
    }

    /// Reason to show instead of a preview, when there is nothing to render.
    pub fn unavailable_reason(&self) -> Option<&str> {
        if self.preview_available || self.preview_url.is_some() {
            return None;
        }
        self.message.as_deref()
    }
}
