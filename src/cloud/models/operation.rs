use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use ts_rs::TS;
use uuid::Uuid;

use super::file_entry::FileId;

/// Represents the kind of a mutating operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, TS)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[ts(export, export_to = "cloud.ts")]
pub enum OperationKind {
    Upload,
    Delete,
    BatchDelete,
    Rename,
    Move,
    Copy,
    CreateFolder,
    Sync,
    Download,
}

impl OperationKind {
    /// Title shown in the progress surface while the operation runs
    pub fn progress_title(&self) -> &'static str {
        match self {
            OperationKind::Upload => "Uploading...",
            OperationKind::Delete => "Deleting file...",
            OperationKind::BatchDelete => "Deleting items...",
            OperationKind::Rename => "Renaming...",
            OperationKind::Move => "Moving file...",
            OperationKind::Copy => "Copying file...",
            OperationKind::CreateFolder => "Creating folder...",
            OperationKind::Sync => "Syncing account...",
            OperationKind::Download => "Downloading file...",
        }
    }
}

/// Represents the status of an operation ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, TS)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[ts(export, export_to = "cloud.ts")]
pub enum TicketStatus {
    Pending,
    Success,
    Error,
}

/// Transient record of one mutating operation, dropped a while after it settles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "cloud.ts")]
pub struct OperationTicket {
    #[ts(type = "string")]
    pub id: Uuid,
    pub kind: OperationKind,
    pub target_ids: Vec<FileId>,
    pub status: TicketStatus,
    pub progress_percent: Option<u8>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl OperationTicket {
    pub fn new(kind: OperationKind, target_ids: Vec<FileId>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            target_ids,
            status: TicketStatus::Pending,
            progress_percent: None,
            error: None,
            created_at: Utc::now(),
        }
    }
}
