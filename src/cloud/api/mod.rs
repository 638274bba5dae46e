mod http;

pub use http::*;

use async_trait::async_trait;
use std::sync::Arc;

use crate::cloud::models::{
    Account, AccountId, FileEntry, FileId, FilePreview, StorageStats, UploadFile,
};
use crate::libs::error::AnyResult;

/// Receives upload progress as a whole percentage, 0 to 100.
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

/// Raw download: bytes plus whatever naming hints the server sent.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadedFile {
    /// Name taken from `Content-Disposition`, if any.
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/**
 * The remote API, one call per method. Implementations normalize every
 * failure into a `MulticloudError` before returning, so callers never
 * look at payload shapes.
 */
#[async_trait]
pub trait CloudApi: Send + Sync {
    async fn list_accounts(&self) -> AnyResult<Vec<Account>>;
    async fn disconnect_account(&self, account_id: AccountId) -> AnyResult<()>;
    async fn sync_account(&self, account_id: AccountId) -> AnyResult<()>;

    async fn list_files(&self, account_id: AccountId, path: &str) -> AnyResult<Vec<FileEntry>>;
    async fn list_all_files(&self) -> AnyResult<Vec<FileEntry>>;
    async fn search(&self, query: &str) -> AnyResult<Vec<FileEntry>>;

    async fn upload_file(
        &self,
        account_id: AccountId,
        file: &UploadFile,
        path: Option<&str>,
        on_progress: ProgressFn,
    ) -> AnyResult<()>;
    async fn upload_files(
        &self,
        account_id: AccountId,
        files: &[UploadFile],
        path: Option<&str>,
        on_progress: ProgressFn,
    ) -> AnyResult<()>;
    async fn download(&self, file_id: FileId) -> AnyResult<DownloadedFile>;

    async fn delete_file(&self, file_id: FileId) -> AnyResult<()>;
    async fn batch_delete(&self, file_ids: &[FileId]) -> AnyResult<()>;
    async fn rename(&self, file_id: FileId, new_name: &str) -> AnyResult<()>;
    async fn move_file(
        &self,
        file_id: FileId,
        target_account_id: AccountId,
        new_path: &str,
    ) -> AnyResult<()>;
    async fn copy_file(
        &self,
        file_id: FileId,
        target_account_id: AccountId,
        target_folder_id: Option<&str>,
    ) -> AnyResult<()>;
    async fn create_folder(
        &self,
        account_id: AccountId,
        folder_name: &str,
        parent_folder_id: Option<&str>,
    ) -> AnyResult<()>;

    async fn preview(&self, file_id: FileId) -> AnyResult<FilePreview>;
    async fn storage_stats(&self) -> AnyResult<StorageStats>;
}
