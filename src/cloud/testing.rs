//! In-memory `CloudApi` for tests. Responses can be held back until the
//! test releases them, which is how out-of-order completion is forced.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

use crate::cloud::api::{CloudApi, DownloadedFile, ProgressFn};
use crate::cloud::models::{
    Account, AccountId, FileEntry, FileId, FilePreview, PreviewMode, ProviderKind, StorageStats,
    UploadFile,
};
use crate::libs::error::{AnyResult, MulticloudError};
use crate::libs::utils::normalize_path;

pub fn account(id: AccountId, provider: ProviderKind, email: &str) -> Account {
    Account {
        id,
        provider_kind: provider,
        account_email: email.to_string(),
        total_storage_bytes: Some(15_000_000_000),
        used_storage_bytes: Some(1_000_000),
        available_storage_bytes: None,
        is_active: Some(true),
        connected_at: None,
        last_synced_at: None,
    }
}

pub fn file(id: FileId, name: &str) -> FileEntry {
    FileEntry {
        id,
        file_name: name.to_string(),
        file_size_bytes: Some(1024),
        mime_type: None,
        is_folder: false,
        modified_at: None,
        created_at: None,
        cloud_file_id: Some(format!("cloud-{}", id)),
        file_path: None,
        cloud_provider: None,
        parent_folder_id: None,
        thumbnail_url: None,
        web_view_link: None,
    }
}

pub fn folder(id: FileId, name: &str) -> FileEntry {
    FileEntry {
        is_folder: true,
        file_size_bytes: None,
        ..file(id, name)
    }
}

pub fn ids(entries: &[FileEntry]) -> Vec<FileId> {
    entries.iter().map(|entry| entry.id).collect()
}

/// Test side of a held call.
pub struct Hold {
    /// Fires once the call reached the mock.
    pub arrived: oneshot::Receiver<()>,
    /// Send to let the call finish.
    pub release: oneshot::Sender<()>,
}

struct HeldCall {
    arrived: oneshot::Sender<()>,
    release: oneshot::Receiver<()>,
}

#[derive(Clone)]
enum Failure {
    Remote(String),
    Transport,
}

#[derive(Default)]
struct MockState {
    accounts: Vec<Account>,
    folders: HashMap<(AccountId, String), Vec<FileEntry>>,
    search_results: HashMap<String, Vec<FileEntry>>,
    downloads: HashMap<FileId, DownloadedFile>,
    holds: HashMap<String, VecDeque<HeldCall>>,
    failures: HashMap<String, Failure>,
    calls: Vec<String>,
    next_id: FileId,
}

impl MockState {
    fn remove_everywhere(&mut self, id: FileId) -> Option<FileEntry> {
        self.folders.values_mut().find_map(|entries| {
            let index = entries.iter().position(|entry| entry.id == id)?;
            Some(entries.remove(index))
        })
    }

    fn find_mut(&mut self, id: FileId) -> Option<&mut FileEntry> {
        self.folders
            .values_mut()
            .flat_map(|entries| entries.iter_mut())
            .find(|entry| entry.id == id)
    }

    fn fresh_id(&mut self) -> FileId {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct MockCloudApi {
    state: Mutex<MockState>,
}

impl MockCloudApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(MockState {
                next_id: 1000,
                ..MockState::default()
            }),
        })
    }

    pub fn with_account(self: &Arc<Self>, account: Account) -> &Arc<Self> {
        self.state.lock().unwrap().accounts.push(account);
        self
    }

    pub fn with_files(
        self: &Arc<Self>,
        account_id: AccountId,
        path: &str,
        files: Vec<FileEntry>,
    ) -> &Arc<Self> {
        self.state
            .lock()
            .unwrap()
            .folders
            .insert((account_id, path.to_string()), files);
        self
    }

    pub fn with_search(self: &Arc<Self>, query: &str, files: Vec<FileEntry>) -> &Arc<Self> {
        self.state
            .lock()
            .unwrap()
            .search_results
            .insert(query.to_string(), files);
        self
    }

    pub fn with_download(
        self: &Arc<Self>,
        file_id: FileId,
        download: DownloadedFile,
    ) -> &Arc<Self> {
        self.state.lock().unwrap().downloads.insert(file_id, download);
        self
    }

    pub fn files(&self, account_id: AccountId, path: &str) -> Vec<FileEntry> {
        self.state
            .lock()
            .unwrap()
            .folders
            .get(&(account_id, path.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    /// Hold the next call recorded under `call`, e.g. `"list_files 1 "`.
    pub fn hold(&self, call: &str) -> Hold {
        let (arrived_tx, arrived_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel();
        self.state
            .lock()
            .unwrap()
            .holds
            .entry(call.to_string())
            .or_default()
            .push_back(HeldCall {
                arrived: arrived_tx,
                release: release_rx,
            });
        Hold {
            arrived: arrived_rx,
            release: release_tx,
        }
    }

    pub fn hold_listing(&self, account_id: AccountId, path: &str) -> Hold {
        self.hold(&listing_call(account_id, path))
    }

    /// Make every call to `op` (the method name) fail with a remote error.
    pub fn fail(&self, op: &str, message: &str) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(op.to_string(), Failure::Remote(message.to_string()));
    }

    pub fn fail_transport(&self, op: &str) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(op.to_string(), Failure::Transport);
    }

    pub fn recover(&self, op: &str) {
        self.state.lock().unwrap().failures.remove(op);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self, op: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.split(' ').next() == Some(op))
            .count()
    }

    /// Record the call, wait out any hold on it, then apply injected failures.
    async fn enter(&self, call: String) -> AnyResult<()> {
        let op = call.split(' ').next().unwrap_or_default().to_string();
        let held = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(call.clone());
            state.holds.get_mut(&call).and_then(VecDeque::pop_front)
        };

        if let Some(held) = held {
            let _ = held.arrived.send(());
            let _ = held.release.await;
        }

        match self.state.lock().unwrap().failures.get(&op).cloned() {
            Some(Failure::Remote(message)) => Err(MulticloudError::remote(Some(500), message)),
            Some(Failure::Transport) => Err(MulticloudError::Transport(format!("{} refused", op))),
            None => Ok(()),
        }
    }
}

pub fn listing_call(account_id: AccountId, path: &str) -> String {
    format!("list_files {} {}", account_id, path)
}

#[async_trait]
impl CloudApi for MockCloudApi {
    /// Answers with the accounts as they were when the call arrived.
    async fn list_accounts(&self) -> AnyResult<Vec<Account>> {
        let accounts = self.state.lock().unwrap().accounts.clone();
        self.enter("list_accounts".into()).await?;
        Ok(accounts)
    }

    async fn disconnect_account(&self, account_id: AccountId) -> AnyResult<()> {
        self.enter(format!("disconnect_account {}", account_id)).await?;
        let mut state = self.state.lock().unwrap();
        state.accounts.retain(|account| account.id != account_id);
        state.folders.retain(|(owner, _), _| *owner != account_id);
        Ok(())
    }

    async fn sync_account(&self, account_id: AccountId) -> AnyResult<()> {
        self.enter(format!("sync_account {}", account_id)).await?;
        let mut state = self.state.lock().unwrap();
        if let Some(account) = state.accounts.iter_mut().find(|a| a.id == account_id) {
            account.last_synced_at = Some(chrono::Utc::now().naive_utc());
        }
        Ok(())
    }

    async fn list_files(&self, account_id: AccountId, path: &str) -> AnyResult<Vec<FileEntry>> {
        self.enter(listing_call(account_id, path)).await?;
        Ok(self.files(account_id, path))
    }

    async fn list_all_files(&self) -> AnyResult<Vec<FileEntry>> {
        self.enter("list_all_files".into()).await?;
        let state = self.state.lock().unwrap();
        Ok(state.folders.values().flatten().cloned().collect())
    }

    async fn search(&self, query: &str) -> AnyResult<Vec<FileEntry>> {
        self.enter(format!("search {}", query)).await?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .search_results
            .get(query)
            .cloned()
            .unwrap_or_default())
    }

    async fn upload_file(
        &self,
        account_id: AccountId,
        file: &UploadFile,
        path: Option<&str>,
        on_progress: ProgressFn,
    ) -> AnyResult<()> {
        on_progress(50);
        self.enter(format!("upload_file {} {}", account_id, file.name)).await?;
        on_progress(100);

        let mut state = self.state.lock().unwrap();
        let id = state.fresh_id();
        state
            .folders
            .entry((account_id, normalize_path(path.unwrap_or_default())))
            .or_default()
            .push(FileEntry {
                file_size_bytes: Some(file.size()),
                mime_type: file.mime_type.clone(),
                ..crate::cloud::testing::file(id, &file.name)
            });
        Ok(())
    }

    async fn upload_files(
        &self,
        account_id: AccountId,
        files: &[UploadFile],
        path: Option<&str>,
        on_progress: ProgressFn,
    ) -> AnyResult<()> {
        on_progress(30);
        self.enter(format!("upload_files {}", account_id)).await?;
        on_progress(100);

        let mut state = self.state.lock().unwrap();
        for upload in files {
            let id = state.fresh_id();
            state
                .folders
                .entry((account_id, normalize_path(path.unwrap_or_default())))
                .or_default()
                .push(file(id, &upload.name));
        }
        Ok(())
    }

    async fn download(&self, file_id: FileId) -> AnyResult<DownloadedFile> {
        self.enter(format!("download {}", file_id)).await?;
        self.state
            .lock()
            .unwrap()
            .downloads
            .get(&file_id)
            .cloned()
            .ok_or_else(|| MulticloudError::remote(Some(404), "File not found"))
    }

    async fn delete_file(&self, file_id: FileId) -> AnyResult<()> {
        self.enter(format!("delete_file {}", file_id)).await?;
        self.state.lock().unwrap().remove_everywhere(file_id);
        Ok(())
    }

    async fn batch_delete(&self, file_ids: &[FileId]) -> AnyResult<()> {
        self.enter(format!("batch_delete {:?}", file_ids)).await?;
        let mut state = self.state.lock().unwrap();
        for id in file_ids {
            state.remove_everywhere(*id);
        }
        Ok(())
    }

    async fn rename(&self, file_id: FileId, new_name: &str) -> AnyResult<()> {
        self.enter(format!("rename {} {}", file_id, new_name)).await?;
        let mut state = self.state.lock().unwrap();
        match state.find_mut(file_id) {
            Some(entry) => {
                entry.file_name = new_name.to_string();
                Ok(())
            }
            None => Err(MulticloudError::remote(Some(404), "File not found")),
        }
    }

    async fn move_file(
        &self,
        file_id: FileId,
        target_account_id: AccountId,
        new_path: &str,
    ) -> AnyResult<()> {
        self.enter(format!("move_file {} {} {}", file_id, target_account_id, new_path))
            .await?;
        let mut state = self.state.lock().unwrap();
        let entry = state
            .remove_everywhere(file_id)
            .ok_or_else(|| MulticloudError::remote(Some(404), "File not found"))?;
        state
            .folders
            .entry((target_account_id, new_path.to_string()))
            .or_default()
            .push(entry);
        Ok(())
    }

    async fn copy_file(
        &self,
        file_id: FileId,
        target_account_id: AccountId,
        target_folder_id: Option<&str>,
    ) -> AnyResult<()> {
        self.enter(format!("copy_file {} {}", file_id, target_account_id))
            .await?;
        let mut state = self.state.lock().unwrap();
        let mut copy = state
            .find_mut(file_id)
            .map(|entry| entry.clone())
            .ok_or_else(|| MulticloudError::remote(Some(404), "File not found"))?;
        copy.id = state.fresh_id();
        state
            .folders
            .entry((target_account_id, target_folder_id.unwrap_or_default().to_string()))
            .or_default()
            .push(copy);
        Ok(())
    }

    async fn create_folder(
        &self,
        account_id: AccountId,
        folder_name: &str,
        parent_folder_id: Option<&str>,
    ) -> AnyResult<()> {
        self.enter(format!("create_folder {} {}", account_id, folder_name))
            .await?;
        let mut state = self.state.lock().unwrap();
        let id = state.fresh_id();
        state
            .folders
            .entry((account_id, parent_folder_id.unwrap_or_default().to_string()))
            .or_default()
            .push(folder(id, folder_name));
        Ok(())
    }

    async fn preview(&self, file_id: FileId) -> AnyResult<FilePreview> {
        self.enter(format!("preview {}", file_id)).await?;
        Ok(FilePreview {
            file_id: Some(file_id),
            file_name: None,
            provider: None,
            mime_type: Some("text/plain".into()),
            file_size: None,
            preview_available: true,
            preview_mode: Some(PreviewMode::Text),
            content_type: None,
            inline_content: Some("hello".into()),
            preview_url: None,
            thumbnail_url: None,
            message: None,
        })
    }

    async fn storage_stats(&self) -> AnyResult<StorageStats> {
        self.enter("storage_stats".into()).await?;
        let state = self.state.lock().unwrap();
        Ok(StorageStats {
            total_files: Some(
                state
                    .folders
                    .values()
                    .flatten()
                    .filter(|entry| !entry.is_folder)
                    .count() as u64,
            ),
            ..StorageStats::default()
        })
    }
}
