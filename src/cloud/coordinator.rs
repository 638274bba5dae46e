use futures::FutureExt;
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use uuid::Uuid;

use crate::cloud::accounts::AccountRegistry;
use crate::cloud::api::CloudApi;
use crate::cloud::listing::FileListingCache;
use crate::cloud::models::{
    AccountId, FileEntry, FileId, FilePreview, ListingKey, OperationKind, OperationTicket,
    StorageStats, TicketStatus,
};
use crate::libs::config::ClientConfig;
use crate::libs::constants::DEFAULT_DOWNLOAD_NAME;
use crate::libs::error::{AnyResult, ErrorKind, MulticloudError};
use crate::notifications::{
    ConfirmConfig, NotificationBroker, ProgressConfig, ProgressId, ProgressOutcome, ProgressUpdate,
};

/// Which listing to refetch once a mutation succeeded.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Refresh {
    Nothing,
    /// Whatever key is active.
    Active,
    /// The active key, if it is a folder of this account.
    Account(AccountId),
    /// This folder, if it is the active key or nothing is active.
    Folder(ListingKey),
}

/// Everything `run` needs to know about one operation besides the call itself.
pub(crate) struct Operation {
    pub kind: OperationKind,
    pub targets: Vec<FileId>,
    pub success: String,
    /// Prefixed to the error in the failure notification.
    pub failure_context: Option<String>,
    pub refresh: Refresh,
}

/// Handles an in-flight operation uses to report progress.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Tracker {
    pub ticket_id: Uuid,
    pub progress_id: ProgressId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameOutcome {
    Renamed,
    /// Empty or identical name, nothing was sent.
    Unchanged,
}

/**
 * Runs every mutating action the same way: validate, call the remote API,
 * refetch the listing on success, then report through the broker. The
 * coordinator never writes listing entries itself.
 */
#[derive(Clone)]
pub struct OperationCoordinator {
    pub(crate) api: Arc<dyn CloudApi>,
    pub(crate) listing: FileListingCache,
    pub(crate) accounts: AccountRegistry,
    pub(crate) broker: NotificationBroker,
    pub(crate) max_upload_bytes: u64,
    ticket_linger: Duration,
    tickets: Arc<watch::Sender<Vec<OperationTicket>>>,
    pub(crate) upload_progress: Arc<watch::Sender<BTreeMap<String, u8>>>,
}

impl OperationCoordinator {
    pub fn new(
        api: Arc<dyn CloudApi>,
        listing: FileListingCache,
        accounts: AccountRegistry,
        broker: NotificationBroker,
        config: &ClientConfig,
    ) -> Self {
        let (tickets, _) = watch::channel(Vec::new());
        let (upload_progress, _) = watch::channel(BTreeMap::new());
        Self {
            api,
            listing,
            accounts,
            broker,
            max_upload_bytes: config.max_upload_bytes,
            ticket_linger: config.ticket_linger(),
            tickets: Arc::new(tickets),
            upload_progress: Arc::new(upload_progress),
        }
    }

    // Tickets

    fn open_ticket(&self, kind: OperationKind, targets: Vec<FileId>) -> Uuid {
        let ticket = OperationTicket::new(kind, targets);
        let id = ticket.id;
        self.tickets.send_modify(|tickets| tickets.push(ticket));
        id
    }

    pub(crate) fn update_ticket(&self, id: Uuid, update: impl FnOnce(&mut OperationTicket)) {
        self.tickets.send_if_modified(|tickets| {
            match tickets.iter_mut().find(|ticket| ticket.id == id) {
                Some(ticket) => {
                    update(ticket);
                    true
                }
                None => false,
            }
        });
    }

    fn settle_ticket(&self, id: Uuid, status: TicketStatus, error: Option<String>) {
        self.update_ticket(id, |ticket| {
            ticket.status = status;
            ticket.error = error;
            if status == TicketStatus::Success {
                ticket.progress_percent = Some(100);
            }
        });

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let tickets = self.tickets.clone();
        let linger = self.ticket_linger;
        handle.spawn(async move {
            tokio::time::sleep(linger).await;
            tickets.send_if_modified(|tickets| {
                let before = tickets.len();
                tickets.retain(|ticket| ticket.id != id);
                tickets.len() != before
            });
        });
    }

    pub fn tickets(&self) -> Vec<OperationTicket> {
        self.tickets.borrow().clone()
    }

    pub fn subscribe_tickets(&self) -> watch::Receiver<Vec<OperationTicket>> {
        self.tickets.subscribe()
    }

    /// Push a percentage to the operation's ticket and the progress slot.
    pub(crate) fn report_progress(&self, tracker: Tracker, percent: u8) {
        self.update_ticket(tracker.ticket_id, |ticket| {
            ticket.progress_percent = Some(percent)
        });
        self.broker.progress().update_for(
            tracker.progress_id,
            ProgressUpdate {
                percent: Some(percent),
                ..ProgressUpdate::default()
            },
        );
    }

    // Shared pipeline

    /// Surface a rejected input once to the user, then hand it back.
    pub(crate) fn reject<T>(&self, message: impl Into<String>) -> AnyResult<T> {
        let error = MulticloudError::validation(message);
        self.broker.error(error.to_string());
        Err(error)
    }

    pub(crate) async fn run<T, F, Fut>(&self, operation: Operation, call: F) -> AnyResult<T>
    where
        F: FnOnce(Tracker) -> Fut,
        Fut: Future<Output = AnyResult<T>>,
    {
        let Operation {
            kind,
            targets,
            success,
            failure_context,
            refresh,
        } = operation;

        let tracker = Tracker {
            ticket_id: self.open_ticket(kind, targets.clone()),
            progress_id: self
                .broker
                .begin_progress(ProgressConfig::new(kind.progress_title())),
        };
        debug!("[{}] started for {:?}", kind, targets);

        match call(tracker).await {
            Ok(value) => {
                self.refresh(&refresh).await;
                info!("[{}] {}", kind, success);
                self.broker
                    .progress()
                    .complete_for(tracker.progress_id, ProgressOutcome::success(success.clone()));
                self.broker.success(success);
                self.settle_ticket(tracker.ticket_id, TicketStatus::Success, None);
                Ok(value)
            }
            Err(e) => {
                match e.kind() {
                    ErrorKind::Transport => warn!("[{}] transport failure: {}", kind, e),
                    other => warn!("[{}] {} failure: {}", kind, other, e),
                }
                let message = match failure_context {
                    Some(context) => format!("{}: {}", context, e),
                    None => e.to_string(),
                };
                self.broker
                    .progress()
                    .complete_for(tracker.progress_id, ProgressOutcome::error(message.clone()));
                self.broker.error(message.clone());
                self.settle_ticket(tracker.ticket_id, TicketStatus::Error, Some(message));
                Err(e)
            }
        }
    }

    /// Refetch failures are left on the listing's error indicator.
    async fn refresh(&self, refresh: &Refresh) {
        let request = self
            .listing
            .issue_from_active(|active| match (refresh, active) {
                (Refresh::Nothing, _) => None,
                (Refresh::Active, active) => active.cloned(),
                (Refresh::Account(account_id), Some(active)) => {
                    (active.account_id() == Some(*account_id)).then(|| active.clone())
                }
                (Refresh::Account(_), None) => None,
                (Refresh::Folder(folder), Some(active)) => {
                    (active == folder).then(|| active.clone())
                }
                (Refresh::Folder(folder), None) => Some(folder.clone()),
            })
            .await;

        match request {
            Some(request) => {
                if let Err(e) = self.listing.settle(request).await {
                    warn!("Refetch after mutation failed: {}", e);
                }
            }
            None => debug!("No listing to refetch for {:?}", refresh),
        }
    }

    /// Account the current listing belongs to, else the selected one.
    async fn source_account(&self) -> Option<AccountId> {
        match self.listing.snapshot().key.and_then(|key| key.account_id()) {
            Some(account_id) => Some(account_id),
            None => self.accounts.selected().await,
        }
    }

    fn listed(&self, file_id: FileId) -> Option<FileEntry> {
        self.listing.snapshot().find(file_id).cloned()
    }

    // Mutations

    pub async fn delete(&self, file_id: FileId) -> AnyResult<()> {
        let operation = Operation {
            kind: OperationKind::Delete,
            targets: vec![file_id],
            success: "File deleted successfully.".into(),
            failure_context: Some("Failed to delete file".into()),
            refresh: Refresh::Active,
        };
        self.run(operation, |_| self.api.delete_file(file_id)).await
    }

    /// One remote call for the whole set. It either all worked or none of it did.
    pub async fn batch_delete(&self, file_ids: &[FileId]) -> AnyResult<()> {
        let mut ids = file_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return self.reject("No files selected.");
        }

        let operation = Operation {
            kind: OperationKind::BatchDelete,
            targets: ids.clone(),
            success: "Selected files deleted.".into(),
            failure_context: Some("Failed to delete selected files".into()),
            refresh: Refresh::Active,
        };
        self.run(operation, |_| async move { self.api.batch_delete(&ids).await })
            .await
    }

    pub async fn rename(&self, file_id: FileId, new_name: &str) -> AnyResult<RenameOutcome> {
        let new_name = new_name.trim();
        let unchanged = new_name.is_empty()
            || self
                .listed(file_id)
                .is_some_and(|entry| entry.file_name == new_name);
        if unchanged {
            debug!("Rename of {} skipped, name unchanged", file_id);
            return Ok(RenameOutcome::Unchanged);
        }

        let operation = Operation {
            kind: OperationKind::Rename,
            targets: vec![file_id],
            success: "File renamed successfully.".into(),
            failure_context: Some("Failed to rename file".into()),
            refresh: Refresh::Active,
        };
        self.run(operation, |_| self.api.rename(file_id, new_name))
            .await?;
        Ok(RenameOutcome::Renamed)
    }

    async fn ensure_cross_account(&self, target_account_id: AccountId) -> AnyResult<()> {
        if self.source_account().await == Some(target_account_id) {
            return self.reject("Destination account must be different from the source account.");
        }
        Ok(())
    }

    /// `target_folder_id` of `None` means the destination root.
    pub async fn copy(
        &self,
        file_id: FileId,
        target_account_id: AccountId,
        target_folder_id: Option<&str>,
    ) -> AnyResult<()> {
        self.ensure_cross_account(target_account_id).await?;

        let operation = Operation {
            kind: OperationKind::Copy,
            targets: vec![file_id],
            success: "File copied successfully.".into(),
            failure_context: Some("Failed to copy file".into()),
            refresh: Refresh::Active,
        };
        self.run(operation, |_| {
            self.api.copy_file(file_id, target_account_id, target_folder_id)
        })
        .await
    }

    pub async fn move_file(
        &self,
        file_id: FileId,
        target_account_id: AccountId,
        new_path: &str,
    ) -> AnyResult<()> {
        self.ensure_cross_account(target_account_id).await?;

        let operation = Operation {
            kind: OperationKind::Move,
            targets: vec![file_id],
            success: "File moved successfully.".into(),
            failure_context: Some("Failed to move file".into()),
            refresh: Refresh::Active,
        };
        self.run(operation, |_| {
            self.api.move_file(file_id, target_account_id, new_path)
        })
        .await
    }

    pub async fn create_folder(
        &self,
        account_id: AccountId,
        name: &str,
        parent_folder_id: Option<&str>,
    ) -> AnyResult<()> {
        let name = name.trim();
        if name.is_empty() {
            return self.reject("Folder name is required.");
        }

        let operation = Operation {
            kind: OperationKind::CreateFolder,
            targets: vec![],
            success: format!("Folder \"{}\" created successfully.", name),
            failure_context: Some("Failed to create folder".into()),
            refresh: Refresh::Active,
        };
        self.run(operation, |_| {
            self.api.create_folder(account_id, name, parent_folder_id)
        })
        .await
    }

    /// Provider-side refresh, then the account list and that account's listing.
    pub async fn sync(&self, account_id: AccountId) -> AnyResult<()> {
        let operation = Operation {
            kind: OperationKind::Sync,
            targets: vec![],
            success: "Account synced successfully.".into(),
            failure_context: Some("Failed to sync account".into()),
            refresh: Refresh::Account(account_id),
        };
        self.run(operation, |_| async move {
            self.api.sync_account(account_id).await?;
            if let Err(e) = self.accounts.list_accounts().await {
                warn!("Account {} synced but the account list did not refresh: {}", account_id, e);
            }
            Ok(())
        })
        .await
    }

    // Confirmation-gated

    /// `Ok(false)` when the user declined.
    pub async fn delete_with_confirmation(&self, file_id: FileId) -> AnyResult<bool> {
        let name = self
            .listed(file_id)
            .map(|entry| entry.file_name)
            .unwrap_or_else(|| "this file".into());

        let coordinator = self.clone();
        let config = ConfirmConfig::new(
            "Delete file",
            format!("Are you sure you want to delete \"{}\"? This cannot be undone.", name),
        )
        .danger("Delete")
        .on_confirm(move || async move { coordinator.delete(file_id).await }.boxed());

        self.broker.confirm(config).await
    }

    pub async fn batch_delete_with_confirmation(&self, file_ids: Vec<FileId>) -> AnyResult<bool> {
        if file_ids.is_empty() {
            return self.reject("No files selected.");
        }

        let coordinator = self.clone();
        let config = ConfirmConfig::new(
            "Delete selected items",
            format!(
                "Are you sure you want to delete {} selected item(s)? This cannot be undone.",
                file_ids.len()
            ),
        )
        .danger("Delete")
        .on_confirm(move || async move { coordinator.batch_delete(&file_ids).await }.boxed());

        self.broker.confirm(config).await
    }

    // Queries

    /**
     * Fetch a file and write it into `dest_dir`. The server's
     * Content-Disposition name wins, then `fallback_name`, then the listed
     * name. Returns the written path.
     */
    pub async fn download(
        &self,
        file_id: FileId,
        fallback_name: Option<&str>,
        dest_dir: &Path,
    ) -> AnyResult<PathBuf> {
        let listed_name = self.listed(file_id).map(|entry| entry.file_name);
        let operation = Operation {
            kind: OperationKind::Download,
            targets: vec![file_id],
            success: "File downloaded successfully.".into(),
            failure_context: Some("Failed to download file".into()),
            refresh: Refresh::Nothing,
        };

        self.run(operation, |_| async move {
            let downloaded = self.api.download(file_id).await?;
            let name = [
                downloaded.file_name.as_deref(),
                fallback_name,
                listed_name.as_deref(),
            ]
            .into_iter()
            .flatten()
            .find_map(safe_file_name)
            .unwrap_or_else(|| DEFAULT_DOWNLOAD_NAME.to_string());

            tokio::fs::create_dir_all(dest_dir).await?;
            let target = dest_dir.join(name);
            tokio::fs::write(&target, &downloaded.bytes).await?;
            info!("Saved {} bytes to {:?}", downloaded.bytes.len(), target);
            Ok(target)
        })
        .await
    }

    pub async fn preview(&self, file_id: FileId) -> AnyResult<FilePreview> {
        if self.listed(file_id).is_some_and(|entry| entry.is_folder) {
            return self.reject("Folders cannot be previewed yet.");
        }

        match self.api.preview(file_id).await {
            Ok(preview) => Ok(preview),
            Err(e) => {
                self.broker.error(format!("Failed to load preview: {}", e));
                Err(e)
            }
        }
    }

    pub async fn all_files(&self) -> AnyResult<Vec<FileEntry>> {
        self.api.list_all_files().await
    }

    pub async fn storage_stats(&self) -> AnyResult<StorageStats> {
        self.api.storage_stats().await
    }
}

/// Last path component only, so a hostile header cannot escape `dest_dir`.
fn safe_file_name(name: &str) -> Option<String> {
    Path::new(name.trim())
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_are_reduced_to_their_last_component() {
        assert_eq!(safe_file_name("report.pdf").as_deref(), Some("report.pdf"));
        assert_eq!(safe_file_name("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(safe_file_name("  "), None);
        assert_eq!(safe_file_name(".."), None);
    }
}
