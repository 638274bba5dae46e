use itertools::Itertools;
use log::debug;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;

use crate::cloud::api::ProgressFn;
use crate::cloud::coordinator::{Operation, OperationCoordinator, Refresh, Tracker};
use crate::cloud::models::{AccountId, ListingKey, OperationKind, UploadFile};
use crate::libs::constants::MULTIPLE_UPLOAD_PROGRESS_KEY;
use crate::libs::error::AnyResult;
use crate::libs::utils::{format_file_size, normalize_path};

/// Listing key an upload lands in, in the same form navigation uses.
fn destination(account_id: AccountId, path: Option<&str>) -> ListingKey {
    ListingKey::folder(account_id, normalize_path(path.unwrap_or_default()))
}

impl OperationCoordinator {
    fn validate_uploads(&self, files: &[UploadFile]) -> AnyResult<()> {
        if files.is_empty() {
            return self.reject("No files selected for upload.");
        }
        for file in files {
            if file.name.trim().is_empty() {
                return self.reject("Every uploaded file needs a name.");
            }
            if file.size() > self.max_upload_bytes {
                return self.reject(format!(
                    "{} is larger than the {} upload limit.",
                    file.name,
                    format_file_size(self.max_upload_bytes)
                ));
            }
        }
        Ok(())
    }

    /// Progress sink writing to `key` in the upload map, the ticket and the progress slot.
    fn progress_sink(&self, key: String, tracker: Tracker) -> ProgressFn {
        let coordinator = self.clone();
        Arc::new(move |percent: u8| {
            coordinator.upload_progress.send_modify(|progress| {
                progress.insert(key.clone(), percent.min(100));
            });
            coordinator.report_progress(tracker, percent);
        })
    }

    fn forget_progress(&self, key: &str) {
        self.upload_progress
            .send_if_modified(|progress| progress.remove(key).is_some());
    }

    /**
     * Upload one file. Its percentage lives under the file name in the
     * upload-progress map until the request settles either way.
     */
    pub async fn upload_one(
        &self,
        account_id: AccountId,
        file: UploadFile,
        path: Option<&str>,
    ) -> AnyResult<()> {
        self.validate_uploads(std::slice::from_ref(&file))?;

        let key = file.name.clone();
        let operation = Operation {
            kind: OperationKind::Upload,
            targets: vec![],
            success: format!("{} uploaded successfully.", file.name),
            failure_context: Some(format!("Failed to upload {}", file.name)),
            refresh: Refresh::Folder(destination(account_id, path)),
        };

        let result = self
            .run(operation, |tracker| {
                let on_progress = self.progress_sink(key.clone(), tracker);
                async move {
                    self.api
                        .upload_file(account_id, &file, path, on_progress)
                        .await
                }
            })
            .await;

        self.forget_progress(&key);
        result
    }

    /**
     * Upload several files in one request, tracked as one aggregate
     * percentage. A failure counts for every file, even if the server
     * kept some of them.
     */
    pub async fn upload_many(
        &self,
        account_id: AccountId,
        files: Vec<UploadFile>,
        path: Option<&str>,
    ) -> AnyResult<()> {
        self.validate_uploads(&files)?;

        let names = files.iter().map(|file| file.name.as_str()).join(", ");
        debug!("Uploading {} files to account {}: {}", files.len(), account_id, names);

        let operation = Operation {
            kind: OperationKind::Upload,
            targets: vec![],
            success: format!("{} files uploaded successfully.", files.len()),
            failure_context: Some(format!("Failed to upload {}", names)),
            refresh: Refresh::Folder(destination(account_id, path)),
        };

        let result = self
            .run(operation, |tracker| {
                let on_progress =
                    self.progress_sink(MULTIPLE_UPLOAD_PROGRESS_KEY.to_string(), tracker);
                async move {
                    self.api
                        .upload_files(account_id, &files, path, on_progress)
                        .await
                }
            })
            .await;

        self.forget_progress(MULTIPLE_UPLOAD_PROGRESS_KEY);
        result
    }

    pub fn upload_progress(&self) -> BTreeMap<String, u8> {
        self.upload_progress.borrow().clone()
    }

    pub fn subscribe_upload_progress(&self) -> watch::Receiver<BTreeMap<String, u8>> {
        self.upload_progress.subscribe()
    }
}
