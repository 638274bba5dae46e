use async_trait::async_trait;
use futures::stream;
use log::{debug, warn};
use reqwest::header::{HeaderName, CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::{CloudApi, DownloadedFile, ProgressFn};
use crate::cloud::models::{
    Account, AccountId, FileEntry, FileId, FilePreview, StorageStats, UploadFile,
};
use crate::libs::config::ClientConfig;
use crate::libs::constants::{ERROR_REASON_FIELDS, GENERIC_ERROR_MESSAGE};
use crate::libs::error::{AnyResult, MulticloudError};
use crate::libs::utils::filename_from_content_disposition;

/// `CloudApi` over the backend's REST endpoints.
#[derive(Debug, Clone)]
pub struct HttpCloudApi {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
    upload_chunk_bytes: usize,
}

impl HttpCloudApi {
    pub fn new(config: &ClientConfig) -> AnyResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| MulticloudError::Config(format!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
            upload_chunk_bytes: config.upload_chunk_bytes.max(1),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/cloud-accounts{}", self.base_url, path)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send and turn any non-2xx answer into a `Remote` error.
    async fn execute(&self, builder: RequestBuilder) -> AnyResult<Response> {
        let response = match self.authorized(builder).send().await {
            Ok(response) => response,
            Err(e) => {
                let error = MulticloudError::from(e);
                if let MulticloudError::Transport(detail) = &error {
                    warn!("[transport] request failed: {}", detail);
                }
                return Err(error);
            }
        };

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = extract_reason(&body).unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string());
        warn!(
            "[remote] {} {}: {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or(""),
            message
        );

        Err(MulticloudError::remote(Some(status.as_u16()), message))
    }

    async fn fetch<T: DeserializeOwned>(&self, builder: RequestBuilder) -> AnyResult<T> {
        Ok(self.execute(builder).await?.json::<T>().await?)
    }

    async fn send(&self, builder: RequestBuilder) -> AnyResult<()> {
        self.execute(builder).await?;
        Ok(())
    }

    /**
     * Build a multipart part whose body is streamed in chunks, bumping the
     * shared byte counter as the transport pulls each chunk.
     */
    fn progress_part(
        &self,
        file: &UploadFile,
        sent: Arc<AtomicU64>,
        total: u64,
        on_progress: ProgressFn,
    ) -> AnyResult<Part> {
        let chunks: Vec<Vec<u8>> = file
            .bytes
            .chunks(self.upload_chunk_bytes)
            .map(|chunk| chunk.to_vec())
            .collect();

        let body = Body::wrap_stream(stream::iter(chunks.into_iter().map(move |chunk| {
            let done = sent.fetch_add(chunk.len() as u64, Ordering::SeqCst) + chunk.len() as u64;
            on_progress(percent(done, total));
            Ok::<_, std::io::Error>(chunk)
        })));

        let part = Part::stream_with_length(body, file.size()).file_name(file.name.clone());
        Ok(match &file.mime_type {
            Some(mime) => part.mime_str(mime)?,
            None => part,
        })
    }
}

fn header_value(response: &Response, name: HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn percent(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done.min(total) * 100) / total) as u8
}

/// First non-blank reason among the known failure fields.
pub(crate) fn extract_reason(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ERROR_REASON_FIELDS.iter().find_map(|field| {
        value
            .get(field)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|reason| !reason.is_empty())
            .map(str::to_string)
    })
}

#[async_trait]
impl CloudApi for HttpCloudApi {
    async fn list_accounts(&self) -> AnyResult<Vec<Account>> {
        self.fetch(self.client.get(self.url(""))).await
    }

    async fn disconnect_account(&self, account_id: AccountId) -> AnyResult<()> {
        self.send(self.client.delete(self.url(&format!("/{}", account_id))))
            .await
    }

    async fn sync_account(&self, account_id: AccountId) -> AnyResult<()> {
        self.send(self.client.post(self.url(&format!("/{}/sync", account_id))))
            .await
    }

    async fn list_files(&self, account_id: AccountId, path: &str) -> AnyResult<Vec<FileEntry>> {
        debug!("Listing account {} path {:?}", account_id, path);
        self.fetch(
            self.client
                .get(self.url(&format!("/{}/files", account_id)))
                .query(&[("path", path)]),
        )
        .await
    }

    async fn list_all_files(&self) -> AnyResult<Vec<FileEntry>> {
        self.fetch(self.client.get(self.url("/files/all"))).await
    }

    async fn search(&self, query: &str) -> AnyResult<Vec<FileEntry>> {
        self.fetch(
            self.client
                .get(self.url("/search"))
                .query(&[("query", query)]),
        )
        .await
    }

    async fn upload_file(
        &self,
        account_id: AccountId,
        file: &UploadFile,
        path: Option<&str>,
        on_progress: ProgressFn,
    ) -> AnyResult<()> {
        let sent = Arc::new(AtomicU64::new(0));
        let part = self.progress_part(file, sent, file.size(), on_progress)?;
        let mut form = Form::new().part("file", part);
        if let Some(path) = path {
            form = form.text("path", path.to_string());
        }

        debug!("Uploading {} ({} bytes) to account {}", file.name, file.size(), account_id);
        self.send(
            self.client
                .post(self.url(&format!("/{}/upload", account_id)))
                .multipart(form),
        )
        .await
    }

    async fn upload_files(
        &self,
        account_id: AccountId,
        files: &[UploadFile],
        path: Option<&str>,
        on_progress: ProgressFn,
    ) -> AnyResult<()> {
        let sent = Arc::new(AtomicU64::new(0));
        let total: u64 = files.iter().map(UploadFile::size).sum();

        let mut form = Form::new();
        for file in files {
            form = form.part(
                "files",
                self.progress_part(file, sent.clone(), total, on_progress.clone())?,
            );
        }
        if let Some(path) = path {
            form = form.text("path", path.to_string());
        }

        debug!("Uploading {} files ({} bytes) to account {}", files.len(), total, account_id);
        self.send(
            self.client
                .post(self.url(&format!("/{}/upload/multiple", account_id)))
                .multipart(form),
        )
        .await
    }

    async fn download(&self, file_id: FileId) -> AnyResult<DownloadedFile> {
        let response = self
            .execute(self.client.get(self.url(&format!("/files/{}/download", file_id))))
            .await?;

        let file_name = header_value(&response, CONTENT_DISPOSITION)
            .as_deref()
            .and_then(filename_from_content_disposition);
        let content_type = header_value(&response, CONTENT_TYPE);

        Ok(DownloadedFile {
            file_name,
            content_type,
            bytes: response.bytes().await?.to_vec(),
        })
    }

    async fn delete_file(&self, file_id: FileId) -> AnyResult<()> {
        self.send(self.client.delete(self.url(&format!("/files/{}", file_id))))
            .await
    }

    async fn batch_delete(&self, file_ids: &[FileId]) -> AnyResult<()> {
        self.send(
            self.client
                .delete(self.url("/files/batch"))
                .json(&json!({ "fileIds": file_ids })),
        )
        .await
    }

    async fn rename(&self, file_id: FileId, new_name: &str) -> AnyResult<()> {
        self.send(
            self.client
                .put(self.url(&format!("/files/{}/rename", file_id)))
                .json(&json!({ "newName": new_name })),
        )
        .await
    }

    async fn move_file(
        &self,
        file_id: FileId,
        target_account_id: AccountId,
        new_path: &str,
    ) -> AnyResult<()> {
        self.send(
            self.client
                .put(self.url(&format!("/files/{}/move", file_id)))
                .json(&json!({ "targetAccountId": target_account_id, "newPath": new_path })),
        )
        .await
    }

    async fn copy_file(
        &self,
        file_id: FileId,
        target_account_id: AccountId,
        target_folder_id: Option<&str>,
    ) -> AnyResult<()> {
        self.send(
            self.client
                .post(self.url(&format!("/files/{}/copy", file_id)))
                .json(&json!({
                    "targetAccountId": target_account_id,
                    "targetFolderId": target_folder_id,
                })),
        )
        .await
    }

    async fn create_folder(
        &self,
        account_id: AccountId,
        folder_name: &str,
        parent_folder_id: Option<&str>,
    ) -> AnyResult<()> {
        self.send(
            self.client
                .post(self.url(&format!("/{}/folder", account_id)))
                .json(&json!({
                    "folderName": folder_name,
                    "parentFolderId": parent_folder_id,
                })),
        )
        .await
    }

    async fn preview(&self, file_id: FileId) -> AnyResult<FilePreview> {
        self.fetch(self.client.get(self.url(&format!("/files/{}/preview", file_id))))
            .await
    }

    async fn storage_stats(&self) -> AnyResult<StorageStats> {
        self.fetch(self.client.get(self.url("/storage/stats"))).await
    }
}
