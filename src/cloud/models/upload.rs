use std::path::Path;

use crate::libs::error::{AnyResult, MulticloudError};

/// A local file queued for upload. Bytes are held in memory for the
/// duration of the request only.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFile {
    pub name: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let mime_type = mime_guess::from_path(&name)
            .first()
            .map(|mime| mime.essence_str().to_string());

        Self {
            name,
            mime_type,
            bytes,
        }
    }

    pub async fn from_path(path: &Path) -> AnyResult<Self> {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                MulticloudError::validation(format!("Invalid file path: {}", path.display()))
            })?;
        let bytes = tokio::fs::read(path).await?;

        Ok(Self::new(name, bytes))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}
