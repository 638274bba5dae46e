use serde::{ser::Serializer, Serialize};
use strum::Display;
use thiserror::Error;

use crate::libs::constants::{GENERIC_ERROR_MESSAGE, TRANSPORT_ERROR_MESSAGE};

/**
 * Every error the coordination layer can hand back to a caller.
 * Remote payload shapes are normalized into these variants once, at the
 * HTTP client boundary, so nothing downstream probes raw JSON.
 */
#[derive(Debug, Error)]
pub enum MulticloudError {
    /// No response reached us. The detail is for logs, the display is for users.
    #[error("{}", TRANSPORT_ERROR_MESSAGE)]
    Transport(String),

    #[error("{message}")]
    Remote { status: Option<u16>, message: String },

    /// Rejected before any remote call was made.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    IO(#[from] std::io::Error),

    #[error("An error occurred while manipulating the config: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid provider type")]
    InvalidProviderType,

    #[error(transparent)]
    Unknown(#[from] anyhow::Error),
}

/// Coarse classification used for logging and by the view layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Transport,
    Remote,
    Validation,
    Unauthorized,
    Internal,
}

/// The tagged `{kind, message}` view of an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
}

impl MulticloudError {
    pub fn validation(message: impl Into<String>) -> Self {
        MulticloudError::Validation(message.into())
    }

    pub fn remote(status: Option<u16>, message: impl Into<String>) -> Self {
        MulticloudError::Remote {
            status,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            MulticloudError::Transport(_) => ErrorKind::Transport,
            MulticloudError::Remote {
                status: Some(401), ..
            } => ErrorKind::Unauthorized,
            MulticloudError::Remote { .. } => ErrorKind::Remote,
            MulticloudError::Validation(_) => ErrorKind::Validation,
            _ => ErrorKind::Internal,
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            kind: self.kind(),
            message: self.to_string(),
        }
    }

    /// Authentication expiry is the only condition that warrants a full session reset.
    pub fn is_auth_expired(&self) -> bool {
        self.kind() == ErrorKind::Unauthorized
    }
}

/**
 * Let's make errors UI friendly, so they can be handed over as plain strings
 */
impl Serialize for MulticloudError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.to_string().as_ref())
    }
}

pub type AnyResult<T, E = MulticloudError> = Result<T, E>;

impl From<serde_json::Error> for MulticloudError {
    fn from(error: serde_json::Error) -> Self {
        MulticloudError::SerializationError(error.to_string())
    }
}

impl From<reqwest::Error> for MulticloudError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            return MulticloudError::SerializationError(error.to_string());
        }
        match error.status() {
            Some(status) => MulticloudError::remote(Some(status.as_u16()), GENERIC_ERROR_MESSAGE),
            None => MulticloudError::Transport(error.to_string()),
        }
    }
}

impl From<toml::ser::Error> for MulticloudError {
    fn from(error: toml::ser::Error) -> Self {
        MulticloudError::SerializationError(error.to_string())
    }
}

impl From<toml::de::Error> for MulticloudError {
    fn from(error: toml::de::Error) -> Self {
        MulticloudError::Config(error.to_string())
    }
}
