use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use strum::Display;
use tokio::sync::watch;
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, TS)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[ts(export, export_to = "notifications.ts")]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "notifications.ts")]
pub struct Notification {
    #[ts(type = "string")]
    pub id: Uuid,
    pub message: String,
    pub kind: NotificationKind,
    pub title: Option<String>,
    /// `None` when the notification stays until dismissed.
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotifyOptions {
    pub title: Option<String>,
    /// Overrides the configured default lifetime.
    pub duration: Option<Duration>,
    /// Never expire on its own.
    pub persistent: bool,
}

/// Stack of visible notifications. Each one expires on its own timer.
#[derive(Debug, Clone)]
pub struct Toasts {
    default_duration: Duration,
    visible: Arc<watch::Sender<Vec<Notification>>>,
}

impl Toasts {
    pub fn new(default_duration: Duration) -> Self {
        let (visible, _) = watch::channel(Vec::new());
        Self {
            default_duration,
            visible: Arc::new(visible),
        }
    }

    pub fn notify(
        &self,
        message: impl Into<String>,
        kind: NotificationKind,
        options: NotifyOptions,
    ) -> Uuid {
        let duration = match (options.persistent, options.duration) {
            (true, _) => None,
            (false, Some(duration)) => Some(duration),
            (false, None) => Some(self.default_duration),
        }
        .filter(|duration| !duration.is_zero());

        let notification = Notification {
            id: Uuid::new_v4(),
            message: message.into(),
            kind,
            title: options.title,
            duration_ms: duration.map(|duration| duration.as_millis() as u64),
        };
        let id = notification.id;

        debug!("[{}] {}", kind, notification.message);
        self.visible.send_modify(|visible| visible.push(notification));

        if let Some(duration) = duration {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    let toasts = self.clone();
                    handle.spawn(async move {
                        tokio::time::sleep(duration).await;
                        toasts.dismiss(id);
                    });
                }
                Err(_) => warn!("No async runtime, notification {} will not expire", id),
            }
        }

        id
    }

    /// Returns false when the notification was already gone.
    pub fn dismiss(&self, id: Uuid) -> bool {
        self.visible.send_if_modified(|visible| {
            let before = visible.len();
            visible.retain(|notification| notification.id != id);
            visible.len() != before
        })
    }

    pub fn clear(&self) {
        self.visible.send_if_modified(|visible| {
            let changed = !visible.is_empty();
            visible.clear();
            changed
        });
    }

    pub fn visible(&self) -> Vec<Notification> {
        self.visible.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<Notification>> {
        self.visible.subscribe()
    }
}
