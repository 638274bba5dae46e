//! User-facing feedback: transient notifications, the confirmation
//! dialog and the global progress indicator. Each surface is published on
//! its own watch channel so the view can subscribe to just what it draws.

mod confirm;
mod progress;
mod toast;

pub use confirm::*;
pub use progress::*;
pub use toast::*;


use uuid::Uuid;

use crate::libs::config::ClientConfig;
use crate::libs::error::AnyResult;

#[derive(Clone)]
pub struct NotificationBroker {
    toasts: Toasts,
    confirmations: ConfirmSlot,
    progress: ProgressSlot,
}

impl NotificationBroker {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            toasts: Toasts::new(config.notification_duration()),
            confirmations: ConfirmSlot::new(),
            progress: ProgressSlot::new(config.progress_auto_dismiss()),
        }
    }

    // Notifications

    pub fn notify(
        &self,
        message: impl Into<String>,
        kind: NotificationKind,
        options: NotifyOptions,
    ) -> Uuid {
        self.toasts.notify(message, kind, options)
    }

    pub fn success(&self, message: impl Into<String>) -> Uuid {
        self.notify(message, NotificationKind::Success, NotifyOptions::default())
    }

    pub fn error(&self, message: impl Into<String>) -> Uuid {
        self.notify(message, NotificationKind::Error, NotifyOptions::default())
    }

    pub fn warning(&self, message: impl Into<String>) -> Uuid {
        self.notify(message, NotificationKind::Warning, NotifyOptions::default())
    }

    pub fn info(&self, message: impl Into<String>) -> Uuid {
        self.notify(message, NotificationKind::Info, NotifyOptions::default())
    }

    pub fn dismiss(&self, id: Uuid) -> bool {
        self.toasts.dismiss(id)
    }

    pub fn clear_notifications(&self) {
        self.toasts.clear()
    }

    pub fn toasts(&self) -> &Toasts {
        &self.toasts
    }

    // Confirmation

    pub async fn confirm(&self, config: ConfirmConfig) -> AnyResult<bool> {
        self.confirmations.confirm(config).await
    }

    pub async fn resolve_confirmation(&self, decision: ConfirmDecision) -> bool {
        self.confirmations.resolve(decision).await
    }

    pub async fn cancel_confirmation(&self) -> bool {
        self.resolve_confirmation(ConfirmDecision::Cancel).await
    }

    pub fn confirmations(&self) -> &ConfirmSlot {
        &self.confirmations
    }

    // Progress

    pub fn begin_progress(&self, config: ProgressConfig) -> ProgressId {
        self.progress.begin(config)
    }

    pub fn update_progress(&self, update: ProgressUpdate) -> bool {
        self.progress.update(update)
    }

    pub fn complete_progress(&self, outcome: ProgressOutcome) -> bool {
        self.progress.complete(outcome)
    }

    pub fn end_progress(&self) {
        self.progress.end()
    }

    pub fn progress(&self) -> &ProgressSlot {
        &self.progress
    }
}
