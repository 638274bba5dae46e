use futures::future::BoxFuture;
use log::{debug, info};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{oneshot, watch, Mutex};
use ts_rs::TS;
use uuid::Uuid;

use crate::libs::error::AnyResult;

/// Runs after the user confirms. The dialog stays open (busy) until it settles.
pub type ConfirmCallback = Box<dyn FnOnce() -> BoxFuture<'static, AnyResult<()>> + Send>;
pub type CancelCallback = Box<dyn FnOnce() + Send>;

pub struct ConfirmConfig {
    pub title: String,
    pub message: String,
    pub confirm_label: String,
    pub cancel_label: String,
    pub danger: bool,
    pub on_confirm: Option<ConfirmCallback>,
    pub on_cancel: Option<CancelCallback>,
}

impl ConfirmConfig {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            confirm_label: "Confirm".into(),
            cancel_label: "Cancel".into(),
            danger: false,
            on_confirm: None,
            on_cancel: None,
        }
    }

    pub fn danger(mut self, confirm_label: impl Into<String>) -> Self {
        self.danger = true;
        self.confirm_label = confirm_label.into();
        self
    }

    pub fn on_confirm<F>(mut self, callback: F) -> Self
    where
        F: FnOnce() -> BoxFuture<'static, AnyResult<()>> + Send + 'static,
    {
        self.on_confirm = Some(Box::new(callback));
        self
    }

    pub fn on_cancel<F>(mut self, callback: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.on_cancel = Some(Box::new(callback));
        self
    }
}

/// What the view renders while a confirmation is open.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "notifications.ts")]
pub struct ConfirmDialog {
    #[ts(type = "string")]
    pub id: Uuid,
    pub title: String,
    pub message: String,
    pub confirm_label: String,
    pub cancel_label: String,
    pub danger: bool,
    /// The confirm callback is running.
    pub busy: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmDecision {
    Confirm,
    Cancel,
}

/**
 * Single confirmation slot. Concurrent `confirm` calls wait their turn in
 * FIFO order, so at most one dialog is ever open and each request gets
 * exactly one answer.
 */
#[derive(Clone)]
pub struct ConfirmSlot {
    turn: Arc<Mutex<()>>,
    pending: Arc<Mutex<Option<oneshot::Sender<ConfirmDecision>>>>,
    dialog: Arc<watch::Sender<Option<ConfirmDialog>>>,
}

/// Closes the dialog it opened, however the `confirm` call ends.
struct CloseOnDrop {
    dialog: Arc<watch::Sender<Option<ConfirmDialog>>>,
    id: Uuid,
}

impl Drop for CloseOnDrop {
    fn drop(&mut self) {
        self.dialog.send_if_modified(|dialog| {
            if dialog.as_ref().map(|d| d.id) == Some(self.id) {
                *dialog = None;
                true
            } else {
                false
            }
        });
    }
}

impl Default for ConfirmSlot {
    fn default() -> Self {
        let (dialog, _) = watch::channel(None);
        Self {
            turn: Arc::new(Mutex::new(())),
            pending: Arc::new(Mutex::new(None)),
            dialog: Arc::new(dialog),
        }
    }
}

impl ConfirmSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `true` only once the confirm callback (if any) succeeded.
    pub async fn confirm(&self, config: ConfirmConfig) -> AnyResult<bool> {
        let _turn = self.turn.lock().await;

        let (responder, decision) = oneshot::channel();
        *self.pending.lock().await = Some(responder);

        let dialog = ConfirmDialog {
            id: Uuid::new_v4(),
            title: config.title,
            message: config.message,
            confirm_label: config.confirm_label,
            cancel_label: config.cancel_label,
            danger: config.danger,
            busy: false,
        };
        let _close = CloseOnDrop {
            dialog: self.dialog.clone(),
            id: dialog.id,
        };
        debug!("Confirmation opened: {}", dialog.title);
        self.dialog.send_replace(Some(dialog));

        // a dropped responder only happens on teardown, treat it as a cancel
        let decision = decision.await.unwrap_or(ConfirmDecision::Cancel);

        match decision {
            ConfirmDecision::Confirm => {
                if let Some(on_confirm) = config.on_confirm {
                    self.dialog.send_modify(|dialog| {
                        if let Some(dialog) = dialog {
                            dialog.busy = true;
                        }
                    });
                    on_confirm().await?;
                }
                info!("Confirmation accepted");
                Ok(true)
            }
            ConfirmDecision::Cancel => {
                if let Some(on_cancel) = config.on_cancel {
                    on_cancel();
                }
                info!("Confirmation cancelled");
                Ok(false)
            }
        }
    }

    /// Answer the open dialog. Returns false when nothing was waiting.
    pub async fn resolve(&self, decision: ConfirmDecision) -> bool {
        match self.pending.lock().await.take() {
            Some(responder) => responder.send(decision).is_ok(),
            None => false,
        }
    }

    pub fn current(&self) -> Option<ConfirmDialog> {
        self.dialog.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<ConfirmDialog>> {
        self.dialog.subscribe()
    }
}
