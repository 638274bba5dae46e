use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use strum::Display;
use tokio::sync::watch;
use ts_rs::TS;

/// Identifies one `begin_progress` call; later calls supersede it.
pub type ProgressId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, TS)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[ts(export, export_to = "notifications.ts")]
pub enum ProgressStatus {
    Running,
    Success,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressConfig {
    pub title: String,
    pub message: Option<String>,
    /// `None` renders as indeterminate.
    pub percent: Option<u8>,
}

impl ProgressConfig {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Partial update; unset fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressUpdate {
    pub title: Option<String>,
    pub message: Option<String>,
    pub percent: Option<u8>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AutoDismiss {
    #[default]
    Default,
    After(Duration),
    Disabled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressOutcome {
    pub status: ProgressStatus,
    pub message: Option<String>,
    pub auto_dismiss: AutoDismiss,
}

impl ProgressOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: ProgressStatus::Success,
            message: Some(message.into()),
            auto_dismiss: AutoDismiss::Default,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ProgressStatus::Error,
            message: Some(message.into()),
            auto_dismiss: AutoDismiss::Default,
        }
    }

    pub fn auto_dismiss(mut self, auto_dismiss: AutoDismiss) -> Self {
        self.auto_dismiss = auto_dismiss;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "notifications.ts")]
pub struct ProgressState {
    #[ts(type = "number")]
    pub id: ProgressId,
    pub title: String,
    pub message: Option<String>,
    pub percent: Option<u8>,
    pub status: ProgressStatus,
}

/**
 * The one global progress indicator. Beginning a new one replaces whatever
 * is showing, and every begin/end bumps the generation so a stale
 * auto-dismiss timer finds nothing to close.
 */
#[derive(Debug, Clone)]
pub struct ProgressSlot {
    default_auto_dismiss: Duration,
    generation: Arc<AtomicU64>,
    state: Arc<watch::Sender<Option<ProgressState>>>,
}

impl ProgressSlot {
    pub fn new(default_auto_dismiss: Duration) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            default_auto_dismiss,
            generation: Arc::new(AtomicU64::new(0)),
            state: Arc::new(state),
        }
    }

    pub fn begin(&self, config: ProgressConfig) -> ProgressId {
        let id = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Progress {} started: {}", id, config.title);
        self.state.send_replace(Some(ProgressState {
            id,
            title: config.title,
            message: config.message,
            percent: config.percent.map(|p| p.min(100)),
            status: ProgressStatus::Running,
        }));
        id
    }

    pub fn update(&self, update: ProgressUpdate) -> bool {
        self.update_for(self.current_id(), update)
    }

    /// Applies only while `id` is still the one showing.
    pub fn update_for(&self, id: ProgressId, update: ProgressUpdate) -> bool {
        self.state.send_if_modified(|state| match state {
            Some(current) if current.id == id => {
                if let Some(title) = update.title {
                    current.title = title;
                }
                if update.message.is_some() {
                    current.message = update.message;
                }
                if let Some(percent) = update.percent {
                    current.percent = Some(percent.min(100));
                }
                true
            }
            _ => false,
        })
    }

    pub fn complete(&self, outcome: ProgressOutcome) -> bool {
        self.complete_for(self.current_id(), outcome)
    }

    pub fn complete_for(&self, id: ProgressId, outcome: ProgressOutcome) -> bool {
        let status = outcome.status;
        let applied = self.state.send_if_modified(|state| match state {
            Some(current) if current.id == id => {
                current.status = status;
                if outcome.message.is_some() {
                    current.message = outcome.message;
                }
                if status == ProgressStatus::Success {
                    current.percent = Some(100);
                }
                true
            }
            _ => false,
        });
        if !applied {
            return false;
        }

        let delay = match outcome.auto_dismiss {
            AutoDismiss::Default => Some(self.default_auto_dismiss),
            AutoDismiss::After(delay) => Some(delay),
            AutoDismiss::Disabled => None,
        };
        if let Some(delay) = delay {
            self.schedule_dismiss(id, delay);
        }
        true
    }

    /// Closes the slot and voids any pending auto-dismiss. Safe to repeat.
    pub fn end(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.state.send_if_modified(|state| state.take().is_some());
    }

    fn schedule_dismiss(&self, id: ProgressId, delay: Duration) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("No async runtime, progress {} stays until ended", id);
            return;
        };
        let slot = self.clone();
        handle.spawn(async move {
            tokio::time::sleep(delay).await;
            if slot.generation.load(Ordering::SeqCst) == id {
                slot.end();
            }
        });
    }

    fn current_id(&self) -> ProgressId {
        self.state
            .borrow()
            .as_ref()
            .map(|state| state.id)
            .unwrap_or_default()
    }

    pub fn current(&self) -> Option<ProgressState> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<ProgressState>> {
        self.state.subscribe()
    }
}
