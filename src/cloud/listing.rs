use log::{debug, warn};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use ts_rs::TS;

use crate::cloud::api::CloudApi;
use crate::cloud::models::{FileEntry, FileId, ListingKey};
use crate::libs::error::{AnyResult, ErrorKind, MulticloudError};
use crate::libs::utils::TimeLogger;

/// How a `load`/`search` call ended for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The response replaced the listing; holds the entry count.
    Applied(usize),
    /// A newer request was issued meanwhile, the response was dropped.
    Discarded,
    /// Nothing to load (no active key).
    Idle,
}

/// What the view reads. Only `load`/`search`/`clear` replace `entries`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "cloud.ts")]
pub struct ListingSnapshot {
    /// Key the entries belong to.
    pub key: Option<ListingKey>,
    /// Last key asked for, possibly still in flight.
    pub requested_key: Option<ListingKey>,
    pub entries: Vec<FileEntry>,
    pub selection: Vec<FileId>,
    pub loading: bool,
    pub error: Option<String>,
}

impl ListingSnapshot {
    pub fn find(&self, id: FileId) -> Option<&FileEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }
}

/// A fetch that has its sequence number but no response yet.
#[derive(Debug)]
pub(crate) struct PendingLoad {
    seq: u64,
    key: ListingKey,
}

#[derive(Default)]
struct ListingState {
    /// Highest sequence number handed out so far.
    issued: u64,
    requested: Option<ListingKey>,
    displayed: Option<ListingKey>,
    last_folder: Option<ListingKey>,
    entries: Vec<FileEntry>,
    selection: BTreeSet<FileId>,
    loading: bool,
    error: Option<String>,
}

impl ListingState {
    fn snapshot(&self) -> ListingSnapshot {
        ListingSnapshot {
            key: self.displayed.clone(),
            requested_key: self.requested.clone(),
            entries: self.entries.clone(),
            selection: self.selection.iter().copied().collect(),
            loading: self.loading,
            error: self.error.clone(),
        }
    }

    fn retain_selection(&mut self) {
        let entries = &self.entries;
        self.selection
            .retain(|id| entries.iter().any(|entry| entry.id == *id));
    }
}

/**
 * Holds the one listing the view shows, for a folder or a search.
 *
 * Every fetch is tagged with a sequence number and its response only lands
 * if no newer fetch was issued in the meantime. Failed fetches keep the
 * previous entries and only set the error indicator.
 */
#[derive(Clone)]
pub struct FileListingCache {
    api: Arc<dyn CloudApi>,
    state: Arc<Mutex<ListingState>>,
    snapshots: Arc<watch::Sender<ListingSnapshot>>,
}

impl FileListingCache {
    pub fn new(api: Arc<dyn CloudApi>) -> Self {
        let (snapshots, _) = watch::channel(ListingSnapshot::default());
        Self {
            api,
            state: Arc::new(Mutex::new(ListingState::default())),
            snapshots: Arc::new(snapshots),
        }
    }

    fn publish(&self, state: &ListingState) {
        self.snapshots.send_replace(state.snapshot());
    }

    pub async fn load(&self, key: ListingKey) -> AnyResult<LoadOutcome> {
        let request = self.issue(key, false).await;
        self.settle(request).await
    }

    /**
     * Hand out the next sequence number for `key`. Split from `settle` so
     * a caller can order the issue against its own state changes.
     */
    pub(crate) async fn issue(&self, key: ListingKey, fresh: bool) -> PendingLoad {
        let mut state = self.state.lock().await;
        self.issue_locked(&mut state, key, fresh)
    }

    /**
     * Choose a key from the active one and issue it in the same critical
     * section, so a navigation cannot land between the choice and the
     * sequence number.
     */
    pub(crate) async fn issue_from_active(
        &self,
        pick: impl FnOnce(Option<&ListingKey>) -> Option<ListingKey>,
    ) -> Option<PendingLoad> {
        let mut state = self.state.lock().await;
        let key = pick(state.requested.as_ref())?;
        Some(self.issue_locked(&mut state, key, false))
    }

    fn issue_locked(&self, state: &mut ListingState, key: ListingKey, fresh: bool) -> PendingLoad {
        if fresh {
            let issued = state.issued;
            *state = ListingState {
                issued,
                ..ListingState::default()
            };
        }
        state.issued += 1;
        state.requested = Some(key.clone());
        if !key.is_search() {
            state.last_folder = Some(key.clone());
        }
        state.loading = true;
        self.publish(state);

        PendingLoad {
            seq: state.issued,
            key,
        }
    }

    pub(crate) async fn settle(&self, request: PendingLoad) -> AnyResult<LoadOutcome> {
        let PendingLoad { seq, key } = request;
        let timer = TimeLogger::new(format!("Listing #{} {:?}", seq, key));
        let result = match &key {
            ListingKey::Folder { account_id, path } => self.api.list_files(*account_id, path).await,
            ListingKey::Search { query } => self.api.search(query).await,
        };

        let mut state = self.state.lock().await;
        if seq != state.issued {
            debug!(
                "Discarding stale listing #{} for {:?} (latest is #{})",
                seq, key, state.issued
            );
            return Ok(LoadOutcome::Discarded);
        }

        state.loading = false;
        match result {
            Ok(entries) => {
                timer.complete();
                let count = entries.len();
                state.entries = entries;
                state.displayed = Some(key);
                state.error = None;
                state.retain_selection();
                self.publish(&state);
                Ok(LoadOutcome::Applied(count))
            }
            Err(e) => {
                if e.kind() == ErrorKind::Transport {
                    warn!("Listing {:?} unreachable, keeping last entries", key);
                } else {
                    warn!("Listing {:?} failed: {}", key, e);
                }
                state.error = Some(e.to_string());
                self.publish(&state);
                Err(e)
            }
        }
    }

    /// An empty query goes back to the last folder that was loaded.
    pub async fn search(&self, query: &str) -> AnyResult<LoadOutcome> {
        let query = query.trim();
        if !query.is_empty() {
            return self.load(ListingKey::search(query)).await;
        }

        let request = {
            let mut state = self.state.lock().await;
            match state.last_folder.clone() {
                Some(key) => self.issue_locked(&mut state, key, false),
                None => return Ok(LoadOutcome::Idle),
            }
        };
        self.settle(request).await
    }

    /// Refetch whatever key was last requested.
    pub async fn reload(&self) -> AnyResult<LoadOutcome> {
        match self.issue_from_active(|active| active.cloned()).await {
            Some(request) => self.settle(request).await,
            None => Ok(LoadOutcome::Idle),
        }
    }

    /// Empty the listing. In-flight responses become stale.
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        let issued = state.issued + 1;
        *state = ListingState {
            issued,
            ..ListingState::default()
        };
        self.publish(&state);
    }

    pub async fn active_key(&self) -> Option<ListingKey> {
        self.state.lock().await.requested.clone()
    }

    // Selection

    /// Returns whether the id ended up selected. Ids outside the listing are rejected.
    pub async fn toggle_select(&self, id: FileId) -> AnyResult<bool> {
        let mut state = self.state.lock().await;
        if !state.entries.iter().any(|entry| entry.id == id) {
            return Err(MulticloudError::validation(format!(
                "File {} is not in the current listing",
                id
            )));
        }

        let selected = if state.selection.remove(&id) {
            false
        } else {
            state.selection.insert(id)
        };
        self.publish(&state);
        Ok(selected)
    }

    pub async fn select_all(&self) {
        let mut state = self.state.lock().await;
        state.selection = state.entries.iter().map(|entry| entry.id).collect();
        self.publish(&state);
    }

    pub async fn clear_selection(&self) {
        let mut state = self.state.lock().await;
        state.selection.clear();
        self.publish(&state);
    }

    pub async fn selected_ids(&self) -> Vec<FileId> {
        self.state.lock().await.selection.iter().copied().collect()
    }

    pub fn snapshot(&self) -> ListingSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ListingSnapshot> {
        self.snapshots.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::testing::{file, ids, MockCloudApi};

    #[tokio::test]
    async fn navigation_queued_behind_a_reload_still_wins() {
        let api = MockCloudApi::new();
        api.with_files(1, "", vec![file(11, "a.txt")])
            .with_files(1, "Docs", vec![file(12, "b.txt")]);
        let cache = FileListingCache::new(api.clone());
        cache.load(ListingKey::root(1)).await.unwrap();

        // both tasks queue on the state lock, reload first
        let guard = cache.state.lock().await;
        let reload = tokio::spawn({
            let cache = cache.clone();
            async move { cache.reload().await }
        });
        tokio::task::yield_now().await;
        let navigate = tokio::spawn({
            let cache = cache.clone();
            async move { cache.load(ListingKey::folder(1, "Docs")).await }
        });
        tokio::task::yield_now().await;
        drop(guard);

        assert_eq!(reload.await.unwrap().unwrap(), LoadOutcome::Discarded);
        assert_eq!(navigate.await.unwrap().unwrap(), LoadOutcome::Applied(1));
        let snapshot = cache.snapshot();
        assert_eq!(snapshot.key, Some(ListingKey::folder(1, "Docs")));
        assert_eq!(ids(&snapshot.entries), vec![12]);
    }
}
