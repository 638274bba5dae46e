use log::{debug, info, warn};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use ts_rs::TS;

use crate::cloud::api::CloudApi;
use crate::cloud::listing::{FileListingCache, LoadOutcome};
use crate::cloud::models::{Account, AccountId, ListingKey};
use crate::libs::error::{AnyResult, MulticloudError};
use crate::notifications::NotificationBroker;

#[derive(Debug, Clone, Default, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "cloud.ts")]
pub struct AccountsSnapshot {
    pub accounts: Vec<Account>,
    pub selected: Option<AccountId>,
    pub loading: bool,
    /// Set when the last refresh failed; `accounts` is then the previous list.
    pub error: Option<String>,
}

impl AccountsSnapshot {
    pub fn selected_account(&self) -> Option<&Account> {
        let selected = self.selected?;
        self.accounts.iter().find(|account| account.id == selected)
    }
}

/**
 * Connected accounts and the one the user is browsing. Selecting an
 * account resets the listing to that account's root.
 */
#[derive(Clone)]
pub struct AccountRegistry {
    api: Arc<dyn CloudApi>,
    listing: FileListingCache,
    broker: NotificationBroker,
    auto_select_first: bool,
    state: Arc<Mutex<AccountsSnapshot>>,
    /// Latest account-list request; older answers are dropped.
    refreshes: Arc<AtomicU64>,
    snapshots: Arc<watch::Sender<AccountsSnapshot>>,
}

impl AccountRegistry {
    pub fn new(
        api: Arc<dyn CloudApi>,
        listing: FileListingCache,
        broker: NotificationBroker,
        auto_select_first: bool,
    ) -> Self {
        let (snapshots, _) = watch::channel(AccountsSnapshot::default());
        Self {
            api,
            listing,
            broker,
            auto_select_first,
            state: Arc::new(Mutex::new(AccountsSnapshot::default())),
            refreshes: Arc::new(AtomicU64::new(0)),
            snapshots: Arc::new(snapshots),
        }
    }

    fn publish(&self, state: &AccountsSnapshot) {
        self.snapshots.send_replace(state.clone());
    }

    /**
     * Fetch and replace. On failure the previous list stays and `error` is
     * set. An answer overtaken by a newer request or a disconnect is dropped
     * and the current list is returned instead.
     */
    pub async fn list_accounts(&self) -> AnyResult<Vec<Account>> {
        let seq = {
            let mut state = self.state.lock().await;
            state.loading = true;
            self.publish(&state);
            self.refreshes.fetch_add(1, Ordering::SeqCst) + 1
        };

        let result = self.api.list_accounts().await;

        let mut state = self.state.lock().await;
        let latest = self.refreshes.load(Ordering::SeqCst);
        if seq != latest {
            debug!("Discarding stale account list #{} (latest is #{})", seq, latest);
            return Ok(state.accounts.clone());
        }

        state.loading = false;
        match result {
            Ok(accounts) => {
                info!("{} cloud accounts connected", accounts.len());
                state.accounts = accounts.clone();
                state.error = None;

                let selected_gone = state
                    .selected
                    .is_some_and(|id| !accounts.iter().any(|account| account.id == id));
                if selected_gone {
                    warn!("Selected account {:?} is no longer connected", state.selected);
                    state.selected = None;
                    self.listing.clear().await;
                }
                self.publish(&state);
                Ok(accounts)
            }
            Err(e) => {
                warn!("Could not refresh accounts, keeping the previous list: {}", e);
                state.error = Some(e.to_string());
                self.publish(&state);
                Err(e)
            }
        }
    }

    /// First fetch of a session. Picks the first account when configured to
    /// and nothing is selected yet.
    pub async fn initialize(&self) -> AnyResult<Option<AccountId>> {
        let accounts = self.list_accounts().await?;

        if !self.auto_select_first || self.selected().await.is_some() {
            return Ok(self.selected().await);
        }
        match accounts.first() {
            Some(first) => {
                self.select_account(Some(first.id)).await?;
                Ok(Some(first.id))
            }
            None => Ok(None),
        }
    }

    pub async fn select_account(&self, account_id: Option<AccountId>) -> AnyResult<LoadOutcome> {
        // listing requests are issued under the registry lock, in selection order
        let request = {
            let mut state = self.state.lock().await;
            if let Some(id) = account_id {
                if !state.accounts.iter().any(|account| account.id == id) {
                    return Err(MulticloudError::validation(format!(
                        "Account {} is not connected",
                        id
                    )));
                }
            }
            state.selected = account_id;
            self.publish(&state);

            match account_id {
                Some(id) => Some(self.listing.issue(ListingKey::root(id), true).await),
                None => {
                    self.listing.clear().await;
                    None
                }
            }
        };

        match request {
            Some(request) => {
                info!("Browsing account {:?}", account_id);
                self.listing.settle(request).await
            }
            None => Ok(LoadOutcome::Idle),
        }
    }

    /// Load `path` of the selected account.
    pub async fn browse(&self, path: &str) -> AnyResult<LoadOutcome> {
        let request = {
            let state = self.state.lock().await;
            let account_id = state
                .selected
                .ok_or_else(|| MulticloudError::validation("No account selected"))?;
            self.listing
                .issue(ListingKey::folder(account_id, path), false)
                .await
        };
        self.listing.settle(request).await
    }

    /**
     * Remote disconnect, then refresh. When the disconnected account was
     * the selected one, nothing is selected afterwards and the listing is
     * emptied; no other account is picked in its place.
     */
    pub async fn disconnect_account(&self, account_id: AccountId) -> AnyResult<()> {
        if let Err(e) = self.api.disconnect_account(account_id).await {
            self.broker.error(format!("Failed to disconnect account: {}", e));
            return Err(e);
        }

        {
            let mut state = self.state.lock().await;
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            state.loading = false;
            state.accounts.retain(|account| account.id != account_id);
            if state.selected == Some(account_id) {
                state.selected = None;
                self.listing.clear().await;
            }
            self.publish(&state);
        }

        if let Err(e) = self.list_accounts().await {
            warn!("Account {} disconnected but the refresh failed: {}", account_id, e);
        }

        info!("Disconnected account {}", account_id);
        self.broker.success("Account disconnected successfully.");
        Ok(())
    }

    pub async fn selected(&self) -> Option<AccountId> {
        self.state.lock().await.selected
    }

    pub async fn selected_account(&self) -> Option<Account> {
        self.state.lock().await.selected_account().cloned()
    }

    pub async fn get(&self, account_id: AccountId) -> Option<Account> {
        self.state
            .lock()
            .await
            .accounts
            .iter()
            .find(|account| account.id == account_id)
            .cloned()
    }

    pub fn snapshot(&self) -> AccountsSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AccountsSnapshot> {
        self.snapshots.subscribe()
    }
}
