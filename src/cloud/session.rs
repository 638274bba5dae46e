use log::info;
use reqwest::Url;
use serde::Serialize;
use std::sync::Arc;
use ts_rs::TS;

use crate::cloud::accounts::AccountRegistry;
use crate::cloud::api::{CloudApi, HttpCloudApi};
use crate::cloud::coordinator::OperationCoordinator;
use crate::cloud::listing::{FileListingCache, LoadOutcome};
use crate::cloud::models::{ListingKey, ProviderKind};
use crate::libs::config::ClientConfig;
use crate::libs::error::{AnyResult, MulticloudError};
use crate::libs::utils::{normalize_path, parent_path, path_segments};
use crate::notifications::NotificationBroker;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export, export_to = "cloud.ts")]
pub struct Breadcrumb {
    pub name: String,
    pub path: String,
}

/**
 * The explicit store behind the view: one of each component, wired to the
 * same remote API and broker. Cloning is cheap and shares state.
 */
#[derive(Clone)]
pub struct CloudSession {
    config: ClientConfig,
    api: Arc<dyn CloudApi>,
    broker: NotificationBroker,
    listing: FileListingCache,
    accounts: AccountRegistry,
    coordinator: OperationCoordinator,
}

impl CloudSession {
    pub fn new(config: ClientConfig, api: Arc<dyn CloudApi>) -> Self {
        let broker = NotificationBroker::new(&config);
        let listing = FileListingCache::new(api.clone());
        let accounts = AccountRegistry::new(
            api.clone(),
            listing.clone(),
            broker.clone(),
            config.auto_select_first_account,
        );
        let coordinator = OperationCoordinator::new(
            api.clone(),
            listing.clone(),
            accounts.clone(),
            broker.clone(),
            &config,
        );

        Self {
            config,
            api,
            broker,
            listing,
            accounts,
            coordinator,
        }
    }

    /// Session over the HTTP backend named in `config`.
    pub fn connect(config: ClientConfig) -> AnyResult<Self> {
        let api = HttpCloudApi::new(&config)?;
        info!("Using backend at {}", config.api_base_url);
        Ok(Self::new(config, Arc::new(api)))
    }

    pub async fn initialize(&self) -> AnyResult<()> {
        self.accounts.initialize().await?;
        Ok(())
    }

    // Navigation

    pub async fn navigate(&self, path: &str) -> AnyResult<LoadOutcome> {
        self.accounts.browse(&normalize_path(path)).await
    }

    pub async fn navigate_up(&self) -> AnyResult<LoadOutcome> {
        match self.current_path().await {
            Some(path) if !path.is_empty() => self.navigate(&parent_path(&path)).await,
            _ => Ok(LoadOutcome::Idle),
        }
    }

    pub async fn search(&self, query: &str) -> AnyResult<LoadOutcome> {
        self.listing.search(query).await
    }

    /// Folder path being browsed; `None` for searches or when nothing is open.
    pub async fn current_path(&self) -> Option<String> {
        self.listing
            .active_key()
            .await
            .and_then(|key| key.path().map(str::to_string))
    }

    pub async fn breadcrumbs(&self) -> Vec<Breadcrumb> {
        let Some(path) = self.current_path().await else {
            return vec![];
        };

        let mut crumbs = vec![Breadcrumb {
            name: "Root".into(),
            path: String::new(),
        }];
        let segments = path_segments(&path);
        for (index, segment) in segments.iter().enumerate() {
            crumbs.push(Breadcrumb {
                name: segment.to_string(),
                path: segments[..=index].join("/"),
            });
        }
        crumbs
    }

    /**
     * Where the browser goes to connect a new account. The OAuth round trip
     * itself happens outside this crate.
     */
    pub fn connect_url(&self, provider: ProviderKind, username: Option<&str>) -> AnyResult<Url> {
        let base = format!(
            "{}/oauth2/authorize/{}",
            self.config.backend_root(),
            provider.oauth_slug()
        );
        let url = match username {
            Some(username) => Url::parse_with_params(&base, &[("username", username)]),
            None => Url::parse(&base),
        };
        url.map_err(|e| MulticloudError::Config(format!("Invalid backend URL: {}", e)))
    }

    pub fn is_listing(&self, key: &ListingKey) -> bool {
        self.listing.snapshot().key.as_ref() == Some(key)
    }

    // Components

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn api(&self) -> &Arc<dyn CloudApi> {
        &self.api
    }

    pub fn broker(&self) -> &NotificationBroker {
        &self.broker
    }

    pub fn listing(&self) -> &FileListingCache {
        &self.listing
    }

    pub fn accounts(&self) -> &AccountRegistry {
        &self.accounts
    }

    pub fn operations(&self) -> &OperationCoordinator {
        &self.coordinator
    }
}
