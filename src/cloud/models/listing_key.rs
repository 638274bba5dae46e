use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::account::AccountId;

/// What a listing shows: one folder of one account, or an ad-hoc search.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "cloud.ts")]
pub enum ListingKey {
    Folder {
        account_id: AccountId,
        path: String,
    },
    Search {
        query: String,
    },
}

impl ListingKey {
    pub fn folder(account_id: AccountId, path: impl Into<String>) -> Self {
        ListingKey::Folder {
            account_id,
            path: path.into(),
        }
    }

    pub fn root(account_id: AccountId) -> Self {
        Self::folder(account_id, "")
    }

    pub fn search(query: impl Into<String>) -> Self {
        ListingKey::Search {
            query: query.into(),
        }
    }

    pub fn account_id(&self) -> Option<AccountId> {
        match self {
            ListingKey::Folder { account_id, .. } => Some(*account_id),
            ListingKey::Search { .. } => None,
        }
    }

    pub fn path(&self) -> Option<&str> {
        match self {
            ListingKey::Folder { path, .. } => Some(path),
            ListingKey::Search { .. } => None,
        }
    }

    pub fn is_search(&self) -> bool {
        matches!(self, ListingKey::Search { .. })
    }
}
