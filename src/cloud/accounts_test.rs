use std::sync::Arc;

use super::accounts::AccountRegistry;
use super::listing::{FileListingCache, LoadOutcome};
use super::models::{AccountId, ListingKey, ProviderKind};
use super::testing::{account, file, ids, MockCloudApi};
use crate::libs::config::ClientConfig;
use crate::notifications::{NotificationBroker, NotificationKind};

struct Fixture {
    api: Arc<MockCloudApi>,
    listing: FileListingCache,
    broker: NotificationBroker,
    registry: AccountRegistry,
}

fn fixture(auto_select_first: bool) -> Fixture {
    let api = MockCloudApi::new();
    api.with_account(account(1, ProviderKind::GoogleDrive, "ana@example.com"))
        .with_account(account(2, ProviderKind::Dropbox, "ana@work.example.com"))
        .with_files(1, "", vec![file(11, "f1.txt"), file(12, "f2.txt")])
        .with_files(2, "", vec![file(21, "g1.txt")]);

    let broker = NotificationBroker::new(&ClientConfig::default());
    let listing = FileListingCache::new(api.clone());
    let registry = AccountRegistry::new(
        api.clone(),
        listing.clone(),
        broker.clone(),
        auto_select_first,
    );
    Fixture {
        api,
        listing,
        broker,
        registry,
    }
}

#[tokio::test]
async fn initialize_selects_the_first_account() {
    let f = fixture(true);
    assert_eq!(f.registry.initialize().await.unwrap(), Some(1));

    let snapshot = f.registry.snapshot();
    assert_eq!(snapshot.accounts.len(), 2);
    assert_eq!(snapshot.selected, Some(1));
    assert_eq!(snapshot.selected_account().unwrap().account_email, "ana@example.com");
    assert_eq!(ids(&f.listing.snapshot().entries), vec![11, 12]);
}

#[tokio::test]
async fn initialize_respects_disabled_auto_select() {
    let f = fixture(false);
    assert_eq!(f.registry.initialize().await.unwrap(), None);
    assert_eq!(f.listing.snapshot().key, None);
}

#[tokio::test]
async fn failed_refresh_keeps_previous_accounts() {
    let f = fixture(false);
    f.registry.list_accounts().await.unwrap();

    f.api.fail_transport("list_accounts");
    assert!(f.registry.list_accounts().await.is_err());

    let snapshot = f.registry.snapshot();
    assert_eq!(snapshot.accounts.len(), 2);
    assert!(snapshot.error.is_some());
    assert!(!snapshot.loading);

    f.api.recover("list_accounts");
    f.registry.list_accounts().await.unwrap();
    assert_eq!(f.registry.snapshot().error, None);
}

#[tokio::test]
async fn selecting_resets_the_listing_to_the_account_root() {
    let f = fixture(false);
    f.registry.list_accounts().await.unwrap();
    f.registry.select_account(Some(1)).await.unwrap();
    f.listing.select_all().await;

    assert_eq!(f.registry.select_account(Some(2)).await.unwrap(), LoadOutcome::Applied(1));
    let snapshot = f.listing.snapshot();
    assert_eq!(snapshot.key, Some(ListingKey::root(2)));
    assert_eq!(ids(&snapshot.entries), vec![21]);
    assert!(snapshot.selection.is_empty());

    assert_eq!(f.registry.select_account(None).await.unwrap(), LoadOutcome::Idle);
    assert_eq!(f.listing.snapshot().key, None);
    assert!(f.listing.snapshot().entries.is_empty());
}

#[tokio::test]
async fn selecting_an_unknown_account_is_rejected() {
    let f = fixture(false);
    f.registry.list_accounts().await.unwrap();
    assert!(f.registry.select_account(Some(9)).await.is_err());
    assert_eq!(f.registry.selected().await, None);
}

#[tokio::test]
async fn switching_accounts_beats_a_late_listing() {
    let f = fixture(false);
    f.registry.list_accounts().await.unwrap();
    let hold_a = f.api.hold_listing(1, "");

    let select_a = tokio::spawn({
        let registry = f.registry.clone();
        async move { registry.select_account(Some(1)).await }
    });
    hold_a.arrived.await.unwrap();

    f.registry.select_account(Some(2)).await.unwrap();
    hold_a.release.send(()).unwrap();
    assert_eq!(select_a.await.unwrap().unwrap(), LoadOutcome::Discarded);

    assert_eq!(f.registry.selected().await, Some(2));
    let snapshot = f.listing.snapshot();
    assert_eq!(snapshot.key, Some(ListingKey::root(2)));
    assert_eq!(ids(&snapshot.entries), vec![21]);
}

#[tokio::test]
async fn disconnecting_the_selected_account_empties_everything() {
    let f = fixture(true);
    f.registry.initialize().await.unwrap();
    f.listing.select_all().await;

    f.registry.disconnect_account(1).await.unwrap();

    let snapshot = f.registry.snapshot();
    assert_eq!(snapshot.selected, None);
    assert!(snapshot.accounts.iter().all(|account| account.id != 1));
    assert_eq!(snapshot.accounts.len(), 1);

    let listing = f.listing.snapshot();
    assert!(listing.entries.is_empty());
    assert!(listing.selection.is_empty());
    assert_eq!(listing.key, None);

    let toasts = f.broker.toasts().visible();
    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts[0].kind, NotificationKind::Success);
}

#[tokio::test]
async fn disconnecting_another_account_keeps_the_selection() {
    let f = fixture(true);
    f.registry.initialize().await.unwrap();

    f.registry.disconnect_account(2).await.unwrap();
    assert_eq!(f.registry.selected().await, Some(1));
    assert_eq!(ids(&f.listing.snapshot().entries), vec![11, 12]);
}

#[tokio::test]
async fn failed_disconnect_changes_nothing() {
    let f = fixture(true);
    f.registry.initialize().await.unwrap();
    f.api.fail("disconnect_account", "Account is syncing");

    let error = f.registry.disconnect_account(1).await.unwrap_err();
    assert_eq!(error.to_string(), "Account is syncing");
    assert_eq!(f.registry.selected().await, Some(1));
    assert_eq!(f.registry.snapshot().accounts.len(), 2);

    let toasts = f.broker.toasts().visible();
    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts[0].kind, NotificationKind::Error);
    assert_eq!(toasts[0].message, "Failed to disconnect account: Account is syncing");
}

#[tokio::test]
async fn browse_requires_a_selection() {
    let f = fixture(false);
    f.registry.list_accounts().await.unwrap();
    assert!(f.registry.browse("Documents").await.is_err());

    f.registry.select_account(Some(1)).await.unwrap();
    f.api.with_files(1, "Documents", vec![file(15, "cv.pdf")]);
    f.registry.browse("Documents").await.unwrap();
    assert_eq!(f.listing.snapshot().key, Some(ListingKey::folder(1, "Documents")));
}

fn account_ids(registry: &AccountRegistry) -> Vec<AccountId> {
    registry.snapshot().accounts.iter().map(|account| account.id).collect()
}

#[tokio::test]
async fn late_account_list_cannot_revive_a_disconnected_account() {
    let f = fixture(true);
    f.registry.initialize().await.unwrap();

    let hold = f.api.hold("list_accounts");
    let refresh = tokio::spawn({
        let registry = f.registry.clone();
        async move { registry.list_accounts().await }
    });
    hold.arrived.await.unwrap();

    f.registry.disconnect_account(1).await.unwrap();
    assert_eq!(account_ids(&f.registry), vec![2]);

    hold.release.send(()).unwrap();
    let returned = refresh.await.unwrap().unwrap();
    assert!(returned.iter().all(|account| account.id != 1));

    assert_eq!(account_ids(&f.registry), vec![2]);
    assert!(!f.registry.snapshot().loading);
    assert!(f.registry.select_account(Some(1)).await.is_err());
}
