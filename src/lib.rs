//! State coordination for browsing and managing files spread over several
//! connected cloud-storage accounts, through a single remote API.

pub mod cloud;
pub mod libs;
pub mod notifications;

pub use cloud::{
    AccountRegistry, CloudApi, CloudSession, FileListingCache, HttpCloudApi, LoadOutcome,
    OperationCoordinator,
};
pub use libs::config::ClientConfig;
pub use libs::error::{AnyResult, ErrorKind, MulticloudError};
pub use notifications::NotificationBroker;

/**
 * Install the logger. Respects RUST_LOG, defaults to `info`. Calling it more
 * than once is harmless.
 */
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}
