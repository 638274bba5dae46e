pub mod accounts;
pub mod api;
pub mod coordinator;
pub mod listing;
pub mod models;
pub mod session;
mod upload;

#[cfg(test)]
pub(crate) mod testing;

#[cfg(test)]
mod accounts_test;

pub use accounts::*;
pub use api::{CloudApi, DownloadedFile, HttpCloudApi, ProgressFn};
pub use coordinator::{OperationCoordinator, RenameOutcome};
pub use listing::*;
pub use session::*;
