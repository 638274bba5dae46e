mod account;
mod file_entry;
mod listing_key;
mod operation;
mod preview;
mod storage;
mod upload;

pub use account::*;
pub use file_entry::*;
pub use listing_key::*;
pub use operation::*;
pub use preview::*;
pub use storage::*;
pub use upload::*;
