// Remote API defaults

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

// User-facing fallbacks when the server gives no usable reason
pub const GENERIC_ERROR_MESSAGE: &str = "An unexpected error occurred";
pub const TRANSPORT_ERROR_MESSAGE: &str = "No response from server. Please check your connection.";

// Failure payload fields, probed in this order
pub const ERROR_REASON_FIELDS: [&str; 3] = ["message", "error", "details"];

// Notification surfaces
pub const DEFAULT_NOTIFICATION_DURATION_MS: u64 = 4000;
pub const DEFAULT_PROGRESS_AUTO_DISMISS_MS: u64 = 1500;
pub const DEFAULT_TICKET_LINGER_MS: u64 = 4000;

// Uploads
pub const MULTIPLE_UPLOAD_PROGRESS_KEY: &str = "multiple";
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024; // 100MB
pub const DEFAULT_UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

// Downloads
pub const DEFAULT_DOWNLOAD_NAME: &str = "download";

// Config
pub const CONFIG_DIR_NAME: &str = "multicloud";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const ENV_API_URL: &str = "MULTICLOUD_API_URL";
pub const ENV_TOKEN: &str = "MULTICLOUD_TOKEN";
