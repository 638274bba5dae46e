/**
 * Small utility to display time metrics with a log message
 */
use log::info;
use std::borrow::Cow;
use std::time::Instant;

/**
 * Small helper to compute the execution time of some code
 */
pub struct TimeLogger {
    start_time: Instant,
    message: String,
}

impl TimeLogger {
    pub fn new(message: String) -> Self {
        TimeLogger {
            start_time: Instant::now(),
            message,
        }
    }

    pub fn complete(&self) {
        let duration = self.start_time.elapsed();
        info!("{} in {:.2?}", self.message, duration);
    }
}

/**
 * Pull the file name out of a Content-Disposition header value. Handles the
 * quoted, bare and RFC 5987 (`filename*=UTF-8''...`) forms.
 */
pub fn filename_from_content_disposition(header: &str) -> Option<String> {
    header
        .split(';')
        .map(str::trim)
        .filter_map(|param| param.split_once('='))
        .find(|(key, _)| key.trim().to_ascii_lowercase().starts_with("filename"))
        .map(|(key, value)| {
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
            if key.trim().ends_with('*') {
                let encoded = value.rsplit("''").next().unwrap_or(value);
                urlencoding::decode(encoded)
                    .map(Cow::into_owned)
                    .unwrap_or_else(|_| encoded.to_string())
            } else {
                value.to_string()
            }
        })
        .filter(|name| !name.is_empty())
}

/**
 * Human readable size, e.g. `1.5 MB`
 */
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    let rounded = (size * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}

/**
 * Path segments for breadcrumbs, ignoring empty parts
 */
pub fn path_segments(path: &str) -> Vec<&str> {
    path.split('/')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect()
}

/**
 * Canonical listing path: `"/Docs//2024/"` becomes `"Docs/2024"`
 */
pub fn normalize_path(path: &str) -> String {
    path_segments(path).join("/")
}

/**
 * The parent of a listing path, the root being `""`
 */
pub fn parent_path(path: &str) -> String {
    let segments = path_segments(path);
    match segments.split_last() {
        Some((_, parents)) => parents.join("/"),
        None => String::new(),
    }
}
