use std::path::Path;

use chrono::Utc;
use rand::Rng;

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// 128 random bits as lowercase hex.
pub fn generate_unique_id() -> String {
    let mut rng = rand::rng();
    format!("{:032x}", rng.random::<u128>())
}

/// Name for a newly stored upload: `<millis>-<random>` plus the extension of
/// the client's original file name, if it had one.
pub fn generate_upload_name(original_name: Option<&str>) -> String {
    let ext = original_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default();
    format!("{}-{}{}", now_millis(), generate_unique_id(), ext)
}
