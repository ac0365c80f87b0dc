use std::fs;
use std::io;
use std::path::Path;

/// URL prefix under which uploaded media is served.
pub const UPLOADS_URL_PREFIX: &str = "/uploads/";

/// Deletes the file at `file_path` if it exists.
pub fn delete_file(file_path: impl AsRef<Path>) -> io::Result<()> {
    match fs::remove_file(file_path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Creates a folder (and any necessary parent directories) at `folder_path`.
pub fn create_folder(folder_path: impl AsRef<Path>) -> io::Result<()> {
    fs::create_dir_all(folder_path)
}

/// Public URL for a stored upload.
pub fn upload_url(file_name: &str) -> String {
    format!("{}{}", UPLOADS_URL_PREFIX, file_name)
}

/// Inverse of [`upload_url`]; `None` for URLs that don't point into the
/// uploads directory, such as the placeholder cover.
pub fn upload_file_name(url: &str) -> Option<&str> {
    url.strip_prefix(UPLOADS_URL_PREFIX)
        .filter(|name| !name.is_empty() && !name.contains('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_urls_round_trip_to_file_names() {
        let url = upload_url("1700000000000-abc.mp3");
        assert_eq!(url, "/uploads/1700000000000-abc.mp3");
        assert_eq!(upload_file_name(&url), Some("1700000000000-abc.mp3"));
    }

    #[test]
    fn placeholder_cover_is_not_an_upload() {
        assert_eq!(upload_file_name("/default-cover.png"), None);
        assert_eq!(upload_file_name("/uploads/"), None);
        assert_eq!(upload_file_name("/uploads/../songs.json"), None);
    }

    #[test]
    fn deleting_a_missing_file_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        assert!(delete_file(dir.path().join("nope.mp3")).is_ok());
    }
}
