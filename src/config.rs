use std::env;
use std::io;
use std::path::PathBuf;

use crate::errors::ConfigError;

pub const DEFAULT_ADMIN_PASSWORD: &str = "123456";
pub const MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;
const SONGS_FILE: &str = "songs.json";

/// Runtime settings, read once at startup and handed to the store and the
/// HTTP layer.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub admin_password: String,
    pub data_dir: PathBuf,
    pub uploads_dir: PathBuf,
    pub static_dir: PathBuf,
    pub max_upload_bytes: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup. Unset or empty keys fall back to
    /// the local defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, fallback: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| fallback.to_string())
        };

        let port = get("PORT", "3000");
        let port = port
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidNumber { key: "PORT", value: port.clone() })?;

        let max_upload = get("MAX_UPLOAD_BYTES", &MAX_UPLOAD_BYTES.to_string());
        let max_upload_bytes = max_upload.parse::<u64>().map_err(|_| ConfigError::InvalidNumber {
            key: "MAX_UPLOAD_BYTES",
            value: max_upload.clone(),
        })?;

        Ok(Config {
            host: get("HOST", "0.0.0.0"),
            port,
            admin_password: get("ADMIN_PASSWORD", DEFAULT_ADMIN_PASSWORD),
            data_dir: PathBuf::from(get("DATA_DIR", "data")),
            uploads_dir: PathBuf::from(get("UPLOADS_DIR", "uploads")),
            static_dir: PathBuf::from(get("STATIC_DIR", "public")),
            max_upload_bytes,
        })
    }

    /// Location of the songs document.
    pub fn songs_file(&self) -> PathBuf {
        self.data_dir.join(SONGS_FILE)
    }

    pub fn uses_default_password(&self) -> bool {
        self.admin_password == DEFAULT_ADMIN_PASSWORD
    }

    /// Creates the data and uploads directories if they are missing.
    pub fn ensure_dirs(&self) -> io::Result<()> {
        crate::utils::create_folder(&self.data_dir)?;
        crate::utils::create_folder(&self.uploads_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.admin_password, DEFAULT_ADMIN_PASSWORD);
        assert!(config.uses_default_password());
        assert_eq!(config.songs_file(), PathBuf::from("data").join("songs.json"));
        assert_eq!(config.uploads_dir, PathBuf::from("uploads"));
        assert_eq!(config.max_upload_bytes, MAX_UPLOAD_BYTES);
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "8081"),
            ("ADMIN_PASSWORD", "hunter2"),
            ("DATA_DIR", "/srv/music/data"),
            ("UPLOADS_DIR", "/srv/music/uploads"),
            ("MAX_UPLOAD_BYTES", "1024"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8081);
        assert_eq!(config.admin_password, "hunter2");
        assert!(!config.uses_default_password());
        assert_eq!(config.songs_file(), PathBuf::from("/srv/music/data/songs.json"));
        assert_eq!(config.uploads_dir, PathBuf::from("/srv/music/uploads"));
        assert_eq!(config.max_upload_bytes, 1024);
    }

    #[test]
    fn empty_values_count_as_unset() {
        let config = Config::from_lookup(lookup(&[("ADMIN_PASSWORD", "")])).unwrap();
        assert_eq!(config.admin_password, DEFAULT_ADMIN_PASSWORD);
    }

    #[test]
    fn bad_port_is_rejected() {
        let err = Config::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { key: "PORT", .. }));
    }
}
