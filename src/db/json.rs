use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::db::client::SongStore;
use crate::errors::StoreError;
use crate::models::Song;

/// Stores the song collection as one pretty-printed JSON array.
pub struct JsonSongStore {
    path: PathBuf,
}

impl JsonSongStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonSongStore { path: path.into() }
    }

    fn io_err(&self, source: io::Error) -> StoreError {
        StoreError::Io { path: self.path.display().to_string(), source }
    }

    fn json_err(&self, source: serde_json::Error) -> StoreError {
        StoreError::Json { path: self.path.display().to_string(), source }
    }

    /// Writes through a temp file in the same directory, then renames it over
    /// the document so readers never see a half-written file.
    fn write_document(&self, contents: &[u8]) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| self.io_err(e))?;
        tmp.write_all(contents).map_err(|e| self.io_err(e))?;
        tmp.as_file().sync_all().map_err(|e| self.io_err(e))?;
        tmp.persist(&self.path).map_err(|e| self.io_err(e.error))?;
        Ok(())
    }
}

impl SongStore for JsonSongStore {
    fn load_all(&self) -> Result<Vec<Song>, StoreError> {
        match fs::read(&self.path) {
            Ok(data) => serde_json::from_slice(&data).map_err(|e| self.json_err(e)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.write_document(b"[]")?;
                Ok(Vec::new())
            }
            Err(e) => Err(self.io_err(e)),
        }
    }

    fn save_all(&self, songs: &[Song]) -> Result<(), StoreError> {
        let data = serde_json::to_vec_pretty(songs).map_err(|e| self.json_err(e))?;
        self.write_document(&data)
    }
}
