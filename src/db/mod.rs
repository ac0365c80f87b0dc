mod client;
pub use client::*;
mod json;
pub use json::*;

use std::sync::Arc;

use crate::config::Config;

/// Opens the song store described by `config`.
pub fn new_song_store(config: &Config) -> Arc<dyn SongStore> {
    Arc::new(JsonSongStore::new(config.songs_file()))
}
