use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_COVER_URL: &str = "/default-cover.png";

fn default_cover_url() -> String {
    DEFAULT_COVER_URL.to_string()
}

/// Hand-edited documents sometimes carry `null` where a value is expected.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_placeholder<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_cover_url))
}

/// A song record as stored in the songs document.
///
/// Keys the server does not know about are kept in `extra` so a
/// read-modify-write cycle never drops them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub id: i64,
    pub title: String,
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default = "default_cover_url", deserialize_with = "null_as_placeholder")]
    pub cover_url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub play_count: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Song {
    pub fn new(id: i64, title: String, artist: String, audio_url: String, cover_url: Option<String>) -> Self {
        Song {
            id,
            title,
            artist,
            audio_url: Some(audio_url),
            cover_url: cover_url.unwrap_or_else(default_cover_url),
            play_count: 0,
            extra: Map::new(),
        }
    }

    /// Registers one play and returns the new count.
    pub fn record_play(&mut self) -> u64 {
        self.play_count = self.play_count.saturating_add(1);
        self.play_count
    }
}

/// The fields exposed by the unauthenticated song listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicSong {
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub cover_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    pub play_count: u64,
}

impl From<&Song> for PublicSong {
    fn from(song: &Song) -> Self {
        PublicSong {
            id: song.id,
            title: song.title.clone(),
            artist: song.artist.clone(),
            cover_url: song.cover_url.clone(),
            audio_url: song.audio_url.clone(),
            play_count: song.play_count,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayCount {
    pub play_count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Deleted {
    pub success: bool,
}

/// Text fields accepted by the metadata-only JSON edit.
#[derive(Debug, Default, Deserialize)]
pub struct SongFields {
    pub title: Option<String>,
    pub artist: Option<String>,
}
