use crate::errors::StoreError;
use crate::models::Song;

/// Persistence for the whole song collection.
///
/// Implementations read and write the collection as a unit; callers do a
/// read-modify-write around every mutation.
pub trait SongStore: Send + Sync {
    /// Returns every song in insertion order, creating an empty collection
    /// if none exists yet.
    fn load_all(&self) -> Result<Vec<Song>, StoreError>;

    /// Replaces the stored collection with `songs`.
    fn save_all(&self, songs: &[Song]) -> Result<(), StoreError>;
}

pub fn find_by_id(songs: &[Song], id: i64) -> Option<&Song> {
    songs.iter().find(|s| s.id == id)
}

pub fn position_by_id(songs: &[Song], id: i64) -> Option<usize> {
    songs.iter().position(|s| s.id == id)
}

/// Id for a song created at `now_ms`. Ids are creation timestamps; when one
/// is already taken the next free integer is used.
pub fn next_song_id(songs: &[Song], now_ms: i64) -> i64 {
    let mut id = now_ms;
    while find_by_id(songs, id).is_some() {
        id += 1;
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(id: i64) -> Song {
        Song::new(id, format!("t{}", id), "a".into(), format!("/uploads/{}.mp3", id), None)
    }

    #[test]
    fn lookups_scan_in_order() {
        let songs = vec![song(5), song(2), song(9)];
        assert_eq!(find_by_id(&songs, 2).map(|s| s.title.as_str()), Some("t2"));
        assert_eq!(position_by_id(&songs, 9), Some(2));
        assert!(find_by_id(&songs, 3).is_none());
        assert!(position_by_id(&songs, 3).is_none());
    }

    #[test]
    fn colliding_timestamps_get_the_next_free_id() {
        let songs = vec![song(100), song(101)];
        assert_eq!(next_song_id(&songs, 100), 102);
        assert_eq!(next_song_id(&songs, 99), 99);
        assert_eq!(next_song_id(&[], 100), 100);
    }
}
