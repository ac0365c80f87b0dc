use std::collections::HashSet;
use std::path::PathBuf;

use colored::Colorize;
use slog::{Logger, info};
use walkdir::WalkDir;

use crate::config::Config;
use crate::db;
use crate::models::Song;
use crate::utils;

/// Prints every song with its play count.
pub fn list(config: &Config) -> anyhow::Result<()> {
    config.ensure_dirs()?;
    let store = db::new_song_store(config);
    let songs = store.load_all()?;

    if songs.is_empty() {
        println!("{}", "No songs yet.".yellow());
        return Ok(());
    }

    for song in &songs {
        println!(
            "{:>15}  {} {} {}  {}",
            song.id.to_string().dimmed(),
            song.title.bold(),
            "by".dimmed(),
            song.artist,
            format!("{} plays", song.play_count).green(),
        );
    }
    println!("\n{} songs", songs.len());
    Ok(())
}

/// Files in the uploads directory that no song points at.
pub fn orphaned_uploads(config: &Config, songs: &[Song]) -> Vec<PathBuf> {
    let referenced: HashSet<&str> = songs
        .iter()
        .flat_map(|s| s.audio_url.as_deref().into_iter().chain(Some(s.cover_url.as_str())))
        .filter_map(utils::upload_file_name)
        .collect();

    WalkDir::new(&config.uploads_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_none_or(|name| !referenced.contains(name))
        })
        .map(|entry| entry.into_path())
        .collect()
}

/// Deletes uploads left behind by edits and deletes. With `dry_run` the
/// files are only listed. Returns how many files were (or would be) removed.
pub fn prune(config: &Config, dry_run: bool, logger: &Logger) -> anyhow::Result<usize> {
    config.ensure_dirs()?;
    let store = db::new_song_store(config);
    let songs = store.load_all()?;
    let orphans = orphaned_uploads(config, &songs);

    for path in &orphans {
        if dry_run {
            println!("{} {}", "would remove".yellow(), path.display());
            continue;
        }
        utils::delete_file(path)?;
        info!(logger, "removed orphaned upload"; "path" => path.display().to_string());
        println!("{} {}", "removed".red(), path.display());
    }
    Ok(orphans.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn config_in(dir: &tempfile::TempDir) -> Config {
        let mut config = Config::from_lookup(|_| None).unwrap();
        config.data_dir = dir.path().join("data");
        config.uploads_dir = dir.path().join("uploads");
        config.ensure_dirs().unwrap();
        config
    }

    #[test]
    fn prune_removes_only_unreferenced_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        for name in ["1-keep.mp3", "1-keep.png", "2-old.mp3", "3-stray.jpg"] {
            fs::write(config.uploads_dir.join(name), b"x").unwrap();
        }
        let store = db::new_song_store(&config);
        store
            .save_all(&[Song::new(
                1,
                "A".into(),
                "B".into(),
                "/uploads/1-keep.mp3".into(),
                Some("/uploads/1-keep.png".into()),
            )])
            .unwrap();

        let removed = prune(&config, false, &utils::discard_logger()).unwrap();

        assert_eq!(removed, 2);
        assert!(config.uploads_dir.join("1-keep.mp3").exists());
        assert!(config.uploads_dir.join("1-keep.png").exists());
        assert!(!config.uploads_dir.join("2-old.mp3").exists());
        assert!(!config.uploads_dir.join("3-stray.jpg").exists());
    }

    #[test]
    fn dry_run_leaves_files_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        fs::write(config.uploads_dir.join("9-orphan.mp3"), b"x").unwrap();

        let removed = prune(&config, true, &utils::discard_logger()).unwrap();

        assert_eq!(removed, 1);
        assert!(config.uploads_dir.join("9-orphan.mp3").exists());
    }

    #[test]
    fn commands_work_on_a_fresh_install() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::from_lookup(|_| None).unwrap();
        config.data_dir = dir.path().join("data");
        config.uploads_dir = dir.path().join("uploads");

        list(&config).unwrap();
        assert_eq!(prune(&config, true, &utils::discard_logger()).unwrap(), 0);
        assert!(config.songs_file().exists());
        assert!(config.uploads_dir.is_dir());
    }

    #[test]
    fn placeholder_cover_is_never_an_orphan_source() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let songs = vec![Song::new(1, "A".into(), "B".into(), "/uploads/a.mp3".into(), None)];
        assert!(orphaned_uploads(&config, &songs).is_empty());
    }
}
