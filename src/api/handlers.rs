use actix_web::http::header::{CacheControl, CacheDirective, ContentType};
use actix_web::{HttpRequest, HttpResponse, web};
use slog::info;

use crate::api::AppState;
use crate::api::upload::{self, SongForm};
use crate::db;
use crate::errors::ApiError;
use crate::models::{Deleted, PlayCount, PublicSong, Song};
use crate::utils;

/// Placeholder artwork for songs uploaded without a cover.
const DEFAULT_COVER_PNG: &[u8] = include_bytes!("../../public/default-cover.png");

/// Path ids that don't parse can't match any song.
fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>().map_err(|_| ApiError::NotFound)
}

pub async fn list_songs(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let songs = state
        .load()
        .await
        .map_err(|e| state.storage_failure("failed to load songs", e))?;
    let public: Vec<PublicSong> = songs.iter().map(PublicSong::from).collect();
    Ok(HttpResponse::Ok().json(public))
}

pub async fn create_song(
    req: HttpRequest,
    payload: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    state.require_admin(&req)?;
    let form = upload::read_song_form(&req, payload, &state.config)
        .await
        .map_err(|e| state.observe(e))?;

    match insert_song(&state, &form).await {
        Ok(song) => {
            info!(state.logger, "song created";
                "id" => song.id,
                "title" => &song.title,
                "audio_bytes" => form.audio.as_ref().map_or(0, |a| a.size)
            );
            Ok(HttpResponse::Created().json(song))
        }
        Err(e) => {
            form.discard().await;
            Err(e)
        }
    }
}

async fn insert_song(state: &AppState, form: &SongForm) -> Result<Song, ApiError> {
    let (Some(title), Some(artist)) = (form.title(), form.artist()) else {
        return Err(ApiError::validation("title and artist are required"));
    };
    let Some(audio) = &form.audio else {
        return Err(ApiError::validation("an audio file is required"));
    };

    let _guard = state.write_lock.lock().await;
    let mut songs = state
        .load()
        .await
        .map_err(|e| state.storage_failure("upload failed", e))?;

    let song = Song::new(
        db::next_song_id(&songs, utils::now_millis()),
        title.to_owned(),
        artist.to_owned(),
        audio.url(),
        form.cover.as_ref().map(|c| c.url()),
    );
    songs.push(song.clone());
    state
        .save(songs)
        .await
        .map_err(|e| state.storage_failure("upload failed", e))?;
    Ok(song)
}

pub async fn update_song(
    req: HttpRequest,
    path: web::Path<String>,
    payload: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    state.require_admin(&req)?;
    let form = upload::read_song_form(&req, payload, &state.config)
        .await
        .map_err(|e| state.observe(e))?;

    match apply_update(&state, &path, &form).await {
        Ok(song) => {
            info!(state.logger, "song updated"; "id" => song.id);
            Ok(HttpResponse::Ok().json(song))
        }
        Err(e) => {
            form.discard().await;
            Err(e)
        }
    }
}

/// Overwrites the fields the form carries; everything else stays as is.
/// Replaced media files are left in the uploads directory.
async fn apply_update(state: &AppState, raw_id: &str, form: &SongForm) -> Result<Song, ApiError> {
    let id = parse_id(raw_id)?;

    let _guard = state.write_lock.lock().await;
    let mut songs = state
        .load()
        .await
        .map_err(|e| state.storage_failure("edit failed", e))?;
    let index = db::position_by_id(&songs, id).ok_or(ApiError::NotFound)?;

    let song = &mut songs[index];
    if let Some(title) = form.title() {
        song.title = title.to_owned();
    }
    if let Some(artist) = form.artist() {
        song.artist = artist.to_owned();
    }
    if let Some(audio) = &form.audio {
        song.audio_url = Some(audio.url());
    }
    if let Some(cover) = &form.cover {
        song.cover_url = cover.url();
    }
    let updated = song.clone();

    state
        .save(songs)
        .await
        .map_err(|e| state.storage_failure("edit failed", e))?;
    Ok(updated)
}

pub async fn delete_song(
    req: HttpRequest,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    state.require_admin(&req)?;
    let id = parse_id(&path)?;

    let _guard = state.write_lock.lock().await;
    let mut songs = state
        .load()
        .await
        .map_err(|e| state.storage_failure("delete failed", e))?;
    let index = db::position_by_id(&songs, id).ok_or(ApiError::NotFound)?;
    let removed = songs.remove(index);
    state
        .save(songs)
        .await
        .map_err(|e| state.storage_failure("delete failed", e))?;

    info!(state.logger, "song deleted"; "id" => removed.id, "title" => &removed.title);
    Ok(HttpResponse::Ok().json(Deleted { success: true }))
}

pub async fn register_play(path: web::Path<String>, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let id = parse_id(&path)?;

    let _guard = state.write_lock.lock().await;
    let mut songs = state
        .load()
        .await
        .map_err(|e| state.storage_failure("failed to record play", e))?;
    let index = db::position_by_id(&songs, id).ok_or(ApiError::NotFound)?;
    let play_count = songs[index].record_play();
    state
        .save(songs)
        .await
        .map_err(|e| state.storage_failure("failed to record play", e))?;

    Ok(HttpResponse::Ok().json(PlayCount { play_count }))
}

pub async fn api_not_found() -> HttpResponse {
    HttpResponse::NotFound().json(serde_json::json!({ "error": "not found" }))
}

pub async fn default_cover() -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::png())
        .insert_header(CacheControl(vec![CacheDirective::Public, CacheDirective::MaxAge(86400)]))
        .body(DEFAULT_COVER_PNG)
}
