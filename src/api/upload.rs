use std::path::{Path, PathBuf};

use actix_multipart::{Field, Multipart, MultipartError};
use actix_web::http::header::CONTENT_TYPE;
use actix_web::{HttpRequest, web};
use futures::TryStreamExt;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

use crate::config::Config;
use crate::errors::{ApiError, StoreError};
use crate::models::SongFields;
use crate::utils;

/// Limit for a plain text form field.
const MAX_FIELD_BYTES: usize = 1024 * 1024;
/// Limit for a JSON or urlencoded edit body.
const MAX_JSON_BYTES: usize = 10 * 1024 * 1024;

/// A media file written to the uploads directory during this request.
#[derive(Debug)]
pub struct UploadedFile {
    pub file_name: String,
    pub path: PathBuf,
    pub size: u64,
}

impl UploadedFile {
    pub fn url(&self) -> String {
        utils::upload_url(&self.file_name)
    }
}

/// Fields of a create or edit request. Files are already on disk by the time
/// this exists; call [`SongForm::discard`] if the request doesn't go through.
#[derive(Debug, Default)]
pub struct SongForm {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub audio: Option<UploadedFile>,
    pub cover: Option<UploadedFile>,
}

impl SongForm {
    /// The title, if one was sent and is non-empty.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref().filter(|t| !t.is_empty())
    }

    pub fn artist(&self) -> Option<&str> {
        self.artist.as_deref().filter(|a| !a.is_empty())
    }

    /// Removes any files this form stored.
    pub async fn discard(self) {
        for file in [self.audio, self.cover].into_iter().flatten() {
            let _ = fs::remove_file(&file.path).await;
        }
    }
}

/// Reads a song form from the request body.
///
/// `multipart/form-data` bodies may carry `title`, `artist` and the files
/// `audio` and `cover`. JSON and urlencoded bodies may carry `title` and
/// `artist` only. Any other body is read as an empty form.
pub async fn read_song_form(
    req: &HttpRequest,
    payload: web::Payload,
    config: &Config,
) -> Result<SongForm, ApiError> {
    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("multipart/") {
        read_multipart(Multipart::new(req.headers(), payload), config).await
    } else if content_type.starts_with("application/json") {
        let body = read_body(payload).await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(SongForm::default());
        }
        let fields: SongFields = serde_json::from_slice(&body)
            .map_err(|e| ApiError::validation(format!("malformed JSON body: {}", e)))?;
        Ok(fields.into())
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        let body = read_body(payload).await?;
        let fields: SongFields = serde_urlencoded::from_bytes(&body)
            .map_err(|e| ApiError::validation(format!("malformed form body: {}", e)))?;
        Ok(fields.into())
    } else {
        Ok(SongForm::default())
    }
}

impl From<SongFields> for SongForm {
    fn from(fields: SongFields) -> Self {
        SongForm { title: fields.title, artist: fields.artist, ..SongForm::default() }
    }
}

async fn read_body(mut payload: web::Payload) -> Result<web::BytesMut, ApiError> {
    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload
        .try_next()
        .await
        .map_err(|e| ApiError::validation(format!("failed to read request body: {}", e)))?
    {
        if body.len() + chunk.len() > MAX_JSON_BYTES {
            return Err(ApiError::validation("request body is too large"));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

async fn read_multipart(mut multipart: Multipart, config: &Config) -> Result<SongForm, ApiError> {
    let mut form = SongForm::default();
    match fill_form(&mut multipart, &mut form, config).await {
        Ok(()) => Ok(form),
        Err(e) => {
            form.discard().await;
            Err(e)
        }
    }
}

fn malformed(e: MultipartError) -> ApiError {
    ApiError::validation(format!("malformed multipart body: {}", e))
}

async fn fill_form(multipart: &mut Multipart, form: &mut SongForm, config: &Config) -> Result<(), ApiError> {
    while let Some(mut field) = multipart.try_next().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_owned();
        let original_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_owned);

        // browsers send an empty optional file input as a part with `filename=""`
        if original_name.as_deref() == Some("") {
            while field.try_next().await.map_err(malformed)?.is_some() {}
            continue;
        }

        let Some(original_name) = original_name else {
            let value = read_text(&mut field).await?;
            match name.as_str() {
                "title" => form.title = Some(value),
                "artist" => form.artist = Some(value),
                _ => {}
            }
            continue;
        };

        let slot = match name.as_str() {
            "audio" => &mut form.audio,
            "cover" => &mut form.cover,
            _ => return Err(ApiError::validation(format!("unexpected file field: {}", name))),
        };
        if slot.is_some() {
            return Err(ApiError::validation(format!("unexpected file field: {}", name)));
        }
        if !is_accepted_media(&field) {
            return Err(ApiError::validation("only audio or image files may be uploaded"));
        }
        *slot = Some(store_file(&mut field, &original_name, config).await?);
    }
    Ok(())
}

/// Uploads are filtered on the declared MIME type only.
fn is_accepted_media(field: &Field) -> bool {
    field
        .content_type()
        .map(|ct| {
            let essence = ct.essence_str();
            essence.starts_with("audio/") || essence.starts_with("image/")
        })
        .unwrap_or(false)
}

async fn read_text(field: &mut Field) -> Result<String, ApiError> {
    let mut data = Vec::new();
    while let Some(chunk) = field.try_next().await.map_err(malformed)? {
        if data.len() + chunk.len() > MAX_FIELD_BYTES {
            return Err(ApiError::validation("form field is too large"));
        }
        data.extend_from_slice(&chunk);
    }
    String::from_utf8(data).map_err(|_| ApiError::validation("form fields must be UTF-8"))
}

/// Streams one file part into the uploads directory. A partial file is
/// removed if anything goes wrong.
async fn store_file(field: &mut Field, original_name: &str, config: &Config) -> Result<UploadedFile, ApiError> {
    let file_name = utils::generate_upload_name(Some(original_name));
    let path = config.uploads_dir.join(&file_name);

    let written = write_field(field, &path, config.max_upload_bytes).await;
    match written {
        Ok(size) => Ok(UploadedFile { file_name, path, size }),
        Err(e) => {
            let _ = fs::remove_file(&path).await;
            Err(e)
        }
    }
}

async fn write_field(field: &mut Field, path: &Path, limit: u64) -> Result<u64, ApiError> {
    let write_failed = |source: std::io::Error| ApiError::Storage {
        message: "failed to store upload",
        source: StoreError::Io { path: path.display().to_string(), source },
    };

    let mut file = File::create(path).await.map_err(write_failed)?;
    let mut size: u64 = 0;
    while let Some(chunk) = field.try_next().await.map_err(malformed)? {
        size += chunk.len() as u64;
        if size > limit {
            return Err(ApiError::validation(format!(
                "file is larger than the {} upload limit",
                describe_limit(limit)
            )));
        }
        file.write_all(&chunk).await.map_err(write_failed)?;
    }
    file.flush().await.map_err(write_failed)?;
    Ok(size)
}

fn describe_limit(bytes: u64) -> String {
    const MIB: u64 = 1024 * 1024;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{} MiB", bytes / MIB)
    } else {
        let unit = if bytes == 1 { "byte" } else { "bytes" };
        format!("{} {}", bytes, unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_are_described_in_the_largest_exact_unit() {
        assert_eq!(describe_limit(50 * 1024 * 1024), "50 MiB");
        assert_eq!(describe_limit(8), "8 bytes");
        assert_eq!(describe_limit(1), "1 byte");
        assert_eq!(describe_limit(1024 * 1024 + 1), "1048577 bytes");
    }
}
