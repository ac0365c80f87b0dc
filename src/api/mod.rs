mod handlers;
pub use handlers::*;
pub mod upload;


use std::sync::Arc;
use std::time::Instant;

use actix_cors::Cors;
use actix_files::{Files, NamedFile};
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, fn_service};
use actix_web::http::header::AUTHORIZATION;
use actix_web::{App, HttpRequest, HttpServer, middleware, web};
use slog::{Logger, info, warn};
use tokio::sync::Mutex;

use crate::config::Config;
use crate::db::SongStore;
use crate::errors::{ApiError, StoreError};
use crate::models::{DEFAULT_COVER_URL, Song};
use crate::utils;

/// Shared state handed to every handler.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn SongStore>,
    pub logger: Logger,
    /// Serializes read-modify-write cycles on the songs document.
    pub(crate) write_lock: Mutex<()>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn SongStore>, logger: Logger) -> Self {
        AppState { config, store, logger, write_lock: Mutex::new(()) }
    }

    pub async fn load(&self) -> Result<Vec<Song>, StoreError> {
        let store = self.store.clone();
        web::block(move || store.load_all())
            .await
            .map_err(|e| StoreError::Blocking(e.to_string()))?
    }

    pub async fn save(&self, songs: Vec<Song>) -> Result<(), StoreError> {
        let store = self.store.clone();
        web::block(move || store.save_all(&songs))
            .await
            .map_err(|e| StoreError::Blocking(e.to_string()))?
    }

    /// Logs a storage failure and turns it into the generic client error.
    pub fn storage_failure(&self, message: &'static str, err: StoreError) -> ApiError {
        utils::error_context(&self.logger, message, &err);
        ApiError::Storage { message, source: err }
    }

    /// Logs storage failures that surface from elsewhere, such as writing an
    /// upload, and passes every error through unchanged.
    pub fn observe(&self, err: ApiError) -> ApiError {
        if let ApiError::Storage { message, source } = &err {
            utils::error_context(&self.logger, message, source);
        }
        err
    }

    /// Admin routes need the shared password, verbatim, in `Authorization`.
    pub fn require_admin(&self, req: &HttpRequest) -> Result<(), ApiError> {
        let supplied = req.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok());
        if supplied == Some(self.config.admin_password.as_str()) {
            return Ok(());
        }
        warn!(self.logger, "rejected admin request";
            "method" => req.method().as_str(),
            "path" => req.path()
        );
        Err(ApiError::Unauthorized)
    }
}

/// The `/api` routes.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/songs", web::get().to(list_songs))
            .route("/songs", web::post().to(create_song))
            .route("/songs/{id}", web::put().to(update_song))
            .route("/songs/{id}", web::delete().to(delete_song))
            .route("/songs/{id}/play", web::post().to(register_play))
            .default_service(web::to(api_not_found)),
    );
}

/// Uploaded media under `/uploads`, the placeholder cover, and the front-end
/// for everything else. Paths that match no file get `index.html`.
pub fn static_files(config: &Config) -> impl FnOnce(&mut web::ServiceConfig) + use<> {
    let uploads_dir = config.uploads_dir.clone();
    let static_dir = config.static_dir.clone();
    let index = static_dir.join("index.html");

    move |cfg: &mut web::ServiceConfig| {
        cfg.route(DEFAULT_COVER_URL, web::get().to(default_cover))
            .service(Files::new("/uploads", uploads_dir))
            .service(
            Files::new("/", static_dir)
                .index_file("index.html")
                .default_handler(fn_service(move |req: ServiceRequest| {
                    let index = index.clone();
                    async move {
                        let (req, _) = req.into_parts();
                        let file = NamedFile::open_async(&index).await?;
                        let res = file.into_response(&req);
                        Ok::<_, actix_web::Error>(ServiceResponse::new(req, res))
                    }
                })),
        );
    }
}

fn security_headers() -> middleware::DefaultHeaders {
    middleware::DefaultHeaders::new()
        .add(("X-Content-Type-Options", "nosniff"))
        .add(("X-Frame-Options", "SAMEORIGIN"))
        .add(("Referrer-Policy", "no-referrer"))
}

/// Binds the HTTP server and runs it until shutdown.
pub async fn start_server(config: Config, store: Arc<dyn SongStore>, logger: Logger) -> std::io::Result<()> {
    let bind = (config.host.clone(), config.port);
    let state = web::Data::new(AppState::new(config.clone(), store, logger.clone()));

    info!(logger, "music site started";
        "address" => format!("http://{}:{}", bind.0, bind.1),
        "data_dir" => config.data_dir.display().to_string(),
        "uploads_dir" => config.uploads_dir.display().to_string()
    );
    if config.uses_default_password() {
        warn!(logger, "ADMIN_PASSWORD is not set; using the built-in default password");
    }

    HttpServer::new(move || {
        let access_log = logger.clone();
        App::new()
            .app_data(state.clone())
            .wrap_fn(move |req, srv| {
                let logger = access_log.clone();
                let method = req.method().to_string();
                let path = req.path().to_owned();
                let started = Instant::now();
                let fut = srv.call(req);
                async move {
                    let res = fut.await?;
                    info!(logger, "request";
                        "method" => method,
                        "path" => path,
                        "status" => res.status().as_u16(),
                        "elapsed_ms" => started.elapsed().as_millis() as u64
                    );
                    Ok::<_, actix_web::Error>(res)
                }
            })
            .wrap(Cors::permissive())
            .wrap(security_headers())
            .configure(routes)
            .configure(static_files(&config))
    })
    .bind(bind)?
    .run()
    .await
}
