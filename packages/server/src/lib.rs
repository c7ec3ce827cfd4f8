#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the property snapshot lookup.
//!
//! Exposes the lookup pipeline as `GET /api/lookup` returning JSON, plus a
//! health check. The [`SnapshotService`] (geocoder, parcel resolver,
//! database handles and caches) is built once at startup and shared by
//! every worker.

mod handlers;

use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, error, middleware, web};
use property_snapshot_lookup::config::Config;
use property_snapshot_lookup::{LookupError, SnapshotService};

/// Shared application state.
pub struct AppState {
    /// The lookup pipeline and its caches.
    pub service: SnapshotService,
}

/// Errors that prevent the server from starting.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The lookup service could not be built.
    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// Configuration is missing or invalid.
    #[error(transparent)]
    Config(#[from] property_snapshot_lookup::config::ConfigError),

    /// The HTTP server failed to bind or run.
    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Registers the API routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::QueryConfig::default().error_handler(|err, _req| {
        let message = err.to_string();
        error::InternalError::from_response(
            err,
            HttpResponse::BadRequest().json(serde_json::json!({ "error": message })),
        )
        .into()
    }))
    .service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/lookup", web::get().to(handlers::lookup)),
    );
}

/// Starts the property snapshot API server.
///
/// Reads [`Config`] from the environment, builds the lookup service
/// (connecting both stores and loading the parcel index), and serves on
/// `BIND_ADDR`:`PORT` (default `127.0.0.1:8080`). The caller provides the
/// async runtime (e.g. via `#[actix_web::main]`) and initializes logging.
///
/// # Errors
///
/// Returns [`ServerError`] if configuration is missing, the service cannot
/// be built, or the HTTP server fails to bind.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> Result<(), ServerError> {
    let config = Config::from_env()?;

    log::info!("Building lookup service...");
    let service = SnapshotService::from_config(&config).await?;
    let state = web::Data::new(AppState { service });

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await?;

    Ok(())
}
