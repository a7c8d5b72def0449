#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the impact map application.
//!
//! Loads the works, buildings and population datasets once at start-up,
//! serves impact analyses over a small JSON API and serves the `MapLibre`
//! front end from `static/`.

mod handlers;

use std::sync::Arc;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::{App, HttpServer, middleware, web};
use impact_map_analytics::config::AppConfig;
use impact_map_analytics::{AnalysisError, ImpactAnalyzer};
use impact_map_geography::IngestError;
use impact_map_geography::store::GeometryStore;
use thiserror::Error;

/// Directory holding the front end files.
pub const STATIC_DIR: &str = "static";

/// Initial map centre latitude.
pub const DEFAULT_LATITUDE: f64 = 41.315_659_525_445_17;
/// Initial map centre longitude.
pub const DEFAULT_LONGITUDE: f64 = 2.016_193_344_682_793_3;
/// Initial map zoom level.
pub const DEFAULT_ZOOM: f64 = 12.0;

/// Shared application state.
pub struct AppState {
    /// Analyzer over the read-only datasets.
    pub analyzer: Arc<ImpactAnalyzer>,
}

/// Errors that can occur while preparing the server state.
#[derive(Debug, Error)]
pub enum StartupError {
    /// A dataset could not be loaded.
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// The analyzer rejected the configuration or datasets.
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

/// Loads the configured datasets and builds the analyzer.
///
/// # Errors
///
/// Returns [`StartupError`] if dataset loading or analyzer preparation
/// fails.
pub fn load_analyzer(config: &AppConfig) -> Result<ImpactAnalyzer, StartupError> {
    let store = Arc::new(GeometryStore::load(&config.datasets)?);
    Ok(ImpactAnalyzer::new(store, config.analysis.clone())?)
}

/// Starts the impact map API server.
///
/// Reads [`AppConfig`], loads the datasets, and starts the Actix-Web HTTP
/// server. This is a regular async function; the caller is responsible
/// for providing the async runtime (e.g. via `#[actix_web::main]`) and
/// for initialising logging.
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind or
/// encounters a runtime error.
///
/// # Panics
///
/// Panics if the configuration or datasets cannot be loaded.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    log::info!("Loading configuration...");
    let config = AppConfig::load().expect("Failed to load configuration");

    log::info!("Loading datasets...");
    let analyzer = load_analyzer(&config).expect("Failed to load datasets");

    serve(Arc::new(analyzer)).await
}

/// Serves `analyzer` over HTTP on `BIND_ADDR`:`PORT`.
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind or
/// encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn serve(analyzer: Arc<ImpactAnalyzer>) -> std::io::Result<()> {
    let state = web::Data::new(AppState { analyzer });

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
            .service(
                web::scope("/api")
                    .route("/health", web::get().to(handlers::health))
                    .route("/map-defaults", web::get().to(handlers::map_defaults))
                    .route("/works", web::get().to(handlers::works))
                    .route("/impact", web::post().to(handlers::impact)),
            )
            // Serve frontend static files
            .service(Files::new("/", STATIC_DIR).index_file("index.html"))
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
