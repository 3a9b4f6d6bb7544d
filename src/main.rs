//! OCR Verifier - upload an image or PDF, get OCR text and a heuristic trust score.

mod api;
mod assets;
mod config;
mod document;
mod error;
mod ocr;
mod pdf;
mod pipeline;
mod preprocess;
mod schema;
mod scoring;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use config::ServerConfig;
use ocr::{OcrEngine, TextRecognizer};
use pdf::{PdfRasterizer, PopplerRasterizer};
use pipeline::Verifier;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    verifier: Arc<Verifier>,
    static_dir: Arc<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "ocr_verifier=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;
    let heuristics = config.heuristics()?;

    // External tools are probed once; requests only read them
    let engine = ocr::tesseract::try_initialize(&config.tesseract_bin, &config.ocr_lang)
        .map(|engine| Arc::new(engine) as Arc<dyn OcrEngine>);
    let rasterizer = PopplerRasterizer::detect(&config.pdftoppm_bin)
        .map(|rasterizer| Arc::new(rasterizer) as Arc<dyn PdfRasterizer>);

    let verifier = Verifier::new(
        TextRecognizer::new(engine),
        rasterizer,
        heuristics,
        config.pdf_dpi,
    );

    info!("Frontend served from: {:?}", config.static_dir);
    info!("OCR available: {}", verifier.ocr_available());
    info!("PDF rasterizer available: {}", verifier.pdf_available());

    let state = AppState {
        verifier: Arc::new(verifier),
        static_dir: Arc::new(config.static_dir.clone()),
    };
    let app = build_router(state, config.max_upload_bytes);

    // Run server
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("Server listening on http://{}", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Assemble routes and middleware around `state`.
pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(assets::index))
        .route("/health", get(api::health))
        .route("/api/verify", post(api::verify_document))
        .route("/{*path}", get(assets::asset))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CatchPanicLayer::custom(api::panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
