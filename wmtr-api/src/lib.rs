//! wmtr-api library - water-meter reading service
//!
//! Ingestion pipeline (image store, recognition client, outcome classifier,
//! reading recorder, orchestrator) plus the HTTP surface around it.

use axum::extract::DefaultBodyLimit;
use axum::Router;
use sqlx::SqlitePool;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod classify;
pub mod ingest;
pub mod ocr;
pub mod recorder;
pub mod storage;

use ocr::OcrClient;
use recorder::ReadingRecorder;
use storage::ImageStore;

/// Uploaded photographs from modern phone cameras run well past axum's
/// default 2 MB body limit.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Image store adapter
    pub store: ImageStore,
    /// Remote recognition client
    pub ocr: OcrClient,
    /// Reading table writes
    pub recorder: ReadingRecorder,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, store: ImageStore, ocr: OcrClient) -> Self {
        let recorder = ReadingRecorder::new(db.clone());
        Self {
            db,
            store,
            ocr,
            recorder,
        }
    }
}

/// Build application router
///
/// Reading endpoints require a session token; health and stored media are
/// public (media authorization is enforced at write time only).
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};

    let media_root = state.store.media_root();

    // Protected routes (require authentication)
    let protected = Router::new()
        .route("/api/read-meter", post(api::read_meter))
        .route("/api/readings/correct", post(api::correct_reading))
        .route("/api/readings", get(api::list_readings))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth_middleware,
        ));

    // Public routes (no authentication)
    let public = Router::new()
        .merge(api::health_routes())
        .nest_service("/media", ServeDir::new(media_root));

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
