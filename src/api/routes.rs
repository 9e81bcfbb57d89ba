use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use super::handlers;
use crate::tts::TtsService;

pub struct AppState {
    pub tts: TtsService,
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    let files = ServeDir::new(state.tts.output_dir());

    Router::new()
        .route("/", get(handlers::root))
        .route("/synthesize", post(handlers::synthesize))
        .route("/tts", post(handlers::synthesize))
        .route("/health", get(handlers::health))
        .route("/artifacts", get(handlers::list_artifacts))
        .nest_service("/artifacts/files", files)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
