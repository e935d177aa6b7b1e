use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/wallet", get(handlers::wallet_status))
        .route("/api/wallet/connect", post(handlers::wallet_connect))
        .route("/api/wallet/resume", post(handlers::wallet_resume))
        .route("/api/wallet/disconnect", post(handlers::wallet_disconnect))
        .route("/api/wallet/switch", post(handlers::wallet_switch))
        .route(
            "/api/packets",
            get(handlers::packets_list).post(handlers::packets_create),
        )
        .route("/api/packets/{id}", get(handlers::packet_detail))
        .route("/api/packets/{id}/claim", post(handlers::packets_claim))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
