//! Liveness endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::context::AppContext;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Encode slots not currently held by a request.
    pub encode_slots_free: usize,
    pub encode_slots_total: usize,
}

/// GET /health
pub async fn health_check(State(ctx): State<AppContext>) -> Json<HealthResponse> {
    let encoder = ctx.composer.encoder();
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        encode_slots_free: encoder.available_slots(),
        encode_slots_total: encoder.max_concurrent(),
    })
}
