//! Built-in audio library listing.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::context::AppContext;
use crate::error::AppError;

#[derive(Debug, Serialize)]
pub struct LibraryResponse {
    /// File names accepted as `audioFileName`.
    pub tracks: Vec<String>,
}

/// GET /api/library
pub async fn list_tracks(State(ctx): State<AppContext>) -> Result<Json<LibraryResponse>, AppError> {
    let tracks = ctx.composer.resolver().list_builtin().await?;
    Ok(Json(LibraryResponse { tracks }))
}
