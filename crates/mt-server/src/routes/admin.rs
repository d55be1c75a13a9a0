//! External tool status.

use axum::extract::State;
use axum::Json;

use crate::context::AppContext;
use crate::error::AppError;

/// GET /api/admin/tools
pub async fn tools(State(ctx): State<AppContext>) -> Result<Json<Vec<mt_av::ToolInfo>>, AppError> {
    // `check_all` runs each tool's `-version` synchronously.
    let tools = ctx.tools.clone();
    let infos = tokio::task::spawn_blocking(move || tools.check_all())
        .await
        .map_err(|e| mt_core::Error::Internal(format!("tool check panicked: {e}")))?;
    Ok(Json(infos))
}
