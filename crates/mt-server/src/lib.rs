//! mt-server: HTTP surface for the montage composition pipeline.
//!
//! This crate exposes the pipeline over Axum:
//!
//! - `POST /api/create-video` -- multipart upload in, MP4 out
//! - `GET /health` -- liveness and free encode slots
//! - `GET /api/library` -- built-in audio tracks
//! - `GET /api/admin/tools` -- ffmpeg / ffprobe availability
//!
//! Shutdown is signal driven. In-flight encodes are cancelled through a
//! [`CancellationToken`] whose children each request runs under.

pub mod context;
pub mod error;
pub mod middleware;
pub mod router;
pub mod routes;

use std::net::SocketAddr;

use mt_core::config::Config;
use tokio_util::sync::CancellationToken;

use crate::context::AppContext;

/// Start the montage server.
///
/// Discovers tools, prepares the scratch directory, builds the
/// [`AppContext`] and serves until a shutdown signal is received or
/// `cancel` is triggered.
pub async fn start(config: Config, cancel: CancellationToken) -> mt_core::Result<()> {
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| mt_core::Error::Internal(format!("Invalid server address: {e}")))?;
    let static_dir = config.server.static_dir.clone();

    let ctx = AppContext::build(config, cancel.clone())?;
    tracing::info!(
        scratch_dir = %ctx.scratch.dir().display(),
        library_dir = %ctx.config.audio.library_dir.display(),
        encode_slots = ctx.composer.encoder().max_concurrent(),
        "Context ready"
    );

    let app = router::build_router(ctx, static_dir);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| mt_core::Error::Internal(format!("Failed to bind to {addr}: {e}")))?;
    tracing::info!("Starting server on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await
        .map_err(|e| mt_core::Error::Internal(format!("Server error: {e}")))?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM), then cancel every
/// in-flight request.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = cancel.cancelled() => {}
    }

    tracing::info!("Shutdown signal received");
    cancel.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invalid_address_is_rejected() {
        let mut config = Config::default();
        config.server.host = "not an address".into();
        let err = start(config, CancellationToken::new()).await.unwrap_err();
        assert!(err.to_string().contains("Invalid server address"));
    }

    #[tokio::test]
    async fn cancelled_token_stops_server() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.server.host = "127.0.0.1".into();
        config.server.port = 0;
        config.scratch.dir = Some(dir.path().join("scratch"));

        let cancel = CancellationToken::new();
        cancel.cancel();
        start(config, cancel).await.unwrap();
    }
}
