//! Application context shared by all route handlers via Axum state.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use mt_av::{ScratchStore, ToolRegistry};
use mt_compose::Composer;
use mt_core::config::Config;

/// Application context shared by all request handlers (via Axum state).
///
/// This is cheaply cloneable because it only holds `Arc`s and handles.
#[derive(Clone)]
pub struct AppContext {
    /// Immutable application configuration snapshot.
    pub config: Arc<Config>,
    /// External tool registry.
    pub tools: Arc<ToolRegistry>,
    /// Composition pipeline (probe, audio resolver, encoder).
    pub composer: Composer,
    /// Scratch directory allocator.
    pub scratch: ScratchStore,
    /// Cancelled on shutdown; each request runs under a child token.
    pub shutdown: CancellationToken,
}

impl AppContext {
    /// Build a context from configuration, discovering tools and creating
    /// the scratch directory.
    pub fn build(config: Config, shutdown: CancellationToken) -> mt_core::Result<Self> {
        let tools = ToolRegistry::discover(&config.tools);
        for info in tools.check_all() {
            if info.available {
                tracing::info!(
                    "Tool found: {} ({})",
                    info.name,
                    info.version.as_deref().unwrap_or("unknown version")
                );
            } else {
                tracing::warn!("Tool not found: {}", info.name);
            }
        }

        let scratch = ScratchStore::from_config(&config.scratch)?;
        let composer = Composer::from_config(&config, &tools)?;

        Ok(Self {
            config: Arc::new(config),
            tools: Arc::new(tools),
            composer,
            scratch,
            shutdown,
        })
    }
}
