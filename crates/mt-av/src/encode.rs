//! Encode execution behind a bounded admission gate.
//!
//! Every encode holds one permit of a shared semaphore while ffmpeg runs, so
//! at most `max_concurrent` encoder processes exist at any time. Requests that
//! cannot get a permit within the queue timeout fail with
//! [`mt_core::Error::Busy`]. A failed encode is terminal; there is no retry.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::command::ToolCommand;
use crate::plan::EncodePlan;
use crate::tools::ToolRegistry;

/// Runs [`EncodePlan`]s with ffmpeg.
#[derive(Debug, Clone)]
pub struct Encoder {
    ffmpeg: Option<PathBuf>,
    permits: Arc<Semaphore>,
    max_concurrent: usize,
    queue_timeout: Duration,
    encode_timeout: Duration,
}

impl Encoder {
    /// Create an encoder for the given ffmpeg binary.
    pub fn new(ffmpeg: PathBuf, max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            ffmpeg: Some(ffmpeg),
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            queue_timeout: Duration::from_secs(120),
            encode_timeout: Duration::from_secs(600),
        }
    }

    /// Create an encoder from the tool registry and encode limits. A missing
    /// ffmpeg is reported when an encode is attempted.
    pub fn from_registry(tools: &ToolRegistry, limits: &mt_core::config::EncodeConfig) -> Self {
        let max_concurrent = limits.max_concurrent.max(1);
        Self {
            ffmpeg: tools.path_of("ffmpeg").map(Path::to_path_buf),
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            queue_timeout: limits.queue_timeout(),
            encode_timeout: limits.encode_timeout(),
        }
    }

    pub fn with_queue_timeout(mut self, timeout: Duration) -> Self {
        self.queue_timeout = timeout;
        self
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Encode slots not currently held.
    pub fn available_slots(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run `plan` and return its output path.
    ///
    /// # Errors
    ///
    /// - [`mt_core::Error::Busy`] if no slot frees up within the queue timeout.
    /// - [`mt_core::Error::Cancelled`] if `cancel` fires while queued or running.
    /// - [`mt_core::Error::Encode`] if ffmpeg is missing, cannot be spawned,
    ///   times out, exits non-zero, or leaves no output file.
    pub async fn execute(
        &self,
        plan: &EncodePlan,
        cancel: &CancellationToken,
    ) -> mt_core::Result<PathBuf> {
        let Some(ref ffmpeg) = self.ffmpeg else {
            return Err(mt_core::Error::Encode(
                "ffmpeg not found; is it installed and in PATH?".into(),
            ));
        };

        let permit = tokio::select! {
            acquired = tokio::time::timeout(self.queue_timeout, self.permits.clone().acquire_owned()) => {
                match acquired {
                    Ok(Ok(permit)) => permit,
                    Ok(Err(_closed)) => {
                        return Err(mt_core::Error::Internal("encode queue closed".into()));
                    }
                    Err(_elapsed) => {
                        tracing::warn!(
                            max_concurrent = self.max_concurrent,
                            "encode queue saturated"
                        );
                        return Err(mt_core::Error::Busy(format!(
                            "no encode slot became free within {:?}",
                            self.queue_timeout
                        )));
                    }
                }
            }
            _ = cancel.cancelled() => return Err(mt_core::Error::Cancelled),
        };

        let args = plan.to_args();
        tracing::info!(
            output = %plan.output.display(),
            slots_free = self.permits.available_permits(),
            "encode started"
        );
        tracing::debug!("ffmpeg {}", args.join(" "));

        let started = std::time::Instant::now();
        let mut cmd = ToolCommand::new(ffmpeg.clone());
        cmd.args(args)
            .timeout(self.encode_timeout)
            .cancel_on(cancel.clone());
        let result = cmd.execute().await;
        drop(permit);

        match result {
            Ok(_) => {}
            Err(mt_core::Error::Cancelled) => return Err(mt_core::Error::Cancelled),
            Err(e) => {
                tracing::error!(error = %e, "encode failed");
                return Err(mt_core::Error::Encode(
                    "the encoder failed to produce the output video".into(),
                ));
            }
        }

        match tokio::fs::metadata(&plan.output).await {
            Ok(meta) if meta.len() > 0 => {
                tracing::info!(
                    output = %plan.output.display(),
                    bytes = meta.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "encode finished"
                );
                Ok(plan.output.clone())
            }
            _ => Err(mt_core::Error::Encode(
                "the encoder exited without writing an output file".into(),
            )),
        }
    }
}
