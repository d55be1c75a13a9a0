//! Media duration probing.
//!
//! Durations are advisory: a probe never fails. When `ffprobe` is missing,
//! times out, exits non-zero or prints something that is not a positive
//! number, the prober reports its configured fallback instead so the pipeline
//! can continue with a best-effort estimate.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::command::ToolCommand;
use crate::tools::ToolRegistry;

/// Duration reported when probing fails.
pub const DEFAULT_FALLBACK_SECS: f64 = 30.0;

/// Print only the container duration, bare.
#[rustfmt::skip]
const DURATION_ARGS: &[&str] = &[
    "-v", "error",
    "-show_entries", "format=duration",
    "-of", "default=noprint_wrappers=1:nokey=1",
];

/// A source of media durations.
///
/// Implementations must be safe to share across threads (`Send + Sync`).
#[async_trait]
pub trait DurationProbe: Send + Sync {
    /// Human-readable name identifying this prober implementation.
    fn name(&self) -> &'static str;

    /// Duration of the media at `path`, in seconds.
    async fn probe_duration(&self, path: &Path, cancel: &CancellationToken) -> f64;
}

/// A [`DurationProbe`] backed by the `ffprobe` CLI.
#[derive(Debug, Clone)]
pub struct FfprobeDurationProber {
    /// Path to the ffprobe binary, if one was discovered.
    ffprobe_path: Option<PathBuf>,
    timeout: Duration,
    fallback_secs: f64,
}

impl FfprobeDurationProber {
    /// Create a new prober using the given ffprobe path.
    pub fn new(ffprobe_path: PathBuf) -> Self {
        Self {
            ffprobe_path: Some(ffprobe_path),
            timeout: Duration::from_secs(30),
            fallback_secs: DEFAULT_FALLBACK_SECS,
        }
    }

    /// Create a prober from the tool registry and encode limits. A missing
    /// ffprobe is not an error; every probe then reports the fallback.
    pub fn from_registry(tools: &ToolRegistry, limits: &mt_core::config::EncodeConfig) -> Self {
        Self {
            ffprobe_path: tools.path_of("ffprobe").map(Path::to_path_buf),
            timeout: limits.probe_timeout(),
            fallback_secs: limits.probe_fallback_secs,
        }
    }

    /// Override the fallback duration.
    pub fn with_fallback(mut self, secs: f64) -> Self {
        self.fallback_secs = secs;
        self
    }

    async fn run_ffprobe(
        &self,
        ffprobe: &Path,
        path: &Path,
        cancel: &CancellationToken,
    ) -> mt_core::Result<Option<f64>> {
        let mut cmd = ToolCommand::new(ffprobe.to_path_buf());
        cmd.args(DURATION_ARGS.iter().copied());
        cmd.arg(path.to_string_lossy().as_ref());
        cmd.timeout(self.timeout).cancel_on(cancel.clone());

        let output = cmd.execute().await?;
        Ok(parse_duration(&output.stdout))
    }
}

#[async_trait]
impl DurationProbe for FfprobeDurationProber {
    fn name(&self) -> &'static str {
        "ffprobe"
    }

    async fn probe_duration(&self, path: &Path, cancel: &CancellationToken) -> f64 {
        let Some(ref ffprobe) = self.ffprobe_path else {
            tracing::warn!(
                file = %path.display(),
                fallback = self.fallback_secs,
                "ffprobe unavailable; using fallback duration"
            );
            return self.fallback_secs;
        };

        match self.run_ffprobe(ffprobe, path, cancel).await {
            Ok(Some(secs)) => {
                tracing::debug!(file = %path.display(), secs, "probed duration");
                secs
            }
            Ok(None) => {
                tracing::warn!(
                    file = %path.display(),
                    fallback = self.fallback_secs,
                    "ffprobe printed no usable duration; using fallback"
                );
                self.fallback_secs
            }
            Err(e) => {
                tracing::warn!(
                    file = %path.display(),
                    fallback = self.fallback_secs,
                    error = %e,
                    "duration probe failed; using fallback"
                );
                self.fallback_secs
            }
        }
    }
}

/// Parse ffprobe's bare `format=duration` output.
///
/// Returns `None` for anything that is not a finite, positive number
/// (including ffprobe's literal `N/A`).
pub fn parse_duration(stdout: &str) -> Option<f64> {
    let line = stdout.lines().map(str::trim).find(|l| !l.is_empty())?;
    let secs: f64 = line.parse().ok()?;
    (secs.is_finite() && secs > 0.0).then_some(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain_duration() {
        assert_eq!(parse_duration("12.345000\n"), Some(12.345));
    }

    #[test]
    fn parse_skips_leading_blank_lines() {
        assert_eq!(parse_duration("\n  \n5.0\n"), Some(5.0));
    }

    #[test]
    fn parse_rejects_non_numeric() {
        assert_eq!(parse_duration("N/A\n"), None);
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("abc"), None);
    }

    #[test]
    fn parse_rejects_zero_and_negative() {
        assert_eq!(parse_duration("0.000000"), None);
        assert_eq!(parse_duration("-3"), None);
    }

    #[tokio::test]
    async fn missing_binary_falls_back() {
        let prober = FfprobeDurationProber::new(PathBuf::from("nonexistent_ffprobe_xyz"));
        let secs = prober
            .probe_duration(Path::new("/tmp/whatever.mp3"), &CancellationToken::new())
            .await;
        assert_eq!(secs, DEFAULT_FALLBACK_SECS);
    }

    #[tokio::test]
    async fn unregistered_ffprobe_falls_back_to_configured_value() {
        let mut limits = mt_core::config::EncodeConfig::default();
        limits.probe_fallback_secs = 12.0;
        let tools = ToolRegistry::discover(&mt_core::config::ToolsConfig {
            ffmpeg_path: None,
            ffprobe_path: Some(PathBuf::from("/nonexistent/ffprobe")),
        });
        let prober = FfprobeDurationProber::from_registry(&tools, &limits);
        // Either the real ffprobe from PATH (which cannot read a missing file)
        // or no ffprobe at all: both must yield the fallback.
        let secs = prober
            .probe_duration(Path::new("/nonexistent/clip.mp4"), &CancellationToken::new())
            .await;
        assert_eq!(secs, 12.0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn reads_duration_from_tool_output() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("ffprobe");
        std::fs::write(&script, "#!/bin/sh\necho 42.5\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let prober = FfprobeDurationProber::new(script);
        let secs = prober
            .probe_duration(Path::new("/tmp/song.mp3"), &CancellationToken::new())
            .await;
        assert_eq!(secs, 42.5);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_tool_falls_back() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("ffprobe");
        std::fs::write(&script, "#!/bin/sh\necho broken >&2\nexit 1\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let prober = FfprobeDurationProber::new(script).with_fallback(7.0);
        let secs = prober
            .probe_duration(Path::new("/tmp/song.mp3"), &CancellationToken::new())
            .await;
        assert_eq!(secs, 7.0);
    }
}
