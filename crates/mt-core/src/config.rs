//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries all
//! sub-configs for the server, external tools, scratch storage, audio
//! resolution, composition defaults and the encode executor. Every section
//! defaults sensibly so a completely empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub tools: ToolsConfig,
    pub scratch: ScratchConfig,
    pub audio: AudioConfig,
    pub compose: ComposeConfig,
    pub encode: EncodeConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    ///
    /// This is intentionally string-based so the caller can read the file
    /// however it sees fit.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Load configuration strictly: the file must exist and parse.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        if self.encode.max_concurrent == 0 {
            warnings.push("encode.max_concurrent is 0; one encode slot will be used".into());
        }

        if self.encode.probe_fallback_secs <= 0.0 {
            warnings.push(format!(
                "encode.probe_fallback_secs is {}; audio will always loop",
                self.encode.probe_fallback_secs
            ));
        }

        if self.compose.default_image_duration_secs <= 0.0 {
            warnings.push("compose.default_image_duration_secs must be positive".into());
        }

        if self.compose.default_width % 2 != 0 || self.compose.default_height % 2 != 0 {
            warnings.push(format!(
                "compose default canvas {}x{} is odd; it will be rounded down to even",
                self.compose.default_width, self.compose.default_height
            ));
        }

        if !self.audio.library_dir.exists() {
            warnings.push(format!(
                "audio.library_dir {} does not exist; built-in tracks are unavailable",
                self.audio.library_dir.display()
            ));
        }

        if let Some(ref dir) = self.scratch.dir {
            if dir.exists() && !dir.is_dir() {
                warnings.push(format!("scratch.dir {} is not a directory", dir.display()));
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory with a built UI to serve as a fallback, if any.
    pub static_dir: Option<PathBuf>,
    /// Maximum accepted multipart body size in bytes.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            static_dir: None,
            max_upload_bytes: 512 * 1024 * 1024,
        }
    }
}

/// Paths to external CLI tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
}

/// Scratch (temporary asset) storage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScratchConfig {
    /// Scratch directory; the system temp dir when unset.
    pub dir: Option<PathBuf>,
}

impl ScratchConfig {
    /// The effective scratch directory.
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Audio source resolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Directory holding the built-in audio library.
    pub library_dir: PathBuf,
    /// Timeout for fetching a remote audio URL.
    pub download_timeout_secs: u64,
    /// Largest remote audio body accepted.
    pub max_download_bytes: u64,
}

impl AudioConfig {
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            library_dir: PathBuf::from("public/music"),
            download_timeout_secs: 15,
            max_download_bytes: 64 * 1024 * 1024,
        }
    }
}

/// Defaults for the slideshow and audio-replace encode plans.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposeConfig {
    pub default_width: u32,
    pub default_height: u32,
    /// Largest accepted width or height.
    pub max_dimension: u32,
    /// Per-image duration used when `durations` is missing or malformed.
    pub default_image_duration_secs: f64,
    pub frame_rate: u32,
    pub video_codec: String,
    pub pixel_format: String,
    pub audio_codec: String,
    pub audio_bitrate: String,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            default_width: 720,
            default_height: 1280,
            max_dimension: 4096,
            default_image_duration_secs: 2.0,
            frame_rate: 30,
            video_codec: "libx264".into(),
            pixel_format: "yuv420p".into(),
            audio_codec: "aac".into(),
            audio_bitrate: "192k".into(),
        }
    }
}

/// Encode executor and probe limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeConfig {
    /// Maximum number of encoder processes running at once.
    pub max_concurrent: usize,
    /// How long a request may wait for a free encode slot.
    pub queue_timeout_secs: u64,
    /// Hard limit on a single encode.
    pub encode_timeout_secs: u64,
    /// Hard limit on a single duration probe.
    pub probe_timeout_secs: u64,
    /// Duration reported when a probe fails.
    pub probe_fallback_secs: f64,
}

impl EncodeConfig {
    pub fn queue_timeout(&self) -> Duration {
        Duration::from_secs(self.queue_timeout_secs)
    }

    pub fn encode_timeout(&self) -> Duration {
        Duration::from_secs(self.encode_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            max_concurrent: num_cpus::get().max(1),
            queue_timeout_secs: 120,
            encode_timeout_secs: 600,
            probe_timeout_secs: 30,
            probe_fallback_secs: 30.0,
        }
    }
}
