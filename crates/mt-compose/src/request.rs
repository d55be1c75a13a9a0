//! Validated composition requests.
//!
//! A [`ComposeForm`] carries the raw, loosely typed fields of a submission
//! (everything a multipart form or the CLI can supply). [`ComposeForm::into_request`]
//! selects the mode, applies defaults and validation, and produces the tagged
//! [`ComposeRequest`] the pipeline consumes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use mt_core::config::ComposeConfig;
use mt_core::{Error, MediaAsset, Result};

/// Minimum number of images for a slideshow.
pub const MIN_IMAGES: usize = 2;

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// Which pipeline a request runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComposeMode {
    /// Slideshow built from still images.
    Images,
    /// Audio track replaced in an existing video.
    Video,
}

impl fmt::Display for ComposeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Images => write!(f, "images"),
            Self::Video => write!(f, "video"),
        }
    }
}

impl FromStr for ComposeMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "images" | "image" | "slideshow" => Ok(Self::Images),
            "video" => Ok(Self::Video),
            other => Err(Error::validation(format!(
                "unknown mode '{other}'; expected 'images' or 'video'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Canvas
// ---------------------------------------------------------------------------

/// Output frame size for a slideshow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    /// The configured default canvas, rounded down to even dimensions.
    pub fn from_config(config: &ComposeConfig) -> Self {
        Self {
            width: even(config.default_width),
            height: even(config.default_height),
        }
    }

    /// Build a canvas from raw `width`/`height` fields.
    ///
    /// Absent, non-numeric or non-positive values fall back to the configured
    /// default. Odd values are rounded down to even. Values above
    /// `max_dimension` are rejected.
    pub fn from_fields(
        width: Option<&str>,
        height: Option<&str>,
        config: &ComposeConfig,
    ) -> Result<Self> {
        let defaults = Self::from_config(config);
        Ok(Self {
            width: dimension(width, defaults.width, config.max_dimension, "width")?,
            height: dimension(height, defaults.height, config.max_dimension, "height")?,
        })
    }
}

impl fmt::Display for Canvas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

fn even(value: u32) -> u32 {
    (value - value % 2).max(2)
}

fn dimension(raw: Option<&str>, default: u32, max: u32, axis: &str) -> Result<u32> {
    let parsed = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 1.0);

    let Some(value) = parsed else {
        return Ok(default);
    };

    if value > f64::from(max) {
        return Err(Error::validation(format!(
            "{axis} {value} exceeds the maximum of {max}"
        )));
    }

    Ok(even(value as u32))
}

// ---------------------------------------------------------------------------
// Specs
// ---------------------------------------------------------------------------

/// One slideshow frame and how long it stays on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageEntry {
    pub asset: MediaAsset,
    pub duration_secs: f64,
}

/// An ordered slideshow. Always holds at least two images with positive,
/// finite durations.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSequenceSpec {
    entries: Vec<ImageEntry>,
    canvas: Canvas,
}

impl ImageSequenceSpec {
    pub fn new(images: Vec<MediaAsset>, durations: Vec<f64>, canvas: Canvas) -> Result<Self> {
        if images.len() < MIN_IMAGES {
            return Err(Error::validation("Please upload at least 2 images."));
        }
        if images.len() != durations.len() {
            return Err(Error::validation(format!(
                "{} images but {} durations",
                images.len(),
                durations.len()
            )));
        }
        if let Some(bad) = durations.iter().find(|d| !d.is_finite() || **d <= 0.0) {
            return Err(Error::validation(format!(
                "image durations must be positive, got {bad}"
            )));
        }

        let entries = images
            .into_iter()
            .zip(durations)
            .map(|(asset, duration_secs)| ImageEntry {
                asset,
                duration_secs,
            })
            .collect();
        Ok(Self { entries, canvas })
    }

    /// Entries in playback order.
    pub fn entries(&self) -> &[ImageEntry] {
        &self.entries
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Sum of all per-image durations.
    pub fn total_duration(&self) -> f64 {
        self.entries.iter().map(|e| e.duration_secs).sum()
    }
}

/// A video whose audio track is replaced.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoReplaceSpec {
    pub video: MediaAsset,
    /// Duration declared by the client. Informational only; the probed
    /// duration decides looping.
    pub declared_duration: Option<f64>,
}

// ---------------------------------------------------------------------------
// Audio source
// ---------------------------------------------------------------------------

/// Where the request's audio comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioSource {
    /// A file the client uploaded, already on disk.
    Uploaded(MediaAsset),
    /// A file name in the built-in audio library.
    Builtin(String),
    /// A remote URL to download.
    Remote(String),
}

impl AudioSource {
    /// Pick one source from the optional fields.
    ///
    /// Precedence is upload, then built-in name, then URL. Blank strings count
    /// as absent. When nothing is supplied the result is
    /// [`Error::NoAudio`].
    pub fn select(
        upload: Option<MediaAsset>,
        builtin: Option<String>,
        remote: Option<String>,
    ) -> Result<Self> {
        let builtin = non_blank(builtin);
        let remote = non_blank(remote);

        let supplied = usize::from(upload.is_some())
            + usize::from(builtin.is_some())
            + usize::from(remote.is_some());
        if supplied > 1 {
            tracing::warn!(
                supplied,
                "more than one audio source supplied; using the highest-precedence one"
            );
        }

        if let Some(asset) = upload {
            Ok(Self::Uploaded(asset))
        } else if let Some(name) = builtin {
            Ok(Self::Builtin(name))
        } else if let Some(url) = remote {
            Ok(Self::Remote(url))
        } else {
            Err(Error::NoAudio)
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Uploaded(_) => "upload",
            Self::Builtin(_) => "builtin",
            Self::Remote(_) => "remote",
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// A fully validated composition request.
#[derive(Debug, Clone, PartialEq)]
pub enum ComposeRequest {
    Images {
        spec: ImageSequenceSpec,
        audio: AudioSource,
    },
    Video {
        spec: VideoReplaceSpec,
        audio: AudioSource,
    },
}

impl ComposeRequest {
    pub fn mode(&self) -> ComposeMode {
        match self {
            Self::Images { .. } => ComposeMode::Images,
            Self::Video { .. } => ComposeMode::Video,
        }
    }

    pub fn audio(&self) -> &AudioSource {
        match self {
            Self::Images { audio, .. } | Self::Video { audio, .. } => audio,
        }
    }
}

/// Raw submission fields before validation.
#[derive(Debug, Clone, Default)]
pub struct ComposeForm {
    /// Explicit `images` / `video` selector.
    pub mode: Option<String>,
    pub images: Vec<MediaAsset>,
    pub video: Option<MediaAsset>,
    /// JSON array of per-image durations in seconds.
    pub durations: Option<String>,
    /// Declared video duration (video mode, informational).
    pub duration: Option<String>,
    pub width: Option<String>,
    pub height: Option<String>,
    pub audio_upload: Option<MediaAsset>,
    pub audio_file_name: Option<String>,
    pub audio_url: Option<String>,
}

impl ComposeForm {
    /// Resolve the mode from the explicit selector, or from the payload shape
    /// when no selector was sent.
    pub fn resolve_mode(&self) -> Result<ComposeMode> {
        let explicit = match non_blank(self.mode.clone()) {
            Some(raw) => Some(raw.parse::<ComposeMode>()?),
            None => None,
        };
        let has_images = !self.images.is_empty();
        let has_video = self.video.is_some();

        match explicit {
            Some(ComposeMode::Images) if has_video => Err(Error::validation(
                "mode is 'images' but a video was uploaded",
            )),
            Some(ComposeMode::Video) if has_images => Err(Error::validation(
                "mode is 'video' but images were uploaded",
            )),
            Some(mode) => Ok(mode),
            None if has_video && has_images => Err(Error::validation(
                "upload either images or a video, not both",
            )),
            None if has_video => Ok(ComposeMode::Video),
            None => Ok(ComposeMode::Images),
        }
    }

    /// Validate the form into a [`ComposeRequest`].
    ///
    /// Visual inputs are checked before audio, so a request with too few
    /// images is rejected even when it also lacks audio.
    pub fn into_request(self, config: &ComposeConfig) -> Result<ComposeRequest> {
        match self.resolve_mode()? {
            ComposeMode::Images => {
                if self.images.len() < MIN_IMAGES {
                    return Err(Error::validation("Please upload at least 2 images."));
                }
                let durations = parse_durations(
                    self.durations.as_deref(),
                    self.images.len(),
                    config.default_image_duration_secs,
                )?;
                let canvas =
                    Canvas::from_fields(self.width.as_deref(), self.height.as_deref(), config)?;
                let spec = ImageSequenceSpec::new(self.images, durations, canvas)?;
                let audio =
                    AudioSource::select(self.audio_upload, self.audio_file_name, self.audio_url)?;
                Ok(ComposeRequest::Images { spec, audio })
            }
            ComposeMode::Video => {
                let video = self
                    .video
                    .ok_or_else(|| Error::validation("Invalid video file."))?;
                let declared_duration = self
                    .duration
                    .as_deref()
                    .and_then(|s| s.trim().parse::<f64>().ok())
                    .filter(|d| d.is_finite());
                if let Some(declared) = declared_duration {
                    tracing::debug!(declared, "client declared video duration; not used");
                }
                let audio =
                    AudioSource::select(self.audio_upload, self.audio_file_name, self.audio_url)?;
                Ok(ComposeRequest::Video {
                    spec: VideoReplaceSpec {
                        video,
                        declared_duration,
                    },
                    audio,
                })
            }
        }
    }
}

/// Parse the `durations` field for `count` images.
///
/// A JSON array of numbers (or numeric strings) with exactly `count` entries
/// is used as-is. Anything else (absent, malformed JSON, not an array,
/// non-numeric entries, wrong length) falls back to `default` for every
/// image. A well-formed array containing a zero, negative or non-finite
/// value is rejected.
pub fn parse_durations(raw: Option<&str>, count: usize, default: f64) -> Result<Vec<f64>> {
    let fallback = || vec![default; count];

    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(fallback());
    };

    let values = match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Array(items)) => items
            .iter()
            .map(|v| match v {
                serde_json::Value::Number(n) => n.as_f64(),
                serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            })
            .collect::<Option<Vec<f64>>>(),
        Ok(_) => None,
        Err(e) => {
            tracing::warn!(error = %e, "durations is not valid JSON; using defaults");
            return Ok(fallback());
        }
    };

    let Some(values) = values else {
        tracing::warn!("durations is not an array of numbers; using defaults");
        return Ok(fallback());
    };

    if values.len() != count {
        tracing::warn!(
            durations = values.len(),
            images = count,
            "durations length does not match image count; using defaults"
        );
        return Ok(fallback());
    }

    if let Some(bad) = values.iter().find(|d| !d.is_finite() || **d <= 0.0) {
        return Err(Error::validation(format!(
            "image durations must be positive, got {bad}"
        )));
    }

    Ok(values)
}
