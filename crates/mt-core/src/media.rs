//! Media asset model: what a file is and where it came from.
//!
//! All enums serialize in lowercase (via `serde(rename_all = "lowercase")`) and
//! implement `Display` manually for consistent string representation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// MediaKind
// ---------------------------------------------------------------------------

/// The kind of media a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

impl MediaKind {
    /// Extension used for scratch files when the upload carries none.
    pub fn default_extension(&self) -> &'static str {
        match self {
            Self::Image => "png",
            Self::Video => "mp4",
            Self::Audio => "mp3",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image => write!(f, "image"),
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
        }
    }
}

// ---------------------------------------------------------------------------
// AssetOrigin
// ---------------------------------------------------------------------------

/// Where an asset came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetOrigin {
    /// Saved from a client upload.
    Upload,
    /// A file in the built-in audio library. Never deleted by a request.
    Builtin,
    /// Downloaded from a remote URL.
    Remote,
}

impl fmt::Display for AssetOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upload => write!(f, "upload"),
            Self::Builtin => write!(f, "builtin"),
            Self::Remote => write!(f, "remote"),
        }
    }
}

// ---------------------------------------------------------------------------
// MediaAsset
// ---------------------------------------------------------------------------

/// A local media file owned by a single request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAsset {
    pub path: PathBuf,
    pub kind: MediaKind,
    pub origin: AssetOrigin,
}

impl MediaAsset {
    pub fn new(path: impl Into<PathBuf>, kind: MediaKind, origin: AssetOrigin) -> Self {
        Self {
            path: path.into(),
            kind,
            origin,
        }
    }

    /// An uploaded file already materialized on disk.
    pub fn upload(path: impl Into<PathBuf>, kind: MediaKind) -> Self {
        Self::new(path, kind, AssetOrigin::Upload)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
