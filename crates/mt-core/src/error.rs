//! Unified error type for the montage application.
//!
//! All crates funnel their failures into [`Error`], which carries enough context
//! for API handlers to derive an HTTP status code via [`Error::http_status`].

/// Unified error type covering all failure modes in montage.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Request data failed validation (too few images, missing video, bad
    /// dimensions, non-positive durations).
    #[error("Validation error: {0}")]
    Validation(String),

    /// No audio field was supplied at all.
    #[error("No valid audio file provided.")]
    NoAudio,

    /// A built-in audio track was requested by a name the library does not
    /// contain.
    #[error("Unknown built-in audio track: {0}")]
    UnknownBuiltinTrack(String),

    /// Fetching a remote audio source failed (network error, timeout, non-2xx
    /// status, oversized or empty body). A malformed URL is a
    /// [`Error::Validation`] instead.
    #[error("Failed to download audio: {0}")]
    AudioDownload(String),

    /// The encoder failed to produce an output file.
    #[error("Encode failed: {0}")]
    Encode(String),

    /// An external tool (ffmpeg, ffprobe) returned an error.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// The encode queue is saturated and no slot became free in time.
    #[error("Server busy: {0}")]
    Busy(String),

    /// The request was cancelled before it completed.
    #[error("Request cancelled")]
    Cancelled,

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            Error::NoAudio => 400,
            Error::UnknownBuiltinTrack(_) => 400,
            Error::AudioDownload(_) => 500,
            Error::Encode(_) => 500,
            Error::Tool { .. } => 500,
            Error::Busy(_) => 503,
            Error::Cancelled => 503,
            Error::Io { .. } => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Short machine-readable code for API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation_error",
            Error::NoAudio => "no_audio",
            Error::UnknownBuiltinTrack(_) => "unknown_builtin_track",
            Error::AudioDownload(_) => "audio_download_error",
            Error::Encode(_) => "encode_error",
            Error::Tool { .. } => "tool_error",
            Error::Busy(_) => "busy",
            Error::Cancelled => "cancelled",
            Error::Io { .. } => "io_error",
            Error::Internal(_) => "internal_error",
        }
    }

    /// Convenience constructor for [`Error::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
