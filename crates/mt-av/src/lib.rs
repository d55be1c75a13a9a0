//! # mt-av
//!
//! External media tooling for the montage pipeline.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- find and cache paths to ffmpeg
//!   and ffprobe.
//! - **Command execution** ([`ToolCommand`]) -- async builder with timeout and
//!   cancellation support for running external processes.
//! - **Duration probing** ([`DurationProbe`], [`FfprobeDurationProber`]) --
//!   advisory media durations with a fixed fallback.
//! - **Scratch storage** ([`ScratchStore`], [`ScratchSet`]) -- uniquely named
//!   temporary files with guaranteed per-request release.
//! - **Encode plans** ([`EncodePlan`]) -- structured ffmpeg invocations.
//! - **Encode execution** ([`Encoder`]) -- bounded-concurrency ffmpeg runs.

pub mod command;
pub mod encode;
pub mod plan;
pub mod probe;
pub mod scratch;
pub mod tools;

// ---- Re-exports for convenience ----

pub use command::{ToolCommand, ToolOutput};
pub use encode::Encoder;
pub use plan::{EncodeInput, EncodePlan};
pub use probe::{DurationProbe, FfprobeDurationProber};
pub use scratch::{ScratchSet, ScratchStore};
pub use tools::{ToolInfo, ToolRegistry};
