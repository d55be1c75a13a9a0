//! mt-compose: the media composition pipeline.
//!
//! Turns an ordered set of still images, or a single video clip, plus one
//! audio source into a finished MP4. The pipeline is:
//!
//! 1. [`request`] -- validate the submitted fields into a tagged
//!    [`ComposeRequest`].
//! 2. [`audio`] -- resolve the [`AudioSource`] to one local file.
//! 3. [`planner`] -- probe durations, decide whether the audio loops and
//!    build the [`mt_av::EncodePlan`].
//! 4. [`orchestrator`] -- run the encode, read the output and release every
//!    scratch asset the request created.

pub mod audio;
pub mod manifest;
pub mod orchestrator;
pub mod planner;
pub mod request;

pub use audio::AudioResolver;
pub use orchestrator::{ComposeOutput, Composer};
pub use planner::CompositionJob;
pub use request::{
    AudioSource, Canvas, ComposeForm, ComposeMode, ComposeRequest, ImageEntry,
    ImageSequenceSpec, VideoReplaceSpec,
};
