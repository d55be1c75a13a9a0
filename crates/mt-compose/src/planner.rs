//! Composition planning: probe durations, decide looping, build encode plans.
//!
//! Audio must never run out before the visual track ends. When the target
//! duration exceeds the probed audio duration the audio input is looped
//! (`-stream_loop -1`) and the output is cut to the target.

use std::path::Path;

use tokio_util::sync::CancellationToken;

use mt_av::{DurationProbe, EncodeInput, EncodePlan};
use mt_core::config::ComposeConfig;
use mt_core::{JobId, MediaAsset};

use crate::request::{Canvas, ComposeMode, ImageSequenceSpec, VideoReplaceSpec};

/// The per-request plan state: durations, the loop decision and the resolved
/// audio.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositionJob {
    pub id: JobId,
    pub mode: ComposeMode,
    /// Length of the visual track in seconds.
    pub target_secs: f64,
    pub audio_secs: f64,
    pub loop_audio: bool,
    pub audio: MediaAsset,
}

impl CompositionJob {
    /// Plan a slideshow: the target is the sum of the image durations.
    pub async fn for_images(
        id: JobId,
        spec: &ImageSequenceSpec,
        audio: MediaAsset,
        probe: &dyn DurationProbe,
        cancel: &CancellationToken,
    ) -> Self {
        let target_secs = spec.total_duration();
        let audio_secs = probe.probe_duration(audio.path(), cancel).await;
        Self::decide(id, ComposeMode::Images, target_secs, audio_secs, audio)
    }

    /// Plan an audio replacement: the target is the probed video duration.
    pub async fn for_video(
        id: JobId,
        spec: &VideoReplaceSpec,
        audio: MediaAsset,
        probe: &dyn DurationProbe,
        cancel: &CancellationToken,
    ) -> Self {
        let (target_secs, audio_secs) = tokio::join!(
            probe.probe_duration(spec.video.path(), cancel),
            probe.probe_duration(audio.path(), cancel),
        );
        Self::decide(id, ComposeMode::Video, target_secs, audio_secs, audio)
    }

    fn decide(
        id: JobId,
        mode: ComposeMode,
        target_secs: f64,
        audio_secs: f64,
        audio: MediaAsset,
    ) -> Self {
        let loop_audio = should_loop(target_secs, audio_secs);
        tracing::info!(
            job_id = %id,
            %mode,
            target_secs,
            audio_secs,
            loop_audio,
            "composition planned"
        );
        Self {
            id,
            mode,
            target_secs,
            audio_secs,
            loop_audio,
            audio,
        }
    }
}

/// Loop the audio only when the visual track is strictly longer.
pub fn should_loop(target_secs: f64, audio_secs: f64) -> bool {
    target_secs > audio_secs
}

/// Scale to fit inside the canvas, keeping aspect ratio, then pad the rest
/// with black, centered.
pub fn scale_pad_filter(canvas: Canvas) -> String {
    let Canvas { width: w, height: h } = canvas;
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:color=black"
    )
}

/// Build the slideshow encode: concat manifest video plus (possibly looped)
/// audio, scaled and padded to the canvas, capped at the target duration.
pub fn image_sequence_plan(
    config: &ComposeConfig,
    job: &CompositionJob,
    manifest: &Path,
    canvas: Canvas,
    output: &Path,
) -> EncodePlan {
    EncodePlan::new(output)
        .input(
            EncodeInput::file(manifest)
                .format("concat")
                .option("safe", "0"),
        )
        .input(EncodeInput::file(job.audio.path()).looped(job.loop_audio))
        .map("0:v:0")
        .map("1:a:0")
        .video_filter(scale_pad_filter(canvas))
        .output_arg("-c:v", &config.video_codec)
        .output_arg("-pix_fmt", &config.pixel_format)
        .output_arg("-r", config.frame_rate.to_string())
        .output_arg("-t", job.target_secs.to_string())
        .output_arg("-c:a", &config.audio_codec)
        .output_arg("-b:a", &config.audio_bitrate)
}

/// Build the audio-replace encode: the video stream is copied untouched and
/// the audio is re-encoded, ending with the shorter stream.
pub fn audio_replace_plan(
    config: &ComposeConfig,
    job: &CompositionJob,
    video: &Path,
    output: &Path,
) -> EncodePlan {
    EncodePlan::new(output)
        .input(EncodeInput::file(video))
        .input(EncodeInput::file(job.audio.path()).looped(job.loop_audio))
        .map("0:v:0")
        .map("1:a:0")
        .output_arg("-c:v", "copy")
        .output_arg("-c:a", &config.audio_codec)
        .output_flag("-shortest")
}
