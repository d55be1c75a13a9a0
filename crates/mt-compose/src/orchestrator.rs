//! Request orchestration.
//!
//! [`Composer::compose`] drives one request end to end: resolve audio, probe,
//! plan, encode, read the output back. Every scratch asset the request owns
//! (uploads, downloaded audio, the manifest, the output) lives in the
//! request's [`ScratchSet`], which is released before `compose` returns,
//! whatever the outcome.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use mt_av::{DurationProbe, Encoder, FfprobeDurationProber, ScratchSet, ToolRegistry};
use mt_core::config::{ComposeConfig, Config};
use mt_core::{JobId, Result};

use crate::audio::AudioResolver;
use crate::manifest;
use crate::planner::{self, CompositionJob};
use crate::request::ComposeRequest;

/// Download name of every produced video.
pub const OUTPUT_FILE_NAME: &str = "output.mp4";
/// Content type of every produced video.
pub const OUTPUT_CONTENT_TYPE: &str = "video/mp4";

/// A finished composition.
#[derive(Debug, Clone)]
pub struct ComposeOutput {
    pub job_id: JobId,
    pub bytes: Vec<u8>,
    pub file_name: &'static str,
    pub content_type: &'static str,
    /// Length of the visual track in seconds.
    pub duration_secs: f64,
    pub loop_audio: bool,
}

/// Runs composition requests. Cheap to clone; all state is shared.
#[derive(Clone)]
pub struct Composer {
    config: Arc<ComposeConfig>,
    probe: Arc<dyn DurationProbe>,
    resolver: Arc<AudioResolver>,
    encoder: Arc<Encoder>,
}

impl Composer {
    pub fn new(
        config: ComposeConfig,
        probe: Arc<dyn DurationProbe>,
        resolver: AudioResolver,
        encoder: Encoder,
    ) -> Self {
        Self {
            config: Arc::new(config),
            probe,
            resolver: Arc::new(resolver),
            encoder: Arc::new(encoder),
        }
    }

    /// Wire a composer from application config and discovered tools.
    pub fn from_config(config: &Config, tools: &ToolRegistry) -> Result<Self> {
        let probe = FfprobeDurationProber::from_registry(tools, &config.encode);
        let resolver = AudioResolver::new(&config.audio)?;
        let encoder = Encoder::from_registry(tools, &config.encode);
        Ok(Self::new(
            config.compose.clone(),
            Arc::new(probe),
            resolver,
            encoder,
        ))
    }

    pub fn config(&self) -> &ComposeConfig {
        &self.config
    }

    pub fn resolver(&self) -> &AudioResolver {
        &self.resolver
    }

    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    /// Run `request` to completion and release `scratch`.
    ///
    /// `scratch` must already track every uploaded file the request carries.
    /// Built-in library tracks are never added to it.
    pub async fn compose(
        &self,
        request: ComposeRequest,
        mut scratch: ScratchSet,
        cancel: &CancellationToken,
    ) -> Result<ComposeOutput> {
        let job_id = JobId::new();
        let span = tracing::info_span!("compose", %job_id, mode = %request.mode());

        let result = self
            .run(job_id, request, &mut scratch, cancel)
            .instrument(span)
            .await;

        scratch.release().await;

        match &result {
            Ok(output) => tracing::info!(
                %job_id,
                bytes = output.bytes.len(),
                loop_audio = output.loop_audio,
                "composition finished"
            ),
            Err(e) => tracing::warn!(%job_id, error = %e, "composition failed"),
        }
        result
    }

    async fn run(
        &self,
        job_id: JobId,
        request: ComposeRequest,
        scratch: &mut ScratchSet,
        cancel: &CancellationToken,
    ) -> Result<ComposeOutput> {
        tracing::debug!(audio_source = request.audio().kind(), "resolving audio");
        let audio = self.resolver.resolve(request.audio(), scratch, cancel).await?;

        let probe = self.probe.as_ref();
        let (job, plan) = match &request {
            ComposeRequest::Images { spec, .. } => {
                let job = CompositionJob::for_images(job_id, spec, audio, probe, cancel).await;
                let list = scratch.allocate("txt");
                manifest::write(spec.entries(), &list).await?;
                let output = scratch.allocate("mp4");
                let plan =
                    planner::image_sequence_plan(&self.config, &job, &list, spec.canvas(), &output);
                (job, plan)
            }
            ComposeRequest::Video { spec, .. } => {
                let job = CompositionJob::for_video(job_id, spec, audio, probe, cancel).await;
                let output = scratch.allocate("mp4");
                let plan =
                    planner::audio_replace_plan(&self.config, &job, spec.video.path(), &output);
                (job, plan)
            }
        };

        let output = self.encoder.execute(&plan, cancel).await?;
        let bytes = tokio::fs::read(&output).await?;

        Ok(ComposeOutput {
            job_id,
            bytes,
            file_name: OUTPUT_FILE_NAME,
            content_type: OUTPUT_CONTENT_TYPE,
            duration_secs: job.target_secs,
            loop_audio: job.loop_audio,
        })
    }
}
