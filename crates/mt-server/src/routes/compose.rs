//! `POST /api/create-video`: multipart upload in, MP4 out.
//!
//! Uploaded files are streamed straight into the scratch directory and
//! tracked by the request's release set as soon as their path is allocated,
//! so a request that fails halfway through decoding leaves nothing behind.

use axum::extract::multipart::{Field, MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::{header, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde_json::json;
use tokio::io::AsyncWriteExt;

use mt_av::scratch::extension_for;
use mt_av::ScratchSet;
use mt_compose::ComposeForm;
use mt_core::{Error, MediaAsset, MediaKind};

use crate::context::AppContext;
use crate::error::AppError;
use crate::middleware::request_id::RequestId;

static X_JOB_ID: HeaderName = HeaderName::from_static("x-job-id");

/// POST /api/create-video
pub async fn create_video(
    State(ctx): State<AppContext>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError> {
    compose_upload(&ctx, multipart)
        .await
        .map_err(|e| e.with_request_id(request_id))
}

/// Any other method on `/api/create-video`.
pub async fn method_not_allowed(
    Extension(RequestId(request_id)): Extension<RequestId>,
) -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "POST")],
        Json(json!({
            "error": "Method not allowed",
            "code": "method_not_allowed",
            "request_id": request_id,
        })),
    )
        .into_response()
}

async fn compose_upload(
    ctx: &AppContext,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError> {
    let multipart = multipart.map_err(|rejection| {
        AppError::new(Error::validation(rejection.body_text())).with_status(rejection.status())
    })?;

    let mut scratch = ctx.scratch.lease();
    let form = read_form(multipart, &mut scratch).await?;
    tracing::info!(
        images = form.images.len(),
        video = form.video.is_some(),
        mode = form.mode.as_deref().unwrap_or("auto"),
        "upload received"
    );

    let request = form.into_request(ctx.composer.config())?;
    let cancel = ctx.shutdown.child_token();
    let output = ctx.composer.compose(request, scratch, &cancel).await?;

    let headers = [
        (header::CONTENT_TYPE, output.content_type.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", output.file_name),
        ),
        (X_JOB_ID.clone(), output.job_id.to_string()),
    ];
    Ok((headers, output.bytes).into_response())
}

/// Decode the multipart body into a [`ComposeForm`], saving file parts into
/// `scratch`.
///
/// Accepted fields: `images` / `images[]` (repeated), `video`, `audio` (files);
/// `durations`, `duration`, `width`, `height`, `mode`, `audioFileName`,
/// `audioUrl` (text). Unknown fields are skipped. Empty file parts (a file
/// input left blank) count as absent.
pub async fn read_form(
    mut multipart: Multipart,
    scratch: &mut ScratchSet,
) -> Result<ComposeForm, AppError> {
    let mut form = ComposeForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "images" | "images[]" | "image" => {
                if let Some(asset) = save_upload(field, scratch, MediaKind::Image).await? {
                    form.images.push(asset);
                }
            }
            "video" => {
                if let Some(asset) = save_upload(field, scratch, MediaKind::Video).await? {
                    if form.video.is_some() {
                        return Err(Error::validation("only one video may be uploaded").into());
                    }
                    form.video = Some(asset);
                }
            }
            "audio" => {
                if let Some(asset) = save_upload(field, scratch, MediaKind::Audio).await? {
                    if form.audio_upload.is_some() {
                        return Err(Error::validation("only one audio file may be uploaded").into());
                    }
                    form.audio_upload = Some(asset);
                }
            }
            "durations" => form.durations = Some(text(field).await?),
            "duration" => form.duration = Some(text(field).await?),
            "width" => form.width = Some(text(field).await?),
            "height" => form.height = Some(text(field).await?),
            "mode" => form.mode = Some(text(field).await?),
            "audioFileName" => form.audio_file_name = Some(text(field).await?),
            "audioUrl" => form.audio_url = Some(text(field).await?),
            other => tracing::debug!(field = other, "ignoring unknown form field"),
        }
    }

    Ok(form)
}

async fn save_upload(
    mut field: Field<'_>,
    scratch: &mut ScratchSet,
    kind: MediaKind,
) -> Result<Option<MediaAsset>, AppError> {
    let extension = extension_for(field.file_name(), kind.default_extension());
    let path = scratch.allocate(&extension);
    let mut file = tokio::fs::File::create(&path).await.map_err(Error::from)?;

    let mut written: u64 = 0;
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        written += chunk.len() as u64;
        file.write_all(&chunk).await.map_err(Error::from)?;
    }
    file.flush().await.map_err(Error::from)?;

    if written == 0 {
        tracing::debug!(%kind, "empty file part; treating as absent");
        return Ok(None);
    }

    tracing::debug!(%kind, bytes = written, file = %path.display(), "upload saved");
    Ok(Some(MediaAsset::upload(path, kind)))
}

async fn text(field: Field<'_>) -> Result<String, AppError> {
    field.text().await.map_err(multipart_error)
}

fn multipart_error(e: MultipartError) -> AppError {
    let status = e.status();
    AppError::new(Error::validation(format!(
        "invalid multipart body: {}",
        e.body_text()
    )))
    .with_status(status)
}
