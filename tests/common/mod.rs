//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which builds a full [`AppContext`] on top of a
//! temporary scratch directory, a small built-in audio library and fake
//! `ffmpeg`/`ffprobe` scripts, plus [`MultipartBody`] for building upload
//! requests by hand.

#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use axum::body::Body;
use axum::http::{header, Request};
use axum::Router;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use mt_core::config::Config;
use mt_server::context::AppContext;
use mt_server::router::build_router;

/// Fake ffmpeg: writes its own argument list into the output path (the last
/// argument), one per line, so tests can inspect the plan it was given.
const FAKE_FFMPEG: &str = r#"#!/bin/sh
if [ "$1" = "-version" ]; then echo "ffmpeg version test"; exit 0; fi
for last; do :; done
printf '%s\n' "$@" > "$last"
"#;

/// Fake ffprobe: durations keyed by file name. Library tracks are named for
/// their length; uploaded videos report 20s, anything else 10s.
const FAKE_FFPROBE: &str = r#"#!/bin/sh
if [ "$1" = "-version" ]; then echo "ffprobe version test"; exit 0; fi
for last; do :; done
case "$(basename "$last")" in
  five.mp3) echo 5.000000 ;;
  thirty.mp3) echo 30.000000 ;;
  *.mp4) echo 20.000000 ;;
  *) echo 10.000000 ;;
esac
"#;

/// Test harness wrapping a fully-constructed [`AppContext`].
pub struct TestHarness {
    pub ctx: AppContext,
    pub scratch_dir: PathBuf,
    pub library_dir: PathBuf,
    _root: TempDir,
}

impl TestHarness {
    /// Harness with fake tools and the default library (`five.mp3`,
    /// `thirty.mp3`).
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Harness with fake tools, after letting `adjust` tweak the config.
    pub fn with_config(adjust: impl FnOnce(&mut Config)) -> Self {
        let root = tempfile::tempdir().expect("failed to create temp dir");
        let scratch_dir = root.path().join("scratch");
        let library_dir = root.path().join("music");
        let bin_dir = root.path().join("bin");
        for dir in [&scratch_dir, &library_dir, &bin_dir] {
            std::fs::create_dir_all(dir).expect("failed to create fixture dir");
        }
        for track in ["five.mp3", "thirty.mp3"] {
            std::fs::write(library_dir.join(track), b"ID3").expect("failed to write track");
        }

        let mut config = Config::default();
        config.scratch.dir = Some(scratch_dir.clone());
        config.audio.library_dir = library_dir.clone();
        config.tools.ffmpeg_path = Some(write_script(&bin_dir, "ffmpeg", FAKE_FFMPEG));
        config.tools.ffprobe_path = Some(write_script(&bin_dir, "ffprobe", FAKE_FFPROBE));
        config.encode.max_concurrent = 2;
        adjust(&mut config);

        let ctx = AppContext::build(config, CancellationToken::new())
            .expect("failed to build app context");

        Self {
            ctx,
            scratch_dir,
            library_dir,
            _root: root,
        }
    }

    /// A fresh router over this harness's context.
    pub fn router(&self) -> Router {
        build_router(self.ctx.clone(), None)
    }

    /// Number of files left in the scratch directory.
    pub fn scratch_files(&self) -> usize {
        std::fs::read_dir(&self.scratch_dir)
            .expect("failed to read scratch dir")
            .count()
    }
}

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).expect("failed to write script");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("failed to chmod script");
    path
}

/// Hand-built `multipart/form-data` body.
pub struct MultipartBody {
    boundary: &'static str,
    bytes: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self {
            boundary: "montage-test-boundary",
            bytes: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.bytes.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, data: &[u8]) -> Self {
        self.bytes.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self.bytes.extend_from_slice(data);
        self.bytes.extend_from_slice(b"\r\n");
        self
    }

    /// Two or more PNG-ish image parts under the `images` field.
    pub fn images(self, count: usize) -> Self {
        (0..count).fold(self, |body, i| {
            body.file("images", &format!("photo{i}.png"), "image/png", b"\x89PNG fake")
        })
    }

    /// Finish the body into a `POST /api/create-video` request.
    pub fn into_request(mut self) -> Request<Body> {
        self.bytes
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        Request::builder()
            .method("POST")
            .uri("/api/create-video")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", self.boundary),
            )
            .body(Body::from(self.bytes))
            .expect("failed to build request")
    }
}

/// Collect a response body.
pub async fn body_bytes(body: Body) -> Vec<u8> {
    body.collect()
        .await
        .expect("failed to read body")
        .to_bytes()
        .to_vec()
}

/// Collect a response body as JSON.
pub async fn body_json(body: Body) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(body).await).expect("body is not JSON")
}
