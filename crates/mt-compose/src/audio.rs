//! Audio source resolution.
//!
//! [`AudioResolver`] turns an [`AudioSource`] into exactly one local audio
//! file. Uploaded files are used in place, built-in tracks are looked up in
//! the library directory by exact file name, and remote URLs are streamed
//! into a scratch file owned by the request's [`ScratchSet`].

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use mt_av::scratch::extension_for;
use mt_av::ScratchSet;
use mt_core::config::AudioConfig;
use mt_core::{AssetOrigin, Error, MediaAsset, MediaKind, Result};

use crate::request::AudioSource;

/// Extensions listed by [`AudioResolver::list_builtin`].
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "aac", "wav", "ogg", "flac", "opus"];

/// Resolves audio sources to local files.
#[derive(Debug, Clone)]
pub struct AudioResolver {
    library_dir: PathBuf,
    client: reqwest::Client,
    timeout: Duration,
    max_download_bytes: u64,
}

impl AudioResolver {
    /// Build a resolver with a shared HTTP client.
    pub fn new(config: &AudioConfig) -> Result<Self> {
        let timeout = config.download_timeout();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("montage/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            library_dir: config.library_dir.clone(),
            client,
            timeout,
            max_download_bytes: config.max_download_bytes,
        })
    }

    /// Resolve `source` to a local audio asset.
    ///
    /// Downloaded files are tracked by `scratch` from the moment their path is
    /// allocated, so a failed or cancelled download leaves nothing behind once
    /// the set is released.
    pub async fn resolve(
        &self,
        source: &AudioSource,
        scratch: &mut ScratchSet,
        cancel: &CancellationToken,
    ) -> Result<MediaAsset> {
        match source {
            AudioSource::Uploaded(asset) => Ok(asset.clone()),
            AudioSource::Builtin(name) => self.resolve_builtin(name).await,
            AudioSource::Remote(url) => {
                tokio::select! {
                    result = self.download(url, scratch) => result,
                    _ = cancel.cancelled() => Err(Error::Cancelled),
                }
            }
        }
    }

    /// Look up a built-in track by exact file name.
    pub async fn resolve_builtin(&self, name: &str) -> Result<MediaAsset> {
        let name = validate_builtin_name(name)?;
        let path = self.library_dir.join(name);

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {
                tracing::debug!(track = name, "resolved built-in audio track");
                Ok(MediaAsset::new(path, MediaKind::Audio, AssetOrigin::Builtin))
            }
            _ => Err(Error::UnknownBuiltinTrack(name.to_string())),
        }
    }

    async fn download(&self, url: &str, scratch: &mut ScratchSet) -> Result<MediaAsset> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| Error::validation(format!("invalid audio URL: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::validation(format!(
                "unsupported audio URL scheme '{}'",
                parsed.scheme()
            )));
        }

        tracing::info!(host = parsed.host_str().unwrap_or(""), "downloading remote audio");

        let response = self
            .client
            .get(parsed.clone())
            .send()
            .await
            .map_err(|e| self.download_error(e))?;

        if !response.status().is_success() {
            return Err(Error::AudioDownload(format!("HTTP {}", response.status())));
        }

        if let Some(len) = response.content_length() {
            if len > self.max_download_bytes {
                return Err(self.too_large());
            }
        }

        let file_name = parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .map(str::to_string);
        let path = scratch.allocate(&extension_for(file_name.as_deref(), "mp3"));
        let mut file = tokio::fs::File::create(&path).await?;

        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| self.download_error(e))?;
            written += chunk.len() as u64;
            if written > self.max_download_bytes {
                return Err(self.too_large());
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        if written == 0 {
            return Err(Error::AudioDownload("empty response body".into()));
        }

        tracing::debug!(bytes = written, file = %path.display(), "remote audio saved");
        Ok(MediaAsset::new(path, MediaKind::Audio, AssetOrigin::Remote))
    }

    fn download_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::AudioDownload(format!("timed out after {:?}", self.timeout))
        } else {
            Error::AudioDownload(e.to_string())
        }
    }

    fn too_large(&self) -> Error {
        Error::AudioDownload(format!(
            "response exceeds the {} byte limit",
            self.max_download_bytes
        ))
    }

    /// File names of the built-in audio tracks, sorted. A missing library
    /// directory yields an empty list.
    pub async fn list_builtin(&self) -> Result<Vec<String>> {
        let mut dir = match tokio::fs::read_dir(&self.library_dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let is_audio = Path::new(&name)
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| AUDIO_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
            if is_audio && !name.starts_with('.') {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Accept only a bare file name: no separators, no `.`/`..` components.
pub fn validate_builtin_name(name: &str) -> Result<&str> {
    let name = name.trim();
    let mut components = Path::new(name).components();
    let single_normal = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );

    if name.is_empty() || !single_normal || name.contains(['/', '\\']) {
        return Err(Error::UnknownBuiltinTrack(name.to_string()));
    }
    Ok(name)
}
