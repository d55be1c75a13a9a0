//! Scratch storage for intermediate and output files.
//!
//! A [`ScratchStore`] hands out uniquely named paths inside a shared scratch
//! directory. Collisions between concurrent requests are avoided by UUID
//! naming, not by locking.
//!
//! A [`ScratchSet`] is the per-request release set: every path allocated (or
//! adopted) through it is deleted when the set is released, or when it is
//! dropped on any other exit path (error return, panic, or the request future
//! being dropped after a client disconnect).

use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Longest file extension carried over from an upload's file name.
const MAX_EXTENSION_LEN: usize = 8;

/// Allocator for uniquely named files in the scratch directory.
#[derive(Debug, Clone)]
pub struct ScratchStore {
    dir: PathBuf,
}

impl ScratchStore {
    /// Use `dir` as the scratch directory. The directory is not created.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Build a store from configuration, creating the directory if needed.
    pub fn from_config(config: &mt_core::config::ScratchConfig) -> mt_core::Result<Self> {
        let dir = config.resolved_dir();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// The scratch directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Return a fresh path `<dir>/<uuid>.<suffix>`.
    ///
    /// A leading dot on `suffix` is ignored; an empty suffix yields a bare
    /// UUID file name. The file itself is not created.
    pub fn allocate(&self, suffix: &str) -> PathBuf {
        let suffix = suffix.trim_start_matches('.');
        let name = if suffix.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            format!("{}.{suffix}", Uuid::new_v4())
        };
        self.dir.join(name)
    }

    /// Delete every path, ignoring files that are already gone or cannot be
    /// removed.
    pub async fn release(&self, paths: impl IntoIterator<Item = PathBuf>) {
        for path in paths {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => tracing::trace!(file = %path.display(), "released scratch file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::debug!(file = %path.display(), error = %e, "failed to release scratch file");
                }
            }
        }
    }

    /// Start a new per-request release set.
    pub fn lease(&self) -> ScratchSet {
        ScratchSet {
            store: self.clone(),
            paths: Vec::new(),
        }
    }
}

/// Per-request set of scratch paths with guaranteed release.
#[derive(Debug)]
pub struct ScratchSet {
    store: ScratchStore,
    paths: Vec<PathBuf>,
}

impl ScratchSet {
    /// Allocate a fresh scratch path and track it for release.
    pub fn allocate(&mut self, suffix: &str) -> PathBuf {
        let path = self.store.allocate(suffix);
        self.paths.push(path.clone());
        path
    }

    /// Track a path created elsewhere so it is released with this set.
    pub fn adopt(&mut self, path: impl Into<PathBuf>) {
        self.paths.push(path.into());
    }

    /// Paths currently tracked.
    pub fn tracked(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Delete every tracked path.
    pub async fn release(mut self) {
        let paths = std::mem::take(&mut self.paths);
        self.store.release(paths).await;
    }
}

impl Drop for ScratchSet {
    fn drop(&mut self) {
        if self.paths.is_empty() {
            return;
        }
        tracing::debug!(count = self.paths.len(), "releasing scratch files on drop");
        for path in self.paths.drain(..) {
            if let Err(e) = std::fs::remove_file(&path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::debug!(file = %path.display(), error = %e, "failed to release scratch file");
                }
            }
        }
    }
}

/// Pick the scratch extension for an upload: the original file name's
/// extension when it is short and alphanumeric, otherwise `fallback`.
pub fn extension_for(file_name: Option<&str>, fallback: &str) -> String {
    file_name
        .map(Path::new)
        .and_then(|p| p.extension())
        .and_then(|e| e.to_str())
        .filter(|e| {
            !e.is_empty()
                && e.len() <= MAX_EXTENSION_LEN
                && e.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_else(|| fallback.to_string())
}
