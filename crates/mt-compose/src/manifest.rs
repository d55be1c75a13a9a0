//! Concatenation manifests for the ffmpeg `concat` demuxer.
//!
//! Each image is listed as `file '<path>'` followed by `duration <secs>`.
//! The last image is listed once more without a duration: the demuxer
//! ignores the final entry's duration otherwise, which would cut the last
//! frame short.

use std::path::Path;

use crate::request::ImageEntry;

/// Quote a path for a manifest `file` directive. Single quotes are escaped
/// as `'\''`.
pub fn quote_path(path: &Path) -> String {
    format!("'{}'", path.to_string_lossy().replace('\'', r"'\''"))
}

/// Render the manifest for `entries`, in order.
pub fn render(entries: &[ImageEntry]) -> String {
    let timed = entries.iter().map(|entry| {
        format!(
            "file {}\nduration {}\n",
            quote_path(entry.asset.path()),
            entry.duration_secs
        )
    });
    let tail = entries
        .last()
        .map(|last| format!("file {}\n", quote_path(last.asset.path())));
    timed.chain(tail).collect()
}

/// Write the manifest for `entries` to `path`.
pub async fn write(entries: &[ImageEntry], path: &Path) -> mt_core::Result<()> {
    tokio::fs::write(path, render(entries)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mt_core::{MediaAsset, MediaKind};

    fn entry(path: &str, secs: f64) -> ImageEntry {
        ImageEntry {
            asset: MediaAsset::upload(path, MediaKind::Image),
            duration_secs: secs,
        }
    }

    #[test]
    fn lists_each_image_then_repeats_the_last() {
        let manifest = render(&[entry("/s/a.png", 2.0), entry("/s/b.jpg", 3.5)]);
        assert_eq!(
            manifest,
            "file '/s/a.png'\nduration 2\nfile '/s/b.jpg'\nduration 3.5\nfile '/s/b.jpg'\n"
        );
    }

    #[test]
    fn single_quotes_are_escaped() {
        assert_eq!(quote_path(Path::new("/s/it's.png")), r"'/s/it'\''s.png'");
    }

    #[test]
    fn empty_entries_render_nothing() {
        assert_eq!(render(&[]), "");
    }

    #[tokio::test]
    async fn write_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.txt");
        write(&[entry("/s/a.png", 1.0), entry("/s/b.png", 1.0)], &path)
            .await
            .unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 5);
    }
}
