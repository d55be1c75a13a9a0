//! CLI end-to-end tests
//!
//! Tests for the montage command-line interface.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

/// Get a command for the montage binary
#[allow(deprecated)]
fn montage_cmd() -> Command {
    Command::cargo_bin("montage").unwrap()
}

#[test]
fn test_cli_no_args_shows_help() {
    let mut cmd = montage_cmd();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_flag() {
    let mut cmd = montage_cmd();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("montage"))
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_version_flag() {
    let mut cmd = montage_cmd();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("montage"));
}

#[test]
fn test_cli_version_command() {
    let mut cmd = montage_cmd();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "montage {}",
            env!("CARGO_PKG_VERSION")
        )));
}

#[test]
fn test_cli_check_tools_command() {
    let mut cmd = montage_cmd();
    cmd.arg("check-tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("ffmpeg"))
        .stdout(predicate::str::contains("ffprobe"));
}

#[test]
fn test_cli_start_help() {
    let mut cmd = montage_cmd();
    cmd.args(["start", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Start the HTTP server"));
}

#[test]
fn test_cli_images_help() {
    let mut cmd = montage_cmd();
    cmd.args(["images", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--durations"))
        .stdout(predicate::str::contains("--audio"));
}

#[test]
fn test_cli_images_requires_audio() {
    let mut cmd = montage_cmd();
    cmd.args(["images", "a.png", "b.png"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--audio"));
}

#[test]
fn test_cli_images_missing_input_fails() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("out.mp4");

    let mut cmd = montage_cmd();
    cmd.args(["images", "/nonexistent/a.png", "/nonexistent/b.png"])
        .args(["--audio", "calm.mp3"])
        .arg("--output")
        .arg(&output)
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));

    assert!(!output.exists());
}

#[test]
fn test_cli_video_missing_input_fails() {
    let mut cmd = montage_cmd();
    cmd.args(["video", "/nonexistent/clip.mp4", "--audio", "calm.mp3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_cli_probe_missing_file_fails() {
    let mut cmd = montage_cmd();
    cmd.args(["probe", "/nonexistent/song.mp3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_cli_validate_without_config_uses_defaults() {
    let mut cmd = montage_cmd();
    cmd.arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("using defaults"))
        .stdout(predicate::str::contains("Canvas: 720x1280"));
}

#[test]
fn test_cli_validate_config_file() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("montage.json");
    fs::write(
        &config_path,
        r#"{
            "server": { "host": "127.0.0.1", "port": 9090 },
            "encode": { "max_concurrent": 3 }
        }"#,
    )
    .unwrap();

    let mut cmd = montage_cmd();
    cmd.arg("validate")
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("127.0.0.1:9090"))
        .stdout(predicate::str::contains("Max concurrent encodes: 3"));
}

#[test]
fn test_cli_validate_reports_warnings() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("montage.json");
    fs::write(&config_path, r#"{ "encode": { "max_concurrent": 0 } }"#).unwrap();

    let mut cmd = montage_cmd();
    cmd.arg("validate")
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Warnings:"))
        .stdout(predicate::str::contains("max_concurrent is 0"));
}

#[test]
fn test_cli_validate_invalid_json_fails() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("broken.json");
    fs::write(&config_path, "{ not json").unwrap();

    let mut cmd = montage_cmd();
    cmd.arg("validate").arg(&config_path).assert().failure();
}

#[test]
fn test_cli_images_durations_mismatch_fails() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a.png");
    let b = dir.path().join("b.png");
    fs::write(&a, b"a").unwrap();
    fs::write(&b, b"b").unwrap();

    let mut cmd = montage_cmd();
    cmd.arg("images")
        .arg(&a)
        .arg(&b)
        .args(["-d", "2,3,4", "--audio", "calm.mp3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("3 values but 2 images"));
}

#[cfg(unix)]
mod compose {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    /// Writes its argument list into the output path (the last argument).
    const FAKE_FFMPEG: &str = r#"#!/bin/sh
if [ "$1" = "-version" ]; then echo "ffmpeg version test"; exit 0; fi
for last; do :; done
printf '%s\n' "$@" > "$last"
"#;

    /// Every file is three seconds long.
    const FAKE_FFPROBE: &str = r#"#!/bin/sh
if [ "$1" = "-version" ]; then echo "ffprobe version test"; exit 0; fi
echo 3.000000
"#;

    struct Workspace {
        _root: tempfile::TempDir,
        dir: PathBuf,
        config: PathBuf,
        scratch: PathBuf,
    }

    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn workspace() -> Workspace {
        let root = tempdir().unwrap();
        let dir = root.path().to_path_buf();
        let scratch = dir.join("scratch");
        let music = dir.join("music");
        fs::create_dir_all(&scratch).unwrap();
        fs::create_dir_all(&music).unwrap();
        fs::write(music.join("calm.mp3"), b"ID3").unwrap();

        let config = dir.join("montage.json");
        let json = serde_json::json!({
            "tools": {
                "ffmpeg_path": script(&dir, "ffmpeg", FAKE_FFMPEG),
                "ffprobe_path": script(&dir, "ffprobe", FAKE_FFPROBE),
            },
            "scratch": { "dir": scratch },
            "audio": { "library_dir": music },
        });
        fs::write(&config, json.to_string()).unwrap();

        Workspace {
            _root: root,
            dir,
            config,
            scratch,
        }
    }

    #[test]
    fn images_compose_keeps_inputs_and_empties_scratch() {
        let ws = workspace();
        let a = ws.dir.join("a.png");
        let b = ws.dir.join("b.png");
        let song = ws.dir.join("song.mp3");
        fs::write(&a, b"a").unwrap();
        fs::write(&b, b"b").unwrap();
        fs::write(&song, b"ID3").unwrap();
        let output = ws.dir.join("out.mp4");

        let mut cmd = montage_cmd();
        cmd.current_dir(&ws.dir)
            .arg("--config")
            .arg(&ws.config)
            .arg("images")
            .arg(&a)
            .arg(&b)
            .args(["-d", "2,2", "--audio"])
            .arg(&song)
            .arg("-o")
            .arg(&output)
            .assert()
            .success()
            .stdout(predicate::str::contains("Wrote"))
            .stdout(predicate::str::contains("Audio: looped"));

        // 4s of images against 3s of audio.
        let args = fs::read_to_string(&output).unwrap();
        assert!(args.lines().any(|l| l == "-stream_loop"));
        assert!(args.lines().any(|l| l == song.to_str().unwrap()));

        assert!(a.exists() && b.exists() && song.exists());
        assert_eq!(fs::read_dir(&ws.scratch).unwrap().count(), 0);
    }

    #[test]
    fn video_compose_with_builtin_track() {
        let ws = workspace();
        let clip = ws.dir.join("clip.mp4");
        fs::write(&clip, b"fake mp4").unwrap();
        let output = ws.dir.join("out.mp4");

        let mut cmd = montage_cmd();
        cmd.current_dir(&ws.dir)
            .arg("--config")
            .arg(&ws.config)
            .arg("video")
            .arg(&clip)
            .args(["--audio", "calm.mp3", "-o"])
            .arg(&output)
            .assert()
            .success()
            .stdout(predicate::str::contains("Audio: trimmed"));

        let args = fs::read_to_string(&output).unwrap();
        assert!(args.lines().any(|l| l == "-shortest"));
        assert!(args.lines().any(|l| l.ends_with("music/calm.mp3")));
        assert!(clip.exists());
        assert!(ws.dir.join("music/calm.mp3").exists());
        assert_eq!(fs::read_dir(&ws.scratch).unwrap().count(), 0);
    }
}
