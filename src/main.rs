mod cli;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use tokio_util::sync::CancellationToken;

use mt_av::{DurationProbe, FfprobeDurationProber, ScratchStore, ToolRegistry};
use mt_compose::{AudioSource, ComposeForm, Composer};
use mt_core::config::Config;
use mt_core::{MediaAsset, MediaKind};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "montage=debug,mt_core=debug,mt_av=debug,mt_compose=debug,mt_server=debug,tower_http=debug"
                .to_string()
        } else {
            "montage=info,mt_av=info,mt_compose=info,mt_server=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Start { host, port } => {
            let mut config = Config::load_or_default(config_path);
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(mt_server::start(config, CancellationToken::new()))?;
            Ok(())
        }
        Commands::Images {
            images,
            durations,
            audio,
            output,
            width,
            height,
        } => {
            let config = Config::load_or_default(config_path);
            let form = images_form(&images, &durations, &audio, width, height)?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(compose_to_file(config, form, &output))
        }
        Commands::Video {
            video,
            audio,
            output,
        } => {
            let config = Config::load_or_default(config_path);
            let form = video_form(&video, &audio)?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(compose_to_file(config, form, &output))
        }
        Commands::Probe { file, json } => {
            let config = Config::load_or_default(config_path);
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(probe_file(&config, &file, json))
        }
        Commands::CheckTools => {
            let config = Config::load_or_default(config_path);
            check_tools(&config)
        }
        Commands::Validate {
            config: validate_path,
        } => {
            let path = validate_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("montage {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Interpret an `--audio` argument: a URL, an existing local file, or a
/// built-in library name.
fn audio_source(raw: &str) -> AudioSource {
    if raw.starts_with("http://") || raw.starts_with("https://") {
        AudioSource::Remote(raw.to_string())
    } else if Path::new(raw).is_file() {
        AudioSource::Uploaded(MediaAsset::upload(raw, MediaKind::Audio))
    } else {
        AudioSource::Builtin(raw.to_string())
    }
}

fn apply_audio(form: &mut ComposeForm, raw: &str) {
    match audio_source(raw) {
        AudioSource::Uploaded(asset) => form.audio_upload = Some(asset),
        AudioSource::Builtin(name) => form.audio_file_name = Some(name),
        AudioSource::Remote(url) => form.audio_url = Some(url),
    }
}

fn require_file(path: &Path) -> Result<()> {
    if !path.is_file() {
        anyhow::bail!("Input file does not exist: {:?}", path);
    }
    Ok(())
}

fn images_form(
    images: &[PathBuf],
    durations: &[f64],
    audio: &str,
    width: Option<u32>,
    height: Option<u32>,
) -> Result<ComposeForm> {
    for image in images {
        require_file(image)?;
    }
    if !durations.is_empty() && durations.len() != images.len() {
        anyhow::bail!(
            "--durations has {} values but {} images were given",
            durations.len(),
            images.len()
        );
    }

    let mut form = ComposeForm {
        mode: Some("images".into()),
        images: images
            .iter()
            .map(|p| MediaAsset::upload(p, MediaKind::Image))
            .collect(),
        durations: if durations.is_empty() {
            None
        } else {
            Some(serde_json::to_string(durations)?)
        },
        width: width.map(|w| w.to_string()),
        height: height.map(|h| h.to_string()),
        ..Default::default()
    };
    apply_audio(&mut form, audio);
    Ok(form)
}

fn video_form(video: &Path, audio: &str) -> Result<ComposeForm> {
    require_file(video)?;
    let mut form = ComposeForm {
        mode: Some("video".into()),
        video: Some(MediaAsset::upload(video, MediaKind::Video)),
        ..Default::default()
    };
    apply_audio(&mut form, audio);
    Ok(form)
}

/// Run one composition from local files and write the result to `output`.
///
/// Local inputs are never added to the release set, so only intermediate
/// files (manifest, downloaded audio, encoder output) are removed.
async fn compose_to_file(config: Config, form: ComposeForm, output: &Path) -> Result<()> {
    let tools = ToolRegistry::discover(&config.tools);
    let store = ScratchStore::from_config(&config.scratch)?;
    let composer = Composer::from_config(&config, &tools)?;
    let request = form.into_request(&config.compose)?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted; cancelling composition");
            on_signal.cancel();
        }
    });

    let result = composer.compose(request, store.lease(), &cancel).await?;
    tokio::fs::write(output, &result.bytes)
        .await
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!("Wrote {} ({} bytes)", output.display(), result.bytes.len());
    println!("Duration: {:.2}s", result.duration_secs);
    println!(
        "Audio: {}",
        if result.loop_audio { "looped" } else { "trimmed" }
    );
    Ok(())
}

async fn probe_file(config: &Config, file: &Path, json: bool) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let tools = ToolRegistry::discover(&config.tools);
    let prober: Arc<dyn DurationProbe> =
        Arc::new(FfprobeDurationProber::from_registry(&tools, &config.encode));
    let secs = prober
        .probe_duration(file, &CancellationToken::new())
        .await;

    if json {
        let value = serde_json::json!({
            "file": file,
            "duration_secs": secs,
            "prober": prober.name(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("File: {}", file.display());
        println!("Duration: {secs:.3}s");
    }
    Ok(())
}

fn check_tools(config: &Config) -> Result<()> {
    println!("Checking external tools...\n");

    let tools = ToolRegistry::discover(&config.tools).check_all();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install ffmpeg to compose videos.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = Config::load(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Audio library: {}", config.audio.library_dir.display());
    println!("  Scratch dir: {}", config.scratch.resolved_dir().display());
    println!(
        "  Canvas: {}x{}",
        config.compose.default_width, config.compose.default_height
    );
    println!("  Max concurrent encodes: {}", config.encode.max_concurrent);

    let warnings = config.validate();
    if !warnings.is_empty() {
        println!("\nWarnings:");
        for warning in warnings {
            println!("  - {warning}");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_argument_interpretation() {
        assert!(matches!(
            audio_source("https://example.com/a.mp3"),
            AudioSource::Remote(_)
        ));
        assert!(matches!(
            audio_source("inspiring-corporate.mp3"),
            AudioSource::Builtin(ref n) if n == "inspiring-corporate.mp3"
        ));

        let file = tempfile::NamedTempFile::new().unwrap();
        let raw = file.path().to_str().unwrap();
        assert!(matches!(audio_source(raw), AudioSource::Uploaded(_)));
    }

    #[test]
    fn images_form_serializes_durations() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        std::fs::write(&a, b"a").unwrap();
        std::fs::write(&b, b"b").unwrap();

        let form = images_form(&[a, b], &[2.0, 3.5], "calm.mp3", Some(1080), None).unwrap();
        assert_eq!(form.durations.as_deref(), Some("[2.0,3.5]"));
        assert_eq!(form.width.as_deref(), Some("1080"));
        assert_eq!(form.audio_file_name.as_deref(), Some("calm.mp3"));
        assert_eq!(form.images.len(), 2);
    }

    #[test]
    fn durations_count_must_match_images() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        std::fs::write(&a, b"a").unwrap();
        std::fs::write(&b, b"b").unwrap();

        let err = images_form(&[a, b], &[2.0, 3.0, 4.0], "calm.mp3", None, None).unwrap_err();
        assert!(err.to_string().contains("3 values but 2 images"));
    }

    #[test]
    fn missing_input_is_rejected() {
        let err = video_form(Path::new("/nonexistent/clip.mp4"), "calm.mp3").unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
