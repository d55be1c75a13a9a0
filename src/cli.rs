use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "montage")]
#[command(author, version, about = "Turn images or a video clip plus an audio track into an MP4")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Start {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Build a slideshow video from still images
    Images {
        /// Images in playback order (at least two)
        #[arg(required = true, num_args = 1..)]
        images: Vec<PathBuf>,

        /// Per-image durations in seconds, comma separated (e.g. 2,3,4)
        #[arg(short, long, value_delimiter = ',')]
        durations: Vec<f64>,

        /// Audio: a URL, a local file, or a built-in track name
        #[arg(short, long)]
        audio: String,

        /// Output file
        #[arg(short, long, default_value = "output.mp4")]
        output: PathBuf,

        /// Output width in pixels
        #[arg(long)]
        width: Option<u32>,

        /// Output height in pixels
        #[arg(long)]
        height: Option<u32>,
    },

    /// Replace the audio track of a video
    Video {
        /// Input video
        #[arg(required = true)]
        video: PathBuf,

        /// Audio: a URL, a local file, or a built-in track name
        #[arg(short, long)]
        audio: String,

        /// Output file
        #[arg(short, long, default_value = "output.mp4")]
        output: PathBuf,
    },

    /// Probe a media file's duration
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
