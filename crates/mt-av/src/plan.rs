//! Structured ffmpeg invocations.
//!
//! An [`EncodePlan`] is an ordered list of encoder directives: inputs (with
//! their demuxer options), stream maps, an optional video filter, output
//! codec arguments and the output path. [`EncodePlan::to_args`] renders it to
//! the argument vector passed to ffmpeg.

use std::path::PathBuf;

use serde::Serialize;

/// One `-i` input of an encode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodeInput {
    pub path: PathBuf,
    /// Forced demuxer (`-f`).
    pub format: Option<String>,
    /// Demuxer options placed before `-i`, e.g. `-safe 0`.
    pub options: Vec<(String, String)>,
    /// Repeat this input indefinitely (`-stream_loop -1`).
    pub loop_forever: bool,
}

impl EncodeInput {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            format: None,
            options: Vec::new(),
            loop_forever: false,
        }
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push((key.into(), value.into()));
        self
    }

    pub fn looped(mut self, loop_forever: bool) -> Self {
        self.loop_forever = loop_forever;
        self
    }
}

/// A complete encoder invocation, consumed once by [`crate::Encoder`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodePlan {
    pub inputs: Vec<EncodeInput>,
    /// Stream selectors for `-map`, in order.
    pub maps: Vec<String>,
    /// Filter chain for `-vf`.
    pub video_filter: Option<String>,
    /// Codec, rate and duration arguments placed before the output path.
    pub output_args: Vec<String>,
    pub output: PathBuf,
}

impl EncodePlan {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            inputs: Vec::new(),
            maps: Vec::new(),
            video_filter: None,
            output_args: Vec::new(),
            output: output.into(),
        }
    }

    pub fn input(mut self, input: EncodeInput) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn map(mut self, selector: impl Into<String>) -> Self {
        self.maps.push(selector.into());
        self
    }

    pub fn video_filter(mut self, filter: impl Into<String>) -> Self {
        self.video_filter = Some(filter.into());
        self
    }

    pub fn output_arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.output_args.push(key.into());
        self.output_args.push(value.into());
        self
    }

    pub fn output_flag(mut self, flag: impl Into<String>) -> Self {
        self.output_args.push(flag.into());
        self
    }

    /// Whether any input is looped.
    pub fn loops_input(&self) -> bool {
        self.inputs.iter().any(|i| i.loop_forever)
    }

    /// Render the plan as ffmpeg arguments. Output is always overwritten.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec!["-y".to_string()];

        for input in &self.inputs {
            if let Some(ref format) = input.format {
                args.push("-f".into());
                args.push(format.clone());
            }
            for (key, value) in &input.options {
                args.push(format!("-{key}"));
                args.push(value.clone());
            }
            if input.loop_forever {
                args.push("-stream_loop".into());
                args.push("-1".into());
            }
            args.push("-i".into());
            args.push(input.path.to_string_lossy().to_string());
        }

        for selector in &self.maps {
            args.push("-map".into());
            args.push(selector.clone());
        }

        if let Some(ref filter) = self.video_filter {
            args.push("-vf".into());
            args.push(filter.clone());
        }

        args.extend(self.output_args.iter().cloned());
        args.push(self.output.to_string_lossy().to_string());
        args
    }
}
