//! Encoder argument construction
//!
//! Turns a clip and a pass into the exact argument list handed to the
//! encoder. Arguments are kept as separate tokens since no shell is
//! involved; [`EncoderCommand::display`] renders the quoted form for logs.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domain::model::ClipSpec;
use crate::engine::PassKind;
use crate::error::{EncodeError, EncodeResult};
use crate::streams::{AudioPlan, FilterChainBuilder, FilterChains};

/// Discard sink the first of two passes writes to
#[cfg(windows)]
pub const NULL_SINK: &str = "NUL";
#[cfg(not(windows))]
pub const NULL_SINK: &str = "/dev/null";

/// Argument list with the positions that hold file paths
#[derive(Debug, Default)]
struct ArgList {
    tokens: Vec<String>,
    paths: Vec<usize>,
}

impl ArgList {
    fn push(&mut self, token: impl Into<String>) -> &mut Self {
        self.tokens.push(token.into());
        self
    }

    fn push_path(&mut self, path: &Path) -> &mut Self {
        self.paths.push(self.tokens.len());
        self.tokens.push(path.to_string_lossy().into_owned());
        self
    }
}

/// Builds the encoder argument list for one pass of a clip
#[derive(Debug, Clone, Copy)]
pub struct ArgumentBuilder<'a> {
    clip: Option<&'a ClipSpec>,
    pass: PassKind,
}

impl Default for ArgumentBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> ArgumentBuilder<'a> {
    /// Builder with no clip bound, single pass
    pub fn new() -> Self {
        Self {
            clip: None,
            pass: PassKind::Single,
        }
    }

    pub fn for_clip(clip: &'a ClipSpec) -> Self {
        Self::new().with_clip(clip)
    }

    pub fn with_clip(mut self, clip: &'a ClipSpec) -> Self {
        self.clip = Some(clip);
        self
    }

    pub fn with_pass(mut self, pass: PassKind) -> Self {
        self.pass = pass;
        self
    }

    /// Full argument list, one token per argument
    pub fn build(&self) -> EncodeResult<Vec<String>> {
        Ok(self.assemble()?.tokens)
    }

    /// Pair the arguments with the encoder executable
    pub fn command(&self, program: impl Into<PathBuf>) -> EncodeResult<EncoderCommand> {
        let list = self.assemble()?;
        let pass_log = self
            .clip
            .filter(|_| self.pass.is_two_pass())
            .map(|clip| clip.output.clone());
        let command = EncoderCommand {
            program: program.into(),
            args: list.tokens,
            path_positions: list.paths,
            pass: self.pass,
            pass_log,
        };
        debug!("Encoder command ({}): {}", self.pass, command.display());
        Ok(command)
    }

    fn assemble(&self) -> EncodeResult<ArgList> {
        let clip = self.clip.ok_or_else(|| {
            EncodeError::Specification("no clip bound to the argument builder".to_string())
        })?;
        if self.pass.is_two_pass() != clip.two_pass {
            return Err(EncodeError::Specification(format!(
                "{} requested for a clip with two_pass = {}",
                self.pass, clip.two_pass
            )));
        }

        let chains = FilterChainBuilder::build(clip);
        let mut args = ArgList::default();

        args.push("-ss")
            .push(clip.start.format_hms())
            .push("-t")
            .push(clip.duration.format_hms())
            .push("-i")
            .push_path(&clip.source.path);

        for token in split_extra_options(&clip.extra_options) {
            args.push(token);
        }

        if self.pass.is_two_pass() {
            args.push("-pass")
                .push(self.pass.number().to_string())
                .push("-passlogfile")
                .push_path(&clip.output);
        }

        args.push("-stats");
        if clip.overwrite {
            args.push("-y");
        }

        Self::push_audio(&mut args, clip, &chains);
        Self::push_video(&mut args, clip, &chains);

        if self.pass == PassKind::First {
            args.push("-f").push("null").push(NULL_SINK);
        } else {
            args.push("-f")
                .push(clip.container.name.clone())
                .push_path(&clip.output);
        }

        Ok(args)
    }

    fn push_audio(args: &mut ArgList, clip: &ClipSpec, chains: &FilterChains) {
        let codec = match (&clip.audio_codec, &chains.audio) {
            (Some(codec), AudioPlan::Streams { .. }) if clip.container.supports_audio => codec,
            _ => {
                args.push("-an");
                return;
            }
        };

        if let Some(graph) = chains.audio.graph() {
            args.push("-filter_complex").push(graph);
        }
        for output in chains.audio.outputs() {
            args.push("-map").push(output.as_map());
        }
        args.push("-c:a")
            .push(codec.clone())
            .push("-b:a")
            .push(format!("{}K", clip.audio_bitrate_kbps));
    }

    fn push_video(args: &mut ArgList, clip: &ClipSpec, chains: &FilterChains) {
        let codec = match &clip.video_codec {
            Some(codec) if clip.container.supports_video => codec,
            _ => {
                args.push("-vn");
                return;
            }
        };

        if let Some(graph) = chains.video.graph() {
            args.push("-filter_complex").push(graph);
        }
        args.push("-map").push(chains.video.output().as_map());

        let bitrate = &clip.video_bitrate;
        args.push("-c:v")
            .push(codec.clone())
            .push("-b:v")
            .push(format!("{}K", bitrate.target_kbps));
        if let Some(min) = bitrate.min_rate_kbps() {
            args.push("-minrate").push(format!("{}K", min));
        }
        if let Some(max) = bitrate.max_rate_kbps() {
            args.push("-maxrate").push(format!("{}K", max));
        }
    }
}

/// A ready-to-launch encoder invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    path_positions: Vec<usize>,
    pub pass: PassKind,
    /// Base path of the two-pass statistics files, `None` for single pass
    pub pass_log: Option<PathBuf>,
}

impl EncoderCommand {
    /// Command for an arbitrary program and arguments, no path quoting
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, pass: PassKind) -> Self {
        Self {
            program: program.into(),
            args,
            path_positions: Vec::new(),
            pass,
            pass_log: None,
        }
    }

    pub fn with_pass_log(mut self, base: impl Into<PathBuf>) -> Self {
        self.pass_log = Some(base.into());
        self
    }

    /// Single-line rendering with paths double-quoted
    pub fn display(&self) -> String {
        let mut line = quote(&self.program.to_string_lossy());
        for (position, arg) in self.args.iter().enumerate() {
            line.push(' ');
            if self.path_positions.contains(&position) {
                line.push_str(&quote(arg));
            } else {
                line.push_str(arg);
            }
        }
        line
    }
}

fn quote(text: &str) -> String {
    format!("\"{}\"", text)
}

/// Split free-form options on whitespace, keeping double-quoted groups together
pub fn split_extra_options(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for ch in text.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if has_token {
        tokens.push(current);
    }
    tokens
}
