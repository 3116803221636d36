//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

use crate::app::JobSelection;

/// Job file and the clips to take from it
#[derive(Args, Debug)]
pub struct SelectionArgs {
    /// Job file (.toml, .yaml, .yml or .json)
    #[arg(short, long)]
    pub jobs: PathBuf,

    /// Only clips of this video
    #[arg(long)]
    pub video: Option<String>,

    /// Only the clip with this name
    #[arg(long)]
    pub clip: Option<String>,
}

impl SelectionArgs {
    pub fn selection(&self) -> JobSelection {
        JobSelection::from_names(self.video.clone(), self.clip.clone())
    }
}

/// Arguments for the encode command
#[derive(Args, Debug)]
pub struct EncodeArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,
}

/// Arguments for the args command
#[derive(Args, Debug)]
pub struct ArgsArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,
}
