// SPDX-License-Identifier: GPL-3.0-or-later
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "clipseek")]
#[command(author, version, about = "Find where an audio clip occurs inside a longer recording")]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Locate every occurrence of a clip inside a recording
    Find {
        /// Recording to search in
        #[arg(long)]
        within: PathBuf,

        /// Clip to look for
        #[arg(long)]
        find: PathBuf,

        /// Scales the best correlation score into the initial peak threshold
        #[arg(long)]
        multiplier: f64,

        /// Seconds of the clip used for matching
        #[arg(long)]
        window: Option<u32>,

        /// Expected number of occurrences
        #[arg(long, allow_negative_numbers = true)]
        number: Option<i64>,

        /// Maximum threshold adjustments
        #[arg(long)]
        max_tries: Option<u32>,

        /// Write the correlation trace as SVG
        #[arg(long)]
        plot: bool,

        /// Skip the offset cache
        #[arg(long)]
        no_cache: bool,
    },

    /// Print content fingerprints of media files
    Fingerprint {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Check that required external tools are available
    Tools,
}
