//! # Command-Line Interface Module
//!
//! Clap derive definitions for the `driftmix` binary. Every command except
//! `init` and the completion commands operates on a saved session (playlist
//! plus play history) loaded from the state file.
//!
//! ## Commands
//!
//! - `init`: Create a playlist from a list of items
//! - `next` / `previous`: Move through play history, drawing when at the end
//! - `pick`: Draw items without recording them
//! - `good` / `bad`: Reinforce or suppress an item (default: the current one)
//! - `sync`: Reconcile the playlist with a new item set
//! - `reset`: Forget all learned preferences
//! - `show` / `top`: Inspect the learned probabilities
//!
//! ## Examples
//!
//! ```bash
//! find ~/Music -name '*.flac' | driftmix init --stdin
//! driftmix next
//! driftmix bad
//! driftmix good "~/Music/Artist/Album/03 Track.flac" --percent 0.25
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use driftmix::algorithm::FeedbackStrategy;
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

/// Feedback step rule as a command-line value
#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug, Default)]
pub enum StrategyArg {
    /// Move `percent` of the remaining (or current) mass
    #[default]
    Proportional,
    /// Step toward the nearer bound, symmetric in both directions
    Midpoint,
}

impl From<StrategyArg> for FeedbackStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Proportional => FeedbackStrategy::Proportional,
            StrategyArg::Midpoint => FeedbackStrategy::Midpoint,
        }
    }
}

/// Main application arguments structure.
#[derive(Parser)]
#[command(name = "driftmix")]
#[command(about = "driftmix: a shuffle that learns what you like")]
#[command(version)]
pub struct Args {
    /// Session state file (defaults to the platform data directory)
    #[arg(long, global = true, env = "DRIFTMIX_STATE", value_hint = clap::ValueHint::FilePath)]
    pub state: Option<PathBuf>,

    /// Seed the random generator for reproducible draws
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a new playlist
    ///
    /// All items start in the most frequent tier with equal probability.
    Init {
        /// Items to track (file paths, URLs, any unique names)
        items: Vec<String>,

        /// Also read newline-separated items from standard input
        #[arg(long)]
        stdin: bool,

        /// Use a single tier: feedback reweights but never reclassifies
        #[arg(long)]
        flat: bool,

        /// Feedback step rule
        #[arg(long, value_enum, default_value_t)]
        strategy: StrategyArg,

        /// Overwrite an existing session
        #[arg(long)]
        force: bool,
    },

    /// Play forward: replay history, or draw a new item at the end of it
    Next {
        /// Number of steps to take
        #[arg(short, long, default_value = "1")]
        count: usize,
    },

    /// Step back through play history (wraps to the newest entry)
    Previous,

    /// Draw items without recording them in history
    Pick {
        /// Number of items to draw
        #[arg(short, long, default_value = "1")]
        count: usize,
    },

    /// Make an item more likely (defaults to the current item)
    Good {
        #[arg(value_hint = clap::ValueHint::Other)]
        item: Option<String>,

        /// Fraction of the remaining probability to move onto the item
        #[arg(short, long, value_parser = parse_percent)]
        percent: Option<f64>,
    },

    /// Make an item less likely (defaults to the current item)
    Bad {
        #[arg(value_hint = clap::ValueHint::Other)]
        item: Option<String>,

        /// Fraction of the item's probability to take away
        #[arg(short, long, value_parser = parse_percent)]
        percent: Option<f64>,
    },

    /// Reconcile the playlist with the given item set
    ///
    /// New items are added with a small starting probability; items no
    /// longer present are removed. Everything else keeps its learned weight.
    Sync {
        items: Vec<String>,

        /// Also read newline-separated items from standard input
        #[arg(long)]
        stdin: bool,
    },

    /// Forget all learned preferences
    Reset,

    /// Show every item with its tier and overall probability
    Show,

    /// Show the most likely item
    Top,

    /// Generate shell completions
    ///
    /// Usage: driftmix completion bash > ~/.local/share/bash-completion/completions/driftmix
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },

    /// Generate completions that also complete tracked item names
    ///
    /// Supported for bash and fish.
    CompletionEnhanced {
        shell: Shell,
    },

    /// List tracked items for completion (hidden command)
    #[command(hide = true)]
    CompleteItems,
}

fn parse_percent(value: &str) -> Result<f64, String> {
    let percent: f64 = value
        .parse()
        .map_err(|_| format!("`{value}` is not a number"))?;
    match percent > 0.0 && percent <= 1.0 {
        true => Ok(percent),
        false => Err(format!("{percent} is not within (0, 1]")),
    }
}
