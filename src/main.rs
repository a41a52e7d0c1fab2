//! # driftmix
//!
//! Command-line front end for the adaptive playlist engine. The session
//! (playlist snapshot and play history) is loaded from the state file, the
//! command runs against it, and the result is written back.
//!
//! ## Usage
//!
//! ```bash
//! driftmix init track1.flac track2.flac track3.flac
//! driftmix next
//! driftmix good
//! driftmix show
//! ```

mod cli;
mod completion;

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser};
use driftmix::config::{EngineConfig, RuntimeConfig};
use driftmix::engine::Playlist;
use driftmix::store::{self, Session};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::{self, BufRead};

/// Main entry point.
///
/// Logging is controlled via `RUST_LOG`:
/// - `RUST_LOG=debug driftmix next` - Enable debug logging
/// - `RUST_LOG=driftmix::tiered=debug driftmix bad` - Module-specific logging
fn main() -> Result<()> {
    env_logger::init();

    let args = cli::Args::parse();
    let runtime = match &args.state {
        Some(path) => RuntimeConfig::with_state_path(path)?,
        None => RuntimeConfig::new()?,
    };
    let rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    debug!("Using state file {}", runtime.state_path.display());

    match args.command {
        cli::Command::Init {
            items,
            stdin,
            flat,
            strategy,
            force,
        } => {
            if runtime.state_path.exists() && !force {
                bail!(
                    "A playlist already exists at {}. Use --force to replace it.",
                    runtime.state_path.display()
                );
            }
            let items = collect_items(items, stdin)?;
            let config = match flat {
                true => EngineConfig::flat(),
                false => EngineConfig::default(),
            }
            .with_feedback(strategy.into());
            let playlist = Playlist::with_rng(items, config, rng)
                .context("Failed to create playlist")?;
            store::save_session(&runtime.state_path, &Session::new(playlist.snapshot()))?;
            println!(
                "Created playlist with {} items at {}",
                playlist.len(),
                runtime.state_path.display()
            );
        }
        cli::Command::Completion { shell } => {
            let mut cmd = cli::Args::command();
            completion::generate_completions(completion::shell_to_completion_shell(shell), &mut cmd);
        }
        cli::Command::CompletionEnhanced { shell } => match completion::enhanced_script(shell) {
            Some(script) => print!("{script}"),
            None => bail!("Enhanced completions only supported for bash and fish"),
        },
        cli::Command::CompleteItems => {
            completion::print_item_completions(&runtime.state_path)?;
        }
        command => {
            let session = store::load_session(&runtime.state_path)?.with_context(|| {
                format!(
                    "No playlist at {}. Create one with `driftmix init`.",
                    runtime.state_path.display()
                )
            })?;
            let mut playlist = Playlist::restore(session.playlist, rng)
                .with_context(|| format!("Corrupt playlist in {}", runtime.state_path.display()))?;
            let mut history = session.history;

            let changed = run_session_command(command, &mut playlist, &mut history)?;
            if changed {
                let session = Session {
                    playlist: playlist.snapshot(),
                    history,
                };
                store::save_session(&runtime.state_path, &session)?;
            }
        }
    }

    Ok(())
}

/// Run a command that needs a loaded session; returns whether it must be saved.
fn run_session_command(
    command: cli::Command,
    playlist: &mut Playlist<String>,
    history: &mut driftmix::history::PlayHistory<String>,
) -> Result<bool> {
    match command {
        cli::Command::Next { count } => {
            for _ in 0..count {
                match history.next(playlist) {
                    Some(item) => println!("{item}"),
                    None => bail!("The playlist is empty. Add items with `driftmix sync`."),
                }
            }
        }
        cli::Command::Previous => match history.previous() {
            Some(item) => println!("{item}"),
            None => bail!("Nothing has been played yet"),
        },
        cli::Command::Pick { count } => {
            for _ in 0..count {
                match playlist.select() {
                    Some(item) => println!("{item}"),
                    None => bail!("The playlist is empty. Add items with `driftmix sync`."),
                }
            }
        }
        cli::Command::Good { item, percent } => {
            let percent = percent.unwrap_or(playlist.config().adaptation_percent);
            let location = match &item {
                Some(item) => playlist.reinforce(item, percent),
                None => history.reinforce_current(playlist, percent),
            }
            .with_context(|| format!("Cannot reinforce {}", describe(item.as_ref())))?;
            let item = item.as_ref().or(history.current());
            info!("Reinforced {} by {percent}", describe(item));
            println!("{}: {} tier", describe(item), location.tier);
        }
        cli::Command::Bad { item, percent } => {
            let percent = percent.unwrap_or(playlist.config().adaptation_percent);
            let location = match &item {
                Some(item) => playlist.suppress(item, percent),
                None => history.suppress_current(playlist, percent),
            }
            .with_context(|| format!("Cannot suppress {}", describe(item.as_ref())))?;
            let item = item.as_ref().or(history.current());
            info!("Suppressed {} by {percent}", describe(item));
            println!("{}: {} tier", describe(item), location.tier);
        }
        cli::Command::Sync { items, stdin } => {
            let items = collect_items(items, stdin)?;
            let report = playlist.sync(items)?;
            history.retain(|entry| !report.removed.contains(entry));
            println!(
                "Added {}, removed {}, tracking {}",
                report.added.len(),
                report.removed.len(),
                playlist.len()
            );
        }
        cli::Command::Reset => {
            playlist.reset()?;
            println!("Reset {} items to equal probability", playlist.len());
        }
        cli::Command::Show => {
            let mut rows: Vec<_> = playlist
                .items()
                .into_iter()
                .filter_map(|item| {
                    let location = playlist.location(item)?;
                    let probability = playlist.probability_of(item)?;
                    Some((item.clone(), location.tier, probability))
                })
                .collect();
            rows.sort_by(|a, b| b.2.total_cmp(&a.2));
            for (item, tier, probability) in rows {
                println!("{:>7.3}%  {:<10}  {item}", probability * 100.0, tier.to_string());
            }
            return Ok(false);
        }
        cli::Command::Top => {
            match playlist.top() {
                Some((item, probability)) => println!("{item} ({:.3}%)", probability * 100.0),
                None => println!("The playlist is empty"),
            }
            return Ok(false);
        }
        cli::Command::Init { .. }
        | cli::Command::Completion { .. }
        | cli::Command::CompletionEnhanced { .. }
        | cli::Command::CompleteItems => bail!("This command does not operate on a session"),
    }
    Ok(true)
}

/// Item name for messages; feedback without a name targets the current entry
fn describe(item: Option<&String>) -> &str {
    item.map_or("the current item", String::as_str)
}

/// Items from the command line followed by non-empty stdin lines
fn collect_items(mut items: Vec<String>, stdin: bool) -> Result<Vec<String>> {
    if stdin {
        for line in io::stdin().lock().lines() {
            let line = line.context("Failed to read items from standard input")?;
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                items.push(trimmed.to_string());
            }
        }
    }
    Ok(items)
}
