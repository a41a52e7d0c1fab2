//! # Shell Completion Module
//!
//! Static completion scripts from clap, plus enhanced bash and fish scripts
//! that complete tracked item names for `good` and `bad` by calling the
//! hidden `complete-items` command.
//!
//! ```bash
//! driftmix completion zsh > ~/.config/zsh/completions/_driftmix
//! driftmix completion-enhanced fish > ~/.config/fish/completions/driftmix.fish
//! ```

use crate::cli::Shell;
use anyhow::Result;
use clap::Command;
use clap_complete::{generate, Generator, Shell as CompletionShell};
use driftmix::store;
use std::io;
use std::path::Path;

/// Generate shell completions for the given shell
pub fn generate_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
}

/// Convert our Shell enum to clap_complete's Shell enum
pub fn shell_to_completion_shell(shell: Shell) -> CompletionShell {
    match shell {
        Shell::Bash => CompletionShell::Bash,
        Shell::Zsh => CompletionShell::Zsh,
        Shell::Fish => CompletionShell::Fish,
        Shell::PowerShell => CompletionShell::PowerShell,
        Shell::Elvish => CompletionShell::Elvish,
    }
}

/// Enhanced script for `shell`, if one exists
pub fn enhanced_script(shell: Shell) -> Option<&'static str> {
    match shell {
        Shell::Bash => Some(ENHANCED_BASH),
        Shell::Fish => Some(ENHANCED_FISH),
        _ => None,
    }
}

/// Tracked items in the session at `state_path`, sorted. A missing or
/// unreadable session yields no completions.
pub fn item_completions(state_path: &Path) -> Vec<String> {
    let mut items = match store::load_session(state_path) {
        Ok(Some(session)) => session
            .playlist
            .selector
            .tiers
            .leaves()
            .into_iter()
            .cloned()
            .collect(),
        _ => Vec::new(),
    };
    items.sort();
    items
}

/// Print one completion per line
pub fn print_item_completions(state_path: &Path) -> Result<()> {
    for item in item_completions(state_path) {
        println!("{item}");
    }
    Ok(())
}

const ENHANCED_BASH: &str = r#"#!/bin/bash
# Enhanced driftmix completion script with item name completion
# Install with: driftmix completion-enhanced bash > ~/.local/share/bash-completion/completions/driftmix

_driftmix() {
    local cur prev words cword
    _init_completion || return

    case "${prev}" in
        good|bad)
            local IFS=$'\n'
            COMPREPLY=($(compgen -W "$(driftmix complete-items 2>/dev/null)" -- "${cur}"))
            return 0
            ;;
        completion|completion-enhanced)
            COMPREPLY=($(compgen -W "bash zsh fish power-shell elvish" -- "${cur}"))
            return 0
            ;;
        --strategy)
            COMPREPLY=($(compgen -W "proportional midpoint" -- "${cur}"))
            return 0
            ;;
        --state)
            _filedir
            return 0
            ;;
    esac

    local subcommands="init next previous pick good bad sync reset show top completion completion-enhanced help"

    if [[ $cword -eq 1 ]]; then
        COMPREPLY=($(compgen -W "$subcommands --state --seed --help --version" -- "${cur}"))
    else
        case "${words[1]}" in
            init)
                COMPREPLY=($(compgen -W "--stdin --flat --strategy --force --help" -- "${cur}"))
                ;;
            next|pick)
                COMPREPLY=($(compgen -W "--count --help" -- "${cur}"))
                ;;
            good|bad)
                COMPREPLY=($(compgen -W "--percent --help" -- "${cur}"))
                ;;
            sync)
                COMPREPLY=($(compgen -W "--stdin --help" -- "${cur}"))
                ;;
            *)
                COMPREPLY=($(compgen -W "$subcommands" -- "${cur}"))
                ;;
        esac
    fi
} &&
complete -F _driftmix driftmix

# ex: filetype=sh
"#;

const ENHANCED_FISH: &str = r#"# Enhanced driftmix completion script for Fish shell with item name completion
# Install with: driftmix completion-enhanced fish > ~/.config/fish/completions/driftmix.fish

function __driftmix_complete_items
    if command -sq driftmix
        driftmix complete-items 2>/dev/null
    end
end

complete -c driftmix -e

complete -c driftmix -s h -l help -d 'Print help information'
complete -c driftmix -s V -l version -d 'Print version information'
complete -c driftmix -l state -r -d 'Session state file'
complete -c driftmix -l seed -x -d 'Seed the random generator'

complete -c driftmix -f -n '__fish_use_subcommand' -a 'init' -d 'Create a new playlist'
complete -c driftmix -f -n '__fish_use_subcommand' -a 'next' -d 'Play forward'
complete -c driftmix -f -n '__fish_use_subcommand' -a 'previous' -d 'Step back through play history'
complete -c driftmix -f -n '__fish_use_subcommand' -a 'pick' -d 'Draw items without recording them'
complete -c driftmix -f -n '__fish_use_subcommand' -a 'good' -d 'Make an item more likely'
complete -c driftmix -f -n '__fish_use_subcommand' -a 'bad' -d 'Make an item less likely'
complete -c driftmix -f -n '__fish_use_subcommand' -a 'sync' -d 'Reconcile the playlist with an item set'
complete -c driftmix -f -n '__fish_use_subcommand' -a 'reset' -d 'Forget all learned preferences'
complete -c driftmix -f -n '__fish_use_subcommand' -a 'show' -d 'Show every item with its probability'
complete -c driftmix -f -n '__fish_use_subcommand' -a 'top' -d 'Show the most likely item'
complete -c driftmix -f -n '__fish_use_subcommand' -a 'completion' -d 'Generate shell completions'
complete -c driftmix -f -n '__fish_use_subcommand' -a 'completion-enhanced' -d 'Generate enhanced shell completions'

complete -c driftmix -f -n '__fish_seen_subcommand_from init' -l stdin -d 'Read items from standard input'
complete -c driftmix -f -n '__fish_seen_subcommand_from init' -l flat -d 'Use a single tier'
complete -c driftmix -f -n '__fish_seen_subcommand_from init' -l strategy -a 'proportional midpoint' -d 'Feedback step rule'
complete -c driftmix -f -n '__fish_seen_subcommand_from init' -l force -d 'Overwrite an existing session'
complete -c driftmix -f -n '__fish_seen_subcommand_from next pick' -s c -l count -d 'Number of items'
complete -c driftmix -f -n '__fish_seen_subcommand_from good bad' -a '(__driftmix_complete_items)' -d 'Tracked item'
complete -c driftmix -f -n '__fish_seen_subcommand_from good bad' -s p -l percent -d 'Adaptation percent'
complete -c driftmix -f -n '__fish_seen_subcommand_from sync' -l stdin -d 'Read items from standard input'
complete -c driftmix -f -n '__fish_seen_subcommand_from completion completion-enhanced' -a 'bash zsh fish power-shell elvish'
"#;
