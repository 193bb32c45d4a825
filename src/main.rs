// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Gradle Convoy CLI - batch migration of Gradle fleets to a new artifact backend

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use gradle_convoy::commands;
use gradle_convoy::commands::migrate::MigrateArgs;

#[derive(Parser)]
#[command(name = "gradle-convoy")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long)]
    quiet: bool,

    /// Configuration file path
    #[arg(short, long, env = "GRADLE_CONVOY_CONFIG")]
    config: Option<std::path::PathBuf>,

    /// Output in JSON format
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate a fleet of repositories to the new backend
    Migrate {
        /// Repository URLs
        repos: Vec<String>,

        /// File with one repository URL per line ('#' starts a comment)
        #[arg(short, long)]
        file: Option<std::path::PathBuf>,

        /// Branch to create for the migration commit
        #[arg(short, long)]
        branch: Option<String>,

        /// Commit message override
        #[arg(short = 'm', long)]
        commit_message: Option<String>,

        /// Base URL of the target artifact backend
        #[arg(long)]
        backend_url: Option<String>,

        /// Maximum concurrent repository tasks
        #[arg(short = 'w', long)]
        max_workers: Option<usize>,

        /// Root directory for disposable checkouts and caches
        #[arg(long)]
        workspace: Option<std::path::PathBuf>,

        /// Classify and transform only; never verify, commit, or push
        #[arg(long)]
        dry_run: bool,

        /// Where the Markdown report is written
        #[arg(short, long)]
        report: Option<std::path::PathBuf>,
    },

    /// Report the migration path for a local checkout
    Classify {
        /// Checkout to inspect
        #[arg(default_value = ".")]
        path: std::path::PathBuf,
    },

    /// Fold verification-failure logs into the shared unresolved-dependency ledger
    Aggregate {
        /// Directory the failure logs live in
        #[arg(default_value = ".")]
        logs_dir: std::path::PathBuf,

        /// Glob the log file names must match
        #[arg(long)]
        pattern: Option<String>,

        /// Ledger file to append to
        #[arg(short, long)]
        output: Option<std::path::PathBuf>,
    },

    /// Generate shell completions
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: clap_complete::Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 if cli.quiet => tracing::Level::ERROR,
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    // Execute command
    match cli.command {
        Commands::Migrate {
            repos,
            file,
            branch,
            commit_message,
            backend_url,
            max_workers,
            workspace,
            dry_run,
            report,
        } => commands::migrate::run(
            cli.config.as_deref(),
            cli.json,
            MigrateArgs {
                repos,
                file,
                branch,
                commit_message,
                backend_url,
                max_workers,
                workspace,
                dry_run,
                report,
            },
        ),
        Commands::Classify { path } => commands::classify::run(path, cli.json),
        Commands::Aggregate {
            logs_dir,
            pattern,
            output,
        } => commands::aggregate::run(logs_dir, pattern, output),
        Commands::Completions { shell } => {
            commands::completions::run(shell, &mut Cli::command())
        }
    }
}
