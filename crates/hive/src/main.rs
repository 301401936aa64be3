//! # Hive deployment CLI
//!
//! Packages a pre-built web application archive together with its two
//! deployment descriptors into a single bundle and submits that bundle to
//! the Hive deployment API, which uploads and activates it remotely.
//!
//! The workflow is strictly linear: resolve the effective configuration,
//! package the deployment archive, submit it exactly once. Authentication
//! internals, delta upload computation and transport retries are the remote
//! API's concern, not ours.

#![deny(missing_docs)]

use clap::Parser;
use commands::{Cli, Commands};
use tracing::Level;

/// Deployment archive packaging.
mod archiver;

/// Deployment API client.
mod client;

/// CLI subcommands.
mod commands;

/// Effective configuration resolution.
mod config;

/// Interactive credential acquisition.
mod credentials;

/// In-archive application descriptor extraction.
mod descriptor;

/// CLI entrypoint.
fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    common::logging::init(if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    });

    match cli.command {
        Commands::Login(args) => commands::login(args)?,
        Commands::Deploy(args) => commands::deploy(args, cli.verbose)?,
    }

    Ok(())
}
