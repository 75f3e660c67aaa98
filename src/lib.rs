//! Core library for the `tidyscan` directory messiness monitor.
//!
//! A cycle scans a tree ([`scanner`]), scores it against [`standards`]
//! ([`score`]), appends the result to the [`store`], retrieves similar past
//! scans ([`retrieval`]), and asks a local model for a narrative ([`report`]).
//! [`monitor::Monitor`] drives the cycle; [`commands`] wires it to the CLI.

pub mod adapters;
pub mod cassette;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod monitor;
pub mod ports;
pub mod report;
pub mod retrieval;
pub mod scanner;
pub mod score;
pub mod snapshot;
pub mod standards;
pub mod store;
pub mod trend;

#[cfg(test)]
mod testing;

use clap::Parser;

/// Run the CLI with the provided arguments.
///
/// # Errors
///
/// Returns an error string when argument parsing fails or command execution fails.
pub fn run<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = cli::Cli::try_parse_from(args).map_err(|err| err.to_string())?;
    commands::dispatch(&cli)
}
