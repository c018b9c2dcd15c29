//! Vigil CLI library
//!
//! Command-line front end for the Vigil wallet e2e harness: list the named
//! locators, show the effective configuration, poll a single element on a
//! live page, and run the built-in smoke suite.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::format_push_string)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod error;
pub mod handlers;
mod output;

pub use commands::{
    Cli, ColorArg, Commands, ConfigArgs, ListFormat, LocatorsArgs, RunArgs, WaitArgs,
};
pub use error::{CliError, CliResult};
pub use output::{locator_rows, render_locators, summary_line, text_rows, LocatorRow, Reporter};

use tracing_subscriber::EnvFilter;

/// Install the stderr tracing subscriber; `RUST_LOG` wins over the flags
pub fn init_tracing(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
