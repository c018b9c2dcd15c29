//! Vigil CLI: poll a browser-extension wallet UI
//!
//! ## Usage
//!
//! ```bash
//! vigil locators --filter screens.lock        # List named locators
//! vigil config --path vigil.yaml              # Show effective config
//! vigil wait <url> --name elements.loader     # Poll one element
//! vigil run --extension dist/chrome           # Run the smoke suite
//! ```

use clap::Parser;
use std::process::ExitCode;
use vigil_cli::{handlers, init_tracing, Cli, CliResult, Commands, Reporter};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);
    let reporter = Reporter::new(cli.color.should_color(), cli.quiet);

    match cli.command {
        Commands::Locators(args) => handlers::execute_locators(&args, &reporter),
        Commands::Config(args) => handlers::execute_config(&args, &reporter),
        Commands::Wait(args) => run_wait(&args, &reporter),
        Commands::Run(args) => run_suite(&args, &reporter),
    }
}

#[cfg(feature = "browser")]
fn runtime() -> CliResult<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}

#[cfg(feature = "browser")]
fn run_wait(args: &vigil_cli::WaitArgs, reporter: &Reporter) -> CliResult<()> {
    runtime()?.block_on(handlers::execute_wait(args, reporter))
}

#[cfg(not(feature = "browser"))]
fn run_wait(_args: &vigil_cli::WaitArgs, _reporter: &Reporter) -> CliResult<()> {
    Err(vigil_cli::CliError::FeatureDisabled { feature: "browser" })
}

#[cfg(feature = "browser")]
fn run_suite(args: &vigil_cli::RunArgs, reporter: &Reporter) -> CliResult<()> {
    runtime()?.block_on(handlers::execute_run(args, reporter))
}

#[cfg(not(feature = "browser"))]
fn run_suite(_args: &vigil_cli::RunArgs, _reporter: &Reporter) -> CliResult<()> {
    Err(vigil_cli::CliError::FeatureDisabled { feature: "browser" })
}
