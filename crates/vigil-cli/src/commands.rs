//! CLI command definitions using clap

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Vigil: poll a browser-extension wallet UI and run its smoke suite
#[derive(Parser, Debug)]
#[command(name = "vigil")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the named locators of the wallet UI
    Locators(LocatorsArgs),

    /// Show the effective suite configuration
    Config(ConfigArgs),

    /// Open a page and poll one element until it shows up or goes away
    Wait(WaitArgs),

    /// Run the wallet smoke suite against a built extension
    Run(RunArgs),
}

/// Arguments for the locators command
#[derive(Args, Debug)]
pub struct LocatorsArgs {
    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: ListFormat,

    /// Only list names starting with this prefix (e.g. `screens.settings`)
    #[arg(long)]
    pub filter: Option<String>,

    /// Include expected UI texts
    #[arg(long)]
    pub texts: bool,
}

/// Arguments for the config command
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// YAML configuration file
    #[arg(short, long)]
    pub path: Option<PathBuf>,

    /// Ignore environment overrides
    #[arg(long)]
    pub no_env: bool,
}

/// Arguments for the wait command
#[derive(Args, Debug)]
pub struct WaitArgs {
    /// Page to open
    pub url: String,

    /// Locator name from the wallet table
    #[arg(long, conflicts_with = "css", required_unless_present = "css")]
    pub name: Option<String>,

    /// Raw CSS selector
    #[arg(long)]
    pub css: Option<String>,

    /// Wait for the element to go away instead
    #[arg(long)]
    pub disappear: bool,

    /// Attempt budget (defaults: 200 to appear, 10 to disappear)
    #[arg(long)]
    pub attempts: Option<u32>,

    /// Delay before each check, in milliseconds
    #[arg(long, default_value = "100")]
    pub interval_ms: u64,

    /// Explicit wall-clock bound, in milliseconds
    #[arg(long)]
    pub deadline_ms: Option<u64>,

    /// Run the browser with a window
    #[arg(long)]
    pub headed: bool,

    /// Launch Chromium with `--no-sandbox`
    #[arg(long)]
    pub no_sandbox: bool,
}

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Built extension directory (overrides config)
    #[arg(short, long)]
    pub extension: Option<PathBuf>,

    /// Stop at the first failing step
    #[arg(long)]
    pub fail_fast: bool,

    /// Run the browser without a window
    #[arg(long)]
    pub headless: bool,

    /// Launch Chromium with `--no-sandbox` (overrides config)
    #[arg(long)]
    pub no_sandbox: bool,

    /// Write the suite report as JSON to this file
    #[arg(long)]
    pub report: Option<PathBuf>,
}

/// Output format for listings
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ListFormat {
    /// Aligned columns
    #[default]
    Table,
    /// JSON
    Json,
    /// YAML
    Yaml,
}

/// Color output argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl ColorArg {
    /// Whether to emit ANSI colors on stdout
    #[must_use]
    pub fn should_color(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => std::io::IsTerminal::is_terminal(&std::io::stdout()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_locators_defaults() {
        let cli = Cli::try_parse_from(["vigil", "locators"]).unwrap();
        match cli.command {
            Commands::Locators(args) => {
                assert_eq!(args.format, ListFormat::Table);
                assert!(args.filter.is_none());
                assert!(!args.texts);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_wait_with_name() {
        let cli = Cli::try_parse_from([
            "vigil",
            "wait",
            "chrome-extension://abc/popup.html",
            "--name",
            "elements.loader",
            "--disappear",
            "--attempts",
            "5",
        ])
        .unwrap();
        match cli.command {
            Commands::Wait(args) => {
                assert_eq!(args.name.as_deref(), Some("elements.loader"));
                assert!(args.disappear);
                assert_eq!(args.attempts, Some(5));
                assert_eq!(args.interval_ms, 100);
                assert!(!args.no_sandbox);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_wait_requires_a_target() {
        assert!(Cli::try_parse_from(["vigil", "wait", "about:blank"]).is_err());
        assert!(Cli::try_parse_from([
            "vigil",
            "wait",
            "about:blank",
            "--name",
            "a",
            "--css",
            "b"
        ])
        .is_err());
    }

    #[test]
    fn test_parse_no_sandbox_flags() {
        let cli = Cli::try_parse_from(["vigil", "run", "--no-sandbox", "--headless"]).unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert!(args.no_sandbox);
                assert!(args.headless);
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = Cli::try_parse_from([
            "vigil",
            "wait",
            "about:blank",
            "--css",
            "#app",
            "--no-sandbox",
        ])
        .unwrap();
        match cli.command {
            Commands::Wait(args) => assert!(args.no_sandbox),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["vigil", "-vv", "--color", "never", "config"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.color, ColorArg::Never);
        assert!(!cli.color.should_color());
        assert!(ColorArg::Always.should_color());
    }
}
