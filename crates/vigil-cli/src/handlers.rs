//! Command handlers

use crate::commands::{ConfigArgs, LocatorsArgs};
use crate::error::CliResult;
use crate::output::{locator_rows, render_locators, text_rows, Reporter};
use std::path::Path;
use vigil::{LocatorTable, SuiteConfig};

/// Load a suite config from an optional YAML file, then apply environment overrides
pub fn load_suite_config(path: Option<&Path>, use_env: bool) -> CliResult<SuiteConfig> {
    let config = match path {
        Some(path) => SuiteConfig::from_yaml_file(path)?,
        None => SuiteConfig::default(),
    };
    if use_env {
        Ok(config.with_env()?)
    } else {
        Ok(config)
    }
}

/// `vigil locators`
pub fn execute_locators(args: &LocatorsArgs, reporter: &Reporter) -> CliResult<()> {
    let table = LocatorTable::wallet();
    let rows = locator_rows(&table, args.filter.as_deref());
    reporter.line(render_locators(&rows, args.format)?.trim_end());

    if args.texts {
        reporter.line("");
        for (key, text) in text_rows(&table, args.filter.as_deref()) {
            reporter.line(&format!("{key}  {text:?}"));
        }
    }
    Ok(())
}

/// `vigil config`
pub fn execute_config(args: &ConfigArgs, reporter: &Reporter) -> CliResult<()> {
    let config = load_suite_config(args.path.as_deref(), !args.no_env)?;
    reporter.line(config.to_yaml()?.trim_end());
    Ok(())
}

#[cfg(feature = "browser")]
pub use live::{execute_run, execute_wait};

#[cfg(feature = "browser")]
mod live {
    use super::load_suite_config;
    use crate::commands::{RunArgs, WaitArgs};
    use crate::error::{CliError, CliResult};
    use crate::output::Reporter;
    use std::time::Duration;
    use tracing::info;
    use vigil::{
        wait_for_appearance, wait_for_disappearance, wallet_smoke_suite, ArtifactWriter,
        ChromiumDriver, ConsoleFilter, ElementDriver, LaunchOptions, Locator, LocatorTable,
        PollBudget, ScenarioContext, Selector, SuiteRunner, SystemClock, WalletState,
    };

    fn wait_target(args: &WaitArgs) -> CliResult<Locator> {
        match (&args.name, &args.css) {
            (Some(name), _) => Ok(LocatorTable::wallet().get(name)?.clone()),
            (None, Some(css)) => Ok(Locator::from_selector(Selector::css(css.clone()))),
            (None, None) => Err(CliError::invalid_argument("either --name or --css is required")),
        }
    }

    fn wait_budget(args: &WaitArgs) -> PollBudget {
        let base = if args.disappear {
            PollBudget::disappearance()
        } else {
            PollBudget::appearance()
        };
        let mut budget = base.with_interval(Duration::from_millis(args.interval_ms));
        if let Some(attempts) = args.attempts {
            budget = budget.with_attempts(attempts);
        }
        if let Some(ms) = args.deadline_ms {
            budget = budget.with_deadline(Duration::from_millis(ms));
        }
        budget
    }

    /// `vigil wait`
    pub async fn execute_wait(args: &WaitArgs, reporter: &Reporter) -> CliResult<()> {
        let locator = wait_target(args)?;
        let budget = wait_budget(args);

        let driver = ChromiumDriver::launch(LaunchOptions {
            headless: !args.headed,
            no_sandbox: args.no_sandbox,
            ..LaunchOptions::default()
        })
        .await?;
        let clock = SystemClock::new();
        driver.navigate(&args.url).await?;

        let (found, attempts, elapsed, error) = if args.disappear {
            let report = wait_for_disappearance(&driver, &clock, &locator, &budget).await;
            let error = report.outcome.driver_error().map(ToString::to_string);
            (report.is_found(), report.attempts, report.elapsed, error)
        } else {
            let report = wait_for_appearance(&driver, &clock, &locator, &budget).await;
            let error = report.outcome.driver_error().map(ToString::to_string);
            (report.is_found(), report.attempts, report.elapsed, error)
        };
        driver.close().await?;

        let verb = if args.disappear { "gone" } else { "shown" };
        let summary = format!(
            "{locator} {verb} after {attempts} check(s) in {}ms",
            elapsed.as_millis()
        );
        if found {
            reporter.success(&summary);
            return Ok(());
        }
        let message = error.unwrap_or_else(|| {
            format!(
                "{locator} not {verb} after {attempts} check(s) in {}ms",
                elapsed.as_millis()
            )
        });
        reporter.failure(&message);
        Err(CliError::suite_failed(message))
    }

    /// `vigil run`
    pub async fn execute_run(args: &RunArgs, reporter: &Reporter) -> CliResult<()> {
        let mut config = load_suite_config(args.config.as_deref(), true)?;
        if let Some(ref extension) = args.extension {
            config.extension_path = Some(extension.clone());
        }
        config.headless |= args.headless;
        config.fail_fast |= args.fail_fast;
        config.no_sandbox |= args.no_sandbox;

        let driver = ChromiumDriver::launch(LaunchOptions::from_config(&config)).await?;
        let clock = SystemClock::new();
        let extension_id = driver
            .extension_id(&clock, &config.poll.appearance())
            .await?;
        let popup_url = config.browser.popup_url(&extension_id);
        info!(%popup_url, "extension loaded");
        reporter.line(&format!("Running smoke suite against {popup_url}"));

        let suite = wallet_smoke_suite(popup_url);
        let mut ctx = ScenarioContext::new(driver, clock)
            .with_poll(config.poll)
            .with_state(WalletState {
                token_address: config.token_address.clone(),
                extension_id: Some(extension_id),
                ..WalletState::default()
            });

        let mut runner = SuiteRunner::new()
            .with_fail_fast(config.fail_fast)
            .with_artifacts(ArtifactWriter::new(config.artifact_dir.clone(), config.browser));
        if config.browser.reports_console_logs() {
            runner = runner.with_console(ConsoleFilter::new());
        }
        let report = runner.run(&suite, &mut ctx).await;
        ctx.into_driver().close().await?;

        reporter.suite_report(&report);
        if let Some(ref path) = args.report {
            tokio::fs::write(path, serde_json::to_string_pretty(&report)?).await?;
        }

        if report.all_passed() {
            Ok(())
        } else {
            Err(CliError::suite_failed(format!(
                "{} step(s) failed",
                report.failed_count()
            )))
        }
    }

}
