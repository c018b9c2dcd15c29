//! Sequential step runner.
//!
//! A [`Suite`] is an ordered list of groups, each an ordered list of steps.
//! Steps run one at a time against a single [`ScenarioContext`], so later
//! steps see the UI and wallet state earlier steps left behind. After every
//! step the runner scans the browser console and, when the step failed,
//! captures a screenshot and DOM dump.

use crate::artifacts::{ArtifactWriter, FailureArtifacts};
use crate::clock::Clock;
use crate::console::ConsoleFilter;
use crate::context::ScenarioContext;
use crate::driver::ElementDriver;
use crate::result::VigilResult;
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::{info, warn};

/// One scenario step
#[async_trait]
pub trait Step<D, C>: Send + Sync {
    /// Title shown in reports and used for artifact directories
    fn name(&self) -> &str;

    /// Drive the UI
    async fn run(&self, ctx: &mut ScenarioContext<D, C>) -> VigilResult<()>;
}

type StepFn<D, C> =
    Box<dyn for<'a> Fn(&'a mut ScenarioContext<D, C>) -> BoxFuture<'a, VigilResult<()>> + Send + Sync>;

/// Step built from a closure returning a boxed future
pub struct FnStep<D, C> {
    name: String,
    body: StepFn<D, C>,
}

impl<D, C> FnStep<D, C> {
    /// Create a step
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: for<'a> Fn(&'a mut ScenarioContext<D, C>) -> BoxFuture<'a, VigilResult<()>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            body: Box::new(body),
        }
    }
}

impl<D, C> fmt::Debug for FnStep<D, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnStep").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<D, C> Step<D, C> for FnStep<D, C>
where
    D: ElementDriver,
    C: Clock,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: &mut ScenarioContext<D, C>) -> VigilResult<()> {
        (self.body)(ctx).await
    }
}

/// Whether a step is run or only listed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// Run normally
    Active,
    /// Listed in the report, never run
    Skipped,
}

struct Entry<D, C> {
    step: Box<dyn Step<D, C>>,
    kind: StepKind,
}

/// Named group of steps
pub struct Group<D, C> {
    name: String,
    entries: Vec<Entry<D, C>>,
}

impl<D, C> Group<D, C>
where
    D: ElementDriver + 'static,
    C: Clock + 'static,
{
    /// Create an empty group
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Append a step
    #[must_use]
    pub fn step(mut self, step: impl Step<D, C> + 'static) -> Self {
        self.entries.push(Entry {
            step: Box::new(step),
            kind: StepKind::Active,
        });
        self
    }

    /// Append a closure step
    #[must_use]
    pub fn step_fn<F>(self, name: impl Into<String>, body: F) -> Self
    where
        F: for<'a> Fn(&'a mut ScenarioContext<D, C>) -> BoxFuture<'a, VigilResult<()>>
            + Send
            + Sync
            + 'static,
    {
        self.step(FnStep::new(name, body))
    }

    /// Append a step that is reported but not run
    #[must_use]
    pub fn skip(mut self, step: impl Step<D, C> + 'static) -> Self {
        self.entries.push(Entry {
            step: Box::new(step),
            kind: StepKind::Skipped,
        });
        self
    }

    /// Group name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of steps, skipped ones included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the group has no steps
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<D, C> fmt::Debug for Group<D, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let steps: Vec<&str> = self.entries.iter().map(|e| e.step.name()).collect();
        f.debug_struct("Group")
            .field("name", &self.name)
            .field("steps", &steps)
            .finish()
    }
}

/// Ordered list of groups run as one scenario
pub struct Suite<D, C> {
    name: String,
    groups: Vec<Group<D, C>>,
}

impl<D, C> Suite<D, C>
where
    D: ElementDriver + 'static,
    C: Clock + 'static,
{
    /// Create an empty suite
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            groups: Vec::new(),
        }
    }

    /// Append a group
    #[must_use]
    pub fn group(mut self, group: Group<D, C>) -> Self {
        self.groups.push(group);
        self
    }

    /// Suite name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of steps across all groups
    pub fn step_count(&self) -> usize {
        self.groups.iter().map(Group::len).sum()
    }
}

impl<D, C> fmt::Debug for Suite<D, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Suite")
            .field("name", &self.name)
            .field("groups", &self.groups)
            .finish()
    }
}

/// Final state of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// Ran and returned `Ok`
    Passed,
    /// Ran and returned an error
    Failed,
    /// Not run
    Skipped,
}

/// Outcome of one step
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    /// Group the step belongs to
    pub group: String,
    /// Step title
    pub name: String,
    /// Final state
    pub status: StepStatus,
    /// Time the step took
    pub duration: Duration,
    /// Error message when failed
    pub error: Option<String>,
    /// Console errors seen after the step
    pub console_errors: Vec<String>,
    /// Screenshot written for a failure
    pub screenshot: Option<String>,
    /// DOM dump written for a failure
    pub dom: Option<String>,
}

impl StepReport {
    fn new(group: &str, name: &str, status: StepStatus) -> Self {
        Self {
            group: group.to_string(),
            name: name.to_string(),
            status,
            duration: Duration::ZERO,
            error: None,
            console_errors: Vec::new(),
            screenshot: None,
            dom: None,
        }
    }

    /// Whether the step passed
    #[must_use]
    pub fn passed(&self) -> bool {
        self.status == StepStatus::Passed
    }
}

/// Outcome of a suite run
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    /// Suite name
    pub suite_name: String,
    /// Step outcomes in run order
    pub steps: Vec<StepReport>,
    /// Total duration
    pub duration: Duration,
}

impl SuiteReport {
    fn count(&self, status: StepStatus) -> usize {
        self.steps.iter().filter(|s| s.status == status).count()
    }

    /// Whether no step failed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed_count() == 0
    }

    /// Count passed steps
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.count(StepStatus::Passed)
    }

    /// Count failed steps
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.count(StepStatus::Failed)
    }

    /// Count skipped steps
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.count(StepStatus::Skipped)
    }

    /// Total step count
    #[must_use]
    pub fn total(&self) -> usize {
        self.steps.len()
    }

    /// Failed steps
    #[must_use]
    pub fn failures(&self) -> Vec<&StepReport> {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Failed)
            .collect()
    }
}

/// Runs suites step by step
#[derive(Debug, Clone, Default)]
pub struct SuiteRunner {
    fail_fast: bool,
    console: Option<ConsoleFilter>,
    artifacts: Option<ArtifactWriter>,
}

impl SuiteRunner {
    /// Runner without console scan or artifacts
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop running steps after the first failure
    #[must_use]
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Scan the console after every step
    #[must_use]
    pub fn with_console(mut self, filter: ConsoleFilter) -> Self {
        self.console = Some(filter);
        self
    }

    /// Capture artifacts for failed steps
    #[must_use]
    pub fn with_artifacts(mut self, writer: ArtifactWriter) -> Self {
        self.artifacts = Some(writer);
        self
    }

    /// Run every step of `suite` in order against `ctx`
    pub async fn run<D, C>(&self, suite: &Suite<D, C>, ctx: &mut ScenarioContext<D, C>) -> SuiteReport
    where
        D: ElementDriver,
        C: Clock,
    {
        let start = ctx.clock().now();
        let total: usize = suite.groups.iter().map(|g| g.entries.len()).sum();
        let mut steps = Vec::with_capacity(total);
        let mut halted = false;

        info!(suite = %suite.name, steps = total, "suite started");

        for group in &suite.groups {
            for entry in &group.entries {
                let name = entry.step.name();
                if halted || entry.kind == StepKind::Skipped {
                    info!(group = %group.name, step = name, "step skipped");
                    steps.push(StepReport::new(&group.name, name, StepStatus::Skipped));
                    continue;
                }

                let report = self.run_step(&group.name, entry.step.as_ref(), ctx).await;
                if report.status == StepStatus::Failed && self.fail_fast {
                    halted = true;
                }
                steps.push(report);
            }
        }

        let report = SuiteReport {
            suite_name: suite.name.clone(),
            steps,
            duration: ctx.clock().now().saturating_sub(start),
        };
        info!(
            suite = %report.suite_name,
            passed = report.passed_count(),
            failed = report.failed_count(),
            skipped = report.skipped_count(),
            "suite finished"
        );
        report
    }

    async fn run_step<D, C>(
        &self,
        group: &str,
        step: &dyn Step<D, C>,
        ctx: &mut ScenarioContext<D, C>,
    ) -> StepReport
    where
        D: ElementDriver,
        C: Clock,
    {
        let name = step.name();
        let started = ctx.clock().now();
        let result = step.run(ctx).await;
        let mut report = StepReport::new(group, name, StepStatus::Passed);
        report.duration = ctx.clock().now().saturating_sub(started);

        match result {
            Ok(()) => info!(
                group,
                step = name,
                duration_ms = report.duration.as_millis() as u64,
                "step passed"
            ),
            Err(err) => {
                warn!(group, step = name, error = %err, "step failed");
                report.status = StepStatus::Failed;
                report.error = Some(err.to_string());
            }
        }

        if let Some(filter) = &self.console {
            report.console_errors = scan_console(ctx.driver(), filter, name).await;
        }

        if report.status == StepStatus::Failed {
            if let Some(writer) = &self.artifacts {
                match writer.capture(ctx.driver(), name).await {
                    Ok(FailureArtifacts { screenshot, dom }) => {
                        report.screenshot = screenshot.map(|p| p.display().to_string());
                        report.dom = Some(dom.display().to_string());
                    }
                    Err(err) => warn!(step = name, error = %err, "failure artifacts not written"),
                }
            }
        }

        report
    }
}

async fn scan_console<D>(driver: &D, filter: &ConsoleFilter, step: &str) -> Vec<String>
where
    D: ElementDriver + ?Sized,
{
    let entries = match driver.console_logs().await {
        Ok(Some(entries)) => entries,
        Ok(None) => return Vec::new(),
        Err(err) => {
            warn!(step, error = %err, "console logs unavailable");
            return Vec::new();
        }
    };
    if let Some(report) = filter.report(&entries) {
        warn!(step, "{report}");
    }
    filter
        .filter(&entries)
        .into_iter()
        .map(|e| e.message)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::config::BrowserKind;
    use crate::driver::{LogEntry, LogLevel, MockDriver};
    use crate::result::VigilError;
    use std::sync::Arc;

    type Ctx = ScenarioContext<MockDriver, Arc<FakeClock>>;

    fn context() -> Ctx {
        ScenarioContext::new(MockDriver::new(), FakeClock::shared())
    }

    struct Click(&'static str);

    #[async_trait]
    impl Step<MockDriver, Arc<FakeClock>> for Click {
        fn name(&self) -> &str {
            self.0
        }

        async fn run(&self, ctx: &mut Ctx) -> VigilResult<()> {
            ctx.click(self.0).await
        }
    }

    fn failing(name: &'static str) -> FnStep<MockDriver, Arc<FakeClock>> {
        FnStep::new(name, |_ctx| {
            Box::pin(async { Err(VigilError::assertion("tokens are displayed")) })
        })
    }

    mod runner_tests {
        use super::*;

        #[tokio::test]
        async fn test_steps_run_in_order() {
            let mut ctx = context();
            ctx.driver().add_visible("menus.sandwich.menu");
            ctx.driver().add_visible("menus.sandwich.settings");
            let suite = Suite::new("wallet").group(
                Group::new("Settings")
                    .step(Click("menus.sandwich.menu"))
                    .step(Click("menus.sandwich.settings")),
            );

            let report = SuiteRunner::new().run(&suite, &mut ctx).await;

            assert!(report.all_passed());
            assert_eq!(report.passed_count(), 2);
            assert_eq!(
                ctx.driver().history(),
                vec!["click:menus.sandwich.menu", "click:menus.sandwich.settings"]
            );
            assert_eq!(report.duration, Duration::from_millis(200));
        }

        #[tokio::test]
        async fn test_state_carries_between_steps() {
            let mut ctx = context();
            let suite = Suite::new("wallet").group(
                Group::new("Change password")
                    .step_fn("sets password", |ctx| {
                        Box::pin(async move {
                            ctx.state_mut().password = "abcDEF123!@#".into();
                            Ok(())
                        })
                    })
                    .step_fn("reads password", |ctx| {
                        Box::pin(async move {
                            if ctx.state().password == "abcDEF123!@#" {
                                Ok(())
                            } else {
                                Err(VigilError::assertion("password not carried over"))
                            }
                        })
                    }),
            );
            let report = SuiteRunner::new().run(&suite, &mut ctx).await;
            assert!(report.all_passed());
        }

        #[tokio::test]
        async fn test_failure_continues_without_fail_fast() {
            let mut ctx = context();
            ctx.driver().add_visible("menus.sandwich.menu");
            let suite = Suite::new("wallet").group(
                Group::new("Tokens")
                    .step(failing("token hidden in POA"))
                    .step(Click("menus.sandwich.menu")),
            );
            let report = SuiteRunner::new().run(&suite, &mut ctx).await;
            assert_eq!(report.failed_count(), 1);
            assert_eq!(report.passed_count(), 1);
            assert_eq!(
                report.failures()[0].error.as_deref(),
                Some("Assertion failed: tokens are displayed")
            );
        }

        #[tokio::test]
        async fn test_fail_fast_skips_rest() {
            let mut ctx = context();
            ctx.driver().add_visible("menus.sandwich.menu");
            let suite = Suite::new("wallet")
                .group(Group::new("Tokens").step(failing("token hidden in POA")))
                .group(Group::new("Menu").step(Click("menus.sandwich.menu")));
            let report = SuiteRunner::new()
                .with_fail_fast(true)
                .run(&suite, &mut ctx)
                .await;
            assert_eq!(report.failed_count(), 1);
            assert_eq!(report.skipped_count(), 1);
            assert!(ctx.driver().history().is_empty());
        }

        #[tokio::test]
        async fn test_skipped_step_not_run() {
            let mut ctx = context();
            let suite = Suite::new("wallet").group(
                Group::new("Import").skip(Click("screens.main.balance")),
            );
            let report = SuiteRunner::new().run(&suite, &mut ctx).await;
            assert_eq!(report.steps[0].status, StepStatus::Skipped);
            assert_eq!(ctx.driver().locate_count("screens.main.balance"), 0);
            assert!(report.all_passed());
        }
    }

    mod after_each_tests {
        use super::*;

        #[tokio::test]
        async fn test_console_errors_recorded() {
            let mut ctx = context();
            ctx.driver().set_console_logs(Some(vec![
                LogEntry::new(LogLevel::Warning, "slow"),
                LogEntry::new(LogLevel::Severe, "Uncaught TypeError: x is undefined"),
            ]));
            let suite = Suite::new("wallet").group(Group::new("Setup").step_fn("noop", |_ctx| {
                Box::pin(async { Ok(()) })
            }));
            let report = SuiteRunner::new()
                .with_console(ConsoleFilter::new())
                .run(&suite, &mut ctx)
                .await;
            assert!(report.all_passed());
            assert_eq!(
                report.steps[0].console_errors,
                vec!["Uncaught TypeError: x is undefined"]
            );
        }

        #[tokio::test]
        async fn test_artifacts_written_on_failure() {
            let dir = tempfile::tempdir().unwrap();
            let mut ctx = context();
            ctx.driver().set_screenshot(vec![1, 2, 3]);
            ctx.driver().set_page_source("<html></html>");
            let suite = Suite::new("wallet")
                .group(Group::new("Tokens").step(failing("checks the token balance")));
            let report = SuiteRunner::new()
                .with_artifacts(ArtifactWriter::new(dir.path(), BrowserKind::Chrome))
                .run(&suite, &mut ctx)
                .await;

            let step = &report.steps[0];
            let dom = step.dom.as_deref().unwrap();
            assert!(dom.ends_with("test-failure-dom.html"));
            assert!(std::path::Path::new(dom).exists());
            assert!(step.screenshot.is_some());
        }

        #[tokio::test]
        async fn test_no_artifacts_for_passing_step() {
            let dir = tempfile::tempdir().unwrap();
            let mut ctx = context();
            let suite = Suite::new("wallet").group(Group::new("Setup").step_fn("noop", |_ctx| {
                Box::pin(async { Ok(()) })
            }));
            let report = SuiteRunner::new()
                .with_artifacts(ArtifactWriter::new(dir.path(), BrowserKind::Chrome))
                .run(&suite, &mut ctx)
                .await;
            assert!(report.steps[0].dom.is_none());
            assert!(!dir.path().join("chrome").exists());
        }

        #[test]
        fn test_report_serializes() {
            let report = SuiteReport {
                suite_name: "wallet".into(),
                steps: vec![StepReport::new("Setup", "noop", StepStatus::Passed)],
                duration: Duration::from_millis(5),
            };
            let json = serde_json::to_value(&report).unwrap();
            assert_eq!(json["steps"][0]["status"], "passed");
        }
    }
}
