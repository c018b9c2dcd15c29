//! Condition polling against an asynchronously rendering UI.
//!
//! The wallet UI re-renders on its own event loop and never tells the
//! driver when a screen is ready, so every step synchronizes by polling:
//! sleep, look, repeat until the condition holds or the budget runs out.
//!
//! Budgets follow do-while semantics: the first check happens after the
//! first sleep, and a budget of `n` attempts allows `n + 1` checks. A
//! wall-clock deadline bounds the whole poll in addition to the count, so
//! slow driver round-trips cannot stretch a poll far past its ceiling.

use crate::clock::Clock;
use crate::driver::{ElementDriver, ElementHandle};
use crate::locator::Locator;
use crate::result::{VigilError, VigilResult};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Default attempt budget when waiting for an element to show up
pub const DEFAULT_APPEAR_ATTEMPTS: u32 = 200;

/// Default attempt budget when waiting for an element to go away
pub const DEFAULT_DISAPPEAR_ATTEMPTS: u32 = 10;

/// Default delay before each check (100ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// How the wall-clock bound of a poll is derived
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlinePolicy {
    /// `interval * (max_attempts + 1)`
    Nominal,
    /// Explicit bound
    Fixed(Duration),
    /// Attempt count only
    Unbounded,
}

/// Attempt budget for a single poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollBudget {
    max_attempts: u32,
    interval: Duration,
    deadline: DeadlinePolicy,
}

impl PollBudget {
    /// Create a budget with a nominal deadline
    #[must_use]
    pub const fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
            deadline: DeadlinePolicy::Nominal,
        }
    }

    /// Default budget for waiting on appearance (200 x 100ms)
    #[must_use]
    pub const fn appearance() -> Self {
        Self::new(
            DEFAULT_APPEAR_ATTEMPTS,
            Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        )
    }

    /// Default budget for waiting on disappearance (10 x 100ms)
    #[must_use]
    pub const fn disappearance() -> Self {
        Self::new(
            DEFAULT_DISAPPEAR_ATTEMPTS,
            Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        )
    }

    /// Set the attempt budget
    #[must_use]
    pub const fn with_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the delay before each check
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Bound the poll by an explicit wall-clock deadline
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = DeadlinePolicy::Fixed(deadline);
        self
    }

    /// Bound the poll by attempt count only
    #[must_use]
    pub const fn without_deadline(mut self) -> Self {
        self.deadline = DeadlinePolicy::Unbounded;
        self
    }

    /// Attempt budget
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before each check
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Deadline policy
    #[must_use]
    pub const fn deadline_policy(&self) -> DeadlinePolicy {
        self.deadline
    }

    /// Maximum number of checks this budget allows
    #[must_use]
    pub const fn max_checks(&self) -> u32 {
        self.max_attempts.saturating_add(1)
    }

    /// Effective wall-clock bound, if any
    ///
    /// A nominal bound needs a non-zero interval; with a zero interval the
    /// attempt count alone ends the poll.
    #[must_use]
    pub fn deadline(&self) -> Option<Duration> {
        match self.deadline {
            DeadlinePolicy::Nominal if self.interval.is_zero() => None,
            DeadlinePolicy::Nominal => Some(self.interval.saturating_mul(self.max_checks())),
            DeadlinePolicy::Fixed(d) => Some(d),
            DeadlinePolicy::Unbounded => None,
        }
    }
}

impl Default for PollBudget {
    fn default() -> Self {
        Self::appearance()
    }
}

/// What a single check saw
#[derive(Debug)]
pub enum Observation<T> {
    /// Condition holds; the poll settles with this value
    Ready(T),
    /// Condition does not hold yet
    Pending,
    /// The driver failed while checking
    Fault(VigilError),
}

/// Terminal state of a poll
#[derive(Debug)]
pub enum PollOutcome<T> {
    /// Condition held on some check
    Found(T),
    /// Budget or deadline ran out while the condition did not hold
    NotFound,
    /// The driver misbehaved: a fatal error, or the last check faulted
    DriverError(VigilError),
}

impl<T> PollOutcome<T> {
    /// Whether the condition held
    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// Borrow the settled value
    #[must_use]
    pub const fn found(&self) -> Option<&T> {
        match self {
            Self::Found(value) => Some(value),
            _ => None,
        }
    }

    /// Take the settled value
    #[must_use]
    pub fn into_found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            _ => None,
        }
    }

    /// Driver error, if that is how the poll ended
    #[must_use]
    pub const fn driver_error(&self) -> Option<&VigilError> {
        match self {
            Self::DriverError(err) => Some(err),
            _ => None,
        }
    }
}

/// Outcome of a poll plus how it got there
#[derive(Debug)]
pub struct PollReport<T> {
    /// Terminal state
    pub outcome: PollOutcome<T>,
    /// Checks performed
    pub attempts: u32,
    /// Time from start to settle
    pub elapsed: Duration,
    /// Description of what was waited for
    pub waited_for: String,
}

impl<T> PollReport<T> {
    /// Whether the condition held
    #[must_use]
    pub const fn is_found(&self) -> bool {
        self.outcome.is_found()
    }

    /// Borrow the settled value
    #[must_use]
    pub const fn found(&self) -> Option<&T> {
        self.outcome.found()
    }

    /// Take the settled value
    #[must_use]
    pub fn into_found(self) -> Option<T> {
        self.outcome.into_found()
    }

    /// Convert into a `Result`; `exhausted` builds the error for `NotFound`
    /// from the waited-for description, attempts and elapsed time
    pub fn into_result_with(
        self,
        exhausted: impl FnOnce(String, u32, Duration) -> VigilError,
    ) -> VigilResult<T> {
        let Self {
            outcome,
            attempts,
            elapsed,
            waited_for,
        } = self;
        match outcome {
            PollOutcome::Found(value) => Ok(value),
            PollOutcome::DriverError(err) => Err(err),
            PollOutcome::NotFound => Err(exhausted(waited_for, attempts, elapsed)),
        }
    }
}

/// Generic poll engine: sleep, check, repeat until settled.
///
/// `check` receives the 1-based attempt number. A fatal fault settles the
/// poll immediately; other faults are retried.
pub async fn poll_until<C, F, Fut, T>(
    clock: &C,
    budget: &PollBudget,
    waited_for: &str,
    mut check: F,
) -> PollReport<T>
where
    C: Clock + ?Sized,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Observation<T>>,
{
    let start = clock.now();
    let deadline = budget.deadline();
    let mut remaining = budget.max_attempts();
    let mut attempt = 0_u32;

    let outcome = loop {
        clock.sleep(budget.interval()).await;
        attempt += 1;
        debug!(waited_for, attempt, remaining, "poll attempt");

        let last_fault = match check(attempt).await {
            Observation::Ready(value) => break PollOutcome::Found(value),
            Observation::Pending => None,
            Observation::Fault(err) if err.is_fatal() => break PollOutcome::DriverError(err),
            Observation::Fault(err) => {
                debug!(waited_for, attempt, error = %err, "poll attempt faulted");
                Some(err)
            }
        };

        if remaining == 0 {
            break exhausted(last_fault);
        }
        remaining -= 1;

        let elapsed = clock.now().saturating_sub(start);
        if deadline.is_some_and(|d| elapsed >= d) {
            debug!(
                waited_for,
                attempt,
                elapsed_ms = elapsed.as_millis() as u64,
                "poll deadline reached"
            );
            break exhausted(last_fault);
        }
    };

    let elapsed = clock.now().saturating_sub(start);
    debug!(
        waited_for,
        attempts = attempt,
        elapsed_ms = elapsed.as_millis() as u64,
        found = outcome.is_found(),
        "poll settled"
    );

    PollReport {
        outcome,
        attempts: attempt,
        elapsed,
        waited_for: waited_for.to_string(),
    }
}

fn exhausted<T>(last_fault: Option<VigilError>) -> PollOutcome<T> {
    last_fault.map_or(PollOutcome::NotFound, PollOutcome::DriverError)
}

/// Single-shot visibility of a locator
#[derive(Debug)]
pub enum Visibility {
    /// Located and displayed
    Visible(ElementHandle),
    /// Located but not displayed
    Hidden,
    /// Not located, stale, or the selector does not resolve
    Absent,
    /// The driver failed for another reason
    Fault(VigilError),
}

impl Visibility {
    /// Whether the element is displayed
    #[must_use]
    pub const fn is_displayed(&self) -> bool {
        matches!(self, Self::Visible(_))
    }
}

/// Locate and query displayed-state once, never failing
pub async fn check_visibility<D>(driver: &D, locator: &Locator) -> Visibility
where
    D: ElementDriver + ?Sized,
{
    let handle = match driver.locate(locator).await {
        Ok(handle) => handle,
        Err(err) if err.is_resolution_failure() => return Visibility::Absent,
        Err(err) => return Visibility::Fault(err),
    };
    match driver.is_visible(&handle).await {
        Ok(true) => Visibility::Visible(handle),
        Ok(false) => Visibility::Hidden,
        Err(err) if err.is_resolution_failure() => Visibility::Absent,
        Err(err) => Visibility::Fault(err),
    }
}

/// Whether `locator` is displayed right now; any failure reads as `false`
pub async fn is_displayed<D>(driver: &D, locator: &Locator) -> bool
where
    D: ElementDriver + ?Sized,
{
    check_visibility(driver, locator).await.is_displayed()
}

/// Wait until `locator` is displayed and return its handle (first success wins)
pub async fn wait_for_appearance<D, C>(
    driver: &D,
    clock: &C,
    locator: &Locator,
    budget: &PollBudget,
) -> PollReport<ElementHandle>
where
    D: ElementDriver + ?Sized,
    C: Clock + ?Sized,
{
    poll_until(clock, budget, locator.name(), move |_| async move {
        match check_visibility(driver, locator).await {
            Visibility::Visible(handle) => Observation::Ready(handle),
            Visibility::Hidden | Visibility::Absent => Observation::Pending,
            Visibility::Fault(err) => Observation::Fault(err),
        }
    })
    .await
}

/// Wait until `locator` is absent or not displayed
pub async fn wait_for_disappearance<D, C>(
    driver: &D,
    clock: &C,
    locator: &Locator,
    budget: &PollBudget,
) -> PollReport<()>
where
    D: ElementDriver + ?Sized,
    C: Clock + ?Sized,
{
    poll_until(clock, budget, locator.name(), move |_| async move {
        match check_visibility(driver, locator).await {
            Visibility::Visible(_) => Observation::Pending,
            Visibility::Hidden | Visibility::Absent => Observation::Ready(()),
            Visibility::Fault(err) => Observation::Fault(err),
        }
    })
    .await
}

/// Wait until `locator` is displayed with text equal to `expected`
///
/// Balances and network names render after a backend round-trip, so the
/// element often shows up before its final text does.
pub async fn wait_for_text<D, C>(
    driver: &D,
    clock: &C,
    locator: &Locator,
    expected: &str,
    budget: &PollBudget,
) -> PollReport<ElementHandle>
where
    D: ElementDriver + ?Sized,
    C: Clock + ?Sized,
{
    poll_until(clock, budget, locator.name(), move |_| async move {
        let handle = match check_visibility(driver, locator).await {
            Visibility::Visible(handle) => handle,
            Visibility::Hidden | Visibility::Absent => return Observation::Pending,
            Visibility::Fault(err) => return Observation::Fault(err),
        };
        match driver.text(&handle).await {
            Ok(text) if text.trim() == expected => Observation::Ready(handle),
            Ok(_) => Observation::Pending,
            Err(err) if err.is_resolution_failure() => Observation::Pending,
            Err(err) => Observation::Fault(err),
        }
    })
    .await
}

// ============================================================================
// Tests
// ============================================================================
