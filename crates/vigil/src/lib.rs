//! Vigil: end-to-end test harness for a browser-extension wallet
//!
//! The wallet popup renders asynchronously and gives the driver no readiness
//! signal, so every step synchronizes by polling. Vigil provides the poller,
//! a named locator table for every screen of the popup, a scenario context
//! that threads wallet state between steps, and a sequential suite runner
//! that scans the console and captures failure artifacts after each step.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐    ┌──────────────┐    ┌───────────────┐    ┌──────────┐
//! │ Suite      │───►│ Scenario     │───►│ Poller        │───►│ Element  │
//! │ Runner     │    │ Context      │    │ (wait)        │    │ Driver   │
//! │ (steps)    │    │ (state+table)│    │ sleep, check  │    │ CDP/mock │
//! └────────────┘    └──────────────┘    └───────────────┘    └──────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use vigil::{LocatorTable, MockDriver, PollBudget, SystemClock, wait_for_appearance};
//!
//! # async fn demo() -> vigil::VigilResult<()> {
//! let driver = MockDriver::new();
//! let clock = SystemClock::new();
//! let table = LocatorTable::wallet();
//! let loader = table.get("elements.loader")?;
//! let report = wait_for_appearance(&driver, &clock, loader, &PollBudget::appearance()).await;
//! println!("found: {} after {} checks", report.is_found(), report.attempts);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod artifacts;
mod clock;
#[allow(clippy::missing_errors_doc, clippy::doc_markdown)]
mod config;
mod console;
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
mod context;
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::doc_markdown
)]
mod driver;
#[allow(clippy::too_many_lines)]
mod elements;
#[allow(clippy::missing_errors_doc)]
pub mod flows;
mod locator;
mod network;
mod result;
mod scenarios;
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
mod suite;
#[allow(clippy::missing_errors_doc, clippy::cast_possible_truncation)]
mod wait;

/// Chromium driver over the DevTools protocol
#[cfg(feature = "browser")]
#[allow(
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation,
    clippy::items_after_statements
)]
pub mod cdp;

pub use artifacts::{ArtifactWriter, FailureArtifacts};
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{BrowserKind, PollDefaults, SuiteConfig};
pub use console::ConsoleFilter;
pub use context::{ScenarioContext, WalletState, DEFAULT_PASSWORD};
pub use driver::{
    ElementDriver, ElementHandle, LogEntry, LogLevel, MockDriver, MockPresence, ELEMENT_REF_KEY,
};
pub use elements::LocatorTable;
pub use locator::{Locator, Selector};
pub use network::Network;
pub use result::{VigilError, VigilResult};
pub use scenarios::{wallet_smoke_suite, NEW_PASSWORD};
pub use suite::{FnStep, Group, Step, StepKind, StepReport, StepStatus, Suite, SuiteReport, SuiteRunner};
pub use wait::{
    check_visibility, is_displayed, poll_until, wait_for_appearance, wait_for_disappearance,
    wait_for_text,
    DeadlinePolicy, Observation, PollBudget, PollOutcome, PollReport, Visibility,
    DEFAULT_APPEAR_ATTEMPTS, DEFAULT_DISAPPEAR_ATTEMPTS, DEFAULT_POLL_INTERVAL_MS,
};

#[cfg(feature = "browser")]
pub use cdp::{ChromiumDriver, LaunchOptions};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::artifacts::*;
    pub use super::clock::*;
    pub use super::config::*;
    pub use super::console::*;
    pub use super::context::*;
    pub use super::driver::*;
    pub use super::elements::*;
    pub use super::flows;
    pub use super::locator::*;
    pub use super::network::*;
    pub use super::result::*;
    pub use super::scenarios::*;
    pub use super::suite::*;
    pub use super::wait::*;
    #[cfg(feature = "browser")]
    pub use super::cdp::*;
}
