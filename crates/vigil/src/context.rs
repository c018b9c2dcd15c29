//! Scenario context threaded through every step.
//!
//! Holds the driver, the clock, the locator table and the wallet state a
//! scenario accumulates (current password, imported account, added token).
//! Steps receive `&mut ScenarioContext` and never reach for globals.

use crate::clock::Clock;
use crate::config::PollDefaults;
use crate::driver::{ElementDriver, ElementHandle};
use crate::elements::LocatorTable;
use crate::locator::Locator;
use crate::result::{VigilError, VigilResult};
use crate::wait::{self, PollBudget, PollReport};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Password the wallet is created with
pub const DEFAULT_PASSWORD: &str = "123456789";

/// State a wallet scenario carries from step to step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletState {
    /// Current unlock password
    pub password: String,
    /// Password in use before the last change
    pub previous_password: Option<String>,
    /// Address of the active account, once read
    pub account_address: Option<String>,
    /// Contract address of the last added token
    pub token_address: Option<String>,
    /// Installed extension id
    pub extension_id: Option<String>,
}

impl Default for WalletState {
    fn default() -> Self {
        Self {
            password: DEFAULT_PASSWORD.to_string(),
            previous_password: None,
            account_address: None,
            token_address: None,
            extension_id: None,
        }
    }
}

/// Everything a step needs: driver, clock, locators, budgets, state
#[derive(Debug)]
pub struct ScenarioContext<D, C> {
    driver: D,
    clock: C,
    table: LocatorTable,
    poll: PollDefaults,
    state: WalletState,
}

impl<D, C> ScenarioContext<D, C>
where
    D: ElementDriver,
    C: Clock,
{
    /// Context over the wallet locator table with default budgets
    pub fn new(driver: D, clock: C) -> Self {
        Self {
            driver,
            clock,
            table: LocatorTable::wallet(),
            poll: PollDefaults::default(),
            state: WalletState::default(),
        }
    }

    /// Replace the locator table
    #[must_use]
    pub fn with_table(mut self, table: LocatorTable) -> Self {
        self.table = table;
        self
    }

    /// Replace the poll budgets
    #[must_use]
    pub fn with_poll(mut self, poll: PollDefaults) -> Self {
        self.poll = poll;
        self
    }

    /// Replace the wallet state
    #[must_use]
    pub fn with_state(mut self, state: WalletState) -> Self {
        self.state = state;
        self
    }

    /// The driver
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// The clock
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// The locator table
    pub fn table(&self) -> &LocatorTable {
        &self.table
    }

    /// Poll budgets in effect
    pub fn poll(&self) -> &PollDefaults {
        &self.poll
    }

    /// Wallet state
    pub fn state(&self) -> &WalletState {
        &self.state
    }

    /// Mutable wallet state
    pub fn state_mut(&mut self) -> &mut WalletState {
        &mut self.state
    }

    /// Give the driver back
    pub fn into_driver(self) -> D {
        self.driver
    }

    /// Look up a locator by logical name
    pub fn locator(&self, name: &str) -> VigilResult<Locator> {
        self.table.get(name).cloned()
    }

    /// Look up a text constant by logical name
    pub fn text(&self, name: &str) -> VigilResult<&str> {
        self.table.text_of(name)
    }

    /// Wait for `name` with the default appearance budget
    pub async fn show_up(&self, name: &str) -> VigilResult<ElementHandle> {
        self.show_up_with(name, &self.poll.appearance()).await
    }

    /// Wait for `name` with a custom attempt count
    pub async fn show_up_within(&self, name: &str, attempts: u32) -> VigilResult<ElementHandle> {
        self.show_up_with(name, &self.poll.appearance_within(attempts))
            .await
    }

    /// Wait for `name` with an explicit budget
    pub async fn show_up_with(&self, name: &str, budget: &PollBudget) -> VigilResult<ElementHandle> {
        let locator = self.locator(name)?;
        wait::wait_for_appearance(&self.driver, &self.clock, &locator, budget)
            .await
            .into_result_with(not_shown)
    }

    /// Wait for `name` to go away with the default disappearance budget
    pub async fn disappear(&self, name: &str) -> VigilResult<()> {
        let locator = self.locator(name)?;
        wait::wait_for_disappearance(&self.driver, &self.clock, &locator, &self.poll.disappearance())
            .await
            .into_result_with(|locator, attempts, _| VigilError::ElementStillShown {
                locator,
                attempts,
            })
    }

    /// Poll for `name` going away, reporting instead of failing
    pub async fn poll_disappear(&self, name: &str) -> VigilResult<PollReport<()>> {
        let locator = self.locator(name)?;
        Ok(
            wait::wait_for_disappearance(
                &self.driver,
                &self.clock,
                &locator,
                &self.poll.disappearance(),
            )
            .await,
        )
    }

    /// Single-shot displayed check; unknown names read as not displayed
    pub async fn displayed(&self, name: &str) -> bool {
        match self.table.get(name) {
            Ok(locator) => wait::is_displayed(&self.driver, locator).await,
            Err(_) => false,
        }
    }

    /// Wait for `name` and click it
    pub async fn click(&self, name: &str) -> VigilResult<()> {
        let element = self.show_up(name).await?;
        debug!(name, "click");
        self.driver.click(&element).await
    }

    /// Wait for `name`, clear it and type `text`
    pub async fn type_into(&self, name: &str, text: &str) -> VigilResult<()> {
        let element = self.show_up(name).await?;
        self.driver.clear(&element).await?;
        self.driver.send_keys(&element, text).await
    }

    /// Wait for `name` and read its text
    pub async fn text_of(&self, name: &str) -> VigilResult<String> {
        let element = self.show_up(name).await?;
        self.driver.text(&element).await
    }

    /// Number of elements currently matching `name`
    pub async fn count(&self, name: &str) -> VigilResult<usize> {
        let locator = self.locator(name)?;
        Ok(self.driver.locate_all(&locator).await?.len())
    }

    /// Wait until `name` shows the text constant `text_key`
    pub async fn expect_text(&self, name: &str, text_key: &str) -> VigilResult<()> {
        let expected = self.text(text_key)?.to_string();
        self.expect_literal(name, &expected).await
    }

    /// Wait until `name` shows exactly `expected` (trimmed)
    pub async fn expect_literal(&self, name: &str, expected: &str) -> VigilResult<()> {
        let locator = self.locator(name)?;
        let report = wait::wait_for_text(
            &self.driver,
            &self.clock,
            &locator,
            expected,
            &self.poll.appearance(),
        )
        .await;
        if report.is_found() {
            return Ok(());
        }
        if let Some(err) = report.outcome.driver_error() {
            return Err(VigilError::assertion(format!(
                "{name} text check failed: {err}"
            )));
        }
        let actual = match wait::check_visibility(&self.driver, &locator).await {
            wait::Visibility::Visible(handle) => self.driver.text(&handle).await.ok(),
            _ => None,
        };
        Err(VigilError::assertion(match actual {
            Some(actual) => format!("{name}: expected {expected:?}, found {actual:?}"),
            None => format!("{name}: expected {expected:?}, element not shown"),
        }))
    }

    /// Fixed pause, for animations the UI gives no signal for
    pub async fn delay(&self, duration: Duration) {
        self.clock.sleep(duration).await;
    }
}

fn not_shown(locator: String, attempts: u32, elapsed: Duration) -> VigilError {
    VigilError::ElementNotShown {
        locator,
        attempts,
        elapsed_ms: elapsed.as_millis() as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::driver::MockDriver;
    use std::sync::Arc;

    fn context() -> ScenarioContext<MockDriver, Arc<FakeClock>> {
        ScenarioContext::new(MockDriver::new(), FakeClock::shared())
    }

    mod state_tests {
        use super::*;

        #[test]
        fn test_default_password() {
            let ctx = context();
            assert_eq!(ctx.state().password, "123456789");
            assert!(ctx.state().token_address.is_none());
        }

        #[test]
        fn test_state_is_per_context() {
            let mut a = context();
            let b = context();
            a.state_mut().password = "new-password".into();
            assert_eq!(a.state().password, "new-password");
            assert_eq!(b.state().password, DEFAULT_PASSWORD);
        }
    }

    mod helper_tests {
        use super::*;

        #[tokio::test]
        async fn test_show_up_returns_handle() {
            let ctx = context();
            ctx.driver().appear_on("screens.lock.fieldPassword", 3);
            let handle = ctx.show_up("screens.lock.fieldPassword").await.unwrap();
            assert!(handle.id().starts_with("mock-"));
            assert_eq!(ctx.driver().locate_count("screens.lock.fieldPassword"), 3);
            assert_eq!(ctx.clock().now_ms(), 300);
        }

        #[tokio::test]
        async fn test_show_up_within_reports_not_shown() {
            let ctx = context();
            let err = ctx.show_up_within("elements.loader", 3).await.unwrap_err();
            match err {
                VigilError::ElementNotShown {
                    locator,
                    attempts,
                    elapsed_ms,
                } => {
                    assert_eq!(locator, "elements.loader");
                    assert_eq!(attempts, 4);
                    assert_eq!(elapsed_ms, 400);
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[tokio::test]
        async fn test_unknown_name_is_error() {
            let ctx = context();
            assert!(matches!(
                ctx.show_up("screens.nowhere").await,
                Err(VigilError::UnknownLocator { .. })
            ));
            assert!(!ctx.displayed("screens.nowhere").await);
        }

        #[tokio::test]
        async fn test_disappear() {
            let ctx = context();
            ctx.driver().disappear_on("elements.loader", 2);
            ctx.disappear("elements.loader").await.unwrap();

            ctx.driver().add_visible("screens.main.network");
            let err = ctx.disappear("screens.main.network").await.unwrap_err();
            assert!(matches!(
                err,
                VigilError::ElementStillShown { attempts: 11, .. }
            ));
        }

        #[tokio::test]
        async fn test_type_into_clears_then_types() {
            let ctx = context();
            ctx.driver().add_text("screens.lock.fieldPassword", "stale");
            ctx.type_into("screens.lock.fieldPassword", "123456789")
                .await
                .unwrap();
            assert_eq!(
                ctx.driver().text_value("screens.lock.fieldPassword").unwrap(),
                "123456789"
            );
            assert!(ctx.driver().was_called("clear:screens.lock.fieldPassword"));
        }

        #[tokio::test]
        async fn test_click_records_call() {
            let ctx = context();
            ctx.driver().add_visible("menus.sandwich.menu");
            ctx.click("menus.sandwich.menu").await.unwrap();
            assert!(ctx.driver().was_called("click:menus.sandwich.menu"));
        }

        #[tokio::test]
        async fn test_count() {
            let ctx = context();
            assert_eq!(ctx.count("screens.main.tokens.token").await.unwrap(), 0);
            ctx.driver().add_visible("screens.main.tokens.token");
            ctx.driver().set_count("screens.main.tokens.token", 2);
            assert_eq!(ctx.count("screens.main.tokens.token").await.unwrap(), 2);
        }

        #[tokio::test]
        async fn test_expect_text() {
            let ctx = context().with_poll(PollDefaults {
                appear_attempts: 2,
                ..PollDefaults::default()
            });
            ctx.driver()
                .add_text("screens.main.tokens.amount", "  No tokens found ");
            ctx.expect_text("screens.main.tokens.amount", "screens.main.tokens.textNoTokens")
                .await
                .unwrap();

            ctx.driver().set_text("screens.main.tokens.amount", "You own 1 token");
            let err = ctx
                .expect_text("screens.main.tokens.amount", "screens.main.tokens.textNoTokens")
                .await
                .unwrap_err();
            assert!(err.to_string().contains("You own 1 token"));
        }

        #[tokio::test]
        async fn test_delay_uses_clock() {
            let ctx = context();
            ctx.delay(Duration::from_millis(1500)).await;
            assert_eq!(ctx.clock().now_ms(), 1500);
        }
    }
}
