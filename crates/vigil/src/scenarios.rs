//! Built-in wallet smoke suite.

use crate::clock::Clock;
use crate::driver::ElementDriver;
use crate::flows;
use crate::network::Network;
use crate::result::VigilError;
use crate::suite::{Group, Suite};
use std::time::Duration;

/// Password the smoke suite switches to
pub const NEW_PASSWORD: &str = "abcDEF123!@#";

/// Same length as a valid password, but never the current one
const WRONG_PASSWORD: &str = "1234567890";
const SHORT_PASSWORD: &str = "123";

/// Demo key for the import account group
const DEMO_PRIVATE_KEY: &str = "c6b81c1252415d1acfda94474ab8f662a44c045f96749c805ff12a6074081586";

const TOKEN_SYMBOL: &str = "TST";
const TOKEN_DECIMALS: &str = "0";

const CUSTOM_RPC_URL: &str = "https://poa.infura.io/test1";
const INVALID_RPC_URL: &str = "http://lwkdfowi**&#v er";
const RPC_URL_WITHOUT_SCHEME: &str = "infura.com";

const NO_TOKEN_NETWORKS: [Network; 6] = [
    Network::Poa,
    Network::Sokol,
    Network::Mainnet,
    Network::Ropsten,
    Network::Kovan,
    Network::Rinkeby,
];

/// Fresh-install walkthrough: create a vault, lock and unlock, change the
/// password, import an account, add and remove a token and manage a
/// custom RPC
///
/// The Add Token group reads the contract address from
/// [`WalletState::token_address`](crate::context::WalletState), which the
/// caller seeds before running.
pub fn wallet_smoke_suite<D, C>(popup_url: impl Into<String>) -> Suite<D, C>
where
    D: ElementDriver + 'static,
    C: Clock + 'static,
{
    Suite::new("Wallet popup")
        .group(account_creation(popup_url.into()))
        .group(lock())
        .group(change_password())
        .group(import_account())
        .group(add_token())
        .group(token_per_network())
        .group(remove_token())
        .group(custom_rpc())
}

fn account_creation<D, C>(popup_url: String) -> Group<D, C>
where
    D: ElementDriver + 'static,
    C: Clock + 'static,
{
    Group::<D, C>::new("Account Creation")
        .step_fn("opens the popup", move |ctx| {
            let url = popup_url.clone();
            Box::pin(async move {
                ctx.delay(Duration::from_millis(300)).await;
                ctx.driver().navigate(&url).await
            })
        })
        .step_fn("accepts the terms of use", |ctx| {
            Box::pin(async move { flows::accept_terms(ctx).await })
        })
        .step_fn("creates a vault and shows the seed phrase", |ctx| {
            Box::pin(async move { flows::create_vault(ctx).await.map(|_| ()) })
        })
        .step_fn("sets provider type to localhost", |ctx| {
            Box::pin(async move { flows::select_network(ctx, &Network::Localhost).await })
        })
        .step_fn("adds a second account", |ctx| {
            Box::pin(async move { flows::add_account(ctx).await })
        })
        .step_fn("shows account address", |ctx| {
            Box::pin(async move {
                let address = flows::read_account_address(ctx).await?;
                if address.trim().is_empty() {
                    return Err(VigilError::assertion("account address is empty"));
                }
                Ok(())
            })
        })
}

fn lock<D, C>() -> Group<D, C>
where
    D: ElementDriver + 'static,
    C: Clock + 'static,
{
    Group::<D, C>::new("Lock")
        .step_fn("logs out of the vault", |ctx| {
            Box::pin(async move { flows::log_out(ctx).await })
        })
        .step_fn("accepts account password after lock", |ctx| {
            Box::pin(async move { flows::unlock(ctx).await })
        })
        .step_fn("QR code address matches account details", |ctx| {
            Box::pin(async move { flows::check_qr_address(ctx).await })
        })
}

fn change_password<D, C>() -> Group<D, C>
where
    D: ElementDriver + 'static,
    C: Clock + 'static,
{
    Group::<D, C>::new("Change password")
        .step_fn("opens the change password screen", |ctx| {
            Box::pin(async move { flows::open_change_password(ctx).await })
        })
        .step_fn("error if new password shorter than 8 digits", |ctx| {
            Box::pin(async move {
                let current = ctx.state().password.clone();
                flows::reject_password_change(
                    ctx,
                    &current,
                    SHORT_PASSWORD,
                    SHORT_PASSWORD,
                    "screens.changePassword.errorText.notLong",
                )
                .await
            })
        })
        .step_fn("error if new password doesn't match confirmation", |ctx| {
            Box::pin(async move {
                let current = ctx.state().password.clone();
                flows::reject_password_change(
                    ctx,
                    &current,
                    NEW_PASSWORD,
                    WRONG_PASSWORD,
                    "screens.changePassword.errorText.dontMatch",
                )
                .await
            })
        })
        .step_fn("error if new password matches old password", |ctx| {
            Box::pin(async move {
                let current = ctx.state().password.clone();
                flows::reject_password_change(
                    ctx,
                    &current,
                    &current,
                    &current,
                    "screens.changePassword.errorText.differ",
                )
                .await
            })
        })
        .step_fn("error if old password incorrect", |ctx| {
            Box::pin(async move {
                flows::reject_password_change(
                    ctx,
                    WRONG_PASSWORD,
                    NEW_PASSWORD,
                    NEW_PASSWORD,
                    "screens.changePassword.errorText.incorrectPassword",
                )
                .await
            })
        })
        .step_fn("changes the password", |ctx| {
            Box::pin(async move { flows::confirm_password_change(ctx, NEW_PASSWORD).await })
        })
        .step_fn("user can log out", |ctx| {
            Box::pin(async move { flows::log_out(ctx).await })
        })
        .step_fn("can't log in with old password", |ctx| {
            Box::pin(async move {
                let old = ctx
                    .state()
                    .previous_password
                    .clone()
                    .ok_or_else(|| VigilError::assertion("password was never changed"))?;
                flows::expect_unlock_rejected(ctx, &old).await
            })
        })
        .step_fn("accepts new password after lock", |ctx| {
            Box::pin(async move { flows::unlock(ctx).await })
        })
}

fn import_account<D, C>() -> Group<D, C>
where
    D: ElementDriver + 'static,
    C: Clock + 'static,
{
    Group::<D, C>::new("Import Account")
        .step_fn("imports account", |ctx| {
            Box::pin(async move { flows::import_account(ctx, DEMO_PRIVATE_KEY).await })
        })
        .step_fn("doesn't remove imported account with 'No' button", |ctx| {
            Box::pin(async move { flows::delete_imported_account(ctx, false).await })
        })
        .step_fn("removes imported account with 'Yes' button", |ctx| {
            Box::pin(async move { flows::delete_imported_account(ctx, true).await })
        })
}

fn add_token<D, C>() -> Group<D, C>
where
    D: ElementDriver + 'static,
    C: Clock + 'static,
{
    Group::<D, C>::new("Add Token")
        .step_fn("adds token to LOCALHOST network", |ctx| {
            Box::pin(async move {
                let address = ctx.state().token_address.clone().ok_or_else(|| {
                    VigilError::Config {
                        message: "no token contract address; set token_address or VIGIL_TOKEN_ADDRESS"
                            .to_string(),
                    }
                })?;
                flows::select_network(ctx, &Network::Localhost).await?;
                flows::add_token(ctx, &address, TOKEN_SYMBOL, TOKEN_DECIMALS).await
            })
        })
        .step_fn("checks the token balance", |ctx| {
            Box::pin(async move {
                let balance = flows::token_balance(ctx).await?;
                if !balance.trim().ends_with(TOKEN_SYMBOL) {
                    return Err(VigilError::assertion(format!(
                        "token balance {balance:?} is not in {TOKEN_SYMBOL}"
                    )));
                }
                Ok(())
            })
        })
}

fn token_per_network<D, C>() -> Group<D, C>
where
    D: ElementDriver + 'static,
    C: Clock + 'static,
{
    let mut group = Group::<D, C>::new("Token list per network");
    for network in NO_TOKEN_NETWORKS {
        let title = format!(
            "token should not be displayed in {} network",
            network.provider_type().to_uppercase()
        );
        group = group.step_fn(title, move |ctx| {
            let network = network.clone();
            Box::pin(async move {
                flows::select_network(ctx, &network).await?;
                flows::assert_tokens_not_displayed(ctx).await
            })
        });
    }
    group.step_fn("token still displayed in LOCALHOST network", |ctx| {
        Box::pin(async move {
            flows::select_network(ctx, &Network::Localhost).await?;
            flows::assert_token_displayed(ctx).await
        })
    })
}

fn remove_token<D, C>() -> Group<D, C>
where
    D: ElementDriver + 'static,
    C: Clock + 'static,
{
    let mut group = Group::<D, C>::new("Remove Token")
        .step_fn("opens the remove token screen and goes back", |ctx| {
            Box::pin(async move {
                flows::select_network(ctx, &Network::Localhost).await?;
                flows::cancel_remove_token(ctx).await
            })
        })
        .step_fn("removes the token from LOCALHOST", |ctx| {
            Box::pin(async move { flows::remove_token(ctx).await })
        });
    for network in NO_TOKEN_NETWORKS {
        let title = format!(
            "token was removed from {} network",
            network.provider_type().to_uppercase()
        );
        group = group.step_fn(title, move |ctx| {
            let network = network.clone();
            Box::pin(async move {
                flows::select_network(ctx, &network).await?;
                flows::assert_tokens_not_displayed(ctx).await
            })
        });
    }
    group
}

fn custom_rpc<D, C>() -> Group<D, C>
where
    D: ElementDriver + 'static,
    C: Clock + 'static,
{
    Group::<D, C>::new("Custom RPC")
        .step_fn("opens settings through Network -> Custom RPC", |ctx| {
            Box::pin(async move { flows::open_custom_rpc(ctx).await })
        })
        .step_fn("error message if RPC url is invalid", |ctx| {
            Box::pin(async move {
                flows::reject_custom_rpc(
                    ctx,
                    INVALID_RPC_URL,
                    "screens.settings.errors.invalidRpcUrl",
                )
                .await
            })
        })
        .step_fn("error message if RPC url has no HTTP/HTTPS prefix", |ctx| {
            Box::pin(async move {
                flows::reject_custom_rpc(
                    ctx,
                    RPC_URL_WITHOUT_SCHEME,
                    "screens.settings.errors.invalidHTTP",
                )
                .await
            })
        })
        .step_fn("adds a valid custom RPC", |ctx| {
            Box::pin(async move { flows::add_custom_rpc(ctx, CUSTOM_RPC_URL).await })
        })
        .step_fn("new RPC is listed in the network dropdown", |ctx| {
            Box::pin(async move { flows::assert_custom_rpc_listed(ctx, CUSTOM_RPC_URL).await })
        })
        .step_fn("'No' on Delete Custom RPC returns to settings", |ctx| {
            Box::pin(async move { flows::delete_custom_rpc(ctx, false).await })
        })
        .step_fn("deletes the custom RPC", |ctx| {
            Box::pin(async move { flows::delete_custom_rpc(ctx, true).await })
        })
        .step_fn("deleted RPC is not listed in the network dropdown", |ctx| {
            Box::pin(async move { flows::assert_custom_rpc_gone(ctx).await })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::context::{ScenarioContext, WalletState};
    use crate::driver::MockDriver;
    use crate::suite::{StepStatus, SuiteRunner};
    use std::sync::Arc;

    type MockSuite = Suite<MockDriver, Arc<FakeClock>>;

    #[test]
    fn test_suite_shape() {
        let suite: MockSuite = wallet_smoke_suite("chrome-extension://id/popup.html");
        assert_eq!(suite.name(), "Wallet popup");
        assert_eq!(suite.step_count(), 6 + 3 + 9 + 3 + 2 + 7 + 8 + 8);
    }

    #[test]
    fn test_group_step_counts() {
        assert_eq!(lock::<MockDriver, Arc<FakeClock>>().len(), 3);
        assert_eq!(change_password::<MockDriver, Arc<FakeClock>>().len(), 9);
        assert_eq!(import_account::<MockDriver, Arc<FakeClock>>().len(), 3);
        assert_eq!(token_per_network::<MockDriver, Arc<FakeClock>>().len(), 7);
        assert_eq!(remove_token::<MockDriver, Arc<FakeClock>>().len(), 8);
        assert_eq!(custom_rpc::<MockDriver, Arc<FakeClock>>().len(), 8);
    }

    #[tokio::test]
    async fn test_fail_fast_stops_at_missing_terms() {
        let suite = wallet_smoke_suite("chrome-extension://id/popup.html");
        let mut ctx = ScenarioContext::new(MockDriver::new(), FakeClock::shared());
        let report = SuiteRunner::new()
            .with_fail_fast(true)
            .run(&suite, &mut ctx)
            .await;

        assert_eq!(report.steps[0].status, StepStatus::Passed);
        assert_eq!(report.steps[1].status, StepStatus::Failed);
        assert_eq!(report.skipped_count(), report.total() - 2);
        assert!(ctx
            .driver()
            .was_called("navigate:chrome-extension://id/popup.html"));
    }

    #[tokio::test]
    async fn test_add_token_group_needs_address() {
        let suite = Suite::new("tokens").group(add_token());
        let mut ctx = ScenarioContext::new(MockDriver::new(), FakeClock::shared());
        let report = SuiteRunner::new()
            .with_fail_fast(true)
            .run(&suite, &mut ctx)
            .await;

        assert_eq!(report.steps[0].status, StepStatus::Failed);
        assert!(!ctx.driver().was_called("click:"));
    }

    #[tokio::test]
    async fn test_add_token_group_uses_seeded_address() {
        let suite = Suite::new("tokens").group(add_token());
        let driver = MockDriver::new();
        for name in [
            "screens.main.network",
            "screens.main.tokens.buttonAdd",
            "screens.addToken.fields.contractAddress",
            "screens.addToken.fields.tokenSymbol",
            "screens.addToken.fields.decimals",
            "screens.addToken.buttonAdd",
        ] {
            driver.add_visible(name);
        }
        driver.add_text("screens.main.tokens.balance", "100 TST");
        let mut ctx = ScenarioContext::new(driver, FakeClock::shared()).with_state(WalletState {
            token_address: Some("0x7f3a".to_string()),
            ..WalletState::default()
        });

        let report = SuiteRunner::new().run(&suite, &mut ctx).await;
        assert!(report.all_passed());
        assert_eq!(
            ctx.driver()
                .text_value("screens.addToken.fields.contractAddress")
                .as_deref(),
            Some("0x7f3a")
        );
    }

    #[tokio::test]
    async fn test_change_password_group_on_mock() {
        let suite = Suite::new("password").group(change_password());
        let driver = MockDriver::new();
        for name in [
            "menus.sandwich.menu",
            "menus.sandwich.settings",
            "screens.settings.buttons.changePassword",
            "screens.changePassword.fieldOldPassword",
            "screens.changePassword.fieldNewPassword",
            "screens.changePassword.fieldConfirmNewPassword",
            "screens.lock.fieldPassword",
            "screens.lock.buttonLogin",
            "screens.main.buttons.buy",
        ] {
            driver.add_visible(name);
        }
        driver.add_text("screens.settings.title", "Settings");
        driver.add_text("screens.changePassword.title", "Change Password");
        driver.add_text("menus.sandwich.logOut", "Log Out");
        driver.add_text("screens.lock.error", "Incorrect password. Try again.");
        driver.add_visible("screens.changePassword.buttonYes");
        driver.add_visible("screens.changePassword.error");
        driver.on_click_text(
            "screens.changePassword.buttonYes",
            "screens.changePassword.error",
            "Password not long enough",
        );

        let mut ctx = ScenarioContext::new(driver, FakeClock::shared());
        let report = SuiteRunner::new()
            .with_fail_fast(true)
            .run(&suite, &mut ctx)
            .await;

        assert_eq!(report.steps[0].status, StepStatus::Passed);
        assert_eq!(report.steps[1].status, StepStatus::Passed);
        assert_eq!(report.steps[2].status, StepStatus::Failed);
        assert_eq!(ctx.state().password, crate::context::DEFAULT_PASSWORD);
    }
}
