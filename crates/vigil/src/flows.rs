//! Multi-step wallet interactions shared across scenarios.
//!
//! Each flow drives the popup through the locator table and waits on the
//! screen it expects next, so a flow either leaves the UI in a known state
//! or returns an error naming the element that never showed up.

use crate::clock::Clock;
use crate::context::ScenarioContext;
use crate::driver::ElementDriver;
use crate::network::Network;
use crate::result::{VigilError, VigilResult};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

const SET_PROVIDER_TYPE: &str = "window.metamask.setProviderType(arguments[0]);";
const FIELD_SETTLE: Duration = Duration::from_millis(500);
const MENU_SETTLE: Duration = Duration::from_millis(500);
const TOKENS_SETTLE: Duration = Duration::from_millis(800);
const SCREEN_SETTLE: Duration = Duration::from_millis(300);

/// Label the account menu puts on imported accounts
const IMPORTED_LABEL: &str = "IMPORTED";
/// Attempts allowed for an element that must not show up
const ABSENT_ATTEMPTS: u32 = 5;
const DELETE_BUTTON_ATTEMPTS: u32 = 10;
const CUSTOM_RPC_GONE_ATTEMPTS: u32 = 20;

const SCROLL_INTO_VIEW: &str = "arguments[0].scrollIntoView(true);";

fn dropdown_click_script(index: usize) -> String {
    format!("document.getElementsByClassName('dropdown-menu-item')[{index}].click();")
}

/// Scroll the terms of use to the bottom and accept them
pub async fn accept_terms<D, C>(ctx: &ScenarioContext<D, C>) -> VigilResult<()>
where
    D: ElementDriver,
    C: Clock,
{
    info!("accepting terms of use");
    ctx.expect_text("screens.TOU.title", "screens.TOU.titleText")
        .await?;
    let link = ctx.show_up("screens.TOU.linkTerms").await?;
    ctx.driver()
        .execute_script(SCROLL_INTO_VIEW, &[link.to_script_arg()])
        .await?;
    ctx.click("screens.TOU.button").await
}

/// Create a vault with the context password and return its seed phrase
pub async fn create_vault<D, C>(ctx: &ScenarioContext<D, C>) -> VigilResult<String>
where
    D: ElementDriver,
    C: Clock,
{
    info!("creating vault");
    let password = ctx.state().password.clone();
    ctx.type_into("screens.create.fieldPassword", &password)
        .await?;
    ctx.type_into("screens.create.fieldPasswordConfirm", &password)
        .await?;
    ctx.click("screens.create.button").await?;

    let phrase = ctx.text_of("screens.seedPhrase.fieldPhrase").await?;
    let words = phrase.split_whitespace().count();
    if words != 12 {
        return Err(VigilError::assertion(format!(
            "seed phrase has {words} words, expected 12"
        )));
    }
    ctx.expect_text(
        "screens.seedPhrase.buttonIveCopied",
        "screens.seedPhrase.textButtonIveCopied",
    )
    .await?;
    ctx.click("screens.seedPhrase.buttonIveCopied").await?;
    Ok(phrase)
}

/// Restore a vault from the lock screen using `phrase` and the context password
pub async fn restore_vault<D, C>(ctx: &ScenarioContext<D, C>, phrase: &str) -> VigilResult<()>
where
    D: ElementDriver,
    C: Clock,
{
    info!("restoring vault from seed phrase");
    ctx.expect_text("screens.lock.linkRestore", "screens.lock.linkRestoreText")
        .await?;
    ctx.click("screens.lock.linkRestore").await?;
    let password = ctx.state().password.clone();
    ctx.type_into("screens.restoreVault.textArea", phrase).await?;
    ctx.type_into("screens.restoreVault.fieldPassword", &password)
        .await?;
    ctx.type_into("screens.restoreVault.fieldPasswordConfirm", &password)
        .await?;
    ctx.click("screens.restoreVault.buttons.ok").await
}

/// Switch network through the background page API
pub async fn set_provider_type<D, C>(
    ctx: &ScenarioContext<D, C>,
    network: &Network,
) -> VigilResult<()>
where
    D: ElementDriver,
    C: Clock,
{
    debug!(network = %network, "set provider type");
    ctx.driver()
        .execute_script(SET_PROVIDER_TYPE, &[json!(network.provider_type())])
        .await?;
    Ok(())
}

/// Switch network through the dropdown menu
pub async fn select_network<D, C>(ctx: &ScenarioContext<D, C>, network: &Network) -> VigilResult<()>
where
    D: ElementDriver,
    C: Clock,
{
    info!(network = %network, "selecting network");
    ctx.click("screens.main.network").await?;
    ctx.driver()
        .execute_script(&dropdown_click_script(network.dropdown_index()), &[])
        .await?;
    Ok(())
}

/// Add a token from the main screen's token tab
pub async fn add_token<D, C>(
    ctx: &mut ScenarioContext<D, C>,
    address: &str,
    symbol: &str,
    decimals: &str,
) -> VigilResult<()>
where
    D: ElementDriver,
    C: Clock,
{
    info!(address, symbol, decimals, "adding token");
    ctx.click("screens.main.tokens.buttonAdd").await?;
    ctx.type_into("screens.addToken.fields.contractAddress", address)
        .await?;
    ctx.delay(FIELD_SETTLE).await;
    ctx.type_into("screens.addToken.fields.tokenSymbol", symbol)
        .await?;
    ctx.delay(FIELD_SETTLE).await;
    ctx.type_into("screens.addToken.fields.decimals", decimals)
        .await?;
    ctx.click("screens.addToken.buttonAdd").await?;
    ctx.state_mut().token_address = Some(address.to_string());
    Ok(())
}

/// Require the token section to report no tokens for the current network
pub async fn assert_tokens_not_displayed<D, C>(ctx: &ScenarioContext<D, C>) -> VigilResult<()>
where
    D: ElementDriver,
    C: Clock,
{
    ctx.delay(TOKENS_SETTLE).await;
    let loader = ctx.poll_disappear("elements.loader").await?;
    if !loader.is_found() {
        debug!(attempts = loader.attempts, "loader still displayed");
    }
    if ctx.show_up("screens.main.tokens.amount").await.is_err() {
        return Err(VigilError::assertion("App is frozen"));
    }

    let amounts = ctx.count("screens.main.tokens.amount").await?;
    if amounts != 1 {
        return Err(VigilError::assertion(format!(
            "'Tokens' section has {amounts} amount fields, expected 1"
        )));
    }
    ctx.expect_text("screens.main.tokens.amount", "screens.main.tokens.textNoTokens")
        .await?;

    let tokens = ctx.count("screens.main.tokens.token").await?;
    if tokens != 0 {
        return Err(VigilError::assertion(format!(
            "Unexpected token present ({tokens} listed)"
        )));
    }
    Ok(())
}

/// Require the token section to list exactly one token
pub async fn assert_token_displayed<D, C>(ctx: &ScenarioContext<D, C>) -> VigilResult<()>
where
    D: ElementDriver,
    C: Clock,
{
    ctx.delay(TOKENS_SETTLE).await;
    if ctx.show_up("screens.main.tokens.amount").await.is_err() {
        return Err(VigilError::assertion("App is frozen"));
    }
    ctx.expect_text(
        "screens.main.tokens.amount",
        "screens.main.tokens.textYouOwn1token",
    )
    .await
}

/// Open the remove-token screen for the first token and leave it with
/// the back arrow; the token must still be listed afterwards
pub async fn cancel_remove_token<D, C>(ctx: &ScenarioContext<D, C>) -> VigilResult<()>
where
    D: ElementDriver,
    C: Clock,
{
    info!("opening remove token screen, then going back");
    open_remove_token(ctx).await?;
    ctx.delay(MENU_SETTLE).await;
    ctx.click("screens.removeToken.buttons.back").await?;
    ctx.delay(SCREEN_SETTLE).await;

    let tokens = ctx.count("screens.main.tokens.token").await?;
    if tokens != 1 {
        return Err(VigilError::assertion(format!(
            "There should be 1 token, found {tokens}"
        )));
    }
    Ok(())
}

/// Remove the first token and require the token list to be empty
pub async fn remove_token<D, C>(ctx: &mut ScenarioContext<D, C>) -> VigilResult<()>
where
    D: ElementDriver,
    C: Clock,
{
    info!("removing token");
    open_remove_token(ctx).await?;
    ctx.click("screens.removeToken.buttons.yes").await?;
    ctx.delay(SCREEN_SETTLE).await;
    ctx.state_mut().token_address = None;
    assert_tokens_not_displayed(ctx).await
}

async fn open_remove_token<D, C>(ctx: &ScenarioContext<D, C>) -> VigilResult<()>
where
    D: ElementDriver,
    C: Clock,
{
    ctx.click("screens.main.tokens.remove").await?;
    ctx.expect_text("screens.removeToken.title", "screens.removeToken.titleText")
        .await
}

/// Read the token balance shown on the main screen
pub async fn token_balance<D, C>(ctx: &ScenarioContext<D, C>) -> VigilResult<String>
where
    D: ElementDriver,
    C: Clock,
{
    ctx.text_of("screens.main.tokens.balance").await
}

/// Read the active account address and remember it
pub async fn read_account_address<D, C>(ctx: &mut ScenarioContext<D, C>) -> VigilResult<String>
where
    D: ElementDriver,
    C: Clock,
{
    let address = ctx.text_of("screens.main.address").await?;
    ctx.state_mut().account_address = Some(address.clone());
    Ok(address)
}

/// Create an additional account from the account menu
pub async fn add_account<D, C>(ctx: &ScenarioContext<D, C>) -> VigilResult<()>
where
    D: ElementDriver,
    C: Clock,
{
    info!("adding account");
    ctx.click("menus.account.menu").await?;
    ctx.delay(SCREEN_SETTLE).await;
    ctx.click("menus.account.createAccount").await
}

/// Open the QR code view and require it to show the remembered address
pub async fn check_qr_address<D, C>(ctx: &ScenarioContext<D, C>) -> VigilResult<()>
where
    D: ElementDriver,
    C: Clock,
{
    let expected = ctx
        .state()
        .account_address
        .clone()
        .ok_or_else(|| VigilError::assertion("account address was never read"))?;
    ctx.click("menus.dot.menu").await?;
    ctx.click("menus.dot.showQRcode").await?;
    ctx.delay(SCREEN_SETTLE).await;

    let shown = ctx.text_of("screens.QRcode.address").await?;
    if shown.trim() != expected.trim().to_lowercase() {
        return Err(VigilError::assertion(format!(
            "QR code shows {shown:?}, account details show {expected:?}"
        )));
    }
    ctx.click("screens.QRcode.buttonArrow").await?;
    ctx.delay(MENU_SETTLE).await;
    Ok(())
}

/// Import an account from a hex private key
///
/// Leaves the account menu open with the imported entry listed.
pub async fn import_account<D, C>(ctx: &ScenarioContext<D, C>, private_key: &str) -> VigilResult<()>
where
    D: ElementDriver,
    C: Clock,
{
    info!("importing account");
    ctx.click("menus.account.menu").await?;
    ctx.delay(MENU_SETTLE).await;
    ctx.click("menus.account.import").await?;
    ctx.delay(MENU_SETTLE).await;
    ctx.expect_text(
        "screens.importAccounts.title",
        "screens.importAccounts.textTitle",
    )
    .await?;
    ctx.type_into("screens.importAccounts.fieldPrivateKey", private_key)
        .await?;
    ctx.click("screens.importAccounts.buttonImport").await?;

    ctx.click("menus.account.menu").await?;
    ctx.delay(MENU_SETTLE).await;
    ctx.expect_literal("menus.account.labelImported", IMPORTED_LABEL)
        .await
}

/// Answer the delete-imported-account screen with Yes (`confirm`) or No
///
/// Expects the account menu to be open. Afterwards the imported entry is
/// required to be gone (Yes) or still listed (No).
pub async fn delete_imported_account<D, C>(ctx: &ScenarioContext<D, C>, confirm: bool) -> VigilResult<()>
where
    D: ElementDriver,
    C: Clock,
{
    info!(confirm, "deleting imported account");
    ctx.click("menus.account.delete").await?;
    ctx.expect_text(
        "screens.deleteImportedAccount.title",
        "screens.deleteImportedAccount.titleText",
    )
    .await?;
    let answer = if confirm {
        "screens.deleteImportedAccount.buttons.yes"
    } else {
        "screens.deleteImportedAccount.buttons.no"
    };
    ctx.click(answer).await?;
    ctx.delay(MENU_SETTLE).await;
    ctx.expect_text("screens.settings.title", "screens.settings.titleText")
        .await?;

    ctx.click("menus.account.menu").await?;
    ctx.delay(MENU_SETTLE).await;
    if !confirm {
        return ctx
            .expect_literal("menus.account.labelImported", IMPORTED_LABEL)
            .await;
    }
    let imported = ctx.count("menus.account.labelImported").await?;
    if imported != 0 {
        return Err(VigilError::assertion(format!(
            "{imported} imported account(s) still listed"
        )));
    }
    ctx.click("menus.account.menu").await
}

/// Open settings from the sandwich menu
pub async fn open_settings<D, C>(ctx: &ScenarioContext<D, C>) -> VigilResult<()>
where
    D: ElementDriver,
    C: Clock,
{
    ctx.click("menus.sandwich.menu").await?;
    ctx.delay(MENU_SETTLE).await;
    ctx.click("menus.sandwich.settings").await?;
    ctx.expect_text("screens.settings.title", "screens.settings.titleText")
        .await
}

/// Navigate from settings to the change-password screen
pub async fn open_change_password<D, C>(ctx: &ScenarioContext<D, C>) -> VigilResult<()>
where
    D: ElementDriver,
    C: Clock,
{
    open_settings(ctx).await?;
    ctx.click("screens.settings.buttons.changePassword").await?;
    ctx.expect_text("screens.changePassword.title", "screens.changePassword.titleText")
        .await
}

/// Change the unlock password from the settings screen
///
/// The context password is updated once settings shows up again.
pub async fn change_password<D, C>(ctx: &mut ScenarioContext<D, C>, new_password: &str) -> VigilResult<()>
where
    D: ElementDriver,
    C: Clock,
{
    info!("changing password");
    open_change_password(ctx).await?;
    confirm_password_change(ctx, new_password).await
}

/// Submit a valid change on the already open change-password screen
pub async fn confirm_password_change<D, C>(
    ctx: &mut ScenarioContext<D, C>,
    new_password: &str,
) -> VigilResult<()>
where
    D: ElementDriver,
    C: Clock,
{
    let old_password = ctx.state().password.clone();
    fill_password_change(ctx, &old_password, new_password, new_password).await?;

    if let Err(err) = ctx.show_up("screens.settings.buttons.changePassword").await {
        if ctx.displayed("screens.changePassword.error").await {
            let message = ctx.text_of("screens.changePassword.error").await?;
            return Err(VigilError::assertion(format!(
                "password change rejected: {message}"
            )));
        }
        return Err(err);
    }
    let state = ctx.state_mut();
    state.previous_password = Some(std::mem::replace(
        &mut state.password,
        new_password.to_string(),
    ));
    Ok(())
}

/// Submit an invalid change and require the error named by `error_key`
///
/// The screen stays open, so several rejections can run back to back.
pub async fn reject_password_change<D, C>(
    ctx: &ScenarioContext<D, C>,
    old_password: &str,
    new_password: &str,
    confirmation: &str,
    error_key: &str,
) -> VigilResult<()>
where
    D: ElementDriver,
    C: Clock,
{
    debug!(error_key, "expecting password change rejection");
    fill_password_change(ctx, old_password, new_password, confirmation).await?;
    ctx.expect_text("screens.changePassword.error", error_key)
        .await
}

async fn fill_password_change<D, C>(
    ctx: &ScenarioContext<D, C>,
    old_password: &str,
    new_password: &str,
    confirmation: &str,
) -> VigilResult<()>
where
    D: ElementDriver,
    C: Clock,
{
    ctx.type_into("screens.changePassword.fieldOldPassword", old_password)
        .await?;
    ctx.type_into("screens.changePassword.fieldNewPassword", new_password)
        .await?;
    ctx.type_into("screens.changePassword.fieldConfirmNewPassword", confirmation)
        .await?;
    ctx.click("screens.changePassword.buttonYes").await
}

/// Lock the wallet from the sandwich menu
pub async fn log_out<D, C>(ctx: &ScenarioContext<D, C>) -> VigilResult<()>
where
    D: ElementDriver,
    C: Clock,
{
    info!("logging out");
    ctx.click("menus.sandwich.menu").await?;
    ctx.delay(MENU_SETTLE).await;
    ctx.expect_text("menus.sandwich.logOut", "menus.sandwich.textLogOut")
        .await?;
    ctx.click("menus.sandwich.logOut").await?;
    ctx.show_up("screens.lock.fieldPassword").await?;
    Ok(())
}

/// Unlock with the context password and wait for the main screen
pub async fn unlock<D, C>(ctx: &ScenarioContext<D, C>) -> VigilResult<()>
where
    D: ElementDriver,
    C: Clock,
{
    info!("unlocking");
    let password = ctx.state().password.clone();
    ctx.type_into("screens.lock.fieldPassword", &password)
        .await?;
    ctx.click("screens.lock.buttonLogin").await?;

    if let Err(err) = ctx.show_up("screens.main.buttons.buy").await {
        if ctx.displayed("screens.lock.error").await {
            let message = ctx.text_of("screens.lock.error").await?;
            return Err(VigilError::assertion(format!("unlock rejected: {message}")));
        }
        return Err(err);
    }
    Ok(())
}

/// Try `password` on the lock screen and require the lock error
pub async fn expect_unlock_rejected<D, C>(ctx: &ScenarioContext<D, C>, password: &str) -> VigilResult<()>
where
    D: ElementDriver,
    C: Clock,
{
    ctx.type_into("screens.lock.fieldPassword", password)
        .await?;
    ctx.click("screens.lock.buttonLogin").await?;
    ctx.expect_text("screens.lock.error", "screens.lock.errorText")
        .await
}

/// Reach the settings screen through the network menu's custom RPC item
pub async fn open_custom_rpc<D, C>(ctx: &ScenarioContext<D, C>) -> VigilResult<()>
where
    D: ElementDriver,
    C: Clock,
{
    select_network(ctx, &Network::Custom(String::new())).await?;
    ctx.expect_text("screens.settings.title", "screens.settings.titleText")
        .await
}

/// Add a custom RPC endpoint on the open settings screen
pub async fn add_custom_rpc<D, C>(ctx: &ScenarioContext<D, C>, url: &str) -> VigilResult<()>
where
    D: ElementDriver,
    C: Clock,
{
    info!(url, "adding custom rpc");
    ctx.type_into("screens.settings.fieldNewRPC", url).await?;
    ctx.click("screens.settings.buttonSave").await?;
    ctx.expect_literal("screens.settings.customUrl", url).await
}

/// Submit an invalid RPC url and require the settings error `error_key`
///
/// The delete button must not appear, since nothing was added.
pub async fn reject_custom_rpc<D, C>(
    ctx: &ScenarioContext<D, C>,
    url: &str,
    error_key: &str,
) -> VigilResult<()>
where
    D: ElementDriver,
    C: Clock,
{
    debug!(url, error_key, "expecting custom rpc rejection");
    ctx.type_into("screens.settings.fieldNewRPC", url).await?;
    ctx.click("screens.settings.buttonSave").await?;
    if ctx
        .show_up_within("screens.settings.buttons.delete", ABSENT_ATTEMPTS)
        .await
        .is_ok()
    {
        return Err(VigilError::assertion(format!("invalid RPC {url:?} was added")));
    }
    let errors = ctx.count("screens.settings.error").await?;
    if errors != 1 {
        return Err(VigilError::assertion(format!(
            "expected one settings error, found {errors}"
        )));
    }
    ctx.expect_text("screens.settings.error", error_key).await
}

/// Require the network dropdown to list `url` as a custom RPC
pub async fn assert_custom_rpc_listed<D, C>(ctx: &ScenarioContext<D, C>, url: &str) -> VigilResult<()>
where
    D: ElementDriver,
    C: Clock,
{
    ctx.click("screens.main.network").await?;
    let listed = ctx
        .expect_literal("menus.networks.addedCustomRpc", url)
        .await;
    ctx.click("screens.main.network").await?;
    listed
}

/// Require the network dropdown to list no custom RPC
pub async fn assert_custom_rpc_gone<D, C>(ctx: &ScenarioContext<D, C>) -> VigilResult<()>
where
    D: ElementDriver,
    C: Clock,
{
    ctx.click("screens.main.network").await?;
    let shown = ctx
        .show_up_within("menus.networks.addedCustomRpc", CUSTOM_RPC_GONE_ATTEMPTS)
        .await
        .is_ok();
    ctx.click("screens.main.network").await?;
    if shown {
        return Err(VigilError::assertion(
            "deleted custom RPC is displayed in the network dropdown",
        ));
    }
    Ok(())
}

/// Answer the delete-custom-RPC screen with Yes (`confirm`) or No
///
/// Either answer must land back on settings.
pub async fn delete_custom_rpc<D, C>(ctx: &ScenarioContext<D, C>, confirm: bool) -> VigilResult<()>
where
    D: ElementDriver,
    C: Clock,
{
    info!(confirm, "deleting custom rpc");
    let delete = ctx
        .show_up_within("screens.settings.buttons.delete", DELETE_BUTTON_ATTEMPTS)
        .await?;
    ctx.driver().click(&delete).await?;
    ctx.expect_text("screens.settings.title", "screens.deleteCustomRPC.titleText")
        .await?;
    let answer = if confirm {
        "screens.deleteCustomRPC.buttons.yes"
    } else {
        "screens.deleteCustomRPC.buttons.no"
    };
    ctx.click(answer).await?;
    ctx.expect_text("screens.settings.title", "screens.settings.titleText")
        .await
}
