//! Static locator table for the wallet popup.
//!
//! Locators are keyed by logical dotted names (`screens.addToken.title`),
//! grouped the way the popup groups its screens. Expected labels and
//! messages live next to them in a separate text map.

use crate::locator::{Locator, Selector};
use crate::result::{VigilError, VigilResult};
use serde::Serialize;
use std::collections::BTreeMap;

const APP: &str = "#app-content > div";
const FROM_RIGHT: &str = "#app-content > div > div.app-primary.from-right > div";
const FROM_LEFT: &str = "#app-content > div > div.app-primary.from-left > div";
const SETTINGS_BODY: &str = "#app-content > div > div.app-primary.from-right > div > div.flex-column.flex-justify-center.flex-grow.select-none > div";
const ACCOUNT_MENU: &str = "#app-content > div > div.full-width > div > div:nth-child(2) > span > div";
const TOKEN_SECTION: &str = "#app-content > div > div.app-primary.from-left > div > section > div.full-flex-height";

/// Lookup table of named locators and expected UI texts
#[derive(Debug, Clone, Default, Serialize)]
pub struct LocatorTable {
    locators: BTreeMap<String, Locator>,
    texts: BTreeMap<String, String>,
}

impl LocatorTable {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a locator under its own name, replacing any previous entry
    pub fn insert(&mut self, locator: Locator) {
        self.locators.insert(locator.name().to_string(), locator);
    }

    /// Add an expected text
    pub fn insert_text(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.texts.insert(name.into(), text.into());
    }

    fn add(&mut self, name: &str, selector: Selector) -> &mut Self {
        self.insert(Locator::new(name, selector));
        self
    }

    fn css(&mut self, name: &str, css: impl Into<String>) -> &mut Self {
        self.add(name, Selector::css(css))
    }

    fn id(&mut self, name: &str, id: &str) -> &mut Self {
        self.add(name, Selector::id(id))
    }

    fn class(&mut self, name: &str, class: &str) -> &mut Self {
        self.add(name, Selector::class_name(class))
    }

    fn text(&mut self, name: &str, text: &str) -> &mut Self {
        self.insert_text(name, text);
        self
    }

    /// Look up a locator by logical name
    pub fn get(&self, name: &str) -> VigilResult<&Locator> {
        self.locators
            .get(name)
            .ok_or_else(|| VigilError::UnknownLocator {
                name: name.to_string(),
            })
    }

    /// Look up an expected text by logical name
    pub fn text_of(&self, name: &str) -> VigilResult<&str> {
        self.texts
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| VigilError::UnknownText {
                name: name.to_string(),
            })
    }

    /// Whether a locator with this name exists
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.locators.contains_key(name)
    }

    /// Locator names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.locators.keys().map(String::as_str)
    }

    /// Locators in name order
    pub fn locators(&self) -> impl Iterator<Item = &Locator> {
        self.locators.values()
    }

    /// Expected texts in name order
    pub fn texts(&self) -> impl Iterator<Item = (&str, &str)> {
        self.texts.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Locators whose name starts with `prefix`
    #[must_use]
    pub fn with_prefix(&self, prefix: &str) -> Vec<&Locator> {
        self.locators
            .range(prefix.to_string()..)
            .take_while(|(name, _)| name.starts_with(prefix))
            .map(|(_, locator)| locator)
            .collect()
    }

    /// Number of locators
    #[must_use]
    pub fn len(&self) -> usize {
        self.locators.len()
    }

    /// Whether the table has no locators
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locators.is_empty()
    }

    /// The full wallet popup table
    #[must_use]
    pub fn wallet() -> Self {
        let mut t = Self::new();
        t.css("elements.loader", format!("{APP} > div.full-flex-height > img"));
        add_menus(&mut t);
        add_setup_screens(&mut t);
        add_account_screens(&mut t);
        add_settings_screens(&mut t);
        add_main_screens(&mut t);
        add_token_screens(&mut t);
        t
    }
}

fn add_menus(t: &mut LocatorTable) {
    t.css("menus.sandwich.menu", ".sandwich-expando")
        .css(
            "menus.sandwich.settings",
            format!("{APP} > div:nth-child(3) > span > div > li:nth-child(2)"),
        )
        .css(
            "menus.sandwich.logOut",
            format!("{APP} > div:nth-child(3) > span > div > li:nth-child(3)"),
        )
        .text("menus.sandwich.textLogOut", "Log Out")
        .text("menus.sandwich.textSettings", "Settings");

    t.css("menus.account.menu", ACCOUNT_MENU)
        .css(
            "menus.account.delete",
            format!("{ACCOUNT_MENU} > div > span > div > li:nth-child(4) > div.remove"),
        )
        .css(
            "menus.account.createAccount",
            format!("{ACCOUNT_MENU} > div > span > div > li:nth-child(3) > span"),
        )
        .css(
            "menus.account.import",
            format!("{ACCOUNT_MENU} > div > span > div > li:nth-child(5) > span"),
        )
        .css(
            "menus.account.labelImported",
            format!("{ACCOUNT_MENU} > div > span > div > li:nth-child(4) > div.keyring-label"),
        );

    t.class("menus.dot.menu", "account-dropdown").css(
        "menus.dot.showQRcode",
        format!(
            "{FROM_RIGHT} > div > div:nth-child(1) > flex-column > div.name-label > div > span > div > div > div > li:nth-child(3)"
        ),
    );

    t.class("menus.networks.addedCustomRpc", "span custom-rpc").css(
        "menus.networks.customRpc",
        format!("{APP} > div:nth-child(2) > span > div > li:nth-child(9)"),
    );
}

fn add_setup_screens(t: &mut LocatorTable) {
    t.class("screens.TOU.agreement", "notice-box")
        .class("screens.TOU.title", "terms-header")
        .css("screens.TOU.button", "button")
        .add(
            "screens.TOU.linkTerms",
            Selector::link_text("Terms of Service"),
        )
        .text("screens.TOU.titleText", "Terms of Use")
        .text("screens.TOU.linkTermsText", "Terms of Service");

    t.id("screens.create.fieldPassword", "password-box")
        .id("screens.create.fieldPasswordConfirm", "password-box-confirm")
        .css("screens.create.button", "button");

    t.class("screens.seedPhrase.fieldPhrase", "twelve-word-phrase")
        .css(
            "screens.seedPhrase.buttonIveCopied",
            format!("{FROM_RIGHT} > button:nth-child(4)"),
        )
        .text(
            "screens.seedPhrase.textButtonIveCopied",
            "I've copied it somewhere safe",
        );

    t.css(
        "screens.restoreVault.textArea",
        format!("{FROM_LEFT} > div.initialize-screen.flex-column.flex-center.flex-grow > textarea"),
    )
    .id("screens.restoreVault.fieldPassword", "password-box")
    .id(
        "screens.restoreVault.fieldPasswordConfirm",
        "password-box-confirm",
    )
    .css(
        "screens.restoreVault.buttons.ok",
        format!(
            "{FROM_LEFT} > div.initialize-screen.flex-column.flex-center.flex-grow > div > button:nth-child(2)"
        ),
    );

    t.id("screens.lock.fieldPassword", "password-box")
        .class("screens.lock.error", "error")
        .class("screens.lock.buttonLogin", "cursor-pointer")
        .css(
            "screens.lock.linkRestore",
            format!("{FROM_LEFT} > div.flex-row.flex-center.flex-grow > p"),
        )
        .text("screens.lock.errorText", "Incorrect password. Try again.")
        .text("screens.lock.linkRestoreText", "Restore from seed phrase");
}

fn add_account_screens(t: &mut LocatorTable) {
    t.css(
        "screens.importAccounts.title",
        format!("{FROM_RIGHT} > div:nth-child(2) > div.flex-row.flex-center > h2"),
    )
    .id("screens.importAccounts.fieldPrivateKey", "private-key-box")
    .css(
        "screens.importAccounts.buttonImport",
        format!("{FROM_RIGHT} > div:nth-child(2) > div:nth-child(4) > button"),
    )
    .text("screens.importAccounts.textTitle", "Import Accounts");

    t.css(
        "screens.deleteImportedAccount.title",
        format!("{FROM_LEFT} > div.section-title.flex-row.flex-center > h2"),
    )
    .css(
        "screens.deleteImportedAccount.buttons.no",
        format!("{FROM_LEFT} > div.flex-row.flex-right > button.btn-violet"),
    )
    .css(
        "screens.deleteImportedAccount.buttons.yes",
        format!("{FROM_RIGHT} > div.flex-row.flex-right > button:nth-child(2)"),
    )
    .text(
        "screens.deleteImportedAccount.titleText",
        "Delete Imported Account",
    );

    t.class("screens.QRcode.address", "ellip-address")
        .class("screens.QRcode.buttonArrow", "fa-arrow-left");

    t.css(
        "screens.sendTransaction.title",
        format!("{FROM_RIGHT} > h3:nth-child(2)"),
    )
    .css(
        "screens.sendTransaction.fields.address",
        format!("{FROM_RIGHT} > section:nth-child(3) > div > input"),
    )
    .css(
        "screens.sendTransaction.fields.amount",
        format!("{FROM_RIGHT} > section:nth-child(4) > input"),
    )
    .css(
        "screens.sendTransaction.buttonNext",
        format!("{FROM_RIGHT} > section:nth-child(4) > button"),
    )
    .text("screens.sendTransaction.titleText", "Send Transaction");

    t.css(
        "screens.confirmTransaction.buttons.submit",
        "#pending-tx-form > div.flex-row.flex-space-around.conf-buttons > input",
    );
}

fn add_settings_screens(t: &mut LocatorTable) {
    t.css(
        "screens.settings.currentNetwork",
        format!("{SETTINGS_BODY} > div:nth-child(1) > span:nth-child(2)"),
    )
    .css(
        "screens.settings.customUrl",
        format!("{SETTINGS_BODY} > div:nth-child(1) > span:nth-child(2)"),
    )
    .id("screens.settings.fieldNewRPC", "new_rpc")
    .css(
        "screens.settings.buttonSave",
        format!("{SETTINGS_BODY} > div:nth-child(2) > button"),
    )
    .css(
        "screens.settings.title",
        format!("{FROM_RIGHT} > div.section-title.flex-row.flex-center > h2"),
    )
    .css(
        "screens.settings.buttons.changePassword",
        format!("{SETTINGS_BODY} > div:nth-child(10) > button:nth-child(5)"),
    )
    .css(
        "screens.settings.buttons.delete",
        format!("{SETTINGS_BODY} > div:nth-child(1) > button"),
    )
    .class("screens.settings.error", "error")
    .text("screens.settings.titleText", "Settings")
    .text(
        "screens.settings.errors.invalidHTTP",
        "URIs require the appropriate HTTP/HTTPS prefix.",
    )
    .text(
        "screens.settings.errors.invalidRpcEndpoint",
        "Invalid RPC endpoint",
    )
    .text("screens.settings.errors.invalidRpcUrl", "Invalid RPC URI");

    t.css(
        "screens.deleteCustomRPC.buttons.yes",
        format!("{FROM_RIGHT} > div.flex-row.flex-right > button:nth-child(2)"),
    )
    .class("screens.deleteCustomRPC.buttons.no", "btn-violet")
    .text("screens.deleteCustomRPC.titleText", "Delete Custom RPC");

    t.class("screens.changePassword.title", "page-subtitle")
        .id("screens.changePassword.fieldOldPassword", "old-password-box")
        .id("screens.changePassword.fieldNewPassword", "new-password-box")
        .id(
            "screens.changePassword.fieldConfirmNewPassword",
            "password-box-confirm",
        )
        .css(
            "screens.changePassword.buttonNo",
            format!("{FROM_RIGHT} > div.flex-row.flex-right > button.btn-violet"),
        )
        .css(
            "screens.changePassword.buttonYes",
            format!("{FROM_RIGHT} > div.flex-row.flex-right > button:nth-child(2)"),
        )
        .class("screens.changePassword.label", "confirm-label")
        .class(
            "screens.changePassword.arrowLeft",
            "fa fa-arrow-left fa-lg cursor-pointer",
        )
        .class("screens.changePassword.error", "error")
        .text("screens.changePassword.titleText", "Change Password")
        .text(
            "screens.changePassword.labelText",
            "Are you sure you want to change the password for unlocking of your wallet?",
        )
        .text(
            "screens.changePassword.errorText.differ",
            "New password should differ from the current one",
        )
        .text(
            "screens.changePassword.errorText.notLong",
            "Password not long enough",
        )
        .text(
            "screens.changePassword.errorText.dontMatch",
            "Passwords don't match",
        )
        .text(
            "screens.changePassword.errorText.incorrectPassword",
            "Incorrect password",
        );
}

fn add_main_screens(t: &mut LocatorTable) {
    t.css(
        "screens.main.transactionList",
        format!(
            "{FROM_LEFT} > section > section > div > div > div > div.ether-balance.ether-balance-amount > div > div > div > div:nth-child(1)"
        ),
    )
    .css(
        "screens.main.buttons.send",
        format!("{FROM_RIGHT} > div > div.flex-row > button:nth-child(4)"),
    )
    .css(
        "screens.main.buttons.buy",
        format!("{FROM_RIGHT} > div > div.flex-row > button:nth-child(3)"),
    )
    .class("screens.main.network", "network-name")
    .class("screens.main.sent.menu", "activeForm left")
    .class("screens.main.sent.tokens", "activeForm right")
    .css(
        "screens.main.balance",
        format!(
            "{FROM_RIGHT} > div > div.flex-row > div.ether-balance.ether-balance-amount > div > div > div:nth-child(1) > div:nth-child(1)"
        ),
    )
    .css(
        "screens.main.address",
        format!("{FROM_LEFT} > div > div:nth-child(1) > flex-column > div.flex-row > div"),
    )
    .text("screens.main.buttons.sendText", "Send");

    t.class("screens.main.tokens.remove", "trash")
        .class("screens.main.tokens.menu", "inactiveForm pointer")
        .css("screens.main.tokens.token", format!("{TOKEN_SECTION} > ol > li"))
        .css(
            "screens.main.tokens.balance",
            format!("{TOKEN_SECTION} > ol > li:nth-child(2) > h3"),
        )
        .css(
            "screens.main.tokens.amount",
            format!("{TOKEN_SECTION} > div > span"),
        )
        .css(
            "screens.main.tokens.buttonAdd",
            "div.full-flex-height:nth-child(2) > div:nth-child(1) > button:nth-child(2)",
        )
        .text("screens.main.tokens.textNoTokens", "No tokens found")
        .text("screens.main.tokens.textYouOwn1token", "You own 1 token")
        .text("screens.main.tokens.buttonAddText", "Add Token");
}

fn add_token_screens(t: &mut LocatorTable) {
    t.class("screens.addToken.title", "page-subtitle")
        .id("screens.addToken.fields.contractAddress", "token-address")
        .id("screens.addToken.fields.tokenSymbol", "token_symbol")
        .id("screens.addToken.fields.decimals", "token_decimals")
        .css(
            "screens.addToken.buttonAdd",
            ".flex-space-around > button:nth-child(7)",
        )
        .text("screens.addToken.titleText", "Add Token");

    t.class("screens.removeToken.title", "page-subtitle")
        .class("screens.removeToken.label", "confirm-label")
        .class(
            "screens.removeToken.buttons.back",
            "fa fa-arrow-left fa-lg cursor-pointer",
        )
        .class("screens.removeToken.buttons.no", "btn-violet")
        .css(
            "screens.removeToken.buttons.yes",
            format!("{SETTINGS_BODY} > button:nth-child(2)"),
        )
        .text("screens.removeToken.titleText", "Remove Token")
        .text(
            "screens.removeToken.labelText",
            "Are you sure you want to remove token",
        );
}
