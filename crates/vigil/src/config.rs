//! Suite configuration.
//!
//! Loaded from YAML, then overlaid with environment variables
//! (`SELENIUM_BROWSER`, `VIGIL_EXTENSION_PATH`, `VIGIL_ARTIFACT_DIR`,
//! `CHROMIUM_PATH`, `VIGIL_NO_SANDBOX`, `VIGIL_TOKEN_ADDRESS`).

use crate::result::{VigilError, VigilResult};
use crate::wait::{
    PollBudget, DEFAULT_APPEAR_ATTEMPTS, DEFAULT_DISAPPEAR_ATTEMPTS, DEFAULT_POLL_INTERVAL_MS,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Browser the extension is built for and driven in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    /// Chrome / Chromium
    #[default]
    Chrome,
    /// Firefox
    Firefox,
}

impl BrowserKind {
    /// Lowercase name, used for artifact directories and dist paths
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Chrome => "chrome",
            Self::Firefox => "firefox",
        }
    }

    /// Extension URL scheme (`chrome-extension`, `moz-extension`)
    #[must_use]
    pub const fn extension_scheme(&self) -> &'static str {
        match self {
            Self::Chrome => "chrome-extension",
            Self::Firefox => "moz-extension",
        }
    }

    /// Popup URL for an installed extension id
    #[must_use]
    pub fn popup_url(&self, extension_id: &str) -> String {
        format!("{}://{extension_id}/popup.html", self.extension_scheme())
    }

    /// Whether the browser exposes console logs to the driver
    #[must_use]
    pub const fn reports_console_logs(&self) -> bool {
        matches!(self, Self::Chrome)
    }
}

impl fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BrowserKind {
    type Err = VigilError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chrome" | "chromium" => Ok(Self::Chrome),
            "firefox" => Ok(Self::Firefox),
            other => Err(VigilError::Config {
                message: format!("unsupported browser: {other}"),
            }),
        }
    }
}

/// Poll budgets applied by scenario helpers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollDefaults {
    /// Attempts when waiting for an element to show up
    pub appear_attempts: u32,
    /// Attempts when waiting for an element to go away
    pub disappear_attempts: u32,
    /// Delay before each check, in milliseconds
    pub interval_ms: u64,
    /// Explicit wall-clock bound per poll; nominal bound when unset
    pub deadline_ms: Option<u64>,
}

impl Default for PollDefaults {
    fn default() -> Self {
        Self {
            appear_attempts: DEFAULT_APPEAR_ATTEMPTS,
            disappear_attempts: DEFAULT_DISAPPEAR_ATTEMPTS,
            interval_ms: DEFAULT_POLL_INTERVAL_MS,
            deadline_ms: None,
        }
    }
}

impl PollDefaults {
    fn budget(&self, attempts: u32) -> PollBudget {
        let budget = PollBudget::new(attempts, Duration::from_millis(self.interval_ms));
        match self.deadline_ms {
            Some(ms) => budget.with_deadline(Duration::from_millis(ms)),
            None => budget,
        }
    }

    /// Budget for waiting on appearance
    #[must_use]
    pub fn appearance(&self) -> PollBudget {
        self.budget(self.appear_attempts)
    }

    /// Budget for waiting on appearance with a custom attempt count
    #[must_use]
    pub fn appearance_within(&self, attempts: u32) -> PollBudget {
        self.budget(attempts)
    }

    /// Budget for waiting on disappearance
    #[must_use]
    pub fn disappearance(&self) -> PollBudget {
        self.budget(self.disappear_attempts)
    }
}

/// Configuration for a suite run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Browser to drive
    pub browser: BrowserKind,
    /// Built extension directory; `dist/<browser>` when unset
    pub extension_path: Option<PathBuf>,
    /// Root directory for failure artifacts
    pub artifact_dir: PathBuf,
    /// Run the browser headless
    pub headless: bool,
    /// Chromium executable override
    pub chromium_path: Option<PathBuf>,
    /// Launch Chromium with `--no-sandbox` (containers, CI)
    pub no_sandbox: bool,
    /// Token contract the smoke suite adds on localhost
    pub token_address: Option<String>,
    /// Stop at the first failing step
    pub fail_fast: bool,
    /// Poll budgets
    pub poll: PollDefaults,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            browser: BrowserKind::Chrome,
            extension_path: None,
            artifact_dir: PathBuf::from("./test-artifacts"),
            headless: false,
            chromium_path: None,
            no_sandbox: false,
            token_address: None,
            fail_fast: false,
            poll: PollDefaults::default(),
        }
    }
}

impl SuiteConfig {
    /// Create a config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse YAML
    pub fn from_yaml_str(yaml: &str) -> VigilResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML file
    pub fn from_yaml_file(path: &Path) -> VigilResult<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> VigilResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Overlay process environment variables
    pub fn with_env(self) -> VigilResult<Self> {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Overlay variables from an arbitrary lookup
    pub fn with_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> VigilResult<Self> {
        if let Some(browser) = lookup("SELENIUM_BROWSER") {
            self.browser = browser.parse()?;
        }
        if let Some(path) = lookup("VIGIL_EXTENSION_PATH") {
            self.extension_path = Some(PathBuf::from(path));
        }
        if let Some(dir) = lookup("VIGIL_ARTIFACT_DIR") {
            self.artifact_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup("CHROMIUM_PATH") {
            self.chromium_path = Some(PathBuf::from(path));
        }
        if let Some(flag) = lookup("VIGIL_NO_SANDBOX") {
            self.no_sandbox = parse_flag(&flag)?;
        }
        if let Some(address) = lookup("VIGIL_TOKEN_ADDRESS") {
            self.token_address = Some(address.trim().to_string());
        }
        self.validate()?;
        Ok(self)
    }

    /// Effective extension directory
    #[must_use]
    pub fn extension_dir(&self) -> PathBuf {
        self.extension_path
            .clone()
            .unwrap_or_else(|| Path::new("dist").join(self.browser.as_str()))
    }

    fn validate(&self) -> VigilResult<()> {
        if self.poll.interval_ms == 0 {
            return Err(VigilError::Config {
                message: "poll.interval_ms must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> VigilResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        other => Err(VigilError::Config {
            message: format!("expected a boolean flag, got {other:?}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = SuiteConfig::new();
        assert_eq!(config.browser, BrowserKind::Chrome);
        assert_eq!(config.extension_dir(), PathBuf::from("dist/chrome"));
        assert_eq!(config.poll.appearance(), PollBudget::appearance());
        assert_eq!(config.poll.disappearance(), PollBudget::disappearance());
    }

    #[test]
    fn test_yaml_partial_fills_defaults() {
        let config = SuiteConfig::from_yaml_str(
            "browser: firefox\npoll:\n  appear_attempts: 50\n  deadline_ms: 3000\n",
        )
        .unwrap();
        assert_eq!(config.browser, BrowserKind::Firefox);
        assert_eq!(config.extension_dir(), PathBuf::from("dist/firefox"));
        assert_eq!(config.poll.appear_attempts, 50);
        assert_eq!(config.poll.disappear_attempts, 10);
        assert_eq!(
            config.poll.appearance().deadline(),
            Some(Duration::from_secs(3))
        );
    }

    #[test]
    fn test_yaml_rejects_zero_interval() {
        let err = SuiteConfig::from_yaml_str("poll:\n  interval_ms: 0\n").unwrap_err();
        assert!(matches!(err, VigilError::Config { .. }));
    }

    #[test]
    fn test_yaml_round_trip_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vigil.yaml");
        let config = SuiteConfig {
            fail_fast: true,
            ..SuiteConfig::default()
        };
        std::fs::write(&path, config.to_yaml().unwrap()).unwrap();
        assert_eq!(SuiteConfig::from_yaml_file(&path).unwrap(), config);
    }

    #[test]
    fn test_env_overlay() {
        let env: HashMap<&str, &str> = [
            ("SELENIUM_BROWSER", "firefox"),
            ("VIGIL_ARTIFACT_DIR", "/tmp/artifacts"),
        ]
        .into_iter()
        .collect();
        let config = SuiteConfig::new()
            .with_env_from(|k| env.get(k).map(|v| (*v).to_string()))
            .unwrap();
        assert_eq!(config.browser, BrowserKind::Firefox);
        assert_eq!(config.artifact_dir, PathBuf::from("/tmp/artifacts"));
    }

    #[test]
    fn test_env_no_sandbox_flag() {
        let on = SuiteConfig::new()
            .with_env_from(|k| (k == "VIGIL_NO_SANDBOX").then(|| "1".to_string()))
            .unwrap();
        assert!(on.no_sandbox);

        let off = SuiteConfig::new()
            .with_env_from(|k| (k == "VIGIL_NO_SANDBOX").then(|| "false".to_string()))
            .unwrap();
        assert!(!off.no_sandbox);

        let bad = SuiteConfig::new()
            .with_env_from(|k| (k == "VIGIL_NO_SANDBOX").then(|| "maybe".to_string()));
        assert!(bad.is_err());
    }

    #[test]
    fn test_env_token_address() {
        let config = SuiteConfig::new()
            .with_env_from(|k| (k == "VIGIL_TOKEN_ADDRESS").then(|| " 0x7f3a \n".to_string()))
            .unwrap();
        assert_eq!(config.token_address.as_deref(), Some("0x7f3a"));
    }

    #[test]
    fn test_env_rejects_unknown_browser() {
        let result = SuiteConfig::new().with_env_from(|k| {
            (k == "SELENIUM_BROWSER").then(|| "safari".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_browser_kind_urls() {
        assert_eq!(
            BrowserKind::Chrome.popup_url("abc"),
            "chrome-extension://abc/popup.html"
        );
        assert_eq!(
            BrowserKind::Firefox.popup_url("abc"),
            "moz-extension://abc/popup.html"
        );
        assert!(BrowserKind::Chrome.reports_console_logs());
        assert!(!BrowserKind::Firefox.reports_console_logs());
    }
}
