//! Result and error types for Vigil.

use thiserror::Error;

/// Result type for Vigil operations
pub type VigilResult<T> = Result<T, VigilError>;

/// Errors that can occur in Vigil
#[derive(Debug, Error)]
pub enum VigilError {
    /// Locator matched nothing in the current document
    #[error("No element matches {locator}")]
    NoSuchElement {
        /// Locator display form
        locator: String,
    },

    /// Handle refers to a node that is no longer attached
    #[error("Element handle {handle} is stale")]
    StaleElement {
        /// Handle id
        handle: String,
    },

    /// Selector could not be evaluated by the page
    #[error("Invalid selector {selector}: {message}")]
    InvalidSelector {
        /// Selector display form
        selector: String,
        /// Error message
        message: String,
    },

    /// Browser executable not found
    #[error("Browser not found. Install Chromium or set CHROMIUM_PATH")]
    BrowserNotFound,

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunchError {
        /// Error message
        message: String,
    },

    /// Connection to browser failed or was lost
    #[error("Failed to connect to browser: {message}")]
    ConnectionFailed {
        /// Error message
        message: String,
    },

    /// Driver session is closed
    #[error("Driver session closed")]
    SessionClosed,

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    NavigationError {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Page script evaluation error
    #[error("Script evaluation failed: {message}")]
    ScriptError {
        /// Error message
        message: String,
    },

    /// Input simulation error
    #[error("Input simulation failed: {message}")]
    InputError {
        /// Error message
        message: String,
    },

    /// Screenshot error
    #[error("Screenshot failed: {message}")]
    ScreenshotError {
        /// Error message
        message: String,
    },

    /// Element did not show up within the poll budget
    #[error("{locator} did not show up after {attempts} attempts ({elapsed_ms}ms)")]
    ElementNotShown {
        /// Locator name
        locator: String,
        /// Attempts performed
        attempts: u32,
        /// Elapsed milliseconds
        elapsed_ms: u64,
    },

    /// Element was still displayed when the poll budget ran out
    #[error("{locator} still displayed after {attempts} attempts")]
    ElementStillShown {
        /// Locator name
        locator: String,
        /// Attempts performed
        attempts: u32,
    },

    /// Logical locator name is not in the table
    #[error("Unknown locator: {name}")]
    UnknownLocator {
        /// Logical name
        name: String,
    },

    /// Logical text name is not in the table
    #[error("Unknown text constant: {name}")]
    UnknownText {
        /// Logical name
        name: String,
    },

    /// Assertion failed
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl VigilError {
    /// Build an assertion failure
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            message: message.into(),
        }
    }

    /// The locator did not resolve to a live node.
    ///
    /// These are the failures a poll attempt treats as "not there yet".
    #[must_use]
    pub const fn is_resolution_failure(&self) -> bool {
        matches!(
            self,
            Self::NoSuchElement { .. } | Self::StaleElement { .. } | Self::InvalidSelector { .. }
        )
    }

    /// The driver session cannot recover; retrying is pointless.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. } | Self::SessionClosed | Self::BrowserNotFound
        )
    }
}
