//! ElementDriver - Abstract Browser Automation Trait
//!
//! The poller consumes exactly two capabilities from the automation driver:
//! `locate` and `is_visible`. Test steps use the richer interactions (click,
//! type, read text, run page script). Implementations:
//!
//! - `ChromiumDriver` (feature `browser`) - CDP via chromiumoxide
//! - [`MockDriver`] - scripted element timelines for unit tests

use crate::locator::Locator;
use crate::result::{VigilError, VigilResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Mutex;

/// Key marking an element reference inside script arguments
pub const ELEMENT_REF_KEY: &str = "element-6066-11e4-a52f-4f903e9b4ac7";

/// Opaque reference to a located element, owned by the driver
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle {
    id: String,
}

impl ElementHandle {
    /// Create a handle from a driver-specific id
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// Driver-specific id
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Script argument the driver resolves back to this element
    #[must_use]
    pub fn to_script_arg(&self) -> serde_json::Value {
        serde_json::json!({ ELEMENT_REF_KEY: self.id })
    }

    /// Handle referenced by a script argument, if it is one
    #[must_use]
    pub fn from_script_arg(value: &serde_json::Value) -> Option<Self> {
        value
            .get(ELEMENT_REF_KEY)
            .and_then(serde_json::Value::as_str)
            .map(Self::new)
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Browser console log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Errors and uncaught exceptions
    Severe,
    /// Warnings
    Warning,
    /// Informational messages
    Info,
    /// Debug output
    Debug,
}

impl LogLevel {
    /// Level name as reported by the browser log endpoint
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Severe => "SEVERE",
            Self::Warning => "WARNING",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One browser console entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Severity
    pub level: LogLevel,
    /// Message text
    pub message: String,
}

impl LogEntry {
    /// Create a log entry
    #[must_use]
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Abstract driver trait for browser automation
///
/// Every method is a blocking round-trip to the automated browser from the
/// caller's point of view. One in-flight call at a time per session.
#[async_trait]
pub trait ElementDriver: Send + Sync {
    /// Find the first element matching `locator`; `NoSuchElement` when none
    async fn locate(&self, locator: &Locator) -> VigilResult<ElementHandle>;

    /// Find every element matching `locator` (possibly none)
    async fn locate_all(&self, locator: &Locator) -> VigilResult<Vec<ElementHandle>>;

    /// Whether the element is rendered and visible
    async fn is_visible(&self, element: &ElementHandle) -> VigilResult<bool>;

    /// Visible text of the element
    async fn text(&self, element: &ElementHandle) -> VigilResult<String>;

    /// Whether the element is enabled for input
    async fn is_enabled(&self, element: &ElementHandle) -> VigilResult<bool>;

    /// Attribute value, `None` when absent
    async fn attribute(&self, element: &ElementHandle, name: &str) -> VigilResult<Option<String>>;

    /// Click the element
    async fn click(&self, element: &ElementHandle) -> VigilResult<()>;

    /// Type text into the element
    async fn send_keys(&self, element: &ElementHandle, text: &str) -> VigilResult<()>;

    /// Clear an input element
    async fn clear(&self, element: &ElementHandle) -> VigilResult<()>;

    /// Run a script in the page; `args` are exposed as `arguments[i]`
    async fn execute_script(
        &self,
        script: &str,
        args: &[serde_json::Value],
    ) -> VigilResult<serde_json::Value>;

    /// Navigate to URL
    async fn navigate(&self, url: &str) -> VigilResult<()>;

    /// Get current URL
    async fn current_url(&self) -> VigilResult<String>;

    /// Capture the viewport as PNG bytes
    async fn screenshot_png(&self) -> VigilResult<Vec<u8>>;

    /// Serialized DOM of the current page
    async fn page_source(&self) -> VigilResult<String>;

    /// Drain browser console entries; `None` when the browser cannot report them
    async fn console_logs(&self) -> VigilResult<Option<Vec<LogEntry>>>;
}

/// What a mocked element looks like at one `locate` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockPresence {
    /// Attached and visible
    Visible,
    /// Attached but not displayed
    Hidden,
    /// Not in the document
    Absent,
    /// Resolves, but the handle is stale by the time it is queried
    Stale,
    /// The page rejects the selector
    InvalidSelector,
    /// The driver connection drops
    Disconnected,
}

#[derive(Debug)]
struct MockElement {
    handle: ElementHandle,
    timeline: VecDeque<MockPresence>,
    current: MockPresence,
    text: String,
    enabled: bool,
    attributes: HashMap<String, String>,
    count: Option<usize>,
    locates: u32,
}

/// Change applied to another element when a mocked element is clicked
#[derive(Debug, Clone)]
enum MockReaction {
    Text { target: String, text: String },
    Count { target: String, count: usize },
}

#[derive(Debug, Default)]
struct MockState {
    elements: HashMap<String, MockElement>,
    by_handle: HashMap<String, String>,
    unknown_locates: HashMap<String, u32>,
    script_results: VecDeque<serde_json::Value>,
    current_url: String,
    screenshot: Option<Vec<u8>>,
    page_source: String,
    console_logs: Option<Vec<LogEntry>>,
    call_history: Vec<String>,
    reactions: HashMap<String, Vec<MockReaction>>,
    next_handle: u64,
}

impl MockState {
    fn react_to_click(&mut self, clicked: &str) {
        let Some(reactions) = self.reactions.get(clicked).cloned() else {
            return;
        };
        for reaction in reactions {
            match reaction {
                MockReaction::Text { target, text } => {
                    if let Some(element) = self.elements.get_mut(&target) {
                        element.text = text;
                    }
                }
                MockReaction::Count { target, count } => {
                    if let Some(element) = self.elements.get_mut(&target) {
                        element.count = Some(count);
                    }
                }
            }
        }
    }
}

/// Mock driver for unit testing
///
/// Elements are keyed by locator name. Each `locate` call consumes the next
/// entry of the element's timeline; the last entry repeats forever.
/// Locators that were never registered never resolve.
#[derive(Debug, Default)]
pub struct MockDriver {
    state: Mutex<MockState>,
}

impl MockDriver {
    /// Create new mock driver
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MockState) -> T) -> T {
        let mut guard = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    /// Register an element with a presence timeline
    pub fn script(&self, name: &str, timeline: impl IntoIterator<Item = MockPresence>) {
        self.with_state(|state| {
            let mut timeline: VecDeque<MockPresence> = timeline.into_iter().collect();
            let current = timeline.pop_back().unwrap_or(MockPresence::Absent);
            timeline.push_back(current);
            state.next_handle += 1;
            let handle = ElementHandle::new(format!("mock-{}", state.next_handle));
            state
                .by_handle
                .insert(handle.id().to_string(), name.to_string());
            let previous = state.elements.insert(
                name.to_string(),
                MockElement {
                    handle,
                    timeline,
                    current: MockPresence::Absent,
                    text: String::new(),
                    enabled: true,
                    attributes: HashMap::new(),
                    count: None,
                    locates: 0,
                },
            );
            if let Some(previous) = previous {
                state.by_handle.remove(previous.handle.id());
            }
        });
    }

    /// Register an element that is always visible
    pub fn add_visible(&self, name: &str) {
        self.script(name, [MockPresence::Visible]);
    }

    /// Register an always-visible element with text
    pub fn add_text(&self, name: &str, text: &str) {
        self.add_visible(name);
        self.set_text(name, text);
    }

    /// Register an element that is absent for `k - 1` lookups, then visible
    pub fn appear_on(&self, name: &str, k: usize) {
        let mut timeline = vec![MockPresence::Absent; k.saturating_sub(1)];
        timeline.push(MockPresence::Visible);
        self.script(name, timeline);
    }

    /// Register an element that is visible for `k - 1` lookups, then absent
    pub fn disappear_on(&self, name: &str, k: usize) {
        let mut timeline = vec![MockPresence::Visible; k.saturating_sub(1)];
        timeline.push(MockPresence::Absent);
        self.script(name, timeline);
    }

    /// Set element text
    pub fn set_text(&self, name: &str, text: &str) {
        self.with_state(|state| {
            if let Some(element) = state.elements.get_mut(name) {
                element.text = text.to_string();
            }
        });
    }

    /// Set element enabled state
    pub fn set_enabled(&self, name: &str, enabled: bool) {
        self.with_state(|state| {
            if let Some(element) = state.elements.get_mut(name) {
                element.enabled = enabled;
            }
        });
    }

    /// Set element attribute
    pub fn set_attribute(&self, name: &str, attribute: &str, value: &str) {
        self.with_state(|state| {
            if let Some(element) = state.elements.get_mut(name) {
                element
                    .attributes
                    .insert(attribute.to_string(), value.to_string());
            }
        });
    }

    /// Fix the number of matches `locate_all` reports
    pub fn set_count(&self, name: &str, count: usize) {
        self.with_state(|state| {
            if let Some(element) = state.elements.get_mut(name) {
                element.count = Some(count);
            }
        });
    }

    /// Set `target`'s text each time `clicked` is clicked
    pub fn on_click_text(&self, clicked: &str, target: &str, text: &str) {
        self.with_state(|state| {
            state
                .reactions
                .entry(clicked.to_string())
                .or_default()
                .push(MockReaction::Text {
                    target: target.to_string(),
                    text: text.to_string(),
                });
        });
    }

    /// Set `target`'s match count each time `clicked` is clicked
    pub fn on_click_count(&self, clicked: &str, target: &str, count: usize) {
        self.with_state(|state| {
            state
                .reactions
                .entry(clicked.to_string())
                .or_default()
                .push(MockReaction::Count {
                    target: target.to_string(),
                    count,
                });
        });
    }

    /// Queue a result for the next `execute_script`
    pub fn push_script_result(&self, value: serde_json::Value) {
        self.with_state(|state| state.script_results.push_back(value));
    }

    /// Set screenshot bytes
    pub fn set_screenshot(&self, png: Vec<u8>) {
        self.with_state(|state| state.screenshot = Some(png));
    }

    /// Set page source
    pub fn set_page_source(&self, html: &str) {
        self.with_state(|state| state.page_source = html.to_string());
    }

    /// Set console entries; `None` emulates a browser without log support
    pub fn set_console_logs(&self, logs: Option<Vec<LogEntry>>) {
        self.with_state(|state| state.console_logs = logs);
    }

    /// Number of `locate` calls made for a locator name
    #[must_use]
    pub fn locate_count(&self, name: &str) -> u32 {
        self.with_state(|state| {
            state
                .elements
                .get(name)
                .map(|e| e.locates)
                .or_else(|| state.unknown_locates.get(name).copied())
                .unwrap_or(0)
        })
    }

    /// Current text of an element (reflects typed keys)
    #[must_use]
    pub fn text_value(&self, name: &str) -> Option<String> {
        self.with_state(|state| state.elements.get(name).map(|e| e.text.clone()))
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.with_state(|state| state.call_history.clone())
    }

    /// Check if method was called
    #[must_use]
    pub fn was_called(&self, call: &str) -> bool {
        self.with_state(|state| state.call_history.iter().any(|c| c.starts_with(call)))
    }

    fn element_name(&self, element: &ElementHandle) -> VigilResult<String> {
        self.with_state(|state| state.by_handle.get(element.id()).cloned())
            .ok_or_else(|| VigilError::StaleElement {
                handle: element.id().to_string(),
            })
    }

    fn attached<T>(
        &self,
        element: &ElementHandle,
        f: impl FnOnce(&mut MockElement) -> T,
    ) -> VigilResult<T> {
        let name = self.element_name(element)?;
        self.with_state(|state| match state.elements.get_mut(&name) {
            Some(e) if matches!(e.current, MockPresence::Visible | MockPresence::Hidden) => {
                Ok(f(e))
            }
            _ => Err(VigilError::StaleElement {
                handle: element.id().to_string(),
            }),
        })
    }

    fn record(&self, call: String) {
        self.with_state(|state| state.call_history.push(call));
    }
}

#[async_trait]
impl ElementDriver for MockDriver {
    async fn locate(&self, locator: &Locator) -> VigilResult<ElementHandle> {
        self.with_state(|state| {
            let Some(element) = state.elements.get_mut(locator.name()) else {
                *state
                    .unknown_locates
                    .entry(locator.name().to_string())
                    .or_insert(0) += 1;
                return Err(VigilError::NoSuchElement {
                    locator: locator.to_string(),
                });
            };
            element.locates += 1;
            let presence = if element.timeline.len() > 1 {
                element.timeline.pop_front().unwrap_or(MockPresence::Absent)
            } else {
                element.timeline.front().copied().unwrap_or(MockPresence::Absent)
            };
            element.current = presence;
            match presence {
                MockPresence::Visible | MockPresence::Hidden | MockPresence::Stale => {
                    Ok(element.handle.clone())
                }
                MockPresence::Absent => Err(VigilError::NoSuchElement {
                    locator: locator.to_string(),
                }),
                MockPresence::InvalidSelector => Err(VigilError::InvalidSelector {
                    selector: locator.selector().to_string(),
                    message: "mock rejected selector".to_string(),
                }),
                MockPresence::Disconnected => Err(VigilError::ConnectionFailed {
                    message: "mock connection dropped".to_string(),
                }),
            }
        })
    }

    async fn locate_all(&self, locator: &Locator) -> VigilResult<Vec<ElementHandle>> {
        self.with_state(|state| {
            let count = match state.elements.get(locator.name()) {
                Some(e) => e.count.unwrap_or(1),
                None => 0,
            };
            let handle = state.elements.get(locator.name()).map(|e| e.handle.clone());
            Ok(handle.map(|h| vec![h; count]).unwrap_or_default())
        })
    }

    async fn is_visible(&self, element: &ElementHandle) -> VigilResult<bool> {
        self.attached(element, |e| e.current == MockPresence::Visible)
    }

    async fn text(&self, element: &ElementHandle) -> VigilResult<String> {
        self.attached(element, |e| e.text.clone())
    }

    async fn is_enabled(&self, element: &ElementHandle) -> VigilResult<bool> {
        self.attached(element, |e| e.enabled)
    }

    async fn attribute(&self, element: &ElementHandle, name: &str) -> VigilResult<Option<String>> {
        self.attached(element, |e| e.attributes.get(name).cloned())
    }

    async fn click(&self, element: &ElementHandle) -> VigilResult<()> {
        let name = self.element_name(element)?;
        self.attached(element, |_| ())?;
        self.with_state(|state| {
            state.call_history.push(format!("click:{name}"));
            state.react_to_click(&name);
        });
        Ok(())
    }

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> VigilResult<()> {
        let name = self.element_name(element)?;
        self.attached(element, |e| e.text.push_str(text))?;
        self.record(format!("send_keys:{name}:{text}"));
        Ok(())
    }

    async fn clear(&self, element: &ElementHandle) -> VigilResult<()> {
        let name = self.element_name(element)?;
        self.attached(element, |e| e.text.clear())?;
        self.record(format!("clear:{name}"));
        Ok(())
    }

    async fn execute_script(
        &self,
        script: &str,
        args: &[serde_json::Value],
    ) -> VigilResult<serde_json::Value> {
        let args = serde_json::to_string(args)?;
        self.with_state(|state| {
            state.call_history.push(format!("script:{script}:{args}"));
            Ok(state
                .script_results
                .pop_front()
                .unwrap_or(serde_json::Value::Null))
        })
    }

    async fn navigate(&self, url: &str) -> VigilResult<()> {
        self.with_state(|state| {
            state.call_history.push(format!("navigate:{url}"));
            state.current_url = url.to_string();
        });
        Ok(())
    }

    async fn current_url(&self) -> VigilResult<String> {
        Ok(self.with_state(|state| state.current_url.clone()))
    }

    async fn screenshot_png(&self) -> VigilResult<Vec<u8>> {
        self.with_state(|state| state.screenshot.clone())
            .ok_or_else(|| VigilError::ScreenshotError {
                message: "No mock screenshot set".to_string(),
            })
    }

    async fn page_source(&self) -> VigilResult<String> {
        Ok(self.with_state(|state| state.page_source.clone()))
    }

    async fn console_logs(&self) -> VigilResult<Option<Vec<LogEntry>>> {
        Ok(self.with_state(|state| state.console_logs.take()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locator(name: &str) -> Locator {
        Locator::css(name, format!(".{name}"))
    }

    mod element_handle_tests {
        use super::*;

        #[test]
        fn test_element_handle_creation() {
            let handle = ElementHandle::new("vigil-1");
            assert_eq!(handle.id(), "vigil-1");
            assert_eq!(handle.to_string(), "vigil-1");
        }
    }

    mod log_tests {
        use super::*;

        #[test]
        fn test_log_level_names() {
            assert_eq!(LogLevel::Severe.as_str(), "SEVERE");
            assert_eq!(LogLevel::Warning.to_string(), "WARNING");
        }

        #[test]
        fn test_log_entry_serde() {
            let entry: LogEntry =
                serde_json::from_str(r#"{"level":"SEVERE","message":"boom"}"#).unwrap();
            assert_eq!(entry, LogEntry::new(LogLevel::Severe, "boom"));
        }
    }

    mod mock_driver_tests {
        use super::*;

        #[tokio::test]
        async fn test_unknown_locator_never_resolves() {
            let driver = MockDriver::new();
            let err = driver.locate(&locator("ghost")).await.unwrap_err();
            assert!(matches!(err, VigilError::NoSuchElement { .. }));
            assert_eq!(driver.locate_count("ghost"), 1);
        }

        #[tokio::test]
        async fn test_timeline_advances_per_locate_and_last_repeats() {
            let driver = MockDriver::new();
            driver.script(
                "title",
                [MockPresence::Absent, MockPresence::Hidden, MockPresence::Visible],
            );
            let title = locator("title");

            assert!(driver.locate(&title).await.is_err());

            let handle = driver.locate(&title).await.unwrap();
            assert!(!driver.is_visible(&handle).await.unwrap());

            for _ in 0..3 {
                let handle = driver.locate(&title).await.unwrap();
                assert!(driver.is_visible(&handle).await.unwrap());
            }
            assert_eq!(driver.locate_count("title"), 5);
        }

        #[tokio::test]
        async fn test_stale_handle() {
            let driver = MockDriver::new();
            driver.script("row", [MockPresence::Stale]);
            let handle = driver.locate(&locator("row")).await.unwrap();
            let err = driver.is_visible(&handle).await.unwrap_err();
            assert!(matches!(err, VigilError::StaleElement { .. }));
        }

        #[tokio::test]
        async fn test_disconnected_is_fatal() {
            let driver = MockDriver::new();
            driver.script("row", [MockPresence::Disconnected]);
            let err = driver.locate(&locator("row")).await.unwrap_err();
            assert!(err.is_fatal());
        }

        #[tokio::test]
        async fn test_send_keys_appends_text() {
            let driver = MockDriver::new();
            driver.add_visible("field");
            let handle = driver.locate(&locator("field")).await.unwrap();
            driver.send_keys(&handle, "0xabc").await.unwrap();
            driver.send_keys(&handle, "def").await.unwrap();
            assert_eq!(driver.text_value("field").as_deref(), Some("0xabcdef"));
            assert!(driver.was_called("send_keys:field:0xabc"));

            driver.clear(&handle).await.unwrap();
            assert_eq!(driver.text_value("field").as_deref(), Some(""));
        }

        #[tokio::test]
        async fn test_rescripted_element_keeps_distinct_handles() {
            let driver = MockDriver::new();
            driver.add_visible("a");
            driver.add_visible("b");
            driver.script("a", [MockPresence::Visible]);
            driver.add_visible("c");

            let a = driver.locate(&locator("a")).await.unwrap();
            let c = driver.locate(&locator("c")).await.unwrap();
            assert_ne!(a, c);

            driver.click(&a).await.unwrap();
            assert_eq!(driver.history(), vec!["click:a".to_string()]);
        }

        #[tokio::test]
        async fn test_locate_all_counts() {
            let driver = MockDriver::new();
            driver.add_visible("token");
            driver.set_count("token", 3);
            assert_eq!(driver.locate_all(&locator("token")).await.unwrap().len(), 3);
            assert!(driver.locate_all(&locator("none")).await.unwrap().is_empty());
        }

        #[tokio::test]
        async fn test_click_reactions() {
            let driver = MockDriver::new();
            driver.add_visible("delete");
            driver.add_text("title", "Settings");
            driver.add_visible("row");
            driver.on_click_text("delete", "title", "Delete Custom RPC");
            driver.on_click_count("delete", "row", 0);

            let delete = driver.locate(&locator("delete")).await.unwrap();
            let title = driver.locate(&locator("title")).await.unwrap();
            assert_eq!(driver.text(&title).await.unwrap(), "Settings");
            assert_eq!(driver.locate_all(&locator("row")).await.unwrap().len(), 1);

            driver.click(&delete).await.unwrap();
            assert_eq!(driver.text(&title).await.unwrap(), "Delete Custom RPC");
            assert!(driver.locate_all(&locator("row")).await.unwrap().is_empty());
        }

        #[tokio::test]
        async fn test_script_results_queue() {
            let driver = MockDriver::new();
            driver.push_script_result(serde_json::json!(7));
            let first = driver
                .execute_script("return 7", &[serde_json::json!("a")])
                .await
                .unwrap();
            assert_eq!(first, serde_json::json!(7));
            let second = driver.execute_script("return 1", &[]).await.unwrap();
            assert!(second.is_null());
            assert!(driver.was_called("script:return 7:[\"a\"]"));
        }

        #[test]
        fn test_element_script_arg() {
            let handle = ElementHandle::new("h-3");
            let arg = handle.to_script_arg();
            assert_eq!(ElementHandle::from_script_arg(&arg), Some(handle));
            assert_eq!(ElementHandle::from_script_arg(&serde_json::json!("h-3")), None);
        }

        #[tokio::test]
        async fn test_navigate_and_url() {
            let driver = MockDriver::new();
            driver.navigate("chrome-extension://abc/popup.html").await.unwrap();
            assert_eq!(
                driver.current_url().await.unwrap(),
                "chrome-extension://abc/popup.html"
            );
            assert!(driver.was_called("navigate"));
        }

        #[tokio::test]
        async fn test_console_logs_drain() {
            let driver = MockDriver::new();
            assert!(driver.console_logs().await.unwrap().is_none());
            driver.set_console_logs(Some(vec![LogEntry::new(LogLevel::Severe, "x")]));
            assert_eq!(driver.console_logs().await.unwrap().unwrap().len(), 1);
            assert!(driver.console_logs().await.unwrap().is_none());
        }

        #[tokio::test]
        async fn test_screenshot_missing_is_error() {
            let driver = MockDriver::new();
            assert!(driver.screenshot_png().await.is_err());
            driver.set_screenshot(vec![0x89, 0x50]);
            assert_eq!(driver.screenshot_png().await.unwrap(), vec![0x89, 0x50]);
        }
    }
}
