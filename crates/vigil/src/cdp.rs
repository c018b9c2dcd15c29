//! Chromium driver over the DevTools protocol.
//!
//! Elements are addressed through a `data-vigil-handle` attribute stamped on
//! the node the first time it is located. A handle whose node left the
//! document no longer matches anything and reports `StaleElement`.

use crate::clock::Clock;
use crate::config::SuiteConfig;
use crate::driver::{ElementDriver, ElementHandle, LogEntry, LogLevel};
use crate::locator::Locator;
use crate::result::{VigilError, VigilResult};
use crate::wait::{poll_until, Observation, PollBudget};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::log::{
    EnableParams as LogEnableParams, EventEntryAdded, LogEntryLevel,
};
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, CaptureScreenshotParams};
use chromiumoxide::cdp::js_protocol::runtime::{ConsoleApiCalledType, EventConsoleApiCalled};
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page as CdpPage;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info};

const HANDLE_ATTRIBUTE: &str = "data-vigil-handle";

const STAMP: &str = "const stamp = (el) => { \
    if (!el.dataset.vigilHandle) { \
        window.__vigilPage = window.__vigilPage || Math.random().toString(36).slice(2); \
        window.__vigilNext = (window.__vigilNext || 0) + 1; \
        el.dataset.vigilHandle = window.__vigilPage + '-' + window.__vigilNext; \
    } \
    return el.dataset.vigilHandle; \
};";

/// Options for launching Chromium
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    /// Run without a window
    pub headless: bool,
    /// Chromium executable override
    pub chromium_path: Option<PathBuf>,
    /// Unpacked extension to load
    pub extension: Option<PathBuf>,
    /// Disable the sandbox (containers)
    pub no_sandbox: bool,
}

impl LaunchOptions {
    /// Options for a suite run: headless flag, executable and extension
    #[must_use]
    pub fn from_config(config: &SuiteConfig) -> Self {
        Self {
            headless: config.headless,
            chromium_path: config.chromium_path.clone(),
            extension: Some(config.extension_dir()),
            no_sandbox: config.no_sandbox,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Located {
    handle: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LocatedAll {
    handles: Option<Vec<String>>,
    error: Option<String>,
}

/// [`ElementDriver`] backed by a real Chromium instance
#[derive(Debug)]
pub struct ChromiumDriver {
    browser: Arc<tokio::sync::Mutex<CdpBrowser>>,
    page: CdpPage,
    console: Arc<Mutex<Vec<LogEntry>>>,
    tasks: Vec<JoinHandle<()>>,
}

impl ChromiumDriver {
    /// Launch Chromium and open one page
    pub async fn launch(options: LaunchOptions) -> VigilResult<Self> {
        let mut builder = CdpConfig::builder();

        if options.headless {
            builder = builder.new_headless_mode();
        } else {
            builder = builder.with_head();
        }

        if options.no_sandbox {
            builder = builder.no_sandbox();
        }

        if let Some(ref path) = options.chromium_path {
            builder = builder.chrome_executable(path);
        }

        if let Some(ref extension) = options.extension {
            if !extension.exists() {
                return Err(VigilError::BrowserLaunchError {
                    message: format!("extension directory not found: {}", extension.display()),
                });
            }
            builder = builder.extension(extension.display().to_string());
        }

        let cdp_config = builder
            .build()
            .map_err(|message| VigilError::BrowserLaunchError { message })?;

        let (browser, mut handler) = CdpBrowser::launch(cdp_config).await.map_err(|e| {
            VigilError::BrowserLaunchError {
                message: e.to_string(),
            }
        })?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| VigilError::BrowserLaunchError {
                message: e.to_string(),
            })?;

        let console = Arc::new(Mutex::new(Vec::new()));
        let mut tasks = vec![handler_task];
        tasks.extend(capture_console(&page, &console).await?);

        info!(headless = options.headless, "chromium launched");
        Ok(Self {
            browser: Arc::new(tokio::sync::Mutex::new(browser)),
            page,
            console,
            tasks,
        })
    }

    /// Wait for the loaded extension to register and return its id
    pub async fn extension_id<C>(&self, clock: &C, budget: &PollBudget) -> VigilResult<String>
    where
        C: Clock + ?Sized,
    {
        let browser = &self.browser;
        poll_until(clock, budget, "extension target", move |_| async move {
            let targets = browser.lock().await.fetch_targets().await;
            match targets {
                Ok(targets) => targets
                    .iter()
                    .find_map(|t| extension_id_from_url(&t.url))
                    .map_or(Observation::Pending, Observation::Ready),
                Err(e) => Observation::Fault(map_cdp(e)),
            }
        })
        .await
        .into_result_with(|what, attempts, elapsed| VigilError::ElementNotShown {
            locator: what,
            attempts,
            elapsed_ms: elapsed.as_millis() as u64,
        })
    }

    /// Close the browser
    pub async fn close(self) -> VigilResult<()> {
        let mut browser = self.browser.lock().await;
        browser
            .close()
            .await
            .map_err(|e| VigilError::ConnectionFailed {
                message: e.to_string(),
            })?;
        for task in &self.tasks {
            task.abort();
        }
        Ok(())
    }

    async fn eval<T: DeserializeOwned>(&self, expression: String) -> VigilResult<T> {
        let result = self.page.evaluate(expression).await.map_err(map_cdp)?;
        result.into_value().map_err(|e| VigilError::ScriptError {
            message: e.to_string(),
        })
    }

    /// Evaluate `body` with `el` bound to the handle's node; `null` means stale
    async fn on_element<T: DeserializeOwned>(
        &self,
        element: &ElementHandle,
        body: &str,
    ) -> VigilResult<T> {
        let expression = format!(
            "(() => {{ const el = {}; if (!el) return null; {body} }})()",
            handle_query(element)
        );
        let value: Option<T> = self.eval(expression).await?;
        value.ok_or_else(|| stale(element))
    }

    async fn element(&self, element: &ElementHandle) -> VigilResult<chromiumoxide::element::Element> {
        self.page
            .find_element(handle_css(element))
            .await
            .map_err(|_| stale(element))
    }
}

impl Drop for ChromiumDriver {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

#[async_trait]
impl ElementDriver for ChromiumDriver {
    async fn locate(&self, locator: &Locator) -> VigilResult<ElementHandle> {
        let expression = format!(
            "(() => {{ {STAMP} try {{ const el = {}; return {{ handle: el ? stamp(el) : null, error: null }}; }} \
             catch (e) {{ return {{ handle: null, error: String(e) }}; }} }})()",
            locator.selector().to_query()
        );
        let located: Located = self.eval(expression).await?;
        match located {
            Located {
                error: Some(message),
                ..
            } => Err(VigilError::InvalidSelector {
                selector: locator.selector().to_string(),
                message,
            }),
            Located {
                handle: Some(id), ..
            } => Ok(ElementHandle::new(id)),
            Located { .. } => Err(VigilError::NoSuchElement {
                locator: locator.to_string(),
            }),
        }
    }

    async fn locate_all(&self, locator: &Locator) -> VigilResult<Vec<ElementHandle>> {
        let expression = format!(
            "(() => {{ {STAMP} try {{ return {{ handles: {}.map(stamp), error: null }}; }} \
             catch (e) {{ return {{ handles: null, error: String(e) }}; }} }})()",
            locator.selector().to_all_query()
        );
        let located: LocatedAll = self.eval(expression).await?;
        if let Some(message) = located.error {
            return Err(VigilError::InvalidSelector {
                selector: locator.selector().to_string(),
                message,
            });
        }
        Ok(located
            .handles
            .unwrap_or_default()
            .into_iter()
            .map(ElementHandle::new)
            .collect())
    }

    async fn is_visible(&self, element: &ElementHandle) -> VigilResult<bool> {
        self.on_element(
            element,
            "const s = getComputedStyle(el); const r = el.getBoundingClientRect(); \
             return s.display !== 'none' && s.visibility !== 'hidden' && \
             parseFloat(s.opacity || '1') > 0 && (r.width > 0 || r.height > 0);",
        )
        .await
    }

    async fn text(&self, element: &ElementHandle) -> VigilResult<String> {
        self.on_element(
            element,
            "return ('value' in el && el.tagName !== 'BUTTON' && el.tagName !== 'LI') ? String(el.value) : el.innerText;",
        )
        .await
    }

    async fn is_enabled(&self, element: &ElementHandle) -> VigilResult<bool> {
        self.on_element(element, "return !el.disabled;").await
    }

    async fn attribute(&self, element: &ElementHandle, name: &str) -> VigilResult<Option<String>> {
        let body = format!("return [el.getAttribute({name:?})];");
        let value: Vec<Option<String>> = self.on_element(element, &body).await?;
        Ok(value.into_iter().next().flatten())
    }

    async fn click(&self, element: &ElementHandle) -> VigilResult<()> {
        debug!(handle = %element, "click");
        self.element(element)
            .await?
            .click()
            .await
            .map_err(|e| VigilError::InputError {
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> VigilResult<()> {
        let node = self.element(element).await?;
        node.focus().await.map_err(|e| VigilError::InputError {
            message: e.to_string(),
        })?;
        node.type_str(text)
            .await
            .map_err(|e| VigilError::InputError {
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn clear(&self, element: &ElementHandle) -> VigilResult<()> {
        self.on_element::<bool>(
            element,
            "el.value = ''; el.dispatchEvent(new Event('input', { bubbles: true })); \
             el.dispatchEvent(new Event('change', { bubbles: true })); return true;",
        )
        .await?;
        Ok(())
    }

    async fn execute_script(
        &self,
        script: &str,
        args: &[serde_json::Value],
    ) -> VigilResult<serde_json::Value> {
        let mut rendered = Vec::with_capacity(args.len());
        for arg in args {
            match ElementHandle::from_script_arg(arg) {
                Some(handle) => rendered.push(handle_query(&handle)),
                None => rendered.push(serde_json::to_string(arg)?),
            }
        }
        let expression = format!(
            "(function() {{ {script} }}).apply(null, [{}])",
            rendered.join(", ")
        );
        let result = self.page.evaluate(expression).await.map_err(map_cdp)?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn navigate(&self, url: &str) -> VigilResult<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| VigilError::NavigationError {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn current_url(&self) -> VigilResult<String> {
        Ok(self
            .page
            .url()
            .await
            .map_err(map_cdp)?
            .unwrap_or_default())
    }

    async fn screenshot_png(&self) -> VigilResult<Vec<u8>> {
        let params = CaptureScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        let screenshot = self
            .page
            .execute(params)
            .await
            .map_err(|e| VigilError::ScreenshotError {
                message: e.to_string(),
            })?;

        use base64::Engine;
        base64::engine::general_purpose::STANDARD
            .decode(&screenshot.data)
            .map_err(|e| VigilError::ScreenshotError {
                message: e.to_string(),
            })
    }

    async fn page_source(&self) -> VigilResult<String> {
        self.page.content().await.map_err(map_cdp)
    }

    async fn console_logs(&self) -> VigilResult<Option<Vec<LogEntry>>> {
        let mut buffer = match self.console.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Ok(Some(std::mem::take(&mut *buffer)))
    }
}

async fn capture_console(
    page: &CdpPage,
    sink: &Arc<Mutex<Vec<LogEntry>>>,
) -> VigilResult<Vec<JoinHandle<()>>> {
    page.execute(LogEnableParams::default())
        .await
        .map_err(map_cdp)?;

    let mut entries = page
        .event_listener::<EventEntryAdded>()
        .await
        .map_err(map_cdp)?;
    let log_sink = Arc::clone(sink);
    let log_task = tokio::spawn(async move {
        while let Some(event) = entries.next().await {
            let level = match event.entry.level {
                LogEntryLevel::Error => LogLevel::Severe,
                LogEntryLevel::Warning => LogLevel::Warning,
                LogEntryLevel::Verbose => LogLevel::Debug,
                _ => LogLevel::Info,
            };
            push(&log_sink, LogEntry::new(level, event.entry.text.clone()));
        }
    });

    let mut calls = page
        .event_listener::<EventConsoleApiCalled>()
        .await
        .map_err(map_cdp)?;
    let api_sink = Arc::clone(sink);
    let api_task = tokio::spawn(async move {
        while let Some(event) = calls.next().await {
            let level = match event.r#type {
                ConsoleApiCalledType::Error | ConsoleApiCalledType::Assert => LogLevel::Severe,
                ConsoleApiCalledType::Warning => LogLevel::Warning,
                ConsoleApiCalledType::Debug => LogLevel::Debug,
                _ => LogLevel::Info,
            };
            let message: Vec<String> = event
                .args
                .iter()
                .map(|arg| match (&arg.value, &arg.description) {
                    (Some(serde_json::Value::String(s)), _) => s.clone(),
                    (Some(value), _) => value.to_string(),
                    (None, Some(description)) => description.clone(),
                    (None, None) => String::new(),
                })
                .collect();
            push(&api_sink, LogEntry::new(level, message.join(" ")));
        }
    });

    Ok(vec![log_task, api_task])
}

fn push(sink: &Mutex<Vec<LogEntry>>, entry: LogEntry) {
    let mut guard = match sink.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    guard.push(entry);
}

fn handle_css(element: &ElementHandle) -> String {
    format!("[{HANDLE_ATTRIBUTE}={:?}]", element.id())
}

fn handle_query(element: &ElementHandle) -> String {
    format!("document.querySelector({:?})", handle_css(element))
}

fn stale(element: &ElementHandle) -> VigilError {
    VigilError::StaleElement {
        handle: element.id().to_string(),
    }
}

fn map_cdp(err: CdpError) -> VigilError {
    match err {
        CdpError::Ws(_) | CdpError::ChannelSendError(_) | CdpError::NoResponse => {
            VigilError::ConnectionFailed {
                message: err.to_string(),
            }
        }
        other => VigilError::ScriptError {
            message: other.to_string(),
        },
    }
}

/// Extension id from a `chrome-extension://<id>/...` target URL
fn extension_id_from_url(url: &str) -> Option<String> {
    let rest = url.strip_prefix("chrome-extension://")?;
    let id = rest.split('/').next()?;
    (!id.is_empty()).then(|| id.to_string())
}
