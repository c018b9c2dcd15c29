//! Failure artifacts: screenshot and DOM dump for a failed step.
//!
//! Layout: `<root>/<browser>/<step title>/test-failure-screenshot.png` and
//! `test-failure-dom.html` next to it.

use crate::config::BrowserKind;
use crate::driver::ElementDriver;
use crate::result::VigilResult;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Files written for one failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureArtifacts {
    /// Screenshot path, if the driver could capture one
    pub screenshot: Option<PathBuf>,
    /// DOM dump path
    pub dom: PathBuf,
}

/// Writes failure artifacts under a root directory
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    root: PathBuf,
    browser: BrowserKind,
}

impl ArtifactWriter {
    /// Create a writer
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, browser: BrowserKind) -> Self {
        Self {
            root: root.into(),
            browser,
        }
    }

    /// Directory for a step's artifacts
    #[must_use]
    pub fn dir_for(&self, title: &str) -> PathBuf {
        self.root
            .join(self.browser.as_str())
            .join(sanitize_title(title))
    }

    /// Capture screenshot and DOM for a failed step.
    ///
    /// A screenshot failure is logged and skipped; the DOM dump is required.
    pub async fn capture<D>(&self, driver: &D, title: &str) -> VigilResult<FailureArtifacts>
    where
        D: ElementDriver + ?Sized,
    {
        let dir = self.dir_for(title);
        tokio::fs::create_dir_all(&dir).await?;
        let base = dir.join("test-failure");

        let screenshot = match driver.screenshot_png().await {
            Ok(png) => {
                let path = with_suffix(&base, "-screenshot.png");
                tokio::fs::write(&path, png).await?;
                Some(path)
            }
            Err(err) => {
                warn!(step = title, error = %err, "screenshot capture failed");
                None
            }
        };

        let html = driver.page_source().await?;
        let dom = with_suffix(&base, "-dom.html");
        tokio::fs::write(&dom, html).await?;

        Ok(FailureArtifacts { screenshot, dom })
    }
}

fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Replace path separators and control characters so a step title is one
/// directory component
fn sanitize_title(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim().trim_matches('.');
    if trimmed.is_empty() {
        "unnamed".to_string()
    } else {
        trimmed.to_string()
    }
}
