//! Browser console error scan run after each step.
//!
//! Known-noisy entries (React/Redux development build warnings, third-party
//! favicon 404s) are dropped; whatever remains is reported.

use crate::driver::{LogEntry, LogLevel};

const DEFAULT_IGNORED_MESSAGES: [&str; 4] = [
    "Warning: Unknown prop `dataset` on ",
    "favicon.ico - Failed to load resource: the server responded with a status of 404 (Not Found)",
    "Warning: It looks like you're using a minified copy of the development build of React.",
    "This means that you are running a slower development build of Redux.",
];

/// Filter deciding which console entries count as errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleFilter {
    ignored_levels: Vec<LogLevel>,
    ignored_messages: Vec<String>,
}

impl Default for ConsoleFilter {
    fn default() -> Self {
        Self {
            ignored_levels: vec![LogLevel::Warning],
            ignored_messages: DEFAULT_IGNORED_MESSAGES
                .iter()
                .map(|m| (*m).to_string())
                .collect(),
        }
    }
}

impl ConsoleFilter {
    /// Filter with the default ignore lists
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ignore every entry at `level`
    #[must_use]
    pub fn ignore_level(mut self, level: LogLevel) -> Self {
        if !self.ignored_levels.contains(&level) {
            self.ignored_levels.push(level);
        }
        self
    }

    /// Ignore entries whose message contains `fragment`
    #[must_use]
    pub fn ignore_message(mut self, fragment: impl Into<String>) -> Self {
        self.ignored_messages.push(fragment.into());
        self
    }

    /// Whether `entry` counts as an error
    #[must_use]
    pub fn is_error(&self, entry: &LogEntry) -> bool {
        !self.ignored_levels.contains(&entry.level)
            && !self
                .ignored_messages
                .iter()
                .any(|m| entry.message.contains(m.as_str()))
    }

    /// Entries that count as errors, in order
    #[must_use]
    pub fn filter(&self, entries: &[LogEntry]) -> Vec<LogEntry> {
        entries.iter().filter(|e| self.is_error(e)).cloned().collect()
    }

    /// Human-readable report, `None` when there is nothing to report
    #[must_use]
    pub fn report(&self, entries: &[LogEntry]) -> Option<String> {
        let errors = self.filter(entries);
        if errors.is_empty() {
            return None;
        }
        let lines: Vec<&str> = errors.iter().map(|e| e.message.as_str()).collect();
        Some(format!(
            "Errors found in browser console:\n{}",
            lines.join("\n")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn severe(message: &str) -> LogEntry {
        LogEntry::new(LogLevel::Severe, message)
    }

    #[test]
    fn test_warnings_ignored() {
        let filter = ConsoleFilter::new();
        assert!(!filter.is_error(&LogEntry::new(LogLevel::Warning, "deprecated")));
        assert!(filter.is_error(&severe("Uncaught TypeError")));
    }

    #[test]
    fn test_known_noise_ignored() {
        let filter = ConsoleFilter::new();
        let entries = vec![
            severe("https://x/favicon.ico - Failed to load resource: the server responded with a status of 404 (Not Found)"),
            severe("Warning: Unknown prop `dataset` on <div> tag"),
            severe("Uncaught (in promise) Error: boom"),
        ];
        let errors = filter.filter(&entries);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Uncaught (in promise) Error: boom");
    }

    #[test]
    fn test_report_format() {
        let filter = ConsoleFilter::new();
        assert!(filter.report(&[]).is_none());
        let report = filter
            .report(&[severe("first"), severe("second")])
            .unwrap();
        assert_eq!(report, "Errors found in browser console:\nfirst\nsecond");
    }

    #[test]
    fn test_custom_ignores() {
        let filter = ConsoleFilter::new()
            .ignore_level(LogLevel::Info)
            .ignore_level(LogLevel::Info)
            .ignore_message("web3 deprecation");
        assert!(!filter.is_error(&LogEntry::new(LogLevel::Info, "hello")));
        assert!(!filter.is_error(&severe("MetaMask: web3 deprecation notice")));
        assert_eq!(filter.ignored_levels.len(), 2);
    }
}
