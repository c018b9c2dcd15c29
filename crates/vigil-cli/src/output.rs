//! Output formatting for listings and suite results

use crate::commands::ListFormat;
use crate::error::CliResult;
use console::{style, Term};
use serde::Serialize;
use vigil::{LocatorTable, StepStatus, SuiteReport};

/// One row of the locator listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocatorRow {
    /// Dotted locator name
    pub name: String,
    /// Selector strategy (`css`, `id`, ...)
    pub by: String,
    /// Selector value
    pub value: String,
}

/// Rows for every locator whose name starts with `prefix`, sorted by name
#[must_use]
pub fn locator_rows(table: &LocatorTable, prefix: Option<&str>) -> Vec<LocatorRow> {
    let mut rows: Vec<LocatorRow> = table
        .with_prefix(prefix.unwrap_or(""))
        .into_iter()
        .map(|locator| LocatorRow {
            name: locator.name().to_string(),
            by: locator.selector().strategy().to_string(),
            value: locator.selector().value().to_string(),
        })
        .collect();
    rows.sort_by(|a, b| a.name.cmp(&b.name));
    rows
}

/// Expected UI texts whose key starts with `prefix`, sorted by key
#[must_use]
pub fn text_rows(table: &LocatorTable, prefix: Option<&str>) -> Vec<(String, String)> {
    let prefix = prefix.unwrap_or("");
    let mut rows: Vec<(String, String)> = table
        .texts()
        .filter(|(key, _)| key.starts_with(prefix))
        .map(|(key, text)| (key.to_string(), text.to_string()))
        .collect();
    rows.sort();
    rows
}

/// Render the locator listing
pub fn render_locators(rows: &[LocatorRow], format: ListFormat) -> CliResult<String> {
    match format {
        ListFormat::Json => Ok(serde_json::to_string_pretty(rows)?),
        ListFormat::Yaml => Ok(serde_yaml_ng::to_string(rows)?),
        ListFormat::Table => {
            let name_width = rows.iter().map(|r| r.name.len()).max().unwrap_or(0);
            let by_width = rows.iter().map(|r| r.by.len()).max().unwrap_or(0);
            let mut out = String::new();
            for row in rows {
                out.push_str(&format!(
                    "{:<name_width$}  {:<by_width$}  {}\n",
                    row.name, row.by, row.value
                ));
            }
            Ok(out)
        }
    }
}

/// Terminal reporter for suite progress and results
#[derive(Debug)]
pub struct Reporter {
    term: Term,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Reporter {
    /// Create a reporter writing to stdout
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stdout(),
            use_color,
            quiet,
        }
    }

    /// Print a success line
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("✓").green().bold().to_string()
        } else {
            "PASS".to_string()
        };
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a failure line; shown even in quiet mode
    pub fn failure(&self, message: &str) {
        let prefix = if self.use_color {
            style("✗").red().bold().to_string()
        } else {
            "FAIL".to_string()
        };
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a skipped line
    pub fn skipped(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("-").yellow().to_string()
        } else {
            "SKIP".to_string()
        };
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print plain output unless quiet
    pub fn line(&self, message: &str) {
        if !self.quiet {
            let _ = self.term.write_line(message);
        }
    }

    /// Print every step of a suite report followed by a summary line
    pub fn suite_report(&self, report: &SuiteReport) {
        for step in &report.steps {
            let title = format!("{} > {}", step.group, step.name);
            match step.status {
                StepStatus::Passed => {
                    self.success(&format!("{title} ({}ms)", step.duration.as_millis()));
                }
                StepStatus::Skipped => self.skipped(&title),
                StepStatus::Failed => {
                    self.failure(&title);
                    if let Some(ref error) = step.error {
                        self.failure(&format!("    {error}"));
                    }
                    for message in &step.console_errors {
                        self.failure(&format!("    console: {message}"));
                    }
                    if let Some(ref path) = step.screenshot {
                        self.failure(&format!("    screenshot: {path}"));
                    }
                }
            }
        }
        let _ = self.term.write_line(&summary_line(report));
    }
}

/// `<suite>: N passed, N failed, N skipped in Xs`
#[must_use]
pub fn summary_line(report: &SuiteReport) -> String {
    format!(
        "{}: {} passed, {} failed, {} skipped in {:.1}s",
        report.suite_name,
        report.passed_count(),
        report.failed_count(),
        report.skipped_count(),
        report.duration.as_secs_f64()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use vigil::StepReport;

    fn step(name: &str, status: StepStatus) -> StepReport {
        StepReport {
            group: "Lock".to_string(),
            name: name.to_string(),
            status,
            duration: Duration::from_millis(20),
            error: None,
            console_errors: Vec::new(),
            screenshot: None,
            dom: None,
        }
    }

    mod locator_tests {
        use super::*;

        #[test]
        fn test_rows_are_filtered_and_sorted() {
            let table = LocatorTable::wallet();
            let rows = locator_rows(&table, Some("screens.lock"));
            assert!(!rows.is_empty());
            assert!(rows.iter().all(|r| r.name.starts_with("screens.lock")));
            assert!(rows.windows(2).all(|w| w[0].name <= w[1].name));
        }

        #[test]
        fn test_unknown_prefix_is_empty() {
            let table = LocatorTable::wallet();
            assert!(locator_rows(&table, Some("nowhere.")).is_empty());
        }

        #[test]
        fn test_table_format_aligns_columns() {
            let rows = vec![
                LocatorRow {
                    name: "a".to_string(),
                    by: "css".to_string(),
                    value: ".x".to_string(),
                },
                LocatorRow {
                    name: "long.name".to_string(),
                    by: "id".to_string(),
                    value: "y".to_string(),
                },
            ];
            let out = render_locators(&rows, ListFormat::Table).unwrap();
            let lines: Vec<&str> = out.lines().collect();
            assert_eq!(lines[0], "a          css  .x");
            assert_eq!(lines[1], "long.name  id   y");
        }

        #[test]
        fn test_json_format_is_parseable() {
            let table = LocatorTable::wallet();
            let rows = locator_rows(&table, Some("elements."));
            let out = render_locators(&rows, ListFormat::Json).unwrap();
            let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
            assert_eq!(parsed.as_array().map(Vec::len), Some(rows.len()));
        }

        #[test]
        fn test_text_rows_filter() {
            let table = LocatorTable::wallet();
            let rows = text_rows(&table, Some("screens.lock"));
            assert!(rows.iter().all(|(key, _)| key.starts_with("screens.lock")));
        }
    }

    mod summary_tests {
        use super::*;

        #[test]
        fn test_summary_counts() {
            let report = SuiteReport {
                suite_name: "Wallet popup".to_string(),
                steps: vec![
                    step("logs out", StepStatus::Passed),
                    step("unlocks", StepStatus::Failed),
                    step("again", StepStatus::Skipped),
                ],
                duration: Duration::from_millis(1500),
            };
            assert_eq!(
                summary_line(&report),
                "Wallet popup: 1 passed, 1 failed, 1 skipped in 1.5s"
            );
        }
    }
}
