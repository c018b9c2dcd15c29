//! Locator abstraction for element selection.
//!
//! A [`Locator`] pairs a logical name (`screens.addToken.title`) with a
//! [`Selector`] describing how the driver finds the element. Locators are
//! built once into a [`crate::LocatorTable`] and never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Selector strategy for locating elements
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum Selector {
    /// CSS selector (e.g., "button.primary")
    Css(String),
    /// Element id attribute
    Id(String),
    /// Class name; several space-separated classes must all be present
    ClassName(String),
    /// Exact visible text of a link
    LinkText(String),
    /// XPath selector
    XPath(String),
}

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create an id selector
    #[must_use]
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    /// Create a class name selector
    #[must_use]
    pub fn class_name(name: impl Into<String>) -> Self {
        Self::ClassName(name.into())
    }

    /// Create a link text selector
    #[must_use]
    pub fn link_text(text: impl Into<String>) -> Self {
        Self::LinkText(text.into())
    }

    /// Create an XPath selector
    #[must_use]
    pub fn xpath(path: impl Into<String>) -> Self {
        Self::XPath(path.into())
    }

    /// Strategy name as used in the display form
    #[must_use]
    pub const fn strategy(&self) -> &'static str {
        match self {
            Self::Css(_) => "css",
            Self::Id(_) => "id",
            Self::ClassName(_) => "class",
            Self::LinkText(_) => "link",
            Self::XPath(_) => "xpath",
        }
    }

    /// Raw selector value
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Css(s) | Self::Id(s) | Self::ClassName(s) | Self::LinkText(s) | Self::XPath(s) => s,
        }
    }

    /// Convert to a page-script expression yielding the first match or `null`
    #[must_use]
    pub fn to_query(&self) -> String {
        match self {
            Self::Css(s) => format!("document.querySelector({s:?})"),
            Self::Id(id) => format!("document.getElementById({id:?})"),
            Self::ClassName(c) => format!("(document.getElementsByClassName({c:?})[0] || null)"),
            Self::LinkText(t) => format!(
                "(Array.from(document.querySelectorAll('a')).find(a => a.textContent.trim() === {t:?}) || null)"
            ),
            Self::XPath(s) => {
                format!("document.evaluate({s:?}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue")
            }
        }
    }

    /// Convert to a page-script expression yielding every match as an array
    #[must_use]
    pub fn to_all_query(&self) -> String {
        match self {
            Self::Css(s) => format!("Array.from(document.querySelectorAll({s:?}))"),
            Self::Id(id) => format!("[document.getElementById({id:?})].filter(Boolean)"),
            Self::ClassName(c) => format!("Array.from(document.getElementsByClassName({c:?}))"),
            Self::LinkText(t) => format!(
                "Array.from(document.querySelectorAll('a')).filter(a => a.textContent.trim() === {t:?})"
            ),
            Self::XPath(s) => format!(
                "(() => {{ const r = document.evaluate({s:?}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); \
                 return Array.from({{ length: r.snapshotLength }}, (_, i) => r.snapshotItem(i)); }})()"
            ),
        }
    }

    /// Convert to query for counting matches
    #[must_use]
    pub fn to_count_query(&self) -> String {
        format!("{}.length", self.to_all_query())
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.strategy(), self.value())
    }
}

/// A named locator: how to find one logical element of the wallet UI
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    /// Logical dotted name (e.g., `screens.main.tokens.remove`)
    name: String,
    /// The selector for finding the element
    selector: Selector,
}

impl Locator {
    /// Create a locator from a name and selector
    #[must_use]
    pub fn new(name: impl Into<String>, selector: Selector) -> Self {
        Self {
            name: name.into(),
            selector,
        }
    }

    /// Create an anonymous locator from a selector
    #[must_use]
    pub fn from_selector(selector: Selector) -> Self {
        Self {
            name: selector.to_string(),
            selector,
        }
    }

    /// CSS locator
    #[must_use]
    pub fn css(name: impl Into<String>, css: impl Into<String>) -> Self {
        Self::new(name, Selector::css(css))
    }

    /// Id locator
    #[must_use]
    pub fn id(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(name, Selector::id(id))
    }

    /// Class name locator
    #[must_use]
    pub fn class_name(name: impl Into<String>, class: impl Into<String>) -> Self {
        Self::new(name, Selector::class_name(class))
    }

    /// Link text locator
    #[must_use]
    pub fn link_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(name, Selector::link_text(text))
    }

    /// Get the logical name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the selector
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name == self.selector.to_string() {
            write!(f, "{}", self.selector)
        } else {
            write!(f, "{} ({})", self.name, self.selector)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod selector_tests {
        use super::*;

        #[test]
        fn test_css_query() {
            let selector = Selector::css(".sandwich-expando");
            assert_eq!(
                selector.to_query(),
                "document.querySelector(\".sandwich-expando\")"
            );
        }

        #[test]
        fn test_id_query() {
            let selector = Selector::id("token-address");
            assert_eq!(
                selector.to_query(),
                "document.getElementById(\"token-address\")"
            );
        }

        #[test]
        fn test_class_name_compound_query() {
            let selector = Selector::class_name("activeForm left");
            assert!(selector
                .to_query()
                .contains("getElementsByClassName(\"activeForm left\")"));
        }

        #[test]
        fn test_link_text_query() {
            let selector = Selector::link_text("Terms of Service");
            let query = selector.to_query();
            assert!(query.contains("querySelectorAll('a')"));
            assert!(query.contains("\"Terms of Service\""));
        }

        #[test]
        fn test_count_query_wraps_all_query() {
            let selector = Selector::css("ol > li");
            assert_eq!(
                selector.to_count_query(),
                "Array.from(document.querySelectorAll(\"ol > li\")).length"
            );
        }

        #[test]
        fn test_xpath_all_query_uses_snapshot() {
            let selector = Selector::xpath("//li");
            assert!(selector.to_all_query().contains("ORDERED_NODE_SNAPSHOT_TYPE"));
        }

        #[test]
        fn test_display() {
            assert_eq!(Selector::id("new_rpc").to_string(), "id=new_rpc");
            assert_eq!(Selector::class_name("trash").to_string(), "class=trash");
        }

        #[test]
        fn test_serde_shape() {
            let json = serde_json::to_value(Selector::id("x")).unwrap();
            assert_eq!(json, serde_json::json!({"by": "id", "value": "x"}));
        }
    }

    mod locator_tests {
        use super::*;

        #[test]
        fn test_named_locator() {
            let locator = Locator::id("screens.addToken.fields.decimals", "token_decimals");
            assert_eq!(locator.name(), "screens.addToken.fields.decimals");
            assert_eq!(locator.selector(), &Selector::id("token_decimals"));
            assert_eq!(
                locator.to_string(),
                "screens.addToken.fields.decimals (id=token_decimals)"
            );
        }

        #[test]
        fn test_anonymous_locator_display() {
            let locator = Locator::from_selector(Selector::css("button"));
            assert_eq!(locator.name(), "css=button");
            assert_eq!(locator.to_string(), "css=button");
        }
    }
}
