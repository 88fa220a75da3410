//! Capabilities the workflow needs from a browser session.
//!
//! The reconciliation logic only ever reads an element's text, checks
//! whether it is displayed and clicks it; the login form additionally
//! types into inputs. Anything that drives a real browser implements these
//! traits, and tests use in-memory fakes.

use std::fmt;

use crate::error::CtError;
use crate::wait::{Poller, Sleeper};

pub trait PageElement {
    fn text(&self) -> Result<String, CtError>;
    fn click(&self) -> Result<(), CtError>;
    fn is_displayed(&self) -> Result<bool, CtError>;
    fn send_keys(&self, text: &str) -> Result<(), CtError>;
}

pub trait ArchiveBrowser {
    type Element: PageElement;

    fn find_elements(&self, locator: &Locator) -> Result<Vec<Self::Element>, CtError>;
    fn navigate_to(&self, url: &str) -> Result<(), CtError>;
    fn navigate_back(&self) -> Result<(), CtError>;

    fn find_element(&self, locator: &Locator) -> Result<Self::Element, CtError> {
        self.find_elements(locator)?
            .into_iter()
            .next()
            .ok_or_else(|| CtError::ElementMissing(locator.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    XPath(String),
    Id(String),
    ClassName(String),
    Name(String),
}

impl Locator {
    pub fn xpath(value: impl Into<String>) -> Self {
        Locator::XPath(value.into())
    }

    pub fn id(value: impl Into<String>) -> Self {
        Locator::Id(value.into())
    }

    pub fn class_name(value: impl Into<String>) -> Self {
        Locator::ClassName(value.into())
    }

    pub fn name(value: impl Into<String>) -> Self {
        Locator::Name(value.into())
    }

    /// W3C WebDriver `(using, value)` pair.
    pub fn strategy(&self) -> (&'static str, String) {
        match self {
            Locator::XPath(xpath) => ("xpath", xpath.clone()),
            Locator::Id(id) => ("css selector", format!("[id=\"{}\"]", escape_quotes(id))),
            Locator::ClassName(class) => ("css selector", format!(".{class}")),
            Locator::Name(name) => ("css selector", format!("[name=\"{}\"]", escape_quotes(name))),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::XPath(value) => write!(f, "xpath '{value}'"),
            Locator::Id(value) => write!(f, "id '{value}'"),
            Locator::ClassName(value) => write!(f, "class '{value}'"),
            Locator::Name(value) => write!(f, "name '{value}'"),
        }
    }
}

fn escape_quotes(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Waits until the first element matching `locator` is displayed.
///
/// Returns `Ok(None)` when nothing shows up within `max_wait_secs`.
pub fn wait_for_appearance<B: ArchiveBrowser>(
    browser: &B,
    locator: &Locator,
    max_wait_secs: u32,
    sleeper: &dyn Sleeper,
) -> Result<Option<B::Element>, CtError> {
    tracing::info!("waiting for appearance of element {locator}");
    let found = Poller::per_second(max_wait_secs).try_run(sleeper, || {
        let Some(first) = browser.find_elements(locator)?.into_iter().next() else {
            return Ok(None);
        };
        Ok(first.is_displayed()?.then_some(first))
    })?;
    if found.is_none() {
        tracing::info!("no element {locator} found within {max_wait_secs} seconds");
    }
    Ok(found)
}
