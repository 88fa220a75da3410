#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use camino::Utf8PathBuf;

use ct_archive_fetch::browser::{ArchiveBrowser, Locator, PageElement};
use ct_archive_fetch::error::CtError;
use ct_archive_fetch::wait::Sleeper;

#[derive(Default)]
struct ElementState {
    text: String,
    displayed: Cell<bool>,
    stale: Cell<bool>,
    unreadable: Cell<bool>,
    clicks: Cell<u32>,
    typed: RefCell<Vec<String>>,
    on_click: RefCell<Option<Box<dyn Fn()>>>,
}

#[derive(Clone)]
pub struct FakeElement {
    inner: Rc<ElementState>,
}

impl FakeElement {
    pub fn new(text: &str) -> Self {
        let state = ElementState {
            text: text.to_string(),
            ..ElementState::default()
        };
        state.displayed.set(true);
        Self {
            inner: Rc::new(state),
        }
    }

    pub fn hidden(self) -> Self {
        self.inner.displayed.set(false);
        self
    }

    pub fn stale(self) -> Self {
        self.inner.stale.set(true);
        self
    }

    /// Element whose text can no longer be read from the page.
    pub fn unreadable(self) -> Self {
        self.inner.unreadable.set(true);
        self
    }

    pub fn on_click(self, action: impl Fn() + 'static) -> Self {
        *self.inner.on_click.borrow_mut() = Some(Box::new(action));
        self
    }

    pub fn clicks(&self) -> u32 {
        self.inner.clicks.get()
    }

    pub fn typed(&self) -> Vec<String> {
        self.inner.typed.borrow().clone()
    }
}

impl PageElement for FakeElement {
    fn text(&self) -> Result<String, CtError> {
        if self.inner.unreadable.get() {
            return Err(CtError::StaleElement(self.inner.text.clone()));
        }
        Ok(self.inner.text.clone())
    }

    fn click(&self) -> Result<(), CtError> {
        if self.inner.stale.get() {
            return Err(CtError::StaleElement(self.inner.text.clone()));
        }
        self.inner.clicks.set(self.inner.clicks.get() + 1);
        if let Some(action) = self.inner.on_click.borrow().as_ref() {
            action();
        }
        Ok(())
    }

    fn is_displayed(&self) -> Result<bool, CtError> {
        Ok(self.inner.displayed.get())
    }

    fn send_keys(&self, text: &str) -> Result<(), CtError> {
        self.inner.typed.borrow_mut().push(text.to_string());
        Ok(())
    }
}

/// In-memory page. A lookup returns the elements of the first registered
/// fragment contained in the locator's description.
#[derive(Default)]
pub struct FakeBrowser {
    pages: RefCell<Vec<(String, Vec<FakeElement>)>>,
    pub visited: RefCell<Vec<String>>,
    pub backs: Cell<u32>,
    fail_back: Cell<bool>,
}

impl FakeBrowser {
    pub fn with(self, fragment: &str, elements: Vec<FakeElement>) -> Self {
        self.pages
            .borrow_mut()
            .push((fragment.to_string(), elements));
        self
    }

    pub fn failing_back(self) -> Self {
        self.fail_back.set(true);
        self
    }
}

impl ArchiveBrowser for FakeBrowser {
    type Element = FakeElement;

    fn find_elements(&self, locator: &Locator) -> Result<Vec<FakeElement>, CtError> {
        let description = locator.to_string();
        Ok(self
            .pages
            .borrow()
            .iter()
            .find(|(fragment, _)| description.contains(fragment.as_str()))
            .map(|(_, elements)| elements.clone())
            .unwrap_or_default())
    }

    fn navigate_to(&self, url: &str) -> Result<(), CtError> {
        self.visited.borrow_mut().push(url.to_string());
        Ok(())
    }

    fn navigate_back(&self) -> Result<(), CtError> {
        if self.fail_back.get() {
            return Err(CtError::SessionLost("browser window closed".to_string()));
        }
        self.backs.set(self.backs.get() + 1);
        Ok(())
    }
}

pub struct NoSleep;

impl Sleeper for NoSleep {
    fn sleep(&self, _duration: Duration) {}
}

/// Counts sleeps and runs a hook with the running count after each one.
pub struct HookSleeper<F: Fn(u32)> {
    pub sleeps: Cell<u32>,
    hook: F,
}

impl<F: Fn(u32)> HookSleeper<F> {
    pub fn new(hook: F) -> Self {
        Self {
            sleeps: Cell::new(0),
            hook,
        }
    }
}

impl<F: Fn(u32)> Sleeper for HookSleeper<F> {
    fn sleep(&self, _duration: Duration) {
        let count = self.sleeps.get() + 1;
        self.sleeps.set(count);
        (self.hook)(count);
    }
}

pub fn utf8(path: &Path) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(path.to_path_buf()).unwrap()
}
