use crate::browser::{ArchiveBrowser, Locator, PageElement, wait_for_appearance};
use crate::config::{Credentials, WaitBudget};
use crate::error::CtError;
use crate::wait::Sleeper;

const ARCHIVE_HEADING: &str = "//h1[contains(text(),\"Artikel-Archiv c't\")]";
const SIGN_IN_CONTROL: &str = "//span[contains(.,'Anmelden')]";
const LOGIN_USER: &str = "login-user";
const LOGIN_PASSWORD: &str = "login-password";
const LOGIN_SUBMIT: &str = "rm_login";
const ARCHIVE_HEADER: &str = "archive__header";
const ISSUE_BUTTONS: &str = "//*[contains(concat(' ', normalize-space(@class), ' '), ' archive__header ')]\
/following::*[contains(concat(' ', normalize-space(@class), ' '), ' archive__year__link ')]";
pub const DOWNLOAD_LINK: &str = "issue-download-link";

/// The archive listing page and the steps needed to reach it signed in.
pub struct ArchiveSite<'a, B: ArchiveBrowser> {
    browser: &'a B,
    waits: WaitBudget,
    sleeper: &'a dyn Sleeper,
}

impl<'a, B: ArchiveBrowser> ArchiveSite<'a, B> {
    pub fn new(browser: &'a B, waits: WaitBudget, sleeper: &'a dyn Sleeper) -> Self {
        Self {
            browser,
            waits,
            sleeper,
        }
    }

    /// Opens the listing, signs in if needed and returns every issue button.
    pub fn open(&self, url: &str, credentials: &Credentials) -> Result<Vec<B::Element>, CtError> {
        tracing::info!("navigating to '{url}':");
        self.browser.navigate_to(url)?;
        self.ensure_archive_page()?;
        self.sign_in_if_needed(credentials)?;
        self.issue_buttons()
    }

    fn ensure_archive_page(&self) -> Result<(), CtError> {
        let heading = self
            .browser
            .find_elements(&Locator::xpath(ARCHIVE_HEADING))?
            .into_iter()
            .next();
        match heading {
            Some(heading) if heading.is_displayed()? => Ok(()),
            _ => Err(CtError::NotAtArchive(
                "the \"Artikel-Archiv c't\" heading is not displayed".to_string(),
            )),
        }
    }

    fn sign_in_if_needed(&self, credentials: &Credentials) -> Result<(), CtError> {
        let control = self
            .browser
            .find_elements(&Locator::xpath(SIGN_IN_CONTROL))?
            .into_iter()
            .next();
        let Some(control) = control.filter(|control| control.is_displayed().unwrap_or(false))
        else {
            tracing::info!("'Anmelden' is not displayed; assuming we are already signed in.");
            return Ok(());
        };

        tracing::info!("'Anmelden' is displayed; signing in:");
        control.click()?;
        let user = wait_for_appearance(
            self.browser,
            &Locator::id(LOGIN_USER),
            self.waits.login_form_secs,
            self.sleeper,
        )?
        .ok_or_else(|| CtError::LoginFailed("login form did not appear".to_string()))?;
        let password = self.browser.find_element(&Locator::id(LOGIN_PASSWORD))?;
        let submit = self.browser.find_element(&Locator::name(LOGIN_SUBMIT))?;

        tracing::trace!("entering user-id: '{}'", credentials.username);
        user.send_keys(&credentials.username)?;
        password.send_keys(&credentials.password)?;
        tracing::info!("clicking '{}':", submit.text().unwrap_or_default());
        submit.click()?;
        tracing::info!("we should be signed in now.");
        Ok(())
    }

    fn issue_buttons(&self) -> Result<Vec<B::Element>, CtError> {
        wait_for_appearance(
            self.browser,
            &Locator::class_name(ARCHIVE_HEADER),
            self.waits.appearance_secs,
            self.sleeper,
        )?
        .ok_or_else(|| CtError::NotAtArchive("archive listing did not appear".to_string()))?;
        self.browser.find_elements(&issue_button_locator())
    }
}

pub fn issue_button_locator() -> Locator {
    Locator::xpath(ISSUE_BUTTONS)
}

pub fn download_link_locator() -> Locator {
    Locator::class_name(DOWNLOAD_LINK)
}
