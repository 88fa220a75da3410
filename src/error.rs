use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum CtError {
    #[error("label does not name an issue: {0}")]
    InvalidLabel(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("download link did not appear for issue {0}")]
    DownloadLinkMissing(String),

    #[error("download of {path} did not complete within {waited_secs} seconds")]
    DownloadTimeout { path: String, waited_secs: u32 },

    #[error("failed to move {from} to {to}: {message}")]
    Relocation {
        from: String,
        to: String,
        message: String,
    },

    #[error("WebDriver request failed: {0}")]
    #[diagnostic(help("is chromedriver running at the configured --webdriver-url?"))]
    WebDriverHttp(String),

    #[error("WebDriver returned status {status} ({error}): {message}")]
    WebDriverStatus {
        status: u16,
        error: String,
        message: String,
    },

    #[error("element is no longer attached to the page: {0}")]
    StaleElement(String),

    #[error("element not found: {0}")]
    ElementMissing(String),

    #[error("browser did not arrive at the archive page: {0}")]
    NotAtArchive(String),

    #[error("login failed: {0}")]
    #[diagnostic(help("check --username and --password"))]
    LoginFailed(String),

    #[error("browser session lost: {0}")]
    SessionLost(String),
}

impl CtError {
    /// Errors that leave the browser in an unknown state and abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CtError::WebDriverHttp(_)
                | CtError::NotAtArchive(_)
                | CtError::LoginFailed(_)
                | CtError::SessionLost(_)
        )
    }
}
