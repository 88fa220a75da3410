use std::fs;
use std::path::{MAIN_SEPARATOR, PathBuf};

use camino::Utf8PathBuf;
use directories::{BaseDirs, UserDirs};
use serde::Deserialize;

use crate::error::CtError;
use crate::template::DEFAULT_FILENAME_TEMPLATE;

pub const DEFAULT_ARCHIVE_URL: &str = "https://www.heise.de/select/ct/archiv";
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";
pub const DEFAULT_SETTINGS_FILE: &str = "ct-fetch.json";

pub const DOWNLOAD_MAX_WAIT_SECS: u32 = 200;
pub const LINK_MAX_WAIT_SECS: u32 = 65;
pub const APPEARANCE_WAIT_SECS: u32 = 10;
pub const LOGIN_FORM_WAIT_SECS: u32 = 3;

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitBudget {
    pub download_secs: u32,
    pub link_secs: u32,
    pub appearance_secs: u32,
    pub login_form_secs: u32,
}

impl Default for WaitBudget {
    fn default() -> Self {
        Self {
            download_secs: DOWNLOAD_MAX_WAIT_SECS,
            link_secs: LINK_MAX_WAIT_SECS,
            appearance_secs: APPEARANCE_WAIT_SECS,
            login_form_secs: LOGIN_FORM_WAIT_SECS,
        }
    }
}

/// Everything a run needs, resolved once at startup and passed down explicitly.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub download_folder: String,
    pub target_folder: Option<String>,
    pub filename_template: String,
    pub credentials: Credentials,
    pub archive_url: String,
    pub webdriver_url: String,
    pub waits: WaitBudget,
}

impl FetchConfig {
    pub fn new(download_folder: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            download_folder: download_folder.into(),
            target_folder: None,
            filename_template: DEFAULT_FILENAME_TEMPLATE.to_string(),
            credentials,
            archive_url: DEFAULT_ARCHIVE_URL.to_string(),
            webdriver_url: DEFAULT_WEBDRIVER_URL.to_string(),
            waits: WaitBudget::default(),
        }
    }

    /// Template of the folder that holds finished issues.
    pub fn effective_target_folder(&self) -> &str {
        self.target_folder.as_deref().unwrap_or(&self.download_folder)
    }
}

/// Optional JSON settings file. Credentials are deliberately not part of it.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub download_folder: Option<String>,
    #[serde(default)]
    pub target_folder: Option<String>,
    #[serde(default)]
    pub filename_template: Option<String>,
    #[serde(default)]
    pub archive_url: Option<String>,
    #[serde(default)]
    pub webdriver_url: Option<String>,
    #[serde(default)]
    pub download_max_wait_secs: Option<u32>,
    #[serde(default)]
    pub link_max_wait_secs: Option<u32>,
    #[serde(default)]
    pub appearance_wait_secs: Option<u32>,
}

/// Values given on the command line; they win over the settings file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub download_folder: Option<String>,
    pub target_folder: Option<String>,
    pub webdriver_url: Option<String>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads the settings file. Without an explicit path, `ct-fetch.json` in
    /// the working directory is used when it exists.
    pub fn load_settings(path: Option<&str>) -> Result<Settings, CtError> {
        let settings_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_SETTINGS_FILE),
        };

        if path.is_none() && !settings_path.exists() {
            return Ok(Settings::default());
        }

        let content = fs::read_to_string(&settings_path)
            .map_err(|_| CtError::ConfigRead(settings_path.clone()))?;
        serde_json::from_str(&content).map_err(|err| CtError::ConfigParse(err.to_string()))
    }

    pub fn resolve(
        settings: Settings,
        overrides: Overrides,
        credentials: Credentials,
    ) -> Result<FetchConfig, CtError> {
        let download_folder = match overrides.download_folder.or(settings.download_folder) {
            Some(folder) => normalize_folder_arg(&folder),
            None => default_download_folder()?.to_string(),
        };
        let target_folder = overrides
            .target_folder
            .or(settings.target_folder)
            .map(|folder| normalize_folder_arg(&folder));

        let filename_template = settings
            .filename_template
            .unwrap_or_else(|| DEFAULT_FILENAME_TEMPLATE.to_string());
        if filename_template.trim().is_empty() {
            return Err(CtError::InvalidConfig(
                "filename_template must not be empty".to_string(),
            ));
        }

        let defaults = WaitBudget::default();
        let waits = WaitBudget {
            download_secs: settings
                .download_max_wait_secs
                .unwrap_or(defaults.download_secs),
            link_secs: settings.link_max_wait_secs.unwrap_or(defaults.link_secs),
            appearance_secs: settings
                .appearance_wait_secs
                .unwrap_or(defaults.appearance_secs),
            login_form_secs: defaults.login_form_secs,
        };

        Ok(FetchConfig {
            download_folder,
            target_folder,
            filename_template,
            credentials,
            archive_url: settings
                .archive_url
                .unwrap_or_else(|| DEFAULT_ARCHIVE_URL.to_string()),
            webdriver_url: overrides
                .webdriver_url
                .or(settings.webdriver_url)
                .unwrap_or_else(|| DEFAULT_WEBDRIVER_URL.to_string()),
            waits,
        })
    }
}

/// Platform Downloads folder, or `<home>/Downloads` where the platform has none.
pub fn default_download_folder() -> Result<Utf8PathBuf, CtError> {
    let path = UserDirs::new()
        .and_then(|dirs| dirs.download_dir().map(|dir| dir.to_path_buf()))
        .or_else(|| BaseDirs::new().map(|dirs| dirs.home_dir().join("Downloads")))
        .ok_or_else(|| {
            CtError::Filesystem("unable to resolve the Downloads directory".to_string())
        })?;
    Utf8PathBuf::from_path_buf(path)
        .map_err(|_| CtError::Filesystem("non-utf8 Downloads directory".to_string()))
}

/// Folder arguments from batch files arrive with `/` separators and sometimes
/// with the closing quote still attached.
pub fn normalize_folder_arg(value: &str) -> String {
    let trimmed = value.trim();
    let trimmed = trimmed.strip_suffix('"').unwrap_or(trimmed);
    trimmed.replace('/', &MAIN_SEPARATOR.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> Credentials {
        Credentials {
            username: "reader".to_string(),
            password: "secret".to_string(),
        }
    }

    #[test]
    fn overrides_win_over_settings() {
        let settings = Settings {
            download_folder: Some("/from/file".to_string()),
            target_folder: Some("/target/file".to_string()),
            webdriver_url: Some("http://file:4444".to_string()),
            download_max_wait_secs: Some(30),
            ..Settings::default()
        };
        let overrides = Overrides {
            download_folder: Some("/from/cli".to_string()),
            target_folder: None,
            webdriver_url: Some("http://cli:9515".to_string()),
        };

        let config = ConfigLoader::resolve(settings, overrides, credentials()).unwrap();
        assert_eq!(config.download_folder, normalize_folder_arg("/from/cli"));
        assert_eq!(
            config.target_folder.as_deref(),
            Some(normalize_folder_arg("/target/file").as_str())
        );
        assert_eq!(config.webdriver_url, "http://cli:9515");
        assert_eq!(config.waits.download_secs, 30);
        assert_eq!(config.waits.link_secs, LINK_MAX_WAIT_SECS);
        assert_eq!(config.filename_template, DEFAULT_FILENAME_TEMPLATE);
    }

    #[test]
    fn strips_trailing_quote() {
        let normalized = normalize_folder_arg("C:/temp/\"");
        assert!(!normalized.ends_with('"'));
        assert!(normalized.starts_with("C:"));
    }

    #[test]
    fn target_folder_defaults_to_download_folder() {
        let mut config = FetchConfig::new("/downloads", credentials());
        assert_eq!(config.effective_target_folder(), "/downloads");
        config.target_folder = Some("/archive/%1".to_string());
        assert_eq!(config.effective_target_folder(), "/archive/%1");
    }

    #[test]
    fn password_is_not_debug_printed() {
        let rendered = format!("{:?}", credentials());
        assert!(!rendered.contains("secret"));
    }
}
