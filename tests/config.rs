use std::fs;

use assert_matches::assert_matches;

use ct_archive_fetch::config::{
    ConfigLoader, Credentials, DEFAULT_WEBDRIVER_URL, DOWNLOAD_MAX_WAIT_SECS, Overrides,
};
use ct_archive_fetch::error::CtError;

fn credentials() -> Credentials {
    Credentials {
        username: "reader".to_string(),
        password: "secret".to_string(),
    }
}

#[test]
fn settings_file_feeds_the_config() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("ct-fetch.json");
    fs::write(
        &path,
        r#"{
            "download_folder": "/srv/downloads",
            "target_folder": "/srv/ct/%1",
            "link_max_wait_secs": 90
        }"#,
    )
    .unwrap();

    let settings = ConfigLoader::load_settings(path.to_str()).unwrap();
    let config = ConfigLoader::resolve(settings, Overrides::default(), credentials()).unwrap();

    assert!(config.download_folder.ends_with("downloads"));
    assert!(config.target_folder.as_deref().unwrap().ends_with("%1"));
    assert_eq!(config.waits.link_secs, 90);
    assert_eq!(config.waits.download_secs, DOWNLOAD_MAX_WAIT_SECS);
    assert_eq!(config.webdriver_url, DEFAULT_WEBDRIVER_URL);
}

#[test]
fn credentials_are_rejected_in_settings_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("ct-fetch.json");
    fs::write(&path, r#"{ "password": "secret" }"#).unwrap();

    let err = ConfigLoader::load_settings(path.to_str()).unwrap_err();
    assert_matches!(err, CtError::ConfigParse(_));
}

#[test]
fn explicit_missing_settings_file_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("absent.json");

    let err = ConfigLoader::load_settings(path.to_str()).unwrap_err();
    assert_matches!(err, CtError::ConfigRead(_));
}

#[test]
fn empty_filename_template_is_invalid() {
    let settings = serde_json::from_str(r#"{ "filename_template": " " }"#).unwrap();
    let err = ConfigLoader::resolve(settings, Overrides::default(), credentials()).unwrap_err();
    assert_matches!(err, CtError::InvalidConfig(_));
}
