use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use ct_archive_fetch::app;
use ct_archive_fetch::config::{ConfigLoader, Credentials, FetchConfig, Overrides};
use ct_archive_fetch::error::CtError;
use ct_archive_fetch::output::{JsonOutput, OutputMode, TextOutput};
use ct_archive_fetch::template;
use ct_archive_fetch::wait::ThreadSleeper;
use ct_archive_fetch::webdriver::WebDriverSession;

#[derive(Parser)]
#[command(name = "ct-fetch")]
#[command(about = "Download c't issues missing from the local collection")]
#[command(version, author)]
struct Cli {
    #[arg(short = 'u', long, help = "user-id for login to Heise Media")]
    username: String,

    #[arg(short = 'p', long, help = "password for login to Heise Media")]
    password: String,

    #[arg(
        short = 'd',
        long = "download-folder",
        help = "browser download folder [default: the platform Downloads folder]"
    )]
    download_folder: Option<String>,

    #[arg(
        short = 't',
        long = "target-folder",
        help = "folder for finished issues; %1, %2, %3 expand to year, short year, issue [default: download folder]"
    )]
    target_folder: Option<String>,

    #[arg(long, help = "JSON settings file [default: ./ct-fetch.json if present]")]
    config: Option<String>,

    #[arg(long, help = "chromedriver endpoint [default: http://localhost:9515]")]
    webdriver_url: Option<String>,

    #[arg(long, help = "only report which issues are missing")]
    dry_run: bool,

    #[arg(long, help = "print the run report as JSON")]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        return ExitCode::from(exit_code(&report));
    }
    ExitCode::SUCCESS
}

fn exit_code(report: &miette::Report) -> u8 {
    report.downcast_ref::<CtError>().map_or(1, map_exit_code)
}

fn map_exit_code(error: &CtError) -> u8 {
    match error {
        CtError::ConfigRead(_) | CtError::ConfigParse(_) | CtError::InvalidConfig(_) => 2,
        CtError::WebDriverHttp(_)
        | CtError::WebDriverStatus { .. }
        | CtError::NotAtArchive(_)
        | CtError::LoginFailed(_)
        | CtError::SessionLost(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };

    let settings = ConfigLoader::load_settings(cli.config.as_deref())?;
    let config = ConfigLoader::resolve(
        settings,
        Overrides {
            download_folder: cli.download_folder,
            target_folder: cli.target_folder,
            webdriver_url: cli.webdriver_url,
        },
        Credentials {
            username: cli.username,
            password: cli.password,
        },
    )?;
    tracing::debug!("{config:?}");

    let browser =
        WebDriverSession::start(&config.webdriver_url, browser_download_dir(&config).as_deref())?;
    let report = app::run(&browser, &config, &ThreadSleeper, cli.dry_run)?;
    drop(browser);

    match output_mode {
        OutputMode::Json => JsonOutput::print_report(&report).into_diagnostic()?,
        OutputMode::Text => TextOutput::print_report(&report).into_diagnostic()?,
    }
    Ok(())
}

/// The browser needs one concrete folder; a per-issue template cannot be handed over.
fn browser_download_dir(config: &FetchConfig) -> Option<Utf8PathBuf> {
    if template::has_placeholders(&config.download_folder) {
        tracing::warn!(
            "download folder '{}' contains placeholders; leaving the browser's download folder unchanged.",
            config.download_folder
        );
        return None;
    }
    Some(Utf8PathBuf::from(&config.download_folder))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Same conversion `?` applies inside `run`.
    fn failed(err: CtError) -> miette::Result<()> {
        Err(err.into())
    }

    #[test]
    fn config_errors_exit_with_2() {
        let report = failed(CtError::ConfigParse("expected value".to_string())).unwrap_err();
        assert_eq!(exit_code(&report), 2);
    }

    #[test]
    fn session_errors_exit_with_3() {
        let report = failed(CtError::SessionLost("invalid session id".to_string())).unwrap_err();
        assert_eq!(exit_code(&report), 3);
    }

    #[test]
    fn other_errors_exit_with_1() {
        let report = failed(CtError::Filesystem("disk full".to_string())).unwrap_err();
        assert_eq!(exit_code(&report), 1);
        let report = miette::Report::msg("unexpected");
        assert_eq!(exit_code(&report), 1);
    }
}
