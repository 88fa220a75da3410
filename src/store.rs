use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tempfile::Builder;

use crate::config::FetchConfig;
use crate::domain::{IssueDescriptor, IssueKey};
use crate::error::CtError;
use crate::template;
use crate::wait::{PollOutcome, Poller, Sleeper};

/// Local state of one issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    /// The year folder does not exist: issues of that year are not wanted.
    Excluded,
    Present,
    Missing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Completed,
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relocation {
    AlreadyInPlace,
    SourceMissing,
    Moved,
}

/// File layout of the local issue collection: where issues are downloaded
/// to and where they finally live.
#[derive(Debug, Clone)]
pub struct IssueStore {
    download_folder: String,
    target_folder: Option<String>,
    filename_template: String,
}

impl IssueStore {
    pub fn new(
        download_folder: impl Into<String>,
        target_folder: Option<String>,
        filename_template: impl Into<String>,
    ) -> Self {
        Self {
            download_folder: download_folder.into(),
            target_folder,
            filename_template: filename_template.into(),
        }
    }

    pub fn from_config(config: &FetchConfig) -> Self {
        Self::new(
            config.download_folder.clone(),
            Some(config.effective_target_folder().to_string()),
            config.filename_template.clone(),
        )
    }

    pub fn filename(&self, key: &IssueKey) -> String {
        template::render(&self.filename_template, key)
    }

    pub fn target_dir(&self, key: &IssueKey) -> Utf8PathBuf {
        let folder = self.target_folder.as_deref().unwrap_or(&self.download_folder);
        Utf8PathBuf::from(template::render(folder, key))
    }

    pub fn download_dir(&self, key: &IssueKey) -> Utf8PathBuf {
        Utf8PathBuf::from(template::render(&self.download_folder, key))
    }

    /// Where the browser is expected to drop the file for `key`.
    pub fn download_path(&self, key: &IssueKey) -> Utf8PathBuf {
        self.download_dir(key).join(self.filename(key))
    }

    pub fn target_path(&self, key: &IssueKey) -> Utf8PathBuf {
        self.target_dir(key).join(self.filename(key))
    }

    /// Resolves filename and target path onto the issue and reports its local state.
    pub fn presence<E>(&self, issue: &mut IssueDescriptor<E>) -> Presence {
        let dir = self.target_dir(&issue.key);
        let filename = self.filename(&issue.key);
        let full_path = dir.join(&filename);
        issue.set_resolved(filename, full_path.clone());

        if !dir.as_std_path().is_dir() {
            tracing::info!("ignoring issues for {} ('{dir}' does not exist).", issue.year());
            return Presence::Excluded;
        }

        tracing::info!("checking for '{full_path}':");
        if is_readable_file(&full_path) {
            tracing::info!("already exists.");
            Presence::Present
        } else {
            tracing::info!("'{full_path}' not found.");
            Presence::Missing
        }
    }

    /// True unless the issue must be downloaded. An excluded year counts as existing.
    pub fn check_exists<E>(&self, issue: &mut IssueDescriptor<E>) -> bool {
        self.presence(issue) != Presence::Missing
    }
}

pub fn is_readable_file(path: &Utf8Path) -> bool {
    path.as_std_path().is_file() && fs::File::open(path.as_std_path()).is_ok()
}

/// Deletes a leftover file from an earlier run so it cannot pass as a finished download.
pub fn remove_stale(path: &Utf8Path) -> Result<bool, CtError> {
    match fs::remove_file(path.as_std_path()) {
        Ok(()) => {
            tracing::info!("removed stale '{path}'.");
            Ok(true)
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(CtError::Filesystem(format!("remove {path}: {err}"))),
    }
}

/// Blocks until `path` is a readable file, checking once per second.
pub fn await_download(path: &Utf8Path, max_wait_secs: u32, sleeper: &dyn Sleeper) -> WaitOutcome {
    let mut checks = 0u32;
    let outcome = Poller::per_second(max_wait_secs).run(sleeper, || {
        let done = is_readable_file(path);
        if !done {
            tracing::info!("waiting for download of '{path}' to complete ({checks}):");
            checks += 1;
        }
        done
    });
    match outcome {
        PollOutcome::Ready { .. } => {
            tracing::info!("found '{path}'.");
            WaitOutcome::Completed
        }
        PollOutcome::TimedOut { checks } => {
            tracing::error!("download of '{path}' did not complete after {checks} checks.");
            WaitOutcome::TimedOut
        }
    }
}

/// Moves a finished download to its canonical place, replacing an older copy.
pub fn relocate(downloaded: &Utf8Path, target: &Utf8Path) -> Result<Relocation, CtError> {
    if downloaded == target {
        tracing::debug!("downloaded file is already in the target folder.");
        return Ok(Relocation::AlreadyInPlace);
    }
    if !downloaded.as_std_path().exists() {
        tracing::debug!("'{downloaded}' is gone; nothing to move.");
        return Ok(Relocation::SourceMissing);
    }

    if target.as_std_path().exists() {
        tracing::info!("deleting prior existing file '{target}':");
        match fs::remove_file(target.as_std_path()) {
            Ok(()) => tracing::info!("prior existing file deleted."),
            Err(err) => tracing::warn!(
                "unable to delete prior existing file '{target}' ({err}); the following move will likely fail."
            ),
        }
    }

    tracing::info!("moving '{downloaded}' to '{target}':");
    if fs::rename(downloaded.as_std_path(), target.as_std_path()).is_err() {
        copy_then_remove(downloaded, target).map_err(|err| {
            tracing::error!(
                "failed to move '{downloaded}' to '{target}' ({err}); the file remains in the download folder."
            );
            CtError::Relocation {
                from: downloaded.to_string(),
                to: target.to_string(),
                message: err.to_string(),
            }
        })?;
    }
    tracing::info!("done.");
    Ok(Relocation::Moved)
}

// rename(2) cannot cross filesystems; stage a copy next to the target instead.
fn copy_then_remove(source: &Utf8Path, target: &Utf8Path) -> io::Result<()> {
    let parent = target
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "target has no parent"))?;
    let temp = Builder::new()
        .prefix(".ct-fetch")
        .tempfile_in(parent.as_std_path())?;
    fs::copy(source.as_std_path(), temp.path())?;
    temp.persist(target.as_std_path()).map_err(|err| err.error)?;
    fs::remove_file(source.as_std_path())
}
