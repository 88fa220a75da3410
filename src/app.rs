use camino::Utf8PathBuf;
use serde::Serialize;

use crate::browser::{ArchiveBrowser, PageElement, wait_for_appearance};
use crate::config::{FetchConfig, WaitBudget};
use crate::domain::{IssueDescriptor, IssueNumber, Year, sort_newest_first};
use crate::error::CtError;
use crate::site::{ArchiveSite, download_link_locator, issue_button_locator};
use crate::store::{self, IssueStore, Presence, Relocation, WaitOutcome};
use crate::wait::Sleeper;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueAction {
    Present,
    Excluded,
    Planned,
    Downloaded,
    Failed,
}

impl IssueAction {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueAction::Present => "present",
            IssueAction::Excluded => "excluded",
            IssueAction::Planned => "planned",
            IssueAction::Downloaded => "downloaded",
            IssueAction::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IssueReport {
    pub year: Year,
    pub issue: IssueNumber,
    pub action: IssueAction,
    pub path: Option<String>,
    pub error: Option<String>,
}

impl IssueReport {
    fn new<E>(issue: &IssueDescriptor<E>, action: IssueAction) -> Self {
        Self {
            year: issue.year(),
            issue: issue.issue(),
            action,
            path: issue.target_path().map(|path| path.to_string()),
            error: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: String,
    pub finished_at: Option<String>,
    pub issues: Vec<IssueReport>,
}

impl RunReport {
    fn begin() -> Self {
        Self {
            started_at: chrono::Utc::now().to_rfc3339(),
            finished_at: None,
            issues: Vec::new(),
        }
    }

    fn finish(mut self) -> Self {
        self.finished_at = Some(chrono::Utc::now().to_rfc3339());
        self
    }

    pub fn count(&self, action: IssueAction) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.action == action)
            .count()
    }
}

/// Brings the local collection in line with the archive listing, one issue at a time.
pub struct Reconciler<'a, B: ArchiveBrowser> {
    browser: &'a B,
    store: IssueStore,
    waits: WaitBudget,
    sleeper: &'a dyn Sleeper,
}

impl<'a, B: ArchiveBrowser> Reconciler<'a, B> {
    pub fn new(browser: &'a B, store: IssueStore, waits: WaitBudget, sleeper: &'a dyn Sleeper) -> Self {
        Self {
            browser,
            store,
            waits,
            sleeper,
        }
    }

    pub fn from_config(browser: &'a B, config: &FetchConfig, sleeper: &'a dyn Sleeper) -> Self {
        Self::new(browser, IssueStore::from_config(config), config.waits, sleeper)
    }

    /// Turns issue buttons into descriptors, newest first. Buttons whose
    /// label names no issue or cannot be read are dropped.
    pub fn collect_issues(
        &self,
        elements: Vec<B::Element>,
    ) -> Result<Vec<IssueDescriptor<B::Element>>, CtError> {
        let mut issues = Vec::with_capacity(elements.len());
        for element in elements {
            let label = match element.text() {
                Ok(label) => label,
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    tracing::error!("skipping issue button: {err}");
                    continue;
                }
            };
            if label.trim().is_empty() {
                continue;
            }
            if let Some(issue) = IssueDescriptor::from_label(element, &label) {
                issues.push(issue);
            }
        }
        sort_newest_first(&mut issues);
        tracing::info!("Found {} issues.", issues.len());
        Ok(issues)
    }

    /// Runs the existence check on every issue and returns the ones to download.
    pub fn select_missing(
        &self,
        issues: Vec<IssueDescriptor<B::Element>>,
        report: &mut RunReport,
    ) -> Vec<IssueDescriptor<B::Element>> {
        let mut missing = Vec::new();
        for mut issue in issues {
            tracing::debug!("{issue}:");
            match self.store.presence(&mut issue) {
                Presence::Missing => missing.push(issue),
                Presence::Present => {
                    tracing::info!("--> no action for {issue}");
                    report.issues.push(IssueReport::new(&issue, IssueAction::Present));
                }
                Presence::Excluded => {
                    report.issues.push(IssueReport::new(&issue, IssueAction::Excluded));
                }
            }
        }
        missing
    }

    /// Reports what a real run would download without touching the browser.
    pub fn plan(&self, issues: Vec<IssueDescriptor<B::Element>>) -> RunReport {
        let mut report = RunReport::begin();
        for issue in self.select_missing(issues, &mut report) {
            report.issues.push(IssueReport::new(&issue, IssueAction::Planned));
        }
        report.finish()
    }

    /// Downloads every missing issue. Failures of a single issue are recorded
    /// and the run continues; fatal browser errors abort it.
    pub fn reconcile(&self, issues: Vec<IssueDescriptor<B::Element>>) -> Result<RunReport, CtError> {
        let mut report = RunReport::begin();
        let missing = self.select_missing(issues, &mut report);
        for issue in &missing {
            let mut entry = IssueReport::new(issue, IssueAction::Downloaded);
            match self.download_issue(issue) {
                Ok(path) => entry.path = Some(path.to_string()),
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    tracing::error!("error loading {issue}: {err}");
                    entry.action = IssueAction::Failed;
                    entry.error = Some(err.to_string());
                }
            }
            report.issues.push(entry);
        }
        Ok(report.finish())
    }

    fn download_issue(&self, issue: &IssueDescriptor<B::Element>) -> Result<Utf8PathBuf, CtError> {
        tracing::info!("downloading {issue}:");
        self.open_issue(issue)?;
        let result = self.download_opened(issue);
        // Back to the listing for the next issue, whatever happened on the issue page.
        if let Err(back) = self.browser.navigate_back() {
            if let Err(err) = &result {
                tracing::error!("error loading {issue}: {err}");
            }
            return Err(back);
        }
        result
    }

    fn open_issue(&self, issue: &IssueDescriptor<B::Element>) -> Result<(), CtError> {
        tracing::info!("clicking '{}'", issue.label);
        match issue.handle.click() {
            Err(CtError::StaleElement(_)) => {
                tracing::debug!("button for {issue} went stale; looking it up again.");
                self.rebind(issue)?.click()
            }
            other => other,
        }
    }

    fn rebind(&self, issue: &IssueDescriptor<B::Element>) -> Result<B::Element, CtError> {
        self.browser
            .find_elements(&issue_button_locator())?
            .into_iter()
            .find(|element| element.text().is_ok_and(|text| text == issue.label))
            .ok_or_else(|| CtError::ElementMissing(issue.label.clone()))
    }

    fn download_opened(&self, issue: &IssueDescriptor<B::Element>) -> Result<Utf8PathBuf, CtError> {
        tracing::info!("waiting for the download link to appear:");
        let link = wait_for_appearance(
            self.browser,
            &download_link_locator(),
            self.waits.link_secs,
            self.sleeper,
        )?
        .ok_or_else(|| CtError::DownloadLinkMissing(issue.key.to_string()))?;

        let download_path = self.store.download_path(&issue.key);
        store::remove_stale(&download_path)?;
        tracing::info!("clicking '{}':", link.text().unwrap_or_default());
        link.click()?;
        tracing::info!("downloading to '{download_path}':");

        if store::await_download(&download_path, self.waits.download_secs, self.sleeper)
            == WaitOutcome::TimedOut
        {
            return Err(CtError::DownloadTimeout {
                path: download_path.to_string(),
                waited_secs: self.waits.download_secs,
            });
        }

        let target = issue
            .target_path()
            .map(|path| path.to_path_buf())
            .unwrap_or_else(|| self.store.target_path(&issue.key));
        match store::relocate(&download_path, &target)? {
            Relocation::Moved => Ok(target),
            Relocation::AlreadyInPlace => Ok(download_path),
            Relocation::SourceMissing => Err(CtError::Filesystem(format!(
                "downloaded file '{download_path}' vanished before it could be moved"
            ))),
        }
    }
}

/// Whole run: open the archive, enumerate issues, then download or plan.
pub fn run<B: ArchiveBrowser>(
    browser: &B,
    config: &FetchConfig,
    sleeper: &dyn Sleeper,
    dry_run: bool,
) -> Result<RunReport, CtError> {
    let site = ArchiveSite::new(browser, config.waits, sleeper);
    let buttons = site.open(&config.archive_url, &config.credentials)?;
    let reconciler = Reconciler::from_config(browser, config, sleeper);
    let issues = reconciler.collect_issues(buttons)?;
    if dry_run {
        Ok(reconciler.plan(issues))
    } else {
        reconciler.reconcile(issues)
    }
}
