use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use serde::Serialize;

use crate::error::CtError;

const ANNUAL_REVIEW: &str = "Jahresrückblick";

static LABEL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)c['’]t\s+(?:(\d{1,2})\s*/\s*|jahresr(?:ü|ue)ckblick\s+)(\d{4})")
        .expect("label pattern is valid")
});

/// Publication year ("Jahrgang") of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Year(u16);

impl Year {
    pub fn last_two_digits(self) -> String {
        format!("{:02}", self.0 % 100)
    }
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

impl FromStr for Year {
    type Err = CtError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.len() != 4 || !trimmed.chars().all(|ch| ch.is_ascii_digit()) {
            return Err(CtError::InvalidLabel(value.to_string()));
        }
        trimmed
            .parse()
            .map(Self)
            .map_err(|_| CtError::InvalidLabel(value.to_string()))
    }
}

/// Sequence number of an issue within its year.
///
/// The year-end special issue carries no number on the site. It is kept as
/// its own variant and sorts after every numbered issue of the same year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IssueNumber {
    Regular(u8),
    AnnualReview,
}

impl IssueNumber {
    /// Form used in paths: numbers below 10 get a leading zero.
    pub fn padded(self) -> String {
        match self {
            IssueNumber::Regular(number) => format!("{number:02}"),
            IssueNumber::AnnualReview => ANNUAL_REVIEW.to_string(),
        }
    }
}

impl fmt::Display for IssueNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueNumber::Regular(number) => write!(f, "{number}"),
            IssueNumber::AnnualReview => write!(f, "{ANNUAL_REVIEW}"),
        }
    }
}

impl Serialize for IssueNumber {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IssueKey {
    pub year: Year,
    pub issue: IssueNumber,
}

impl IssueKey {
    pub fn new(year: Year, issue: IssueNumber) -> Self {
        Self { year, issue }
    }
}

impl PartialOrd for IssueKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IssueKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.year
            .cmp(&other.year)
            .then_with(|| self.issue.cmp(&other.issue))
    }
}

impl fmt::Display for IssueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.issue, self.year)
    }
}

impl FromStr for IssueKey {
    type Err = CtError;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        let captures = LABEL_PATTERN
            .captures(label)
            .ok_or_else(|| CtError::InvalidLabel(label.to_string()))?;
        let year: Year = captures[2].parse()?;
        let issue = match captures.get(1) {
            Some(number) => IssueNumber::Regular(
                number
                    .as_str()
                    .parse()
                    .map_err(|_| CtError::InvalidLabel(label.to_string()))?,
            ),
            None => IssueNumber::AnnualReview,
        };
        Ok(Self { year, issue })
    }
}

/// Parses a button label, logging and discarding labels that name no issue.
pub fn parse_label(label: &str) -> Option<IssueKey> {
    match label.parse::<IssueKey>() {
        Ok(key) => {
            tracing::debug!("'{label}' -> '{}' / '{}'", key.year, key.issue);
            Some(key)
        }
        Err(err) => {
            tracing::error!("{err}");
            None
        }
    }
}

/// One remote issue plus the local paths resolved for it.
#[derive(Debug, Clone)]
pub struct IssueDescriptor<E> {
    pub handle: E,
    pub label: String,
    pub key: IssueKey,
    filename: Option<String>,
    target_path: Option<Utf8PathBuf>,
}

impl<E> IssueDescriptor<E> {
    pub fn new(handle: E, label: impl Into<String>, key: IssueKey) -> Self {
        Self {
            handle,
            label: label.into(),
            key,
            filename: None,
            target_path: None,
        }
    }

    /// Builds a descriptor from a raw label; `None` when the label is not an issue.
    pub fn from_label(handle: E, label: &str) -> Option<Self> {
        parse_label(label).map(|key| Self::new(handle, label, key))
    }

    pub fn year(&self) -> Year {
        self.key.year
    }

    pub fn issue(&self) -> IssueNumber {
        self.key.issue
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn target_path(&self) -> Option<&Utf8Path> {
        self.target_path.as_deref()
    }

    pub(crate) fn set_resolved(&mut self, filename: String, target_path: Utf8PathBuf) {
        self.filename = Some(filename);
        self.target_path = Some(target_path);
    }
}

impl<E> fmt::Display for IssueDescriptor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "issue {}", self.key)
    }
}

/// Newest issue first: year descending, then issue number descending.
pub fn sort_newest_first<E>(issues: &mut [IssueDescriptor<E>]) {
    issues.sort_by(|left, right| right.key.cmp(&left.key));
}
