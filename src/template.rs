//! Placeholder substitution for folder and file name templates.
//!
//! `%1` is the full year, `%2` its last two digits and `%3` the issue number
//! padded to two digits. The printf spellings `%1$s`, `%2$s` and `%3$s` are
//! accepted as well.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::domain::IssueKey;

pub const DEFAULT_FILENAME_TEMPLATE: &str = "ct.%2.%3.pdf";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%([123])(?:\$s)?").expect("placeholder pattern is valid"));

pub fn render(template: &str, key: &IssueKey) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| match &caps[1] {
            "1" => key.year.to_string(),
            "2" => key.year.last_two_digits(),
            _ => key.issue.padded(),
        })
        .into_owned()
}

pub fn has_placeholders(template: &str) -> bool {
    PLACEHOLDER.is_match(template)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{IssueNumber, Year};

    fn key(year: &str, issue: IssueNumber) -> IssueKey {
        IssueKey::new(year.parse::<Year>().unwrap(), issue)
    }

    #[test]
    fn default_filename() {
        assert_eq!(
            render(DEFAULT_FILENAME_TEMPLATE, &key("2024", IssueNumber::Regular(5))),
            "ct.24.05.pdf"
        );
        assert_eq!(
            render(DEFAULT_FILENAME_TEMPLATE, &key("2024", IssueNumber::Regular(12))),
            "ct.24.12.pdf"
        );
    }

    #[test]
    fn folder_template_with_printf_placeholders() {
        let rendered = render("/archive/ct/%1$s/%3", &key("2009", IssueNumber::Regular(7)));
        assert_eq!(rendered, "/archive/ct/2009/07");
    }

    #[test]
    fn annual_review_filename() {
        assert_eq!(
            render(DEFAULT_FILENAME_TEMPLATE, &key("2023", IssueNumber::AnnualReview)),
            "ct.23.Jahresrückblick.pdf"
        );
    }

    #[test]
    fn detects_placeholders() {
        assert!(has_placeholders("/data/ct/%1"));
        assert!(!has_placeholders("/data/ct"));
    }
}
