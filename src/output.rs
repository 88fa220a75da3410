use std::io::{self, Write};

use serde::Serialize;

use crate::app::{IssueAction, RunReport};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Text,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_report(report: &RunReport) -> io::Result<()> {
        Self::print_json(report)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

pub struct TextOutput;

impl TextOutput {
    pub fn print_report(report: &RunReport) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        Self::write_report(&mut stdout, report)
    }

    pub fn write_report<W: Write>(out: &mut W, report: &RunReport) -> io::Result<()> {
        let green = "\x1b[32m";
        let yellow = "\x1b[33m";
        let cyan = "\x1b[36m";
        let red = "\x1b[31m";
        let reset = "\x1b[0m";

        writeln!(out, "{cyan}c't archive summary{reset}")?;
        writeln!(
            out,
            "{green}downloaded: {}  present: {}  planned: {}  excluded: {}{reset}",
            report.count(IssueAction::Downloaded),
            report.count(IssueAction::Present),
            report.count(IssueAction::Planned),
            report.count(IssueAction::Excluded),
        )?;
        let failed = report.count(IssueAction::Failed);
        let color = if failed > 0 { red } else { yellow };
        writeln!(out, "{color}failed: {failed}{reset}")?;

        for issue in &report.issues {
            let color = match issue.action {
                IssueAction::Downloaded => cyan,
                IssueAction::Failed => red,
                IssueAction::Planned => yellow,
                IssueAction::Present | IssueAction::Excluded => green,
            };
            writeln!(
                out,
                "{color}  {}/{} {}{reset}",
                issue.issue,
                issue.year,
                issue.action.as_str()
            )?;
            if let Some(path) = &issue.path {
                writeln!(out, "{color}    {path}{reset}")?;
            }
            if let Some(error) = &issue.error {
                writeln!(out, "{red}    {error}{reset}")?;
            }
        }
        Ok(())
    }
}
