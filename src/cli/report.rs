//! Grouped image report for `check` and `rewrite`.

use std::collections::BTreeMap;
use std::fmt;

use owo_colors::OwoColorize;

use crate::utils::plural_s;

/// One image that did not load as expected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageIssue {
    pub target: String,
    pub reason: String,
}

/// Issues grouped by the page (or file) they were found in.
#[derive(Debug, Default)]
pub struct ImageReport {
    /// Images whose every format failed.
    pub exhausted: BTreeMap<String, Vec<ImageIssue>>,
    /// Images that only loaded as the original although variants are
    /// configured.
    pub degraded: BTreeMap<String, Vec<ImageIssue>>,
}

impl ImageReport {
    pub fn add_exhausted(&mut self, source: String, target: String, reason: String) {
        self.exhausted
            .entry(source)
            .or_default()
            .push(ImageIssue { target, reason });
    }

    pub fn add_degraded(&mut self, source: String, target: String, reason: String) {
        self.degraded
            .entry(source)
            .or_default()
            .push(ImageIssue { target, reason });
    }

    pub fn exhausted_count(&self) -> usize {
        self.exhausted.values().map(Vec::len).sum()
    }

    pub fn degraded_count(&self) -> usize {
        self.degraded.values().map(Vec::len).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.exhausted.is_empty() && self.degraded.is_empty()
    }

    /// Print the full report (exhausted, then degraded).
    pub fn print(&self) {
        Self::print_section("exhausted".red().bold().to_string(), &self.exhausted);
        Self::print_section("original only".yellow().bold().to_string(), &self.degraded);
    }

    fn print_section(name: String, issues: &BTreeMap<String, Vec<ImageIssue>>) {
        if issues.is_empty() {
            return;
        }
        eprintln!();

        let file_count = issues.len();
        let count: usize = issues.values().map(Vec::len).sum();
        eprintln!(
            "{} {}",
            name,
            format!(
                "({file_count} file{}, {count} image{})",
                plural_s(file_count),
                plural_s(count)
            )
            .dimmed()
        );

        for (path, list) in issues {
            eprintln!("{}{}{}", "[".dimmed(), path.cyan(), "]".dimmed());
            for issue in list {
                if issue.reason.is_empty() {
                    eprintln!("{} {}", "→".red(), issue.target);
                } else {
                    eprintln!("{} {} {}", "→".red(), issue.target, issue.reason.dimmed());
                }
            }
        }
    }
}

impl fmt::Display for ImageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let exhausted = self.exhausted_count();
        let degraded = self.degraded_count();

        if exhausted == 0 && degraded == 0 {
            return write!(f, "{}", "all images loaded".green());
        }
        write!(
            f,
            "{} {} {}",
            "found".dimmed(),
            exhausted.to_string().red().bold(),
            format!("exhausted image{}", plural_s(exhausted)).dimmed()
        )?;
        if degraded > 0 {
            write!(
                f,
                "{} {} {}",
                ",".dimmed(),
                degraded.to_string().yellow().bold(),
                "served as original".dimmed()
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_groups_by_source() {
        let mut report = ImageReport::default();
        report.add_exhausted("index.html".into(), "/a.jpg".into(), String::new());
        report.add_exhausted("index.html".into(), "/b.jpg".into(), "tried avif, webp".into());
        report.add_degraded("about/index.html".into(), "/c.png".into(), String::new());

        assert_eq!(report.exhausted.len(), 1);
        assert_eq!(report.exhausted_count(), 2);
        assert_eq!(report.degraded_count(), 1);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_report_summary() {
        let mut report = ImageReport::default();
        assert!(report.to_string().contains("all images loaded"));

        report.add_exhausted("index.html".into(), "/a.jpg".into(), String::new());
        let summary = report.to_string();
        assert!(summary.contains("exhausted image"));
        assert!(!summary.contains("exhausted images"));
        assert!(!summary.contains("served as original"));
    }
}
