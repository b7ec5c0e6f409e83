//! Outcome of a sync run and its human-readable renderings.

use askama::Template;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    pub source_id: String,
    pub title: String,
    pub detail: String,
}

impl ReportEntry {
    #[must_use]
    pub fn new(source_id: &str, title: &str, detail: String) -> Self {
        Self {
            source_id: source_id.to_owned(),
            title: title.to_owned(),
            detail,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    NoChanges,
    Success,
    PartialFailure,
    TotalFailure,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeReport {
    pub created: Vec<ReportEntry>,
    pub updated: Vec<ReportEntry>,
    pub paused: Vec<ReportEntry>,
    pub failed: Vec<ReportEntry>,
    pub unchanged: usize,
    pub skipped: usize,
    pub dry_run: bool,
}

impl ChangeReport {
    /// Number of listings actually changed.
    #[must_use]
    pub fn applied(&self) -> usize {
        self.created.len() + self.updated.len() + self.paused.len()
    }

    #[must_use]
    pub fn outcome(&self) -> Outcome {
        match (self.applied(), self.failed.len()) {
            (0, 0) => Outcome::NoChanges,
            (_, 0) => Outcome::Success,
            (0, _) => Outcome::TotalFailure,
            _ => Outcome::PartialFailure,
        }
    }

    #[must_use]
    pub fn subject(&self) -> String {
        let base = match self.outcome() {
            Outcome::NoChanges => "Shopify sync: no changes".to_owned(),
            Outcome::Success => format!("Shopify sync OK: {} changed", self.applied()),
            Outcome::PartialFailure => format!(
                "Shopify sync: {} changed, {} failed",
                self.applied(),
                self.failed.len()
            ),
            Outcome::TotalFailure => {
                format!("Shopify sync FAILED: {} errors", self.failed.len())
            }
        };
        if self.dry_run {
            format!("[dry run] {base}")
        } else {
            base
        }
    }

    fn sections(&self) -> Vec<Section<'_>> {
        [
            ("Created (draft)", &self.created, "No products were created."),
            ("Updated", &self.updated, "No products were updated."),
            ("Paused (stock 0)", &self.paused, "No products were paused."),
            ("Failed", &self.failed, "No failures."),
        ]
        .into_iter()
        .map(|(heading, entries, empty)| Section {
            heading,
            entries: entries.iter().collect(),
            empty,
        })
        .collect()
    }

    /// Plain-text body, also printed for dry runs.
    ///
    /// # Errors
    ///
    /// Template rendering errors.
    pub fn render_text(&self) -> Result<String, askama::Error> {
        ReportText {
            subject: &self.subject(),
            sections: self.sections(),
            unchanged: self.unchanged,
            skipped: self.skipped,
        }
        .render()
    }

    /// HTML body of the report email. Entry fields are escaped.
    ///
    /// # Errors
    ///
    /// Template rendering errors.
    pub fn render_html(&self) -> Result<String, askama::Error> {
        ReportHtml {
            subject: &self.subject(),
            sections: self.sections(),
            unchanged: self.unchanged,
            skipped: self.skipped,
        }
        .render()
    }
}

struct Section<'a> {
    heading: &'static str,
    entries: Vec<&'a ReportEntry>,
    empty: &'static str,
}

#[derive(Template)]
#[template(path = "report.txt")]
struct ReportText<'a> {
    subject: &'a str,
    sections: Vec<Section<'a>>,
    unchanged: usize,
    skipped: usize,
}

#[derive(Template)]
#[template(path = "report.html")]
struct ReportHtml<'a> {
    subject: &'a str,
    sections: Vec<Section<'a>>,
    unchanged: usize,
    skipped: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str) -> ReportEntry {
        ReportEntry::new(id, "Mouse <Pro>", "Price: 10 → 12".to_owned())
    }

    #[test]
    fn outcome_covers_all_combinations() {
        let mut report = ChangeReport::default();
        assert_eq!(report.outcome(), Outcome::NoChanges);

        report.failed.push(entry("1"));
        assert_eq!(report.outcome(), Outcome::TotalFailure);

        report.updated.push(entry("2"));
        assert_eq!(report.outcome(), Outcome::PartialFailure);

        report.failed.clear();
        assert_eq!(report.outcome(), Outcome::Success);
    }

    #[test]
    fn unchanged_rows_alone_mean_no_changes() {
        let report = ChangeReport {
            unchanged: 12,
            skipped: 3,
            ..ChangeReport::default()
        };
        assert_eq!(report.outcome(), Outcome::NoChanges);
        assert_eq!(report.subject(), "Shopify sync: no changes");
    }

    #[test]
    fn subject_marks_dry_runs() {
        let report = ChangeReport {
            paused: vec![entry("3")],
            dry_run: true,
            ..ChangeReport::default()
        };
        assert_eq!(report.subject(), "[dry run] Shopify sync OK: 1 changed");
    }

    #[test]
    fn html_escapes_titles() {
        let report = ChangeReport {
            updated: vec![entry("2")],
            ..ChangeReport::default()
        };
        let html = report.render_html().unwrap();
        assert!(html.contains("Mouse &lt;Pro&gt; (ID: 2)"));
        assert!(html.contains("<p>No products were paused.</p>"));
    }

    #[test]
    fn text_lists_entries_under_headings() {
        let report = ChangeReport {
            failed: vec![entry("9")],
            ..ChangeReport::default()
        };
        let text = report.render_text().unwrap();
        assert!(text.starts_with("Shopify sync FAILED: 1 errors"));
        assert!(text.contains("Failed:\n  - Mouse <Pro> (ID: 9) - Price: 10 → 12"));
    }

    #[test]
    fn text_shows_placeholder_for_empty_sections() {
        let text = ChangeReport::default().render_text().unwrap();
        assert!(text.contains("Created (draft):\n  No products were created."));
        assert!(text.contains("Unchanged: 0, skipped: 0"));
    }

    #[test]
    fn html_escapes_quotes_and_ampersands() {
        let report = ChangeReport {
            created: vec![ReportEntry::new(
                "4",
                "Cable \"USB-C\" & adapter",
                "created".to_owned(),
            )],
            ..ChangeReport::default()
        };
        let html = report.render_html().unwrap();
        assert!(html.contains("&amp; adapter"));
        assert!(!html.contains("\"USB-C\""));
    }
}
