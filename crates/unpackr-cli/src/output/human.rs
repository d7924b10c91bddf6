//! Human-readable output formatter with colors and styling.

use super::formatter::OutputFormatter;
use crate::progress::humanize_bytes;
use anyhow::Result;
use console::Term;
use console::style;
use unpackr_core::ExtractionReport;
use unpackr_core::ExtractionResult;

pub struct HumanFormatter {
    verbose: bool,
    quiet: bool,
    use_colors: bool,
    term: Term,
}

impl HumanFormatter {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            use_colors: console::colors_enabled(),
            term: Term::stdout(),
        }
    }

    fn format_number(n: usize) -> String {
        let s = n.to_string();
        let mut result = String::new();
        let mut count = 0;

        for c in s.chars().rev() {
            if count == 3 {
                result.push(',');
                count = 0;
            }
            result.push(c);
            count += 1;
        }

        result.chars().rev().collect()
    }

    fn headline(&self, result: &ExtractionResult) -> String {
        let archive = result.job.source.display();
        match (&result.error, self.use_colors) {
            (None, true) => format!("{} {archive}", style("✓").green().bold()),
            (None, false) => format!("OK {archive}"),
            (Some(error), true) => format!("{} {archive}: {error}", style("✗").red().bold()),
            (Some(error), false) => format!("FAILED {archive}: {error}"),
        }
    }

    fn details(&self, report: &ExtractionReport) -> Vec<String> {
        let mut lines = vec![
            format!("  Files extracted: {}", Self::format_number(report.files_extracted())),
            format!("  Total size: {}", humanize_bytes(report.bytes_written)),
        ];

        if let Some(password) = report.password {
            lines.push(format!("  Opened with {password}"));
        }
        if report.truncated {
            lines.push("  Stopped early on a truncated or damaged volume set".to_string());
        }

        if self.verbose {
            if let Some(format) = report.format {
                lines.push(format!("  Format: {format}"));
            }
            lines.push(format!("  Directories: {}", report.directories_created));
            lines.push(format!("  Skipped entries: {}", report.entries_skipped));
            lines.push(format!("  Volumes: {}", report.volumes.len()));
            lines.push(format!("  Duration: {:?}", report.duration));
        }

        lines
    }

    fn warnings(&self, report: &ExtractionReport) -> Vec<String> {
        report
            .warnings
            .iter()
            .map(|warning| {
                if self.use_colors {
                    format!("  {} {warning}", style("⚠").yellow().bold())
                } else {
                    format!("  WARNING: {warning}")
                }
            })
            .collect()
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_extraction_results(&self, results: &[ExtractionResult]) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        for result in results {
            let _ = self.term.write_line(&self.headline(result));
            if result.is_success() {
                for line in self.details(&result.report) {
                    let _ = self.term.write_line(&line);
                }
            }
            for line in self.warnings(&result.report) {
                let _ = self.term.write_line(&line);
            }
        }

        if results.len() > 1 {
            let succeeded = results.iter().filter(|r| r.is_success()).count();
            let _ = self.term.write_line(&format!(
                "Extraction complete: {succeeded} of {} archives",
                results.len()
            ));
        } else if results.iter().all(ExtractionResult::is_success) {
            let _ = self.term.write_line("Extraction complete");
        }

        Ok(())
    }
}
