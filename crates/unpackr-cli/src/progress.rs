//! Progress bar for queued extractions.

use console::Term;
use indicatif::ProgressBar;
use indicatif::ProgressState;
use indicatif::ProgressStyle;
use std::fmt::Write;
use unpackr_core::ExtractionResult;

/// Progress bar counting finished archives.
///
/// Shown only when stdout is a TTY. Automatically cleans up on drop.
pub struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    /// Creates a progress bar over `total` archives.
    #[must_use]
    pub fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);

        // Template: "Extracting [████████░░░░] 3/8 archives (12s) show.part01.rar: 1.2 GB"
        bar.set_style(
            ProgressStyle::default_bar()
                .template("Extracting [{bar:40.cyan/blue}] {pos}/{len} archives ({elapsed}) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .with_key("elapsed", |state: &ProgressState, w: &mut dyn Write| {
                    write!(w, "{}", humanize_duration(state.elapsed())).unwrap_or(());
                })
                .progress_chars("█▓░"),
        );

        Self { bar }
    }

    /// Checks if we should show progress (TTY detection).
    #[must_use]
    pub fn should_show() -> bool {
        Term::stdout().is_term()
    }

    /// Advances the bar by one finished archive.
    pub fn job_finished(&self, result: &ExtractionResult) {
        self.bar.set_message(status_line(result));
        self.bar.inc(1);
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

fn status_line(result: &ExtractionResult) -> String {
    let name = result
        .job
        .source
        .file_name()
        .map_or_else(|| result.job.source.display().to_string(), |n| n.to_string_lossy().into_owned());
    if result.is_success() {
        format!("{name}: {}", humanize_bytes(result.report.bytes_written))
    } else {
        format!("{name}: failed")
    }
}

/// Converts bytes to human-readable format (KB, MB, GB, TB).
pub fn humanize_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.1} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// Converts duration to human-readable format.
fn humanize_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        format!("{}h{}m", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}m{}s", secs / 60, secs % 60)
    } else {
        format!("{secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use unpackr_core::ExtractionError;
    use unpackr_core::ExtractionJob;
    use unpackr_core::ExtractionReport;

    #[test]
    fn test_humanize_bytes() {
        assert_eq!(humanize_bytes(0), "0 B");
        assert_eq!(humanize_bytes(1536), "1.5 KB");
        assert_eq!(humanize_bytes(1024 * 1024), "1.0 MB");
        assert_eq!(humanize_bytes(1024_u64.pow(4)), "1.0 TB");
    }

    #[test]
    fn test_humanize_duration() {
        assert_eq!(humanize_duration(std::time::Duration::from_secs(30)), "30s");
        assert_eq!(
            humanize_duration(std::time::Duration::from_secs(3661)),
            "1h1m"
        );
    }

    #[test]
    fn test_job_finished_advances() {
        let progress = CliProgress::new(2);
        let mut report = ExtractionReport::new();
        report.bytes_written = 2048;
        let result = ExtractionResult {
            job: ExtractionJob::new("/downloads/a.rar", "out"),
            report,
            error: None,
        };

        progress.job_finished(&result);
        assert_eq!(progress.bar.position(), 1);
        assert_eq!(status_line(&result), "a.rar: 2.0 KB");
    }

    #[test]
    fn test_status_line_failure() {
        let result = ExtractionResult {
            job: ExtractionJob::new("b.zip", "out"),
            report: ExtractionReport::new(),
            error: Some(ExtractionError::QueueStopped),
        };
        assert_eq!(status_line(&result), "b.zip: failed");
    }
}
