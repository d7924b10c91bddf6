//! Extraction operation reporting.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::ExtractionError;
use crate::ExtractionJob;
use crate::formats::ArchiveType;

/// Report of one archive extraction.
///
/// Filled in while the extraction runs, so it also describes partial
/// progress when the job fails.
#[derive(Debug, Clone, Default)]
pub struct ExtractionReport {
    /// Total bytes written to disk.
    pub bytes_written: u64,

    /// Files written, in archive order.
    pub files: Vec<PathBuf>,

    /// Archive volumes read, in order.
    pub volumes: Vec<PathBuf>,

    /// Detected archive format.
    pub format: Option<ArchiveType>,

    /// Number of directory entries created.
    pub directories_created: usize,

    /// Number of entries skipped by the sanitizer (hidden, `__MACOSX`, root).
    pub entries_skipped: usize,

    /// Non-fatal problems, such as directories that could not be created.
    pub warnings: Vec<String>,

    /// Which candidate password opened the archive, if any.
    pub password: Option<PasswordUsed>,

    /// `true` if extraction stopped early on a benign decoder fault.
    pub truncated: bool,

    /// Duration of the extraction.
    pub duration: Duration,
}

impl ExtractionReport {
    /// Creates a new empty extraction report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a warning message to the report.
    pub fn add_warning(&mut self, message: String) {
        self.warnings.push(message);
    }

    /// Returns the number of files written.
    #[must_use]
    pub fn files_extracted(&self) -> usize {
        self.files.len()
    }

    /// Returns whether any warnings were generated.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Drops everything recorded by a password attempt that did not stick.
    pub(crate) fn reset_progress(&mut self) {
        self.bytes_written = 0;
        self.files.clear();
        self.volumes.clear();
        self.directories_created = 0;
        self.entries_skipped = 0;
        self.warnings.clear();
        self.truncated = false;
    }
}

/// Position of the successful password among the explicit candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordUsed {
    /// 1-based index of the candidate.
    pub index: usize,
    /// Number of explicit candidates.
    pub total: usize,
}

impl fmt::Display for PasswordUsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "password {} of {}", self.index, self.total)
    }
}

/// Outcome of one queued job, delivered exactly once.
#[derive(Debug)]
pub struct ExtractionResult {
    /// The job as submitted.
    pub job: ExtractionJob,
    /// Progress made, complete on success and partial on failure.
    pub report: ExtractionReport,
    /// The failure, if any.
    pub error: Option<ExtractionError>,
}

impl ExtractionResult {
    /// Returns `true` if the job finished without an error.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Converts the result into a standard `Result`, dropping the job.
    ///
    /// # Errors
    ///
    /// Returns the job's error if it failed.
    pub fn into_result(self) -> crate::Result<ExtractionReport> {
        match self.error {
            None => Ok(self.report),
            Some(error) => Err(error),
        }
    }
}
