//! Password trial over candidate passwords.
//!
//! An archive is opened once per candidate, in order: the job's primary
//! password, its extra passwords, then no password at all. The first
//! candidate that extracts cleanly wins.

use crate::ExtractionError;
use crate::ExtractionJob;
use crate::ExtractionReport;
use crate::Result;
use crate::extraction::ArchiveExtractor;
use crate::formats::ArchiveFormat;
use crate::logger::Logger;
use crate::report::PasswordUsed;

/// Runs an extraction once per candidate password.
pub struct PasswordNegotiator<'a> {
    format: &'a dyn ArchiveFormat,
    extractor: &'a ArchiveExtractor<'a>,
    logger: &'a dyn Logger,
}

impl<'a> PasswordNegotiator<'a> {
    /// Creates a negotiator opening archives with `format` and extracting
    /// them with `extractor`.
    #[must_use]
    pub fn new(
        format: &'a dyn ArchiveFormat,
        extractor: &'a ArchiveExtractor<'a>,
        logger: &'a dyn Logger,
    ) -> Self {
        Self {
            format,
            extractor,
            logger,
        }
    }

    /// Extracts `job.source`, trying each candidate password in turn.
    ///
    /// - Success records the winning candidate in `report.password`
    ///   (`None` when no password was needed).
    /// - `IncorrectPassword` moves on to the next candidate.
    /// - Any other failure stops immediately and is wrapped in
    ///   `PasswordAttempt` with the candidate's 1-based position.
    /// - The final attempt without a password is returned as-is.
    ///
    /// `report` only describes the attempt that produced the outcome.
    ///
    /// # Errors
    ///
    /// Returns the outcome of the last attempt made, as described above.
    pub fn extract(&self, job: &ExtractionJob, report: &mut ExtractionReport) -> Result<()> {
        let candidates = job.password_candidates();
        let explicit: Vec<&str> = candidates.iter().filter_map(|c| *c).collect();
        let total = explicit.len();

        for (position, password) in explicit.into_iter().enumerate() {
            let index = position + 1;
            report.reset_progress();

            match self.attempt(job, Some(password), report) {
                Ok(()) => {
                    self.logger.debug(&format!(
                        "{}: opened with password {index} of {total}",
                        job.source.display()
                    ));
                    report.password = Some(PasswordUsed { index, total });
                    return Ok(());
                }
                Err(e) if e.is_incorrect_password() => {
                    self.logger.debug(&format!(
                        "{}: password {index} of {total} rejected",
                        job.source.display()
                    ));
                }
                Err(e) => {
                    return Err(ExtractionError::PasswordAttempt {
                        index,
                        total,
                        source: Box::new(e),
                    });
                }
            }
        }

        report.reset_progress();
        report.password = None;
        self.attempt(job, None, report)
    }

    fn attempt(
        &self,
        job: &ExtractionJob,
        password: Option<&str>,
        report: &mut ExtractionReport,
    ) -> Result<()> {
        let mut decoder = self.format.open(&job.source, password)?;
        self.extractor.extract(decoder.as_mut(), report)
    }
}
