//! High-level public API for archive extraction.
//!
//! [`run_job`] is the unit of work a queue worker executes. It never
//! panics and never returns early: whatever happens, the caller gets an
//! [`ExtractionResult`] carrying the job, the (possibly partial) report and
//! the error.

use std::any::Any;
use std::panic;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use crate::ExtractionError;
use crate::ExtractionJob;
use crate::ExtractionReport;
use crate::ExtractionResult;
use crate::QueueConfig;
use crate::Result;
use crate::extraction::ArchiveExtractor;
use crate::extraction::create_dir_all;
use crate::extraction::staged_extract;
use crate::formats::ArchiveFormat;
use crate::formats::detect_format;
use crate::formats::handler_for;
use crate::logger::Logger;
use crate::logger::TracingLogger;
use crate::password::PasswordNegotiator;
use crate::security::sanitize_mode;
use crate::types::OutputDir;

/// Extracts one archive synchronously, outside any queue.
///
/// Uses the logger from `config`, or [`TracingLogger`] when it has none.
///
/// # Examples
///
/// ```no_run
/// use unpackr_core::ExtractionJob;
/// use unpackr_core::QueueConfig;
/// use unpackr_core::extract_archive;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let job = ExtractionJob::new("/downloads/show.part01.rar", "/media/show")
///     .passwords(["secret"]);
/// let report = extract_archive(job, &QueueConfig::default()).into_result()?;
/// println!("extracted {} files ({} bytes)", report.files.len(), report.bytes_written);
/// # Ok(())
/// # }
/// ```
#[must_use]
pub fn extract_archive(job: ExtractionJob, config: &QueueConfig) -> ExtractionResult {
    match config.logger.as_deref() {
        Some(logger) => run_job(job, config, logger),
        None => run_job(job, config, &TracingLogger),
    }
}

/// Runs one job to completion, converting panics into
/// `ExtractionError::Internal`.
#[must_use]
pub fn run_job(job: ExtractionJob, config: &QueueConfig, logger: &dyn Logger) -> ExtractionResult {
    run_guarded(job, logger, |job, report| {
        execute(job, config, logger, report)
    })
}

/// Runs `work` behind a panic boundary and packs the outcome.
pub(crate) fn run_guarded<F>(job: ExtractionJob, logger: &dyn Logger, work: F) -> ExtractionResult
where
    F: FnOnce(&ExtractionJob, &mut ExtractionReport) -> Result<()>,
{
    let started = Instant::now();
    let mut report = ExtractionReport::new();

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| work(&job, &mut report)))
        .unwrap_or_else(|payload| {
            let message = panic_message(payload.as_ref());
            logger.info(&format!(
                "{}: extraction panicked: {message}",
                job.source.display()
            ));
            Err(ExtractionError::Internal { message })
        });

    report.duration = started.elapsed();
    match &outcome {
        Ok(()) => logger.info(&format!(
            "{}: extracted {} files ({} bytes) in {:?}",
            job.source.display(),
            report.files.len(),
            report.bytes_written,
            report.duration
        )),
        Err(e) => logger.info(&format!("{}: extraction failed: {e}", job.source.display())),
    }

    ExtractionResult {
        job,
        report,
        error: outcome.err(),
    }
}

fn execute(
    job: &ExtractionJob,
    config: &QueueConfig,
    logger: &dyn Logger,
    report: &mut ExtractionReport,
) -> Result<()> {
    let kind = detect_format(&job.source)?;
    report.format = Some(kind);
    logger.debug(&format!(
        "{}: detected {kind} archive",
        job.source.display()
    ));

    extract_with_format(handler_for(kind), job, config, logger, report)
}

/// Extracts `job` with an explicit format handler, skipping detection.
///
/// # Errors
///
/// Returns the error of the last password attempt, or an I/O error if the
/// output directory cannot be prepared.
pub fn extract_with_format(
    format: &dyn ArchiveFormat,
    job: &ExtractionJob,
    config: &QueueConfig,
    logger: &dyn Logger,
    report: &mut ExtractionReport,
) -> Result<()> {
    let output_dir = OutputDir::new(&job.output_dir)?;
    let file_mode = job.file_mode.unwrap_or(config.file_mode);
    let dir_mode = sanitize_mode(job.dir_mode.unwrap_or(config.dir_mode), true);

    let negotiate = |target: &OutputDir, report: &mut ExtractionReport| {
        let extractor = ArchiveExtractor::new(&job.source, target.clone(), logger)
            .with_modes(file_mode, dir_mode);
        PasswordNegotiator::new(format, &extractor, logger).extract(job, report)
    };

    if job.staged {
        staged_extract(&output_dir, &config.suffix, dir_mode, report, negotiate)
    } else {
        create_dir_all(output_dir.as_path(), dir_mode)?;
        negotiate(&output_dir, report)
    }
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::formats::ArchiveType;
    use crate::logger::NoopLogger;
    use crate::test_utils::ScriptedEntry;
    use crate::test_utils::ScriptedFormat;
    use crate::test_utils::zip_archive;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_run_job_zip() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("a.zip");
        zip_archive(&archive, &[("x/y.txt", b"why")]);
        let out = temp.path().join("out");

        let result = run_job(
            ExtractionJob::new(&archive, &out),
            &QueueConfig::default(),
            &NoopLogger,
        );

        assert!(result.is_success(), "{:?}", result.error);
        assert_eq!(result.report.format, Some(ArchiveType::Zip));
        assert_eq!(result.report.files, vec![out.join("x/y.txt")]);
        assert_eq!(result.job.source, archive);
    }

    #[test]
    fn test_run_job_unknown_type() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("notes.txt");
        fs::write(&archive, b"hello").unwrap();

        let result = run_job(
            ExtractionJob::new(&archive, temp.path().join("out")),
            &QueueConfig::default(),
            &NoopLogger,
        );
        assert!(matches!(
            result.error,
            Some(ExtractionError::UnknownArchiveType { .. })
        ));
    }

    #[test]
    fn test_run_job_missing_archive() {
        let temp = TempDir::new().unwrap();
        let result = run_job(
            ExtractionJob::new(temp.path().join("gone.rar"), temp.path()),
            &QueueConfig::default(),
            &NoopLogger,
        );
        assert!(matches!(result.error, Some(ExtractionError::Io(_))));
    }

    #[test]
    fn test_panic_becomes_internal_error() {
        let job = ExtractionJob::new("a.zip", "/out");
        let result = run_guarded(job, &NoopLogger, |_, _| panic!("decoder exploded"));

        match result.error {
            Some(ExtractionError::Internal { message }) => {
                assert_eq!(message, "decoder exploded");
            }
            other => panic!("expected Internal, got {other:?}"),
        }
        assert_eq!(result.job.source, std::path::PathBuf::from("a.zip"));
    }

    #[test]
    fn test_panic_message_variants() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(owned.as_ref()), "owned");
        let other: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(other.as_ref()), "unknown panic");
    }

    #[test]
    fn test_extract_with_format_staged() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("out");
        let format = ScriptedFormat::new(vec![ScriptedEntry::file("dir/f.txt", b"data")]);
        let job = ExtractionJob::new("staged.rar", &out).staged(true);
        let mut report = ExtractionReport::new();

        extract_with_format(
            &format,
            &job,
            &QueueConfig::default(),
            &NoopLogger,
            &mut report,
        )
        .unwrap();

        assert_eq!(report.files, vec![out.join("dir/f.txt")]);
        assert_eq!(fs::read(out.join("dir/f.txt")).unwrap(), b"data");
        let siblings: Vec<_> = fs::read_dir(temp.path()).unwrap().collect();
        assert_eq!(siblings.len(), 1);
    }

    #[test]
    fn test_extract_archive_without_logger_falls_back() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("a.zip");
        zip_archive(&archive, &[("f.txt", b"f")]);

        let config = QueueConfig::default().without_logger();
        let result = extract_archive(ExtractionJob::new(&archive, temp.path().join("o")), &config);
        assert!(result.is_success());
    }

    #[test]
    fn test_idempotent_reextraction() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("a.zip");
        zip_archive(&archive, &[("d/", b""), ("d/f.txt", b"same")]);
        let out = temp.path().join("out");
        let job = ExtractionJob::new(&archive, &out);

        let first = run_job(job.clone(), &QueueConfig::default(), &NoopLogger);
        let second = run_job(job, &QueueConfig::default(), &NoopLogger);

        assert!(first.is_success());
        assert!(second.is_success());
        assert_eq!(first.report.files, second.report.files);
        assert_eq!(first.report.bytes_written, second.report.bytes_written);
        assert_eq!(fs::read(out.join("d/f.txt")).unwrap(), b"same");
    }
}
