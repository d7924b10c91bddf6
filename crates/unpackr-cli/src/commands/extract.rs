//! Extract command implementation.

use crate::cli::ExtractArgs;
use crate::error::convert_extraction_error;
use crate::output::OutputFormatter;
use crate::progress::CliProgress;
use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use unpackr_core::ExtractionJob;
use unpackr_core::ExtractionResult;
use unpackr_core::Queue;
use unpackr_core::QueueCapacity;
use unpackr_core::QueueConfig;

pub fn execute(args: &ExtractArgs, formatter: &dyn OutputFormatter, quiet: bool) -> Result<()> {
    let output_dir = match &args.output_dir {
        Some(dir) => dir.clone(),
        None => env::current_dir().context("failed to get current directory")?,
    };

    let queue = Queue::start_new(queue_config(args)).context("failed to start extraction queue")?;

    let progress = (!quiet && CliProgress::should_show())
        .then(|| Arc::new(CliProgress::new(args.archives.len())));

    let jobs = args
        .archives
        .iter()
        .map(|archive| build_job(args, archive.clone(), output_dir.clone()))
        .collect();
    let on_finish = {
        let progress = progress.clone();
        move |result: &ExtractionResult| {
            if let Some(progress) = &progress {
                progress.job_finished(result);
            }
        }
    };
    let results = run_batch(&queue, jobs, on_finish)?;
    queue.stop();
    drop(progress);

    formatter.format_extraction_results(&results)?;
    summarize(results)
}

/// Queues every job and collects the results in submission order.
///
/// `on_finish` runs on the worker thread as each job completes.
fn run_batch<F>(queue: &Queue, jobs: Vec<ExtractionJob>, on_finish: F) -> Result<Vec<ExtractionResult>>
where
    F: Fn(&ExtractionResult) + Send + Sync + 'static,
{
    let total = jobs.len();
    let on_finish = Arc::new(on_finish);
    let (done_tx, done_rx) = crossbeam_channel::unbounded();

    for (index, job) in jobs.into_iter().enumerate() {
        let archive = job.source.clone();
        let done = done_tx.clone();
        let on_finish = Arc::clone(&on_finish);
        queue
            .submit_with_callback(job, move |result| {
                on_finish(&result);
                let _ = done.send((index, result));
            })
            .with_context(|| format!("failed to queue '{}'", archive.display()))?;
    }
    drop(done_tx);

    let mut slots: Vec<Option<ExtractionResult>> = (0..total).map(|_| None).collect();
    for (index, result) in done_rx {
        slots[index] = Some(result);
    }
    slots
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .context("extraction queue dropped a job without a result")
}

fn queue_config(args: &ExtractArgs) -> QueueConfig {
    let mut config = QueueConfig::default()
        .with_parallel(usize::from(args.jobs))
        .with_capacity(QueueCapacity::from_buffer_size(args.buffer_size));
    if let Some(suffix) = &args.suffix {
        config = config.with_suffix(suffix.as_str());
    }
    if let Some(mode) = args.file_mode {
        config = config.with_file_mode(mode);
    }
    if let Some(mode) = args.dir_mode {
        config = config.with_dir_mode(mode);
    }
    config
}

fn build_job(args: &ExtractArgs, archive: PathBuf, output_dir: PathBuf) -> ExtractionJob {
    ExtractionJob::new(archive, output_dir)
        .passwords(args.passwords.iter().cloned())
        .staged(args.staged)
}

/// Turns the batch outcome into the process result.
///
/// A single failure keeps its hint; several failures are reported as a count
/// since each one was already printed by the formatter.
fn summarize(results: Vec<ExtractionResult>) -> Result<()> {
    let total = results.len();
    let mut failures: Vec<_> = results
        .into_iter()
        .filter_map(|result| result.error.map(|error| (result.job.source, error)))
        .collect();

    match failures.len() {
        0 => Ok(()),
        1 if total == 1 => {
            let (archive, error) = failures.remove(0);
            Err(convert_extraction_error(error, &archive))
        }
        failed => bail!("{failed} of {total} archives failed to extract"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use crate::cli::Commands;
    use clap::Parser;
    use unpackr_core::ExtractionError;
    use unpackr_core::ExtractionReport;

    fn parse(args: &[&str]) -> ExtractArgs {
        let Commands::Extract(args) = Cli::try_parse_from(args).unwrap().command;
        args
    }

    fn failed(source: &str) -> ExtractionResult {
        ExtractionResult {
            job: ExtractionJob::new(source, "out"),
            report: ExtractionReport::new(),
            error: Some(ExtractionError::NoCompressedFiles {
                path: PathBuf::from(source),
            }),
        }
    }

    #[test]
    fn test_queue_config_from_args() {
        let args = parse(&[
            "unpackr", "extract", "a.rar", "-j", "3", "--buffer-size", "0", "--staged",
            "--suffix", "_tmp", "--file-mode", "600",
        ]);
        let config = queue_config(&args);
        assert_eq!(config.parallel, 3);
        assert_eq!(config.capacity, QueueCapacity::Unbounded);
        assert_eq!(config.suffix, "_tmp");
        assert_eq!(config.file_mode, 0o600);
        assert_eq!(config.dir_mode, 0o755);
    }

    #[test]
    fn test_build_job_carries_passwords() {
        let args = parse(&["unpackr", "extract", "a.rar", "-p", "x", "-p", "y", "--staged"]);
        let job = build_job(&args, PathBuf::from("a.rar"), PathBuf::from("out"));
        assert_eq!(job.password_candidates(), vec![Some("x"), Some("y"), None]);
        assert!(job.staged);
    }

    #[test]
    fn test_run_batch_reports_on_worker_and_keeps_order() {
        use std::sync::Mutex;
        use unpackr_core::NoopLogger;

        let temp = tempfile::TempDir::new().unwrap();
        let queue = Queue::start_new(
            QueueConfig::default()
                .with_logger(Arc::new(NoopLogger))
                .with_parallel(2),
        )
        .unwrap();
        let jobs: Vec<_> = ["a.zip", "b.zip", "c.zip"]
            .iter()
            .map(|name| ExtractionJob::new(temp.path().join(name), temp.path().join("out")))
            .collect();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let record = Arc::clone(&seen);
        let results = run_batch(&queue, jobs, move |result| {
            let worker = std::thread::current().name().unwrap_or_default().to_string();
            record.lock().unwrap().push((result.job.source.clone(), worker));
        })
        .unwrap();
        queue.stop();

        let sources: Vec<_> = results.iter().map(|r| r.job.source.clone()).collect();
        assert_eq!(
            sources,
            vec![temp.path().join("a.zip"), temp.path().join("b.zip"), temp.path().join("c.zip")]
        );
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|(_, worker)| worker.starts_with("unpackr-worker-")));
    }

    #[test]
    fn test_run_batch_on_stopped_queue() {
        let queue = Queue::new(QueueConfig::default());
        let jobs = vec![ExtractionJob::new("a.zip", "out")];
        let err = run_batch(&queue, jobs, |_| {}).unwrap_err();
        assert!(err.to_string().contains("failed to queue 'a.zip'"));
    }

    #[test]
    fn test_summarize_single_failure_keeps_hint() {
        let err = summarize(vec![failed("empty.zip")]).unwrap_err();
        assert!(format!("{err:?}").contains("empty.zip"));
    }

    #[test]
    fn test_summarize_counts_failures() {
        let ok = ExtractionResult {
            job: ExtractionJob::new("ok.zip", "out"),
            report: ExtractionReport::new(),
            error: None,
        };
        let err = summarize(vec![ok, failed("a.rar"), failed("b.rar")]).unwrap_err();
        assert_eq!(err.to_string(), "2 of 3 archives failed to extract");
    }
}
