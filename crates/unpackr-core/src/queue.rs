//! Bounded worker pool running extraction jobs.
//!
//! Jobs flow through a `crossbeam-channel` sized from
//! [`QueueCapacity`](crate::QueueCapacity). A bound counts the jobs workers
//! are running as well as the ones waiting, so with one worker and a bound
//! of one, `submit` blocks until the running job is done. Each worker owns a
//! receiver clone and runs jobs one at a time until the channel is closed by
//! [`Queue::stop`].
//!
//! # Examples
//!
//! ```no_run
//! use unpackr_core::ExtractionJob;
//! use unpackr_core::Queue;
//! use unpackr_core::QueueConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let queue = Queue::start_new(QueueConfig::default().with_parallel(2))?;
//! let handle = queue.submit(ExtractionJob::new("/downloads/a.rar", "/media/a"))?;
//! let result = handle.wait()?;
//! println!("{}: {:?}", result.job.source.display(), result.error);
//! queue.stop();
//! # Ok(())
//! # }
//! ```

use std::io;
use std::panic;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::Receiver;
use crossbeam_channel::Sender;
use parking_lot::Mutex;

use crate::ExtractionError;
use crate::ExtractionJob;
use crate::ExtractionResult;
use crate::QueueConfig;
use crate::Result;
use crate::api::panic_message;
use crate::api::run_job;
use crate::logger::Logger;

type Callback = Box<dyn FnOnce(ExtractionResult) + Send>;

struct Envelope {
    job: ExtractionJob,
    sink: Callback,
}

struct Running {
    sender: Sender<Envelope>,
    workers: Vec<JoinHandle<()>>,
}

/// Pool of worker threads extracting submitted jobs.
///
/// A queue is created stopped. [`start`](Self::start) spawns the workers,
/// [`stop`](Self::stop) drains the remaining jobs and joins them. A stopped
/// queue can be started again. Dropping a running queue stops it.
pub struct Queue {
    config: Option<Arc<QueueConfig>>,
    state: Mutex<Option<Running>>,
    // Held by `start` and `stop` for their whole run, so a pool is fully
    // joined before the next one spawns.
    lifecycle: Mutex<()>,
    active: Arc<AtomicUsize>,
}

impl Default for Queue {
    /// Creates a queue without configuration; `start` fails with
    /// `NoConfig`.
    fn default() -> Self {
        Self {
            config: None,
            state: Mutex::new(None),
            lifecycle: Mutex::new(()),
            active: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl std::fmt::Debug for Queue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Queue")
            .field("config", &self.config)
            .field("running", &self.is_running())
            .field("active_workers", &self.active_workers())
            .finish()
    }
}

impl Queue {
    /// Creates a stopped queue. Out-of-range settings are normalized.
    #[must_use]
    pub fn new(config: QueueConfig) -> Self {
        Self {
            config: Some(Arc::new(config.normalized())),
            state: Mutex::new(None),
            lifecycle: Mutex::new(()),
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Creates and starts a queue.
    ///
    /// # Errors
    ///
    /// See [`start`](Self::start).
    pub fn start_new(config: QueueConfig) -> Result<Self> {
        let queue = Self::new(config);
        queue.start()?;
        Ok(queue)
    }

    /// Spawns the worker threads.
    ///
    /// # Errors
    ///
    /// Checked in this order:
    /// - `QueueRunning` if the queue is already started
    /// - `NoConfig` if the queue has no configuration
    /// - `NoLogger` if the configuration has no logger
    /// - `Io` if a worker thread cannot be spawned
    ///
    /// Waits for a concurrent [`stop`](Self::stop) to finish joining the
    /// previous workers.
    pub fn start(&self) -> Result<()> {
        let _lifecycle = self.lifecycle.lock();
        let mut state = self.state.lock();
        if state.is_some() {
            return Err(ExtractionError::QueueRunning);
        }
        let config = self.config.as_ref().ok_or(ExtractionError::NoConfig)?;
        let logger = config.logger.clone().ok_or(ExtractionError::NoLogger)?;

        let (sender, receiver) = match config.capacity.waiting_slots(config.parallel) {
            Some(slots) => crossbeam_channel::bounded(slots),
            None => crossbeam_channel::unbounded(),
        };

        let mut workers = Vec::with_capacity(config.parallel);
        for id in 0..config.parallel {
            let spawned = self.spawn_worker(id, receiver.clone(), Arc::clone(config), Arc::clone(&logger));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    drop(sender);
                    for handle in workers {
                        let _ = handle.join();
                    }
                    return Err(ExtractionError::Io(e));
                }
            }
        }

        logger.info(&format!(
            "extraction queue started: {} workers, capacity {:?}",
            config.parallel, config.capacity
        ));
        *state = Some(Running { sender, workers });
        Ok(())
    }

    fn spawn_worker(
        &self,
        id: usize,
        receiver: Receiver<Envelope>,
        config: Arc<QueueConfig>,
        logger: Arc<dyn Logger>,
    ) -> io::Result<JoinHandle<()>> {
        self.active.fetch_add(1, Ordering::SeqCst);
        let guard = ActiveGuard(Arc::clone(&self.active));

        thread::Builder::new()
            .name(format!("unpackr-worker-{id}"))
            .spawn(move || {
                let _guard = guard;
                worker_loop(id, &receiver, &config, logger.as_ref());
            })
    }

    /// Closes the queue and waits for the workers to finish.
    ///
    /// Jobs already submitted are still extracted. Does nothing if the
    /// queue is not running. Submissions fail with `QueueStopped` as soon as
    /// the call begins.
    pub fn stop(&self) {
        let _lifecycle = self.lifecycle.lock();
        let Some(Running { sender, workers }) = self.state.lock().take() else {
            return;
        };
        drop(sender);

        for handle in workers {
            if handle.join().is_err() {
                tracing::warn!("extraction worker exited abnormally");
            }
        }
        if let Some(logger) = self.config.as_ref().and_then(|c| c.logger.as_ref()) {
            logger.info("extraction queue stopped");
        }
    }

    /// Returns `true` between `start` and `stop`.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state.lock().is_some()
    }

    /// Returns the number of live worker threads.
    #[must_use]
    pub fn active_workers(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Returns the number of jobs waiting for a worker.
    #[must_use]
    pub fn pending_jobs(&self) -> usize {
        self.state
            .lock()
            .as_ref()
            .map_or(0, |running| running.sender.len())
    }

    /// Submits a job and returns a handle to its result.
    ///
    /// Blocks while the queue is full.
    ///
    /// # Errors
    ///
    /// Returns `QueueStopped` if the queue is not running.
    pub fn submit(&self, job: ExtractionJob) -> Result<JobHandle> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.submit_with_callback(job, move |result| {
            let _ = tx.send(result);
        })?;
        Ok(JobHandle { receiver: rx })
    }

    /// Submits a job whose result is handed to `callback` on the worker
    /// thread.
    ///
    /// A panicking callback is logged and does not take the worker down.
    /// Blocks while the queue is full.
    ///
    /// # Errors
    ///
    /// Returns `QueueStopped` if the queue is not running.
    pub fn submit_with_callback<F>(&self, job: ExtractionJob, callback: F) -> Result<()>
    where
        F: FnOnce(ExtractionResult) + Send + 'static,
    {
        let sender = self
            .state
            .lock()
            .as_ref()
            .map(|running| running.sender.clone())
            .ok_or(ExtractionError::QueueStopped)?;

        sender
            .send(Envelope {
                job,
                sink: Box::new(callback),
            })
            .map_err(|_| ExtractionError::QueueStopped)
    }
}

impl Drop for Queue {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(id: usize, receiver: &Receiver<Envelope>, config: &QueueConfig, logger: &dyn Logger) {
    logger.debug(&format!("worker {id} started"));

    for Envelope { job, sink } in receiver.iter() {
        let result = run_job(job, config, logger);
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| sink(result))) {
            logger.info(&format!(
                "worker {id}: result callback panicked: {}",
                panic_message(payload.as_ref())
            ));
        }
    }

    logger.debug(&format!("worker {id} exiting"));
}

struct ActiveGuard(Arc<AtomicUsize>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Handle to the result of a submitted job.
#[derive(Debug)]
pub struct JobHandle {
    receiver: Receiver<ExtractionResult>,
}

impl JobHandle {
    /// Blocks until the job has run.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the worker went away without a result.
    pub fn wait(self) -> Result<ExtractionResult> {
        self.receiver.recv().map_err(|_| ExtractionError::Internal {
            message: "worker dropped the job without a result".to_string(),
        })
    }

    /// Waits at most `timeout` for the result.
    #[must_use]
    pub fn wait_timeout(&self, timeout: Duration) -> Option<ExtractionResult> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// Returns the result if the job has already run.
    #[must_use]
    pub fn try_result(&self) -> Option<ExtractionResult> {
        self.receiver.try_recv().ok()
    }
}
