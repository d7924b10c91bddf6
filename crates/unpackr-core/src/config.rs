//! Queue configuration.

use std::sync::Arc;

use crate::logger::Logger;
use crate::logger::TracingLogger;

/// Default number of jobs that can wait in the queue.
pub const DEFAULT_BUFFER_SIZE: usize = 1000;

/// Default suffix for staged extraction directories.
pub const DEFAULT_SUFFIX: &str = "_unpackr";

/// How many submitted jobs the queue holds before `submit` blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueCapacity {
    /// At most `n` jobs in flight, counting the ones workers are running.
    /// `submit` blocks beyond that, and never blocks a submission an idle
    /// worker can take.
    Bounded(usize),
    /// No limit on waiting jobs.
    Unbounded,
    /// No waiting jobs: `submit` blocks until a worker takes the job.
    Rendezvous,
}

impl QueueCapacity {
    /// Maps a signed buffer size onto a capacity.
    ///
    /// `0` means unbounded, a negative value means rendezvous, anything
    /// else is a bound.
    ///
    /// # Examples
    ///
    /// ```
    /// use unpackr_core::QueueCapacity;
    ///
    /// assert_eq!(QueueCapacity::from_buffer_size(0), QueueCapacity::Unbounded);
    /// assert_eq!(QueueCapacity::from_buffer_size(-1), QueueCapacity::Rendezvous);
    /// assert_eq!(QueueCapacity::from_buffer_size(16), QueueCapacity::Bounded(16));
    /// ```
    #[must_use]
    pub fn from_buffer_size(size: i64) -> Self {
        match size {
            0 => Self::Unbounded,
            n if n < 0 => Self::Rendezvous,
            n => usize::try_from(n).map_or(Self::Unbounded, Self::Bounded),
        }
    }

    /// Returns the channel bound for a pool of `parallel` workers, or
    /// `None` for an unbounded channel.
    ///
    /// # Examples
    ///
    /// ```
    /// use unpackr_core::QueueCapacity;
    ///
    /// assert_eq!(QueueCapacity::Bounded(1).waiting_slots(1), Some(0));
    /// assert_eq!(QueueCapacity::Bounded(1000).waiting_slots(4), Some(996));
    /// assert_eq!(QueueCapacity::Unbounded.waiting_slots(4), None);
    /// ```
    #[must_use]
    pub const fn waiting_slots(self, parallel: usize) -> Option<usize> {
        match self {
            Self::Bounded(n) => Some(n.saturating_sub(parallel)),
            Self::Unbounded => None,
            Self::Rendezvous => Some(0),
        }
    }
}

impl Default for QueueCapacity {
    fn default() -> Self {
        Self::Bounded(DEFAULT_BUFFER_SIZE)
    }
}

/// Queue configuration.
///
/// # Examples
///
/// ```
/// use unpackr_core::QueueCapacity;
/// use unpackr_core::QueueConfig;
///
/// let config = QueueConfig::default()
///     .with_parallel(4)
///     .with_capacity(QueueCapacity::Bounded(64))
///     .with_file_mode(0o640);
///
/// assert_eq!(config.parallel, 4);
/// assert!(config.logger.is_some());
/// ```
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Waiting-job capacity.
    pub capacity: QueueCapacity,

    /// Number of worker threads (minimum 1).
    pub parallel: usize,

    /// Default mode for written files.
    pub file_mode: u32,

    /// Default mode for created directories.
    pub dir_mode: u32,

    /// Suffix for staged extraction directories.
    pub suffix: String,

    /// Log sink. `Queue::start` refuses to run without one.
    pub logger: Option<Arc<dyn Logger>>,
}

impl Default for QueueConfig {
    /// Default values:
    /// - `capacity`: `Bounded(1000)`
    /// - `parallel`: 1
    /// - `file_mode`: `0o644`
    /// - `dir_mode`: `0o755`
    /// - `suffix`: `"_unpackr"`
    /// - `logger`: [`TracingLogger`]
    fn default() -> Self {
        Self {
            capacity: QueueCapacity::default(),
            parallel: 1,
            file_mode: 0o644,
            dir_mode: 0o755,
            suffix: DEFAULT_SUFFIX.to_string(),
            logger: Some(Arc::new(TracingLogger)),
        }
    }
}

impl QueueConfig {
    /// Sets the waiting-job capacity.
    #[must_use]
    pub const fn with_capacity(mut self, capacity: QueueCapacity) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the number of workers.
    #[must_use]
    pub const fn with_parallel(mut self, parallel: usize) -> Self {
        self.parallel = parallel;
        self
    }

    /// Sets the default file mode.
    #[must_use]
    pub const fn with_file_mode(mut self, mode: u32) -> Self {
        self.file_mode = mode;
        self
    }

    /// Sets the default directory mode.
    #[must_use]
    pub const fn with_dir_mode(mut self, mode: u32) -> Self {
        self.dir_mode = mode;
        self
    }

    /// Sets the staged extraction suffix.
    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Replaces the logger.
    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Removes the logger.
    #[must_use]
    pub fn without_logger(mut self) -> Self {
        self.logger = None;
        self
    }

    /// Returns a copy with out-of-range values replaced by defaults.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.parallel = self.parallel.max(1);
        if self.suffix.is_empty() {
            self.suffix = DEFAULT_SUFFIX.to_string();
        }
        self
    }
}
