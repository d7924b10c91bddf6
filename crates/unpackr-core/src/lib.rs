//! Concurrent RAR and ZIP extraction.
//!
//! `unpackr-core` extracts archives on a pool of worker threads. Every job
//! goes through the same pipeline:
//!
//! - the format is detected from the file signature, then the extension
//! - each candidate password is tried in order, ending with no password
//! - entry names are sanitized so nothing lands outside the output directory
//! - known benign decoder faults (truncated volume sets, a bad checksum on
//!   the last entry) end the job successfully with what was extracted
//!
//! # Examples
//!
//! ```no_run
//! use unpackr_core::ExtractionJob;
//! use unpackr_core::Queue;
//! use unpackr_core::QueueConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let queue = Queue::start_new(QueueConfig::default().with_parallel(4))?;
//! let job = ExtractionJob::new("/downloads/show.part01.rar", "/media/show")
//!     .passwords(["first-guess", "second-guess"]);
//! let result = queue.submit(job)?.wait()?;
//! let report = result.into_result()?;
//! println!("Extracted {} files", report.files_extracted());
//! queue.stop();
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod copy;
pub mod error;
pub mod extraction;
pub mod formats;
pub mod job;
pub mod logger;
pub mod password;
pub mod queue;
pub mod report;
pub mod security;
pub mod types;

#[doc(hidden)]
pub mod test_utils;

// Re-export main API types
pub use api::extract_archive;
pub use api::extract_with_format;
pub use api::run_job;
pub use config::QueueCapacity;
pub use config::QueueConfig;
pub use error::ExtractionError;
pub use error::Result;
pub use formats::ArchiveType;
pub use job::ExtractionJob;
pub use logger::Logger;
pub use logger::NoopLogger;
pub use logger::TracingLogger;
pub use queue::JobHandle;
pub use queue::Queue;
pub use report::ExtractionReport;
pub use report::ExtractionResult;
pub use report::PasswordUsed;
