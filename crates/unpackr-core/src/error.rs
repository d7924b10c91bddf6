//! Error types for the extraction queue and archive extraction.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using `ExtractionError`.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Errors that can occur while queueing or extracting archives.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The queue was started without a configuration.
    #[error("queue has no configuration, construct it with Queue::new")]
    NoConfig,

    /// The queue configuration carries no logger.
    #[error("queue configuration must provide a logger")]
    NoLogger,

    /// `start()` was called on a running queue.
    #[error("queue is running, cannot start")]
    QueueRunning,

    /// A job was submitted to a stopped queue.
    #[error("extractor queue stopped")]
    QueueStopped,

    /// Neither the file signature nor the extension names a known format.
    #[error("unknown archive file type: {path}")]
    UnknownArchiveType {
        /// The archive path.
        path: PathBuf,
    },

    /// The archive opened fine but holds no entries.
    #[error("no compressed files found in {path}")]
    NoCompressedFiles {
        /// The archive path.
        path: PathBuf,
    },

    /// An entry resolved outside the output directory.
    #[error("archived file contains invalid path: {path} (from: {entry})")]
    InvalidPath {
        /// The computed output path.
        path: PathBuf,
        /// The entry name as stored in the archive.
        entry: String,
    },

    /// An entry header could not be turned into a path.
    #[error("archived file contains invalid header: {archive}")]
    InvalidHead {
        /// The archive path.
        archive: PathBuf,
    },

    /// The decoder rejected the password (or one was required).
    #[error("incorrect or missing password for {archive}")]
    IncorrectPassword {
        /// The archive path.
        archive: PathBuf,
    },

    /// A non-password failure while a specific candidate password was in use.
    #[error("used password {index} of {total}: {source}")]
    PasswordAttempt {
        /// 1-based index of the candidate.
        index: usize,
        /// Number of explicit candidates.
        total: usize,
        /// The underlying failure.
        #[source]
        source: Box<ExtractionError>,
    },

    /// Fatal decoder fault, tagged with the last known archive volume.
    #[error("{volume}: {message}")]
    Decoder {
        /// The last volume the decoder reported.
        volume: PathBuf,
        /// Decoder message.
        message: String,
    },

    /// A panic was caught at the job boundary.
    #[error("internal extraction fault: {message}")]
    Internal {
        /// Panic payload, when it was a string.
        message: String,
    },
}

impl ExtractionError {
    /// Returns `true` if this error rejected adversarial archive content.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::path::PathBuf;
    /// use unpackr_core::ExtractionError;
    ///
    /// let err = ExtractionError::InvalidPath {
    ///     path: PathBuf::from("/etc/passwd"),
    ///     entry: "../../etc/passwd".into(),
    /// };
    /// assert!(err.is_security_violation());
    /// assert!(!ExtractionError::QueueStopped.is_security_violation());
    /// ```
    #[must_use]
    pub fn is_security_violation(&self) -> bool {
        match self {
            Self::InvalidPath { .. } | Self::InvalidHead { .. } => true,
            Self::PasswordAttempt { source, .. } => source.is_security_violation(),
            _ => false,
        }
    }

    /// Returns `true` for errors raised by queue lifecycle misuse.
    #[must_use]
    pub const fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::NoConfig | Self::NoLogger | Self::QueueRunning | Self::QueueStopped
        )
    }

    /// Returns `true` if the decoder reported a wrong or missing password.
    ///
    /// Only the direct variant counts; a `PasswordAttempt` wraps a
    /// different failure by construction.
    #[must_use]
    pub const fn is_incorrect_password(&self) -> bool {
        matches!(self, Self::IncorrectPassword { .. })
    }

    /// Returns a context string for this error, if available.
    ///
    /// # Examples
    ///
    /// ```
    /// use unpackr_core::ExtractionError;
    ///
    /// let err = ExtractionError::Internal { message: "boom".into() };
    /// assert_eq!(err.context(), Some("boom"));
    /// assert_eq!(ExtractionError::NoConfig.context(), None);
    /// ```
    #[must_use]
    pub fn context(&self) -> Option<&str> {
        match self {
            Self::Decoder { message, .. } | Self::Internal { message } => Some(message),
            Self::InvalidPath { entry, .. } => Some(entry),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            ExtractionError::QueueStopped.to_string(),
            "extractor queue stopped"
        );
        assert_eq!(
            ExtractionError::QueueRunning.to_string(),
            "queue is running, cannot start"
        );
    }

    #[test]
    fn test_invalid_path_display() {
        let err = ExtractionError::InvalidPath {
            path: PathBuf::from("/etc/passwd"),
            entry: "../../etc/passwd".into(),
        };
        let display = err.to_string();
        assert!(display.contains("invalid path"));
        assert!(display.contains("/etc/passwd"));
        assert!(display.contains("../../etc/passwd"));
    }

    #[test]
    fn test_password_attempt_display() {
        let err = ExtractionError::PasswordAttempt {
            index: 2,
            total: 3,
            source: Box::new(ExtractionError::Decoder {
                volume: PathBuf::from("movie.part2.rar"),
                message: "bad archive".into(),
            }),
        };
        let display = err.to_string();
        assert!(display.starts_with("used password 2 of 3"));
        assert!(display.contains("movie.part2.rar"));
    }

    #[test]
    fn test_is_security_violation() {
        let err = ExtractionError::InvalidHead {
            archive: PathBuf::from("a.rar"),
        };
        assert!(err.is_security_violation());

        let wrapped = ExtractionError::PasswordAttempt {
            index: 1,
            total: 1,
            source: Box::new(err),
        };
        assert!(wrapped.is_security_violation());

        assert!(!ExtractionError::NoLogger.is_security_violation());
    }

    #[test]
    fn test_is_configuration_error() {
        assert!(ExtractionError::NoConfig.is_configuration_error());
        assert!(ExtractionError::NoLogger.is_configuration_error());
        assert!(ExtractionError::QueueRunning.is_configuration_error());
        assert!(ExtractionError::QueueStopped.is_configuration_error());
        assert!(
            !ExtractionError::UnknownArchiveType {
                path: PathBuf::from("x.bin")
            }
            .is_configuration_error()
        );
    }

    #[test]
    fn test_is_incorrect_password() {
        let err = ExtractionError::IncorrectPassword {
            archive: PathBuf::from("a.zip"),
        };
        assert!(err.is_incorrect_password());

        let wrapped = ExtractionError::PasswordAttempt {
            index: 1,
            total: 2,
            source: Box::new(err),
        };
        assert!(!wrapped.is_incorrect_password());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ExtractionError = io_err.into();
        assert!(matches!(err, ExtractionError::Io(_)));
    }

    #[test]
    fn test_error_source_chain() {
        use std::error::Error;

        let err = ExtractionError::PasswordAttempt {
            index: 1,
            total: 1,
            source: Box::new(ExtractionError::Internal {
                message: "inner".into(),
            }),
        };
        let source = err.source().map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("internal extraction fault: inner"));
    }
}
