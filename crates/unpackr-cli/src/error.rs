//! Error conversion utilities for CLI.
//!
//! Converts unpackr-core's typed errors (thiserror) into user-friendly
//! contextual errors (anyhow) with actionable guidance.

use anyhow::anyhow;
use std::path::Path;
use unpackr_core::ExtractionError;

/// Converts `ExtractionError` to user-friendly anyhow error with context
pub fn convert_extraction_error(err: ExtractionError, archive: &Path) -> anyhow::Error {
    match err {
        ExtractionError::InvalidPath { path, entry } => {
            anyhow!(
                "Security violation: Archive '{}' has an entry escaping the output directory: '{}' -> '{}'\n\
                 HINT: This archive may be malicious. Do not extract from untrusted sources.",
                archive.display(),
                entry,
                path.display()
            )
        }
        ExtractionError::IncorrectPassword { .. } => {
            anyhow!(
                "Archive '{}' is encrypted and none of the passwords opened it\n\
                 HINT: Pass candidate passwords with -p/--password (can be repeated).",
                archive.display()
            )
        }
        ExtractionError::UnknownArchiveType { .. } => {
            anyhow!(
                "Archive format not supported: {}\n\
                 HINT: Supported formats: rar (including multi-volume sets), zip",
                archive.display()
            )
        }
        ExtractionError::NoCompressedFiles { .. } => {
            anyhow!("Archive '{}' contains no files", archive.display())
        }
        ExtractionError::Decoder { volume, message } => {
            anyhow!(
                "Failed to decode '{}' (at volume '{}'): {}\n\
                 HINT: The archive may be corrupted, or a volume of the set may be missing.",
                archive.display(),
                volume.display(),
                message
            )
        }
        ExtractionError::Io(io_err) => {
            anyhow!(
                "I/O error while processing '{}': {}",
                archive.display(),
                io_err
            )
        }
        _ => anyhow::Error::from(err)
            .context(format!("Error processing archive '{}'", archive.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::PathBuf;

    #[test]
    fn test_convert_invalid_path_error() {
        let err = ExtractionError::InvalidPath {
            path: PathBuf::from("/etc/passwd"),
            entry: "../../../etc/passwd".to_string(),
        };
        let converted = convert_extraction_error(err, Path::new("malicious.zip"));
        let msg = format!("{converted:?}");
        assert!(msg.contains("Security violation"));
        assert!(msg.contains("malicious.zip"));
        assert!(msg.contains("HINT"));
    }

    #[test]
    fn test_convert_password_error() {
        let err = ExtractionError::IncorrectPassword {
            archive: PathBuf::from("locked.rar"),
        };
        let msg = format!("{:?}", convert_extraction_error(err, Path::new("locked.rar")));
        assert!(msg.contains("--password"));
    }

    #[test]
    fn test_convert_io_error() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err = ExtractionError::Io(io_err);
        let converted = convert_extraction_error(err, Path::new("archive.rar"));
        let msg = format!("{converted:?}");
        assert!(msg.contains("I/O error"));
    }

    #[test]
    fn test_password_attempt_keeps_chain() {
        let err = ExtractionError::PasswordAttempt {
            index: 2,
            total: 3,
            source: Box::new(ExtractionError::Internal {
                message: "boom".to_string(),
            }),
        };
        let msg = format!("{:?}", convert_extraction_error(err, Path::new("x.rar")));
        assert!(msg.contains("x.rar"));
        assert!(msg.contains("password 2 of 3"));
    }
}
