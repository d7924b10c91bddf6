//! Sanitized output path type.

use std::path::Path;
use std::path::PathBuf;

/// An output path produced by entry sanitization.
///
/// # Security Properties
///
/// - Can ONLY be constructed by [`crate::security::sanitize_entry`]
/// - NO `From<PathBuf>` implementation
/// - Always starts with the output directory it was sanitized against
/// - Its final component is printable ASCII and at most 255 bytes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SafePath(PathBuf);

impl SafePath {
    pub(crate) fn new_unchecked(path: PathBuf) -> Self {
        Self(path)
    }

    /// Returns the path as a `&Path`.
    #[inline]
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Consumes the `SafePath` and returns the inner `PathBuf`.
    #[must_use]
    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }
}

impl AsRef<Path> for SafePath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

/// Outcome of sanitizing one archive entry name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SanitizedEntry {
    /// Write the entry at this path.
    Extract(SafePath),
    /// Ignore the entry; this is not an error.
    Skip(SkipReason),
}

/// Why an entry was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Name starts with `.`.
    Hidden,
    /// Name contains a `__MACOSX` resource-fork marker.
    PlatformMetadata,
    /// Name resolves to the output directory itself.
    OutputRoot,
}

impl SanitizedEntry {
    /// Returns the safe path, or `None` if the entry is skipped.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Extract(path) => Some(path.as_path()),
            Self::Skip(_) => None,
        }
    }
}
