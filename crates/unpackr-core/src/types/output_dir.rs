//! Normalized output directory type.

use crate::Result;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

/// An absolute, lexically normalized output directory.
///
/// Unlike a canonical path, no filesystem access is needed: the directory
/// may not exist yet, extraction creates it on demand. Every path handed
/// out by the sanitizer is checked to start with this directory.
///
/// # Examples
///
/// ```
/// use unpackr_core::types::OutputDir;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let out = OutputDir::new("/srv/media/./incoming/../done")?;
/// assert_eq!(out.as_path(), std::path::Path::new("/srv/media/done"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutputDir(PathBuf);

impl OutputDir {
    /// Creates an `OutputDir`, resolving relative paths against the current
    /// working directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is empty or the current directory cannot
    /// be determined.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let absolute = std::path::absolute(path.as_ref())?;
        Ok(Self(normalize_lexically(&absolute)))
    }

    /// Returns the directory as a `&Path`.
    #[inline]
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Consumes the `OutputDir` and returns the inner `PathBuf`.
    #[must_use]
    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }
}

impl AsRef<Path> for OutputDir {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

/// Resolves `.` and `..` components without touching the filesystem.
///
/// `..` at the root stays at the root, matching how the kernel resolves it.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => normalized.push(component),
            },
            Component::Prefix(_) | Component::RootDir | Component::Normal(_) => {
                normalized.push(component);
            }
        }
    }
    normalized
}
