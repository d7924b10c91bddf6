//! Extraction job description.

use std::path::Path;
use std::path::PathBuf;

/// A request to extract one archive.
///
/// Built with the chained setters, then moved into the queue. The job comes
/// back unchanged inside its [`ExtractionResult`](crate::ExtractionResult).
///
/// # Examples
///
/// ```
/// use unpackr_core::ExtractionJob;
///
/// let job = ExtractionJob::new("/downloads/show.part01.rar", "/media/show")
///     .password("primary")
///     .passwords(["fallback-1", "fallback-2"])
///     .dir_mode(0o750);
///
/// assert_eq!(job.password_candidates().len(), 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionJob {
    /// Archive to extract. For multi-volume RAR sets, the first volume.
    pub source: PathBuf,
    /// Directory the entries are extracted into.
    pub output_dir: PathBuf,
    /// File mode override; the queue default applies when `None`.
    pub file_mode: Option<u32>,
    /// Directory mode override; the queue default applies when `None`.
    pub dir_mode: Option<u32>,
    /// Password tried first.
    pub password: Option<String>,
    /// Passwords tried after `password`, in order.
    pub passwords: Vec<String>,
    /// Extract into a temporary sibling directory and merge on success.
    pub staged: bool,
}

impl ExtractionJob {
    /// Creates a job extracting `source` into `output_dir`.
    pub fn new(source: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            output_dir: output_dir.into(),
            file_mode: None,
            dir_mode: None,
            password: None,
            passwords: Vec::new(),
            staged: false,
        }
    }

    /// Sets the password tried first.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Appends passwords tried after the primary one.
    #[must_use]
    pub fn passwords<I, S>(mut self, passwords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.passwords.extend(passwords.into_iter().map(Into::into));
        self
    }

    /// Sets the mode for written files.
    #[must_use]
    pub const fn file_mode(mut self, mode: u32) -> Self {
        self.file_mode = Some(mode);
        self
    }

    /// Sets the mode for created directories.
    #[must_use]
    pub const fn dir_mode(mut self, mode: u32) -> Self {
        self.dir_mode = Some(mode);
        self
    }

    /// Enables staged extraction.
    #[must_use]
    pub const fn staged(mut self, staged: bool) -> Self {
        self.staged = staged;
        self
    }

    /// Returns the archive path.
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Returns the passwords to try, in order, ending with "no password".
    ///
    /// An empty primary password counts as unset.
    #[must_use]
    pub fn password_candidates(&self) -> Vec<Option<&str>> {
        self.password
            .as_deref()
            .filter(|p| !p.is_empty())
            .into_iter()
            .chain(self.passwords.iter().map(String::as_str))
            .map(Some)
            .chain(std::iter::once(None))
            .collect()
    }
}
