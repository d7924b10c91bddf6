//! Common traits for archive format handlers.
//!
//! A format handler opens an archive with one candidate password and hands
//! back an [`EntryDecoder`], a cursor over the archive's entries in native
//! order. The decoder also classifies its own faults so the extractor never
//! has to inspect error strings.

use std::fmt;
use std::io;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use crate::Result;

/// Opens archives of one format.
pub trait ArchiveFormat: Send + Sync {
    /// Opens `archive` for decoding with at most one password.
    ///
    /// The password is applied before any entry content is read.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive cannot be opened, holds no entries
    /// (`NoCompressedFiles`) or the password is rejected while reading the
    /// headers (`IncorrectPassword`).
    fn open(&self, archive: &Path, password: Option<&str>) -> Result<Box<dyn EntryDecoder>>;

    /// Returns the archive format name.
    fn format_name(&self) -> &'static str;
}

/// Sequential cursor over the entries of an opened archive.
pub trait EntryDecoder {
    /// Advances to the next entry header.
    ///
    /// Returns `Ok(None)` at the end of the archive.
    ///
    /// # Errors
    ///
    /// Returns a classified [`DecodeError`] if the header cannot be read.
    fn next_entry(&mut self) -> std::result::Result<Option<EntryHeader>, DecodeError>;

    /// Returns a reader over the content of the current entry.
    ///
    /// Must be called at most once per entry, after `next_entry` returned a
    /// file header. Skipping the call skips the entry's content.
    ///
    /// # Errors
    ///
    /// Returns a classified [`DecodeError`] if the content cannot be
    /// decoded up front (decoders that buffer whole entries fail here).
    fn entry_reader(&mut self) -> std::result::Result<Box<dyn Read + '_>, DecodeError>;

    /// Writes the content of the current entry straight to `path`.
    ///
    /// For decoders whose library creates output files itself. Returns
    /// `None` if the decoder only offers [`entry_reader`](Self::entry_reader),
    /// otherwise the number of bytes written. The parent directory exists,
    /// and a file already at `path` is replaced. Same calling rules as
    /// `entry_reader`; the extractor uses one or the other per entry.
    fn extract_entry_to(&mut self, _path: &Path) -> Option<std::result::Result<u64, DecodeError>> {
        None
    }

    /// Classifies an I/O error returned by a reader from `entry_reader`.
    fn classify_read_error(&self, error: &io::Error) -> DecodeErrorKind;

    /// Archive volumes known so far, in order.
    fn volumes(&self) -> Vec<PathBuf>;
}

/// One archive entry, as reported by the decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryHeader {
    /// Entry name exactly as stored in the archive.
    pub name: String,
    /// `true` for directory entries.
    pub is_dir: bool,
}

impl EntryHeader {
    /// Creates a file entry header.
    #[must_use]
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
        }
    }

    /// Creates a directory entry header.
    #[must_use]
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
        }
    }
}

/// How the extractor should react to a decoder fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeErrorKind {
    /// Abort the job.
    Fatal,
    /// The password was wrong or missing; try the next candidate.
    IncorrectPassword,
    /// Stop iterating and report success with what was extracted.
    Benign(BenignFault),
}

/// Decoder faults that end extraction without failing the job.
///
/// Downloads of multi-volume sets are commonly incomplete, and archive
/// writers occasionally leave a bad checksum on the final entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BenignFault {
    /// The archive ended early (missing or truncated volume).
    UnexpectedEof,
    /// Entry content stopped streaming mid-way.
    StreamCopy,
    /// The checksum of the last entry did not match.
    LastEntryChecksum,
}

impl fmt::Display for BenignFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::UnexpectedEof => "unexpected end of archive",
            Self::StreamCopy => "entry stream ended early",
            Self::LastEntryChecksum => "checksum mismatch on last entry",
        };
        f.write_str(text)
    }
}

/// A classified decoder fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    /// Classification.
    pub kind: DecodeErrorKind,
    /// Decoder message.
    pub message: String,
}

impl DecodeError {
    /// Creates a fault of the given kind.
    pub fn new(kind: DecodeErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates a fatal fault.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(DecodeErrorKind::Fatal, message)
    }

    /// Creates a benign fault.
    pub fn benign(fault: BenignFault, message: impl Into<String>) -> Self {
        Self::new(DecodeErrorKind::Benign(fault), message)
    }

    /// Creates an incorrect-password fault.
    pub fn incorrect_password(message: impl Into<String>) -> Self {
        Self::new(DecodeErrorKind::IncorrectPassword, message)
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for DecodeError {}
