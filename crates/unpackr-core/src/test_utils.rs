//! Test utilities for archive fixtures and scripted decoders.
//!
//! ZIP fixtures are real archives written with `zip::ZipWriter`. No RAR
//! writer exists, so RAR-specific behavior (truncated volume sets, CRC
//! faults, password rejection) is reproduced with [`ScriptedFormat`].
//!
//! # Panics
//!
//! All functions in this module may panic on I/O errors since they are
//! designed for test use only where panics are acceptable.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::fs;
use std::fs::File;
use std::io;
use std::io::Cursor;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use zip::write::SimpleFileOptions;
use zip::write::ZipWriter;

use crate::Result;
use crate::formats::ArchiveFormat;
use crate::formats::BenignFault;
use crate::formats::DecodeError;
use crate::formats::DecodeErrorKind;
use crate::formats::EntryDecoder;
use crate::formats::EntryHeader;

/// Writes a ZIP archive to `path`.
///
/// Names ending in `/` become directory entries; their content is ignored.
///
/// # Examples
///
/// ```
/// use unpackr_core::test_utils::zip_archive;
///
/// let dir = tempfile::tempdir().unwrap();
/// let path = dir.path().join("fixture.zip");
/// zip_archive(&path, &[("docs/", b""), ("docs/a.txt", b"hello")]);
/// assert!(path.exists());
/// ```
pub fn zip_archive(path: &Path, entries: &[(&str, &[u8])]) {
    write_zip(path, entries, None);
}

/// Writes a ZIP archive whose files are AES-256 encrypted with `password`.
pub fn encrypted_zip_archive(path: &Path, password: &str, entries: &[(&str, &[u8])]) {
    write_zip(path, entries, Some(password));
}

/// Returns the bytes of an in-memory ZIP archive.
#[must_use]
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    add_entries(&mut zip, entries, None);
    zip.finish().unwrap().into_inner()
}

fn write_zip(path: &Path, entries: &[(&str, &[u8])], password: Option<&str>) {
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    add_entries(&mut zip, entries, password);
    zip.finish().unwrap();
}

fn add_entries<W: Write + io::Seek>(
    zip: &mut ZipWriter<W>,
    entries: &[(&str, &[u8])],
    password: Option<&str>,
) {
    let plain = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(0o644);

    for (name, data) in entries {
        if name.ends_with('/') {
            zip.add_directory(*name, plain).unwrap();
            continue;
        }
        let options = match password {
            Some(password) => plain.with_aes_encryption(zip::AesMode::Aes256, password),
            None => plain,
        };
        zip.start_file(*name, options).unwrap();
        zip.write_all(data).unwrap();
    }
}

/// One scripted archive entry.
#[derive(Debug, Clone)]
pub enum ScriptedEntry {
    /// A directory entry.
    Directory(String),
    /// A file entry with its content.
    File(String, Vec<u8>),
    /// A file whose reader yields `data` and then fails with `kind`.
    Truncated {
        /// Entry name.
        name: String,
        /// Bytes delivered before the failure.
        data: Vec<u8>,
        /// I/O error kind of the failure.
        kind: io::ErrorKind,
    },
    /// `next_entry` fails with this fault.
    HeaderFault(DecodeError),
}

impl ScriptedEntry {
    /// Creates a directory entry.
    pub fn directory(name: &str) -> Self {
        Self::Directory(name.to_string())
    }

    /// Creates a file entry.
    pub fn file(name: &str, data: &[u8]) -> Self {
        Self::File(name.to_string(), data.to_vec())
    }

    /// Creates a file entry whose stream breaks after `data`.
    pub fn truncated(name: &str, data: &[u8], kind: io::ErrorKind) -> Self {
        Self::Truncated {
            name: name.to_string(),
            data: data.to_vec(),
            kind,
        }
    }

    /// Creates a header fault.
    pub const fn header_fault(fault: DecodeError) -> Self {
        Self::HeaderFault(fault)
    }
}

/// Deterministic [`ArchiveFormat`] that replays a script of entries.
///
/// - With [`requires_password`](Self::requires_password), file content is
///   only readable when opened with that password; any other candidate
///   gets an incorrect-password fault on the first file.
/// - [`fail_with`](Self::fail_with) makes a specific candidate fail with a
///   fault on its first header.
/// - [`writes_directly`](Self::writes_directly) makes the decoder write
///   files itself through `extract_entry_to`, leaving partial content
///   behind on a broken stream.
/// - Every `open` call is recorded; see [`attempts`](Self::attempts).
#[derive(Debug, Clone, Default)]
pub struct ScriptedFormat {
    entries: Vec<ScriptedEntry>,
    password: Option<String>,
    direct: bool,
    failures: Vec<(Option<String>, DecodeError)>,
    volumes: Option<Vec<PathBuf>>,
    attempts: Arc<Mutex<Vec<Option<String>>>>,
}

impl ScriptedFormat {
    /// Creates a format replaying `entries`.
    #[must_use]
    pub fn new(entries: Vec<ScriptedEntry>) -> Self {
        Self {
            entries,
            ..Self::default()
        }
    }

    /// Requires `password` to read file content.
    #[must_use]
    pub fn requires_password(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }

    /// Makes the given candidate fail with `fault` before the first entry.
    #[must_use]
    pub fn fail_with(mut self, candidate: Option<&str>, fault: DecodeError) -> Self {
        self.failures.push((candidate.map(str::to_string), fault));
        self
    }

    /// Writes entry content through `extract_entry_to` instead of a reader.
    #[must_use]
    pub const fn writes_directly(mut self) -> Self {
        self.direct = true;
        self
    }

    /// Overrides the volumes reported by the decoder.
    #[must_use]
    pub fn with_volumes<I, P>(mut self, volumes: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.volumes = Some(volumes.into_iter().map(Into::into).collect());
        self
    }

    /// Returns the passwords `open` was called with, in order.
    #[must_use]
    pub fn attempts(&self) -> Vec<Option<String>> {
        self.attempts.lock().clone()
    }
}

impl ArchiveFormat for ScriptedFormat {
    fn open(&self, archive: &Path, password: Option<&str>) -> Result<Box<dyn EntryDecoder>> {
        self.attempts.lock().push(password.map(str::to_string));

        let pending_fault = self
            .failures
            .iter()
            .find(|(candidate, _)| candidate.as_deref() == password)
            .map(|(_, fault)| fault.clone());

        let unlocked = match &self.password {
            Some(required) => password == Some(required.as_str()),
            None => true,
        };

        Ok(Box::new(ScriptedDecoder {
            entries: self.entries.clone().into_iter(),
            pending_fault,
            unlocked,
            direct: self.direct,
            current: None,
            volumes: self
                .volumes
                .clone()
                .unwrap_or_else(|| vec![archive.to_path_buf()]),
        }))
    }

    fn format_name(&self) -> &'static str {
        "scripted"
    }
}

struct ScriptedDecoder {
    entries: std::vec::IntoIter<ScriptedEntry>,
    pending_fault: Option<DecodeError>,
    unlocked: bool,
    direct: bool,
    current: Option<ScriptedEntry>,
    volumes: Vec<PathBuf>,
}

impl EntryDecoder for ScriptedDecoder {
    fn next_entry(&mut self) -> std::result::Result<Option<EntryHeader>, DecodeError> {
        if let Some(fault) = self.pending_fault.take() {
            return Err(fault);
        }

        let Some(entry) = self.entries.next() else {
            self.current = None;
            return Ok(None);
        };

        let header = match &entry {
            ScriptedEntry::Directory(name) => EntryHeader::directory(name.clone()),
            ScriptedEntry::File(name, _) | ScriptedEntry::Truncated { name, .. } => {
                EntryHeader::file(name.clone())
            }
            ScriptedEntry::HeaderFault(fault) => return Err(fault.clone()),
        };
        self.current = Some(entry);
        Ok(Some(header))
    }

    fn entry_reader(&mut self) -> std::result::Result<Box<dyn Read + '_>, DecodeError> {
        if !self.unlocked {
            return Err(DecodeError::incorrect_password("scripted: wrong password"));
        }

        match self.current.take() {
            Some(ScriptedEntry::File(_, data)) => Ok(Box::new(Cursor::new(data))),
            Some(ScriptedEntry::Truncated { data, kind, .. }) => Ok(Box::new(BrokenReader {
                data: Cursor::new(data),
                kind,
            })),
            _ => Err(DecodeError::fatal("scripted: no current file")),
        }
    }

    fn extract_entry_to(&mut self, path: &Path) -> Option<std::result::Result<u64, DecodeError>> {
        if !self.direct {
            return None;
        }
        if !self.unlocked {
            return Some(Err(DecodeError::incorrect_password(
                "scripted: wrong password",
            )));
        }

        let outcome = match self.current.take() {
            Some(ScriptedEntry::File(_, data)) => fs::write(path, &data)
                .map(|()| data.len() as u64)
                .map_err(|e| DecodeError::fatal(format!("scripted: {e}"))),
            Some(ScriptedEntry::Truncated { data, kind, .. }) => {
                let _ = fs::write(path, &data);
                let error = io::Error::new(kind, "scripted stream failure");
                Err(DecodeError::new(self.classify_read_error(&error), error.to_string()))
            }
            _ => Err(DecodeError::fatal("scripted: no current file")),
        };
        Some(outcome)
    }

    fn classify_read_error(&self, error: &io::Error) -> DecodeErrorKind {
        match error.kind() {
            io::ErrorKind::UnexpectedEof => DecodeErrorKind::Benign(BenignFault::UnexpectedEof),
            _ => DecodeErrorKind::Fatal,
        }
    }

    fn volumes(&self) -> Vec<PathBuf> {
        self.volumes.clone()
    }
}

/// Reader that yields its data, then fails.
struct BrokenReader {
    data: Cursor<Vec<u8>>,
    kind: io::ErrorKind,
}

impl Read for BrokenReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.data.read(buf)? {
            0 => Err(io::Error::new(self.kind, "scripted stream failure")),
            n => Ok(n),
        }
    }
}
