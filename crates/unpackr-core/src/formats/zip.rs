//! ZIP archive format handler.
//!
//! Backed by the `zip` crate. Encrypted entries (ZipCrypto or AES) are opened
//! with `by_index_decrypt`, so the candidate password is in place before a
//! single content byte is decoded.

use std::fs::File;
use std::io;
use std::io::BufReader;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use zip::ZipArchive;
use zip::result::ZipError;

use crate::ExtractionError;
use crate::Result;

use super::traits::ArchiveFormat;
use super::traits::BenignFault;
use super::traits::DecodeError;
use super::traits::DecodeErrorKind;
use super::traits::EntryDecoder;
use super::traits::EntryHeader;

/// ZIP archive handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipFormat;

impl ZipFormat {
    /// Creates a new ZIP archive handler.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ArchiveFormat for ZipFormat {
    fn open(&self, archive: &Path, password: Option<&str>) -> Result<Box<dyn EntryDecoder>> {
        let file = File::open(archive)?;
        let zip = ZipArchive::new(BufReader::new(file)).map_err(|e| match e {
            ZipError::Io(io) => ExtractionError::Io(io),
            other => ExtractionError::Decoder {
                volume: archive.to_path_buf(),
                message: format!("zip: {other}"),
            },
        })?;

        if zip.is_empty() {
            return Err(ExtractionError::NoCompressedFiles {
                path: archive.to_path_buf(),
            });
        }

        Ok(Box::new(ZipDecoder {
            path: archive.to_path_buf(),
            archive: zip,
            password: password.map(str::to_owned),
            next_index: 0,
            current: None,
        }))
    }

    fn format_name(&self) -> &'static str {
        "zip"
    }
}

#[derive(Debug, Clone, Copy)]
struct CurrentEntry {
    index: usize,
    encrypted: bool,
}

struct ZipDecoder {
    path: PathBuf,
    archive: ZipArchive<BufReader<File>>,
    password: Option<String>,
    next_index: usize,
    current: Option<CurrentEntry>,
}

impl EntryDecoder for ZipDecoder {
    fn next_entry(&mut self) -> std::result::Result<Option<EntryHeader>, DecodeError> {
        if self.next_index >= self.archive.len() {
            self.current = None;
            return Ok(None);
        }

        let index = self.next_index;
        self.next_index += 1;
        let entry_count = self.archive.len();

        let (name, is_dir, encrypted) = match self.archive.by_index_raw(index) {
            Ok(file) => (file.name().to_owned(), file.is_dir(), file.encrypted()),
            Err(e) => return Err(classify_zip_error(e, None, entry_count)),
        };

        self.current = Some(CurrentEntry { index, encrypted });
        Ok(Some(EntryHeader { name, is_dir }))
    }

    fn entry_reader(&mut self) -> std::result::Result<Box<dyn Read + '_>, DecodeError> {
        let Some(entry) = self.current else {
            return Err(DecodeError::fatal("zip: no current entry"));
        };
        let entry_count = self.archive.len();

        let opened = match self.password.as_deref() {
            Some(password) if entry.encrypted => self
                .archive
                .by_index_decrypt(entry.index, password.as_bytes()),
            None if entry.encrypted => Err(ZipError::UnsupportedArchive(
                ZipError::PASSWORD_REQUIRED,
            )),
            _ => self.archive.by_index(entry.index),
        };

        match opened {
            Ok(file) => Ok(Box::new(file)),
            Err(e) => Err(classify_zip_error(e, Some(entry), entry_count)),
        }
    }

    fn classify_read_error(&self, error: &io::Error) -> DecodeErrorKind {
        classify_io_error(error, self.current, self.archive.len())
    }

    fn volumes(&self) -> Vec<PathBuf> {
        vec![self.path.clone()]
    }
}

fn classify_zip_error(
    error: ZipError,
    entry: Option<CurrentEntry>,
    entry_count: usize,
) -> DecodeError {
    match error {
        ZipError::InvalidPassword => {
            DecodeError::incorrect_password(format!("zip: {}", ZipError::InvalidPassword))
        }
        ZipError::UnsupportedArchive(message) if message == ZipError::PASSWORD_REQUIRED => {
            DecodeError::incorrect_password(format!("zip: {message}"))
        }
        ZipError::Io(io) => {
            DecodeError::new(classify_io_error(&io, entry, entry_count), format!("zip: {io}"))
        }
        other => DecodeError::fatal(format!("zip: {other}")),
    }
}

fn classify_io_error(
    error: &io::Error,
    entry: Option<CurrentEntry>,
    entry_count: usize,
) -> DecodeErrorKind {
    if error.kind() == io::ErrorKind::UnexpectedEof {
        return DecodeErrorKind::Benign(BenignFault::UnexpectedEof);
    }

    if !is_checksum_error(error) {
        return DecodeErrorKind::Fatal;
    }

    match entry {
        // A wrong ZipCrypto key passes the header check 1 time in 256 and
        // then fails the CRC.
        Some(entry) if entry.encrypted => DecodeErrorKind::IncorrectPassword,
        Some(entry) if entry.index + 1 == entry_count => {
            DecodeErrorKind::Benign(BenignFault::LastEntryChecksum)
        }
        _ => DecodeErrorKind::Fatal,
    }
}

fn is_checksum_error(error: &io::Error) -> bool {
    error.kind() == io::ErrorKind::InvalidData
        || error.to_string().to_ascii_lowercase().contains("checksum")
}
