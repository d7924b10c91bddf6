//! Core extraction engine.
//!
//! [`ArchiveExtractor`] drives one [`EntryDecoder`] from the first entry to
//! the end of the archive. It is format-agnostic: every decision that
//! depends on the format (what a fault means, which volume is current) is
//! delegated to the decoder.

use std::fs;
use std::path::Path;

use crate::ExtractionError;
use crate::ExtractionReport;
use crate::Result;
use crate::copy::CopyBuffer;
use crate::copy::StreamError;
use crate::formats::DecodeError;
use crate::formats::DecodeErrorKind;
use crate::formats::EntryDecoder;
use crate::logger::Logger;
use crate::security::sanitize_entry;
use crate::security::sanitize_mode;
use crate::types::OutputDir;
use crate::types::SanitizedEntry;

use super::stream::create_dir_all;
use super::stream::set_file_mode;
use super::stream::write_stream;

/// Extracts the entries of an opened archive into an output directory.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use unpackr_core::ExtractionReport;
/// use unpackr_core::extraction::ArchiveExtractor;
/// use unpackr_core::formats::ArchiveFormat;
/// use unpackr_core::formats::ZipFormat;
/// use unpackr_core::logger::NoopLogger;
/// use unpackr_core::types::OutputDir;
///
/// # fn main() -> Result<(), unpackr_core::ExtractionError> {
/// let archive = Path::new("photos.zip");
/// let output = OutputDir::new("/tmp/photos")?;
/// let extractor = ArchiveExtractor::new(archive, output, &NoopLogger);
///
/// let mut decoder = ZipFormat.open(archive, None)?;
/// let mut report = ExtractionReport::new();
/// extractor.extract(decoder.as_mut(), &mut report)?;
/// println!("{} files", report.files_extracted());
/// # Ok(())
/// # }
/// ```
pub struct ArchiveExtractor<'a> {
    archive: &'a Path,
    output_dir: OutputDir,
    file_mode: u32,
    dir_mode: u32,
    logger: &'a dyn Logger,
}

impl<'a> ArchiveExtractor<'a> {
    /// Creates an extractor with modes `0o644` / `0o755`.
    #[must_use]
    pub fn new(archive: &'a Path, output_dir: OutputDir, logger: &'a dyn Logger) -> Self {
        Self {
            archive,
            output_dir,
            file_mode: 0o644,
            dir_mode: 0o755,
            logger,
        }
    }

    /// Sets the file and directory modes, after [`sanitize_mode`].
    #[must_use]
    pub const fn with_modes(mut self, file_mode: u32, dir_mode: u32) -> Self {
        self.file_mode = sanitize_mode(file_mode, false);
        self.dir_mode = sanitize_mode(dir_mode, true);
        self
    }

    /// Returns the output directory.
    #[must_use]
    pub const fn output_dir(&self) -> &OutputDir {
        &self.output_dir
    }

    /// Extracts every entry `decoder` yields.
    ///
    /// Progress is recorded in `report` as it happens, so a failed
    /// extraction still reports what was written. A benign decoder fault
    /// ends extraction successfully with `report.truncated` set; the entry
    /// being written at that point is removed and not counted.
    ///
    /// # Errors
    ///
    /// - `InvalidHead` for an entry with an empty name
    /// - `InvalidPath` for an entry escaping the output directory
    /// - `IncorrectPassword` if the decoder rejects the password
    /// - `Decoder` for a fatal decoder fault, tagged with the last volume
    /// - `Io` if a file cannot be written
    pub fn extract(
        &self,
        decoder: &mut dyn EntryDecoder,
        report: &mut ExtractionReport,
    ) -> Result<()> {
        let outcome = self.extract_entries(decoder, report);
        report.volumes = decoder.volumes();
        outcome
    }

    fn extract_entries(
        &self,
        decoder: &mut dyn EntryDecoder,
        report: &mut ExtractionReport,
    ) -> Result<()> {
        let mut buffer = CopyBuffer::new();

        loop {
            let header = match decoder.next_entry() {
                Ok(Some(header)) => header,
                Ok(None) => return Ok(()),
                Err(fault) => return self.on_fault(fault.kind, &fault.message, decoder, report),
            };

            if header.name.is_empty() {
                return Err(ExtractionError::InvalidHead {
                    archive: self.archive.to_path_buf(),
                });
            }

            let path = match sanitize_entry(&header.name, &self.output_dir)? {
                SanitizedEntry::Extract(path) => path.into_path_buf(),
                SanitizedEntry::Skip(reason) => {
                    self.logger
                        .debug(&format!("skipping {} ({reason:?})", header.name));
                    report.entries_skipped += 1;
                    continue;
                }
            };

            if header.is_dir {
                if self.ensure_dir(&path, report) {
                    report.directories_created += 1;
                }
                continue;
            }

            if let Some(parent) = path.parent()
                && !self.ensure_dir(parent, report)
            {
                continue;
            }

            let written = match self.write_entry(decoder, &path, &mut buffer) {
                Ok(written) => written,
                Err(fault) => {
                    remove_partial(&path);
                    return self.on_fault(fault.kind, &fault.message, decoder, report);
                }
            };

            match written {
                Ok(bytes) => {
                    report.bytes_written += bytes;
                    report.files.push(path);
                }
                Err(StreamError::Read(e)) => {
                    remove_partial(&path);
                    let kind = decoder.classify_read_error(&e);
                    let message = format!("{}: {e}", header.name);
                    return self.on_fault(kind, &message, decoder, report);
                }
                Err(StreamError::Write(e)) => {
                    remove_partial(&path);
                    return Err(ExtractionError::Io(e));
                }
            }
        }
    }

    /// Writes the current entry to `path`.
    ///
    /// The outer error is a decoder fault raised by the decoder itself, the
    /// inner one a failure while streaming its reader into the file.
    fn write_entry(
        &self,
        decoder: &mut dyn EntryDecoder,
        path: &Path,
        buffer: &mut CopyBuffer,
    ) -> std::result::Result<std::result::Result<u64, StreamError>, DecodeError> {
        if let Some(direct) = decoder.extract_entry_to(path) {
            let bytes = direct?;
            return Ok(set_file_mode(path, self.file_mode)
                .map(|()| bytes)
                .map_err(StreamError::Write));
        }

        let mut reader = decoder.entry_reader()?;
        Ok(write_stream(
            path,
            reader.as_mut(),
            self.file_mode,
            self.dir_mode,
            buffer,
        ))
    }

    /// Creates `dir`, recording a warning instead of failing.
    fn ensure_dir(&self, dir: &Path, report: &mut ExtractionReport) -> bool {
        match create_dir_all(dir, self.dir_mode) {
            Ok(()) => true,
            Err(e) => {
                let warning = format!("creating directory {}: {e}", dir.display());
                self.logger.info(&warning);
                report.add_warning(warning);
                false
            }
        }
    }

    fn on_fault(
        &self,
        kind: DecodeErrorKind,
        message: &str,
        decoder: &dyn EntryDecoder,
        report: &mut ExtractionReport,
    ) -> Result<()> {
        match kind {
            DecodeErrorKind::Benign(fault) => {
                self.logger.info(&format!(
                    "{}: stopped early ({fault}): {message}",
                    self.archive.display()
                ));
                report.truncated = true;
                Ok(())
            }
            DecodeErrorKind::IncorrectPassword => Err(ExtractionError::IncorrectPassword {
                archive: self.archive.to_path_buf(),
            }),
            DecodeErrorKind::Fatal => Err(ExtractionError::Decoder {
                volume: decoder
                    .volumes()
                    .pop()
                    .unwrap_or_else(|| self.archive.to_path_buf()),
                message: message.to_string(),
            }),
        }
    }
}

fn remove_partial(path: &Path) {
    if let Err(e) = fs::remove_file(path)
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::debug!(path = %path.display(), error = %e, "could not remove partial file");
    }
}
