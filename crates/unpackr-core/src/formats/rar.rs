//! RAR archive format handler.
//!
//! Backed by `unrar`, the libunrar binding. libunrar walks multi-volume sets
//! on its own and writes entry content straight to the output file, so
//! nothing larger than a header is held in memory. The decoder records a
//! volume as reached once an entry split across it has been processed.

use std::fs;
use std::io;
use std::io::Read;
use std::iter;
use std::mem;
use std::path::Path;
use std::path::PathBuf;

use unrar::Archive;
use unrar::CursorBeforeFile;
use unrar::CursorBeforeHeader;
use unrar::OpenArchive;
use unrar::Process;
use unrar::error::Code;
use unrar::error::UnrarError;

use crate::ExtractionError;
use crate::Result;

use super::traits::ArchiveFormat;
use super::traits::BenignFault;
use super::traits::DecodeError;
use super::traits::DecodeErrorKind;
use super::traits::EntryDecoder;
use super::traits::EntryHeader;

/// RAR archive handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct RarFormat;

impl RarFormat {
    /// Creates a new RAR archive handler.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ArchiveFormat for RarFormat {
    fn open(&self, archive: &Path, password: Option<&str>) -> Result<Box<dyn EntryDecoder>> {
        let opened = match password {
            Some(password) => Archive::with_password(archive, password.as_bytes()),
            None => Archive::new(archive),
        }
        .open_for_processing()
        .map_err(|e| open_error(archive, &e, false))?;
        let header_encrypted = opened.has_encrypted_headers();

        // Headers of `-hp` archives are encrypted, so a wrong password
        // surfaces on the very first header.
        let first = opened
            .read_header()
            .map_err(|e| open_error(archive, &e, header_encrypted))?;
        let Some(file) = first else {
            return Err(ExtractionError::NoCompressedFiles {
                path: archive.to_path_buf(),
            });
        };

        let flags = EntryFlags::of(&file);
        Ok(Box::new(RarDecoder {
            reached: vec![archive.to_path_buf()],
            cursor: RarCursor::Primed(file, flags),
        }))
    }

    fn format_name(&self) -> &'static str {
        "rar"
    }
}

fn open_error(archive: &Path, error: &UnrarError, header_encrypted: bool) -> ExtractionError {
    match error.code {
        Code::BadPassword | Code::MissingPassword => ExtractionError::IncorrectPassword {
            archive: archive.to_path_buf(),
        },
        Code::BadData if header_encrypted => ExtractionError::IncorrectPassword {
            archive: archive.to_path_buf(),
        },
        _ => ExtractionError::Decoder {
            volume: archive.to_path_buf(),
            message: format!("unrar: {error}"),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EntryFlags {
    encrypted: bool,
    split: bool,
    /// Content continues in the next volume.
    continues: bool,
}

impl EntryFlags {
    fn of(file: &OpenArchive<Process, CursorBeforeFile>) -> Self {
        let header = file.entry();
        Self {
            encrypted: header.is_encrypted(),
            split: header.is_split(),
            continues: header.is_split_after(),
        }
    }
}

/// Position of the libunrar cursor.
enum RarCursor {
    /// Header read during `open`, not yet handed out.
    Primed(OpenArchive<Process, CursorBeforeFile>, EntryFlags),
    /// Before the next header.
    Header(OpenArchive<Process, CursorBeforeHeader>),
    /// Header handed out, content neither extracted nor skipped.
    File(OpenArchive<Process, CursorBeforeFile>, EntryFlags),
    /// End of archive or after a fault.
    Done,
}

/// Where in the entry cycle a libunrar fault happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Header,
    Data(EntryFlags),
}

struct RarDecoder {
    /// Volumes reached so far, in order. Starts with the opened file.
    reached: Vec<PathBuf>,
    cursor: RarCursor,
}

impl EntryDecoder for RarDecoder {
    fn next_entry(&mut self) -> std::result::Result<Option<EntryHeader>, DecodeError> {
        let before_header = match mem::replace(&mut self.cursor, RarCursor::Done) {
            RarCursor::Primed(file, flags) => return Ok(Some(self.hand_out(file, flags))),
            RarCursor::Header(archive) => archive,
            RarCursor::File(file, flags) => {
                let next = file
                    .skip()
                    .map_err(|e| classify_unrar_error(&e, Stage::Data(flags)))?;
                self.entry_done(flags);
                next
            }
            RarCursor::Done => return Ok(None),
        };

        match before_header.read_header() {
            Ok(Some(file)) => {
                let flags = EntryFlags::of(&file);
                Ok(Some(self.hand_out(file, flags)))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(classify_unrar_error(&e, Stage::Header)),
        }
    }

    fn entry_reader(&mut self) -> std::result::Result<Box<dyn Read + '_>, DecodeError> {
        Err(DecodeError::fatal(
            "unrar: entry content is only extracted to disk",
        ))
    }

    fn extract_entry_to(&mut self, path: &Path) -> Option<std::result::Result<u64, DecodeError>> {
        let RarCursor::File(file, flags) = mem::replace(&mut self.cursor, RarCursor::Done) else {
            return Some(Err(DecodeError::fatal("unrar: no current entry")));
        };

        // `extract_to` panics on interior nul bytes.
        if path.as_os_str().as_encoded_bytes().contains(&0) {
            return Some(Err(DecodeError::fatal(format!(
                "unrar: output path {} contains a nul byte",
                path.display()
            ))));
        }

        let unpacked_size = file.entry().unpacked_size;
        // libunrar reports the failure if an existing file cannot be replaced.
        let _ = fs::remove_file(path);

        let next = match file.extract_to(path) {
            Ok(next) => next,
            Err(e) => return Some(Err(classify_unrar_error(&e, Stage::Data(flags)))),
        };
        self.cursor = RarCursor::Header(next);
        self.entry_done(flags);

        let written = fs::metadata(path).map_or(unpacked_size, |meta| meta.len());
        Some(Ok(written))
    }

    fn classify_read_error(&self, error: &io::Error) -> DecodeErrorKind {
        if error.kind() == io::ErrorKind::UnexpectedEof {
            DecodeErrorKind::Benign(BenignFault::UnexpectedEof)
        } else {
            DecodeErrorKind::Benign(BenignFault::StreamCopy)
        }
    }

    fn volumes(&self) -> Vec<PathBuf> {
        self.reached.clone()
    }
}

impl RarDecoder {
    fn hand_out(
        &mut self,
        file: OpenArchive<Process, CursorBeforeFile>,
        flags: EntryFlags,
    ) -> EntryHeader {
        let header = file.entry();
        let entry = EntryHeader {
            name: header.filename.to_string_lossy().into_owned(),
            is_dir: header.is_directory(),
        };
        self.cursor = RarCursor::File(file, flags);
        entry
    }

    /// Records the volume an entry ran into. An entry spanning more than
    /// two volumes is counted as one crossing.
    fn entry_done(&mut self, flags: EntryFlags) {
        if !flags.continues {
            return;
        }
        if let Some(next) = self.reached.last().and_then(|last| next_volume(last)) {
            self.reached.push(next);
        }
    }
}

fn classify_unrar_error(error: &UnrarError, stage: Stage) -> DecodeError {
    let message = format!("unrar: {error}");
    let kind = classify_code(&error.code, stage);
    DecodeError::new(kind, message)
}

/// Maps a libunrar result code onto the extractor's fault classes.
fn classify_code(code: &Code, stage: Stage) -> DecodeErrorKind {
    match (code, stage) {
        (Code::BadPassword | Code::MissingPassword, _) => DecodeErrorKind::IncorrectPassword,
        // Volume missing from the set.
        (Code::EOpen, _) => DecodeErrorKind::Benign(BenignFault::UnexpectedEof),
        (Code::ERead, Stage::Header) => DecodeErrorKind::Benign(BenignFault::UnexpectedEof),
        (Code::ERead, Stage::Data(_)) => DecodeErrorKind::Benign(BenignFault::StreamCopy),
        (Code::BadData, Stage::Header) => DecodeErrorKind::Benign(BenignFault::LastEntryChecksum),
        // RAR reports a wrong file password as a CRC failure.
        (Code::BadData, Stage::Data(flags)) if flags.encrypted => {
            DecodeErrorKind::IncorrectPassword
        }
        (Code::BadData, Stage::Data(flags)) if flags.split => {
            DecodeErrorKind::Benign(BenignFault::StreamCopy)
        }
        _ => DecodeErrorKind::Fatal,
    }
}

/// Lists the on-disk volumes of the RAR set that `archive` belongs to.
///
/// Two naming schemes are recognised:
///
/// - `name.part1.rar`, `name.part2.rar`, ... (any zero-padding)
/// - `name.rar`, `name.r00`, `name.r01`, ...
///
/// Discovery stops at the first missing volume. A path that matches
/// neither scheme, or does not exist, is returned on its own.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use unpackr_core::formats::rar::discover_volumes;
///
/// let volumes = discover_volumes(Path::new("/downloads/show.part01.rar"));
/// for volume in &volumes {
///     println!("{}", volume.display());
/// }
/// ```
#[must_use]
pub fn discover_volumes(archive: &Path) -> Vec<PathBuf> {
    let dir = archive.parent().unwrap_or_else(|| Path::new(""));
    let found: Vec<PathBuf> = split_volume_name(archive)
        .map(|name| {
            iter::successors(Some(name.first()), VolumeName::next)
                .map(|volume| dir.join(volume.file_name()))
                .take_while(|path| path.is_file())
                .collect()
        })
        .unwrap_or_default();

    if found.is_empty() {
        vec![archive.to_path_buf()]
    } else {
        found
    }
}

/// Returns the name libunrar opens after `volume`, whether or not it
/// exists.
fn next_volume(volume: &Path) -> Option<PathBuf> {
    let next = split_volume_name(volume)?.next()?;
    Some(volume.with_file_name(next.file_name()))
}

#[derive(Debug, PartialEq, Eq)]
enum VolumeName {
    /// `prefix` ends in `.part`; `width` is the digit count.
    Part {
        prefix: String,
        width: usize,
        ext: String,
        number: u32,
    },
    /// `index` is `None` for the `.rar` head, `n` for `.rNN`.
    OldStyle {
        stem: String,
        rar_ext: String,
        r: char,
        index: Option<u32>,
    },
}

impl VolumeName {
    /// First volume of the same set.
    fn first(&self) -> Self {
        match self {
            Self::Part {
                prefix, width, ext, ..
            } => Self::Part {
                prefix: prefix.clone(),
                width: *width,
                ext: ext.clone(),
                number: 1,
            },
            Self::OldStyle {
                stem, rar_ext, r, ..
            } => Self::OldStyle {
                stem: stem.clone(),
                rar_ext: rar_ext.clone(),
                r: *r,
                index: None,
            },
        }
    }

    fn next(&self) -> Option<Self> {
        match self {
            Self::Part {
                prefix,
                width,
                ext,
                number,
            } => Some(Self::Part {
                prefix: prefix.clone(),
                width: *width,
                ext: ext.clone(),
                number: number.checked_add(1)?,
            }),
            Self::OldStyle {
                stem,
                rar_ext,
                r,
                index,
            } => {
                let index = match index {
                    None => 0,
                    Some(n) if *n < 99 => n + 1,
                    Some(_) => return None,
                };
                Some(Self::OldStyle {
                    stem: stem.clone(),
                    rar_ext: rar_ext.clone(),
                    r: *r,
                    index: Some(index),
                })
            }
        }
    }

    fn file_name(&self) -> String {
        match self {
            Self::Part {
                prefix,
                width,
                ext,
                number,
            } => format!("{prefix}{number:0width$}.{ext}"),
            Self::OldStyle {
                stem,
                rar_ext,
                index: None,
                ..
            } => format!("{stem}.{rar_ext}"),
            Self::OldStyle {
                stem,
                r,
                index: Some(n),
                ..
            } => format!("{stem}.{r}{n:02}"),
        }
    }
}

fn split_volume_name(archive: &Path) -> Option<VolumeName> {
    let file_name = archive.file_name()?.to_str()?;
    let (stem, ext) = file_name.rsplit_once('.')?;
    let ext_lower = ext.to_ascii_lowercase();

    if ext_lower == "rar" {
        if let Some((base, number)) = stem.rsplit_once('.')
            && let Some((part, digits)) = number.split_at_checked(4)
            && part.eq_ignore_ascii_case("part")
            && !digits.is_empty()
            && digits.bytes().all(|b| b.is_ascii_digit())
            && let Ok(number) = digits.parse()
        {
            return Some(VolumeName::Part {
                prefix: format!("{base}.{part}"),
                width: digits.len(),
                ext: ext.to_string(),
                number,
            });
        }
        let r = if ext.starts_with('R') { 'R' } else { 'r' };
        return Some(VolumeName::OldStyle {
            stem: stem.to_string(),
            rar_ext: ext.to_string(),
            r,
            index: None,
        });
    }

    let bytes = ext_lower.as_bytes();
    if bytes.len() == 3 && bytes[0] == b'r' && bytes[1..].iter().all(u8::is_ascii_digit) {
        let upper = ext.starts_with('R');
        return Some(VolumeName::OldStyle {
            stem: stem.to_string(),
            rar_ext: if upper { "RAR" } else { "rar" }.to_string(),
            r: if upper { 'R' } else { 'r' },
            index: ext[1..].parse().ok(),
        });
    }

    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, names: &[&str]) {
        for name in names {
            std::fs::write(dir.join(name), b"").unwrap();
        }
    }

    const fn flags(encrypted: bool, split: bool) -> EntryFlags {
        EntryFlags {
            encrypted,
            split,
            continues: split,
        }
    }

    fn names(volumes: &[PathBuf]) -> Vec<String> {
        volumes
            .iter()
            .map(|v| v.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_rar_format_name() {
        assert_eq!(RarFormat::new().format_name(), "rar");
    }

    #[test]
    fn test_discover_part_volumes() {
        let temp = TempDir::new().unwrap();
        touch(
            temp.path(),
            &["show.part01.rar", "show.part02.rar", "show.part03.rar"],
        );

        let volumes = discover_volumes(&temp.path().join("show.part01.rar"));
        assert_eq!(
            names(&volumes),
            ["show.part01.rar", "show.part02.rar", "show.part03.rar"]
        );
    }

    #[test]
    fn test_discover_part_volumes_stops_at_gap() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), &["a.part1.rar", "a.part2.rar", "a.part4.rar"]);

        let volumes = discover_volumes(&temp.path().join("a.part2.rar"));
        assert_eq!(names(&volumes), ["a.part1.rar", "a.part2.rar"]);
    }

    #[test]
    fn test_discover_old_style_volumes() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), &["movie.rar", "movie.r00", "movie.r01"]);

        let volumes = discover_volumes(&temp.path().join("movie.rar"));
        assert_eq!(names(&volumes), ["movie.rar", "movie.r00", "movie.r01"]);

        let from_middle = discover_volumes(&temp.path().join("movie.r01"));
        assert_eq!(from_middle, volumes);
    }

    #[test]
    fn test_discover_single_volume() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), &["single.rar"]);

        let volumes = discover_volumes(&temp.path().join("single.rar"));
        assert_eq!(names(&volumes), ["single.rar"]);
    }

    #[test]
    fn test_discover_missing_archive_returns_itself() {
        let path = PathBuf::from("/nonexistent/dir/gone.part1.rar");
        assert_eq!(discover_volumes(&path), vec![path]);
    }

    #[test]
    fn test_split_volume_name_case_preserved() {
        assert_eq!(
            split_volume_name(Path::new("Show.PART07.RAR")),
            Some(VolumeName::Part {
                prefix: "Show.PART".into(),
                width: 2,
                ext: "RAR".into(),
                number: 7,
            })
        );
        assert_eq!(
            split_volume_name(Path::new("Show.R03")),
            Some(VolumeName::OldStyle {
                stem: "Show".into(),
                rar_ext: "RAR".into(),
                r: 'R',
                index: Some(3),
            })
        );
        assert_eq!(split_volume_name(Path::new("notes.txt")), None);
    }

    #[test]
    fn test_classify_password_codes() {
        let plain = flags(false, false);
        for stage in [Stage::Header, Stage::Data(plain)] {
            assert_eq!(
                classify_code(&Code::BadPassword, stage),
                DecodeErrorKind::IncorrectPassword
            );
            assert_eq!(
                classify_code(&Code::MissingPassword, stage),
                DecodeErrorKind::IncorrectPassword
            );
        }
    }

    #[test]
    fn test_classify_bad_data() {
        let plain = flags(false, false);
        let encrypted = flags(true, false);
        let split = flags(false, true);

        assert_eq!(
            classify_code(&Code::BadData, Stage::Header),
            DecodeErrorKind::Benign(BenignFault::LastEntryChecksum)
        );
        assert_eq!(
            classify_code(&Code::BadData, Stage::Data(encrypted)),
            DecodeErrorKind::IncorrectPassword
        );
        assert_eq!(
            classify_code(&Code::BadData, Stage::Data(split)),
            DecodeErrorKind::Benign(BenignFault::StreamCopy)
        );
        assert_eq!(
            classify_code(&Code::BadData, Stage::Data(plain)),
            DecodeErrorKind::Fatal
        );
    }

    #[test]
    fn test_classify_missing_volume_is_benign() {
        assert_eq!(
            classify_code(&Code::EOpen, Stage::Header),
            DecodeErrorKind::Benign(BenignFault::UnexpectedEof)
        );
        assert_eq!(
            classify_code(&Code::BadArchive, Stage::Header),
            DecodeErrorKind::Fatal
        );
    }

    #[test]
    fn test_open_garbage_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("garbage.rar");
        std::fs::write(&path, b"this is not a rar archive at all").unwrap();

        assert!(RarFormat.open(&path, None).is_err());
    }

    #[test]
    fn test_open_failure_tagged_with_opened_volume() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.part1.rar"), b"damaged first volume").unwrap();
        touch(temp.path(), &["a.part2.rar", "a.part3.rar"]);

        let first = temp.path().join("a.part1.rar");
        match RarFormat.open(&first, None) {
            Err(ExtractionError::Decoder { volume, .. }) => assert_eq!(volume, first),
            Err(other) => panic!("expected decoder error, got {other:?}"),
            Ok(_) => panic!("damaged volume opened"),
        }
    }

    #[test]
    fn test_next_volume_names() {
        assert_eq!(
            next_volume(Path::new("/dl/show.part09.rar")),
            Some(PathBuf::from("/dl/show.part10.rar"))
        );
        assert_eq!(
            next_volume(Path::new("/dl/show.part99.rar")),
            Some(PathBuf::from("/dl/show.part100.rar"))
        );
        assert_eq!(
            next_volume(Path::new("movie.rar")),
            Some(PathBuf::from("movie.r00"))
        );
        assert_eq!(
            next_volume(Path::new("MOVIE.R09")),
            Some(PathBuf::from("MOVIE.R10"))
        );
        assert_eq!(next_volume(Path::new("movie.r99")), None);
        assert_eq!(next_volume(Path::new("notes.zip")), None);
    }
}
