//! Archive format detection.

use std::fmt;
use std::fs::File;
use std::io;
use std::io::Read;
use std::path::Path;

use crate::ExtractionError;
use crate::Result;

/// RAR signature shared by RAR 1.5-4.x (`..\x00`) and RAR 5 (`..\x01\x00`).
const RAR_MAGIC: [u8; 6] = *b"Rar!\x1a\x07";

/// ZIP local file header, empty archive and spanned archive signatures.
const ZIP_MAGICS: [[u8; 4]; 3] = [*b"PK\x03\x04", *b"PK\x05\x06", *b"PK\x07\x08"];

/// Supported archive formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveType {
    /// RAR archive, single or multi-volume.
    Rar,
    /// ZIP archive.
    Zip,
}

impl ArchiveType {
    /// Returns the lowercase format name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Rar => "rar",
            Self::Zip => "zip",
        }
    }
}

impl fmt::Display for ArchiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Detects the archive type of the file at `path`.
///
/// The file signature wins; the extension is only consulted when the
/// signature is unknown (or the file is shorter than one).
///
/// # Errors
///
/// Returns `Io` if the file cannot be read and `UnknownArchiveType` if
/// neither the signature nor the extension names a supported format.
pub fn detect_format(path: &Path) -> Result<ArchiveType> {
    let mut header = [0u8; RAR_MAGIC.len()];
    let read = read_prefix(path, &mut header)?;

    detect_from_signature(&header[..read])
        .or_else(|| detect_from_extension(path))
        .ok_or_else(|| ExtractionError::UnknownArchiveType {
            path: path.to_path_buf(),
        })
}

/// Matches the leading bytes of a file against known signatures.
#[must_use]
pub fn detect_from_signature(bytes: &[u8]) -> Option<ArchiveType> {
    if bytes.starts_with(&RAR_MAGIC) {
        return Some(ArchiveType::Rar);
    }
    if ZIP_MAGICS.iter().any(|magic| bytes.starts_with(magic)) {
        return Some(ArchiveType::Zip);
    }
    None
}

/// Detects the archive type from the file extension (case-insensitive).
///
/// Old-style RAR volumes (`.r00` to `.r99`) count as RAR.
#[must_use]
pub fn detect_from_extension(path: &Path) -> Option<ArchiveType> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();

    match extension.as_str() {
        "rar" => Some(ArchiveType::Rar),
        "zip" => Some(ArchiveType::Zip),
        ext if is_old_style_volume(ext) => Some(ArchiveType::Rar),
        _ => None,
    }
}

fn is_old_style_volume(ext: &str) -> bool {
    let bytes = ext.as_bytes();
    bytes.len() == 3 && bytes[0] == b'r' && bytes[1..].iter().all(u8::is_ascii_digit)
}

fn read_prefix(path: &Path, buf: &mut [u8]) -> io::Result<usize> {
    let mut file = File::open(path)?;
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_detect_rar_signatures() {
        assert_eq!(
            detect_from_signature(b"Rar!\x1a\x07\x00\xcf"),
            Some(ArchiveType::Rar)
        );
        assert_eq!(
            detect_from_signature(b"Rar!\x1a\x07\x01\x00"),
            Some(ArchiveType::Rar)
        );
    }

    #[test]
    fn test_detect_zip_signatures() {
        for magic in ZIP_MAGICS {
            assert_eq!(detect_from_signature(&magic), Some(ArchiveType::Zip));
        }
    }

    #[test]
    fn test_detect_short_or_unknown_signature() {
        assert_eq!(detect_from_signature(b""), None);
        assert_eq!(detect_from_signature(b"PK"), None);
        assert_eq!(detect_from_signature(b"\x1f\x8b\x08\x00"), None);
    }

    #[test]
    fn test_detect_extension() {
        assert_eq!(
            detect_from_extension(&PathBuf::from("show.rar")),
            Some(ArchiveType::Rar)
        );
        assert_eq!(
            detect_from_extension(&PathBuf::from("show.part01.RAR")),
            Some(ArchiveType::Rar)
        );
        assert_eq!(
            detect_from_extension(&PathBuf::from("show.r07")),
            Some(ArchiveType::Rar)
        );
        assert_eq!(
            detect_from_extension(&PathBuf::from("Photos.ZIP")),
            Some(ArchiveType::Zip)
        );
    }

    #[test]
    fn test_detect_extension_unsupported() {
        assert_eq!(detect_from_extension(&PathBuf::from("archive.tar.gz")), None);
        assert_eq!(detect_from_extension(&PathBuf::from("archive.r7")), None);
        assert_eq!(detect_from_extension(&PathBuf::from("archive.rxx")), None);
        assert_eq!(detect_from_extension(&PathBuf::from("README")), None);
    }

    #[test]
    fn test_signature_wins_over_extension() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("mislabeled.zip");
        std::fs::write(&path, b"Rar!\x1a\x07\x01\x00rest").unwrap();

        assert_eq!(detect_format(&path).unwrap(), ArchiveType::Rar);
    }

    #[test]
    fn test_extension_fallback() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tiny.rar");
        std::fs::write(&path, b"Ra").unwrap();

        assert_eq!(detect_format(&path).unwrap(), ArchiveType::Rar);
    }

    #[test]
    fn test_unknown_archive_type() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("notes.txt");
        std::fs::write(&path, b"plain text").unwrap();

        assert!(matches!(
            detect_format(&path),
            Err(ExtractionError::UnknownArchiveType { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let temp = TempDir::new().unwrap();
        let result = detect_format(&temp.path().join("gone.zip"));
        assert!(matches!(result, Err(ExtractionError::Io(_))));
    }

    #[test]
    fn test_archive_type_display() {
        assert_eq!(ArchiveType::Rar.to_string(), "rar");
        assert_eq!(format!("{:?}", ArchiveType::Zip), "Zip");
    }
}
