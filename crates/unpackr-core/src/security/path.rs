//! Archive entry name sanitization.
//!
//! Every entry name coming out of a decoder goes through [`sanitize_entry`]
//! before anything touches the filesystem. The function is pure: it maps a
//! name onto the output directory lexically and never follows symlinks.

use std::iter;

use md5::Digest;
use md5::Md5;

use crate::ExtractionError;
use crate::Result;
use crate::types::OutputDir;
use crate::types::SafePath;
use crate::types::SanitizedEntry;
use crate::types::SkipReason;

/// Longest file name most filesystems accept, in bytes.
pub const MAX_FILE_NAME_BYTES: usize = 255;

/// Resource-fork directory macOS adds to ZIP archives.
const METADATA_MARKER: &str = "__MACOSX";

/// Maps an archive entry name to a path inside `output_dir`.
///
/// # Rules
///
/// 1. Backslashes count as separators, so `..\..\x` is treated like `../../x`
/// 2. Names containing `__MACOSX`, or whose first component is hidden
///    (`.DS_Store`, `.git/config`), are skipped
/// 3. Leading `/` is dropped: absolute names land under `output_dir`
/// 4. The final component is rewritten by [`sanitize_file_name`]
/// 5. `.` and `..` are resolved lexically; a result outside `output_dir` is
///    rejected with [`ExtractionError::InvalidPath`]
///
/// # Errors
///
/// Returns `InvalidPath` when the entry escapes `output_dir` (zip-slip).
///
/// # Examples
///
/// ```
/// use unpackr_core::security::sanitize_entry;
/// use unpackr_core::types::OutputDir;
/// use unpackr_core::types::SanitizedEntry;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let out = OutputDir::new("/srv/out")?;
///
/// let entry = sanitize_entry("season1/episode1.mkv", &out)?;
/// assert_eq!(entry.path(), Some(std::path::Path::new("/srv/out/season1/episode1.mkv")));
///
/// assert!(matches!(sanitize_entry("__MACOSX/._a", &out)?, SanitizedEntry::Skip(_)));
/// assert!(sanitize_entry("../../etc/passwd", &out).is_err());
/// # Ok(())
/// # }
/// ```
pub fn sanitize_entry(entry: &str, output_dir: &OutputDir) -> Result<SanitizedEntry> {
    let name = entry.replace('\\', "/");

    if name.contains(METADATA_MARKER) {
        return Ok(SanitizedEntry::Skip(SkipReason::PlatformMetadata));
    }

    let mut parts: Vec<&str> = name
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect();

    if let Some(first) = parts.first()
        && first.starts_with('.')
        && *first != ".."
    {
        return Ok(SanitizedEntry::Skip(SkipReason::Hidden));
    }

    let Some(last) = parts.pop() else {
        return Ok(SanitizedEntry::Skip(SkipReason::OutputRoot));
    };
    let file_name = if last == ".." {
        last.to_string()
    } else {
        sanitize_file_name(last)
    };

    let mut resolved = output_dir.as_path().to_path_buf();
    for part in parts.into_iter().chain(iter::once(file_name.as_str())) {
        if part == ".." {
            resolved.pop();
        } else {
            resolved.push(part);
        }
    }

    if !resolved.starts_with(output_dir.as_path()) {
        // Possible zip-slip: the entry climbs out of the output directory.
        return Err(ExtractionError::InvalidPath {
            path: resolved,
            entry: entry.to_string(),
        });
    }

    if resolved == output_dir.as_path() {
        return Ok(SanitizedEntry::Skip(SkipReason::OutputRoot));
    }

    Ok(SanitizedEntry::Extract(SafePath::new_unchecked(resolved)))
}

/// Rewrites a single file name so any filesystem can store it.
///
/// Characters outside printable ASCII are replaced by their upper-case
/// hexadecimal code point (`é` becomes `E9`). A result longer than
/// [`MAX_FILE_NAME_BYTES`] is replaced by the hex MD5 digest of the
/// original name, which is stable across runs.
///
/// # Examples
///
/// ```
/// use unpackr_core::security::sanitize_file_name;
///
/// assert_eq!(sanitize_file_name("report final.pdf"), "report final.pdf");
/// assert_eq!(sanitize_file_name("caf\u{e9}.txt"), "cafE9.txt");
/// assert_eq!(sanitize_file_name(&"a".repeat(300)).len(), 32);
/// ```
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let mut cleaned = String::with_capacity(name.len());
    for c in name.chars() {
        if c == ' ' || c.is_ascii_graphic() {
            cleaned.push(c);
        } else {
            cleaned.push_str(&format!("{:X}", u32::from(c)));
        }
    }

    if cleaned.len() > MAX_FILE_NAME_BYTES {
        hashed_file_name(name)
    } else {
        cleaned
    }
}

fn hashed_file_name(name: &str) -> String {
    hex::encode(Md5::digest(name.as_bytes()))
}
