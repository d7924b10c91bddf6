//! Staged extraction through a temporary sibling directory.

use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use crate::ExtractionReport;
use crate::Result;
use crate::types::OutputDir;

use super::stream::create_dir_all;

/// Runs `extract_fn` against a temporary directory and merges the result
/// into `output_dir` only if it succeeds.
///
/// The temporary directory is created next to `output_dir` (same
/// filesystem, so the merge is a series of renames) and named after it with
/// `suffix` appended. It is removed in every case.
///
/// On success, paths in `report.files` are rewritten to their final
/// location. If `extract_fn` fails nothing is committed, and `report.files`
/// and `report.bytes_written` are cleared. If the merge itself fails, the
/// files moved before the failure stay in `output_dir`; `report.files` and
/// `report.bytes_written` then describe exactly those, and a warning is
/// recorded.
///
/// # Errors
///
/// Returns the error of `extract_fn`, or an I/O error if the temporary
/// directory cannot be created or merged.
pub fn staged_extract<F>(
    output_dir: &OutputDir,
    suffix: &str,
    dir_mode: u32,
    report: &mut ExtractionReport,
    extract_fn: F,
) -> Result<()>
where
    F: FnOnce(&OutputDir, &mut ExtractionReport) -> Result<()>,
{
    let target = output_dir.as_path();
    let parent = target.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} has no parent directory", target.display()),
        )
    })?;
    create_dir_all(parent, dir_mode)?;

    let prefix = target
        .file_name()
        .map_or_else(|| ".unpackr".to_string(), |name| format!(".{}", name.to_string_lossy()));
    let staging = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(suffix)
        .tempdir_in(parent)?;
    let staging_dir = OutputDir::new(staging.path())?;

    if let Err(e) = extract_fn(&staging_dir, report) {
        report.files.clear();
        report.bytes_written = 0;
        return Err(e);
    }

    let mut moved = Vec::new();
    let merged = create_dir_all(target, dir_mode)
        .and_then(|()| move_tree(staging_dir.as_path(), target, dir_mode, &mut moved));

    match merged {
        Ok(()) => {
            report.files = report
                .files
                .iter()
                .map(|file| relocate(file, staging_dir.as_path(), target))
                .collect();
            Ok(())
        }
        Err(e) => {
            report.bytes_written = moved
                .iter()
                .filter_map(|file| fs::metadata(file).ok())
                .map(|meta| meta.len())
                .sum();
            report.add_warning(format!(
                "merging into {} stopped after {} files: {e}",
                target.display(),
                moved.len()
            ));
            report.files = moved;
            Err(e.into())
        }
    }
}

/// Moves the contents of `from` into `to`, replacing existing files.
///
/// Each file is appended to `moved` once it is in place.
fn move_tree(from: &Path, to: &Path, dir_mode: u32, moved: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let source = entry.path();
        let destination = to.join(entry.file_name());

        if entry.file_type()?.is_dir() {
            create_dir_all(&destination, dir_mode)?;
            move_tree(&source, &destination, dir_mode, moved)?;
        } else {
            if destination.is_dir() {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("{} is a directory", destination.display()),
                ));
            }
            fs::rename(&source, &destination)?;
            moved.push(destination);
        }
    }
    Ok(())
}

fn relocate(file: &Path, staging: &Path, target: &Path) -> PathBuf {
    file.strip_prefix(staging)
        .map_or_else(|_| file.to_path_buf(), |relative| target.join(relative))
}
