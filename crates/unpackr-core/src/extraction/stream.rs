//! Writing entry content to disk.

use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::BufWriter;
use std::io::Read;
use std::io::Write;
use std::path::Path;

use crate::copy::CopyBuffer;
use crate::copy::StreamError;
use crate::copy::copy_with_buffer;

/// Writer buffer size, matching the copy buffer.
const WRITE_BUFFER_SIZE: usize = 64 * 1024;

/// Streams `reader` into the file at `path`, returning the bytes written.
///
/// Missing parent directories are created with `dir_mode`. An existing file
/// is truncated and its mode reset to `file_mode`. Modes only apply on Unix.
///
/// On error the partially written file is left in place; the caller decides
/// whether to remove it.
///
/// # Errors
///
/// Returns `StreamError::Read` if `reader` fails and `StreamError::Write`
/// for any filesystem failure.
pub fn write_stream(
    path: &Path,
    reader: &mut dyn Read,
    file_mode: u32,
    dir_mode: u32,
    buffer: &mut CopyBuffer,
) -> Result<u64, StreamError> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent, dir_mode).map_err(StreamError::Write)?;
    }

    let file = open_truncated(path, file_mode).map_err(StreamError::Write)?;
    let mut writer = BufWriter::with_capacity(WRITE_BUFFER_SIZE, file);
    let written = copy_with_buffer(reader, &mut writer, buffer)?;
    writer.flush().map_err(StreamError::Write)?;

    Ok(written)
}

/// Creates `path` and any missing parents with `mode`.
///
/// Existing directories are left untouched.
///
/// # Errors
///
/// Returns an error if a component exists and is not a directory, or the
/// directory cannot be created.
pub fn create_dir_all(path: &Path, mode: u32) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    builder.create(path)
}

/// Resets the mode of an existing file. Does nothing off Unix.
///
/// # Errors
///
/// Returns an error if the permissions cannot be changed.
pub fn set_file_mode(path: &Path, mode: u32) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))
    }

    #[cfg(not(unix))]
    {
        let _ = (path, mode);
        Ok(())
    }
}

fn open_truncated(path: &Path, mode: u32) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        use std::os::unix::fs::PermissionsExt;

        options.mode(mode);
        let file = options.open(path)?;
        // `mode` only applies to newly created files.
        file.set_permissions(fs::Permissions::from_mode(mode))?;
        Ok(file)
    }

    #[cfg(not(unix))]
    {
        let _ = mode;
        options.open(path)
    }
}
