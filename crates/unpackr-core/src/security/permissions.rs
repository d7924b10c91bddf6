//! Permission-mode sanitization for extracted files and directories.

/// Setuid, setgid and sticky bits.
const SPECIAL_BITS: u32 = 0o7000;

/// Mask of the regular permission bits.
const PERMISSION_BITS: u32 = 0o777;

/// Strips special bits from a requested mode and keeps the owner able to
/// manage the result.
///
/// Files keep owner read/write, directories keep owner read/write/execute,
/// so the extractor can always overwrite or descend into what it created.
///
/// # Examples
///
/// ```
/// use unpackr_core::security::sanitize_mode;
///
/// assert_eq!(sanitize_mode(0o4755, false), 0o755);
/// assert_eq!(sanitize_mode(0o000, false), 0o600);
/// assert_eq!(sanitize_mode(0o500, true), 0o700);
/// ```
#[must_use]
pub const fn sanitize_mode(mode: u32, is_dir: bool) -> u32 {
    let owner = if is_dir { 0o700 } else { 0o600 };
    (mode & !SPECIAL_BITS & PERMISSION_BITS) | owner
}
