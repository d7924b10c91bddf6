//! Entry sanitization and permission hardening.

pub mod path;
pub mod permissions;

// Re-export public functions
pub use path::MAX_FILE_NAME_BYTES;
pub use path::sanitize_entry;
pub use path::sanitize_file_name;
pub use permissions::sanitize_mode;
