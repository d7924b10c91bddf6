//! Path types shared by the sanitizer and the extractors.

mod output_dir;
mod safe_path;

pub use output_dir::OutputDir;
pub use safe_path::SafePath;
pub use safe_path::SanitizedEntry;
pub use safe_path::SkipReason;
