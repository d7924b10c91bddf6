//! Archive format implementations.

pub mod detect;
pub mod rar;
pub mod traits;
pub mod zip;

// Re-export main types for convenience
pub use detect::ArchiveType;
pub use detect::detect_format;
pub use rar::RarFormat;
pub use traits::ArchiveFormat;
pub use traits::BenignFault;
pub use traits::DecodeError;
pub use traits::DecodeErrorKind;
pub use traits::EntryDecoder;
pub use traits::EntryHeader;
pub use zip::ZipFormat;

static RAR: RarFormat = RarFormat::new();
static ZIP: ZipFormat = ZipFormat::new();

/// Returns the handler for a detected archive type.
#[must_use]
pub fn handler_for(kind: ArchiveType) -> &'static dyn ArchiveFormat {
    match kind {
        ArchiveType::Rar => &RAR,
        ArchiveType::Zip => &ZIP,
    }
}
