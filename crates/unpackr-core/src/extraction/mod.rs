//! Entry extraction: the engine, stream writing and staged output.

pub mod atomic;
pub mod engine;
pub mod stream;

pub use atomic::staged_extract;
pub use engine::ArchiveExtractor;
pub use stream::create_dir_all;
pub use stream::write_stream;
