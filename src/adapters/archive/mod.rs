//! Message archive adapters.

mod in_memory;

pub use in_memory::{InMemoryMessageArchive, DEFAULT_ARCHIVE_CAPACITY};
