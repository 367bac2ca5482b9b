//! Scaffold source trees.

mod directory;
mod memory;

pub use directory::{DirectorySource, PROJECT_DIR_NAMES, TEMPLATES_DIR};
pub use memory::MemorySource;
