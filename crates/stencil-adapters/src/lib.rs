//! Infrastructure adapters for Stencil.
//!
//! This crate implements the ports defined in `stencil-core::application::ports`.
//! It contains all external dependencies and I/O operations.

pub mod definition_loader;
pub mod filesystem;
pub mod hooks;
pub mod input;
pub mod source;

// Re-export commonly used adapters
pub use definition_loader::{Scaffold, load_definition, load_scaffold, parse_definition};
pub use filesystem::{LocalFilesystem, MemoryFilesystem};
pub use hooks::ProcessHookRunner;
pub use input::ScriptedInput;
pub use source::{DirectorySource, MemorySource};
