//! Application ports (traits) for external dependencies.
//!
//! In hexagonal architecture, ports define interfaces that the application
//! needs from the outside world. Adapters in `stencil-adapters` implement these.
//!
//! ## Port Types
//!
//! - **Driven (Output) Ports**: Called by application, implemented by infrastructure
//!   - `Filesystem`: staged writes and commit
//!   - `SourceTree`: the scaffold's template files, partials and hooks
//!   - `HookRunner`: executes a rendered post-scaffold hook
//!   - `InputSource`: answers (terminal prompts or a script); declared in the
//!     domain because the answer resolver calls it directly
//!
//! - **Driving (Input) Ports**: Called by external world, implemented by application
//!   - `GenerationService`

pub mod output;

pub use crate::domain::InputSource;
pub use output::{Filesystem, HookRunner, SourceTree};

#[cfg(test)]
pub use output::{MockFilesystem, MockHookRunner, MockSourceTree};
