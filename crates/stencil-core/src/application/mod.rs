//! Application layer for Stencil.
//!
//! This layer contains:
//! - **Services**: Use case orchestration (GenerationService)
//! - **Ports**: Interface definitions (traits) for external dependencies
//! - **Errors**: Application-specific error types
//!
//! The application layer coordinates the domain layer but contains no
//! business logic itself. All scaffold rules live in `crate::domain`.

pub mod error;
pub mod ports;
pub mod services;

// Re-export main services
pub use services::{
    CancelFlag, GenerateOptions, GenerateRequest, GenerationReport, GenerationService,
    InjectPolicy, InjectionOutcome, RenderedHook,
};

// Re-export port traits (for adapter implementation)
pub use ports::{Filesystem, HookRunner, InputSource, SourceTree};

pub use error::ApplicationError;
