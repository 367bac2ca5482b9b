//! Application services - orchestrate use cases.
//!
//! Services coordinate the domain layer and ports to accomplish
//! high-level use cases like "generate from a scaffold" or "lint a scaffold".

pub mod generation_service;
pub mod request;

pub use generation_service::{GenerationService, POST_SCAFFOLD_HOOK, PROJECT_QUESTION, staging_dir};
pub use request::{
    CancelFlag, ExcludedReport, FileReport, GenerateOptions, GenerateRequest, GenerationReport,
    InjectPolicy, InjectionOutcome, InjectionReport, RenderedHook,
};
