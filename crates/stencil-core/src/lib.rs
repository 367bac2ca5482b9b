//! Stencil Core - Hexagonal Architecture Implementation
//!
//! This crate provides the domain and application layers for the Stencil
//! scaffold generator, following hexagonal (ports and adapters) architecture.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │           stencil-cli (CLI)             │
//! │     (Implements Driving Ports)          │
//! └──────────────────┬──────────────────────┘
//!                    │ calls
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │         Application Services            │
//! │          (GenerationService)            │
//! │         Orchestrates Use Cases          │
//! └──────────────────┬──────────────────────┘
//!                    │ uses
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │      Application Ports (Traits)         │
//! │ (Filesystem, SourceTree, InputSource)   │
//! └──────────────────┬──────────────────────┘
//!                    │ implemented by
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │    stencil-adapters (Infrastructure)    │
//! │ (LocalFilesystem, DirectorySource, etc) │
//! └─────────────────────────────────────────┘
//!                    │
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │         Domain Layer (Pure Logic)       │
//! │ (expressions, planner, renderer,        │
//! │  injector, answer resolver)             │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use stencil_core::prelude::*;
//! # fn run(
//! #     fs: Box<dyn Filesystem>,
//! #     source: &dyn SourceTree,
//! #     input: &mut dyn InputSource,
//! # ) -> StencilResult<()> {
//! let definition = ScaffoldDefinition::new()
//!     .with_question(Question::text("name", "Command name?").required());
//!
//! let service = GenerationService::new(fs);
//! let request = GenerateRequest::new("./my-app")
//!     .answers(AnswerMap::new().with("name", "serve"));
//! let report = service.generate(&definition, source, input, &request)?;
//! println!("{} files written", report.written().count());
//! # Ok(())
//! # }
//! ```

pub mod domain;

pub mod application;

pub mod error;

// Public API - what external crates should use
pub mod prelude {
    pub use crate::application::{
        GenerateOptions, GenerateRequest, GenerationReport, GenerationService, InjectPolicy,
        ports::{Filesystem, InputSource, SourceTree},
    };
    pub use crate::domain::{
        AnswerMap, InjectDirective, LintWarning, ProjectStructure, Question, RelativePath,
        RenderContext, ScaffoldDefinition, SourceFile, Template, Value,
    };
    pub use crate::error::{StencilError, StencilResult};
}

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
