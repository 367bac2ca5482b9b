//! Hook runners.

mod process;

pub use process::ProcessHookRunner;
