//! Non-interactive input sources.

mod scripted;

pub use scripted::ScriptedInput;
