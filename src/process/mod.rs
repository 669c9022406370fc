//! Deadline-bounded execution of external tools
//!
//! Spawns a command, merges its stdout and stderr into one accumulator while
//! logging each line, and classifies the result as success, failure or
//! timeout.

mod runner;

pub use runner::{run, CommandSpec, ProcessOutcome, ProcessResult};
