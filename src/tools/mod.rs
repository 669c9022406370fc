//! External tool discovery
//!
//! A tool can be reachable in several ways (bare binary, interpreter module,
//! absolute install path). The locator probes each candidate in order and
//! remembers the first one that answers.

mod form;
mod locator;

pub use form::{InvocationForm, ToolSpec};
pub use locator::{LocatedTool, ToolLocator};
