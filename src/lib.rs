//! Startup core for an embedded math-typesetting engine.
//!
//! Resolves a caller configuration against engine defaults, turns the
//! requested jax and extensions into a dependency-ordered load plan, and
//! sequences startup through config, styles, modules, optional deferral and
//! the initial typeset pass.

pub mod cli;
pub mod config;
pub mod environment;
pub mod error;
pub mod format;
pub mod logging;
pub mod modules;
pub mod startup;

pub use error::{Error, Result};
