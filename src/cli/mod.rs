//! Command-line interface.

mod commands;
mod helpers;
pub mod icons;

pub use commands::{is_verbose, run};
