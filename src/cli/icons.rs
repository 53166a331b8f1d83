//! Status icons for terminal output.

use console::{style, StyledObject};

pub fn success() -> StyledObject<&'static str> {
    style("✓").green()
}

pub fn info() -> StyledObject<&'static str> {
    style("→").cyan()
}

pub fn warn() -> StyledObject<&'static str> {
    style("!").yellow()
}

pub fn error() -> StyledObject<&'static str> {
    style("✗").red()
}

pub fn dim_arrow() -> StyledObject<&'static str> {
    style("→").dim()
}
