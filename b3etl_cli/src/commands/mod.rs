//! CLI subcommand implementations.

pub mod extract;
pub mod pipeline;
pub mod transform;
