//! Subcommand implementations.

pub mod kinds;
pub mod normalize;
pub mod render;
