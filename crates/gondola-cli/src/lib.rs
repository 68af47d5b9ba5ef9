//! Gondola CLI library.
//!
//! Subcommand handlers and output formatting for the `gondola` binary.

pub mod commands;
pub mod output;
