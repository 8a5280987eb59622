// CLI module for oggflac
//
// Only compiled into the binary; the library has no CLI dependency.

pub mod commands;
pub mod config;
pub mod output;

pub use config::{Commands, Config};
pub use output::OutputFormatter;
