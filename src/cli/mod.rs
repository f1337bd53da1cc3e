//! CLI module for lexsearch
//!
//! Handles command-line argument parsing and configuration overrides.

pub mod args;

pub use args::{Args, Commands, Verbosity};
