//! vmcycle library crate.

/// Workflow logic and the collaborator traits it drives.
pub mod core;

/// CLI argument parsing (only when the `cli` feature is enabled).
#[cfg(feature = "cli")]
pub mod cli;

#[cfg(feature = "cli")]
pub mod app;

pub mod config;
pub mod remote;

mod error;

pub use error::*;
