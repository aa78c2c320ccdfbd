//! Manga Fetcher Library
//!
//! A Rust library for archiving manga chapters page by page. Resolves where a
//! chapter's images are served from, walks its pages in order and runs many
//! chapters concurrently under a shared connection budget.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
