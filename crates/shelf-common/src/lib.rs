//! Shelf Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error handling and logging for the bookshelf worker workspace.
//!
//! # Overview
//!
//! - **Error Handling**: [`ShelfError`] and the [`Result`] alias used by every member
//! - **Logging**: structured `tracing` setup driven by `LOG_*` environment variables
//!
//! # Example
//!
//! ```no_run
//! use shelf_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_logging(&LogConfig::from_env()?)?;
//!     tracing::info!("worker starting");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{Result, ShelfError};
